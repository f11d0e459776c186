use serde::{Deserialize, Serialize};

// Request body for the `images:annotate` endpoint.

#[derive(Debug, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
pub struct AnnotateImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct ImageContent {
    /// Base64-encoded image bytes.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
}

pub const LABEL_DETECTION: &str = "LABEL_DETECTION";
pub const IMAGE_PROPERTIES: &str = "IMAGE_PROPERTIES";
pub const OBJECT_LOCALIZATION: &str = "OBJECT_LOCALIZATION";

// Response body. Every field is defaulted; the API omits whole sections
// when a feature finds nothing.

#[derive(Debug, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateResult>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotateResult {
    pub label_annotations: Vec<LabelAnnotation>,
    pub image_properties_annotation: Option<ImagePropertiesAnnotation>,
    pub localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    pub error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelAnnotation {
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagePropertiesAnnotation {
    pub dominant_colors: DominantColors,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DominantColors {
    pub colors: Vec<ColorInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorInfo {
    pub color: RgbColor,
    pub score: f64,
    pub pixel_fraction: f64,
}

/// Channel values arrive as floats and must be truncated to integers before
/// hex formatting.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalizedObjectAnnotation {
    pub name: String,
    pub score: f64,
    pub bounding_poly: BoundingPoly,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingPoly {
    pub normalized_vertices: Vec<NormalizedVertex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NormalizedVertex {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ApiStatus {
    pub code: i64,
    pub message: String,
}
