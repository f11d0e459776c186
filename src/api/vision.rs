use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::api::vision_structs::{
    AnnotateImageRequest, AnnotateRequest, AnnotateResult, AnnotateResponse, ColorInfo, Feature,
    ImageContent, NormalizedVertex, IMAGE_PROPERTIES, LABEL_DETECTION, OBJECT_LOCALIZATION,
};
use crate::common::image_utils::hex_to_rgb;

/// Terms that mark a label or object as relevant to bees or beekeeping.
/// Matching is case-insensitive substring.
const BEE_TERMS: [&str; 24] = [
    "bee",
    "honeybee",
    "honey bee",
    "beehive",
    "apiary",
    "honeycomb",
    "queen",
    "drone",
    "worker bee",
    "pollen",
    "nectar",
    "propolis",
    "wax",
    "brood",
    "larva",
    "colony",
    "swarm",
    "frame",
    "comb",
    "varroa",
    "mite",
    "royal jelly",
    "apiculture",
    "beekeeper",
];

/// Check if a term is related to bees or beekeeping.
#[must_use]
pub fn is_bee_related(term: &str) -> bool {
    let term_lower = term.to_lowercase();
    BEE_TERMS.iter().any(|bee_term| term_lower.contains(bee_term))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionLabel {
    pub description: String,
    pub score: f64,
    pub bee_related: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionColor {
    /// `rgb(r,g,b)` display form.
    pub color: String,
    pub hex: String,
    pub score: f64,
    pub pixel_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionObject {
    pub name: String,
    pub score: f64,
    pub bee_related: bool,
    pub normalized_vertices: Vec<NormalizedVertex>,
}

/// Beekeeping-focused digest derived from the raw annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeeSummary {
    pub bee_related_terms_count: usize,
    pub bee_objects_detected_count: usize,
    pub honey_colors_detected: bool,
    pub brood_colors_detected: bool,
    pub top_bee_terms: Vec<String>,
    pub suggested_hive_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionReport {
    pub timestamp: String,
    pub labels: Vec<VisionLabel>,
    pub colors: Vec<VisionColor>,
    pub objects: Vec<VisionObject>,
    pub bee_summary: BeeSummary,
}

/// A failed analysis, persisted as a record carrying only the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionFailure {
    pub error: String,
    pub timestamp: String,
}

/// Result of a vision analysis as it appears in stored records: either the
/// full report or the error sentinel. Never an exception past this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisionOutcome {
    Report(VisionReport),
    Failed(VisionFailure),
}

impl VisionOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&VisionReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Vision API error: {0}")]
    Api(String),
    #[error("Vision API returned no result")]
    EmptyResponse,
}

pub struct VisionClient {
    http_client: Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    /// Create vision client.
    ///
    /// # Panics
    /// if it can't create the underlying HTTP client.
    #[must_use]
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Annotate an image (labels, dominant colors, localized objects) and
    /// derive the bee summary. Failures are folded into
    /// [`VisionOutcome::Failed`] rather than surfaced as errors.
    pub async fn analyze(&self, image_bytes: &[u8]) -> VisionOutcome {
        match self.annotate(image_bytes).await {
            Ok(result) => VisionOutcome::Report(process_annotations(&result)),
            Err(e) => {
                debug!("Vision analysis failed: {e}");
                VisionOutcome::Failed(VisionFailure {
                    error: e.to_string(),
                    timestamp: now_iso(),
                })
            }
        }
    }

    async fn annotate(&self, image_bytes: &[u8]) -> Result<AnnotateResult, VisionError> {
        let content = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent { content },
                features: vec![
                    Feature {
                        feature_type: LABEL_DETECTION,
                    },
                    Feature {
                        feature_type: IMAGE_PROPERTIES,
                    },
                    Feature {
                        feature_type: OBJECT_LOCALIZATION,
                    },
                ],
            }],
        };

        let response: AnnotateResponse = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let result = response
            .responses
            .into_iter()
            .next()
            .ok_or(VisionError::EmptyResponse)?;
        if let Some(status) = result.error {
            return Err(VisionError::Api(status.message));
        }
        Ok(result)
    }
}

/// Structure the raw annotations into the stored report shape.
fn process_annotations(result: &AnnotateResult) -> VisionReport {
    let labels: Vec<VisionLabel> = result
        .label_annotations
        .iter()
        .map(|label| VisionLabel {
            description: label.description.clone(),
            score: label.score,
            bee_related: is_bee_related(&label.description),
        })
        .collect();

    let colors: Vec<VisionColor> = result
        .image_properties_annotation
        .iter()
        .flat_map(|props| props.dominant_colors.colors.iter())
        .take(5)
        .map(convert_color)
        .collect();

    let objects: Vec<VisionObject> = result
        .localized_object_annotations
        .iter()
        .map(|object| VisionObject {
            name: object.name.clone(),
            score: object.score,
            bee_related: is_bee_related(&object.name),
            normalized_vertices: object.bounding_poly.normalized_vertices.clone(),
        })
        .collect();

    let bee_summary = generate_bee_summary(&labels, &objects, &colors);
    VisionReport {
        timestamp: now_iso(),
        labels,
        colors,
        objects,
        bee_summary,
    }
}

fn convert_color(info: &ColorInfo) -> VisionColor {
    // Channel floats are truncated, matching the API's integer color space.
    let red = info.color.red as u8;
    let green = info.color.green as u8;
    let blue = info.color.blue as u8;
    VisionColor {
        color: format!("rgb({red},{green},{blue})"),
        hex: crate::common::image_utils::rgb_to_hex((red, green, blue)),
        score: info.score,
        pixel_fraction: info.pixel_fraction,
    }
}

fn generate_bee_summary(
    labels: &[VisionLabel],
    objects: &[VisionObject],
    colors: &[VisionColor],
) -> BeeSummary {
    let bee_labels: Vec<&VisionLabel> = labels.iter().filter(|l| l.bee_related).collect();
    let bee_objects_count = objects.iter().filter(|o| o.bee_related).count();

    // Honey reads as saturated yellow/amber, brood comb as brown.
    let mut honey_colors = 0;
    let mut brood_colors = 0;
    for color in colors {
        let Some((r, g, b)) = hex_to_rgb(&color.hex) else {
            continue;
        };
        if r > 180 && g > 150 && b < 100 {
            honey_colors += 1;
        }
        if r > 100 && g > 50 && g < 150 && b < 80 {
            brood_colors += 1;
        }
    }

    let average_score = if bee_labels.is_empty() {
        0.0
    } else {
        bee_labels.iter().map(|l| l.score).sum::<f64>() / bee_labels.len() as f64
    };

    BeeSummary {
        bee_related_terms_count: bee_labels.len(),
        bee_objects_detected_count: bee_objects_count,
        honey_colors_detected: honey_colors > 0,
        brood_colors_detected: brood_colors > 0,
        top_bee_terms: bee_labels
            .iter()
            .take(3)
            .map(|l| l.description.clone())
            .collect(),
        suggested_hive_state: suggest_hive_state(average_score, bee_objects_count).to_string(),
    }
}

/// Bucket the average bee-label confidence into a suggested hive state.
#[must_use]
pub fn suggest_hive_state(average_bee_score: f64, bee_objects_count: usize) -> &'static str {
    if average_bee_score > 0.9 && bee_objects_count > 2 {
        "Active"
    } else if average_bee_score > 0.7 {
        "Moderate Activity"
    } else if average_bee_score > 0.5 {
        "Low Activity"
    } else {
        "Unknown"
    }
}

fn now_iso() -> String {
    chrono::Local::now().naive_local().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::vision_structs::{
        BoundingPoly, ImagePropertiesAnnotation, LabelAnnotation, LocalizedObjectAnnotation,
        RgbColor,
    };
    use rstest::rstest;

    #[rstest]
    #[case("Honeybee", true)]
    #[case("HONEYCOMB", true)]
    #[case("Queen bee on frame", true)]
    #[case("Insect", false)]
    #[case("Flower", false)]
    fn bee_term_matching(#[case] term: &str, #[case] expected: bool) {
        assert_eq!(is_bee_related(term), expected);
    }

    #[rstest]
    #[case(0.95, 3, "Active")]
    #[case(0.95, 2, "Moderate Activity")] // high confidence but too few objects
    #[case(0.75, 0, "Moderate Activity")]
    #[case(0.6, 0, "Low Activity")]
    #[case(0.3, 5, "Unknown")]
    #[case(0.0, 0, "Unknown")]
    fn hive_state_bucketing(#[case] score: f64, #[case] objects: usize, #[case] expected: &str) {
        assert_eq!(suggest_hive_state(score, objects), expected);
    }

    fn label(description: &str, score: f64) -> LabelAnnotation {
        LabelAnnotation {
            description: description.to_string(),
            score,
        }
    }

    #[test]
    fn report_from_annotations() {
        let result = AnnotateResult {
            label_annotations: vec![label("Honeybee", 0.94), label("Pattern", 0.45)],
            image_properties_annotation: Some(ImagePropertiesAnnotation {
                dominant_colors: crate::api::vision_structs::DominantColors {
                    colors: vec![ColorInfo {
                        color: RgbColor {
                            red: 240.0,
                            green: 200.0,
                            blue: 80.0,
                        },
                        score: 0.35,
                        pixel_fraction: 0.25,
                    }],
                },
            }),
            localized_object_annotations: vec![LocalizedObjectAnnotation {
                name: "Insect".to_string(),
                score: 0.87,
                bounding_poly: BoundingPoly {
                    normalized_vertices: vec![NormalizedVertex { x: 0.2, y: 0.3 }],
                },
            }],
            error: None,
        };

        let report = process_annotations(&result);
        assert_eq!(report.labels.len(), 2);
        assert!(report.labels[0].bee_related);
        assert_eq!(report.colors[0].hex, "#f0c850");
        assert!(report.bee_summary.honey_colors_detected);
        assert!(!report.bee_summary.brood_colors_detected);
        assert_eq!(report.bee_summary.bee_related_terms_count, 1);
        assert_eq!(report.bee_summary.top_bee_terms, vec!["Honeybee"]);
        // One bee label at 0.94 but only one (non-bee) object localized.
        assert_eq!(report.bee_summary.suggested_hive_state, "Moderate Activity");
    }

    #[test]
    fn failure_serializes_with_only_error_fields() {
        let outcome = VisionOutcome::Failed(VisionFailure {
            error: "credentials missing".to_string(),
            timestamp: "2023-06-14T09:30:12".to_string(),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["error", "timestamp"]
        );

        let parsed: VisionOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, outcome);
    }
}
