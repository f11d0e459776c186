use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::vision::VisionOutcome;

/// Fixed header of the tabular store, in file order. Fields beyond these
/// (schema drift from older or newer writers) ride along in `extras`.
pub const CSV_COLUMNS: [&str; 23] = [
    "date",
    "date_source",
    "filename",
    "image_resolution",
    "camera_model",
    "dominant_color",
    "palette_1",
    "palette_2",
    "palette_3",
    "palette_4",
    "palette_5",
    "weather_datetime",
    "weather_temperature_C",
    "weather_precipitation_mm",
    "weather_cloud_cover_percent",
    "weather_wind_speed_kph",
    "weather_code",
    "weather_source",
    "hive_state",
    "notes",
    "gps_lat",
    "gps_long",
    "last_updated",
];

/// The durable, flattened representation of one annotated photo, uniquely
/// keyed by `filename`. The nested `vision_analysis` blob only exists in the
/// hierarchical store; it has no tabular form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredEntry {
    pub date: String,
    pub date_source: String,
    pub filename: String,
    pub image_resolution: String,
    pub camera_model: String,
    pub dominant_color: String,
    pub palette_1: String,
    pub palette_2: String,
    pub palette_3: String,
    pub palette_4: String,
    pub palette_5: String,
    pub weather_datetime: String,
    #[serde(rename = "weather_temperature_C")]
    pub weather_temperature_c: Option<f64>,
    pub weather_precipitation_mm: Option<f64>,
    pub weather_cloud_cover_percent: Option<f64>,
    pub weather_wind_speed_kph: Option<f64>,
    pub weather_code: Option<i64>,
    pub weather_source: String,
    pub hive_state: String,
    pub notes: String,
    pub gps_lat: Option<f64>,
    pub gps_long: Option<f64>,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_analysis: Option<VisionOutcome>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl StoredEntry {
    /// The tabular projection: every fixed column in order, missing values as
    /// empty strings, followed by any extra fields.
    #[must_use]
    pub fn csv_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = vec![
            cell("date", &self.date),
            cell("date_source", &self.date_source),
            cell("filename", &self.filename),
            cell("image_resolution", &self.image_resolution),
            cell("camera_model", &self.camera_model),
            cell("dominant_color", &self.dominant_color),
            cell("palette_1", &self.palette_1),
            cell("palette_2", &self.palette_2),
            cell("palette_3", &self.palette_3),
            cell("palette_4", &self.palette_4),
            cell("palette_5", &self.palette_5),
            cell("weather_datetime", &self.weather_datetime),
            num_cell("weather_temperature_C", self.weather_temperature_c),
            num_cell("weather_precipitation_mm", self.weather_precipitation_mm),
            num_cell(
                "weather_cloud_cover_percent",
                self.weather_cloud_cover_percent,
            ),
            num_cell("weather_wind_speed_kph", self.weather_wind_speed_kph),
            int_cell("weather_code", self.weather_code),
            cell("weather_source", &self.weather_source),
            cell("hive_state", &self.hive_state),
            cell("notes", &self.notes),
            num_cell("gps_lat", self.gps_lat),
            num_cell("gps_long", self.gps_long),
            cell("last_updated", &self.last_updated),
        ];
        for (key, value) in &self.extras {
            fields.push((key.clone(), value_to_cell(value)));
        }
        fields
    }
}

fn cell(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

fn num_cell(name: &str, value: Option<f64>) -> (String, String) {
    (
        name.to_string(),
        value.map(|v| v.to_string()).unwrap_or_default(),
    )
}

fn int_cell(name: &str, value: Option<i64>) -> (String, String) {
    (
        name.to_string(),
        value.map(|v| v.to_string()).unwrap_or_default(),
    )
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Projection of an entry for list/browser views. `thumbnail` carries the
/// dominant color swatch standing in for a real image thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub filename: String,
    pub date_taken: String,
    pub hive_state: String,
    pub last_updated: String,
    pub thumbnail: String,
}

impl From<&StoredEntry> for EntrySummary {
    fn from(entry: &StoredEntry) -> Self {
        let or_unknown = |s: &str| {
            if s.is_empty() {
                "Unknown".to_string()
            } else {
                s.to_string()
            }
        };
        Self {
            filename: or_unknown(&entry.filename),
            date_taken: or_unknown(&entry.date),
            hive_state: or_unknown(&entry.hive_state),
            last_updated: or_unknown(&entry.last_updated),
            thumbnail: if entry.dominant_color.is_empty() {
                "#FFFFFF".to_string()
            } else {
                entry.dominant_color.clone()
            },
        }
    }
}
