use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::vision::VisionOutcome;
use crate::api::weather::WeatherSample;
use crate::models::entry::StoredEntry;

/// A processed photo with its extracted metadata. Exactly one of
/// `file_path` / `data` is present: photos ingested from disk carry their
/// path, downloaded photos carry raw bytes. Bytes are never serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoRecord {
    pub filename: String,
    /// Capture timestamp, EXIF format or ISO. Falls back to the ingest time.
    pub date_taken: String,
    /// Where the timestamp came from: "EXIF" or "File Creation Date".
    pub date_source: String,
    pub camera_model: String,
    pub image_resolution: String,
    /// Dominant colors, most dominant first, as `#rrggbb`.
    pub palette_hex: Vec<String>,
    pub file_path: Option<PathBuf>,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_analysis: Option<VisionOutcome>,
}

impl PhotoRecord {
    /// GPS position formatted for display, `"lat, lon"` to six decimals.
    #[must_use]
    pub fn location_string(&self) -> String {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => format!("{lat:.6}, {lon:.6}"),
            _ => "Unknown".to_string(),
        }
    }

    #[must_use]
    pub fn has_gps(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    /// Flatten this photo into a storable entry with the given annotations.
    /// `last_updated` is left empty; the store stamps it on save.
    #[must_use]
    pub fn to_entry(&self, hive_state: &str, notes: &str) -> StoredEntry {
        let palette_slot = |i: usize| self.palette_hex.get(i).cloned().unwrap_or_default();
        let weather = self.weather.clone();
        StoredEntry {
            date: self.date_taken.clone(),
            date_source: self.date_source.clone(),
            filename: self.filename.clone(),
            image_resolution: self.image_resolution.clone(),
            camera_model: self.camera_model.clone(),
            dominant_color: palette_slot(0),
            palette_1: palette_slot(0),
            palette_2: palette_slot(1),
            palette_3: palette_slot(2),
            palette_4: palette_slot(3),
            palette_5: palette_slot(4),
            weather_datetime: weather
                .as_ref()
                .map(|w| w.weather_datetime.clone())
                .unwrap_or_default(),
            weather_temperature_c: weather.as_ref().and_then(|w| w.weather_temperature_c),
            weather_precipitation_mm: weather.as_ref().and_then(|w| w.weather_precipitation_mm),
            weather_cloud_cover_percent: weather
                .as_ref()
                .and_then(|w| w.weather_cloud_cover_percent),
            weather_wind_speed_kph: weather.as_ref().and_then(|w| w.weather_wind_speed_kph),
            weather_code: weather.as_ref().and_then(|w| w.weather_code),
            weather_source: weather.map(|w| w.weather_source).unwrap_or_default(),
            hive_state: hive_state.to_string(),
            notes: notes.to_string(),
            gps_lat: self.lat,
            gps_long: self.lon,
            last_updated: String::new(),
            vision_analysis: self.vision_analysis.clone(),
            extras: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> PhotoRecord {
        PhotoRecord {
            filename: "frame.jpg".to_string(),
            date_taken: "2023:06:14 09:30:12".to_string(),
            date_source: "EXIF".to_string(),
            camera_model: "Pixel 7".to_string(),
            image_resolution: "4032 x 3024".to_string(),
            palette_hex: vec!["#ffc300".to_string(), "#b38600".to_string()],
            lat: Some(52.0907),
            lon: Some(5.1214),
            data: Some(vec![0xff, 0xd8]),
            ..PhotoRecord::default()
        }
    }

    #[test]
    fn location_formats_to_six_decimals() {
        assert_eq!(photo().location_string(), "52.090700, 5.121400");
        assert_eq!(PhotoRecord::default().location_string(), "Unknown");
    }

    #[test]
    fn entry_fills_palette_slots_and_gps() {
        let entry = photo().to_entry("Calm/Normal", "strong colony");
        assert_eq!(entry.dominant_color, "#ffc300");
        assert_eq!(entry.palette_1, "#ffc300");
        assert_eq!(entry.palette_2, "#b38600");
        assert_eq!(entry.palette_3, "");
        assert_eq!(entry.gps_lat, Some(52.0907));
        assert_eq!(entry.hive_state, "Calm/Normal");
        assert_eq!(entry.weather_source, "");
    }

    #[test]
    fn raw_bytes_never_serialize() {
        let json = serde_json::to_value(photo()).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["filename"], "frame.jpg");
    }
}
