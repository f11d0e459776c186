use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::dates::{normalize_day, DAY_FORMAT};
use crate::models::photo::PhotoRecord;

/// One hive-visit event: every photo taken on the same calendar day.
///
/// `date` is written in canonical `YYYY-MM-DD` form for new inspections, but
/// checkpoints from older sessions may carry EXIF or ISO datetime strings —
/// or garbage. Grouping normalizes through [`Inspection::day`] and skips
/// entries whose date cannot be parsed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Inspection {
    pub date: String,
    pub location: String,
    pub photos: Vec<PhotoRecord>,
    /// Invariant: always equals `photos.len()`.
    pub photo_count: usize,
    pub weather_summary: String,
}

impl Default for Inspection {
    fn default() -> Self {
        Self {
            date: String::new(),
            location: "Unknown".to_string(),
            photos: Vec::new(),
            photo_count: 0,
            weather_summary: "Not recorded".to_string(),
        }
    }
}

impl Inspection {
    /// Start a new inspection from its first photo.
    #[must_use]
    pub fn from_photo(day: NaiveDate, photo: PhotoRecord) -> Self {
        Self {
            date: day.format(DAY_FORMAT).to_string(),
            location: photo.location_string(),
            photos: vec![photo],
            photo_count: 1,
            weather_summary: "Not recorded".to_string(),
        }
    }

    /// The calendar day this inspection covers, if its date is parseable.
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        normalize_day(&self.date)
    }

    /// Append a photo, keeping the photo count in sync and backfilling the
    /// location if it was unknown and the photo carries GPS.
    pub fn push_photo(&mut self, photo: PhotoRecord) {
        if self.location == "Unknown" && photo.has_gps() {
            self.location = photo.location_string();
        }
        self.photos.push(photo);
        self.photo_count = self.photos.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_tolerates_legacy_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 6, 14);
        for raw in ["2023-06-14", "2023:06:14 09:30:12", "2023-06-14T09:30:12"] {
            let inspection = Inspection {
                date: raw.to_string(),
                ..Inspection::default()
            };
            assert_eq!(inspection.day(), expected, "format: {raw}");
        }

        let garbled = Inspection {
            date: "last tuesday".to_string(),
            ..Inspection::default()
        };
        assert_eq!(garbled.day(), None);
    }

    #[test]
    fn push_photo_backfills_unknown_location() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 14).unwrap();
        let mut inspection = Inspection::from_photo(day, PhotoRecord::default());
        assert_eq!(inspection.location, "Unknown");

        let with_gps = PhotoRecord {
            lat: Some(52.0907),
            lon: Some(5.1214),
            ..PhotoRecord::default()
        };
        inspection.push_photo(with_gps);
        assert_eq!(inspection.location, "52.090700, 5.121400");
        assert_eq!(inspection.photo_count, 2);

        // An already-known location is not overwritten.
        let elsewhere = PhotoRecord {
            lat: Some(48.8566),
            lon: Some(2.3522),
            ..PhotoRecord::default()
        };
        inspection.push_photo(elsewhere);
        assert_eq!(inspection.location, "52.090700, 5.121400");
        assert_eq!(inspection.photo_count, 3);
    }
}
