use chrono::{Local, NaiveDate, NaiveDateTime};

/// EXIF capture timestamps use colons in the date part.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
/// Timestamp format stamped onto stored entries on save.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Canonical day format used for inspection grouping.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a capture timestamp into a full datetime.
///
/// Tolerates the three formats attested in real records: EXIF
/// colon-separated, ISO 8601 (with either `T` or space separator), and a
/// plain day. Returns `None` for anything else; callers decide the fallback.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, DAY_FORMAT) {
        return day.and_hms_opt(0, 0, 0);
    }
    None
}

/// Truncate a capture timestamp to calendar-day granularity.
#[must_use]
pub fn normalize_day(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Current local time in EXIF format, the fallback for photos without a
/// usable capture timestamp.
#[must_use]
pub fn now_exif_string() -> String {
    Local::now().format(EXIF_DATETIME_FORMAT).to_string()
}

/// Current local time in the `last_updated` stamp format.
#[must_use]
pub fn now_stamp() -> String {
    Local::now().format(LAST_UPDATED_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2023:06:14 09:30:12", 2023, 6, 14)]
    #[case("2023-06-14T09:30:12", 2023, 6, 14)]
    #[case("2023-06-14T09:30:12.500", 2023, 6, 14)]
    #[case("2023-06-14 09:30:12", 2023, 6, 14)]
    #[case("2023-06-14", 2023, 6, 14)]
    fn attested_formats_normalize(
        #[case] raw: &str,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
    ) {
        let expected = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        assert_eq!(normalize_day(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("Unknown")]
    #[case("14/06/2023")]
    fn unparseable_dates_yield_none(#[case] raw: &str) {
        assert_eq!(normalize_day(raw), None);
    }
}
