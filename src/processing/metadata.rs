use exif::{In, Tag, Value};
use std::io::Cursor;
use tracing::debug;

/// Metadata pulled out of a photo's EXIF block. Every field is optional;
/// photos without EXIF (downloads, screenshots, strips) yield an empty meta
/// and the caller falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMeta {
    /// Capture timestamp in EXIF format, "YYYY:MM:DD HH:MM:SS".
    pub date_taken: Option<String>,
    pub camera_model: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Extract EXIF metadata from raw image bytes. Never fails: a missing or
/// unreadable EXIF block degrades to an empty [`PhotoMeta`].
#[must_use]
pub fn read_exif(bytes: &[u8]) -> PhotoMeta {
    let reader = exif::Reader::new();
    let exif = match reader.read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("Could not extract EXIF data: {e}");
            return PhotoMeta::default();
        }
    };

    PhotoMeta {
        date_taken: ascii_value(&exif, Tag::DateTimeOriginal)
            .or_else(|| ascii_value(&exif, Tag::DateTime)),
        camera_model: ascii_value(&exif, Tag::Model),
        latitude: gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        longitude: gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
    }
}

/// Pixel dimensions as a "width x height" display string, read from the
/// image header without decoding the full image.
#[must_use]
pub fn image_resolution(bytes: &[u8]) -> Option<String> {
    let size = imagesize::blob_size(bytes).ok()?;
    Some(format!("{} x {}", size.width, size.height))
}

fn ascii_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn gps_coordinate(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_hemisphere: &str,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    let decimal = dms_to_decimal(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64());
    let hemisphere = ascii_value(exif, ref_tag).unwrap_or_default();
    if hemisphere.eq_ignore_ascii_case(negative_hemisphere) {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}

/// Convert a degrees/minutes/seconds triple to decimal degrees.
#[must_use]
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_degrade_to_empty_meta() {
        let meta = read_exif(b"definitely not an image");
        assert_eq!(meta, PhotoMeta::default());
        assert_eq!(image_resolution(b"definitely not an image"), None);
    }

    #[test]
    fn dms_conversion() {
        let decimal = dms_to_decimal(52.0, 5.0, 26.4);
        assert!((decimal - 52.0907).abs() < 1e-4);
    }

    #[test]
    fn resolution_reads_from_png_header() {
        let image = image::RgbImage::from_pixel(12, 8, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        assert_eq!(image_resolution(&bytes), Some("12 x 8".to_string()));
    }
}
