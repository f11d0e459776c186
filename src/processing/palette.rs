use image::imageops::FilterType;
use std::collections::HashMap;

/// Honey-and-comb palette used when extraction fails, so downstream consumers
/// always have five swatches to work with.
pub const FALLBACK_PALETTE: [(u8, u8, u8); 5] = [
    (255, 223, 0),
    (246, 174, 45),
    (242, 100, 25),
    (206, 18, 18),
    (0, 0, 0),
];

/// Images larger than this get downsampled before bucketing.
const SAMPLE_EDGE: u32 = 64;

#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image has no pixels")]
    Empty,
}

/// Extract the `color_count` most dominant colors from raw image bytes,
/// most dominant first.
///
/// Pixels are grouped into coarse buckets (4 bits per channel) and each
/// bucket reports the average of its members, so near-identical shades
/// collapse into one swatch instead of crowding out distinct colors.
///
/// # Errors
/// * [`PaletteError::Decode`] if the bytes are not a decodable image.
/// * [`PaletteError::Empty`] if the image has zero pixels.
pub fn extract_palette(
    bytes: &[u8],
    color_count: usize,
) -> Result<Vec<(u8, u8, u8)>, PaletteError> {
    let decoded = image::load_from_memory(bytes)?;
    let sampled = if decoded.width() > SAMPLE_EDGE || decoded.height() > SAMPLE_EDGE {
        decoded.resize(SAMPLE_EDGE, SAMPLE_EDGE, FilterType::Triangle)
    } else {
        decoded
    };
    let pixels = sampled.to_rgb8();
    if pixels.pixels().len() == 0 {
        return Err(PaletteError::Empty);
    }

    // (r sum, g sum, b sum, pixel count) per bucket.
    let mut buckets: HashMap<u16, (u64, u64, u64, u64)> = HashMap::new();
    for pixel in pixels.pixels() {
        let key = (u16::from(pixel[0] >> 4) << 8)
            | (u16::from(pixel[1] >> 4) << 4)
            | u16::from(pixel[2] >> 4);
        let bucket = buckets.entry(key).or_default();
        bucket.0 += u64::from(pixel[0]);
        bucket.1 += u64::from(pixel[1]);
        bucket.2 += u64::from(pixel[2]);
        bucket.3 += 1;
    }

    let mut ranked: Vec<(u16, (u64, u64, u64, u64))> = buckets.into_iter().collect();
    // Bucket key as tie-breaker keeps the ordering deterministic.
    ranked.sort_by(|(key_a, a), (key_b, b)| b.3.cmp(&a.3).then(key_a.cmp(key_b)));

    Ok(ranked
        .into_iter()
        .take(color_count)
        .map(|(_, (r, g, b, n))| ((r / n) as u8, (g / n) as u8, (b / n) as u8))
        .collect())
}
