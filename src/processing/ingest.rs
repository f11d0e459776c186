use reqwest::Client;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::common::dates;
use crate::common::image_utils::{normalize_path, rgb_to_hex};
use crate::processing::{metadata, palette};

use crate::models::photo::PhotoRecord;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),
}

/// Turn raw image bytes into a [`PhotoRecord`]: EXIF metadata, resolution,
/// and dominant color palette. Never fails; every extraction step degrades
/// to a sensible default so a photo is never rejected at ingest.
///
/// Photos with a `file_path` do not retain their bytes; pathless photos
/// (downloads) keep them in memory.
#[must_use]
pub fn process_image_bytes(
    bytes: Vec<u8>,
    filename: &str,
    file_path: Option<PathBuf>,
    palette_size: usize,
) -> PhotoRecord {
    let meta = metadata::read_exif(&bytes);
    let (date_taken, date_source) = match meta.date_taken {
        Some(date) => (date, "EXIF".to_string()),
        None => (dates::now_exif_string(), "File Creation Date".to_string()),
    };
    let image_resolution =
        metadata::image_resolution(&bytes).unwrap_or_else(|| "Unknown".to_string());
    let palette_hex: Vec<String> = match palette::extract_palette(&bytes, palette_size) {
        Ok(colors) => colors.into_iter().map(rgb_to_hex).collect(),
        Err(e) => {
            warn!("Could not extract color palette for {filename}: {e}");
            palette::FALLBACK_PALETTE
                .iter()
                .copied()
                .map(rgb_to_hex)
                .collect()
        }
    };

    let data = if file_path.is_none() { Some(bytes) } else { None };
    PhotoRecord {
        filename: filename.to_string(),
        date_taken,
        date_source,
        camera_model: meta.camera_model.unwrap_or_else(|| "Unknown".to_string()),
        image_resolution,
        palette_hex,
        file_path,
        data,
        lat: meta.latitude,
        lon: meta.longitude,
        weather: None,
        vision_analysis: None,
    }
}

/// Ingest a photo from disk.
///
/// # Errors
/// * [`IngestError::Read`] if the file cannot be read.
pub fn process_image_file(path: &Path, palette_size: usize) -> Result<PhotoRecord, IngestError> {
    let bytes = fs::read(path).map_err(|source| IngestError::Read {
        path: normalize_path(path),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "image.jpg".to_string());
    Ok(process_image_bytes(
        bytes,
        &filename,
        Some(path.to_path_buf()),
        palette_size,
    ))
}

/// Downloads photos over HTTP with a per-session in-memory byte cache, so
/// re-ingesting the same URL within a session costs nothing.
pub struct UrlFetcher {
    http_client: Client,
    cache: HashMap<String, Vec<u8>>,
}

impl UrlFetcher {
    /// # Panics
    ///
    /// Panics when the HTTP client cannot be constructed.
    #[must_use]
    pub fn new() -> Self {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| panic!("Failed to build url fetcher client: {e}"));
        Self {
            http_client,
            cache: HashMap::new(),
        }
    }

    /// Fetch the bytes behind a URL, serving repeats from the cache.
    ///
    /// # Errors
    /// * [`IngestError::Download`] on connection failure or a non-success
    ///   status.
    pub async fn fetch(&mut self, url: &str) -> Result<Vec<u8>, IngestError> {
        if let Some(bytes) = self.cache.get(url) {
            debug!("Serving {url} from cache");
            return Ok(bytes.clone());
        }
        let response = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        self.cache.insert(url.to_string(), bytes.clone());
        Ok(bytes)
    }

    /// Fetch and process a photo in one step. The record carries its bytes
    /// in memory and has no file path.
    ///
    /// # Errors
    /// * [`IngestError::Download`] if the fetch fails.
    pub async fn ingest_url(
        &mut self,
        url: &str,
        palette_size: usize,
    ) -> Result<PhotoRecord, IngestError> {
        let bytes = self.fetch(url).await?;
        let filename = filename_from_url(url);
        Ok(process_image_bytes(bytes, &filename, None, palette_size))
    }
}

impl Default for UrlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a filename from a URL's last path segment, ignoring the query
/// string. URLs without a usable segment get a generic name.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    let segment = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.last().map(str::to_string))
            .filter(|segment| !segment.is_empty())
    });
    segment.unwrap_or_else(|| "image_from_url.jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/hives/frame.jpg?size=large", "frame.jpg")]
    #[case("https://drive.google.com/uc?export=view&id=abc123", "uc")]
    #[case("https://example.com/", "image_from_url.jpg")]
    #[case("not a url", "image_from_url.jpg")]
    fn url_filenames(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(filename_from_url(url), expected);
    }

    #[test]
    fn undecodable_bytes_fall_back_to_honey_palette() {
        let photo = process_image_bytes(b"not an image".to_vec(), "frame.jpg", None, 5);
        assert_eq!(photo.date_source, "File Creation Date");
        assert_eq!(photo.image_resolution, "Unknown");
        assert_eq!(photo.camera_model, "Unknown");
        assert_eq!(photo.palette_hex[0], "#ffdf00");
        assert_eq!(photo.palette_hex.len(), 5);
        // Pathless photos keep their bytes.
        assert!(photo.data.is_some());
        assert!(photo.file_path.is_none());
    }

    #[test]
    fn disk_photos_carry_a_path_instead_of_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([246, 174, 45]));
        image.save(&path).unwrap();

        let photo = process_image_file(&path, 5).unwrap();
        assert_eq!(photo.filename, "frame.png");
        assert_eq!(photo.image_resolution, "4 x 4");
        assert_eq!(photo.palette_hex, vec!["#f6ae2d".to_string()]);
        assert!(photo.data.is_none());
        assert_eq!(photo.file_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            process_image_file(Path::new("/nope/frame.jpg"), 5),
            Err(IngestError::Read { .. })
        ));
    }
}
