use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::common::dates::normalize_day;
use crate::models::inspection::Inspection;
use crate::models::photo::PhotoRecord;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    inspections: Vec<Inspection>,
    last_save: String,
}

/// Session-scoped collection of inspections, grouping photos by calendar
/// day. Owned by the serving layer and passed around explicitly; there is
/// exactly one writer per session, so no locking.
///
/// Every mutation checkpoints the collection to disk on a best-effort basis:
/// a failed write is logged and the in-memory state stays authoritative for
/// the rest of the session.
pub struct InspectionLog {
    inspections: Vec<Inspection>,
    selected: Option<usize>,
    checkpoint_path: PathBuf,
}

impl InspectionLog {
    #[must_use]
    pub fn new(checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            inspections: Vec::new(),
            selected: None,
            checkpoint_path: checkpoint_path.into(),
        }
    }

    /// Restore a previous session's checkpoint, or start empty when none
    /// exists. Photos whose file no longer exists are dropped and counts
    /// recomputed; photos that only lived as raw bytes never survive a
    /// checkpoint in the first place.
    ///
    /// # Errors
    /// * If an existing checkpoint file cannot be read or parsed.
    pub fn load_or_default(checkpoint_path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let checkpoint_path = checkpoint_path.into();
        if !checkpoint_path.exists() {
            info!("No saved inspections found, starting empty");
            return Ok(Self::new(checkpoint_path));
        }

        let raw = fs::read_to_string(&checkpoint_path)?;
        let checkpoint: CheckpointFile = serde_json::from_str(&raw)?;
        let mut inspections = checkpoint.inspections;
        for inspection in &mut inspections {
            inspection.photos.retain(|photo| {
                let alive = photo
                    .file_path
                    .as_ref()
                    .is_some_and(|path| path.exists());
                if !alive {
                    warn!("Photo file not found: {}", photo.filename);
                }
                alive
            });
            inspection.photo_count = inspection.photos.len();
        }
        info!("Restored {} inspections from checkpoint", inspections.len());
        Ok(Self {
            inspections,
            selected: None,
            checkpoint_path,
        })
    }

    /// Add a photo to the inspection matching its calendar day, creating a
    /// new inspection if none matches. Returns the index of the touched
    /// inspection, which also becomes the selected one.
    ///
    /// A photo with a missing or unparseable capture date degrades to
    /// "today" rather than being rejected. Existing inspections whose own
    /// date cannot be normalized are skipped during matching.
    pub fn add_photo(&mut self, photo: PhotoRecord) -> usize {
        let day = normalize_day(&photo.date_taken).unwrap_or_else(|| {
            warn!(
                "Unparseable capture date {:?} for {}, grouping under today",
                photo.date_taken, photo.filename
            );
            Local::now().date_naive()
        });

        let index = match self
            .inspections
            .iter()
            .position(|inspection| inspection.day() == Some(day))
        {
            Some(index) => {
                self.inspections[index].push_photo(photo);
                index
            }
            None => {
                self.inspections.push(Inspection::from_photo(day, photo));
                self.inspections.len() - 1
            }
        };
        self.selected = Some(index);
        self.checkpoint_best_effort();
        index
    }

    /// Delete an inspection along with the photo files it owns. Returns
    /// false when the id is out of range.
    pub fn delete_inspection(&mut self, id: usize) -> bool {
        if id >= self.inspections.len() {
            return false;
        }
        for photo in &self.inspections[id].photos {
            let Some(path) = &photo.file_path else {
                continue;
            };
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Could not remove photo file {}: {e}", path.display());
                }
            }
        }
        self.inspections.remove(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.checkpoint_best_effort();
        true
    }

    /// Mutate one inspection's annotation fields in place, then checkpoint.
    /// Returns false when the id is out of range.
    pub fn update_inspection<F>(&mut self, id: usize, update: F) -> bool
    where
        F: FnOnce(&mut Inspection),
    {
        let Some(inspection) = self.inspections.get_mut(id) else {
            return false;
        };
        update(inspection);
        self.checkpoint_best_effort();
        true
    }

    #[must_use]
    pub fn inspections(&self) -> &[Inspection] {
        &self.inspections
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Inspection> {
        self.inspections.get(id)
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Inspection> {
        self.selected.and_then(|index| self.inspections.get(index))
    }

    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn total_photos(&self) -> usize {
        self.inspections
            .iter()
            .map(|inspection| inspection.photo_count)
            .sum()
    }

    /// Serialize the collection for export, without touching the checkpoint.
    ///
    /// # Errors
    /// * If serialization fails.
    pub fn export_json(&self) -> Result<String, CheckpointError> {
        let export = serde_json::json!({ "inspections": self.inspections });
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Write the full collection to the checkpoint file. Photo bytes are
    /// stripped by serialization; file paths survive.
    ///
    /// # Errors
    /// * If the checkpoint file cannot be written.
    pub fn checkpoint(&self) -> Result<(), CheckpointError> {
        if let Some(parent) = self.checkpoint_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let checkpoint = CheckpointFile {
            inspections: self.inspections.clone(),
            last_save: Local::now().naive_local().to_string(),
        };
        fs::write(
            &self.checkpoint_path,
            serde_json::to_string_pretty(&checkpoint)?,
        )?;
        Ok(())
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    fn checkpoint_best_effort(&self) {
        if let Err(e) = self.checkpoint() {
            warn!("Error saving inspections: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo_on(date_taken: &str) -> PhotoRecord {
        PhotoRecord {
            filename: format!("{date_taken}.jpg"),
            date_taken: date_taken.to_string(),
            ..PhotoRecord::default()
        }
    }

    fn log_in(dir: &tempfile::TempDir) -> InspectionLog {
        InspectionLog::new(dir.path().join("inspections.json"))
    }

    #[test]
    fn mixed_date_formats_group_onto_one_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = log_in(&dir);
        log.add_photo(photo_on("2023:06:14 09:30:12"));
        log.add_photo(photo_on("2023-06-14T16:45:00"));
        log.add_photo(photo_on("2023-06-14"));
        assert_eq!(log.inspections().len(), 1);
        assert_eq!(log.inspections()[0].photo_count, 3);
    }

    #[test]
    fn unparseable_inspection_dates_are_skipped_during_matching() {
        // Lenient legacy behavior: an inspection with a garbled date can
        // never be matched again, so a same-day photo starts a fresh one.
        let dir = tempfile::tempdir().unwrap();
        let mut log = log_in(&dir);
        log.add_photo(photo_on("2023-06-14"));
        log.update_inspection(0, |inspection| {
            inspection.date = "not a date".to_string();
        });
        log.add_photo(photo_on("2023-06-14"));
        assert_eq!(log.inspections().len(), 2);
    }

    #[test]
    fn selection_follows_the_touched_inspection() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = log_in(&dir);
        log.add_photo(photo_on("2023-06-14"));
        log.add_photo(photo_on("2023-06-20"));
        assert_eq!(log.selected_index(), Some(1));
        log.add_photo(photo_on("2023-06-14"));
        assert_eq!(log.selected_index(), Some(0));
        assert_eq!(log.total_photos(), 3);
    }
}
