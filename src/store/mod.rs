use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::common::dates;
use crate::common::settings::Settings;
use crate::models::entry::{EntrySummary, StoredEntry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Caller contract violation, never recovered into a soft failure.
    #[error("Entry is missing the required filename field")]
    MissingFilename,
    #[error("Tabular store error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Hierarchical store error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable upsert and retrieval of flattened photo entries, written to two
/// synchronized formats: a CSV table and a JSON list, both keyed by filename.
///
/// Both sub-stores are rewritten whole on every save — O(total rows), fine
/// for the hundreds-to-low-thousands scale this runs at, and assuming a
/// single writer. There is no atomicity across the two files: a crash
/// between the CSV and JSON writes can leave them inconsistent.
pub struct RecordStore {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl RecordStore {
    #[must_use]
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_path: json_path.into(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.csv_path(), settings.json_path())
    }

    /// Save or update an entry in both sub-stores, stamping `last_updated`.
    /// An entry with the same filename is replaced, never duplicated.
    ///
    /// # Errors
    /// * [`StoreError::MissingFilename`] if the filename is empty — a caller
    ///   contract violation, checked before anything is written.
    /// * A persistence variant if either sub-store cannot be rewritten;
    ///   in-memory state is unaffected and callers can surface the message.
    pub fn save_entry(&self, entry: &mut StoredEntry) -> Result<(), StoreError> {
        if entry.filename.trim().is_empty() {
            return Err(StoreError::MissingFilename);
        }
        entry.last_updated = dates::now_stamp();
        self.save_to_csv(entry)?;
        self.save_to_json(entry)?;
        debug!("Saved entry for {}", entry.filename);
        Ok(())
    }

    /// Load one entry by filename from the hierarchical store.
    /// A missing store file reads as an empty store.
    ///
    /// # Errors
    /// * If the store file exists but cannot be read or parsed.
    pub fn load_entry(&self, filename: &str) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.load_all_entries()?;
        Ok(entries.into_iter().find(|entry| entry.filename == filename))
    }

    /// Load every entry from the hierarchical store, in store order.
    ///
    /// # Errors
    /// * If the store file exists but cannot be read or parsed.
    pub fn load_all_entries(&self) -> Result<Vec<StoredEntry>, StoreError> {
        if !self.json_path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.json_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Project every entry to its browser summary, preserving store order.
    ///
    /// # Errors
    /// * If the store file exists but cannot be read or parsed.
    pub fn get_entry_summaries(&self) -> Result<Vec<EntrySummary>, StoreError> {
        let entries = self.load_all_entries()?;
        Ok(entries.iter().map(EntrySummary::from).collect())
    }

    fn save_to_csv(&self, entry: &StoredEntry) -> Result<(), StoreError> {
        let fields = entry.csv_fields();

        if !self.csv_path.exists() {
            ensure_parent(&self.csv_path)?;
            let mut writer = csv::Writer::from_path(&self.csv_path)?;
            writer.write_record(fields.iter().map(|(name, _)| name.as_str()))?;
            writer.write_record(fields.iter().map(|(_, value)| value.as_str()))?;
            writer.flush()?;
            return Ok(());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.csv_path)?;
        let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(header.len(), String::new());
            rows.push(row);
        }

        // Upsert: drop any prior row for this filename.
        if let Some(filename_index) = header.iter().position(|column| column == "filename") {
            rows.retain(|row| {
                row.get(filename_index).map(String::as_str) != Some(entry.filename.as_str())
            });
        }

        // Column reconciliation: a column present on one side but not the
        // other is filled with empty strings on both. Lossy but safe.
        for (name, _) in &fields {
            if !header.iter().any(|column| column == name) {
                header.push(name.clone());
                for row in &mut rows {
                    row.push(String::new());
                }
            }
        }
        let new_row: Vec<String> = header
            .iter()
            .map(|column| {
                fields
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            })
            .collect();
        rows.push(new_row);

        let mut writer = csv::Writer::from_path(&self.csv_path)?;
        writer.write_record(header.iter().map(String::as_str))?;
        for row in &rows {
            writer.write_record(row.iter().map(String::as_str))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn save_to_json(&self, entry: &StoredEntry) -> Result<(), StoreError> {
        let mut entries: Vec<Value> = if self.json_path.exists() {
            serde_json::from_str(&fs::read_to_string(&self.json_path)?)?
        } else {
            Vec::new()
        };
        entries.retain(|existing| {
            existing.get("filename").and_then(Value::as_str) != Some(entry.filename.as_str())
        });
        entries.push(serde_json::to_value(entry)?);

        ensure_parent(&self.json_path)?;
        fs::write(&self.json_path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
