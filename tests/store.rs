use hive_tracker::models::entry::{StoredEntry, CSV_COLUMNS};
use hive_tracker::store::RecordStore;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn store_in(dir: &tempfile::TempDir) -> RecordStore {
    RecordStore::new(dir.path().join("log.csv"), dir.path().join("log.json"))
}

fn entry(filename: &str, hive_state: &str) -> StoredEntry {
    StoredEntry {
        filename: filename.to_string(),
        date: "2023:06:14 09:30:12".to_string(),
        date_source: "EXIF".to_string(),
        hive_state: hive_state.to_string(),
        dominant_color: "#ffc300".to_string(),
        weather_temperature_c: Some(23.5),
        ..StoredEntry::default()
    }
}

fn csv_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

fn json_objects(path: &Path) -> Vec<Value> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn saving_twice_replaces_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.save_entry(&mut entry("frame.jpg", "Calm/Normal")).unwrap();
    store.save_entry(&mut entry("other.jpg", "Unknown")).unwrap();
    store.save_entry(&mut entry("frame.jpg", "Aggressive")).unwrap();

    let (header, rows) = csv_rows(&dir.path().join("log.csv"));
    assert_eq!(header, CSV_COLUMNS.to_vec());
    assert_eq!(rows.len(), 2);

    let state_index = header.iter().position(|c| c == "hive_state").unwrap();
    let filename_index = header.iter().position(|c| c == "filename").unwrap();
    // The updated row moves to the end; untouched rows keep their order.
    assert_eq!(rows[0][filename_index], "other.jpg");
    assert_eq!(rows[1][filename_index], "frame.jpg");
    assert_eq!(rows[1][state_index], "Aggressive");

    let objects = json_objects(&dir.path().join("log.json"));
    assert_eq!(objects.len(), 2);
    let frame = objects
        .iter()
        .find(|o| o["filename"] == "frame.jpg")
        .unwrap();
    assert_eq!(frame["hive_state"], "Aggressive");
}

#[test]
fn entries_round_trip_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut saved = entry("frame.jpg", "Calm/Normal");
    store.save_entry(&mut saved).unwrap();
    assert!(!saved.last_updated.is_empty());

    let loaded = store.load_entry("frame.jpg").unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert!(store.load_entry("missing.jpg").unwrap().is_none());
}

#[test]
fn new_columns_are_backfilled_on_old_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.save_entry(&mut entry("old.jpg", "Unknown")).unwrap();
    let mut extended = entry("new.jpg", "Calm/Normal");
    extended
        .extras
        .insert("queen_spotted".to_string(), Value::Bool(true));
    store.save_entry(&mut extended).unwrap();

    let (header, rows) = csv_rows(&dir.path().join("log.csv"));
    assert_eq!(header.len(), CSV_COLUMNS.len() + 1);
    assert_eq!(header.last().unwrap(), "queen_spotted");
    // The pre-existing row gets an empty cell in the new column.
    assert_eq!(rows[0].last().unwrap(), "");
    assert_eq!(rows[1].last().unwrap(), "true");
}

#[test]
fn summaries_preserve_store_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.save_entry(&mut entry("a.jpg", "Calm/Normal")).unwrap();
    store.save_entry(&mut entry("b.jpg", "Aggressive")).unwrap();

    let summaries = store.get_entry_summaries().unwrap();
    let filenames: Vec<&str> = summaries.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(filenames, vec!["a.jpg", "b.jpg"]);
    assert_eq!(summaries[0].thumbnail, "#ffc300");
    assert_eq!(summaries[1].hive_state, "Aggressive");
}
