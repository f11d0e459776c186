use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use hive_tracker::api::vision::VisionClient;
use hive_tracker::api::weather::{WeatherClient, WeatherSample};
use hive_tracker::common::dates;
use hive_tracker::common::image_utils::is_image_file;
use hive_tracker::common::settings::{load_settings, Settings};
use hive_tracker::inspections::InspectionLog;
use hive_tracker::models::photo::PhotoRecord;
use hive_tracker::processing::ingest::{process_image_file, UrlFetcher};
use hive_tracker::store::RecordStore;

const CHECKPOINT_FILE: &str = "inspections.json";

#[derive(Parser)]
#[command(name = "hive-tracker", version, about = "Beehive inspection photo tracker")]
struct Cli {
    /// Path to a settings file; defaults to config/settings.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the data directory from settings.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest photos from files or directories into the inspection log.
    Ingest {
        paths: Vec<PathBuf>,
        /// Look up historical weather for geotagged photos.
        #[arg(long)]
        weather: bool,
        /// Run cloud vision analysis on each photo.
        #[arg(long)]
        vision: bool,
        #[arg(long, default_value = "Unknown")]
        hive_state: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Download a photo over HTTP and ingest it.
    IngestUrl {
        url: String,
        #[arg(long)]
        weather: bool,
        #[arg(long)]
        vision: bool,
        #[arg(long, default_value = "Unknown")]
        hive_state: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Update the hive state and/or notes of a stored entry.
    Annotate {
        filename: String,
        #[arg(long)]
        hive_state: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List inspections grouped by day.
    List,
    /// List stored entries as one-line summaries.
    Summaries,
    /// Print the full stored entry for one photo.
    Show { filename: String },
    /// Delete an inspection and the photo files it owns.
    Delete { id: usize },
    /// Export all inspections as JSON.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    match cli.command {
        Command::Ingest {
            paths,
            weather,
            vision,
            hive_state,
            notes,
        } => run_ingest(&settings, &paths, weather, vision, &hive_state, &notes).await,
        Command::IngestUrl {
            url,
            weather,
            vision,
            hive_state,
            notes,
        } => run_ingest_url(&settings, &url, weather, vision, &hive_state, &notes).await,
        Command::Annotate {
            filename,
            hive_state,
            notes,
        } => run_annotate(&settings, &filename, hive_state, notes),
        Command::List => run_list(&settings),
        Command::Summaries => run_summaries(&settings),
        Command::Show { filename } => run_show(&settings, &filename),
        Command::Delete { id } => run_delete(&settings, id),
        Command::Export { output } => run_export(&settings, output.as_deref()),
    }
}

fn checkpoint_path(settings: &Settings) -> PathBuf {
    settings.data_dir.join(CHECKPOINT_FILE)
}

async fn run_ingest(
    settings: &Settings,
    paths: &[PathBuf],
    weather: bool,
    vision: bool,
    hive_state: &str,
    notes: &str,
) -> anyhow::Result<()> {
    let files = collect_image_files(paths);
    if files.is_empty() {
        warn!("No image files found in the given paths");
        return Ok(());
    }

    let store = RecordStore::from_settings(settings);
    let mut log = InspectionLog::load_or_default(checkpoint_path(settings))?;
    let weather_client = weather.then(|| WeatherClient::new(&settings.weather.endpoint));
    let vision_client = make_vision_client(settings, vision);

    for path in files {
        let photo = match process_image_file(&path, settings.palette_size) {
            Ok(photo) => photo,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        enrich_and_save(
            photo,
            &store,
            &mut log,
            weather_client.as_ref(),
            vision_client.as_ref(),
            hive_state,
            notes,
        )
        .await?;
    }
    info!(
        "🐝 {} photos across {} inspections",
        log.total_photos(),
        log.inspections().len()
    );
    Ok(())
}

async fn run_ingest_url(
    settings: &Settings,
    url: &str,
    weather: bool,
    vision: bool,
    hive_state: &str,
    notes: &str,
) -> anyhow::Result<()> {
    let store = RecordStore::from_settings(settings);
    let mut log = InspectionLog::load_or_default(checkpoint_path(settings))?;
    let weather_client = weather.then(|| WeatherClient::new(&settings.weather.endpoint));
    let vision_client = make_vision_client(settings, vision);

    let mut fetcher = UrlFetcher::new();
    let photo = fetcher.ingest_url(url, settings.palette_size).await?;
    info!("Downloaded {} ({})", photo.filename, photo.image_resolution);
    enrich_and_save(
        photo,
        &store,
        &mut log,
        weather_client.as_ref(),
        vision_client.as_ref(),
        hive_state,
        notes,
    )
    .await
}

/// Shared tail of every ingest path: optional weather and vision enrichment,
/// store upsert, then inspection grouping.
async fn enrich_and_save(
    mut photo: PhotoRecord,
    store: &RecordStore,
    log: &mut InspectionLog,
    weather_client: Option<&WeatherClient>,
    vision_client: Option<&VisionClient>,
    hive_state: &str,
    notes: &str,
) -> anyhow::Result<()> {
    if let Some(client) = weather_client {
        let captured = dates::parse_datetime(&photo.date_taken);
        photo.weather = Some(client.lookup(photo.lat, photo.lon, captured).await);
    }
    if let Some(client) = vision_client {
        let bytes = photo_bytes(&photo)?;
        photo.vision_analysis = Some(client.analyze(&bytes).await);
    }

    let mut entry = photo.to_entry(hive_state, notes);
    store.save_entry(&mut entry)?;

    let weather_summary = photo.weather.as_ref().map(WeatherSample::summary);
    let filename = photo.filename.clone();
    let index = log.add_photo(photo);
    if let Some(summary) = weather_summary {
        log.update_inspection(index, |inspection| {
            if inspection.weather_summary == "Not recorded" {
                inspection.weather_summary = summary;
            }
        });
    }
    info!("Added {filename} to inspection {index}");
    Ok(())
}

fn run_annotate(
    settings: &Settings,
    filename: &str,
    hive_state: Option<String>,
    notes: Option<String>,
) -> anyhow::Result<()> {
    let store = RecordStore::from_settings(settings);
    let Some(mut entry) = store.load_entry(filename)? else {
        anyhow::bail!("No stored entry for {filename}");
    };
    if let Some(hive_state) = hive_state {
        entry.hive_state = hive_state;
    }
    if let Some(notes) = notes {
        entry.notes = notes;
    }
    store.save_entry(&mut entry)?;
    info!("Updated entry for {filename}");
    Ok(())
}

fn run_list(settings: &Settings) -> anyhow::Result<()> {
    let log = InspectionLog::load_or_default(checkpoint_path(settings))?;
    if log.inspections().is_empty() {
        println!("No inspections recorded.");
        return Ok(());
    }
    for (index, inspection) in log.inspections().iter().enumerate() {
        println!(
            "[{index}] {} — {} photo(s), location {}, weather {}",
            inspection.date, inspection.photo_count, inspection.location, inspection.weather_summary
        );
    }
    Ok(())
}

fn run_summaries(settings: &Settings) -> anyhow::Result<()> {
    let store = RecordStore::from_settings(settings);
    let summaries = store.get_entry_summaries()?;
    if summaries.is_empty() {
        println!("No stored entries.");
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{}  {}  {}  (updated {})",
            summary.thumbnail, summary.filename, summary.hive_state, summary.last_updated
        );
    }
    Ok(())
}

fn run_show(settings: &Settings, filename: &str) -> anyhow::Result<()> {
    let store = RecordStore::from_settings(settings);
    match store.load_entry(filename)? {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => println!("No stored entry for {filename}."),
    }
    Ok(())
}

fn run_delete(settings: &Settings, id: usize) -> anyhow::Result<()> {
    let mut log = InspectionLog::load_or_default(checkpoint_path(settings))?;
    if log.delete_inspection(id) {
        info!("Deleted inspection {id}");
        Ok(())
    } else {
        anyhow::bail!("No inspection with id {id}")
    }
}

fn run_export(settings: &Settings, output: Option<&Path>) -> anyhow::Result<()> {
    let log = InspectionLog::load_or_default(checkpoint_path(settings))?;
    let json = log.export_json()?;
    match output {
        Some(path) => {
            fs::write(path, &json)?;
            info!("Exported {} inspections to {}", log.inspections().len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Expand files and directories into a flat list of image files.
fn collect_image_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() && is_image_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn make_vision_client(settings: &Settings, enabled: bool) -> Option<VisionClient> {
    if !enabled {
        return None;
    }
    match &settings.vision.api_key {
        Some(key) => Some(VisionClient::new(&settings.vision.endpoint, key)),
        None => {
            warn!("Vision analysis requested but no API key is configured (HIVE__VISION__API_KEY)");
            None
        }
    }
}

fn photo_bytes(photo: &PhotoRecord) -> anyhow::Result<Vec<u8>> {
    if let Some(data) = &photo.data {
        return Ok(data.clone());
    }
    let path = photo
        .file_path
        .as_ref()
        .context("Photo has neither bytes nor a file path")?;
    Ok(fs::read(path)?)
}
