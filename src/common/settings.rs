use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overall application configuration structure.
///
/// Loaded once at startup and passed by reference to whatever needs it;
/// nothing in this crate reads configuration from ambient global state.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Settings {
    /// Folder where inspection checkpoints and photo files live.
    pub data_dir: PathBuf,
    /// Tabular store file, relative to `data_dir` unless absolute.
    pub csv_file: String,
    /// Hierarchical store file, relative to `data_dir` unless absolute.
    pub json_file: String,
    pub weather: WeatherSettings,
    pub vision: VisionSettings,
    /// Number of colors extracted per photo palette.
    pub palette_size: usize,
}

/// Configuration for the Open-Meteo historical weather lookup.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WeatherSettings {
    pub endpoint: String,
}

/// Configuration for the cloud vision annotation API.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct VisionSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            csv_file: "hive_color_log.csv".to_string(),
            json_file: "hive_color_log.json".to_string(),
            weather: WeatherSettings::default(),
            vision: VisionSettings::default(),
            palette_size: 5,
        }
    }
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://archive-api.open-meteo.com/v1/archive".to_string(),
        }
    }
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Resolve the tabular store path against `data_dir`.
    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        resolve(&self.data_dir, &self.csv_file)
    }

    /// Resolve the hierarchical store path against `data_dir`.
    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        resolve(&self.data_dir, &self.json_file)
    }
}

fn resolve(data_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

/// Load the app settings from an optional YAML file + environment variables.
///
/// Environment variables use the `HIVE` prefix with `__` as the section
/// separator, e.g. `HIVE__WEATHER__ENDPOINT`. A missing config file is fine;
/// defaults cover every field.
///
/// # Errors
/// * If the config file exists but cannot be parsed.
/// * If the merged configuration does not deserialize into [`Settings`].
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path));
    } else {
        builder = builder.add_source(config::File::with_name("config/settings").required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );
    builder.build()?.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_against_data_dir() {
        let settings = Settings::default();
        assert_eq!(settings.csv_path(), PathBuf::from("data/hive_color_log.csv"));
        assert_eq!(
            settings.json_path(),
            PathBuf::from("data/hive_color_log.json")
        );
    }

    #[test]
    fn absolute_store_paths_are_kept() {
        let settings = Settings {
            csv_file: "/tmp/log.csv".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.csv_path(), PathBuf::from("/tmp/log.csv"));
    }
}
