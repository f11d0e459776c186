use chrono::{NaiveDateTime, Timelike};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::common::dates;

/// One hourly weather observation, flattened to the field names used by the
/// record store. A non-nominal lookup keeps this exact shape: all numeric
/// fields null and `weather_source` starting with `"Error:"` — callers treat
/// that prefix as the failure signal, there is no separate error channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSample {
    pub weather_datetime: String,
    #[serde(rename = "weather_temperature_C")]
    pub weather_temperature_c: Option<f64>,
    pub weather_precipitation_mm: Option<f64>,
    pub weather_cloud_cover_percent: Option<f64>,
    pub weather_wind_speed_kph: Option<f64>,
    pub weather_code: Option<i64>,
    pub weather_source: String,
}

impl WeatherSample {
    /// Sentinel sample for a failed lookup.
    #[must_use]
    pub fn unavailable(datetime: String, cause: &str) -> Self {
        Self {
            weather_datetime: datetime,
            weather_temperature_c: None,
            weather_precipitation_mm: None,
            weather_cloud_cover_percent: None,
            weather_wind_speed_kph: None,
            weather_code: None,
            weather_source: format!("Error: {cause}"),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.weather_source.starts_with("Error:")
    }

    /// Short free-text summary for an inspection record.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_error() {
            return "Not recorded".to_string();
        }
        let temperature = self
            .weather_temperature_c
            .map_or_else(|| "?".to_string(), |t| format!("{t}"));
        let wind = self
            .weather_wind_speed_kph
            .map_or_else(|| "?".to_string(), |w| format!("{w}"));
        format!("{temperature}°C, wind {wind} km/h ({})", self.weather_source)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unparseable hourly timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Hourly series is empty")]
    EmptySeries,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: HourlySeries,
}

/// The hourly arrays of the Open-Meteo archive API. Individual samples can
/// be null even when the series itself is present.
#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    cloudcover: Vec<Option<f64>>,
    #[serde(default)]
    windspeed_10m: Vec<Option<f64>>,
    #[serde(default)]
    weathercode: Vec<Option<i64>>,
}

pub struct WeatherClient {
    http_client: Client,
    endpoint: String,
}

impl WeatherClient {
    /// Create weather client.
    ///
    /// # Panics
    /// if it can't create the underlying HTTP client.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: endpoint.to_string(),
        }
    }

    /// Retrieve historical weather for a location and local capture time,
    /// selecting the hourly sample whose hour of day is closest to the
    /// requested hour (earliest index wins on exact ties).
    ///
    /// Never fails: missing inputs and HTTP/parsing failures degrade to a
    /// sentinel sample with a descriptive `weather_source`.
    pub async fn lookup(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        datetime: Option<NaiveDateTime>,
    ) -> WeatherSample {
        let datetime_str = datetime.map_or_else(
            || chrono::Local::now().naive_local().to_string(),
            |dt| dt.to_string(),
        );
        let (Some(lat), Some(lon), Some(dt)) = (latitude, longitude, datetime) else {
            return WeatherSample::unavailable(
                datetime_str,
                "Missing location or date information",
            );
        };

        match self.fetch(lat, lon, dt).await {
            Ok(sample) => sample,
            Err(e) => {
                debug!("Weather lookup failed: {e}");
                WeatherSample::unavailable(datetime_str, &e.to_string())
            }
        }
    }

    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        datetime: NaiveDateTime,
    ) -> Result<WeatherSample, WeatherError> {
        let date_str = datetime.format(dates::DAY_FORMAT).to_string();
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", date_str.clone()),
                ("end_date", date_str),
                (
                    "hourly",
                    "temperature_2m,precipitation,cloudcover,windspeed_10m,weathercode"
                        .to_string(),
                ),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let archive: ArchiveResponse = response.json().await?;

        let times = parse_hourly_times(&archive.hourly.time)?;
        let index = closest_hour_index(&times, datetime.hour()).ok_or(WeatherError::EmptySeries)?;

        let hourly = &archive.hourly;
        Ok(WeatherSample {
            weather_datetime: times[index].to_string(),
            weather_temperature_c: value_at(&hourly.temperature_2m, index),
            weather_precipitation_mm: value_at(&hourly.precipitation, index),
            weather_cloud_cover_percent: value_at(&hourly.cloudcover, index),
            weather_wind_speed_kph: value_at(&hourly.windspeed_10m, index),
            weather_code: value_at(&hourly.weathercode, index),
            weather_source: "Open-Meteo API".to_string(),
        })
    }
}

fn parse_hourly_times(raw: &[String]) -> Result<Vec<NaiveDateTime>, WeatherError> {
    raw.iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
                .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S"))
                .map_err(WeatherError::from)
        })
        .collect()
}

fn value_at<T: Copy>(series: &[Option<T>], index: usize) -> Option<T> {
    series.get(index).copied().flatten()
}

/// Index of the sample whose hour of day is closest to `hour`. `min_by_key`
/// keeps the first minimum, which gives the earliest-index tie-break.
fn closest_hour_index(times: &[NaiveDateTime], hour: u32) -> Option<usize> {
    (0..times.len()).min_by_key(|&i| (i64::from(times[i].hour()) - i64::from(hour)).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn series(hours: &[u32]) -> Vec<NaiveDateTime> {
        let day = NaiveDate::from_ymd_opt(2023, 6, 14).unwrap();
        hours
            .iter()
            .map(|&h| day.and_hms_opt(h, 0, 0).unwrap())
            .collect()
    }

    #[rstest]
    #[case(&[12, 13, 14, 15, 16], 14, 2)] // exact match
    #[case(&[12, 13, 15, 16], 14, 1)] // tie between 13 and 15; earlier index wins
    #[case(&[0, 1, 2], 23, 2)]
    #[case(&[9], 14, 0)]
    fn closest_hour_selection(#[case] hours: &[u32], #[case] hour: u32, #[case] expected: usize) {
        assert_eq!(closest_hour_index(&series(hours), hour), Some(expected));
    }

    #[test]
    fn empty_series_has_no_closest_hour() {
        assert_eq!(closest_hour_index(&[], 14), None);
    }

    #[test]
    fn unavailable_sample_nulls_every_numeric_field() {
        let sample = WeatherSample::unavailable("2023-06-14 14:00:00".to_string(), "no GPS");
        assert!(sample.weather_source.starts_with("Error:"));
        assert!(sample.is_error());
        assert_eq!(sample.weather_temperature_c, None);
        assert_eq!(sample.weather_precipitation_mm, None);
        assert_eq!(sample.weather_cloud_cover_percent, None);
        assert_eq!(sample.weather_wind_speed_kph, None);
        assert_eq!(sample.weather_code, None);
        assert_eq!(sample.summary(), "Not recorded");
    }

    #[test]
    fn hourly_time_formats_parse() {
        let parsed = parse_hourly_times(&[
            "2023-06-14T00:00".to_string(),
            "2023-06-14T01:00:00".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parse_hourly_times(&["14 June".to_string()]).is_err());
    }
}
