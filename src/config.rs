/// Run configuration loader - parses autowx.toml
///
/// One file describes one InfoEx location and the upstream station that
/// feeds it. Everything is validated up front so a bad key fails the run
/// before any network traffic.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use chrono_tz::Tz;

use crate::error::{PipelineError, Result};
use crate::mapping;
use crate::model::{CanonicalElement, Provider, UnitSystem, WindMode};

pub const DEFAULT_CSV_FILENAME: &str = "infoex-autowx.csv";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Window for plain point readings.
pub const SHORT_WINDOW_HOURS: i64 = 3;
/// Window when HN24 or averaged wind needs a full day of samples.
pub const LONG_WINDOW_HOURS: i64 = 24;

/// Root of autowx.toml
#[derive(Debug, Clone, Deserialize)]
pub struct AutowxConfig {
    pub infoex: InfoexConfig,
    pub station: StationConfig,
}

/// Destination side: which InfoEx location the record belongs to and
/// where the CSV lands.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoexConfig {
    pub location_uuid: String,
    #[serde(default = "default_csv_filename")]
    pub csv_filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    #[serde(rename = "type")]
    pub provider: Provider,

    // nrcs: station triplet, mesowest: STID
    #[serde(default)]
    pub station_id: Option<String>,

    // Provider element ids; custom programs choose their own.
    #[serde(default)]
    pub desired_data: Vec<String>,

    #[serde(default)]
    pub units: UnitSystem,

    #[serde(default = "default_timezone")]
    pub tz: String,

    #[serde(default)]
    pub hn24: bool,

    #[serde(default)]
    pub wind_mode: WindMode,

    // mesowest only
    #[serde(default)]
    pub token: Option<String>,

    // custom only
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Hours of data a run fetches: a full day whenever HN24 or averaged wind
/// needs it, otherwise just enough for the latest readings.
pub fn fetch_hours(hn24: bool, wind_mode: WindMode) -> i64 {
    if hn24 || wind_mode == WindMode::Average {
        LONG_WINDOW_HOURS
    } else {
        SHORT_WINDOW_HOURS
    }
}

fn default_csv_filename() -> String {
    DEFAULT_CSV_FILENAME.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl StationConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.tz
            .parse::<Tz>()
            .map_err(|_| PipelineError::config(format!("unknown timezone '{}'", self.tz)))
    }

    pub fn fetch_hours(&self) -> i64 {
        fetch_hours(self.hn24, self.wind_mode)
    }

    /// Value of a key the provider requires, rejecting absent and blank.
    pub fn required<'a>(&self, key: &str, value: &'a Option<String>) -> Result<&'a str> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(PipelineError::config(format!(
                "station.{} is required for {} stations",
                key, self.provider
            ))),
        }
    }
}

impl AutowxConfig {
    /// Reads, parses and validates a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AutowxConfig = toml::from_str(contents)
            .map_err(|e| PipelineError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.infoex.location_uuid.trim().is_empty() {
            return Err(PipelineError::config("infoex.location_uuid must not be empty"));
        }
        if self.infoex.csv_filename.trim().is_empty() {
            return Err(PipelineError::config("infoex.csv_filename must not be empty"));
        }

        let station = &self.station;
        station.timezone()?;

        match station.provider {
            Provider::Nrcs => {
                station.required("station_id", &station.station_id)?;
            }
            Provider::Mesowest => {
                station.required("station_id", &station.station_id)?;
                station.required("token", &station.token)?;
            }
            Provider::Custom => {
                station.required("command", &station.command)?;
            }
        }

        if station.provider != Provider::Custom && station.desired_data.is_empty() {
            return Err(PipelineError::config(format!(
                "station.desired_data must list at least one {} element",
                station.provider
            )));
        }
        // HN24 is derived from the snow depth series, which has to be fetched.
        if station.hn24 && station.provider != Provider::Custom {
            if let Some(depth) = mapping::provider_id(station.provider, CanonicalElement::HS) {
                if !station.desired_data.iter().any(|e| e == depth) {
                    return Err(PipelineError::config(format!(
                        "station.hn24 needs '{}' in station.desired_data",
                        depth
                    )));
                }
            }
        }
        if let Some(blank) = station.desired_data.iter().position(|e| e.trim().is_empty()) {
            return Err(PipelineError::config(format!(
                "station.desired_data entry {} is empty",
                blank
            )));
        }

        Ok(())
    }
}
