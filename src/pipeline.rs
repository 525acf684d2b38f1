/// Single-shot pipeline run.
///
/// One invocation does exactly this:
/// 1. Computes the fetch window on the source's clock
/// 2. Has the source fetch and reduce everything in that window
/// 3. Maps provider element ids to InfoEx elements, dropping unknown ones
/// 4. Assembles the 29-cell record, stamped with the window end
///
/// There is no loop, retry or persisted state; scheduling is cron's job.

use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::analysis::reduce::ReductionPlan;
use crate::config::{self, AutowxConfig};
use crate::error::{Result, Warning};
use crate::ingest::custom::CustomSource;
use crate::ingest::mesowest::MesowestSource;
use crate::ingest::nrcs::NrcsSource;
use crate::ingest::Source;
use crate::model::{FetchWindow, Provider, Readings, UnitSystem, WindMode};
use crate::record::{self, ObservationRecord};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What the pipeline needs once a source has been chosen.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub location_id: String,
    pub units: UnitSystem,
    /// Destination timezone for the record's date, time and zone name.
    pub timezone: Tz,
    pub hn24: bool,
    pub wind_mode: WindMode,
}

impl PipelineConfig {
    pub fn from_config(config: &AutowxConfig) -> Result<Self> {
        Ok(Self {
            location_id: config.infoex.location_uuid.clone(),
            units: config.station.units,
            timezone: config.station.timezone()?,
            hn24: config.station.hn24,
            wind_mode: config.station.wind_mode,
        })
    }

    pub fn fetch_hours(&self) -> i64 {
        config::fetch_hours(self.hn24, self.wind_mode)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Everything one run produced. A sparse record is still a success.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub window: FetchWindow,
    pub readings: Readings,
    pub record: ObservationRecord,
    pub warnings: Vec<Warning>,
}

impl RunOutcome {
    /// Number of measurement cells that made it into the record.
    pub fn reported(&self) -> usize {
        self.record.reported()
    }

    /// True when the source reported no elements at all.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn Source>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, source: Box<dyn Source>) -> Self {
        Self { config, source }
    }

    /// Builds the pipeline and its source from a validated config file.
    pub fn from_config(config: &AutowxConfig) -> Result<Self> {
        let pipeline_config = PipelineConfig::from_config(config)?;
        let source = build_source(config)?;
        Ok(Self::new(pipeline_config, source))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fetch_window(&self, now: DateTime<Utc>) -> FetchWindow {
        FetchWindow::ending_at(now, self.source.clock_zone(), self.config.fetch_hours())
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.run_at(Utc::now())
    }

    /// Runs as if the clock read `now`.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let window = self.fetch_window(now);
        let provider = self.source.provider();
        info!(
            provider = %provider,
            begin = %window.begin,
            end = %window.end,
            hours = window.hours(),
            "collecting observations"
        );

        let started = Instant::now();
        let readings = self.source.collect(&window)?;
        info!(
            provider = %provider,
            elements = readings.values.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection complete"
        );

        for (element, value) in &readings.values {
            match value {
                Some(v) => debug!(element = %element, value = v, "reduced reading"),
                None => debug!(element = %element, "no data in window"),
            }
        }

        let assembled = record::assemble_readings(
            &readings,
            self.config.units,
            &self.config.location_id,
            window.end,
            self.config.timezone,
        );
        for warning in &assembled.warnings {
            warn!("{}", warning);
        }

        let outcome = RunOutcome {
            window,
            readings,
            record: assembled.record,
            warnings: assembled.warnings,
        };
        info!(reported = outcome.reported(), "record assembled");
        Ok(outcome)
    }
}

/// Chooses and builds the configured source.
pub fn build_source(config: &AutowxConfig) -> Result<Box<dyn Source>> {
    let station = &config.station;
    let plan = ReductionPlan::new(station.provider, station.wind_mode, station.hn24);

    let source: Box<dyn Source> = match station.provider {
        Provider::Nrcs => Box::new(NrcsSource::new(
            station.required("station_id", &station.station_id)?,
            station.desired_data.clone(),
            station.timezone()?,
            plan,
        )?),
        Provider::Mesowest => Box::new(MesowestSource::new(
            station.required("token", &station.token)?,
            station.required("station_id", &station.station_id)?,
            station.desired_data.clone(),
            station.units,
            plan,
        )?),
        Provider::Custom => Box::new(CustomSource::new(
            station.required("command", &station.command)?,
            station.args.clone(),
            station.units,
        )),
    };

    Ok(source)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
