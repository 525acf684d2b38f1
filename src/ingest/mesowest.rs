/// MesoWest / Synoptic Data `stations/timeseries` client.
///
/// One GET returns every requested variable for the whole window, so
/// unlike NRCS there is no fan-out. Observations arrive as parallel arrays
/// keyed `<variable>_set_1`, aligned with `date_time`.
///
/// API documentation: https://docs.synopticdata.com/services/time-series
///
/// Units are requested in the configured system. Imperial asks for knots
/// explicitly so the wind conversion does not depend on the account's
/// default speed unit; metric snow depth comes back in millimetres.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::reduce::{ReductionPlan, SampleConversion};
use crate::error::{PipelineError, Result};
use crate::ingest::{http_client, Source};
use crate::model::{
    CanonicalElement, FetchWindow, Provider, RawSample, RawSeries, Readings, UnitSystem,
};
use crate::units;

pub const SYNOPTIC_TIMESERIES_URL: &str = "https://api.synopticdata.com/v2/stations/timeseries";

/// Minutes of slack the API may use to find the nearest observation.
const WITHIN_MINUTES: u32 = 60;

// ---------------------------------------------------------------------------
// Serde structures for the timeseries JSON
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TimeseriesResponse {
    #[serde(rename = "SUMMARY", default)]
    summary: Option<Summary>,
    #[serde(rename = "STATION", default)]
    station: Vec<Station>,
}

#[derive(Deserialize)]
struct Summary {
    #[serde(rename = "RESPONSE_MESSAGE", default)]
    response_message: Option<String>,
}

#[derive(Deserialize)]
struct Station {
    #[serde(rename = "OBSERVATIONS")]
    observations: Observations,
}

#[derive(Deserialize)]
struct Observations {
    date_time: Vec<String>,
    // Every `<variable>_set_N` array; values are mostly numbers but some
    // variables carry strings.
    #[serde(flatten)]
    sets: HashMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct MesowestSource {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    station_id: String,
    elements: Vec<String>,
    units: UnitSystem,
    plan: ReductionPlan,
}

impl MesowestSource {
    pub fn new(
        token: impl Into<String>,
        station_id: impl Into<String>,
        elements: Vec<String>,
        units: UnitSystem,
        plan: ReductionPlan,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(Provider::Mesowest)?,
            base_url: SYNOPTIC_TIMESERIES_URL.to_string(),
            token: token.into(),
            station_id: station_id.into(),
            elements,
            units,
            plan: plan.with_sample_conversion(sample_conversion(units)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn fetch(&self, window: &FetchWindow) -> Result<String> {
        let url = build_timeseries_url(
            &self.base_url,
            &self.token,
            &self.station_id,
            &self.elements,
            self.units,
            window,
        );
        debug!(station = %self.station_id, "requesting MesoWest timeseries");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| PipelineError::transport(Provider::Mesowest, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PipelineError::transport(Provider::Mesowest, e))?;

        if !status.is_success() {
            return Err(PipelineError::transport(
                Provider::Mesowest,
                format!("HTTP error: {}", status),
            ));
        }

        Ok(body)
    }
}

impl Source for MesowestSource {
    fn provider(&self) -> Provider {
        Provider::Mesowest
    }

    fn collect(&self, window: &FetchWindow) -> Result<Readings> {
        let body = self.fetch(window)?;
        let series = parse_timeseries_response(&body, &self.elements)?;
        info!(
            station = %self.station_id,
            elements = series.len(),
            "received MesoWest observations"
        );
        Ok(self.plan.reduce_all(&series, &self.elements, self.units))
    }
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Synoptic `units` parameter for the target system.
pub fn units_param(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Imperial => "english,speed|kts",
        UnitSystem::Metric => "metric",
    }
}

/// Synoptic timestamp format, always UTC.
pub fn format_synoptic_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M").to_string()
}

/// Builds the timeseries URL for one station, its variables, and a window.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use infoex_autowx::ingest::mesowest::{build_timeseries_url, SYNOPTIC_TIMESERIES_URL};
/// use infoex_autowx::model::{FetchWindow, UnitSystem};
///
/// let now = Utc.with_ymd_and_hms(2024, 12, 18, 21, 30, 0).unwrap();
/// let window = FetchWindow::ending_at(now, chrono_tz::UTC, 3);
/// let url = build_timeseries_url(
///     SYNOPTIC_TIMESERIES_URL,
///     "demotoken",
///     "TMBWA",
///     &["air_temp".to_string(), "snow_depth".to_string()],
///     UnitSystem::Imperial,
///     &window,
/// );
/// assert!(url.contains("&start=202412181800&end=202412182100"));
/// ```
pub fn build_timeseries_url(
    base_url: &str,
    token: &str,
    station_id: &str,
    elements: &[String],
    units: UnitSystem,
    window: &FetchWindow,
) -> String {
    format!(
        "{}?token={}&within={}&units={}&stid={}&vars={}&start={}&end={}",
        base_url,
        urlencoding::encode(token),
        WITHIN_MINUTES,
        urlencoding::encode(units_param(units)),
        urlencoding::encode(station_id),
        urlencoding::encode(&elements.join(",")),
        format_synoptic_time(window.begin),
        format_synoptic_time(window.end),
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extracts one series per requested variable from a timeseries response.
///
/// Variables the station did not report are left out of the map. Entries
/// that are not numbers (null, strings) become null samples.
///
/// # Errors
/// - `Transport` — no station in the response (bad token, unknown station);
///   carries the API's response message.
/// - `MalformedResponse` — unreadable JSON, timestamps, or arrays that do
///   not line up with `date_time`.
pub fn parse_timeseries_response(json: &str, elements: &[String]) -> Result<BTreeMap<String, RawSeries>> {
    let response: TimeseriesResponse =
        serde_json::from_str(json).map_err(|e| PipelineError::malformed(Provider::Mesowest, e))?;

    let Some(station) = response.station.into_iter().next() else {
        let message = response
            .summary
            .and_then(|s| s.response_message)
            .unwrap_or_else(|| "no station in response".to_string());
        return Err(PipelineError::transport(Provider::Mesowest, message));
    };

    let observations = station.observations;
    let timestamps = observations
        .date_time
        .iter()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| PipelineError::malformed(Provider::Mesowest, format!("bad date_time '{}': {}", s, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut series = BTreeMap::new();
    for element in elements {
        let key = format!("{}_set_1", element);
        let Some(raw) = observations.sets.get(&key) else {
            warn!(element = %element, "station did not report variable");
            continue;
        };

        let Some(values) = raw.as_array() else {
            return Err(PipelineError::malformed(
                Provider::Mesowest,
                format!("{} is not an array", key),
            ));
        };
        if values.len() != timestamps.len() {
            return Err(PipelineError::malformed(
                Provider::Mesowest,
                format!("{} has {} entries for {} timestamps", key, values.len(), timestamps.len()),
            ));
        }

        let samples = timestamps
            .iter()
            .zip(values)
            .map(|(ts, v)| RawSample::new(*ts, v.as_f64()))
            .collect();
        series.insert(element.clone(), samples);
    }

    Ok(series)
}

// ---------------------------------------------------------------------------
// Per-sample conversions
// ---------------------------------------------------------------------------

pub fn sample_conversion(units: UnitSystem) -> SampleConversion {
    match units {
        UnitSystem::Imperial => imperial_sample,
        UnitSystem::Metric => metric_sample,
    }
}

/// Knots to mph for wind speed and gust. Direction stays in degrees.
fn imperial_sample(element: CanonicalElement, value: f64) -> f64 {
    match element {
        CanonicalElement::WindSpeedNum | CanonicalElement::WindGustSpeedNum => units::kn_to_mph(value),
        _ => value,
    }
}

/// Snow depth mm to cm. Metric wind already arrives in m/s.
fn metric_sample(element: CanonicalElement, value: f64) -> f64 {
    match element {
        CanonicalElement::HS => units::mm_to_cm(value),
        _ => value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
