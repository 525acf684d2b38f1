/// Shared data types for the InfoEx automated weather pipeline.
///
/// Every value here lives for a single run: the fetch window is computed
/// once, the raw series come back from a source, and the reduced readings
/// are handed to the record assembler. Nothing is mutated after creation.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Raw time series
// ---------------------------------------------------------------------------

/// One sample of one element as reported by an upstream provider.
/// `value` is `None` when the provider reported the slot but had no datum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl RawSample {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one (provider, element) pair, oldest first. Gaps are allowed.
pub type RawSeries = Vec<RawSample>;

// ---------------------------------------------------------------------------
// Run-level enumerations
// ---------------------------------------------------------------------------

/// Upstream provider kind, selected once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// NRCS AWDB SOAP web service (SNOTEL sites, hourly data).
    Nrcs,
    /// MesoWest / Synoptic timeseries REST API (often sub-hourly).
    Mesowest,
    /// External program returning already-final canonical values.
    Custom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Nrcs => "nrcs",
            Provider::Mesowest => "mesowest",
            Provider::Custom => "custom",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit system of the destination record. `english` is accepted as an
/// alias because that is what the MesoWest API calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    #[serde(alias = "english")]
    Imperial,
    Metric,
}

/// How wind speed, gust and direction are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindMode {
    /// Most recent sample, like every other element.
    #[default]
    Normal,
    /// Mean of every sample in the (24 hour) window.
    Average,
}

// ---------------------------------------------------------------------------
// Canonical (InfoEx) elements
// ---------------------------------------------------------------------------

/// Measurement kinds in the InfoEx vocabulary.
///
/// The first ten can be reported by any source. `Hn24Auto` is derived by
/// the pipeline from the snow depth series and is never requested upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalElement {
    PrecipitationGauge,
    TempPres,
    TempMaxHour,
    TempMinHour,
    HS,
    Baro,
    RH,
    WindSpeedNum,
    WindDirectionNum,
    WindGustSpeedNum,
    Hn24Auto,
}

impl CanonicalElement {
    pub const ALL: [CanonicalElement; 11] = [
        CanonicalElement::PrecipitationGauge,
        CanonicalElement::TempPres,
        CanonicalElement::TempMaxHour,
        CanonicalElement::TempMinHour,
        CanonicalElement::HS,
        CanonicalElement::Baro,
        CanonicalElement::RH,
        CanonicalElement::WindSpeedNum,
        CanonicalElement::WindDirectionNum,
        CanonicalElement::WindGustSpeedNum,
        CanonicalElement::Hn24Auto,
    ];

    /// InfoEx column name for the value of this element.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalElement::PrecipitationGauge => "precipitationGauge",
            CanonicalElement::TempPres => "tempPres",
            CanonicalElement::TempMaxHour => "tempMaxHour",
            CanonicalElement::TempMinHour => "tempMinHour",
            CanonicalElement::HS => "hS",
            CanonicalElement::Baro => "baro",
            CanonicalElement::RH => "rH",
            CanonicalElement::WindSpeedNum => "windSpeedNum",
            CanonicalElement::WindDirectionNum => "windDirectionNum",
            CanonicalElement::WindGustSpeedNum => "windGustSpeedNum",
            CanonicalElement::Hn24Auto => "hn24Auto",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Decimal places InfoEx accepts for this element.
    pub fn precision(&self) -> usize {
        match self {
            CanonicalElement::RH
            | CanonicalElement::WindSpeedNum
            | CanonicalElement::WindDirectionNum
            | CanonicalElement::WindGustSpeedNum
            | CanonicalElement::HS
            | CanonicalElement::Hn24Auto => 0,
            CanonicalElement::TempPres
            | CanonicalElement::TempMaxHour
            | CanonicalElement::TempMinHour
            | CanonicalElement::Baro => 1,
            CanonicalElement::PrecipitationGauge => 2,
        }
    }

    /// Elements that average wind mode replaces with a window mean.
    pub fn is_wind(&self) -> bool {
        matches!(
            self,
            CanonicalElement::WindSpeedNum
                | CanonicalElement::WindDirectionNum
                | CanonicalElement::WindGustSpeedNum
        )
    }
}

impl fmt::Display for CanonicalElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Fetch window
// ---------------------------------------------------------------------------

/// Time bounds of every upstream request in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Floors `now` to the top of the hour as seen on the `zone` clock and
    /// reaches back `hours` from there.
    pub fn ending_at(now: DateTime<Utc>, zone: Tz, hours: i64) -> Self {
        let local = zone.from_utc_datetime(&now.naive_utc());
        let past_the_hour = Duration::minutes(i64::from(local.minute()))
            + Duration::seconds(i64::from(local.second()))
            + Duration::nanoseconds(i64::from(local.nanosecond()));
        let end = now - past_the_hour;

        Self {
            begin: end - Duration::hours(hours),
            end,
        }
    }

    pub fn hours(&self) -> i64 {
        (self.end - self.begin).num_hours()
    }
}

// ---------------------------------------------------------------------------
// Reduced values
// ---------------------------------------------------------------------------

/// Reduced values keyed by the provider's own element ids, straight out of
/// a source. `units` records which system the numbers are expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    pub provider: Provider,
    pub units: UnitSystem,
    pub values: BTreeMap<String, Option<f64>>,
}

impl Readings {
    pub fn new(provider: Provider, units: UnitSystem) -> Self {
        Self {
            provider,
            units,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, element_id: impl Into<String>, value: Option<f64>) {
        self.values.insert(element_id.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Readings after provider ids have been translated to InfoEx elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalValues {
    pub units: UnitSystem,
    pub values: BTreeMap<CanonicalElement, Option<f64>>,
}

impl CanonicalValues {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, element: CanonicalElement) -> Option<f64> {
        self.values.get(&element).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
