/// Time-series reduction: one value per element out of a window of samples.
///
/// Ordinary elements take the most recent non-null sample. This tolerates
/// upstream gaps at the price of staleness: a record can carry an HS from
/// the last hour next to a temperature from two hours ago if the sensor
/// skipped a beat. Wind elements in average mode take the window mean, and
/// the snow height series additionally feeds HN24.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analysis::derived;
use crate::mapping::{self, HN24_ELEMENT_ID};
use crate::model::{
    CanonicalElement, Provider, RawSample, RawSeries, Readings, UnitSystem, WindMode,
};

/// How a series collapses to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionPolicy {
    MostRecent,
    Mean,
}

/// Per-sample conversion applied before any reduction, keyed by the
/// element the sample belongs to.
pub type SampleConversion = fn(CanonicalElement, f64) -> f64;

pub fn reduce(series: &[RawSample], policy: ReductionPolicy) -> Option<f64> {
    match policy {
        ReductionPolicy::MostRecent => most_recent(series),
        ReductionPolicy::Mean => derived::mean(series),
    }
}

/// Value of the non-null sample with the latest timestamp. On equal
/// timestamps the one later in the series wins.
pub fn most_recent(series: &[RawSample]) -> Option<f64> {
    series
        .iter()
        .filter_map(|s| s.value.map(|v| (s.timestamp, v)))
        .fold(None::<(DateTime<Utc>, f64)>, |best, (ts, v)| match best {
            Some((best_ts, _)) if best_ts > ts => best,
            _ => Some((ts, v)),
        })
        .map(|(_, v)| v)
}

// ---------------------------------------------------------------------------
// Reduction plan
// ---------------------------------------------------------------------------

/// Everything a source needs to turn its raw series into `Readings`.
#[derive(Debug, Clone, Copy)]
pub struct ReductionPlan {
    pub provider: Provider,
    pub wind_mode: WindMode,
    pub hn24: bool,
    pub sample_conversion: Option<SampleConversion>,
}

impl ReductionPlan {
    pub fn new(provider: Provider, wind_mode: WindMode, hn24: bool) -> Self {
        Self {
            provider,
            wind_mode,
            hn24,
            sample_conversion: None,
        }
    }

    pub fn with_sample_conversion(mut self, conversion: SampleConversion) -> Self {
        self.sample_conversion = Some(conversion);
        self
    }

    pub fn policy_for(&self, element: Option<CanonicalElement>) -> ReductionPolicy {
        match (self.wind_mode, element) {
            (WindMode::Average, Some(e)) if e.is_wind() => ReductionPolicy::Mean,
            _ => ReductionPolicy::MostRecent,
        }
    }

    /// Reduces every requested element plus anything else the provider sent.
    ///
    /// Requested elements with no series at all come out as `None`. Unknown
    /// elements are reduced like any other and left for the assembler to
    /// reject.
    pub fn reduce_all(
        &self,
        series: &BTreeMap<String, RawSeries>,
        requested: &[String],
        units: UnitSystem,
    ) -> Readings {
        let mut readings = Readings::new(self.provider, units);

        let mut element_ids: Vec<&str> = requested.iter().map(String::as_str).collect();
        for id in series.keys() {
            if !element_ids.contains(&id.as_str()) {
                element_ids.push(id);
            }
        }

        for element_id in element_ids {
            let element = mapping::canonical(self.provider, element_id);

            let Some(samples) = series.get(element_id) else {
                debug!(element = element_id, "no series returned, reporting as missing");
                readings.insert(element_id, None);
                continue;
            };

            let samples = self.convert(element, samples);
            let value = reduce(&samples, self.policy_for(element));
            if value.is_none() {
                debug!(element = element_id, samples = samples.len(), "no non-null samples in window");
            }
            readings.insert(element_id, value);

            if self.hn24 && element == Some(CanonicalElement::HS) {
                readings.insert(HN24_ELEMENT_ID, derived::hn24(&samples));
            }
        }

        readings
    }

    fn convert(&self, element: Option<CanonicalElement>, samples: &[RawSample]) -> RawSeries {
        match (self.sample_conversion, element) {
            (Some(convert), Some(element)) => samples
                .iter()
                .map(|s| RawSample::new(s.timestamp, s.value.map(|v| convert(element, v))))
                .collect(),
            _ => samples.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
