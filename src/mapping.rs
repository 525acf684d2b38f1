/// Provider element registry.
///
/// Static tables translating each provider's element identifiers into the
/// InfoEx vocabulary. This is the single source of truth for element ids;
/// sources and the assembler look elements up here rather than hardcoding
/// strings.

use crate::error::Warning;
use crate::model::{CanonicalElement, CanonicalValues, Provider, Readings};
use tracing::warn;

/// Provider-side id under which the pipeline reports its own 24 hour
/// snow height change. No upstream API actually serves an element by
/// this name.
pub const HN24_ELEMENT_ID: &str = "hn24";

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// NRCS AWDB element codes. NRCS has no wind gust element.
pub static NRCS_ELEMENTS: &[(&str, CanonicalElement)] = &[
    ("PREC", CanonicalElement::PrecipitationGauge),
    ("TOBS", CanonicalElement::TempPres),
    ("TMAX", CanonicalElement::TempMaxHour),
    ("TMIN", CanonicalElement::TempMinHour),
    ("SNWD", CanonicalElement::HS),
    ("PRES", CanonicalElement::Baro),
    ("RHUM", CanonicalElement::RH),
    ("WSPD", CanonicalElement::WindSpeedNum),
    ("WDIR", CanonicalElement::WindDirectionNum),
    (HN24_ELEMENT_ID, CanonicalElement::Hn24Auto),
];

/// MesoWest / Synoptic variable names.
pub static MESOWEST_ELEMENTS: &[(&str, CanonicalElement)] = &[
    ("precip_accum", CanonicalElement::PrecipitationGauge),
    ("air_temp", CanonicalElement::TempPres),
    ("air_temp_high_24_hour", CanonicalElement::TempMaxHour),
    ("air_temp_low_24_hour", CanonicalElement::TempMinHour),
    ("snow_depth", CanonicalElement::HS),
    ("pressure", CanonicalElement::Baro),
    ("relative_humidity", CanonicalElement::RH),
    ("wind_speed", CanonicalElement::WindSpeedNum),
    ("wind_direction", CanonicalElement::WindDirectionNum),
    ("wind_gust", CanonicalElement::WindGustSpeedNum),
    (HN24_ELEMENT_ID, CanonicalElement::Hn24Auto),
];

/// Custom programs speak InfoEx names directly. They cannot report HN24;
/// that element is only ever derived here.
pub static CUSTOM_ELEMENTS: &[(&str, CanonicalElement)] = &[
    ("precipitationGauge", CanonicalElement::PrecipitationGauge),
    ("tempPres", CanonicalElement::TempPres),
    ("tempMaxHour", CanonicalElement::TempMaxHour),
    ("tempMinHour", CanonicalElement::TempMinHour),
    ("hS", CanonicalElement::HS),
    ("baro", CanonicalElement::Baro),
    ("rH", CanonicalElement::RH),
    ("windSpeedNum", CanonicalElement::WindSpeedNum),
    ("windDirectionNum", CanonicalElement::WindDirectionNum),
    ("windGustSpeedNum", CanonicalElement::WindGustSpeedNum),
];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn table(provider: Provider) -> &'static [(&'static str, CanonicalElement)] {
    match provider {
        Provider::Nrcs => NRCS_ELEMENTS,
        Provider::Mesowest => MESOWEST_ELEMENTS,
        Provider::Custom => CUSTOM_ELEMENTS,
    }
}

/// Maps a provider element id to its InfoEx element. Unknown ids are not
/// an error here; `canonicalize` decides what to do with them.
pub fn canonical(provider: Provider, element_id: &str) -> Option<CanonicalElement> {
    table(provider)
        .iter()
        .find(|(id, _)| *id == element_id)
        .map(|(_, element)| *element)
}

/// Reverse lookup: the id `provider` uses for `element`, if it has one.
pub fn provider_id(provider: Provider, element: CanonicalElement) -> Option<&'static str> {
    table(provider)
        .iter()
        .find(|(_, e)| *e == element)
        .map(|(id, _)| *id)
}

/// Translates provider-keyed readings into InfoEx elements.
///
/// Ids with no InfoEx counterpart are dropped, logged, and returned as
/// warnings so the caller can report them; the run carries on.
pub fn canonicalize(readings: &Readings) -> (CanonicalValues, Vec<Warning>) {
    let mut values = CanonicalValues::new(readings.units);
    let mut warnings = Vec::new();

    for (element_id, value) in &readings.values {
        match canonical(readings.provider, element_id) {
            Some(element) => {
                values.values.insert(element, *value);
            }
            None => {
                warn!(provider = %readings.provider, element = %element_id, "BAD KEY: no InfoEx counterpart, dropping");
                warnings.push(Warning::UnknownElement {
                    provider: readings.provider,
                    element: element_id.clone(),
                });
            }
        }
    }

    (values, warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
