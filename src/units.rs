/// Scalar unit conversions between imperial and metric.
///
/// Callers filter out absent values first; every function here takes and
/// returns a plain finite `f64`.

use crate::model::CanonicalElement;

const CM_PER_INCH: f64 = 2.54;
const MPH_PER_KNOT: f64 = 1.150779;
const MPH_PER_METER_PER_SECOND: f64 = 2.236936;

pub fn f_to_c(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn in_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

pub fn in_to_mm(inches: f64) -> f64 {
    inches * CM_PER_INCH * 10.0
}

pub fn mm_to_cm(mm: f64) -> f64 {
    mm / 10.0
}

pub fn kn_to_mph(knots: f64) -> f64 {
    knots * MPH_PER_KNOT
}

pub fn ms_to_mph(meters_per_second: f64) -> f64 {
    meters_per_second * MPH_PER_METER_PER_SECOND
}

pub fn mph_to_ms(mph: f64) -> f64 {
    mph / MPH_PER_METER_PER_SECOND
}

/// Converts an imperial value of `element` to the metric unit InfoEx
/// labels it with (C, cm, mm, m/s). Pressure, humidity and direction pass
/// through unchanged.
pub fn to_metric(element: CanonicalElement, value: f64) -> f64 {
    match element {
        CanonicalElement::TempPres | CanonicalElement::TempMaxHour | CanonicalElement::TempMinHour => {
            f_to_c(value)
        }
        CanonicalElement::HS | CanonicalElement::Hn24Auto => in_to_cm(value),
        CanonicalElement::PrecipitationGauge => in_to_mm(value),
        CanonicalElement::WindSpeedNum | CanonicalElement::WindGustSpeedNum => mph_to_ms(value),
        CanonicalElement::Baro | CanonicalElement::RH | CanonicalElement::WindDirectionNum => value,
    }
}
