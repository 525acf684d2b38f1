/// InfoEx automated weather record: 29 fixed positions, written as one CSV row.
///
/// InfoEx requires the exact column count and order, so every position is
/// always present. Missing data is an explicit empty cell, never omitted and
/// never a literal `null`.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{PipelineError, Result, Warning};
use crate::mapping;
use crate::model::{CanonicalElement, CanonicalValues, Readings, UnitSystem};
use crate::units;

pub const FIELD_COUNT: usize = 29;

/// Column names, in InfoEx order.
pub const COLUMNS: [&str; FIELD_COUNT] = [
    "Location UUID",
    "obDate",
    "obTime",
    "timeZone",
    "tempMaxHour",
    "tempMaxHourUnit",
    "tempMinHour",
    "tempMinHourUnit",
    "tempPres",
    "tempPresUnit",
    "precipitationGauge",
    "precipitationGaugeUnit",
    "windSpeedNum",
    "windSpeedUnit",
    "windDirectionNum",
    "hS",
    "hsUnit",
    "baro",
    "baroUnit",
    "rH",
    "windGustSpeedNum",
    "windGustSpeedNumUnit",
    "windGustDirNum",
    "dewPoint",
    "dewPointUnit",
    "hn24Auto",
    "hn24AutoUnit",
    "hstAuto",
    "hstAutoUnit",
];

const LOCATION_UUID: usize = 0;
const OB_DATE: usize = 1;
const OB_TIME: usize = 2;
const TIME_ZONE: usize = 3;
const DEW_POINT_UNIT: usize = 24;
const HST_AUTO_UNIT: usize = 28;

const DEFAULT_TIME_ZONE: &str = "Pacific";

/// Unit label positions with their imperial and metric labels.
/// `baroUnit` keeps inHg in both systems.
const UNIT_LABELS: [(usize, &str, &str); 11] = [
    (5, "F", "C"),
    (7, "F", "C"),
    (9, "F", "C"),
    (11, "in", "mm"),
    (13, "mph", "m/s"),
    (16, "in", "cm"),
    (18, "inHg", "inHg"),
    (21, "mph", "m/s"),
    (DEW_POINT_UNIT, "F", "C"),
    (26, "in", "cm"),
    (HST_AUTO_UNIT, "in", "cm"),
];

/// (value position, unit label position) of each InfoEx element.
fn positions(element: CanonicalElement) -> (usize, Option<usize>) {
    match element {
        CanonicalElement::TempMaxHour => (4, Some(5)),
        CanonicalElement::TempMinHour => (6, Some(7)),
        CanonicalElement::TempPres => (8, Some(9)),
        CanonicalElement::PrecipitationGauge => (10, Some(11)),
        CanonicalElement::WindSpeedNum => (12, Some(13)),
        CanonicalElement::WindDirectionNum => (14, None),
        CanonicalElement::HS => (15, Some(16)),
        CanonicalElement::Baro => (17, Some(18)),
        CanonicalElement::RH => (19, None),
        CanonicalElement::WindGustSpeedNum => (20, Some(21)),
        CanonicalElement::Hn24Auto => (25, Some(26)),
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// One position of the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    /// Already rounded to `decimals` places; rendered with exactly that many.
    Number { value: f64, decimals: usize },
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number { value, decimals } => write!(f, "{:.*}", decimals, value),
        }
    }
}

/// Rounds to `decimals` places, ties to even. InfoEx values have always
/// been rounded this way, so averaged winds like 4.5 mph come out as 4.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    cells: [Cell; FIELD_COUNT],
}

impl ObservationRecord {
    /// Schema defaults: imperial labels, `Pacific` timezone, no values.
    fn with_defaults(location_id: &str) -> Self {
        let mut cells: [Cell; FIELD_COUNT] = std::array::from_fn(|_| Cell::Empty);
        cells[LOCATION_UUID] = Cell::Text(location_id.to_string());
        cells[TIME_ZONE] = Cell::Text(DEFAULT_TIME_ZONE.to_string());
        for (position, imperial, _) in UNIT_LABELS {
            cells[position] = Cell::Text(imperial.to_string());
        }
        Self { cells }
    }

    fn apply_unit_labels(&mut self, units: UnitSystem) {
        for (position, imperial, metric) in UNIT_LABELS {
            let label = match units {
                UnitSystem::Imperial => imperial,
                UnitSystem::Metric => metric,
            };
            self.cells[position] = Cell::Text(label.to_string());
        }
    }

    pub fn cells(&self) -> &[Cell; FIELD_COUNT] {
        &self.cells
    }

    pub fn column(&self, name: &str) -> Option<&Cell> {
        COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|i| &self.cells[i])
    }

    pub fn location_id(&self) -> &Cell {
        &self.cells[LOCATION_UUID]
    }

    pub fn ob_date(&self) -> &Cell {
        &self.cells[OB_DATE]
    }

    pub fn ob_time(&self) -> &Cell {
        &self.cells[OB_TIME]
    }

    pub fn time_zone(&self) -> &Cell {
        &self.cells[TIME_ZONE]
    }

    pub fn value(&self, element: CanonicalElement) -> Option<f64> {
        self.cells[positions(element).0].as_number()
    }

    pub fn unit(&self, element: CanonicalElement) -> Option<&str> {
        positions(element)
            .1
            .and_then(|position| self.cells[position].as_text())
    }

    /// Number of InfoEx elements carrying a value.
    pub fn reported(&self) -> usize {
        CanonicalElement::ALL
            .iter()
            .filter(|e| self.value(**e).is_some())
            .count()
    }

    /// Renders the record as a single CSV line. Strings are quoted, numbers
    /// are bare and empty cells become `""`.
    pub fn to_csv_row(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::NonNumeric)
            .from_writer(Vec::new());
        writer.write_record(self.cells.iter().map(|c| c.to_string()))?;

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        String::from_utf8(bytes)
            .map_err(|e| PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        debug!(path = %path.as_ref().display(), "writing CSV file");
        std::fs::write(path, self.to_csv_row()?)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// A frozen record plus whatever was dropped on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub record: ObservationRecord,
    pub warnings: Vec<Warning>,
}

/// Builds the record from InfoEx-keyed values.
///
/// Values are converted to metric when they arrive imperial and the
/// target is metric, then rounded to each element's InfoEx precision.
/// Absent values stay empty.
pub fn assemble(
    values: &CanonicalValues,
    target: UnitSystem,
    location_id: &str,
    observed_at: DateTime<Utc>,
    tz: Tz,
) -> ObservationRecord {
    let mut record = ObservationRecord::with_defaults(location_id);

    let local = observed_at.with_timezone(&tz);
    record.cells[OB_DATE] = Cell::Text(local.format("%m/%d/%Y").to_string());
    record.cells[OB_TIME] = Cell::Text(local.format("%H:%M").to_string());
    record.cells[TIME_ZONE] = Cell::Text(tz.name().to_string());

    if target == UnitSystem::Metric {
        record.apply_unit_labels(UnitSystem::Metric);
    }

    let convert = values.units == UnitSystem::Imperial && target == UnitSystem::Metric;

    for (element, value) in &values.values {
        let Some(value) = *value else {
            continue;
        };
        let value = if convert { units::to_metric(*element, value) } else { value };
        let decimals = element.precision();
        record.cells[positions(*element).0] = Cell::Number {
            value: round_to(value, decimals),
            decimals,
        };
    }

    record
}

/// Maps provider readings to InfoEx elements, dropping unknown ones with a
/// warning, and assembles the record.
pub fn assemble_readings(
    readings: &Readings,
    target: UnitSystem,
    location_id: &str,
    observed_at: DateTime<Utc>,
    tz: Tz,
) -> Assembled {
    let (values, warnings) = mapping::canonicalize(readings);
    Assembled {
        record: assemble(&values, target, location_id, observed_at, tz),
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
