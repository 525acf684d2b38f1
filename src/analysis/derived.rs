/// Quantities that no provider reports directly and that need the whole
/// fetch window rather than its latest sample.

use crate::model::RawSample;

/// 24 hour snow height change.
///
/// Oldest non-null height minus newest non-null height, so a rising gauge
/// distance (settling pack) and a falling one (new snow) are told apart,
/// which max − min cannot do. Settlement comes out ≤ 0 and is clamped to
/// 0.0 because InfoEx takes HN24 as an accumulation.
pub fn hn24(series: &[RawSample]) -> Option<f64> {
    let mut ordered: Vec<&RawSample> = series.iter().filter(|s| s.value.is_some()).collect();
    ordered.sort_by_key(|s| s.timestamp);

    let first = ordered.first()?.value?;
    let last = ordered.last()?.value?;

    // TODO: report settlement once InfoEx documents whether auto stations may send it.
    Some((first - last).max(0.0))
}

/// Arithmetic mean of the non-null samples. Nulls are left out of the
/// denominator.
pub fn mean(series: &[RawSample]) -> Option<f64> {
    let (sum, count) = series
        .iter()
        .filter_map(|s| s.value)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
