/// Reduction of raw provider series into single values.
///
/// Submodules:
/// - `reduce`  — most-recent / mean policies and per-provider reduction plans.
/// - `derived` — quantities computed over the whole window (HN24, means).

pub mod derived;
pub mod reduce;
