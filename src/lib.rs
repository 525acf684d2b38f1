/// infoex_autowx: automated weather observations for the InfoEx avalanche
/// information exchange.
///
/// Pulls a window of data from an NRCS SNOTEL site, a MesoWest station or
/// a custom program, reduces it to single values, and assembles the fixed
/// 29-cell InfoEx auto-wx record.
///
/// # Module structure
///
/// ```text
/// infoex_autowx
/// ├── model       — shared data types (RawSample, CanonicalElement, FetchWindow, Readings, …)
/// ├── error       — PipelineError (fatal) and Warning (non-fatal)
/// ├── config      — run configuration loader (autowx.toml)
/// ├── units       — imperial ↔ metric scalar conversions
/// ├── mapping     — provider element ids ↔ InfoEx elements
/// ├── ingest
/// │   ├── nrcs    — NRCS AWDB SOAP: envelope construction, XML parsing, parallel fetch
/// │   ├── mesowest — Synoptic timeseries API: URL construction + JSON parsing
/// │   ├── custom  — external program source
/// │   └── fixtures (test only) — representative provider payloads
/// ├── analysis
/// │   ├── reduce  — most-recent / mean reduction and per-provider plans
/// │   └── derived — HN24 and windowed means
/// ├── record      — 29-cell record assembly and CSV rendering
/// └── pipeline    — one run: window → source → record
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod mapping;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod units;
