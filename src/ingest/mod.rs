/// Upstream weather data sources.
///
/// Each provider gets its own file under `ingest/`. All of them implement
/// `Source`, which the pipeline selects once from configuration and then
/// drives without knowing which provider is behind it.

pub mod custom;
pub mod mesowest;
pub mod nrcs;

#[cfg(test)]
pub(crate) mod fixtures;
#[cfg(test)]
pub(crate) mod stub_server;

use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{PipelineError, Result};
use crate::model::{FetchWindow, Provider, Readings};

/// Per-request timeout for the HTTP providers.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A provider of reduced readings for one fetch window.
pub trait Source: Send + Sync {
    fn provider(&self) -> Provider;

    /// Clock on which the fetch window is floored to the hour. Providers
    /// that take local station time in their requests override this.
    fn clock_zone(&self) -> Tz {
        chrono_tz::UTC
    }

    /// Fetches and reduces everything this source reports for `window`.
    ///
    /// # Errors
    /// Only hard failures are errors: unreachable upstream, error status,
    /// unreadable payload. Elements without data come back as `None`.
    fn collect(&self, window: &FetchWindow) -> Result<Readings>;
}

/// Blocking HTTP client shared by the HTTP providers.
pub fn http_client(provider: Provider) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("infoex-autowx/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PipelineError::transport(provider, e))
}
