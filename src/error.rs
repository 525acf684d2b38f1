/// Error and warning types for a pipeline run.
///
/// `PipelineError` is always fatal: the run stops and no record is written.
/// `Warning` is the non-fatal side; the offending element is dropped and the
/// record is still produced.

use crate::model::Provider;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upstream unreachable, HTTP error status, SOAP fault or a custom
    /// program that could not run or exited unsuccessfully.
    #[error("{provider} transport failure: {reason}")]
    Transport { provider: Provider, reason: String },

    /// The upstream answered but the envelope or payload could not be read.
    #[error("malformed {provider} response: {reason}")]
    MalformedResponse { provider: Provider, reason: String },

    /// Invalid or incomplete configuration, detected before any fetch.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub fn transport(provider: Provider, reason: impl fmt::Display) -> Self {
        PipelineError::Transport {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(provider: Provider, reason: impl fmt::Display) -> Self {
        PipelineError::MalformedResponse {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Non-fatal condition raised while assembling a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The provider reported an element that has no InfoEx counterpart.
    UnknownElement { provider: Provider, element: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownElement { provider, element } => {
                write!(f, "dropping unknown {} element '{}'", provider, element)
            }
        }
    }
}
