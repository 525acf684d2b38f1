/// Custom data source: an external program that prints final readings.
///
/// The program is run once per pipeline run with the fetch window passed
/// both as arguments (`--begin <rfc3339> --end <rfc3339>`) and as the
/// `AUTOWX_BEGIN` / `AUTOWX_END` environment variables. It must print one
/// JSON object to stdout mapping InfoEx element names to numbers or null:
///
/// ```text
/// {"tempPres": 24.1, "hS": 48, "windSpeedNum": null}
/// ```
///
/// Values are taken as already reduced and in the configured unit system;
/// the pipeline only rounds them. Anything the program writes to stderr
/// is logged at debug level.

use std::process::Command;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::ingest::Source;
use crate::model::{FetchWindow, Provider, Readings, UnitSystem};

pub struct CustomSource {
    command: String,
    args: Vec<String>,
    units: UnitSystem,
}

impl CustomSource {
    pub fn new(command: impl Into<String>, args: Vec<String>, units: UnitSystem) -> Self {
        Self {
            command: command.into(),
            args,
            units,
        }
    }

    fn run(&self, window: &FetchWindow) -> Result<String> {
        let begin = window.begin.to_rfc3339();
        let end = window.end.to_rfc3339();

        debug!(command = %self.command, begin = %begin, end = %end, "running custom source");

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--begin")
            .arg(&begin)
            .arg("--end")
            .arg(&end)
            .env("AUTOWX_BEGIN", &begin)
            .env("AUTOWX_END", &end)
            .output()
            .map_err(|e| {
                PipelineError::transport(Provider::Custom, format!("could not run '{}': {}", self.command, e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "custom source stderr");
        }

        if !output.status.success() {
            return Err(PipelineError::transport(
                Provider::Custom,
                format!("'{}' exited with {}", self.command, output.status),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| PipelineError::malformed(Provider::Custom, format!("stdout is not UTF-8: {}", e)))
    }
}

impl Source for CustomSource {
    fn provider(&self) -> Provider {
        Provider::Custom
    }

    fn collect(&self, window: &FetchWindow) -> Result<Readings> {
        let stdout = self.run(window)?;
        let readings = parse_custom_output(&stdout, self.units)?;
        info!(elements = readings.values.len(), "custom source returned readings");
        Ok(readings)
    }
}

/// Parses the program's stdout into readings.
///
/// # Errors
/// `MalformedResponse` if stdout is not a JSON object or any value is
/// neither a number nor null.
pub fn parse_custom_output(stdout: &str, units: UnitSystem) -> Result<Readings> {
    let parsed: Value =
        serde_json::from_str(stdout.trim()).map_err(|e| PipelineError::malformed(Provider::Custom, e))?;

    let Value::Object(map) = parsed else {
        return Err(PipelineError::malformed(Provider::Custom, "expected a JSON object"));
    };

    let mut readings = Readings::new(Provider::Custom, units);
    for (element, value) in map {
        let value = match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64(),
            other => {
                return Err(PipelineError::malformed(
                    Provider::Custom,
                    format!("'{}' is not a number or null: {}", element, other),
                ));
            }
        };
        readings.insert(element, value);
    }

    Ok(readings)
}
