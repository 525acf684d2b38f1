//! InfoEx auto-wx - single run
//!
//! Fetches the latest window of observations for one station, assembles
//! the InfoEx record and writes it as a one-line CSV file. Meant to be run
//! from cron once an hour.
//!
//! Usage:
//!   infoex-autowx --config autowx.toml                 # write the CSV
//!   infoex-autowx --config autowx.toml --dry-run       # print the row instead
//!   infoex-autowx --config autowx.toml --log-level debug
//!
//! Environment:
//!   RUST_LOG - overrides --log-level when set

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use infoex_autowx::config::AutowxConfig;
use infoex_autowx::error::Result;
use infoex_autowx::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "infoex-autowx", version, about = "Automated weather observations for InfoEx")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Log verbosity
    #[arg(long, default_value = "info", value_parser = ["debug", "info", "warning", "warn", "error"])]
    log_level: String,

    /// Print the CSV row to stdout instead of writing the file
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(level: &str) {
    let level = if level == "warning" { "warn" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(args: &Args) -> Result<()> {
    let config = AutowxConfig::load(&args.config)?;
    info!(
        config = %args.config.display(),
        provider = %config.station.provider,
        "configuration loaded"
    );

    let pipeline = Pipeline::from_config(&config)?;
    let settings = pipeline.config();
    info!(
        location = %settings.location_id,
        units = ?settings.units,
        timezone = %settings.timezone,
        window_hours = settings.fetch_hours(),
        "pipeline ready"
    );
    let outcome = pipeline.run()?;

    let row = outcome.record.to_csv_row()?;
    info!(row = %row.trim_end(), "assembled record");

    if args.dry_run {
        print!("{}", row);
        return Ok(());
    }

    if outcome.is_empty() {
        warn!("source reported no elements, not writing CSV");
        return Ok(());
    }

    outcome.record.write_csv(&config.infoex.csv_filename)?;
    info!(path = %config.infoex.csv_filename, reported = outcome.reported(), "CSV written");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
