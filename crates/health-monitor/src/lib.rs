//! Health Monitor
//!
//! Replays recorded posture observations through the health-state engine.

pub mod config;
pub mod replay;

pub use config::MonitorConfig;
pub use replay::{replay, ObservationOutcome, ReplaySummary};

use anyhow::anyhow;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Config file path from `--config <path>` or `--config=<path>`, if given
pub fn config_path_from_args<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Initialize logging to stderr (stdout carries results)
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level = Level::from_str(level).map_err(|e| anyhow!("invalid log level {:?}: {}", level, e))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
