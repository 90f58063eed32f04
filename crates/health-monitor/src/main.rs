//! Health Monitor - Main Entry Point

use health_monitor::{config_path_from_args, init_logging, replay, MonitorConfig};
use health_state::HealthAnalyzer;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args(std::env::args().skip(1))
        .or_else(|| std::env::var("HEALTH_MONITOR_CONFIG").ok());
    let config = MonitorConfig::load(config_path.as_deref())?;

    init_logging(&config.log_level, config.log_json)?;

    info!("=== Health Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let analyzer = Arc::new(HealthAnalyzer::new(config.health.clone())?);
    let stdout = tokio::io::stdout();

    let summary = match &config.input {
        Some(path) => {
            info!("Replaying observations from {}", path.display());
            let file = tokio::fs::File::open(path).await?;
            replay(analyzer, BufReader::new(file), stdout, config.channel_capacity).await?
        }
        None => {
            info!("Replaying observations from stdin");
            let stdin = BufReader::new(tokio::io::stdin());
            replay(analyzer, stdin, stdout, config.channel_capacity).await?
        }
    };

    info!(
        "Processed {} observations for {} subjects ({} emergencies, {} warnings)",
        summary.lines, summary.subjects, summary.emergencies, summary.warnings
    );

    Ok(())
}
