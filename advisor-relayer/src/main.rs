use std::path::PathBuf;

use advisor_relayer::config::{load_config, ConfigError, ConfigFormat};
use advisor_relayer::service::RelayerService;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "advisor-relayer",
    version,
    about = "Drives configured profiles through confidential scoring and reveal"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML).
    #[arg(long, default_value = "configs/advisor-relayer.toml")]
    config: PathBuf,
    /// Explicit configuration format override.
    #[arg(long, value_enum, default_value_t = ConfigFormat::Auto)]
    config_format: ConfigFormat,
    /// Stop after recommendations are generated; leave results sealed.
    #[arg(long)]
    skip_reveal: bool,
    /// Override the callback timeout defined in the config file.
    #[arg(long)]
    callback_timeout_ms: Option<u64>,
    /// Print the full report as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config, cli.config_format)?;
    if cli.skip_reveal {
        config.relayer.reveal = false;
    }
    if let Some(timeout) = cli.callback_timeout_ms {
        config.relayer.callback_timeout_ms = timeout;
    }
    config.validate().map_err(|err| match err {
        ConfigError::Validation(reason) => color_eyre::eyre::eyre!(reason),
        other => other.into(),
    })?;

    let report = RelayerService::new(&config)?.run().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for profile in &report.profiles {
        let recommendation = profile
            .recommendation_id
            .map_or_else(|| "-".to_owned(), |id| id.to_string());
        match profile.result {
            Some(result) => println!(
                "{} {} {} product={} score={}",
                profile.label,
                profile.profile_id,
                recommendation,
                result.product_id,
                result.match_score
            ),
            None => println!(
                "{} {} {} sealed",
                profile.label, profile.profile_id, recommendation
            ),
        }
    }
    println!(
        "callbacks applied={} rejected={} events={}",
        report.callbacks_applied,
        report.callbacks_rejected,
        report.events.len()
    );
    Ok(())
}
