use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use levelwatch::application::{Cli, CommandExecutor};
use levelwatch::shared::logging::init_logging;
use levelwatch::shared::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // priority: CLI overrides > config file > defaults
    let mut config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_secrets();
    cli.overrides.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging);
    info!(
        config = %cli.config.display(),
        tokens = config.tokens.len(),
        data_root = %config.data_root.display(),
        "configuration loaded"
    );

    CommandExecutor::execute(cli.command, config).await?;
    Ok(())
}
