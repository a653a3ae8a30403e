//! CLI commands and handlers
use async_trait::async_trait;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::orchestrator::UpdateOrchestrator;
use crate::domain::alerts::SystemClock;
use crate::infrastructure::enrichment::TokenInfoCatalog;
use crate::infrastructure::market_data::{CoinGeckoClient, RetryPolicy, RetryingFetcher};
use crate::infrastructure::notifier::{DestinationRegistry, Notifier, NotifierGateway, TelegramNotifier};
use crate::infrastructure::storage::{AlertHistoryLog, AlertStateFile, CsvSeriesRepository};
use crate::shared::config::AppConfig;
use crate::shared::errors::{AppError, ConfigError, NotifyError};

#[derive(Parser)]
#[command(name = "levelwatch")]
#[command(version, about = "Support-level proximity alerts for on-chain token pools")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "levelwatch.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Operational knobs that take precedence over the config file
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Cycle interval in seconds
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Alert distance as a fraction (0.01 = 1%)
    #[arg(long, global = true)]
    pub alert_threshold: Option<f64>,

    /// Cooldown per token/level in seconds
    #[arg(long, global = true)]
    pub cooldown: Option<u64>,

    /// Levels need a frequency above this to alert
    #[arg(long, global = true)]
    pub frequency_floor: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(interval) = self.interval {
            config.scheduler.interval_secs = interval;
        }
        if let Some(threshold) = self.alert_threshold {
            config.alerts.alert_threshold = threshold;
        }
        if let Some(cooldown) = self.cooldown {
            config.alerts.cooldown_secs = cooldown;
        }
        if let Some(floor) = self.frequency_floor {
            config.alerts.frequency_floor = floor;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the update loop until Ctrl-C
    Run,

    /// Run a single cycle and exit
    Once,

    /// Page historical bars for tokens without a table
    Backfill {
        /// How many days back to go (defaults to market_data.backfill_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show detected support levels for one token
    Levels {
        symbol: String,
    },

    /// Manage notification destinations
    Chats {
        #[command(subcommand)]
        action: ChatsAction,
    },
}

#[derive(Subcommand)]
pub enum ChatsAction {
    /// Register a chat id
    Add {
        id: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove a chat id
    Remove { id: String },
    /// List registered chat ids
    List,
    /// Register every chat that has messaged the bot
    Discover,
    /// Send a test message to every registered chat
    Test {
        #[arg(long, default_value = "levelwatch test message")]
        message: String,
    },
}

/// Stand-in when no bot token is configured: every send fails and is logged.
struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _destination: &str, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Request("no bot token configured".to_string()))
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<(), AppError> {
        match command {
            Commands::Run => Self::execute_run_command(config, true).await,
            Commands::Once => Self::execute_run_command(config, false).await,
            Commands::Backfill { days } => Self::execute_backfill_command(days, config).await,
            Commands::Levels { symbol } => Self::execute_levels_command(&symbol, config).await,
            Commands::Chats { action } => Self::execute_chats_command(action, config).await,
        }
    }

    fn telegram(config: &AppConfig) -> Result<Option<TelegramNotifier>, AppError> {
        match config.notifier.bot_token.as_deref() {
            Some(token) if !token.is_empty() => {
                Ok(Some(TelegramNotifier::new(&config.notifier, token)?))
            }
            _ => Ok(None),
        }
    }

    fn require_telegram(config: &AppConfig) -> Result<TelegramNotifier, AppError> {
        Self::telegram(config)?.ok_or_else(|| {
            ConfigError::Validation(
                "notifier.bot_token (or LEVELWATCH_BOT_TOKEN) is required".to_string(),
            )
            .into()
        })
    }

    fn build_orchestrator(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<UpdateOrchestrator, AppError> {
        let client = CoinGeckoClient::new(&config.market_data)?;
        let fetcher = RetryingFetcher::new(client, RetryPolicy::from_config(&config.market_data));
        let repository = CsvSeriesRepository::new(config.token_dir());

        Ok(UpdateOrchestrator::new(
            config,
            Arc::new(fetcher),
            Arc::new(repository),
            notifier,
            Arc::new(SystemClock),
        ))
    }

    async fn execute_run_command(config: AppConfig, forever: bool) -> Result<(), AppError> {
        let telegram = Self::telegram(&config)?;
        let mut registry = DestinationRegistry::load(&config.data_root).await?;

        if registry.is_empty() {
            if let Some(bot) = &telegram {
                info!("no registered chats, asking the bot for chat ids");
                match bot.discover_chat_ids().await {
                    Ok(ids) => {
                        let now = Utc::now().timestamp();
                        for id in &ids {
                            registry.add(id, None, now);
                        }
                        if !ids.is_empty() {
                            registry.save().await?;
                        }
                    }
                    Err(e) => warn!(error = %e, "chat discovery failed"),
                }
            }
        }
        if registry.is_empty() {
            warn!("no notification destinations registered; alerts will not be delivered");
        }

        let notifier: Arc<dyn Notifier> = match telegram {
            Some(bot) => Arc::new(bot),
            None => {
                warn!("no bot token configured; alerts will only be logged");
                Arc::new(DisabledNotifier)
            }
        };

        let mut orchestrator = Self::build_orchestrator(&config, notifier)?
            .with_destinations(registry.ids())
            .with_enrichment(TokenInfoCatalog::load(&config.data_root).await)
            .with_history_log(AlertHistoryLog::new(config.data_root.join("alert_history.csv")));

        if config.alerts.persist_state {
            let file = AlertStateFile::new(&config.data_root);
            let state = file.load().await;
            info!(keys = state.len(), "restored alert state");
            orchestrator = orchestrator
                .with_alert_state(Box::new(state))
                .with_state_file(file);
        }

        let cancel = CancellationToken::new();
        if forever {
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received, stopping after the current step");
                    shutdown.cancel();
                }
            });
            orchestrator.run(cancel).await;
        } else {
            let report = orchestrator.run_cycle(&cancel).await;
            if report.tokens_failed == report.tokens_total && report.tokens_total > 0 {
                error!("every token failed to update");
            }
        }
        Ok(())
    }

    async fn execute_backfill_command(days: Option<u32>, config: AppConfig) -> Result<(), AppError> {
        let orchestrator = Self::build_orchestrator(&config, Arc::new(DisabledNotifier))?;

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });

        orchestrator.backfill(days, &cancel).await;
        Ok(())
    }

    async fn execute_levels_command(symbol: &str, config: AppConfig) -> Result<(), AppError> {
        let orchestrator = Self::build_orchestrator(&config, Arc::new(DisabledNotifier))?;
        let levels = orchestrator.inspect_levels(symbol).await?;

        if levels.is_empty() {
            info!(token = symbol, "no support levels (not enough history yet)");
            return Ok(());
        }

        info!(token = symbol, count = levels.len(), "support levels");
        for (i, view) in levels.iter().enumerate() {
            let distance = view
                .distance_percent
                .map(|d| format!("{:.2}%", d))
                .unwrap_or_else(|| "-".to_string());
            info!(
                "   {}. price {:.10}  frequency {}  strength {:.3}  distance {}",
                i + 1,
                view.level.price,
                view.level.frequency,
                view.strength,
                distance
            );
        }
        Ok(())
    }

    async fn execute_chats_command(action: ChatsAction, config: AppConfig) -> Result<(), AppError> {
        let mut registry = DestinationRegistry::load(&config.data_root).await?;
        let now = Utc::now().timestamp();

        match action {
            ChatsAction::Add { id, label } => {
                if !registry.add(&id, label, now) {
                    info!(destination = %id, "already registered");
                }
                registry.save().await?;
            }
            ChatsAction::Remove { id } => {
                if registry.remove(&id) {
                    info!(destination = %id, "removed destination");
                    registry.save().await?;
                } else {
                    warn!(destination = %id, "not registered");
                }
            }
            ChatsAction::List => {
                info!(count = registry.len(), "registered destinations");
                for (id, meta) in registry.entries() {
                    info!(
                        "   {}  registered_at {}  {}",
                        id,
                        meta.registered_at,
                        meta.label.as_deref().unwrap_or("")
                    );
                }
            }
            ChatsAction::Discover => {
                let bot = Self::require_telegram(&config)?;
                let ids = bot.discover_chat_ids().await?;
                let added = ids.iter().filter(|id| registry.add(id, None, now)).count();
                info!(found = ids.len(), added, "chat discovery finished");
                registry.save().await?;
            }
            ChatsAction::Test { message } => {
                let bot = Self::require_telegram(&config)?;
                let gateway = NotifierGateway::new(Arc::new(bot));
                let report = gateway.broadcast(&registry.ids(), &message).await;
                if !report.is_success() {
                    return Err(NotifyError::NoDestinations.into());
                }
                info!(
                    delivered = report.delivered(),
                    failed = report.failed(),
                    "test message sent"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        data_root = "/tmp/levelwatch"

        [[tokens]]
        symbol = "PEPE"
        pool_address = "pool-1"
    "#;

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::try_parse_from([
            "levelwatch",
            "--config",
            "x.toml",
            "once",
            "--interval",
            "60",
            "--cooldown",
            "3600",
            "--frequency-floor",
            "5",
        ])
        .unwrap();
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        cli.overrides.apply(&mut config);

        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Commands::Once));
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.alerts.cooldown_secs, 3600);
        assert_eq!(config.alerts.frequency_floor, 5);
        assert_eq!(config.alerts.alert_threshold, 0.01);
    }

    #[test]
    fn test_parse_chat_and_backfill_commands() {
        let cli = Cli::try_parse_from(["levelwatch", "chats", "add", "42", "--label", "ops"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Chats { action: ChatsAction::Add { ref id, .. } } if id == "42"
        ));

        let cli = Cli::try_parse_from(["levelwatch", "backfill", "--days", "7"]).unwrap();
        assert!(matches!(cli.command, Commands::Backfill { days: Some(7) }));
    }

    #[tokio::test]
    async fn test_chats_add_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.data_root = dir.path().to_path_buf();

        CommandExecutor::execute(
            Commands::Chats {
                action: ChatsAction::Add {
                    id: "42".into(),
                    label: None,
                },
            },
            config.clone(),
        )
        .await
        .unwrap();

        let registry = DestinationRegistry::load(&config.data_root).await.unwrap();
        assert_eq!(registry.ids(), vec!["42".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_requires_bot_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.data_root = dir.path().to_path_buf();

        let result = CommandExecutor::execute(
            Commands::Chats {
                action: ChatsAction::Discover,
            },
            config,
        )
        .await;
        assert!(matches!(result, Err(AppError::Config(ConfigError::Validation(_)))));
    }
}
