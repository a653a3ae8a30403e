//! Update cycle: fetch, merge, detect, evaluate, notify

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::alerts::{
    AlertEvaluator, AlertStateStore, Clock, InMemoryAlertStateStore, MessageFormatter,
};
use crate::domain::bars::{BarStore, SeriesHandle, SeriesRepository, TokenCatalog};
use crate::domain::levels::LevelDetector;
use crate::domain::price::PriceAnalyzer;
use crate::infrastructure::enrichment::TokenInfoCatalog;
use crate::infrastructure::market_data::{fetch_history, BarFetcher, FetchRequest};
use crate::infrastructure::notifier::{Notifier, NotifierGateway};
use crate::infrastructure::storage::{AlertHistoryLog, AlertStateFile};
use crate::shared::config::{AppConfig, MarketDataCfg, SchedulerCfg};
use crate::shared::errors::AppError;
use crate::shared::types::{AlertRecord, Bar, SupportLevel, TokenKey, TrackedToken};
use crate::shared::utils::{next_boundary, relative_distance};

/// Counters for one cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tokens_total: usize,
    pub tokens_updated: usize,
    pub tokens_failed: usize,
    pub bars_added: usize,
    pub alerts_emitted: usize,
    pub alerts_delivered: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub tokens_backfilled: usize,
    pub tokens_skipped: usize,
    pub tokens_failed: usize,
    pub bars_added: usize,
}

/// One detected level as seen from the latest close
#[derive(Debug, Clone, PartialEq)]
pub struct LevelView {
    pub level: SupportLevel,
    pub strength: f64,
    pub distance_percent: Option<f64>,
}

struct TokenUpdate {
    key: TokenKey,
    added: usize,
    history: Vec<Bar>,
}

struct PendingAlert {
    record: AlertRecord,
    strength: f64,
    drawdown_percent: Option<f64>,
}

pub struct UpdateOrchestrator {
    catalog: TokenCatalog,
    fetcher: Arc<dyn BarFetcher>,
    bar_store: BarStore,
    detector: LevelDetector,
    evaluator: AlertEvaluator,
    analyzer: PriceAnalyzer,
    formatter: MessageFormatter,
    alert_state: Box<dyn AlertStateStore>,
    state_file: Option<AlertStateFile>,
    gateway: NotifierGateway,
    destinations: Vec<String>,
    enrichment: TokenInfoCatalog,
    history_log: Option<AlertHistoryLog>,
    clock: Arc<dyn Clock>,
    market: MarketDataCfg,
    scheduler: SchedulerCfg,
}

impl UpdateOrchestrator {
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn BarFetcher>,
        repository: Arc<dyn SeriesRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: TokenCatalog::from_tokens(config.tokens.iter().cloned()),
            fetcher,
            bar_store: BarStore::new(repository),
            detector: LevelDetector::from_config(&config.detector),
            evaluator: AlertEvaluator::from_config(&config.alerts),
            analyzer: PriceAnalyzer::default(),
            formatter: MessageFormatter::new(),
            alert_state: Box::new(InMemoryAlertStateStore::new()),
            state_file: None,
            gateway: NotifierGateway::new(notifier),
            destinations: Vec::new(),
            enrichment: TokenInfoCatalog::default(),
            history_log: None,
            clock,
            market: config.market_data.clone(),
            scheduler: config.scheduler.clone(),
        }
    }

    pub fn with_destinations(mut self, destinations: Vec<String>) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn with_enrichment(mut self, enrichment: TokenInfoCatalog) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn with_alert_state(mut self, state: Box<dyn AlertStateStore>) -> Self {
        self.alert_state = state;
        self
    }

    /// Save alert state here at the end of every cycle.
    pub fn with_state_file(mut self, file: AlertStateFile) -> Self {
        self.state_file = Some(file);
        self
    }

    pub fn with_history_log(mut self, log: AlertHistoryLog) -> Self {
        self.history_log = Some(log);
        self
    }

    pub fn catalog(&self) -> &TokenCatalog {
        &self.catalog
    }

    pub fn alert_state(&self) -> &dyn AlertStateStore {
        self.alert_state.as_ref()
    }

    fn request_for(&self, token: &TrackedToken, limit: u32) -> FetchRequest {
        FetchRequest {
            network: token
                .network
                .clone()
                .unwrap_or_else(|| self.market.network.clone()),
            pool_address: token.pool_address.clone(),
            timeframe: self.market.timeframe.clone(),
            aggregate: self.market.aggregate,
            before_timestamp: None,
            limit,
        }
    }

    /// Fetch and merge one token. Tokens without a table pull a full page.
    async fn update_token(&self, handle: &SeriesHandle) -> Result<TokenUpdate, AppError> {
        let key = handle.key();
        let limit = if self.bar_store.has_history(&key).await {
            self.market.limit
        } else {
            self.market.backfill_limit
        };

        let bars = self
            .fetcher
            .fetch_bars(&self.request_for(&handle.token, limit))
            .await?;
        let merged = self.bar_store.merge(handle, &bars).await?;

        Ok(TokenUpdate {
            key,
            added: merged.added,
            history: merged.history,
        })
    }

    /// Run one cycle. Per-token failures are logged and counted, never propagated.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport {
            tokens_total: self.catalog.len(),
            ..CycleReport::default()
        };
        let concurrency = self.scheduler.max_concurrent_fetches.max(1);
        let handles: Vec<SeriesHandle> = self.catalog.handles().cloned().collect();

        let this = &*self;
        let results: Vec<(TokenKey, Option<Result<TokenUpdate, AppError>>)> =
            stream::iter(handles.iter())
                .map(move |handle| async move {
                    if cancel.is_cancelled() {
                        return (handle.key(), None);
                    }
                    (handle.key(), Some(this.update_token(handle).await))
                })
                .buffered(concurrency)
                .collect()
                .await;

        let now = self.clock.now();
        let pruned = self
            .alert_state
            .prune_expired(now, self.evaluator.cooldown_secs);
        if pruned > 0 {
            debug!(pruned, "pruned expired alert keys");
        }

        let mut pending = Vec::new();
        for (key, outcome) in results {
            match outcome {
                None => debug!(token = %key, "cancelled before update"),
                Some(Err(e)) => {
                    report.tokens_failed += 1;
                    error!(token = %key, error = %e, "token update failed, skipping");
                }
                Some(Ok(update)) => {
                    report.tokens_updated += 1;
                    report.bars_added += update.added;
                    pending.extend(self.evaluate_token(&update, now));
                }
            }
        }
        report.alerts_emitted = pending.len();

        for alert in &pending {
            if self.dispatch(alert).await {
                report.alerts_delivered += 1;
            }
        }

        self.persist_state().await;

        info!(
            tokens = report.tokens_total,
            updated = report.tokens_updated,
            failed = report.tokens_failed,
            bars_added = report.bars_added,
            alerts = report.alerts_emitted,
            delivered = report.alerts_delivered,
            "cycle complete"
        );
        report
    }

    fn evaluate_token(&mut self, update: &TokenUpdate, now: i64) -> Vec<PendingAlert> {
        let Some(last) = update.history.last() else {
            debug!(token = %update.key, "no bars yet");
            return Vec::new();
        };

        let levels = self.detector.detect(&update.history);
        if levels.is_empty() {
            debug!(token = %update.key, bars = update.history.len(), "not enough data for levels");
            return Vec::new();
        }

        let alerts = self.evaluator.evaluate(
            &update.key,
            last.close,
            &levels,
            self.alert_state.as_mut(),
            now,
        );
        if alerts.is_empty() {
            return Vec::new();
        }

        let drawdown_percent = self
            .analyzer
            .max_drawdown(&update.history)
            .map(|d| d.percentage);
        alerts
            .into_iter()
            .map(|record| PendingAlert {
                strength: self.detector.strength(&update.history, record.level_price),
                record,
                drawdown_percent,
            })
            .collect()
    }

    /// Cooldown is already committed; a failed delivery is only logged.
    async fn dispatch(&self, alert: &PendingAlert) -> bool {
        let record = &alert.record;
        let info = self.enrichment.get(record.token.as_str());
        let network = self
            .catalog
            .get(&record.token)
            .and_then(|handle| handle.token.network.as_deref())
            .unwrap_or(self.market.network.as_str());
        let text = self
            .formatter
            .format(record, network, info, alert.drawdown_percent);

        let delivery = self.gateway.broadcast(&self.destinations, &text).await;
        if !delivery.is_success() {
            error!(
                token = %record.token,
                level = record.level_price,
                failed = delivery.failed(),
                "alert not delivered"
            );
            return false;
        }

        info!(
            token = %record.token,
            level = record.level_price,
            frequency = record.level_frequency,
            distance_percent = record.distance_percent,
            delivered = delivery.delivered(),
            "alert dispatched"
        );
        if let Some(log) = &self.history_log {
            if let Err(e) = log.append(record, alert.strength).await {
                warn!(token = %record.token, error = %e, "failed to record alert history");
            }
        }
        true
    }

    async fn persist_state(&self) {
        if let Some(file) = &self.state_file {
            if let Err(e) = file.save(self.alert_state.as_ref()).await {
                warn!(error = %e, "failed to persist alert state");
            }
        }
    }

    /// Long-running loop: cycles on clock boundaries until `cancel` fires.
    ///
    /// Returns the number of cycles that ran.
    pub async fn run(&mut self, cancel: CancellationToken) -> usize {
        let interval = self.scheduler.interval_secs;
        let mut cycles = 0;
        let mut last_target: Option<i64> = None;

        info!(tokens = self.catalog.len(), interval_secs = interval, "starting update loop");
        if self.scheduler.run_on_start && !cancel.is_cancelled() {
            self.run_cycle(&cancel).await;
            cycles += 1;
        }

        loop {
            let now = self.clock.now();
            // a timer that fires slightly early must not target the same boundary twice
            let next = next_boundary(now.max(last_target.unwrap_or(now)), interval);
            let wait = Duration::from_secs((next - now).max(0) as u64);
            debug!(next_cycle = next, wait_secs = wait.as_secs(), "waiting for cycle boundary");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            last_target = Some(next);
            self.run_cycle(&cancel).await;
            cycles += 1;
        }

        info!(cycles, "update loop stopped");
        cycles
    }

    /// Page history for tokens that have no table yet.
    pub async fn backfill(&self, days: Option<u32>, cancel: &CancellationToken) -> BackfillReport {
        let mut report = BackfillReport::default();
        let horizon = days
            .or(self.market.backfill_days)
            .map(|d| self.clock.now() - i64::from(d) * 86_400);
        let page_delay = Duration::from_millis(self.market.page_delay_ms);

        for handle in self.catalog.handles() {
            if cancel.is_cancelled() {
                warn!("backfill cancelled");
                break;
            }
            let key = handle.key();
            if self.bar_store.has_history(&key).await {
                info!(token = %key, "bar table exists, skipping backfill");
                report.tokens_skipped += 1;
                continue;
            }

            let request = self.request_for(&handle.token, self.market.backfill_limit);
            let bars = match fetch_history(self.fetcher.as_ref(), &request, horizon, page_delay).await {
                Ok(bars) => bars,
                Err(e) => {
                    error!(token = %key, error = %e, "backfill fetch failed");
                    report.tokens_failed += 1;
                    continue;
                }
            };

            match self.bar_store.merge(handle, &bars).await {
                Ok(merged) => {
                    report.tokens_backfilled += 1;
                    report.bars_added += merged.added;
                }
                Err(e) => {
                    error!(token = %key, error = %e, "failed to store backfilled bars");
                    report.tokens_failed += 1;
                }
            }
        }

        info!(
            backfilled = report.tokens_backfilled,
            skipped = report.tokens_skipped,
            failed = report.tokens_failed,
            bars = report.bars_added,
            "backfill complete"
        );
        report
    }

    /// Levels for one token from its persisted history.
    pub async fn inspect_levels(&self, symbol: &str) -> Result<Vec<LevelView>, AppError> {
        let handle = self
            .catalog
            .find_symbol(symbol)
            .ok_or_else(|| AppError::UnknownToken(symbol.to_string()))?;
        let history = self
            .bar_store
            .load_or_empty(&handle.key())
            .await
            .unwrap_or_default();
        let last_close = history.last().map(|b| b.close);

        Ok(self
            .detector
            .detect(&history)
            .into_iter()
            .map(|level| LevelView {
                strength: self.detector.strength(&history, level.price),
                distance_percent: last_close.map(|c| relative_distance(c, level.price) * 100.0),
                level,
            })
            .collect())
    }
}
