//! Adapters for market data, notification, persistence and enrichment

pub mod enrichment;
pub mod market_data;
pub mod notifier;
pub mod storage;

pub use enrichment::TokenInfoCatalog;
pub use market_data::{BarFetcher, CoinGeckoClient, FetchRequest, RetryPolicy, RetryingFetcher};
pub use notifier::{DestinationRegistry, Notifier, NotifierGateway, TelegramNotifier};
pub use storage::{AlertHistoryLog, AlertStateFile, CsvSeriesRepository, JsonStore};
