pub mod gateway;
pub mod registry;
pub mod telegram;

pub use gateway::{DeliveryReport, NotifierGateway};
pub use registry::{DestinationMeta, DestinationRegistry};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::shared::errors::NotifyError;

/// Delivers text to one opaque destination id.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError>;
}
