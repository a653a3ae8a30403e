//! Fan-out of one message to every registered destination

use std::sync::Arc;
use tracing::{error, info, warn};

use super::Notifier;
use crate::shared::errors::NotifyError;

/// Per-destination outcome of one broadcast
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub results: Vec<(String, Result<(), NotifyError>)>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.delivered()
    }

    /// At least one destination accepted the message.
    pub fn is_success(&self) -> bool {
        self.delivered() > 0
    }
}

pub struct NotifierGateway {
    notifier: Arc<dyn Notifier>,
}

impl NotifierGateway {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Sends to each destination in turn; one failure does not stop the rest.
    pub async fn broadcast(&self, destinations: &[String], text: &str) -> DeliveryReport {
        if destinations.is_empty() {
            warn!("{}", NotifyError::NoDestinations);
            return DeliveryReport::default();
        }

        let mut report = DeliveryReport::default();
        for destination in destinations {
            let result = self.notifier.send(destination, text).await;
            match &result {
                Ok(()) => info!(destination = %destination, "message delivered"),
                Err(e) => error!(destination = %destination, error = %e, "delivery failed"),
            }
            report.results.push((destination.clone(), result));
        }
        report
    }
}
