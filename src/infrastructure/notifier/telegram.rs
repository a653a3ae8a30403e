//! Telegram Bot API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

use super::Notifier;
use crate::shared::config::NotifierCfg;
use crate::shared::errors::NotifyError;

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

pub struct TelegramNotifier {
    http_client: Client,
    base_url: String,
    parse_mode: String,
}

impl TelegramNotifier {
    pub fn new(cfg: &NotifierCfg, bot_token: &str) -> Result<Self, NotifyError> {
        let http_client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http_client,
            base_url: format!("{}/bot{}", cfg.api_base.trim_end_matches('/'), bot_token),
            parse_mode: cfg.parse_mode.clone(),
        })
    }

    /// Chat ids seen in the bot's pending updates.
    pub async fn discover_chat_ids(&self) -> Result<Vec<String>, NotifyError> {
        let url = format!("{}/getUpdates", self.base_url);
        let response: BotResponse = self.http_client.get(&url).send().await?.json().await?;
        if !response.ok {
            return Err(NotifyError::Rejected {
                destination: "getUpdates".to_string(),
                description: response.description.unwrap_or_default(),
            });
        }

        let ids = extract_chat_ids(response.result.as_ref().unwrap_or(&Value::Null));
        info!(found = ids.len(), "discovered chat ids");
        Ok(ids)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = json!({
            "chat_id": destination,
            "text": text,
            "parse_mode": self.parse_mode,
            "disable_web_page_preview": true,
        });

        debug!(destination, "sending message");
        let response = self.http_client.post(&url).json(&body).send().await?;
        let status = response.status();
        let reply: BotResponse = match response.json().await {
            Ok(reply) => reply,
            Err(_) => {
                return Err(NotifyError::Rejected {
                    destination: destination.to_string(),
                    description: format!("HTTP {}", status),
                })
            }
        };

        if reply.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                destination: destination.to_string(),
                description: reply
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            })
        }
    }
}

/// Collect `chat.id` from message, channel post and membership updates.
fn extract_chat_ids(result: &Value) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for update in result.as_array().into_iter().flatten() {
        for kind in ["message", "channel_post", "my_chat_member", "edited_message"] {
            if let Some(id) = update.get(kind).and_then(|m| m.get("chat")).and_then(|c| c.get("id")) {
                let id = match id {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => continue,
                };
                ids.insert(id);
            }
        }
    }
    ids.into_iter().collect()
}
