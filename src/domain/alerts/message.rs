//! HTML alert text for the chat gateway

use std::fmt::Write;

use crate::shared::types::{AlertRecord, TokenInfo};
use crate::shared::utils::{format_compact, truncate_chars};

const DESCRIPTION_MAX_CHARS: usize = 200;

/// Renders alert records, with a metadata section when enrichment is available.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter;

impl MessageFormatter {
    pub fn new() -> Self {
        Self
    }

    /// `drawdown_percent` is used when `info` is absent or carries no drawdown.
    /// `network` is the provider network id of the token's pool.
    pub fn format(
        &self,
        record: &AlertRecord,
        network: &str,
        info: Option<&TokenInfo>,
        drawdown_percent: Option<f64>,
    ) -> String {
        let mut msg = String::new();
        let symbol = escape_html(record.token.as_str());

        let _ = writeln!(msg, "📊 <b>Support Signal</b>");
        match info {
            Some(info) => {
                let name = info.name.as_deref().map(escape_html).unwrap_or_default();
                let address = info.address.as_deref().map(str::trim).filter(|a| !a.is_empty());
                match (address, explorer_chain(network)) {
                    (Some(address), Some(chain)) => {
                        let _ = writeln!(
                            msg,
                            "<a href='https://gmgn.ai/{}/token/{}'>{} - {}</a>",
                            chain,
                            escape_attr(address),
                            symbol,
                            name
                        );
                    }
                    _ => {
                        let _ = writeln!(msg, "<b>{}</b> - {}", symbol, name);
                    }
                }
                if let Some(address) = address {
                    let _ = writeln!(msg, "<code>{}</code>", escape_html(address));
                }
                msg.push('\n');
                self.write_metadata(&mut msg, record, info, drawdown_percent);
            }
            None => {
                let _ = writeln!(msg, "<b>{}</b>\n", symbol);
                if let Some(dd) = drawdown_percent {
                    let _ = writeln!(msg, "📉 Max drawdown: {:.2}%\n", dd);
                }
            }
        }

        let _ = writeln!(msg, "⚠️ <b>Price alert</b>");
        let _ = writeln!(msg, "Current price: {}", format_price(record.current_price));
        let _ = writeln!(msg, "Support level: {}", format_price(record.level_price));
        let _ = writeln!(msg, "Level frequency: {}", record.level_frequency);
        let _ = write!(msg, "Distance: {:.2}%", record.distance_percent);
        msg
    }

    fn write_metadata(
        &self,
        msg: &mut String,
        record: &AlertRecord,
        info: &TokenInfo,
        drawdown_percent: Option<f64>,
    ) {
        let _ = writeln!(msg, "🔍 Token info");
        match market_cap(info, record.current_price) {
            Some(cap) => {
                let _ = writeln!(msg, "Market cap: ${}", format_compact(cap));
            }
            None => {
                let _ = writeln!(msg, "Market cap: unknown");
            }
        }

        let socials = [
            social_link("Twitter", info.twitter_handle.as_deref(), |h| {
                format!("https://twitter.com/{}", h)
            }),
            social_link("Telegram", info.telegram_handle.as_deref(), |h| {
                format!("https://t.me/{}", h)
            }),
            social_link("Website", info.website.as_deref(), |w| w.to_string()),
        ];
        let _ = writeln!(msg, "{}\n", socials.join(" | "));

        let _ = writeln!(msg, "📈 Price history");
        let ath = info.ath_usd.unwrap_or(0.0);
        let _ = writeln!(msg, "ATH: ${}", format_compact(ath));
        let drawdown = info
            .max_drawdown_percentage
            .or(drawdown_percent)
            .unwrap_or(0.0);
        let _ = writeln!(msg, "Max drawdown: {:.2}%", drawdown);
        let _ = writeln!(msg, "Age: {} days\n", info.age_days.unwrap_or(0));

        let description = info
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| truncate_chars(d, DESCRIPTION_MAX_CHARS))
            .unwrap_or_else(|| "No description available".to_string());
        let _ = writeln!(msg, "📝 About");
        let _ = writeln!(msg, "{}\n", escape_html(&description));
    }
}

/// Estimated market cap: `fdv / reference price * current price`.
pub fn market_cap(info: &TokenInfo, current_price: f64) -> Option<f64> {
    match (info.fdv_usd, info.price_usd) {
        (Some(fdv), Some(price)) if price > 0.0 => Some(fdv / price * current_price),
        _ => None,
    }
}

fn social_link(label: &str, handle: Option<&str>, url: impl Fn(&str) -> String) -> String {
    match handle.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => format!("<a href='{}'>{} ✓</a>", escape_attr(&url(h)), label),
        None => format!("{} ✗", label),
    }
}

const PRICE_SIGNIFICANT_DIGITS: i32 = 4;
const PRICE_MAX_DECIMALS: i32 = 20;

/// Sub-unit prices keep at least eight decimals and four significant digits.
fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1.0 {
        return format!("{:.4}", price);
    }
    let decimals = if abs > 0.0 && abs.is_finite() {
        let leading_zeros = -(abs.log10().floor() as i32) - 1;
        (leading_zeros + PRICE_SIGNIFICANT_DIGITS).clamp(8, PRICE_MAX_DECIMALS)
    } else {
        8
    };
    format!("{:.*}", decimals as usize, price)
}

/// gmgn chain slug for a provider network id.
fn explorer_chain(network: &str) -> Option<&'static str> {
    match network.to_ascii_lowercase().as_str() {
        "solana" => Some("sol"),
        "eth" => Some("eth"),
        "base" => Some("base"),
        "bsc" => Some("bsc"),
        "tron" => Some("tron"),
        _ => None,
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escaping for values inside a quoted attribute.
fn escape_attr(s: &str) -> String {
    escape_html(s).replace('\'', "&#39;").replace('"', "&quot;")
}
