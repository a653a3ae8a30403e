//! Backward pagination over a pool's OHLCV history

use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BarFetcher, FetchRequest};
use crate::domain::bars::sort_and_dedup;
use crate::shared::errors::FetchError;
use crate::shared::types::Bar;

/// Page backward from `request.before_timestamp` (or now) until the provider runs out
/// of bars or the page crosses `horizon` (oldest unix second to keep).
///
/// A failure on the first page is returned; later failures end paging and keep what
/// was collected.
pub async fn fetch_history(
    fetcher: &dyn BarFetcher,
    request: &FetchRequest,
    horizon: Option<i64>,
    page_delay: Duration,
) -> Result<Vec<Bar>, FetchError> {
    let mut collected: Vec<Bar> = Vec::new();
    let mut page_request = request.clone();
    let mut pages = 0usize;

    loop {
        let page = match fetcher.fetch_bars(&page_request).await {
            Ok(page) => page,
            Err(e) if pages == 0 => return Err(e),
            Err(e) => {
                warn!(pool = %request.pool_address, pages, error = %e, "history paging stopped early");
                break;
            }
        };
        pages += 1;

        if page.is_empty() {
            debug!(pool = %request.pool_address, pages, "no more history");
            break;
        }

        let Some(oldest) = page.iter().map(|b| b.timestamp).min() else {
            break;
        };
        if let Some(before) = page_request.before_timestamp {
            if oldest >= before {
                debug!(pool = %request.pool_address, "page yielded no older bars");
                break;
            }
        }

        let mut reached_horizon = false;
        for bar in page {
            match horizon {
                Some(h) if bar.timestamp < h => reached_horizon = true,
                _ => collected.push(bar),
            }
        }
        if reached_horizon {
            debug!(pool = %request.pool_address, pages, "reached history horizon");
            break;
        }

        page_request = page_request.before(oldest);
        if !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }

    sort_and_dedup(&mut collected);
    info!(pool = %request.pool_address, pages, bars = collected.len(), "history fetched");
    Ok(collected)
}
