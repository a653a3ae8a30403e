//! Price-history analytics over bar tables

use crate::shared::types::Bar;

/// Seconds at the start of a history excluded from drawdown analysis.
pub const LAUNCH_SKIP_SECS: i64 = 15 * 60;

/// Peak-to-trough summary after the launch window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    pub peak: f64,
    pub peak_time: i64,
    pub trough: f64,
    pub trough_time: i64,
    pub percentage: f64,
}

/// Analyzes bar history
pub struct PriceAnalyzer {
    skip_secs: i64,
}

impl Default for PriceAnalyzer {
    fn default() -> Self {
        Self {
            skip_secs: LAUNCH_SKIP_SECS,
        }
    }
}

impl PriceAnalyzer {
    pub fn with_skip(skip_secs: i64) -> Self {
        Self { skip_secs }
    }

    /// Largest drop from the highest high to the lowest low at or after it.
    ///
    /// Bars within `skip_secs` of the first bar are ignored. `None` when nothing is
    /// left after the skip.
    pub fn max_drawdown(&self, bars: &[Bar]) -> Option<Drawdown> {
        let start = bars.iter().map(|b| b.timestamp).min()?;
        let cutoff = start + self.skip_secs;
        let filtered: Vec<&Bar> = bars.iter().filter(|b| b.timestamp > cutoff).collect();

        // first occurrence of the highest high
        let (peak_idx, peak_bar) = filtered
            .iter()
            .enumerate()
            .fold(None::<(usize, &&Bar)>, |best, (i, b)| match best {
                Some((_, top)) if top.high >= b.high => best,
                _ => Some((i, b)),
            })?;

        let after = &filtered[peak_idx..];
        if after.len() < 2 || peak_bar.high <= 0.0 {
            return Some(Drawdown {
                peak: peak_bar.high,
                peak_time: peak_bar.timestamp,
                trough: peak_bar.high,
                trough_time: peak_bar.timestamp,
                percentage: 0.0,
            });
        }

        let trough_bar = after
            .iter()
            .copied()
            .fold(after[0], |low, b| if b.low < low.low { b } else { low });

        Some(Drawdown {
            peak: peak_bar.high,
            peak_time: peak_bar.timestamp,
            trough: trough_bar.low,
            trough_time: trough_bar.timestamp,
            percentage: (peak_bar.high - trough_bar.low) / peak_bar.high * 100.0,
        })
    }

    /// Highest high across the whole history
    pub fn all_time_high(&self, bars: &[Bar]) -> Option<f64> {
        bars.iter().map(|b| b.high).reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, high: f64, low: f64) -> Bar {
        Bar::new(ts, low, high, low, low, 0.0)
    }

    #[test]
    fn test_drawdown_skips_launch_window() {
        let bars = vec![
            bar(0, 50.0, 1.0),   // launch spike, ignored
            bar(900, 9.0, 8.0),  // at cutoff, ignored
            bar(1800, 10.0, 9.0),
            bar(2700, 8.0, 6.0),
            bar(3600, 9.0, 7.0),
        ];
        let dd = PriceAnalyzer::default().max_drawdown(&bars).unwrap();
        assert_eq!(dd.peak, 10.0);
        assert_eq!(dd.trough, 6.0);
        assert_eq!(dd.trough_time, 2700);
        assert!((dd.percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_drawdown_zero_when_peak_is_last() {
        let bars = vec![bar(0, 1.0, 1.0), bar(1800, 2.0, 1.5), bar(2700, 3.0, 2.5)];
        let dd = PriceAnalyzer::default().max_drawdown(&bars).unwrap();
        assert_eq!(dd.percentage, 0.0);
        assert_eq!(dd.peak, 3.0);
    }

    #[test]
    fn test_drawdown_none_without_data_after_skip() {
        let analyzer = PriceAnalyzer::default();
        assert!(analyzer.max_drawdown(&[]).is_none());
        assert!(analyzer.max_drawdown(&[bar(0, 1.0, 1.0), bar(600, 2.0, 1.0)]).is_none());
    }

    #[test]
    fn test_all_time_high() {
        let bars = vec![bar(0, 1.0, 1.0), bar(1, 7.0, 2.0), bar(2, 3.0, 1.0)];
        assert_eq!(PriceAnalyzer::with_skip(0).all_time_high(&bars), Some(7.0));
    }
}
