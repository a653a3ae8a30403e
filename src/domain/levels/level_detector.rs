//! Support-level detection over closing prices

use crate::shared::config::DetectorCfg;
use crate::shared::types::{Bar, SupportLevel};
use crate::shared::utils::relative_distance;

/// Indices `i` whose close is `<=` every close in the `window` bars on each side.
///
/// Flat troughs report every tied index. Fewer than `2 * window + 1` closes yield nothing.
pub fn find_local_minima(closes: &[f64], window: usize) -> Vec<usize> {
    if window == 0 || closes.len() < 2 * window + 1 {
        return Vec::new();
    }

    (window..closes.len() - window)
        .filter(|&i| {
            let c = closes[i];
            closes[i - window..i].iter().all(|&p| c <= p)
                && closes[i + 1..=i + window].iter().all(|&p| c <= p)
        })
        .collect()
}

/// Greedy, time-ordered filter: a price survives only if no already-kept price lies
/// within `proximity_threshold` of it (relative to the kept price).
pub fn filter_near_duplicates(prices: &[f64], proximity_threshold: f64) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::with_capacity(prices.len());
    for &price in prices {
        if !kept
            .iter()
            .any(|&k| relative_distance(price, k) < proximity_threshold)
        {
            kept.push(price);
        }
    }
    kept
}

/// Single-pass clustering on the sorted price axis.
///
/// A price joins the open group while its distance to the group's running mean is at
/// most `merge_threshold`; otherwise the group is emitted and a new one starts.
pub fn merge_levels(prices: &[f64], merge_threshold: f64) -> Vec<SupportLevel> {
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut levels = Vec::new();
    let mut group: Vec<f64> = Vec::new();

    for price in sorted {
        if !group.is_empty() && relative_distance(price, mean(&group)) > merge_threshold {
            levels.push(close_group(&group));
            group.clear();
        }
        group.push(price);
    }
    if !group.is_empty() {
        levels.push(close_group(&group));
    }
    levels
}

/// Fraction of closes within `band` of `level_price`.
pub fn strength(bars: &[Bar], level_price: f64, band: f64) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let near = bars
        .iter()
        .filter(|b| relative_distance(b.close, level_price) < band)
        .count();
    near as f64 / bars.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn close_group(group: &[f64]) -> SupportLevel {
    SupportLevel {
        price: mean(group),
        frequency: group.len(),
    }
}

/// Detector parameters
#[derive(Debug, Clone)]
pub struct LevelDetector {
    pub window: usize,
    pub proximity_threshold: f64,
    pub merge_threshold: f64,
    pub strength_band: f64,
    pub max_bars: Option<usize>,
}

impl Default for LevelDetector {
    fn default() -> Self {
        Self::from_config(&DetectorCfg::default())
    }
}

impl LevelDetector {
    pub fn from_config(cfg: &DetectorCfg) -> Self {
        Self {
            window: cfg.window,
            proximity_threshold: cfg.proximity_threshold,
            merge_threshold: cfg.merge_threshold,
            strength_band: cfg.strength_band,
            max_bars: cfg.max_bars,
        }
    }

    /// Bars that feed detection: the whole history, or its most recent `max_bars`.
    pub fn window_of<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        match self.max_bars {
            Some(max) if bars.len() > max => &bars[bars.len() - max..],
            _ => bars,
        }
    }

    /// Levels sorted by price ascending. Empty means not enough data yet.
    pub fn detect(&self, bars: &[Bar]) -> Vec<SupportLevel> {
        let bars = self.window_of(bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let minima: Vec<f64> = find_local_minima(&closes, self.window)
            .into_iter()
            .map(|i| closes[i])
            .collect();
        let candidates = filter_near_duplicates(&minima, self.proximity_threshold);
        merge_levels(&candidates, self.merge_threshold)
    }

    pub fn strength(&self, bars: &[Bar], level_price: f64) -> f64 {
        strength(self.window_of(bars), level_price, self.strength_band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes_to_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::flat(i as i64 * 900, c))
            .collect()
    }

    #[test]
    fn test_v_shape_has_single_minimum() {
        let closes = [5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(find_local_minima(&closes, 2), vec![4]);
    }

    #[test]
    fn test_flat_trough_reports_all_ties() {
        let closes = [5.0, 4.0, 1.0, 1.0, 1.0, 4.0, 5.0];
        assert_eq!(find_local_minima(&closes, 1), vec![2, 3, 4]);
    }

    #[test]
    fn test_too_few_points_yields_no_minima() {
        let closes = [3.0, 1.0, 3.0, 4.0];
        assert!(find_local_minima(&closes, 2).is_empty());
        // exactly 2 * window + 1 points is enough
        assert_eq!(find_local_minima(&[3.0, 2.0, 1.0, 2.0, 3.0], 2), vec![2]);
    }

    #[test]
    fn test_filter_first_occurrence_wins() {
        let kept = filter_near_duplicates(&[100.0, 101.0, 150.0, 99.0, 103.0], 0.02);
        assert_eq!(kept, vec![100.0, 150.0, 103.0]);
    }

    #[test]
    fn test_merge_levels_threshold() {
        let levels = merge_levels(&[150.0, 100.0, 101.0], 0.2);
        assert_eq!(levels.len(), 2);
        assert!((levels[0].price - 100.5).abs() < 1e-9);
        assert_eq!(levels[0].frequency, 2);
        assert_eq!(levels[1].price, 150.0);
        assert_eq!(levels[1].frequency, 1);

        let levels = merge_levels(&[100.0, 101.0, 150.0], 0.6);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].frequency, 3);
    }

    #[test]
    fn test_merge_levels_is_relative_across_magnitudes() {
        let levels = merge_levels(&[0.000_010, 0.000_011, 10.0, 11.0], 0.2);
        let freqs: Vec<_> = levels.iter().map(|l| l.frequency).collect();
        assert_eq!(freqs, vec![2, 2]);
    }

    #[test]
    fn test_merge_levels_empty() {
        assert!(merge_levels(&[], 0.2).is_empty());
    }

    #[test]
    fn test_strength_fraction() {
        let bars = closes_to_bars(&[100.0, 101.0, 110.0, 99.5]);
        let s = strength(&bars, 100.0, 0.02);
        assert!((s - 0.75).abs() < 1e-12);
        assert_eq!(strength(&[], 100.0, 0.02), 0.0);
    }

    #[test]
    fn test_detect_repeated_troughs() {
        // three troughs near 1.0 separated by peaks
        let mut closes = Vec::new();
        for trough in [1.00, 1.01, 0.99] {
            closes.extend_from_slice(&[2.0, 1.8, 1.5, trough, 1.5, 1.8, 2.0]);
        }
        let detector = LevelDetector {
            window: 2,
            proximity_threshold: 0.001,
            ..LevelDetector::default()
        };
        let levels = detector.detect(&closes_to_bars(&closes));

        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].frequency, 3);
        assert!((levels[0].price - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_not_enough_data() {
        let detector = LevelDetector::default();
        let bars = closes_to_bars(&[1.0; 40]);
        assert!(detector.detect(&bars).is_empty());
    }

    #[test]
    fn test_max_bars_windows_history() {
        let detector = LevelDetector {
            max_bars: Some(3),
            ..LevelDetector::default()
        };
        let bars = closes_to_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let windowed = detector.window_of(&bars);
        assert_eq!(windowed.len(), 3);
        assert_eq!(windowed[0].close, 3.0);
    }
}
