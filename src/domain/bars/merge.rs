//! Pure merge of freshly fetched bars into an existing history

use crate::shared::types::Bar;

/// Sort ascending by timestamp and drop repeated timestamps, keeping the first seen.
pub fn sort_and_dedup(bars: &mut Vec<Bar>) {
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
}

/// Merge `incoming` into `existing`, returning the updated history and the number of
/// bars appended.
///
/// Without history the incoming batch becomes the history. With history, only bars
/// strictly newer than the last persisted timestamp are kept, so persisted bars are
/// never rewritten.
pub fn merge_bars(existing: Option<Vec<Bar>>, incoming: &[Bar]) -> (Vec<Bar>, usize) {
    match existing {
        Some(mut history) if !history.is_empty() => {
            sort_and_dedup(&mut history);
            let before = history.len();
            let last_timestamp = history.last().map(|b| b.timestamp).unwrap_or(i64::MIN);

            history.extend(incoming.iter().filter(|b| b.timestamp > last_timestamp).copied());
            sort_and_dedup(&mut history);

            let added = history.len() - before;
            (history, added)
        }
        _ => {
            let mut history = incoming.to_vec();
            sort_and_dedup(&mut history);
            let added = history.len();
            (history, added)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(timestamps: &[i64]) -> Vec<Bar> {
        timestamps.iter().map(|&t| Bar::flat(t, t as f64)).collect()
    }

    fn timestamps(bars: &[Bar]) -> Vec<i64> {
        bars.iter().map(|b| b.timestamp).collect()
    }

    #[test]
    fn test_merge_without_history_sorts_incoming() {
        let (merged, added) = merge_bars(None, &bars(&[300, 100, 200]));
        assert_eq!(timestamps(&merged), vec![100, 200, 300]);
        assert_eq!(added, 3);
    }

    #[test]
    fn test_merge_without_history_drops_duplicate_timestamps() {
        let (merged, added) = merge_bars(None, &bars(&[100, 100, 200]));
        assert_eq!(timestamps(&merged), vec![100, 200]);
        assert_eq!(added, 2);
    }

    #[test]
    fn test_merge_keeps_only_newer_bars() {
        let existing = bars(&[100, 200, 300]);
        let mut incoming = bars(&[200, 300, 400, 500]);
        // an overlapping bar with a different close must not overwrite history
        incoming[0].close = 9999.0;

        let (merged, added) = merge_bars(Some(existing), &incoming);
        assert_eq!(timestamps(&merged), vec![100, 200, 300, 400, 500]);
        assert_eq!(added, 2);
        assert_eq!(merged[1].close, 200.0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let incoming = bars(&[500, 100, 300, 200, 400]);
        let (first, added_first) = merge_bars(None, &incoming);
        let (second, added_second) = merge_bars(Some(first.clone()), &incoming);

        assert_eq!(added_first, 5);
        assert_eq!(added_second, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_output_strictly_ascending() {
        let existing = bars(&[10, 30, 20]);
        let incoming = bars(&[60, 40, 60, 50, 40]);
        let (merged, added) = merge_bars(Some(existing), &incoming);

        assert!(merged.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(added, 3);
    }

    #[test]
    fn test_empty_history_is_treated_as_absent() {
        let (merged, added) = merge_bars(Some(Vec::new()), &bars(&[1, 2]));
        assert_eq!(added, 2);
        assert_eq!(merged.len(), 2);
    }
}
