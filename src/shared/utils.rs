//! Utility functions and helpers

/// Relative distance `|a - reference| / reference`.
///
/// Returns `f64::INFINITY` for a non-positive reference so threshold checks fail closed.
pub fn relative_distance(a: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (a - reference).abs() / reference
    } else {
        f64::INFINITY
    }
}

/// Next multiple of `interval_secs` strictly after `now_secs` (epoch-aligned).
pub fn next_boundary(now_secs: i64, interval_secs: u64) -> i64 {
    let interval = interval_secs.max(1) as i64;
    (now_secs.div_euclid(interval) + 1) * interval
}

/// 1234567.0 -> "1.23M"
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{:.2}", value)
    }
}

/// Truncate to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_distance() {
        assert!((relative_distance(101.0, 100.0) - 0.01).abs() < 1e-12);
        assert!((relative_distance(99.0, 100.0) - 0.01).abs() < 1e-12);
        assert!(relative_distance(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_next_boundary_aligns_to_interval() {
        // 10:07:30 -> 10:15:00
        let now = 10 * 3600 + 7 * 60 + 30;
        assert_eq!(next_boundary(now, 900), 10 * 3600 + 15 * 60);
        // exactly on a boundary moves to the next one
        assert_eq!(next_boundary(900, 900), 1800);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(999.0), "999.00");
        assert_eq!(format_compact(12_340.0), "12.34K");
        assert_eq!(format_compact(5_600_000.0), "5.60M");
        assert_eq!(format_compact(2_000_000_000.0), "2.00B");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 200), "short");
        let long = "x".repeat(250);
        let cut = truncate_chars(&long, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("..."));
    }
}
