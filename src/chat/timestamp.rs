//! Timestamp tokens for open-ended range queries.
//!
//! `"+inf"`/`"inf"` resolve to the current time, `"-inf"` to 0, anything
//! else must be a base-10 integer (seconds since the epoch).

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::error::{ChatError, ChatResult};

/// Current wall-clock time in seconds since the epoch.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Parse a boundary token, resolving `+inf` to `now`.
pub fn parse_at(token: &str, now: i64) -> ChatResult<i64> {
    match token {
        "+inf" | "inf" => Ok(now),
        "-inf" => Ok(0),
        _ => token
            .parse::<i64>()
            .map_err(|_| ChatError::InvalidTimestamp(token.to_string())),
    }
}

/// Inclusive `[from, to]` window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Resolve two tokens. An unparsable `from` becomes 0 and an
    /// unparsable `to` becomes `now`; neither is an error.
    pub fn resolve(from: &str, to: &str) -> Self {
        Self::resolve_at(from, to, now_secs())
    }

    pub fn resolve_at(from: &str, to: &str, now: i64) -> Self {
        let from = parse_at(from, now).unwrap_or_else(|e| {
            debug!("{e}; lower bound defaults to 0");
            0
        });
        let to = parse_at(to, now).unwrap_or_else(|e| {
            debug!("{e}; upper bound defaults to now ({now})");
            now
        });
        Self { from, to }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_tokens() {
        assert_eq!(parse_at("+inf", 500).unwrap(), 500);
        assert_eq!(parse_at("inf", 500).unwrap(), 500);
        assert_eq!(parse_at("-inf", 500).unwrap(), 0);
    }

    #[test]
    fn integer_literals() {
        assert_eq!(parse_at("1661360942", 0).unwrap(), 1_661_360_942);
        assert_eq!(parse_at("-5", 0).unwrap(), -5);
    }

    #[test]
    fn garbage_is_invalid() {
        for token in ["", "abc", "12abc", "1.5", " 12"] {
            assert!(
                matches!(parse_at(token, 0), Err(ChatError::InvalidTimestamp(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn live_clock_resolves_inf() {
        let before = now_secs();
        let window = TimeWindow::resolve("-inf", "+inf");
        assert_eq!(window.from, 0);
        assert!(window.to >= before);
    }

    #[test]
    fn window_defaults_on_bad_tokens() {
        assert_eq!(TimeWindow::resolve_at("junk", "junk", 900), TimeWindow::new(0, 900));
        assert_eq!(TimeWindow::resolve_at("-inf", "+inf", 900), TimeWindow::new(0, 900));
        assert_eq!(TimeWindow::resolve_at("150", "300", 900), TimeWindow::new(150, 300));
    }

    #[test]
    fn window_is_inclusive() {
        let window = TimeWindow::new(100, 200);
        assert!(window.contains(100));
        assert!(window.contains(200));
        assert!(!window.contains(99));
        assert!(!window.contains(201));
        assert!(!TimeWindow::new(300, 100).contains(200));
    }
}
