//! Process-wide start timestamp.
//!
//! The value is captured once, as early as possible in the process, and is
//! read-only afterwards. Collectors take it as a plain value so tests can
//! inject their own.

use std::sync::OnceLock;

use chrono::Utc;

static START_TIME_SECONDS: OnceLock<i64> = OnceLock::new();

/// Captures the start timestamp if it has not been captured yet.
///
/// Call this first thing in `main`. Returns the stored value.
pub fn init() -> i64 {
    *START_TIME_SECONDS.get_or_init(|| Utc::now().timestamp())
}

/// Returns the process start time in seconds since the Unix epoch.
///
/// Falls back to capturing it now if [`init`] was never called.
pub fn process_start_time() -> i64 {
    init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_time_is_write_once() {
        let first = init();
        assert_eq!(process_start_time(), first);
        assert_eq!(init(), first);
    }

    #[test]
    fn test_start_time_is_recent() {
        let now = Utc::now().timestamp();
        let start = process_start_time();
        assert!(start <= now);
        assert!(start > 1_600_000_000);
    }
}
