//! Nanosecond wall-clock timestamps

use std::time::{SystemTime, UNIX_EPOCH};

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Current wall-clock time in nanoseconds since the Unix epoch
///
/// Returns 0 if the system clock reports a time before the epoch.
pub fn current_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let a = current_timestamp_ns();
        let b = current_timestamp_ns();
        assert!(a > 0);
        assert!(b >= a);
    }
}
