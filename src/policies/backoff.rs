//! # Failure backoff for the polling loop.
//!
//! [`next_backoff`] computes the delay after a failed poll tick. The policy
//! is deliberately simple:
//!
//! - a healthy loop (`current_ms == 0`) that starts failing waits exactly
//!   [`BACKOFF_FLOOR_MS`] before the first retry;
//! - every further failure doubles the delay;
//! - the delay never exceeds the caller's ceiling.
//!
//! The function is pure. The caller owns the running value, resets it to `0`
//! on success, and validates `max >= floor` at configuration time (a ceiling
//! below the floor is a configuration error, never clamped here).
//!
//! # Example
//! ```rust
//! use roomlink::{next_backoff, BACKOFF_FLOOR_MS};
//!
//! // Healthy → first failure: the floor.
//! assert_eq!(next_backoff(0, 30_000), BACKOFF_FLOOR_MS);
//!
//! // Repeated failures double up to the ceiling and stay there.
//! assert_eq!(next_backoff(1_000, 30_000), 2_000);
//! assert_eq!(next_backoff(16_000, 30_000), 30_000);
//! assert_eq!(next_backoff(30_000, 30_000), 30_000);
//! ```

/// First retry delay after a healthy run starts failing, in milliseconds.
///
/// Part of the polling contract: no failure retry ever fires faster than
/// this, regardless of how short the steady interval is.
pub const BACKOFF_FLOOR_MS: u64 = 1_000;

/// Computes the next failure backoff from the current one.
///
/// `current_ms == 0` means the loop was healthy; the result is then the
/// floor. Otherwise the current delay doubles, capped at `max_ms`. Once the
/// ceiling is reached the function is idempotent: feeding the ceiling back
/// in returns the ceiling.
pub fn next_backoff(current_ms: u64, max_ms: u64) -> u64 {
    if current_ms == 0 {
        BACKOFF_FLOOR_MS
    } else {
        current_ms.saturating_mul(2).min(max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_state_starts_at_floor() {
        assert_eq!(next_backoff(0, 30_000), BACKOFF_FLOOR_MS);
        assert_eq!(next_backoff(0, 1_000), BACKOFF_FLOOR_MS);
    }

    #[test]
    fn test_failures_double() {
        assert_eq!(next_backoff(1_000, 30_000), 2_000);
        assert_eq!(next_backoff(2_000, 30_000), 4_000);
        assert_eq!(next_backoff(4_000, 30_000), 8_000);
        assert_eq!(next_backoff(8_000, 30_000), 16_000);
    }

    #[test]
    fn test_full_sequence_is_monotonic_until_ceiling() {
        let max = 30_000;
        let mut current = 0;
        let mut previous = 0;
        for step in 0..12 {
            current = next_backoff(current, max);
            assert!(
                current >= previous,
                "step {}: {}ms dropped below {}ms",
                step,
                current,
                previous
            );
            assert!(current <= max, "step {}: {}ms exceeds ceiling", step, current);
            previous = current;
        }
        assert_eq!(current, max, "sequence should settle at the ceiling");
    }

    #[test]
    fn test_ceiling_is_idempotent() {
        assert_eq!(next_backoff(30_000, 30_000), 30_000);
        assert_eq!(next_backoff(16_000, 30_000), 30_000);
    }

    #[test]
    fn test_odd_ceiling_clamps_exactly() {
        // Doubling 4000 overshoots a 7000ms ceiling; the cap applies, the
        // value is not rounded to a power of two.
        assert_eq!(next_backoff(4_000, 7_000), 7_000);
        assert_eq!(next_backoff(7_000, 7_000), 7_000);
    }

    #[test]
    fn test_huge_current_saturates_instead_of_overflowing() {
        assert_eq!(next_backoff(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(next_backoff(u64::MAX - 1, 30_000), 30_000);
    }
}
