//! # Jitter for scheduled poll delays.
//!
//! [`jittered`] adds a uniform random offset to a base delay so that many
//! clients polling the same backend do not align into synchronized bursts.
//!
//! The offset is *additive*: the result is always in
//! `[base_ms, base_ms + jitter_max_ms]`, so jitter can never shorten a delay
//! below the backoff policy's output. Every scheduled poll delay goes through
//! this, steady cadence and failure backoff alike.

use rand::Rng;

/// Adds a uniform random offset in `0..=jitter_max_ms` to `base_ms`.
///
/// Randomness is drawn freshly per call from the thread-local generator, so
/// there is no shared sequence an implementer can exhaust or accidentally
/// correlate across controllers. `jitter_max_ms == 0` disables jitter.
pub fn jittered(base_ms: u64, jitter_max_ms: u64) -> u64 {
    if jitter_max_ms == 0 {
        return base_ms;
    }
    let mut rng = rand::rng();
    base_ms.saturating_add(rng.random_range(0..=jitter_max_ms))
}
