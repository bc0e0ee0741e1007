//! Constants shared by the memocache crates.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// SWEEP CADENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// The expiry sweep runs every `ttl * SWEEP_INTERVAL_MULTIPLIER`.
///
/// Expired entries are invisible to lookups immediately; the sweep only bounds how
/// long their memory stays reachable, at most about this many TTLs past expiry.
pub const SWEEP_INTERVAL_MULTIPLIER: u32 = 5;

/// Upper bound on the sweep period.
///
/// Keeps timer deadline arithmetic in range for very large TTLs.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default TTL for [`CacheConfig`](crate::CacheConfig), in milliseconds.
pub const DEFAULT_TTL_MS: i64 = 60_000;

/// Computes the sweep period for a TTL.
///
/// The period is `ttl * SWEEP_INTERVAL_MULTIPLIER` only while that stays below
/// [`MAX_SWEEP_INTERVAL`]; TTLs above six days get the clamped period, so expired
/// entries are reclaimed sooner than five TTLs after expiry.
pub fn sweep_interval_for(ttl: Duration) -> Duration {
    ttl.saturating_mul(SWEEP_INTERVAL_MULTIPLIER)
        .min(MAX_SWEEP_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_interval_multiplies_ttl() {
        assert_eq!(SWEEP_INTERVAL_MULTIPLIER, 5);
        assert_eq!(sweep_interval_for(Duration::from_millis(5)), Duration::from_millis(25));
    }

    #[test]
    fn test_sweep_interval_is_clamped() {
        assert_eq!(sweep_interval_for(Duration::MAX), MAX_SWEEP_INTERVAL);
        assert_eq!(
            sweep_interval_for(Duration::from_secs(365 * 24 * 60 * 60)),
            MAX_SWEEP_INTERVAL
        );
    }
}
