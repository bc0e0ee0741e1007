//! Common traits for memocache.

// ═══════════════════════════════════════════════════════════════════════════════
// RETENTION POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides whether a successfully produced value is kept in the cache.
///
/// A rejected value is still handed to every caller waiting on it; it is just not
/// memoized, so the next lookup for the key invokes the producer again.
///
/// Any `Fn(&T) -> bool` closure is a policy:
///
/// ```rust
/// use memocache_core::RetentionPolicy;
///
/// let non_empty = |value: &String| !value.is_empty();
/// assert!(!non_empty.should_retain(&String::new()));
/// ```
pub trait RetentionPolicy<T>: Send + Sync {
    /// Returns true if `value` should be cached.
    fn should_retain(&self, value: &T) -> bool;
}

impl<T, F> RetentionPolicy<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn should_retain(&self, value: &T) -> bool {
        self(value)
    }
}

/// The default policy: every value is cached.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysRetain;

impl<T> RetentionPolicy<T> for AlwaysRetain {
    fn should_retain(&self, _value: &T) -> bool {
        true
    }
}
