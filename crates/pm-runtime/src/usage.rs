use portable_atomic::{AtomicUsize, Ordering};

/// Saturating count of outstanding claims on a resource.
///
/// Only mutated while the owning resource's lock is held, but readable at any
/// time without taking the lock.
pub(crate) struct UsageCounter(AtomicUsize);

impl UsageCounter {
    pub(crate) const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Adds a claim and returns the new count.
    pub(crate) fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops a claim and returns the new count, or `None` if there was no
    /// claim to drop.
    pub(crate) fn decrement(&self) -> Option<usize> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                n.checked_sub(1)
            })
            .ok()
            .map(|prev| prev - 1)
    }
}
