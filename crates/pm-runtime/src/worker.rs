//! Deferred suspends.
//!
//! Releasing the last claim from a latency sensitive context should not wait
//! for `pre_suspend`/`suspend`. [`Registry::release_async`] only drops the
//! claim and queues the resource; the suspend runs later in whatever task
//! drives [`Registry::run_worker`].
//!
//! A resource is queued at most once at a time, so the queue (sized to the
//! registry capacity) never fills up.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::ops::ResourceOps;
use crate::registry::Registry;
use crate::resource::ResourceId;

impl<M: RawMutex, O: ResourceOps, const N: usize> Registry<M, O, N> {
    /// Drops a claim on `id` without waiting for a suspend.
    ///
    /// Returns whether a suspend attempt was queued: `false` if claims
    /// remain, one is already queued, the resource is pinned, or there was
    /// no claim to drop. Never blocks.
    pub fn release_async(&self, id: ResourceId) -> bool {
        let resource = self.resource(id);
        let schedule = resource.with_shared(|shared| {
            match resource.usage.decrement() {
                Some(0) => shared.disable_count == 0 && shared.mark_pending(),
                Some(_) => false,
                None => {
                    warn!("{} released without a claim", id);
                    false
                }
            }
        });
        schedule && self.submit(id)
    }

    /// Queues a suspend attempt for `id`, whose pending flag is already set.
    pub(crate) fn submit(&self, id: ResourceId) -> bool {
        if self.queue.try_send(id).is_ok() {
            trace!("{} queued for suspend", id);
            return true;
        }
        self.resource(id)
            .with_shared(|shared| shared.pending_release = false);
        error!("release queue full, dropping {}", id);
        false
    }

    /// Runs queued suspend attempts forever, one at a time.
    ///
    /// Spawn this in a dedicated task, typically on the lowest priority
    /// executor.
    pub async fn run_worker(&self) -> ! {
        loop {
            let id = self.queue.receive().await;
            self.run_release(id).await;
        }
    }

    /// Runs every queued suspend attempt, including the parent releases
    /// they queue in turn, and returns how many ran.
    pub async fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(id) = self.queue.try_receive() {
            self.run_release(id).await;
            count += 1;
        }
        count
    }

    async fn run_release(&self, id: ResourceId) {
        // Cleared before deciding, so a release that lands while this
        // attempt is in flight queues a new one.
        self.resource(id)
            .with_shared(|shared| shared.pending_release = false);
        match self.suspend_idle(id).await {
            Ok(true) => {}
            Ok(false) => trace!("{} still in use, not suspending", id),
            Err(_) => warn!("deferred suspend of {} aborted", id),
        }
    }
}
