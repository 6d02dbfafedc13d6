use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::PinMode;
use crate::ops::ResourceOps;
use crate::registry::Registry;
use crate::resource::{PmState, ResourceId};

impl<M: RawMutex, O: ResourceOps, const N: usize> Registry<M, O, N> {
    /// Pins `id`: no suspend may begin until every pin is removed with
    /// [`enable`](Self::enable). Pins nest.
    ///
    /// The first pin waits for a transition in flight to finish. What
    /// happens to a resource that is already suspended depends on
    /// [`PinMode`]; with [`PinMode::Strong`] it is resumed here, and a failed
    /// resume is logged and leaves it suspended.
    ///
    /// While pinned, [`claim`](Self::claim) and [`release`](Self::release)
    /// return [`PmError::Disabled`](crate::PmError::Disabled).
    ///
    /// Dropping the future before it completes takes the pin back.
    pub async fn disable(&self, id: ResourceId) {
        let resource = self.resource(id);
        let first = resource.with_shared(|shared| {
            shared.disable_count += 1;
            shared.disable_count == 1
        });
        if !first {
            return;
        }

        let guard = PinGuard { registry: self, id };
        let strong = self.config().pin_mode == PinMode::Strong;
        let resume = resource
            .park_until(|shared| match shared.state {
                PmState::Resuming | PmState::Suspending => None,
                PmState::Suspended if strong => {
                    shared.state = PmState::Resuming;
                    Some(true)
                }
                _ => Some(false),
            })
            .await;
        debug!("{} pinned", id);

        if resume && self.resume_chain(id, false).await.is_err() {
            warn!("pinned {} could not be resumed", id);
        }
        guard.defuse();
    }

    /// Removes one pin. Does nothing if `id` is not pinned.
    ///
    /// Removing the last pin of an active resource nobody claims queues a
    /// suspend attempt, so a pin never keeps a resource up on its own.
    pub fn enable(&self, id: ResourceId) {
        let resource = self.resource(id);
        let schedule = resource.with_shared(|shared| {
            if shared.disable_count == 0 {
                return false;
            }
            shared.disable_count -= 1;
            shared.disable_count == 0
                && shared.state == PmState::Active
                && resource.usage.get() == 0
                && shared.mark_pending()
        });
        if schedule {
            debug!("{} unpinned while idle", id);
            self.submit(id);
        }
    }

    /// Number of pins currently held on `id`.
    pub fn disable_count(&self, id: ResourceId) -> usize {
        self.resource(id).with_shared(|shared| shared.disable_count)
    }

    /// Whether `id` has at least one pin.
    pub fn is_pinned(&self, id: ResourceId) -> bool {
        self.disable_count(id) > 0
    }
}

/// The first pin of a [`Registry::disable`] call that has not returned yet.
struct PinGuard<'r, M: RawMutex, O: ResourceOps, const N: usize> {
    registry: &'r Registry<M, O, N>,
    id: ResourceId,
}

impl<M: RawMutex, O: ResourceOps, const N: usize> PinGuard<'_, M, O, N> {
    fn defuse(self) {
        core::mem::forget(self);
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Drop
    for PinGuard<'_, M, O, N>
{
    fn drop(&mut self) {
        debug!("pin on {} abandoned", self.id);
        self.registry.enable(self.id);
    }
}
