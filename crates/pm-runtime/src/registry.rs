use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::config::PmConfig;
use crate::error::PmError;
use crate::handle::ResourceRef;
use crate::ops::ResourceOps;
use crate::resource::{PmState, Resource, ResourceId};

/// Outcome of taking the lock on the claim path.
pub(crate) enum ClaimEntry {
    /// The resource is pinned; nothing changed.
    Pinned,
    /// The resource was active and the claim is counted.
    Claimed,
    /// The resource was suspended. The claim is counted and the caller now
    /// owns the `Resuming` transition.
    MustResume,
}

/// Arena of resources together with the deferred release queue.
///
/// `M` is the lock used for every resource and for the queue; pick
/// `CriticalSectionRawMutex` when the registry is shared between executors
/// or touched from interrupt handlers. `N` is the capacity.
///
/// Every method taking a [`ResourceId`] panics if the id was not handed out
/// by the builder of this registry.
pub struct Registry<M: RawMutex, O, const N: usize> {
    config: PmConfig,
    pub(crate) resources: Vec<Resource<M, O>, N>,
    pub(crate) queue: Channel<M, ResourceId, N>,
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Registry<M, O, N> {
    pub(crate) fn new(
        config: PmConfig,
        resources: Vec<Resource<M, O>, N>,
    ) -> Self {
        Self { config, resources, queue: Channel::new() }
    }

    #[inline]
    pub(crate) fn resource(&self, id: ResourceId) -> &Resource<M, O> {
        &self.resources[id.index()]
    }

    /// The configuration the registry was built with.
    pub fn config(&self) -> PmConfig {
        self.config
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry holds no resource.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Ids of every resource, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        (0..self.resources.len()).map(ResourceId::new)
    }

    /// A handle bound to one resource.
    pub fn handle(&self, id: ResourceId) -> ResourceRef<'_, M, O, N> {
        ResourceRef::new(self, id)
    }

    /// The callbacks (and driver state) owned by `id`.
    pub fn ops(&self, id: ResourceId) -> &O {
        &self.resource(id).ops
    }

    /// Direct parents of `id`, in the order they are resumed.
    pub fn parents(&self, id: ResourceId) -> &[ResourceId] {
        &self.resource(id).parents
    }

    /// Snapshot of the lifecycle state of `id`.
    pub fn state(&self, id: ResourceId) -> PmState {
        self.resource(id).state()
    }

    /// Whether `id` is `Active` right now.
    pub fn is_active(&self, id: ResourceId) -> bool {
        self.state(id) == PmState::Active
    }

    /// Whether `id` is `Suspended` right now.
    pub fn is_suspended(&self, id: ResourceId) -> bool {
        self.state(id) == PmState::Suspended
    }

    /// Number of outstanding claims on `id`. Read without the lock.
    pub fn usage_count(&self, id: ResourceId) -> usize {
        self.resource(id).usage.get()
    }

    /// Whether a deferred suspend attempt is queued and has not started yet.
    pub fn is_release_pending(&self, id: ResourceId) -> bool {
        self.resource(id).with_shared(|shared| shared.pending_release)
    }

    /// Flags `id` as in the middle of an operation that a system-wide sleep
    /// must not interrupt. Independent of claims.
    pub fn set_busy(&self, id: ResourceId) {
        self.resource(id).with_shared(|shared| shared.busy = true);
    }

    /// Removes the busy flag set by [`set_busy`](Self::set_busy).
    pub fn clear_busy(&self, id: ResourceId) {
        self.resource(id).with_shared(|shared| shared.busy = false);
    }

    /// Whether `id` is flagged busy.
    pub fn is_busy(&self, id: ResourceId) -> bool {
        self.resource(id).with_shared(|shared| shared.busy)
    }

    /// Whether any resource is flagged busy.
    pub fn any_busy(&self) -> bool {
        self.resources
            .iter()
            .any(|resource| resource.with_shared(|shared| shared.busy))
    }

    /// Claims `id`, resuming it and its parents if it is suspended.
    ///
    /// Returns immediately if the resource is already active. If another
    /// task is in the middle of a transition, waits for it to finish and
    /// decides again.
    pub async fn claim(
        &self,
        id: ResourceId,
    ) -> Result<(), PmError<O::Error>> {
        match self.begin_claim(id).await {
            ClaimEntry::Pinned => Err(PmError::Disabled),
            ClaimEntry::Claimed => Ok(()),
            ClaimEntry::MustResume => self.resume_chain(id, true).await,
        }
    }

    /// Takes a claim on `id`, or the right to resume it.
    pub(crate) async fn begin_claim(&self, id: ResourceId) -> ClaimEntry {
        let resource = self.resource(id);
        resource
            .park_until(|shared| {
                if shared.disable_count > 0 {
                    return Some(ClaimEntry::Pinned);
                }
                match shared.state {
                    PmState::Active => {
                        resource.usage.increment();
                        Some(ClaimEntry::Claimed)
                    }
                    PmState::Suspended => {
                        shared.state = PmState::Resuming;
                        resource.usage.increment();
                        Some(ClaimEntry::MustResume)
                    }
                    PmState::Resuming | PmState::Suspending => None,
                }
            })
            .await
    }

    /// Drops a claim on `id` and, if it was the last one, suspends the
    /// resource before returning.
    ///
    /// Parents are released through the deferred queue once the suspend
    /// completed. A pinned resource refuses the release and keeps its count.
    pub async fn release(
        &self,
        id: ResourceId,
    ) -> Result<(), PmError<O::Error>> {
        let resource = self.resource(id);
        let remaining = resource.with_shared(
            |shared| -> Result<_, PmError<O::Error>> {
                if shared.disable_count > 0 {
                    return Err(PmError::Disabled);
                }
                resource.usage.decrement().ok_or(PmError::NotClaimed)
            },
        )?;
        if remaining > 0 {
            return Ok(());
        }
        self.suspend_idle(id).await.map(|_| ())
    }

    /// Suspends `id` if nobody claims or pins it anymore.
    ///
    /// Returns whether this call performed the suspend. Losing the race to a
    /// new claim, a pin or another suspender is not an error.
    pub(crate) async fn suspend_idle(
        &self,
        id: ResourceId,
    ) -> Result<bool, PmError<O::Error>> {
        let resource = self.resource(id);
        let mut guard = SuspendGuard { registry: self, id, owned: false };
        let start = resource
            .park_until(|shared| match shared.state {
                PmState::Resuming | PmState::Suspending => None,
                PmState::Active
                    if shared.disable_count == 0
                        && resource.usage.get() == 0 =>
                {
                    shared.state = PmState::Suspending;
                    Some(true)
                }
                _ => Some(false),
            })
            .await;
        if !start {
            guard.defuse();
            return Ok(false);
        }
        guard.owned = true;

        if let Err(err) = resource.ops.pre_suspend().await {
            guard.defuse();
            resource.settle(PmState::Active);
            warn!("{} vetoed suspend", id);
            return Err(PmError::SuspendAborted(err));
        }
        resource.ops.suspend().await;
        guard.defuse();
        resource.settle(PmState::Suspended);
        debug!("{} suspended", id);

        for &parent in &resource.parents {
            self.release_async(parent);
        }
        Ok(true)
    }
}

/// Covers a suspend attempt until it has finished.
///
/// Dropped early, it puts a resource whose `Suspending` transition it owns
/// back to `Active`; the parents were never released, so that is consistent.
/// Either way the claim that made the resource idle is already gone, so a
/// fresh attempt is queued if the resource is left active, idle and unpinned.
struct SuspendGuard<'r, M: RawMutex, O: ResourceOps, const N: usize> {
    registry: &'r Registry<M, O, N>,
    id: ResourceId,
    owned: bool,
}

impl<M: RawMutex, O: ResourceOps, const N: usize> SuspendGuard<'_, M, O, N> {
    fn defuse(self) {
        core::mem::forget(self);
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Drop
    for SuspendGuard<'_, M, O, N>
{
    fn drop(&mut self) {
        let owned = self.owned;
        let resource = self.registry.resource(self.id);
        let schedule = resource.with_shared(|shared| {
            if owned {
                shared.settle(PmState::Active);
            }
            shared.state == PmState::Active
                && shared.disable_count == 0
                && resource.usage.get() == 0
                && shared.mark_pending()
        });
        if owned {
            warn!("suspend of {} abandoned", self.id);
        }
        if schedule {
            self.registry.submit(self.id);
        }
    }
}
