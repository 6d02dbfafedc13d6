use core::ops::Deref;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::error::PmError;
use crate::ops::ResourceOps;
use crate::registry::Registry;
use crate::resource::{PmState, ResourceId};

/// A resource id bound to its registry.
///
/// Convenient to hand to a driver task that only ever deals with one
/// resource.
pub struct ResourceRef<'r, M: RawMutex, O, const N: usize> {
    registry: &'r Registry<M, O, N>,
    id: ResourceId,
}

impl<M: RawMutex, O, const N: usize> Clone for ResourceRef<'_, M, O, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, O, const N: usize> Copy for ResourceRef<'_, M, O, N> {}

impl<'r, M: RawMutex, O: ResourceOps, const N: usize> ResourceRef<'r, M, O, N> {
    pub(crate) fn new(registry: &'r Registry<M, O, N>, id: ResourceId) -> Self {
        Self { registry, id }
    }

    /// The resource this handle is bound to.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The registry the resource lives in.
    pub fn registry(&self) -> &'r Registry<M, O, N> {
        self.registry
    }

    /// See [`Registry::ops`].
    pub fn ops(&self) -> &'r O {
        self.registry.ops(self.id)
    }

    /// See [`Registry::claim`].
    pub async fn claim(&self) -> Result<(), PmError<O::Error>> {
        self.registry.claim(self.id).await
    }

    /// Claims the resource and returns a guard that releases it on drop.
    pub async fn claim_guard(
        &self,
    ) -> Result<ClaimGuard<'r, M, O, N>, PmError<O::Error>> {
        self.registry.claim(self.id).await?;
        Ok(ClaimGuard { resource: *self })
    }

    /// See [`Registry::release`].
    pub async fn release(&self) -> Result<(), PmError<O::Error>> {
        self.registry.release(self.id).await
    }

    /// See [`Registry::release_async`].
    pub fn release_async(&self) -> bool {
        self.registry.release_async(self.id)
    }

    /// See [`Registry::disable`].
    pub async fn disable(&self) {
        self.registry.disable(self.id).await
    }

    /// See [`Registry::enable`].
    pub fn enable(&self) {
        self.registry.enable(self.id)
    }

    /// See [`Registry::state`].
    pub fn state(&self) -> PmState {
        self.registry.state(self.id)
    }

    /// See [`Registry::is_active`].
    pub fn is_active(&self) -> bool {
        self.registry.is_active(self.id)
    }

    /// See [`Registry::is_suspended`].
    pub fn is_suspended(&self) -> bool {
        self.registry.is_suspended(self.id)
    }

    /// See [`Registry::usage_count`].
    pub fn usage_count(&self) -> usize {
        self.registry.usage_count(self.id)
    }
}

/// RAII claim on a resource.
///
/// Dropping the guard releases the claim through the deferred queue, so the
/// drop never blocks; the suspend itself happens in the worker.
pub struct ClaimGuard<'r, M: RawMutex, O: ResourceOps, const N: usize> {
    resource: ResourceRef<'r, M, O, N>,
}

impl<'r, M: RawMutex, O: ResourceOps, const N: usize> Deref
    for ClaimGuard<'r, M, O, N>
{
    type Target = O;

    #[inline]
    fn deref(&self) -> &O {
        self.resource.ops()
    }
}

impl<'r, M: RawMutex, O: ResourceOps, const N: usize> ClaimGuard<'r, M, O, N> {
    /// The claimed resource.
    pub fn id(&self) -> ResourceId {
        self.resource.id()
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Drop
    for ClaimGuard<'_, M, O, N>
{
    fn drop(&mut self) {
        self.resource.release_async();
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Registry<M, O, N> {
    /// Claims `id` and returns a guard that releases it on drop.
    pub async fn claim_guard(
        &self,
        id: ResourceId,
    ) -> Result<ClaimGuard<'_, M, O, N>, PmError<O::Error>> {
        self.handle(id).claim_guard().await
    }
}
