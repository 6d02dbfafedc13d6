use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use crate::config::{PmConfig, MAX_DEPTH, MAX_PARENTS};
use crate::error::BuildError;
use crate::ops::ResourceOps;
use crate::registry::Registry;
use crate::resource::{InitialState, PmState, Resource, ResourceId};

/// Assembles the resource graph of a [`Registry`].
///
/// Resources are added parents first: a resource may only name parents that
/// were added before it, which keeps the graph acyclic without any runtime
/// cycle detection.
pub struct RegistryBuilder<M: RawMutex, O, const N: usize> {
    config: PmConfig,
    resources: Vec<Resource<M, O>, N>,
}

impl<M: RawMutex, O: ResourceOps, const N: usize> RegistryBuilder<M, O, N> {
    /// Starts an empty registry with the given configuration.
    pub fn new(config: PmConfig) -> Self {
        Self { config, resources: Vec::new() }
    }

    /// Adds a resource and returns its id.
    ///
    /// A resource added as [`InitialState::Active`] takes one claim on each
    /// parent, exactly as if it had been resumed, so that suspending it later
    /// releases them. Its parents must therefore be active as well.
    pub fn add(
        &mut self,
        ops: O,
        initial: InitialState,
        parents: &[ResourceId],
    ) -> Result<ResourceId, BuildError> {
        if self.resources.is_full() || self.resources.len() > u16::MAX as usize
        {
            return Err(BuildError::CapacityExhausted);
        }

        let mut list: Vec<ResourceId, MAX_PARENTS> = Vec::new();
        let mut depth = 0;
        for &parent in parents {
            let Some(entry) = self.resources.get(parent.index()) else {
                return Err(BuildError::UnknownParent(parent));
            };
            if list.contains(&parent) {
                return Err(BuildError::DuplicateParent(parent));
            }
            if initial == InitialState::Active
                && entry.state() != PmState::Active
            {
                return Err(BuildError::ParentSuspended(parent));
            }
            list.push(parent).map_err(|_| BuildError::TooManyParents)?;
            depth = depth.max(entry.depth + 1);
        }
        if depth >= MAX_DEPTH {
            return Err(BuildError::TooDeep);
        }

        if initial == InitialState::Active {
            for parent in &list {
                self.resources[parent.index()].usage.increment();
            }
        }

        let id = ResourceId::new(self.resources.len());
        self.resources
            .push(Resource::new(ops, initial, list, depth))
            .map_err(|_| BuildError::CapacityExhausted)?;
        trace!("added {} at depth {}", id, depth);
        Ok(id)
    }

    /// Number of resources added so far.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource has been added yet.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Freezes the graph into a [`Registry`].
    pub fn build(self) -> Registry<M, O, N> {
        Registry::new(self.config, self.resources)
    }
}
