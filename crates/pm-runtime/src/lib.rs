#![no_std]
//! Runtime power management for a hierarchy of resources.
//!
//! Peripherals, power domains and clocks are registered once at boot in a
//! [`Registry`], each with the parents it depends on (a device depends on
//! its bus, the bus on its clock). Drivers [`claim`](Registry::claim) a
//! resource before using it and [`release`](Registry::release) it after.
//! The first claim resumes the resource, resuming its parents first; the
//! last release suspends it and then releases the parents.
//!
//! Claims and releases may race from any task or interrupt priority. Per
//! resource, a lock plus a wait queue make sure only one task ever runs a
//! suspend or resume sequence; everyone else parks until the transition
//! settles and then decides again.
//!
//! [`Registry::release_async`] drops the claim without waiting for the
//! suspend, which runs later in [`Registry::run_worker`]. Pins
//! ([`Registry::disable`] / [`Registry::enable`]) keep a resource up
//! regardless of claims.

// Must come first so the logging macros are visible to the other modules.
mod fmt;

mod builder;
mod config;
mod error;
mod handle;
mod ops;
mod pin;
mod propagate;
mod registry;
mod resource;
mod usage;
mod worker;

pub use builder::RegistryBuilder;
pub use config::{PinMode, PmConfig, MAX_DEPTH, MAX_PARENTS, MAX_WAITERS};
pub use error::{BuildError, ParentCause, PmError};
pub use handle::{ClaimGuard, ResourceRef};
pub use ops::ResourceOps;
pub use registry::Registry;
pub use resource::{InitialState, PmState, ResourceId};
