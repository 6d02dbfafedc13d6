use core::fmt;

use crate::resource::ResourceId;

/// Errors returned by claim and release operations.
///
/// `E` is the error type of the resource callbacks, see
/// [`ResourceOps::Error`](crate::ResourceOps::Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmError<E> {
    /// The resource is pinned; retry once it has been enabled again.
    Disabled,
    /// Release without a matching claim.
    NotClaimed,
    /// `post_resume` rejected the resume. The resource is suspended again.
    ResumeFailed(E),
    /// `pre_suspend` vetoed the suspend. The resource is still active.
    SuspendAborted(E),
    /// Claiming `parent` failed while resuming the requested resource, which
    /// stays suspended. `cause` is the parent's own failure, unchanged.
    ParentFailed { parent: ResourceId, cause: ParentCause<E> },
}

/// Why a parent could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParentCause<E> {
    /// The parent is pinned.
    Disabled,
    /// The parent's `post_resume` failed.
    ResumeFailed(E),
}

impl<E: fmt::Display> fmt::Display for PmError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmError::Disabled => write!(f, "resource is pinned"),
            PmError::NotClaimed => write!(f, "release without a claim"),
            PmError::ResumeFailed(err) => write!(f, "resume failed: {}", err),
            PmError::SuspendAborted(err) => {
                write!(f, "suspend aborted: {}", err)
            }
            PmError::ParentFailed { parent, cause } => {
                write!(f, "parent {} failed: {}", parent, cause)
            }
        }
    }
}

impl<E: fmt::Display> fmt::Display for ParentCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentCause::Disabled => write!(f, "pinned"),
            ParentCause::ResumeFailed(err) => {
                write!(f, "resume failed: {}", err)
            }
        }
    }
}

/// Errors detected while assembling a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BuildError {
    /// The registry already holds as many resources as its capacity.
    CapacityExhausted,
    /// A parent that has not been added yet. Parents must be added before
    /// the resources that depend on them.
    UnknownParent(ResourceId),
    /// The same parent was listed twice.
    DuplicateParent(ResourceId),
    /// More than [`MAX_PARENTS`](crate::MAX_PARENTS) parents.
    TooManyParents,
    /// The parent chain would exceed [`MAX_DEPTH`](crate::MAX_DEPTH).
    TooDeep,
    /// An initially active resource listed a suspended parent.
    ParentSuspended(ResourceId),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::CapacityExhausted => {
                write!(f, "registry capacity exhausted")
            }
            BuildError::UnknownParent(id) => write!(f, "unknown parent {}", id),
            BuildError::DuplicateParent(id) => {
                write!(f, "parent {} listed twice", id)
            }
            BuildError::TooManyParents => write!(f, "too many parents"),
            BuildError::TooDeep => write!(f, "parent chain too deep"),
            BuildError::ParentSuspended(id) => {
                write!(f, "active resource has suspended parent {}", id)
            }
        }
    }
}
