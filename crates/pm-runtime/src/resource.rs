use core::cell::RefCell;
use core::fmt;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use heapless::Vec;

use crate::config::{MAX_PARENTS, MAX_WAITERS};
use crate::usage::UsageCounter;

/// Stable index of a resource inside its [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceId(u16);

impl ResourceId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u16)
    }

    /// Position of the resource in registration order.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res{}", self.0)
    }
}

/// Lifecycle state of a resource.
///
/// `Resuming` and `Suspending` are transitions. They are never a resting
/// state: every operation that observes one parks until it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmState {
    Active,
    Resuming,
    Suspended,
    Suspending,
}

impl PmState {
    /// Whether the state is a transition in flight.
    #[inline]
    pub const fn is_transient(self) -> bool {
        matches!(self, PmState::Resuming | PmState::Suspending)
    }
}

/// State a resource starts in when it is added to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitialState {
    Active,
    Suspended,
}

impl From<InitialState> for PmState {
    fn from(initial: InitialState) -> Self {
        match initial {
            InitialState::Active => PmState::Active,
            InitialState::Suspended => PmState::Suspended,
        }
    }
}

/// Everything guarded by the per-resource lock.
pub(crate) struct Shared {
    pub(crate) state: PmState,
    pub(crate) disable_count: usize,
    pub(crate) pending_release: bool,
    pub(crate) busy: bool,
    waiters: MultiWakerRegistration<MAX_WAITERS>,
}

impl Shared {
    /// Marks a deferred release as outstanding. Returns `false` if one
    /// already was.
    pub(crate) fn mark_pending(&mut self) -> bool {
        !core::mem::replace(&mut self.pending_release, true)
    }

    /// Sets `state` and wakes every parked task.
    pub(crate) fn settle(&mut self, state: PmState) {
        self.state = state;
        self.waiters.wake();
    }
}

/// One entry of the registry arena.
pub(crate) struct Resource<M: RawMutex, O> {
    pub(crate) ops: O,
    pub(crate) parents: Vec<ResourceId, MAX_PARENTS>,
    pub(crate) depth: usize,
    pub(crate) usage: UsageCounter,
    shared: Mutex<M, RefCell<Shared>>,
}

impl<M: RawMutex, O> Resource<M, O> {
    pub(crate) fn new(
        ops: O,
        initial: InitialState,
        parents: Vec<ResourceId, MAX_PARENTS>,
        depth: usize,
    ) -> Self {
        Self {
            ops,
            parents,
            depth,
            usage: UsageCounter::new(),
            shared: Mutex::new(RefCell::new(Shared {
                state: initial.into(),
                disable_count: 0,
                pending_release: false,
                busy: false,
                waiters: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Runs `f` with the lock held.
    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub(crate) fn state(&self) -> PmState {
        self.with_shared(|shared| shared.state)
    }

    /// Parks on the wait queue until `f` returns `Some`.
    ///
    /// `f` runs with the lock held on every poll, so it always sees fresh
    /// state and whatever it changes is published atomically with the
    /// decision to stop waiting.
    pub(crate) async fn park_until<R>(
        &self,
        mut f: impl FnMut(&mut Shared) -> Option<R>,
    ) -> R {
        poll_fn(|cx| {
            self.shared.lock(|cell| {
                let mut shared = cell.borrow_mut();
                match f(&mut shared) {
                    Some(ready) => Poll::Ready(ready),
                    None => {
                        shared.waiters.register(cx.waker());
                        Poll::Pending
                    }
                }
            })
        })
        .await
    }

    /// Ends a transition in `state` and wakes every parked task.
    pub(crate) fn settle(&self, state: PmState) {
        self.with_shared(|shared| shared.settle(state));
    }
}
