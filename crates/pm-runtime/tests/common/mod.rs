#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use pm_runtime::{
    InitialState, PmConfig, Registry, RegistryBuilder, ResourceId, ResourceOps,
};

// ---------------------------------------------------------------------------
// Mock resource
// ---------------------------------------------------------------------------

/// One callback invocation, tagged with the resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    PreSuspend(&'static str),
    Suspend(&'static str),
    Resume(&'static str),
    PostResume(&'static str),
}

/// Shared, ordered record of every callback across all resources.
pub type Log = Rc<RefCell<Vec<Call>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn calls(log: &Log) -> Vec<Call> {
    log.borrow().clone()
}

pub fn count(log: &Log, call: Call) -> usize {
    log.borrow().iter().filter(|c| **c == call).count()
}

/// Position of the first occurrence of `call` in the log.
pub fn position(log: &Log, call: Call) -> Option<usize> {
    log.borrow().iter().position(|c| *c == call)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub &'static str);

/// A resource whose callbacks record themselves and can be told to fail or
/// to take a few polls to complete.
pub struct MockOps {
    pub name: &'static str,
    log: Log,
    /// `pre_suspend` returns an error while set.
    pub veto_suspend: Cell<bool>,
    /// `post_resume` returns an error while set.
    pub fail_resume: Cell<bool>,
    /// Number of times `suspend` and `resume` yield before completing.
    yields: usize,
}

impl MockOps {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            veto_suspend: Cell::new(false),
            fail_resume: Cell::new(false),
            yields: 0,
        }
    }

    pub fn slow(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    pub fn failing_resume(self) -> Self {
        self.fail_resume.set(true);
        self
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    async fn pause(&self) {
        for _ in 0..self.yields {
            embassy_futures::yield_now().await;
        }
    }
}

impl ResourceOps for MockOps {
    type Error = MockError;

    async fn pre_suspend(&self) -> Result<(), MockError> {
        self.record(Call::PreSuspend(self.name));
        if self.veto_suspend.get() {
            Err(MockError(self.name))
        } else {
            Ok(())
        }
    }

    async fn suspend(&self) {
        self.pause().await;
        self.record(Call::Suspend(self.name));
    }

    async fn resume(&self) {
        self.pause().await;
        self.record(Call::Resume(self.name));
    }

    async fn post_resume(&self) -> Result<(), MockError> {
        self.record(Call::PostResume(self.name));
        if self.fail_resume.get() {
            Err(MockError(self.name))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub const CAPACITY: usize = 16;

pub type TestRegistry = Registry<NoopRawMutex, MockOps, CAPACITY>;
pub type TestBuilder = RegistryBuilder<NoopRawMutex, MockOps, CAPACITY>;

pub fn builder() -> TestBuilder {
    RegistryBuilder::new(PmConfig::new())
}

pub fn add(
    builder: &mut TestBuilder,
    log: &Log,
    name: &'static str,
    initial: InitialState,
    parents: &[ResourceId],
) -> ResourceId {
    builder.add(MockOps::new(name, log), initial, parents).unwrap()
}

/// A single suspended resource named "a".
pub fn single() -> (TestRegistry, ResourceId, Log) {
    let log = new_log();
    let mut b = builder();
    let a = add(&mut b, &log, "a", InitialState::Suspended, &[]);
    (b.build(), a, log)
}

/// `clock <- bus <- dev`, all suspended.
pub fn chain() -> (TestRegistry, [ResourceId; 3], Log) {
    let log = new_log();
    let mut b = builder();
    let clock = add(&mut b, &log, "clock", InitialState::Suspended, &[]);
    let bus = add(&mut b, &log, "bus", InitialState::Suspended, &[clock]);
    let dev = add(&mut b, &log, "dev", InitialState::Suspended, &[bus]);
    (b.build(), [clock, bus, dev], log)
}

/// Completes after being polled `n + 1` times.
pub async fn yields(n: usize) {
    for _ in 0..n {
        embassy_futures::yield_now().await;
    }
}
