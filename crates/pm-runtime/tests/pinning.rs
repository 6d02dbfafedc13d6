mod common;

use common::*;
use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use pm_runtime::{
    InitialState, PinMode, PmConfig, PmError, PmState, RegistryBuilder,
};

fn strong_builder() -> TestBuilder {
    RegistryBuilder::new(PmConfig::new().with_pin_mode(PinMode::Strong))
}

#[futures_test::test]
async fn pinned_release_is_refused_until_enabled() {
    let (reg, a, _log) = single();
    reg.claim(a).await.unwrap();

    reg.disable(a).await;
    assert!(reg.is_pinned(a));
    assert_eq!(reg.release(a).await, Err(PmError::Disabled));
    assert!(reg.is_active(a));
    assert_eq!(reg.usage_count(a), 1);

    reg.enable(a);
    assert!(!reg.is_pinned(a));
    assert_eq!(reg.release(a).await, Ok(()));
    assert!(reg.is_suspended(a));
}

#[futures_test::test]
async fn pinned_claim_is_refused() {
    let log = new_log();
    let mut b = builder();
    let a = add(&mut b, &log, "a", InitialState::Active, &[]);
    let reg = b.build();

    reg.disable(a).await;
    assert_eq!(reg.claim(a).await, Err(PmError::Disabled));
    assert_eq!(reg.usage_count(a), 0);
}

#[futures_test::test]
async fn pins_nest_and_enable_saturates() {
    let (reg, a, _log) = single();

    reg.disable(a).await;
    reg.disable(a).await;
    assert_eq!(reg.disable_count(a), 2);

    reg.enable(a);
    assert!(reg.is_pinned(a));
    reg.enable(a);
    assert!(!reg.is_pinned(a));
    reg.enable(a);
    assert_eq!(reg.disable_count(a), 0);
}

#[futures_test::test]
async fn weak_pin_leaves_suspended_resource_alone() {
    let (reg, a, log) = single();

    reg.disable(a).await;

    assert!(reg.is_suspended(a));
    assert!(calls(&log).is_empty());
}

#[futures_test::test]
async fn strong_pin_resumes_parents_then_resource() {
    let log = new_log();
    let mut b = strong_builder();
    let bus = add(&mut b, &log, "bus", InitialState::Suspended, &[]);
    let dev = add(&mut b, &log, "dev", InitialState::Suspended, &[bus]);
    let reg = b.build();

    reg.disable(dev).await;

    assert!(reg.is_active(dev));
    assert!(reg.is_active(bus));
    assert_eq!(reg.usage_count(dev), 0);
    assert_eq!(reg.usage_count(bus), 1);
    assert!(
        position(&log, Call::Resume("bus")).unwrap()
            < position(&log, Call::Resume("dev")).unwrap()
    );

    // Dropping the only pin lets the idle resource go down again.
    reg.enable(dev);
    assert!(reg.is_release_pending(dev));
    assert_eq!(reg.run_pending().await, 2);
    assert!(reg.is_suspended(dev));
    assert!(reg.is_suspended(bus));
}

#[futures_test::test]
async fn strong_pin_survives_failed_resume() {
    let log = new_log();
    let mut b = strong_builder();
    let a = b
        .add(
            MockOps::new("a", &log).failing_resume(),
            InitialState::Suspended,
            &[],
        )
        .unwrap();
    let reg = b.build();

    reg.disable(a).await;

    assert!(reg.is_pinned(a));
    assert!(reg.is_suspended(a));
    assert_eq!(count(&log, Call::PostResume("a")), 1);
}

#[futures_test::test]
async fn async_release_while_pinned_waits_for_enable() {
    let (reg, a, log) = single();
    reg.claim(a).await.unwrap();
    reg.disable(a).await;

    assert!(!reg.release_async(a));
    assert_eq!(reg.usage_count(a), 0);
    assert_eq!(reg.run_pending().await, 0);
    assert!(reg.is_active(a));

    reg.enable(a);
    assert_eq!(reg.run_pending().await, 1);
    assert!(reg.is_suspended(a));
    assert_eq!(count(&log, Call::Suspend("a")), 1);
}

#[futures_test::test]
async fn enable_with_outstanding_claim_does_not_suspend() {
    let (reg, a, _log) = single();
    reg.claim(a).await.unwrap();
    reg.disable(a).await;

    reg.enable(a);

    assert!(!reg.is_release_pending(a));
    assert_eq!(reg.run_pending().await, 0);
    assert!(reg.is_active(a));
}

/// Pins a slow resource while its last claim is being released. Returns the
/// state seen right before pinning and right after `disable` returned.
async fn pin_while_suspending(mode: PinMode) -> (PmState, PmState, Log) {
    let log = new_log();
    let mut b: TestBuilder =
        RegistryBuilder::new(PmConfig::new().with_pin_mode(mode));
    let a = b
        .add(MockOps::new("a", &log).slow(5), InitialState::Suspended, &[])
        .unwrap();
    let reg = b.build();
    reg.claim(a).await.unwrap();

    let (released, (before, after)) = join(reg.release(a), async {
        yield_now().await;
        let before = reg.state(a);
        reg.disable(a).await;
        (before, reg.state(a))
    })
    .await;

    assert_eq!(released, Ok(()));
    assert!(reg.is_pinned(a));
    (before, after, log)
}

#[futures_test::test]
async fn weak_first_pin_waits_for_suspend_in_flight() {
    let (before, after, log) = pin_while_suspending(PinMode::Weak).await;

    assert_eq!(before, PmState::Suspending);
    assert!(!after.is_transient());
    assert_eq!(after, PmState::Suspended);
    assert_eq!(count(&log, Call::Suspend("a")), 1);
}

#[futures_test::test]
async fn strong_first_pin_waits_then_resumes() {
    let (before, after, log) = pin_while_suspending(PinMode::Strong).await;

    assert_eq!(before, PmState::Suspending);
    assert_eq!(after, PmState::Active);
    assert_eq!(
        calls(&log),
        vec![
            Call::Resume("a"),
            Call::PostResume("a"),
            Call::PreSuspend("a"),
            Call::Suspend("a"),
            Call::Resume("a"),
            Call::PostResume("a"),
        ]
    );
}

#[futures_test::test]
async fn dropped_strong_pin_is_taken_back() {
    let log = new_log();
    let mut b = strong_builder();
    let a = b
        .add(MockOps::new("a", &log).slow(10), InitialState::Suspended, &[])
        .unwrap();
    let reg = b.build();

    let outcome = select(reg.disable(a), yields(2)).await;
    assert!(matches!(outcome, Either::Second(())));

    assert!(!reg.is_pinned(a));
    assert_eq!(reg.state(a), PmState::Suspended);
    assert_eq!(reg.run_pending().await, 0);

    reg.claim(a).await.unwrap();
    assert!(reg.is_active(a));
}
