/// Power management callbacks of a resource.
///
/// The registry decides *when* these run and guarantees that at most one of
/// them is in flight per resource at a time; the implementation only has to
/// program the hardware.
///
/// All resources in one [`Registry`](crate::Registry) share the same
/// implementor. Boards mixing different peripheral types implement this for
/// an enum that dispatches to each driver.
#[allow(async_fn_in_trait)]
pub trait ResourceOps {
    /// Error reported by [`pre_suspend`](Self::pre_suspend) and
    /// [`post_resume`](Self::post_resume).
    type Error: core::fmt::Debug;

    /// Last chance to veto a suspend. Must leave the hardware untouched when
    /// returning an error.
    async fn pre_suspend(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Quiesce and power down. Only called after `pre_suspend` accepted.
    async fn suspend(&self);

    /// Power up and reinitialize. Parents are already active.
    async fn resume(&self);

    /// Validate the resume. On error the resource is considered suspended.
    async fn post_resume(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
