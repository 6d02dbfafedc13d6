//! Resuming a resource together with its parent chain.
//!
//! Every resource in the chain needs all of its parents active before its
//! own `resume` runs, so the walk is a depth-first traversal that claims
//! parents in registration order and resumes a resource once its last parent
//! is claimed. The traversal keeps its own bounded stack instead of
//! recursing, so the future has a fixed size.
//!
//! Each frame owns the `Resuming` transition of its resource and remembers
//! how many of its parents it has claimed. On failure the frames are unwound
//! top to bottom: every resource goes back to `Suspended` and releases
//! exactly the parents it had claimed, in reverse order. The stack lives in
//! a `ResumeChain` that performs the same unwind when the owning future is
//! dropped halfway, so no resource is left `Resuming`.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use crate::config::MAX_DEPTH;
use crate::error::{ParentCause, PmError};
use crate::ops::ResourceOps;
use crate::registry::{ClaimEntry, Registry};
use crate::resource::{PmState, ResourceId};

#[derive(Clone, Copy)]
struct Frame {
    id: ResourceId,
    /// Parents `[..claimed]` hold a claim taken by this frame.
    claimed: usize,
    /// Whether this frame took a usage claim on `id` that must be undone if
    /// the resume fails. Pins resume without one.
    counted: bool,
}

type Stack = Vec<Frame, MAX_DEPTH>;

/// The frames of a resume in progress.
///
/// Frames still on the stack when this is dropped are rolled back. A resume
/// that completes or fails pops every frame itself, leaving nothing to undo.
struct ResumeChain<'r, M: RawMutex, O: ResourceOps, const N: usize> {
    registry: &'r Registry<M, O, N>,
    stack: Stack,
}

impl<M: RawMutex, O: ResourceOps, const N: usize> ResumeChain<'_, M, O, N> {
    fn push(&mut self, frame: Frame) {
        // The builder bounds every chain to MAX_DEPTH resources.
        if self.stack.push(frame).is_err() {
            unreachable!()
        }
    }

    /// Counts the parent just claimed by the frame on top.
    fn advance(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.claimed += 1;
        }
    }

    /// Rolls back every frame and turns the failure of `origin` into the
    /// error reported to the caller of the root.
    fn unwind(
        &mut self,
        origin: ResourceId,
        cause: ParentCause<O::Error>,
    ) -> PmError<O::Error> {
        let root = self.stack.first().map(|frame| frame.id);
        self.rollback();
        match cause {
            ParentCause::ResumeFailed(err) if root == Some(origin) => {
                PmError::ResumeFailed(err)
            }
            cause => PmError::ParentFailed { parent: origin, cause },
        }
    }

    fn rollback(&mut self) {
        while let Some(frame) = self.stack.pop() {
            self.registry.abort_resume(frame);
        }
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Drop
    for ResumeChain<'_, M, O, N>
{
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            warn!("resume abandoned, rolling back {} frames", self.stack.len());
            self.rollback();
        }
    }
}

impl<M: RawMutex, O: ResourceOps, const N: usize> Registry<M, O, N> {
    /// Resumes `root`, which the caller has already moved to `Resuming`.
    ///
    /// Must be called without an await point after that transition, so the
    /// returned future owns it from the start.
    pub(crate) async fn resume_chain(
        &self,
        root: ResourceId,
        counted: bool,
    ) -> Result<(), PmError<O::Error>> {
        let mut chain = ResumeChain { registry: self, stack: Stack::new() };
        chain.push(Frame { id: root, claimed: 0, counted });

        while let Some(&top) = chain.stack.last() {
            let next = self.resource(top.id).parents.get(top.claimed).copied();
            match next {
                Some(parent) => match self.begin_claim(parent).await {
                    ClaimEntry::Claimed => chain.advance(),
                    ClaimEntry::MustResume => chain.push(Frame {
                        id: parent,
                        claimed: 0,
                        counted: true,
                    }),
                    ClaimEntry::Pinned => {
                        return Err(chain.unwind(parent, ParentCause::Disabled));
                    }
                },
                None => {
                    let resource = self.resource(top.id);
                    resource.ops.resume().await;
                    match resource.ops.post_resume().await {
                        Ok(()) => {
                            resource.settle(PmState::Active);
                            debug!("{} resumed", top.id);
                            chain.stack.pop();
                            chain.advance();
                        }
                        Err(err) => {
                            warn!("{} failed to resume", top.id);
                            return Err(chain.unwind(
                                top.id,
                                ParentCause::ResumeFailed(err),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn abort_resume(&self, frame: Frame) {
        let resource = self.resource(frame.id);
        if frame.counted {
            resource.with_shared(|_| resource.usage.decrement());
        }
        resource.settle(PmState::Suspended);
        for &parent in resource.parents[..frame.claimed].iter().rev() {
            self.release_async(parent);
        }
    }
}
