//! # Run Release
//!
//! Releasing takes nothing but an absolute frame number. Ownership is
//! rediscovered through the [`PoolRegistry`], the run is validated and
//! reclaimed, and a pool whose frames are all free again is retired from the
//! live list.
//!
//! ```text
//! release(base + 5)
//!
//! relative:  3   4   5   6   7   8
//! before:    H   U   H   U   U   H
//! after:     H   U   F   F   F   H      stops at the next run head
//! ```

use crate::error::FramePoolError;
use crate::pool::FramePool;
use crate::registry::PoolRegistry;
use crate::state::FrameState;
use log::{debug, info, warn};

impl FramePool {
    /// Free the run headed by the relative frame `head`.
    ///
    /// Returns the number of frames reclaimed.
    fn reclaim_run(&mut self, head: u64) -> Result<u64, FramePoolError> {
        let frame = self.base_frame_no() + head;
        match self.bitmap().get_state(head) {
            FrameState::HeadOfSequence => {}
            FrameState::InvalidEncoding => return Err(FramePoolError::InvalidEncoding { frame }),
            state @ (FrameState::Free | FrameState::Used) => {
                return Err(FramePoolError::InvalidRelease { frame, state });
            }
        }

        let frame_count = self.frame_count();
        let bitmap = self.bitmap_mut();
        bitmap.set_state(head, FrameState::Free);

        let mut relative = head + 1;
        while relative < frame_count && bitmap.get_state(relative) == FrameState::Used {
            bitmap.set_state(relative, FrameState::Free);
            relative += 1;
        }

        let reclaimed = relative - head;
        self.credit_freed(reclaimed);
        debug!("Released frames {:#x}..{:#x}", frame, frame + reclaimed);
        Ok(reclaimed)
    }
}

impl PoolRegistry {
    /// Release the run starting at the absolute `frame_no`.
    ///
    /// The owning pool is looked up among the live pools. If the release
    /// leaves the pool without any allocated frame, the pool is retired from
    /// the live list (but not destroyed).
    ///
    /// Returns the number of frames reclaimed.
    ///
    /// # Errors
    /// - [`FramePoolError::UnknownFrame`] if no live pool owns `frame_no`.
    /// - [`FramePoolError::InvalidRelease`] if `frame_no` does not head an
    ///   allocated run (mid-run or already free).
    /// - [`FramePoolError::InvalidEncoding`] if the bitmap entry is corrupted.
    pub fn release(&mut self, frame_no: u64) -> Result<u64, FramePoolError> {
        let id = self.resolve(frame_no)?;
        let pool = self.pool_mut(id)?;
        let head = frame_no - pool.base_frame_no();
        let reclaimed = pool.reclaim_run(head)?;

        if pool.is_fully_free() {
            info!(
                "Frame pool {:#x}..{:#x} is now entirely free, removing it from the registry",
                pool.base_frame_no(),
                pool.end_frame_no()
            );
            self.unlink(id.index());
        }
        Ok(reclaimed)
    }

    /// Frames in `[base_frame_no, base_frame_no + n)` that are not `Free`.
    ///
    /// Every registered pool is consulted, retired ones included. Frames owned
    /// by no pool are skipped.
    pub fn deviating_frames(
        &self,
        base_frame_no: u64,
        n: u64,
    ) -> impl Iterator<Item = (u64, FrameState)> + '_ {
        let end = base_frame_no.saturating_add(n);
        (base_frame_no..end).filter_map(move |frame_no| {
            self.iter_all()
                .find_map(|(_, pool)| pool.state_of(frame_no))
                .filter(|state| !state.is_free())
                .map(|state| (frame_no, state))
        })
    }

    /// Diagnostic: check that every frame in `[base_frame_no, base_frame_no + n)`
    /// is `Free`, logging each one that is not.
    ///
    /// Returns the number of deviating frames.
    pub fn check_freed_frames(&self, base_frame_no: u64, n: u64) -> usize {
        self.deviating_frames(base_frame_no, n)
            .inspect(|(frame_no, state)| {
                warn!("Frame {frame_no:#x} not freed properly: {state:?}");
            })
            .count()
    }
}
