//! # Contiguous Frame Pool
//!
//! A [`FramePool`] manages one contiguous range of physical frames and the
//! two-bit state bitmap that describes them. It hands out single frames or
//! contiguous runs (first-fit) and accepts fixed reservations.
//!
//! ## Allocation discipline
//!
//! Every allocation is **probe, then commit**: the full candidate run is
//! checked for `Free` frames before a single bit is written. A failed request
//! leaves the bitmap and the free counter untouched.
//!
//! ```text
//! relative:  0   1   2   3   4   5   6   7
//! state:     F   F   H   U   U   F   F   F      allocate(3)
//! probe:     ok  ok  ✗  -> resume at 3 .. 5: ok ok ok
//! commit:                        H   U   U      returns base + 5
//! ```

use crate::error::{ConfigurationError, FramePoolError, ReservationFault};
use crate::info_mapper::InfoFrameMapper;
use crate::sizing::{InfoFrames, bitmap_bytes, needed_info_frames};
use crate::state::{FrameState, FrameStateBitmap};
use log::{debug, trace};

/// Manager of one contiguous physical frame range.
///
/// # Invariants
/// - `free_count` equals the number of `Free` frames in the bitmap.
/// - Every `HeadOfSequence` frame starts one run: itself followed by the
///   immediately subsequent `Used` frames.
pub struct FramePool {
    /// First absolute frame number of the pool.
    base_frame_no: u64,
    /// Number of frames managed.
    frame_count: u64,
    /// Number of frames currently `Free`.
    free_count: u64,
    /// Where the bitmap lives.
    info: InfoFrames,
    bitmap: FrameStateBitmap<'static>,
}

impl FramePool {
    /// Construct a pool whose bitmap lives in the info frames designated by
    /// `info`, made addressable through `mapper`.
    ///
    /// # Errors
    /// See [`from_storage`](Self::from_storage).
    ///
    /// # Safety
    /// - The info frames must be exclusively owned by this pool for the rest
    ///   of the program (see [`InfoFrameMapper::info_frames_mut`]).
    /// - External info frames inside another pool's range must already be
    ///   reserved in that pool.
    pub unsafe fn new<M: InfoFrameMapper>(
        base_frame_no: u64,
        frame_count: u64,
        info: InfoFrames,
        mapper: &M,
    ) -> Result<Self, FramePoolError> {
        if frame_count == 0 {
            return Err(ConfigurationError::EmptyPool.into());
        }

        let first = info.first_frame(base_frame_no);
        let frames = needed_info_frames(frame_count);
        // SAFETY: The caller guarantees exclusive ownership of the info frames
        // for the rest of the program, which is what the mapper requires.
        let storage = unsafe { mapper.info_frames_mut(first, frames) };
        Self::from_storage(base_frame_no, frame_count, info, storage)
    }

    /// Construct a pool over `[base_frame_no, base_frame_no + frame_count)`
    /// using `storage` as its bitmap.
    ///
    /// All frames start `Free`; info frames inside the pool are then marked as
    /// one allocated run. That run is released like any other once the memory
    /// manager reclaims the bitmap storage.
    ///
    /// # Errors
    /// - [`ConfigurationError::EmptyPool`] if `frame_count` is zero.
    /// - [`ConfigurationError::BitmapTooSmall`] if `storage` cannot hold the bitmap.
    pub fn from_storage(
        base_frame_no: u64,
        frame_count: u64,
        info: InfoFrames,
        storage: &'static mut [u8],
    ) -> Result<Self, FramePoolError> {
        if frame_count == 0 {
            return Err(ConfigurationError::EmptyPool.into());
        }

        let info_frames = needed_info_frames(frame_count);
        let needed = bitmap_bytes(frame_count);
        let available = storage.len() as u64;
        if available < needed {
            return Err(ConfigurationError::BitmapTooSmall { needed, available }.into());
        }

        let mut bitmap = FrameStateBitmap::new(storage);
        bitmap.fill(frame_count, FrameState::Free);

        let mut pool = Self {
            base_frame_no,
            frame_count,
            free_count: frame_count,
            info,
            bitmap,
        };

        // Only the part of the info run that overlaps this pool is ours to mark.
        let first = info.first_frame(base_frame_no);
        let start = first.max(base_frame_no);
        let end = (first + info_frames).min(pool.end_frame_no());
        if start < end {
            pool.commit_run(start - base_frame_no, end - start);
        }

        debug!(
            "Frame pool initialized: frames {:#x}..{:#x}, {} free, bitmap at frame {:#x} ({} frame(s))",
            base_frame_no,
            pool.end_frame_no(),
            pool.free_count,
            first,
            info_frames
        );
        Ok(pool)
    }

    #[inline]
    #[must_use]
    pub const fn base_frame_no(&self) -> u64 {
        self.base_frame_no
    }

    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> u64 {
        self.free_count
    }

    /// One past the last absolute frame number of the pool.
    #[inline]
    #[must_use]
    pub const fn end_frame_no(&self) -> u64 {
        self.base_frame_no + self.frame_count
    }

    #[inline]
    #[must_use]
    pub const fn info_frames(&self) -> InfoFrames {
        self.info
    }

    /// Whether the absolute `frame_no` lies inside the pool.
    #[inline]
    #[must_use]
    pub const fn contains(&self, frame_no: u64) -> bool {
        self.base_frame_no <= frame_no && frame_no < self.end_frame_no()
    }

    /// Whether no frame of the pool is allocated.
    #[inline]
    #[must_use]
    pub const fn is_fully_free(&self) -> bool {
        self.free_count == self.frame_count
    }

    /// State of the absolute `frame_no`, or `None` if outside the pool.
    #[must_use]
    pub fn state_of(&self, frame_no: u64) -> Option<FrameState> {
        self.contains(frame_no)
            .then(|| self.bitmap.get_state(frame_no - self.base_frame_no))
    }

    /// Count `Free` frames from the bitmap itself.
    ///
    /// Equal to [`free_count`](Self::free_count) unless the pool is corrupted.
    #[must_use]
    pub fn recount_free(&self) -> u64 {
        self.bitmap.count(self.frame_count, FrameState::Free)
    }

    /// Allocate `n` contiguous frames, first fit.
    ///
    /// Returns the absolute frame number of the run's first frame.
    ///
    /// # Errors
    /// - [`FramePoolError::EmptyRequest`] if `n` is zero.
    /// - [`FramePoolError::OutOfContiguousMemory`] if no run of `n` free frames
    ///   exists, even when enough frames are free in total.
    /// - [`FramePoolError::InvalidEncoding`] if the probe meets a corrupted entry.
    pub fn allocate(&mut self, n: u64) -> Result<u64, FramePoolError> {
        if n == 0 {
            return Err(FramePoolError::EmptyRequest);
        }

        let exhausted = FramePoolError::OutOfContiguousMemory {
            requested: n,
            free: self.free_count,
        };
        if n > self.free_count {
            return Err(exhausted);
        }

        let start = self.find_run(n)?.ok_or(exhausted)?;
        self.commit_run(start, n);

        let frame_no = self.base_frame_no + start;
        debug!("Allocated frames {:#x}..{:#x}", frame_no, frame_no + n);
        Ok(frame_no)
    }

    /// Mark the caller-chosen range `[base_frame_no, base_frame_no + n)` as one
    /// allocated run without searching, e.g. for memory occupied by boot images.
    ///
    /// # Errors
    /// [`FramePoolError::InvalidReservation`] if the range is empty, leaves the
    /// pool, or contains a frame that is not `Free`. Nothing is modified then.
    pub fn reserve(&mut self, base_frame_no: u64, n: u64) -> Result<(), FramePoolError> {
        let invalid = |reason| FramePoolError::InvalidReservation {
            base: base_frame_no,
            count: n,
            reason,
        };

        if n == 0 {
            return Err(invalid(ReservationFault::Empty));
        }

        let in_bounds = base_frame_no >= self.base_frame_no
            && base_frame_no
                .checked_add(n)
                .is_some_and(|end| end <= self.end_frame_no());
        if !in_bounds {
            return Err(invalid(ReservationFault::OutOfBounds));
        }

        let start = base_frame_no - self.base_frame_no;
        if let Some(blocker) = self.probe(start, n)? {
            let frame = self.base_frame_no + blocker;
            let state = self.bitmap.get_state(blocker);
            return Err(invalid(ReservationFault::NotFree { frame, state }));
        }

        self.commit_run(start, n);
        debug!(
            "Reserved frames {:#x}..{:#x}",
            base_frame_no,
            base_frame_no + n
        );
        Ok(())
    }

    /// First-fit search for `n` free frames; returns the relative start.
    fn find_run(&self, n: u64) -> Result<Option<u64>, FramePoolError> {
        let mut candidate = 0;
        while candidate + n <= self.frame_count {
            match self.probe(candidate, n)? {
                None => return Ok(Some(candidate)),
                // No run can start at or before the blocking frame.
                Some(blocker) => {
                    trace!("Run at {candidate:#x} blocked by {blocker:#x}");
                    candidate = blocker + 1;
                }
            }
        }
        Ok(None)
    }

    /// Relative number of the first non-free frame in `[start, start + n)`.
    fn probe(&self, start: u64, n: u64) -> Result<Option<u64>, FramePoolError> {
        for relative in start..start + n {
            match self.bitmap.get_state(relative) {
                FrameState::Free => {}
                FrameState::InvalidEncoding => {
                    return Err(FramePoolError::InvalidEncoding {
                        frame: self.base_frame_no + relative,
                    });
                }
                FrameState::Used | FrameState::HeadOfSequence => return Ok(Some(relative)),
            }
        }
        Ok(None)
    }

    /// Mark `[start, start + n)` as one run. The range must be free.
    fn commit_run(&mut self, start: u64, n: u64) {
        self.bitmap.set_state(start, FrameState::HeadOfSequence);
        for relative in start + 1..start + n {
            self.bitmap.set_state(relative, FrameState::Used);
        }
        self.free_count -= n;
    }

    #[inline]
    pub(crate) const fn bitmap(&self) -> &FrameStateBitmap<'static> {
        &self.bitmap
    }

    #[inline]
    pub(crate) const fn bitmap_mut(&mut self) -> &mut FrameStateBitmap<'static> {
        &mut self.bitmap
    }

    #[inline]
    pub(crate) const fn credit_freed(&mut self, frames: u64) {
        self.free_count += frames;
    }
}

impl core::fmt::Debug for FramePool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FramePool")
            .field("base_frame_no", &format_args!("{:#x}", self.base_frame_no))
            .field("frame_count", &self.frame_count)
            .field("free_count", &self.free_count)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
