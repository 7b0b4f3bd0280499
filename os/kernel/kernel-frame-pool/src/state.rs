//! # Packed Frame State Bitmap
//!
//! Every frame of a pool is described by two bits:
//!
//! ```text
//!  bit 7 6   5 4   3 2   1 0
//! +-----+-----+-----+-----+
//! | f+3 | f+2 | f+1 | f+0 |   one byte = four frames, f = 4 * byte index
//! +-----+-----+-----+-----+
//!
//! 00 = Free   01 = Used   10 = HeadOfSequence   11 = invalid
//! ```
//!
//! The layout is position-compatible with a plain shift/mask scheme: frame
//! `n` lives at bit `(n % 4) * 2` of byte `n / 4`.

use crate::layout::STATES_PER_BYTE;
use bitfield_struct::bitfield;

/// State of a single frame as recorded in a pool's bitmap.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum FrameState {
    /// Not allocated.
    Free = 0b00,
    /// Allocated, continuation of a run.
    Used = 0b01,
    /// Allocated, first frame of a run.
    HeadOfSequence = 0b10,
    /// The unused bit pattern. Never written; seeing it on read means the
    /// bitmap is corrupted.
    InvalidEncoding = 0b11,
}

impl FrameState {
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    /// Decode from the low two bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(value_low2: u8) -> Self {
        match value_low2 & 0b11 {
            0b00 => Self::Free,
            0b01 => Self::Used,
            0b10 => Self::HeadOfSequence,
            _ => Self::InvalidEncoding,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    /// Whether the frame belongs to an allocated run.
    #[inline]
    #[must_use]
    pub const fn is_allocated(self) -> bool {
        matches!(self, Self::Used | Self::HeadOfSequence)
    }
}

/// One bitmap byte: the states of four consecutive frames.
#[bitfield(u8)]
#[derive(Eq, PartialEq)]
struct StateQuad {
    #[bits(2)]
    frame0: FrameState,
    #[bits(2)]
    frame1: FrameState,
    #[bits(2)]
    frame2: FrameState,
    #[bits(2)]
    frame3: FrameState,
}

impl StateQuad {
    #[inline]
    const fn get(self, slot: u64) -> FrameState {
        match slot {
            0 => self.frame0(),
            1 => self.frame1(),
            2 => self.frame2(),
            _ => self.frame3(),
        }
    }

    #[inline]
    const fn with(self, slot: u64, state: FrameState) -> Self {
        match slot {
            0 => self.with_frame0(state),
            1 => self.with_frame1(state),
            2 => self.with_frame2(state),
            _ => self.with_frame3(state),
        }
    }
}

/// Byte index and in-byte slot holding the state of `relative_frame_no`.
#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn locate(relative_frame_no: u64) -> (usize, u64) {
    (
        (relative_frame_no / STATES_PER_BYTE) as usize,
        relative_frame_no % STATES_PER_BYTE,
    )
}

/// Two-bit-per-frame state table over borrowed byte storage.
///
/// Frame numbers are **relative** to the owning pool. The bitmap performs no
/// sequencing checks; [`FramePool`](crate::FramePool) enforces the state machine.
pub struct FrameStateBitmap<'a> {
    bytes: &'a mut [u8],
}

impl<'a> FrameStateBitmap<'a> {
    /// Wrap `bytes` without touching its contents.
    #[inline]
    #[must_use]
    pub const fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Number of bytes needed to describe `frames` frames.
    #[inline]
    #[must_use]
    pub const fn bytes_for(frames: u64) -> u64 {
        frames.div_ceil(STATES_PER_BYTE)
    }

    /// Number of frames the underlying storage can describe.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.bytes.len() as u64 * STATES_PER_BYTE
    }

    /// Decode the state of `relative_frame_no`.
    ///
    /// # Panics
    /// If the frame lies beyond the storage.
    #[inline]
    #[must_use]
    pub fn get_state(&self, relative_frame_no: u64) -> FrameState {
        let (index, slot) = locate(relative_frame_no);
        StateQuad::from_bits(self.bytes[index]).get(slot)
    }

    /// Overwrite the state of `relative_frame_no`.
    ///
    /// # Panics
    /// If the frame lies beyond the storage.
    #[inline]
    pub fn set_state(&mut self, relative_frame_no: u64, state: FrameState) {
        debug_assert_ne!(state, FrameState::InvalidEncoding);
        let (index, slot) = locate(relative_frame_no);
        let quad = StateQuad::from_bits(self.bytes[index]).with(slot, state);
        self.bytes[index] = quad.into_bits();
    }

    /// Set the first `frames` entries to `state`.
    pub fn fill(&mut self, frames: u64, state: FrameState) {
        for frame in 0..frames {
            self.set_state(frame, state);
        }
    }

    /// Count frames in `[0, frames)` currently in `state`.
    #[must_use]
    pub fn count(&self, frames: u64, state: FrameState) -> u64 {
        (0..frames)
            .filter(|&frame| self.get_state(frame) == state)
            .count() as u64
    }

    #[cfg(test)]
    pub(crate) fn bytes_mut_for_test(&mut self) -> &mut [u8] {
        self.bytes
    }
}
