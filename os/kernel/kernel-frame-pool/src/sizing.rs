//! # Bitmap Sizing
//!
//! Callers size a pool's bitmap storage before constructing it.

use crate::layout::{BITS_PER_FRAME_STATE, FRAME_SIZE_BITS};
use crate::state::FrameStateBitmap;

/// Number of info frames needed to hold the state bitmap of `frame_count` frames.
///
/// ```rust
/// # use kernel_frame_pool::needed_info_frames;
/// assert_eq!(needed_info_frames(1), 1);
/// assert_eq!(needed_info_frames(16_384), 1);
/// assert_eq!(needed_info_frames(32_768), 2);
/// ```
#[inline]
#[must_use]
pub const fn needed_info_frames(frame_count: u64) -> u64 {
    (frame_count * BITS_PER_FRAME_STATE).div_ceil(FRAME_SIZE_BITS)
}

/// Number of bitmap bytes actually written for `frame_count` frames.
#[inline]
#[must_use]
pub const fn bitmap_bytes(frame_count: u64) -> u64 {
    FrameStateBitmap::bytes_for(frame_count)
}

/// Where a pool keeps its own state bitmap.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InfoFrames {
    /// The bitmap occupies the pool's leading frame(s).
    Internal,
    /// The bitmap lives in frames starting at this absolute frame number,
    /// supplied by the caller.
    External(u64),
}

impl InfoFrames {
    /// Interpret the raw designator: `0` selects the pool's own leading
    /// frames, anything else names an external absolute frame number.
    #[inline]
    #[must_use]
    pub const fn from_raw(info_frame_no: u64) -> Self {
        if info_frame_no == 0 {
            Self::Internal
        } else {
            Self::External(info_frame_no)
        }
    }

    /// First absolute info frame for a pool starting at `base_frame_no`.
    #[inline]
    #[must_use]
    pub const fn first_frame(self, base_frame_no: u64) -> u64 {
        match self {
            Self::Internal => base_frame_no,
            Self::External(frame_no) => frame_no,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FRAME_SIZE;

    #[test]
    fn info_frames_round_up() {
        assert_eq!(needed_info_frames(0), 0);
        assert_eq!(needed_info_frames(1), 1);
        assert_eq!(needed_info_frames(FRAME_SIZE_BITS / 2), 1);
        assert_eq!(needed_info_frames(FRAME_SIZE_BITS / 2 + 1), 2);
        assert_eq!(needed_info_frames(32_768), 2);
    }

    #[test]
    fn bitmap_fits_its_info_frames() {
        for frames in [1, 3, 4, 5, 16_384, 16_385, 100_000] {
            assert!(bitmap_bytes(frames) <= needed_info_frames(frames) * FRAME_SIZE);
        }
    }

    #[test]
    fn raw_designator() {
        assert_eq!(InfoFrames::from_raw(0), InfoFrames::Internal);
        assert_eq!(InfoFrames::from_raw(0x80), InfoFrames::External(0x80));
        assert_eq!(InfoFrames::Internal.first_frame(0x200), 0x200);
        assert_eq!(InfoFrames::External(0x80).first_frame(0x200), 0x80);
    }
}
