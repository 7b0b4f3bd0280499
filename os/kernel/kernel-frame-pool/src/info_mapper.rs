//! # Info Frame Mapping
//!
//! A pool keeps its state bitmap inside physical frames (its "info frames").
//! Code can only dereference virtual addresses, so constructing a pool needs a
//! way to see those frames as a byte slice.
//!
//! ## How does it work?
//! - With HHDM, every physical address is mapped at `HHDM_BASE + pa`.
//! - [`HhdmInfoFrameMapper`] adds the HHDM base to the info frames' physical
//!   address and hands out the region as `&'static mut [u8]`.
//! - The mapping strategy (HHDM, identity, test buffers) differs between the
//!   kernel and tests, so [`InfoFrameMapper`] abstracts over it.
//!
//! ## Example
//! ```rust,no_run
//! use kernel_frame_pool::info_mapper::HhdmInfoFrameMapper;
//! use kernel_frame_pool::{FramePool, InfoFrames};
//!
//! let pool = unsafe { FramePool::new(0x200, 0x1000, InfoFrames::Internal, &HhdmInfoFrameMapper) };
//! ```

use crate::layout::{FRAME_SIZE, HHDM_BASE, frame_base};

/// Turns a pool's info frames into writable bitmap storage.
pub trait InfoFrameMapper {
    /// View `count` frames starting at absolute frame `first_frame_no` as bytes.
    ///
    /// # Safety
    /// - The frames must be mapped, writable, and exclusively owned by the
    ///   pool being constructed for the rest of the program.
    unsafe fn info_frames_mut(&self, first_frame_no: u64, count: u64) -> &'static mut [u8];
}

/// [`InfoFrameMapper`] for kernels with a higher-half direct map (HHDM).
///
/// # Safety
/// - The HHDM mapping must be present and cover the referenced physical range.
pub struct HhdmInfoFrameMapper;

impl InfoFrameMapper for HhdmInfoFrameMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn info_frames_mut(&self, first_frame_no: u64, count: u64) -> &'static mut [u8] {
        let va = (HHDM_BASE + frame_base(first_frame_no)) as *mut u8;
        let len = (count * FRAME_SIZE) as usize;
        // SAFETY: Caller must ensure the frames are valid and mapped via HHDM.
        unsafe { core::slice::from_raw_parts_mut(va, len) }
    }
}
