//! # Contiguous Physical Frame Pools
//!
//! This crate tracks which physical memory frames of the machine are free,
//! allocated singly, or allocated as part of a contiguous run. It manages one
//! or more disjoint frame ranges ("pools") and lets a frame run be released
//! given nothing but its first frame number.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            global (spin-locked registry)            │
//! │    • allocate / reserve against a pool handle       │
//! │    • release given only a frame number              │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  PoolRegistry                       │
//! │    • arena of pools, live pools linked in order     │
//! │    • frame number → owning pool                     │
//! │    • retires pools whose frames are all free        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                   FramePool                         │
//! │    • first-fit contiguous runs, probe then commit   │
//! │    • fixed reservations                             │
//! │    • free-frame counter                             │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │               FrameStateBitmap                      │
//! │    • 2 bits per frame, 4 frames per byte            │
//! │    • stored in the pool's info frame(s)             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame States
//!
//! | State | Meaning |
//! |-------|---------|
//! | [`FrameState::Free`] | not allocated |
//! | [`FrameState::HeadOfSequence`] | allocated, first frame of a run |
//! | [`FrameState::Used`] | allocated, continuation of a run |
//!
//! Releasing a run marks its head and every directly following `Used` frame
//! free, which is why a run's first frame is enough to give it back.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_frame_pool::{FramePool, InfoFrames, PoolRegistry, bitmap_bytes, needed_info_frames};
//!
//! let frames = 1024;
//! assert_eq!(needed_info_frames(frames), 1);
//!
//! // In the kernel the bitmap lives in the info frames (see `info_mapper`).
//! let len = usize::try_from(bitmap_bytes(frames)).unwrap();
//! let bitmap = Box::leak(vec![0u8; len].into_boxed_slice());
//! let pool = FramePool::from_storage(0x200, frames, InfoFrames::Internal, bitmap).unwrap();
//!
//! let mut registry = PoolRegistry::new();
//! let id = registry.register(pool).unwrap();
//!
//! let run = registry.allocate(id, 8).unwrap();
//! assert_eq!(run, 0x201); // frame 0x200 holds the bitmap
//! assert_eq!(registry.release(run).unwrap(), 8);
//! ```
//!
//! ## Errors
//!
//! See [`FramePoolError`]. Allocation, reservation, and release failures are
//! recoverable; [`FramePoolError::is_defect`] flags the ones that are not.
//!
//! ## Concurrency
//!
//! [`FramePool`] and [`PoolRegistry`] are plain data structures mutated via
//! `&mut self`. The [`global`] registry serializes all callers with one lock.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod error;
pub mod global;
pub mod info_mapper;
pub mod layout;
mod pool;
mod registry;
mod release;
mod sizing;
mod state;

pub use error::{ConfigurationError, FramePoolError, ReservationFault};
pub use pool::FramePool;
pub use registry::{MAX_POOLS, PoolId, PoolRegistry};
pub use sizing::{InfoFrames, bitmap_bytes, needed_info_frames};
pub use state::{FrameState, FrameStateBitmap};
