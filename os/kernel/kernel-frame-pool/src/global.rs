//! # System-wide Pool Registry
//!
//! The kernel owns exactly one [`PoolRegistry`]. It sits behind a single
//! spin lock; every function here holds the lock for the whole operation, so
//! [`release`] resolves the owning pool and mutates it without a window in
//! which the pool could be retired underneath it.
//!
//! ```rust
//! use kernel_frame_pool::{FramePool, InfoFrames, global};
//!
//! let bitmap = Box::leak(vec![0u8; 64].into_boxed_slice());
//! let pool = FramePool::from_storage(0x8_0000, 256, InfoFrames::Internal, bitmap).unwrap();
//! let id = global::register_pool(pool).unwrap();
//!
//! let frame = global::allocate(id, 4).unwrap();
//! assert_eq!(global::release(frame).unwrap(), 4);
//! ```

use crate::error::FramePoolError;
use crate::pool::FramePool;
use crate::registry::{PoolId, PoolRegistry};
use spin::Mutex;

static REGISTRY: Mutex<PoolRegistry> = Mutex::new(PoolRegistry::new());

/// Run `f` with exclusive access to the global registry.
///
/// # Deadlocks
/// The lock is not re-entrant: `f` must not call any other function of this
/// module.
pub fn with_registry<R>(f: impl FnOnce(&mut PoolRegistry) -> R) -> R {
    let mut registry = REGISTRY.lock();
    f(&mut registry)
}

/// Register a freshly constructed pool.
///
/// # Errors
/// See [`PoolRegistry::register`].
pub fn register_pool(pool: FramePool) -> Result<PoolId, FramePoolError> {
    with_registry(|registry| registry.register(pool))
}

/// # Errors
/// See [`PoolRegistry::allocate`].
pub fn allocate(id: PoolId, n: u64) -> Result<u64, FramePoolError> {
    with_registry(|registry| registry.allocate(id, n))
}

/// # Errors
/// See [`PoolRegistry::reserve`].
pub fn reserve(id: PoolId, base_frame_no: u64, n: u64) -> Result<(), FramePoolError> {
    with_registry(|registry| registry.reserve(id, base_frame_no, n))
}

/// Release the run starting at `frame_no`, whichever pool owns it.
///
/// # Errors
/// See [`PoolRegistry::release`].
pub fn release(frame_no: u64) -> Result<u64, FramePoolError> {
    with_registry(|registry| registry.release(frame_no))
}

/// # Errors
/// See [`PoolRegistry::resolve`].
pub fn resolve(frame_no: u64) -> Result<PoolId, FramePoolError> {
    with_registry(|registry| registry.resolve(frame_no))
}

/// See [`PoolRegistry::check_freed_frames`].
pub fn check_freed_frames(base_frame_no: u64, n: u64) -> usize {
    with_registry(|registry| registry.check_freed_frames(base_frame_no, n))
}
