//! # Pool Registry
//!
//! Release is pool-agnostic: callers hand back a bare frame number. The
//! registry is what lets that number be routed to its owning [`FramePool`].
//!
//! ## Layout
//!
//! Pools live in a fixed arena of [`MAX_POOLS`] slots. The *live* pools are
//! additionally threaded through an index-linked list in registration order:
//!
//! ```text
//!  head ──► slot 0 ◄──► slot 2 ◄──► slot 3 ◄── tail
//!           slot 1      (retired: still in the arena, not linked)
//! ```
//!
//! Links are slot indices, never references, so unlinking a pool cannot leave a
//! dangling pointer behind. A [`PoolId`] stays valid for the lifetime of the
//! registry, also after its pool has been retired.

use crate::error::{ConfigurationError, FramePoolError};
use crate::pool::FramePool;
use log::debug;

/// Number of pools a registry can hold.
pub const MAX_POOLS: usize = 64;

/// Handle to a pool registered with a [`PoolRegistry`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PoolId(usize);

impl PoolId {
    /// Arena slot of the pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

struct Slot {
    pool: FramePool,
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

/// Ordered collection of frame pools.
///
/// # Invariants
/// - A slot is linked iff its pool is live (has outstanding allocations, or
///   has not been retired since registration).
/// - `head`/`tail` are the first/last linked slots; `prev`/`next` of linked
///   slots form a consistent doubly linked list.
pub struct PoolRegistry {
    slots: [Option<Slot>; MAX_POOLS],
    /// Number of occupied slots; slots are never vacated.
    used: usize,
    head: Option<usize>,
    tail: Option<usize>,
    live: usize,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_POOLS],
            used: 0,
            head: None,
            tail: None,
            live: 0,
        }
    }

    /// Take ownership of `pool` and append it to the live list in O(1).
    ///
    /// Pool ranges must be pairwise disjoint; this is only checked in debug builds.
    ///
    /// # Errors
    /// [`ConfigurationError::RegistryFull`] when all slots are taken.
    pub fn register(&mut self, pool: FramePool) -> Result<PoolId, FramePoolError> {
        if self.used == MAX_POOLS {
            return Err(ConfigurationError::RegistryFull {
                capacity: MAX_POOLS,
            }
            .into());
        }

        debug_assert!(
            self.iter_all().all(|(_, other)| {
                pool.end_frame_no() <= other.base_frame_no()
                    || other.end_frame_no() <= pool.base_frame_no()
            }),
            "frame pool {pool:?} overlaps a registered pool"
        );

        let index = self.used;
        debug!(
            "Attaching frame pool {:#x}..{:#x} as pool #{index}",
            pool.base_frame_no(),
            pool.end_frame_no()
        );

        self.slots[index] = Some(Slot {
            pool,
            prev: None,
            next: None,
            linked: false,
        });
        self.used += 1;
        self.link_tail(index);
        Ok(PoolId(index))
    }

    /// Find the live pool whose range contains the absolute `frame_no`.
    ///
    /// Walks the live list; O(number of live pools).
    ///
    /// # Errors
    /// [`FramePoolError::UnknownFrame`] if no live pool owns the frame.
    pub fn resolve(&self, frame_no: u64) -> Result<PoolId, FramePoolError> {
        self.iter_live()
            .find(|(_, pool)| pool.contains(frame_no))
            .map(|(id, _)| id)
            .ok_or(FramePoolError::UnknownFrame { frame: frame_no })
    }

    /// Borrow a registered pool, live or retired.
    ///
    /// # Errors
    /// [`FramePoolError::UnknownPool`] if `id` was not issued by this registry.
    pub fn pool(&self, id: PoolId) -> Result<&FramePool, FramePoolError> {
        self.slot(id.0)
            .map(|slot| &slot.pool)
            .ok_or(FramePoolError::UnknownPool)
    }

    /// Allocate `n` contiguous frames from the pool `id`.
    ///
    /// A retired pool that hands out frames becomes live again.
    ///
    /// # Errors
    /// [`FramePoolError::UnknownPool`], or any error of [`FramePool::allocate`].
    pub fn allocate(&mut self, id: PoolId, n: u64) -> Result<u64, FramePoolError> {
        let frame_no = self.pool_mut(id)?.allocate(n)?;
        self.revive(id.0);
        Ok(frame_no)
    }

    /// Reserve `[base_frame_no, base_frame_no + n)` in the pool `id`.
    ///
    /// # Errors
    /// [`FramePoolError::UnknownPool`], or any error of [`FramePool::reserve`].
    pub fn reserve(&mut self, id: PoolId, base_frame_no: u64, n: u64) -> Result<(), FramePoolError> {
        self.pool_mut(id)?.reserve(base_frame_no, n)?;
        self.revive(id.0);
        Ok(())
    }

    /// Whether the pool is currently linked into the live list.
    #[must_use]
    pub fn is_live(&self, id: PoolId) -> bool {
        self.slot(id.0).is_some_and(|slot| slot.linked)
    }

    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Number of pools ever registered.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.used
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Live pools in registration order.
    pub fn iter_live(&self) -> impl Iterator<Item = (PoolId, &FramePool)> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let index = cursor?;
            let slot = self.slot(index)?;
            cursor = slot.next;
            Some((PoolId(index), &slot.pool))
        })
    }

    /// Every registered pool, live or retired, in slot order.
    pub(crate) fn iter_all(&self) -> impl Iterator<Item = (PoolId, &FramePool)> + '_ {
        self.slots[..self.used]
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (PoolId(index), &slot.pool)))
    }

    pub(crate) fn pool_mut(&mut self, id: PoolId) -> Result<&mut FramePool, FramePoolError> {
        self.slot_mut(id.0)
            .map(|slot| &mut slot.pool)
            .ok_or(FramePoolError::UnknownPool)
    }

    /// Drop the pool from the live list in O(1). Its slot stays occupied.
    pub(crate) fn unlink(&mut self, index: usize) {
        let Some(slot) = self.slot_mut(index) else {
            return;
        };
        if !slot.linked {
            return;
        }

        let (prev, next) = (slot.prev.take(), slot.next.take());
        slot.linked = false;

        match prev.and_then(|prev| self.slot_mut(prev)) {
            Some(prev_slot) => prev_slot.next = next,
            None => self.head = next,
        }
        match next.and_then(|next| self.slot_mut(next)) {
            Some(next_slot) => next_slot.prev = prev,
            None => self.tail = prev,
        }
        self.live -= 1;
    }

    fn link_tail(&mut self, index: usize) {
        let tail = self.tail;
        let Some(slot) = self.slot_mut(index) else {
            return;
        };
        debug_assert!(!slot.linked);
        slot.prev = tail;
        slot.next = None;
        slot.linked = true;

        match tail.and_then(|tail| self.slot_mut(tail)) {
            Some(tail_slot) => tail_slot.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.live += 1;
    }

    /// Re-link a retired pool after it handed out frames again.
    fn revive(&mut self, index: usize) {
        if self.slot(index).is_some_and(|slot| !slot.linked) {
            debug!("Re-attaching retired frame pool #{index}");
            self.link_tail(index);
        }
    }

    fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)?.as_ref()
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::external_pool;

    fn live_bases(registry: &PoolRegistry) -> Vec<u64> {
        registry
            .iter_live()
            .map(|(_, pool)| pool.base_frame_no())
            .collect()
    }

    #[test]
    fn registration_appends_in_order() {
        let mut registry = PoolRegistry::new();
        let a = registry.register(external_pool(0x000, 0x10)).unwrap();
        let b = registry.register(external_pool(0x100, 0x10)).unwrap();
        let c = registry.register(external_pool(0x080, 0x10)).unwrap();

        assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));
        assert_eq!(live_bases(&registry), [0x000, 0x100, 0x080]);
        assert_eq!(registry.live_count(), 3);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn resolve_covers_exactly_the_pool_range() {
        let mut registry = PoolRegistry::new();
        let a = registry.register(external_pool(0x10, 8)).unwrap();
        let b = registry.register(external_pool(0x40, 4)).unwrap();

        for frame in 0x10..0x18 {
            assert_eq!(registry.resolve(frame).unwrap(), a);
        }
        for frame in 0x40..0x44 {
            assert_eq!(registry.resolve(frame).unwrap(), b);
        }
        for frame in [0x0f, 0x18, 0x3f, 0x44, u64::MAX] {
            assert_eq!(
                registry.resolve(frame).unwrap_err(),
                FramePoolError::UnknownFrame { frame }
            );
        }
    }

    #[test]
    fn unlink_middle_head_and_tail() {
        let mut registry = PoolRegistry::new();
        for base in [0x00, 0x10, 0x20, 0x30] {
            registry.register(external_pool(base, 8)).unwrap();
        }

        registry.unlink(1);
        assert_eq!(live_bases(&registry), [0x00, 0x20, 0x30]);
        registry.unlink(0);
        assert_eq!(live_bases(&registry), [0x20, 0x30]);
        registry.unlink(3);
        assert_eq!(live_bases(&registry), [0x20]);
        registry.unlink(3);
        assert_eq!(registry.live_count(), 1);
        registry.unlink(2);
        assert!(live_bases(&registry).is_empty());
        assert_eq!(registry.live_count(), 0);

        // Retired pools keep their slots.
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.pool(PoolId(1)).unwrap().base_frame_no(), 0x10);
    }

    #[test]
    fn allocation_revives_a_retired_pool() {
        let mut registry = PoolRegistry::new();
        let a = registry.register(external_pool(0x00, 8)).unwrap();
        let b = registry.register(external_pool(0x10, 8)).unwrap();
        registry.unlink(a.index());
        assert!(!registry.is_live(a));

        assert_eq!(registry.allocate(a, 2).unwrap(), 0x00);
        assert!(registry.is_live(a));
        assert_eq!(live_bases(&registry), [0x10, 0x00]);
        assert_eq!(registry.resolve(0x01).unwrap(), a);

        registry.reserve(b, 0x12, 2).unwrap();
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn failed_allocation_does_not_revive() {
        let mut registry = PoolRegistry::new();
        let a = registry.register(external_pool(0x00, 2)).unwrap();
        registry.unlink(a.index());

        assert!(registry.allocate(a, 3).is_err());
        assert!(!registry.is_live(a));
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut registry = PoolRegistry::new();
        assert_eq!(
            registry.allocate(PoolId(5), 1).unwrap_err(),
            FramePoolError::UnknownPool
        );
        assert_eq!(
            registry.pool(PoolId(MAX_POOLS + 1)).unwrap_err(),
            FramePoolError::UnknownPool
        );
    }

    #[test]
    fn registry_capacity_is_bounded() {
        let mut registry = PoolRegistry::new();
        for i in 0..MAX_POOLS as u64 {
            registry.register(external_pool(i * 8, 8)).unwrap();
        }
        assert_eq!(
            registry.register(external_pool(0x1_0000, 8)).unwrap_err(),
            FramePoolError::Configuration(ConfigurationError::RegistryFull {
                capacity: MAX_POOLS
            })
        );
    }
}
