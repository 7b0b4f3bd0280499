use kernel_frame_pool::{
    FramePool, FramePoolError, FrameState, InfoFrames, PoolId, PoolRegistry, bitmap_bytes,
    needed_info_frames,
};

fn bitmap(frames: u64) -> &'static mut [u8] {
    let len = usize::try_from(bitmap_bytes(frames)).unwrap();
    Box::leak(vec![0u8; len].into_boxed_slice())
}

/// Pool with its bitmap kept elsewhere, so all frames are allocatable.
fn open_pool(base: u64, count: u64) -> FramePool {
    FramePool::from_storage(base, count, InfoFrames::External(0x7fff_0000), bitmap(count)).unwrap()
}

fn assert_free_count_matches_bitmap(registry: &PoolRegistry, ids: &[PoolId]) {
    for &id in ids {
        let pool = registry.pool(id).unwrap();
        assert_eq!(pool.recount_free(), pool.free_count(), "pool {id:?}");
    }
}

#[test]
fn sizing_for_4k_frames() {
    assert_eq!(needed_info_frames(32_768), 2);
    assert_eq!(needed_info_frames(1), 1);
}

#[test]
fn first_fit_over_fragmentation() {
    let mut registry = PoolRegistry::new();
    let id = registry.register(open_pool(0x1000, 10)).unwrap();
    registry.reserve(id, 0x1002, 3).unwrap();

    assert_eq!(registry.allocate(id, 3).unwrap(), 0x1005);
    assert_free_count_matches_bitmap(&registry, &[id]);
}

#[test]
fn exhaustion() {
    let mut registry = PoolRegistry::new();
    let id = registry.register(open_pool(0x2000, 4)).unwrap();
    registry.allocate(id, 3).unwrap();

    assert!(matches!(
        registry.allocate(id, 2),
        Err(FramePoolError::OutOfContiguousMemory { requested: 2, free: 1 })
    ));
}

#[test]
fn fragmentation_despite_sufficient_count() {
    let mut registry = PoolRegistry::new();
    let id = registry.register(open_pool(0x3000, 6)).unwrap();
    for frame in [0x3000, 0x3002, 0x3004] {
        registry.reserve(id, frame, 1).unwrap();
    }
    assert_eq!(registry.pool(id).unwrap().free_count(), 3);

    assert!(matches!(
        registry.allocate(id, 2),
        Err(FramePoolError::OutOfContiguousMemory { .. })
    ));
    assert_free_count_matches_bitmap(&registry, &[id]);
}

#[test]
fn allocate_release_round_trip() {
    let mut registry = PoolRegistry::new();
    let pool = FramePool::from_storage(0x4000, 128, InfoFrames::Internal, bitmap(128)).unwrap();
    let id = registry.register(pool).unwrap();

    for n in [1, 2, 7, 64] {
        let frame = registry.allocate(id, n).unwrap();
        assert_eq!(registry.pool(id).unwrap().free_count(), 127 - n);
        assert_eq!(registry.release(frame).unwrap(), n);
        assert_eq!(registry.check_freed_frames(frame, n), 0);
        assert_free_count_matches_bitmap(&registry, &[id]);
    }
    assert_eq!(registry.pool(id).unwrap().free_count(), 127);
}

#[test]
fn resolution_across_pools() {
    let mut registry = PoolRegistry::new();
    let ranges = [(0x5000, 16), (0x6000, 3), (0x5800, 40)];
    let ids: Vec<_> = ranges
        .iter()
        .map(|&(base, count)| registry.register(open_pool(base, count)).unwrap())
        .collect();

    for (&(base, count), &id) in ranges.iter().zip(&ids) {
        for frame in base..base + count {
            assert_eq!(registry.resolve(frame).unwrap(), id);
        }
        assert!(matches!(
            registry.resolve(base + count),
            Err(FramePoolError::UnknownFrame { .. })
        ));
    }
    assert!(registry.resolve(0x4fff).is_err());
}

#[test]
fn interleaved_runs_across_pools() {
    let mut registry = PoolRegistry::new();
    let a = registry.register(open_pool(0x7000, 32)).unwrap();
    let b = registry.register(open_pool(0x8000, 32)).unwrap();

    let mut outstanding = Vec::new();
    for n in 1..=6 {
        outstanding.push((registry.allocate(a, n).unwrap(), n));
        outstanding.push((registry.allocate(b, 7 - n).unwrap(), 7 - n));
    }
    assert_free_count_matches_bitmap(&registry, &[a, b]);

    // Release every other run first to fragment both pools.
    for &(frame, n) in outstanding.iter().step_by(2) {
        assert_eq!(registry.release(frame).unwrap(), n);
    }
    assert_free_count_matches_bitmap(&registry, &[a, b]);

    for &(frame, n) in outstanding.iter().skip(1).step_by(2) {
        assert_eq!(registry.release(frame).unwrap(), n);
    }
    assert_free_count_matches_bitmap(&registry, &[a, b]);

    assert_eq!(registry.live_count(), 0);
    assert_eq!(registry.check_freed_frames(0x7000, 32), 0);
    assert_eq!(registry.check_freed_frames(0x8000, 32), 0);
}

#[test]
fn pool_retirement() {
    let mut registry = PoolRegistry::new();
    let id = registry.register(open_pool(0x9000, 8)).unwrap();
    let frame = registry.allocate(id, 8).unwrap();
    assert_eq!(registry.pool(id).unwrap().state_of(0x9007), Some(FrameState::Used));

    registry.release(frame).unwrap();
    assert!(!registry.is_live(id));
    for f in 0x9000..0x9008 {
        assert_eq!(
            registry.resolve(f).unwrap_err(),
            FramePoolError::UnknownFrame { frame: f }
        );
    }
    assert!(matches!(
        registry.release(frame),
        Err(FramePoolError::UnknownFrame { .. })
    ));
}
