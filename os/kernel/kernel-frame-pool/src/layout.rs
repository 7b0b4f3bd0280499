//! # Physical Frame Layout

/// Bytes per physical frame, shared by every pool for the lifetime of the system.
pub const FRAME_SIZE: u64 = 4096;

/// Number of bits a single frame can hold.
///
/// This is the bitmap capacity of one info frame before accounting for the
/// two bits each tracked frame needs.
pub const FRAME_SIZE_BITS: u64 = FRAME_SIZE * 8;

/// Bits of bitmap state kept per tracked frame.
pub const BITS_PER_FRAME_STATE: u64 = 2;

/// Frame states packed into a single bitmap byte.
pub const STATES_PER_BYTE: u64 = 8 / BITS_PER_FRAME_STATE;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything mapped at [`HHDM_BASE`] + `pa` lets the kernel
/// reach a pool's info frames via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Physical base address of the absolute frame `frame_no`.
#[inline]
#[must_use]
pub const fn frame_base(frame_no: u64) -> u64 {
    frame_no * FRAME_SIZE
}

const _: () = {
    assert!(FRAME_SIZE.is_power_of_two());
    assert!(FRAME_SIZE_BITS % BITS_PER_FRAME_STATE == 0);
    assert!(HHDM_BASE % FRAME_SIZE == 0);
};
