//! # Frame States
//!
//! Every frame managed by a [`FramePool`](crate::FramePool) is described by two
//! bits in the pool's bitmap. Four frames share one byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------+-------+-------+-------+
//! | slot0 | slot1 | slot2 | slot3 |   byte = offset / 4, slot = offset % 4
//! +-------+-------+-------+-------+
//! ```
//!
//! | State | Encoding |
//! |---|---|
//! | [`Free`](FrameState::Free) | `0b00` |
//! | [`Inaccessible`](FrameState::Inaccessible) | `0b01` |
//! | [`HeadOfSequence`](FrameState::HeadOfSequence) | `0b10` |
//! | [`Continuation`](FrameState::Continuation) | `0b11` |
//!
//! All encoding and decoding goes through [`StateByte`].

use bitfield_struct::bitfield;

/// Allocation state of a single frame.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum FrameState {
    /// Available for allocation.
    Free = 0b00,
    /// Permanently reserved. Never handed out, never released.
    Inaccessible = 0b01,
    /// First frame of an allocated run.
    HeadOfSequence = 0b10,
    /// A non-first frame of an allocated run.
    Continuation = 0b11,
}

impl FrameState {
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Free,
            0b01 => Self::Inaccessible,
            0b10 => Self::HeadOfSequence,
            _ => Self::Continuation,
        }
    }

    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    /// Whether the frame belongs to an allocated run.
    #[inline]
    #[must_use]
    pub const fn is_allocated(self) -> bool {
        matches!(self, Self::HeadOfSequence | Self::Continuation)
    }
}

/// Number of frames described by one bitmap byte.
pub const FRAMES_PER_BYTE: u32 = 4;

/// One bitmap byte holding four frame states, slot 0 in the high bits.
#[bitfield(u8)]
#[derive(Eq, PartialEq)]
pub(crate) struct StateByte {
    #[bits(2)]
    slot3: FrameState,
    #[bits(2)]
    slot2: FrameState,
    #[bits(2)]
    slot1: FrameState,
    #[bits(2)]
    slot0: FrameState,
}

impl StateByte {
    /// State of the frame in `slot` (`0..4`).
    #[inline]
    pub(crate) const fn get(self, slot: usize) -> FrameState {
        match slot {
            0 => self.slot0(),
            1 => self.slot1(),
            2 => self.slot2(),
            _ => self.slot3(),
        }
    }

    /// Copy of `self` with the frame in `slot` (`0..4`) set to `state`.
    #[inline]
    pub(crate) const fn with(self, slot: usize, state: FrameState) -> Self {
        match slot {
            0 => self.with_slot0(state),
            1 => self.with_slot1(state),
            2 => self.with_slot2(state),
            _ => self.with_slot3(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_zero_is_most_significant() {
        let byte = StateByte::new().with(0, FrameState::HeadOfSequence);
        assert_eq!(byte.into_bits(), 0b1000_0000);

        let byte = StateByte::new().with(3, FrameState::Continuation);
        assert_eq!(byte.into_bits(), 0b0000_0011);
    }

    #[test]
    fn slots_are_independent() {
        let byte = StateByte::new()
            .with(0, FrameState::Inaccessible)
            .with(1, FrameState::HeadOfSequence)
            .with(2, FrameState::Continuation);
        assert_eq!(byte.into_bits(), 0b0110_1100);
        assert_eq!(byte.get(0), FrameState::Inaccessible);
        assert_eq!(byte.get(1), FrameState::HeadOfSequence);
        assert_eq!(byte.get(2), FrameState::Continuation);
        assert_eq!(byte.get(3), FrameState::Free);

        let cleared = byte.with(1, FrameState::Free);
        assert_eq!(cleared.into_bits(), 0b0100_1100);
    }

    #[test]
    fn only_runs_count_as_allocated() {
        assert!(FrameState::HeadOfSequence.is_allocated());
        assert!(FrameState::Continuation.is_allocated());
        assert!(!FrameState::Free.is_allocated());
        assert!(!FrameState::Inaccessible.is_allocated());
    }
}
