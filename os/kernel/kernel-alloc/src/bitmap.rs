//! Packed two-bit frame-state bitmap.

use crate::frame_state::{FRAMES_PER_BYTE, FrameState, StateByte};

/// Frame-state storage for one pool. Frames are addressed by their offset
/// from the pool's base frame.
pub(crate) struct FrameBitmap {
    bytes: &'static mut [u8],
    frames: u32,
}

impl FrameBitmap {
    /// Wrap `bytes` as the state storage for `frames` frames and mark them all free.
    pub(crate) fn new(bytes: &'static mut [u8], frames: u32) -> Self {
        debug_assert!(bytes.len() >= Self::bytes_for(frames));
        let mut bitmap = Self { bytes, frames };
        bitmap.clear();
        bitmap
    }

    /// Bytes needed to describe `frames` frames.
    pub(crate) const fn bytes_for(frames: u32) -> usize {
        frames.div_ceil(FRAMES_PER_BYTE) as usize
    }

    fn clear(&mut self) {
        let used = Self::bytes_for(self.frames);
        self.bytes[..used].fill(StateByte::new().into_bits());
    }

    #[inline]
    const fn locate(offset: u32) -> (usize, usize) {
        (
            (offset / FRAMES_PER_BYTE) as usize,
            (offset % FRAMES_PER_BYTE) as usize,
        )
    }

    pub(crate) fn get(&self, offset: u32) -> FrameState {
        debug_assert!(offset < self.frames);
        let (byte, slot) = Self::locate(offset);
        StateByte::from_bits(self.bytes[byte]).get(slot)
    }

    pub(crate) fn set(&mut self, offset: u32, state: FrameState) {
        debug_assert!(offset < self.frames);
        let (byte, slot) = Self::locate(offset);
        self.bytes[byte] = StateByte::from_bits(self.bytes[byte])
            .with(slot, state)
            .into_bits();
    }

    /// Set every frame in `[first, first + count)` to `state`.
    pub(crate) fn set_range(&mut self, first: u32, count: u32, state: FrameState) {
        for offset in first..first + count {
            self.set(offset, state);
        }
    }

    /// Offset of the lowest run of `count` consecutive free frames.
    pub(crate) fn find_free_run(&self, count: u32) -> Option<u32> {
        debug_assert!(count > 0);
        let mut run_start = 0;
        let mut run_len = 0;
        let mut offset = 0;
        while offset < self.frames {
            // A fully occupied byte cannot contribute to a run.
            if offset % FRAMES_PER_BYTE == 0
                && Self::byte_is_full(self.bytes[(offset / FRAMES_PER_BYTE) as usize])
            {
                run_len = 0;
                offset += FRAMES_PER_BYTE;
                continue;
            }

            if self.get(offset) == FrameState::Free {
                if run_len == 0 {
                    run_start = offset;
                }
                run_len += 1;
                if run_len == count {
                    return Some(run_start);
                }
            } else {
                run_len = 0;
            }
            offset += 1;
        }
        None
    }

    /// Whether none of the four slots of `byte` is free.
    const fn byte_is_full(byte: u8) -> bool {
        let state = StateByte::from_bits(byte);
        !matches!(state.get(0), FrameState::Free)
            && !matches!(state.get(1), FrameState::Free)
            && !matches!(state.get(2), FrameState::Free)
            && !matches!(state.get(3), FrameState::Free)
    }

    /// Number of frames currently in `state`.
    pub(crate) fn count(&self, state: FrameState) -> u32 {
        (0..self.frames)
            .map(|offset| u32::from(self.get(offset) == state))
            .sum()
    }
}
