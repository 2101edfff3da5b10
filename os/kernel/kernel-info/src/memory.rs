//! # Memory Layout

use kernel_memory_addresses::{FRAME_SIZE, FrameNumber};

const MIB: u32 = 1024 * 1024;

/// First frame of the kernel pool (2 MiB).
pub const KERNEL_POOL_START_FRAME: u32 = 2 * MIB / FRAME_SIZE;

/// Number of frames in the kernel pool (2 MiB).
pub const KERNEL_POOL_SIZE: u32 = 2 * MIB / FRAME_SIZE;

/// First frame of the process pool (4 MiB).
pub const PROCESS_POOL_START_FRAME: u32 = 4 * MIB / FRAME_SIZE;

/// Number of frames in the process pool (28 MiB).
pub const PROCESS_POOL_SIZE: u32 = 28 * MIB / FRAME_SIZE;

/// First frame of the memory hole (15 MiB).
pub const MEM_HOLE_START_FRAME: u32 = 15 * MIB / FRAME_SIZE;

/// Number of frames in the memory hole (1 MiB).
pub const MEM_HOLE_SIZE: u32 = MIB / FRAME_SIZE;

/// Bytes at the bottom of memory that every address space identity-maps.
pub const SHARED_SIZE: u32 = 4 * MIB;

/// A contiguous range of physical frames.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameRange {
    pub start: FrameNumber,
    pub count: u32,
}

impl FrameRange {
    #[must_use]
    pub const fn new(start: u32, count: u32) -> Self {
        Self {
            start: FrameNumber::new(start),
            count,
        }
    }

    /// One past the last frame of the range.
    #[must_use]
    pub const fn end(&self) -> FrameNumber {
        FrameNumber::new(self.start.as_u32() + self.count)
    }

    #[must_use]
    pub const fn contains(&self, frame: FrameNumber) -> bool {
        frame.as_u32() >= self.start.as_u32() && frame.as_u32() < self.end().as_u32()
    }
}

/// Where the frame pools, the memory hole and the shared region sit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryLayout {
    /// Self-managed pool for paging structures and bitmaps.
    pub kernel_pool: FrameRange,
    /// Pool for demand-paged frames; its bitmap lives in the kernel pool.
    pub process_pool: FrameRange,
    /// Frames inside the process pool that must never be handed out.
    pub memory_hole: FrameRange,
    /// Bytes identity-mapped into every address space.
    pub shared_size: u32,
}

impl MemoryLayout {
    /// The layout of the teaching machine (32 MiB of RAM).
    pub const DEFAULT: Self = Self {
        kernel_pool: FrameRange::new(KERNEL_POOL_START_FRAME, KERNEL_POOL_SIZE),
        process_pool: FrameRange::new(PROCESS_POOL_START_FRAME, PROCESS_POOL_SIZE),
        memory_hole: FrameRange::new(MEM_HOLE_START_FRAME, MEM_HOLE_SIZE),
        shared_size: SHARED_SIZE,
    };
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = {
    assert!(SHARED_SIZE.is_multiple_of(FRAME_SIZE));
    assert!(KERNEL_POOL_START_FRAME + KERNEL_POOL_SIZE <= SHARED_SIZE / FRAME_SIZE);
    assert!(KERNEL_POOL_START_FRAME + KERNEL_POOL_SIZE <= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME >= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME + MEM_HOLE_SIZE <= PROCESS_POOL_START_FRAME + PROCESS_POOL_SIZE);
};
