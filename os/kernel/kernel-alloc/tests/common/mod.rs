//! Simulated physical RAM for hosted tests.

#![allow(dead_code)]

use kernel_alloc::{FramePool, FramePoolConfig, PhysMapper};
use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, PhysicalAddress};

#[repr(C, align(4096))]
struct Aligned4K([u8; FRAME_SIZE as usize]);

/// `frames` frames of leaked, zeroed memory standing in for physical frames
/// `first..first + frames`.
pub struct TestPhys {
    first: FrameNumber,
    frames: u32,
    base: *mut u8,
}

impl TestPhys {
    pub fn new(first: u32, frames: u32) -> Self {
        let memory: &'static mut [Aligned4K] = (0..frames)
            .map(|_| Aligned4K([0; FRAME_SIZE as usize]))
            .collect::<Vec<_>>()
            .leak();
        Self {
            first: FrameNumber::new(first),
            frames,
            base: memory.as_mut_ptr().cast(),
        }
    }
}

impl PhysMapper for TestPhys {
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        let index = pa
            .frame()
            .offset_from(self.first)
            .filter(|&i| i < self.frames)
            .unwrap_or_else(|| panic!("{pa} is outside simulated RAM"));
        let offset = index as usize * FRAME_SIZE as usize + pa.frame_offset() as usize;
        unsafe { self.base.add(offset) }
    }
}

/// Construct an unregistered pool with a `'static` lifetime.
pub fn leak_pool(phys: &TestPhys, config: FramePoolConfig) -> &'static FramePool {
    let pool = unsafe { FramePool::new(phys, config) }.expect("valid pool configuration");
    Box::leak(Box::new(pool))
}
