//! Simulated physical RAM and control registers for hosted tests.

#![allow(dead_code)]

use core::cell::Cell;
use kernel_alloc::{FramePool, FramePoolConfig, PhysMapper};
use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, PhysicalAddress, VirtualAddress};
use kernel_vmem::{FaultContext, FaultResolution, Paging, PagingError, PagingHardware};

#[repr(C, align(4096))]
struct Aligned4K([u8; FRAME_SIZE as usize]);

/// `frames` frames of leaked, zeroed memory standing in for physical frames
/// `first..first + frames`.
#[derive(Copy, Clone)]
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

/// Control registers as plain cells.
#[derive(Default)]
pub struct SimHardware {
    pub cr2: Cell<u32>,
    pub cr3: Cell<u32>,
    pub paging: Cell<bool>,
    pub enable_calls: Cell<u32>,
}

impl PagingHardware for SimHardware {
    unsafe fn write_page_directory(&self, directory: PhysicalAddress) {
        self.cr3.set(directory.as_u32());
    }

    fn read_page_directory(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.cr3.get())
    }

    fn read_fault_address(&self) -> VirtualAddress {
        VirtualAddress::new(self.cr2.get())
    }

    fn paging_enabled(&self) -> bool {
        self.paging.get()
    }

    unsafe fn enable_paging(&self) {
        self.enable_calls.set(self.enable_calls.get() + 1);
        self.paging.set(true);
    }
}

pub type SimPaging = Paging<TestPhys, SimHardware>;

/// Kernel pool `[16, 32)` and process pool `[64, 96)`, both self-managed,
/// so the first free frames are 17 and 65.
pub struct Machine {
    pub paging: SimPaging,
    pub kernel: &'static FramePool,
    pub process: &'static FramePool,
}

pub const KERNEL_FREE: u32 = 15;
pub const PROCESS_FREE: u32 = 31;

impl Machine {
    /// A machine whose paging context is not initialized yet.
    pub fn bare() -> Self {
        let phys = TestPhys::new(16, 80);
        let kernel = leak_pool(&phys, FramePoolConfig::new(16, 16, 0, 0));
        let process = leak_pool(&phys, FramePoolConfig::new(64, 32, 0, 0));
        Self {
            paging: Paging::new(phys, SimHardware::default()),
            kernel,
            process,
        }
    }

    pub fn with_shared_pages(pages: u32) -> Self {
        let machine = Self::bare();
        machine
            .paging
            .init_paging(machine.kernel, machine.process, pages * FRAME_SIZE)
            .expect("first initialization");
        machine
    }

    /// Raise a page fault at `address` with the raw `error_code`.
    pub fn fault(&self, address: u32, error_code: u32) -> Result<FaultResolution, PagingError> {
        self.paging.hardware().cr2.set(address);
        self.paging.try_handle_fault(FaultContext::new(error_code))
    }
}

fn leak_pool(phys: &TestPhys, config: FramePoolConfig) -> &'static FramePool {
    let pool = unsafe { FramePool::new(phys, config) }.expect("valid pool configuration");
    Box::leak(Box::new(pool))
}

/// Not present, write, user mode.
pub const USER_WRITE_NOT_PRESENT: u32 = 0b110;
/// Present, write: a protection violation.
pub const WRITE_PROTECTION: u32 = 0b011;
