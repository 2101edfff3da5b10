//! # Boot-Time Frame Pools
//!
//! Builds the two pools of the [`MemoryLayout`] in the order the kernel needs
//! them:
//!
//! 1. the kernel pool, self-managed;
//! 2. the process pool, whose bitmap is carved out of the kernel pool;
//! 3. the memory hole, marked inaccessible in the process pool.

use crate::frame_pool::{
    FrameAllocError, FramePool, FramePoolConfig, FramePoolError, ReserveError,
    needed_info_frames,
};
use crate::phys_mapper::PhysMapper;
use crate::registry::{FRAME_POOLS, FramePoolRegistry};
use kernel_info::memory::MemoryLayout;
use spin::Once;

static KERNEL_POOL: Once<FramePool> = Once::new();
static PROCESS_POOL: Once<FramePool> = Once::new();

/// The pools built by [`init_frame_pools`].
#[derive(Copy, Clone, Debug)]
pub struct FramePools {
    /// Frames for page directories, page tables and bitmaps.
    pub kernel: &'static FramePool,
    /// Frames backing demand-paged memory.
    pub process: &'static FramePool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BootstrapError {
    #[error("kernel pool: {0}")]
    KernelPool(FramePoolError),
    #[error("no kernel frames for the process pool bitmap: {0}")]
    InfoFrames(#[from] FrameAllocError),
    #[error("process pool: {0}")]
    ProcessPool(FramePoolError),
    #[error("memory hole: {0}")]
    MemoryHole(#[from] ReserveError),
}

/// Build the kernel's frame pools and register them in [`FRAME_POOLS`].
///
/// # Errors
/// A [`BootstrapError`] naming the step that failed. Boot cannot continue.
///
/// # Safety
/// The kernel pool's frames must be mapped by `mapper`, writable and unused.
/// Must be called once.
pub unsafe fn init_frame_pools<M: PhysMapper>(
    mapper: &M,
    layout: &MemoryLayout,
) -> Result<FramePools, BootstrapError> {
    // SAFETY: Forwarded to the caller.
    unsafe { init_frame_pools_in(mapper, layout, &KERNEL_POOL, &PROCESS_POOL, &FRAME_POOLS) }
}

/// [`init_frame_pools`] with explicit storage and registry.
///
/// # Errors
/// See [`init_frame_pools`].
///
/// # Safety
/// See [`init_frame_pools`].
pub unsafe fn init_frame_pools_in<M: PhysMapper>(
    mapper: &M,
    layout: &MemoryLayout,
    kernel_slot: &'static Once<FramePool>,
    process_slot: &'static Once<FramePool>,
    registry: &FramePoolRegistry,
) -> Result<FramePools, BootstrapError> {
    let kernel_config =
        FramePoolConfig::self_managed(layout.kernel_pool.start, layout.kernel_pool.count);
    // SAFETY: The caller guarantees the kernel pool's frames are ours.
    let kernel = unsafe { FramePool::install(kernel_slot, registry, mapper, kernel_config) }
        .map_err(BootstrapError::KernelPool)?;

    let info_frame_count = needed_info_frames(layout.process_pool.count);
    let info_frame_no = kernel.get_frames(info_frame_count)?;

    let process_config = FramePoolConfig::with_info_frames(
        layout.process_pool.start,
        layout.process_pool.count,
        info_frame_no,
        info_frame_count,
    );
    // SAFETY: The info frames were just allocated from the kernel pool.
    let process = unsafe { FramePool::install(process_slot, registry, mapper, process_config) }
        .map_err(BootstrapError::ProcessPool)?;

    process.try_mark_inaccessible(layout.memory_hole.start, layout.memory_hole.count)?;

    Ok(FramePools { kernel, process })
}
