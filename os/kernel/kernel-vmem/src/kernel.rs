//! # Kernel Paging Instance
//!
//! The process-wide [`Paging`] context of the running kernel and the entry
//! point the page fault trap dispatches to.

use kernel_alloc::{FramePools, IdentityPhysMapper};
use kernel_info::memory::MemoryLayout;

use crate::fault::FaultContext;
use crate::hardware::X86Paging;
use crate::paging::{Paging, PagingError};

/// Paging of the running kernel. Frame pools lie in the identity-mapped
/// shared region, so physical memory is reached directly.
// SAFETY: The kernel runs at CPL 0.
pub static KERNEL_PAGING: Paging<IdentityPhysMapper, X86Paging> =
    Paging::new(IdentityPhysMapper, unsafe { X86Paging::new() });

/// Initialize [`KERNEL_PAGING`] from the boot-time frame pools.
///
/// # Errors
/// See [`Paging::init_paging`].
pub fn init_kernel_paging(pools: &FramePools, layout: &MemoryLayout) -> Result<(), PagingError> {
    KERNEL_PAGING.init_paging(pools.kernel, pools.process, layout.shared_size)
}

/// Called by the page fault stub with the error code the processor pushed.
#[unsafe(no_mangle)]
pub extern "C" fn handle_page_fault(error_code: u32) {
    KERNEL_PAGING.handle_fault(FaultContext::new(error_code));
}
