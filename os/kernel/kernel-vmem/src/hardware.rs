//! # Paging Hardware
//!
//! The handful of control-register accesses paging needs, behind a trait so
//! that page-table logic never issues privileged instructions itself.

use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Access to the active page directory, the fault address and the paging switch.
pub trait PagingHardware {
    /// Make the page directory at `directory` the active one (CR3 store).
    ///
    /// # Safety
    /// `directory` must hold a valid page directory. Once paging is enabled,
    /// the code and data in use must be mapped by it.
    unsafe fn write_page_directory(&self, directory: PhysicalAddress);

    /// Physical base of the active page directory (CR3 load).
    fn read_page_directory(&self) -> PhysicalAddress;

    /// Address of the most recent page fault (CR2 load).
    fn read_fault_address(&self) -> VirtualAddress;

    /// Whether address translation is on (CR0.PG).
    fn paging_enabled(&self) -> bool;

    /// Turn address translation on (set CR0.PG).
    ///
    /// # Safety
    /// A valid page directory must be active and must identity-map the code
    /// that executes this call.
    unsafe fn enable_paging(&self);
}

#[cfg(target_arch = "x86")]
pub use x86::X86Paging;

#[cfg(target_arch = "x86")]
mod x86 {
    use super::PagingHardware;
    use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
    use kernel_registers::cr0::Cr0;
    use kernel_registers::cr2::Cr2;
    use kernel_registers::cr3::Cr3;
    use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

    /// [`PagingHardware`] backed by the real control registers.
    #[derive(Debug)]
    pub struct X86Paging {
        _ring0: (),
    }

    impl X86Paging {
        /// # Safety
        /// Every method of the returned value executes privileged
        /// instructions; it must only be used at CPL 0.
        #[must_use]
        pub const unsafe fn new() -> Self {
            Self { _ring0: () }
        }
    }

    impl PagingHardware for X86Paging {
        unsafe fn write_page_directory(&self, directory: PhysicalAddress) {
            let cr3 = Cr3::from_directory_phys(directory, false, false);
            // SAFETY: Upheld by the caller.
            unsafe { cr3.store_unsafe() }
        }

        fn read_page_directory(&self) -> PhysicalAddress {
            // SAFETY: `X86Paging` only exists at CPL 0.
            unsafe { Cr3::load_unsafe() }.directory_phys()
        }

        fn read_fault_address(&self) -> VirtualAddress {
            // SAFETY: `X86Paging` only exists at CPL 0.
            unsafe { Cr2::load_unsafe() }.fault_address()
        }

        fn paging_enabled(&self) -> bool {
            // SAFETY: `X86Paging` only exists at CPL 0.
            unsafe { Cr0::load_unsafe() }.pg_paging()
        }

        unsafe fn enable_paging(&self) {
            // SAFETY: Upheld by the caller.
            unsafe {
                let cr0 = Cr0::load_unsafe();
                cr0.with_pg_paging(true).store_unsafe();
            }
        }
    }
}
