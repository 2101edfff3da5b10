//! # Page Faults
//!
//! The error code the processor pushes for a page fault (#PF, vector 14),
//! and what the demand pager made of it.

use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

/// Interrupt vector of the page fault exception.
pub const PAGE_FAULT_VECTOR: usize = 0x0E; // 14

/// Page-fault error code layout (IA-32).
///
/// Each bit describes the condition that caused the page fault.
/// Reference: Intel SDM Vol. 3A, §6.15 "Page-Fault Exception (#PF)".
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read or execute.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor (CPL 0–2).
    /// 1 = user mode (CPL 3).
    pub user: bool, // bit 2

    /// 1 = caused by reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch (execute access).
    pub instruction_fetch: bool, // bit 4

    /// 1 = protection-key violation (if CR4.PKE=1).
    pub protection_key: bool, // bit 5

    /// 1 = shadow stack access (if CET-SS enabled).
    pub shadow_stack: bool, // bit 6

    #[bits(25)]
    __: u32, // reserved / ignored bits
}

impl PageFaultError {
    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if !self.present() {
            if self.reserved_bit() {
                "Reserved bit set in a paging structure"
            } else {
                "Non-present page (page not mapped or swapped out)"
            }
        } else if self.instruction_fetch() {
            if self.user() {
                "User-mode instruction fetch on protected page (likely NX or SMEP)"
            } else {
                "Kernel instruction fetch on protected page"
            }
        } else if self.write() {
            "Write access to protected page"
        } else {
            "Read access to protected page"
        }
    }

    /// Whether the demand pager can resolve this fault by mapping a frame.
    ///
    /// Only accesses to non-present pages qualify; protection and
    /// reserved-bit violations cannot be fixed by backing the page.
    #[inline]
    #[must_use]
    pub const fn is_demand_fault(&self) -> bool {
        !self.present() && !self.reserved_bit()
    }
}

/// What the trap dispatcher knows about a page fault.
///
/// The faulting address is not part of the context: it is read from CR2
/// through [`PagingHardware::read_fault_address`](crate::PagingHardware::read_fault_address).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaultContext {
    pub error_code: PageFaultError,
}

impl FaultContext {
    /// Wrap the raw error code pushed by the processor.
    #[inline]
    #[must_use]
    pub const fn new(error_code: u32) -> Self {
        Self {
            error_code: PageFaultError::from_bits(error_code),
        }
    }
}

/// Outcome of a handled page fault.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultResolution {
    /// A process-pool frame now backs the faulting page.
    Mapped {
        address: VirtualAddress,
        /// Frame backing the page.
        frame: FrameNumber,
        /// Kernel-pool frame of the page table created for this fault, if any.
        new_table: Option<FrameNumber>,
    },
    /// The page was already mapped when the fault was handled; nothing was allocated.
    Spurious { address: VirtualAddress },
}

impl FaultResolution {
    /// The faulting address.
    #[must_use]
    pub const fn address(&self) -> VirtualAddress {
        match *self {
            Self::Mapped { address, .. } | Self::Spurious { address } => address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_codes() {
        let not_present_write = FaultContext::new(0b110).error_code;
        assert!(!not_present_write.present());
        assert!(not_present_write.write());
        assert!(not_present_write.user());
        assert!(not_present_write.is_demand_fault());
        assert_eq!(
            not_present_write.explain(),
            "Non-present page (page not mapped or swapped out)"
        );

        let protection = PageFaultError::from_bits(0b011);
        assert!(!protection.is_demand_fault());
        assert_eq!(protection.explain(), "Write access to protected page");

        let reserved = PageFaultError::from_bits(0b1000);
        assert!(!reserved.is_demand_fault());
        assert_eq!(reserved.explain(), "Reserved bit set in a paging structure");
    }

    #[test]
    fn kernel_fetch_is_explained() {
        let fetch = PageFaultError::new()
            .with_present(true)
            .with_instruction_fetch(true);
        assert_eq!(fetch.explain(), "Kernel instruction fetch on protected page");
    }
}
