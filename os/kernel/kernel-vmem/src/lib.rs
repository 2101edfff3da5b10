//! # Virtual Memory Support
//!
//! Demand-paged, two-level IA-32 (non-PAE) paging for the kernel.
//!
//! ## What you get
//! - A [`Paging`] context: the frame pools, the shared-region size, the
//!   loaded page directory and the paging switch.
//! - An [`AddressSpace`] per page directory, with the shared region
//!   identity-mapped and everything else backed on first access.
//! - Typed [`PageDirectory`]/[`PageTable`] entries.
//! - A [`PagingHardware`] seam over CR0, CR2 and CR3.
//! - Page fault decoding ([`PageFaultError`]).
//!
//! ## IA-32 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses the two upper fields as **indices** into two levels of
//! tables, each containing 1024 (2¹⁰) entries of 4 bytes.
//!
//! ```text
//!  CR3 → PD  →  PT  →  Physical Page
//!         │      │
//!         │      └───► PTE (Page Table Entry)     → maps a 4 KiB page
//!         └──────────► PDE (Page Directory Entry) → points to a PT
//! ```
//!
//! | Level | Table name | Entry name | Description |
//! |:------|:-----------|:-----------|:------------|
//! | 1 | **PD** (Page Directory) | **PDE** | One per address space, referenced by CR3. Each entry covers 4 MiB. |
//! | 2 | **PT** (Page Table) | **PTE** | Each entry maps a 4 KiB physical page. |
//!
//! One directory thus spans the full 4 GiB address space.
//!
//! ## Demand paging
//!
//! Only the shared region (the bottom of memory, at most one table's worth)
//! is mapped up front. Any other access raises a not-present page fault;
//! [`Paging::handle_fault`] then creates the missing page table from the
//! kernel pool if needed and backs the page with a frame from the process
//! pool.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
pub mod fault;
pub mod hardware;
#[cfg(target_arch = "x86")]
pub mod kernel;
pub mod page_table;
pub mod paging;

pub use crate::address_space::AddressSpace;
pub use crate::fault::{FaultContext, FaultResolution, PageFaultError};
#[cfg(target_arch = "x86")]
pub use crate::hardware::X86Paging;
pub use crate::hardware::PagingHardware;
#[cfg(target_arch = "x86")]
pub use crate::kernel::{KERNEL_PAGING, handle_page_fault, init_kernel_paging};
pub use crate::page_table::pd::{DirectoryIndex, PageDirectory, PdEntry};
pub use crate::page_table::pt::{PageTable, PtEntry, TableIndex};
pub use crate::paging::{Paging, PagingConfig, PagingError};

/// Re-export constants as info module.
pub use kernel_info::memory as info;
