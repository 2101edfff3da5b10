//! # Kernel Memory Configuration
//!
//! Physical memory layout constants of the 32-bit teaching machine. These are
//! the single source of truth for where the frame pools live and how much
//! memory every address space maps identically.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Low memory, BIOS, kernel image │  shared, identity mapped
//! 0x0020_0000 ├─────────────────────────────────┤  2 MiB
//!             │  Kernel frame pool              │  page directories, page tables,
//!             │                                 │  frame-pool bitmaps
//! 0x0040_0000 ├─────────────────────────────────┤  4 MiB (end of shared region)
//!             │  Process frame pool             │  demand-paged user frames
//! 0x00F0_0000 ├─────────────────────────────────┤  15 MiB
//!             │  Memory hole (inaccessible)     │
//! 0x0100_0000 ├─────────────────────────────────┤  16 MiB
//!             │  Process frame pool (cont.)     │
//! 0x0200_0000 └─────────────────────────────────┘  32 MiB
//! ```
//!
//! The kernel pool lies inside the shared region, so page directories and
//! tables taken from it stay reachable through the identity map after paging
//! is switched on.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod memory;
