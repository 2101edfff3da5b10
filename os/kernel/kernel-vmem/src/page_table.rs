//! # Memory Page Table
//!
//! The two hardware levels of 32-bit paging:
//!
//! - [`pd`]: the page directory, one per address space.
//! - [`pt`]: page tables, each covering [`TABLE_SPAN`] bytes of virtual memory.

pub mod pd;
pub mod pt;

use kernel_memory_addresses::{FRAME_SIZE, VirtualAddress};

use crate::page_table::pd::DirectoryIndex;
use crate::page_table::pt::TableIndex;

/// Entries per directory and per table (ten index bits each).
pub const ENTRIES_PER_TABLE: usize = 1024;

/// Bytes of virtual memory translated by one page table (4 MiB).
pub const TABLE_SPAN: u32 = 1 << 22;

const _: () = assert!(ENTRIES_PER_TABLE * 4 == FRAME_SIZE as usize);
const _: () = assert!(TABLE_SPAN as usize == ENTRIES_PER_TABLE * FRAME_SIZE as usize);

/// Split a virtual address into its directory and table indices.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (DirectoryIndex, TableIndex) {
    (DirectoryIndex::from(va), TableIndex::from(va))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_ok() {
        let (pd, pt) = split_indices(VirtualAddress::new(0x0040_3123));
        assert_eq!(pd.as_usize(), 1);
        assert_eq!(pt.as_usize(), 3);

        let (pd, pt) = split_indices(VirtualAddress::new(0xFFFF_FFFF));
        assert_eq!(pd.as_usize(), ENTRIES_PER_TABLE - 1);
        assert_eq!(pt.as_usize(), ENTRIES_PER_TABLE - 1);
    }

    #[test]
    fn one_table_spans_four_mib() {
        assert_eq!(TABLE_SPAN, 4 * 1024 * 1024);
    }
}
