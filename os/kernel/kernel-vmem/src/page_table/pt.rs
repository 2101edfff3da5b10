//! # IA-32 Page Table (PT)
//!
//! This module models the lowest paging level of 32-bit (non-PAE) paging.
//!
//! - [`TableIndex`]: index type for VA bits `[21:12]`.
//! - [`PtEntry`]: a PT entry (PTE) mapping one 4 KiB page.
//! - [`PageTable`]: a 4 KiB-aligned array of 1024 PTEs.
//!
//! ## Semantics
//!
//! - A page table does **not** point to another table. Every present entry maps a 4 KiB page.
//! - The base address stored in a PTE is a frame number, so it is 4 KiB-aligned by construction.
//!
//! ## Invariants & Notes
//!
//! - [`PageTable`] is 4 KiB-aligned and contains exactly 1024 entries.
//! - [`PtEntry::make_page`] forces `present=1`.
//! - After modifying active mappings, the caller must perform any required TLB maintenance.

use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

use crate::page_table::ENTRIES_PER_TABLE;

/// Index into the Page Table (derived from VA bits `[21:12]`).
///
/// Strongly typed to avoid mixing with [`DirectoryIndex`](crate::page_table::pd::DirectoryIndex).
/// Range is `0..1024` (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

/// A single Page Table entry (PTE), 32-bit paging.
///
/// | Bits   | Field |
/// |--------|-------|
/// | 0      | `P` present |
/// | 1      | `RW` writable |
/// | 2      | `US` user accessible |
/// | 3      | `PWT` write-through |
/// | 4      | `PCD` cache disable |
/// | 5      | `A` accessed |
/// | 6      | `D` dirty |
/// | 7      | `PAT` |
/// | 8      | `G` global |
/// | 9–11   | available to the OS |
/// | 12–31  | page frame number |
#[doc(alias = "PTE")]
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PtEntry {
    /// Present (bit 0).
    pub present: bool,
    /// Writable (bit 1).
    pub writable: bool,
    /// User (bit 2).
    pub user: bool,
    /// Write-Through (bit 3).
    pub write_through: bool,
    /// Cache Disable (bit 4).
    pub cache_disable: bool,
    /// Accessed (bit 5), set by the processor.
    pub accessed: bool,
    /// Dirty (bit 6), set by the processor on write.
    pub dirty: bool,
    /// Page Attribute Table index bit (bit 7).
    pub pat: bool,
    /// Global (bit 8); only honored with CR4.PGE.
    pub global: bool,
    /// Bits 9–11: available to the OS.
    #[bits(3)]
    pub available: u8,
    /// Bits 12–31: frame number of the mapped page.
    #[bits(20)]
    page_frame: u32,
}

/// The Page Table: 1024 entries, 4 KiB-aligned.
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; ENTRIES_PER_TABLE],
}

impl TableIndex {
    /// Build an index from a virtual address (extracts bits `[21:12]`).
    ///
    /// Returns a value in `0..1024`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    /// Construct from a raw `u16`.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < ENTRIES_PER_TABLE);
        Self(v)
    }

    /// Return the index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl PtEntry {
    /// Create a zero (non-present) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// Create a present leaf entry for `page`.
    ///
    /// Sets `present=1` and writes the page frame number; `writable` and
    /// `user` are taken as given.
    #[inline]
    #[must_use]
    pub const fn make_page(page: FrameNumber, writable: bool, user: bool) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(writable)
            .with_user(user)
            .with_page_frame(page.as_u32())
    }

    /// Return `true` if the entry is marked present.
    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.present()
    }

    /// If present, return the mapped frame.
    #[inline]
    #[must_use]
    pub const fn page(self) -> Option<FrameNumber> {
        if self.is_present() {
            Some(FrameNumber::new(self.page_frame()))
        } else {
            None
        }
    }

    /// Return the raw 32-bit value (flags + address).
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.into_bits()
    }

    /// Construct from a raw 32-bit value.
    ///
    /// No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self::from_bits(v)
    }
}

impl PageTable {
    /// Create a fully zeroed Page Table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    ///
    /// Plain load; does not imply any TLB synchronization.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PtEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`.
    ///
    /// Caller must handle any required TLB invalidation when changing active mappings.
    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive the PT index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> TableIndex {
        TableIndex::from(va)
    }

    /// All entries in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = PtEntry> + '_ {
        self.entries.iter().copied()
    }
}
