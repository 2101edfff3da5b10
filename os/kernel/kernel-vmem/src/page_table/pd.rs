//! # IA-32 Page Directory (PD)
//!
//! This module models the top paging level of 32-bit (non-PAE) paging:
//!
//! - [`DirectoryIndex`]: index type for virtual-address bits `[31:22]`.
//! - [`PdEntry`]: a directory entry (PDE) pointing to a 4 KiB page table.
//! - [`PageDirectory`]: a 4 KiB-aligned array of 1024 PDEs, referenced by CR3.
//!
//! ## Semantics
//!
//! - Every present entry points to a page table; 4 MiB pages (`PS=1`) are not
//!   used, so `PS` is always 0.
//! - A not-present entry may still carry `RW=1`. The processor ignores every
//!   other bit of a not-present entry, so this only records that the range is
//!   meant to be backed lazily.
//!
//! ## Invariants & Notes
//!
//! - [`PageDirectory`] is 4 KiB-aligned and contains exactly 1024 entries.
//! - [`PdEntry::make_table`] sets `present=1`, `writable=1` and forces `PS=0`.
//! - TLB maintenance is the caller's responsibility after mutating active mappings.

use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

use crate::page_table::ENTRIES_PER_TABLE;

/// Index into the Page Directory (derived from VA bits `[31:22]`).
///
/// Range is `0..1024` (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u16);

/// A single Page Directory entry (PDE), 32-bit paging.
///
/// | Bits   | Field |
/// |--------|-------|
/// | 0      | `P` present |
/// | 1      | `RW` writable |
/// | 2      | `US` user accessible |
/// | 3      | `PWT` write-through |
/// | 4      | `PCD` cache disable |
/// | 5      | `A` accessed |
/// | 6      | ignored |
/// | 7      | `PS` page size, must be 0 here |
/// | 8      | ignored |
/// | 9–11   | available to the OS |
/// | 12–31  | page table frame number |
#[doc(alias = "PDE")]
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PdEntry {
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
    /// Accessed (bit 5).
    pub accessed: bool,
    /// Bit 6: ignored for directory entries.
    #[bits(1)]
    __ignored_6: u8,
    /// PS (bit 7): 4 MiB pages are not used.
    #[bits(1)]
    __ps_must_be_0: u8,
    /// Bit 8: ignored for directory entries.
    #[bits(1)]
    __ignored_8: u8,
    /// Bits 9–11: available to the OS.
    #[bits(3)]
    pub available: u8,
    /// Bits 12–31: frame number of the page table.
    #[bits(20)]
    table_frame: u32,
}

/// The Page Directory: 1024 entries, 4 KiB-aligned.
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; ENTRIES_PER_TABLE],
}

impl DirectoryIndex {
    /// Build an index from a virtual address (extracts bits `[31:22]`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new((va.as_u32() >> 22) as u16)
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

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// First virtual address translated through this entry.
    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new((self.0 as u32) << 22)
    }
}

impl PdEntry {
    /// Create a zero (non-present) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// A not-present entry with `RW=1`: reserved for a table created on demand.
    #[inline]
    #[must_use]
    pub const fn not_present_writable() -> Self {
        Self::new().with_writable(true)
    }

    /// Create an entry pointing at the page table in `table`.
    ///
    /// Sets `present=1` and `writable=1`; the table's own entries decide
    /// user access.
    #[inline]
    #[must_use]
    pub const fn make_table(table: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_table_frame(table.as_u32())
    }

    /// Return `true` if the entry is marked present.
    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.present()
    }

    /// If present, return the frame holding the page table.
    #[inline]
    #[must_use]
    pub const fn table(self) -> Option<FrameNumber> {
        if self.is_present() {
            Some(FrameNumber::new(self.table_frame()))
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

impl PageDirectory {
    /// Create a fully zeroed Page Directory (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: DirectoryIndex) -> PdEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`.
    ///
    /// Caller must handle any required TLB invalidation when changing active mappings.
    #[inline]
    pub const fn set(&mut self, i: DirectoryIndex, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Overwrite every entry with `e`.
    #[inline]
    pub fn fill(&mut self, e: PdEntry) {
        self.entries.fill(e);
    }

    /// Derive the PD index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> DirectoryIndex {
        DirectoryIndex::from(va)
    }

    /// All entries in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = PdEntry> + '_ {
        self.entries.iter().copied()
    }
}
