//! # Address Space (IA-32, two-level)
//!
//! One virtual address space: a page directory plus the page tables it
//! points to, all taken from the kernel frame pool of a [`Paging`] context.
//!
//! ## Layout of a fresh address space
//!
//! ```text
//!  directory[0]      ─► table 0: pages 0..shared identity-mapped (P|RW), rest not present
//!  directory[1..1024] : not present, RW; tables are created on the first fault
//! ```
//!
//! ## Highlights
//!
//! - [`AddressSpace::new`] builds the directory and the shared table.
//! - [`AddressSpace::load`] makes it the active one.
//! - [`AddressSpace::translate`] resolves a VA through the tables.
//! - Page faults in the active space are resolved by
//!   [`Paging::handle_fault`](crate::Paging::handle_fault).
//!
//! ## Safety
//!
//! - Directory and table frames must be reachable through the context's
//!   [`PhysMapper`] for as long as the address space is in use.
//! - Address spaces are never torn down; their frames stay allocated.

use kernel_alloc::PhysMapper;
use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, PhysicalAddress, VirtualAddress};
use log::{debug, info, warn};

use crate::fault::FaultResolution;
use crate::hardware::PagingHardware;
use crate::page_table::pd::{DirectoryIndex, PageDirectory, PdEntry};
use crate::page_table::pt::{PageTable, PtEntry};
use crate::page_table::split_indices;
use crate::paging::{Paging, PagingConfig, PagingError};

/// Handle to a single, concrete address space.
pub struct AddressSpace<'p, M, H> {
    paging: &'p Paging<M, H>,
    directory: FrameNumber,
}

impl<'p, M: PhysMapper, H: PagingHardware> AddressSpace<'p, M, H> {
    /// Build a new address space.
    ///
    /// Takes two frames from the kernel pool: the page directory and the page
    /// table for the shared region. Both are zeroed before use.
    ///
    /// # Errors
    /// - [`PagingError::NotInitialized`] before [`Paging::init_paging`]. This is
    ///   an ordering bug in the boot path; callers must treat it as fatal.
    /// - [`PagingError::OutOfFrames`] if the kernel pool cannot supply both
    ///   frames; nothing stays allocated in that case.
    pub fn new(paging: &'p Paging<M, H>) -> Result<Self, PagingError> {
        let config = paging.config()?;
        let kernel_pool = config.kernel_pool;

        let directory = kernel_pool.get_frame()?;
        let table = match kernel_pool.get_frame() {
            Ok(table) => table,
            Err(err) => {
                let released = kernel_pool.release(directory);
                debug_assert_eq!(released, Ok(1));
                return Err(err.into());
            }
        };

        // SAFETY: Both frames were just allocated; nothing else refers to them.
        let pt = unsafe { paging.table_mut(table) };
        *pt = PageTable::zeroed();
        for page in 0..config.shared_pages() {
            let va = VirtualAddress::new(page * FRAME_SIZE);
            pt.set(
                PageTable::index_of(va),
                PtEntry::make_page(FrameNumber::new(page), true, false),
            );
        }

        // SAFETY: As above.
        let pd = unsafe { paging.directory_mut(directory) };
        pd.fill(PdEntry::not_present_writable());
        pd.set(DirectoryIndex::new(0), PdEntry::make_table(table));

        info!(
            "Address space created: directory {directory}, shared table {table}, {} shared pages",
            config.shared_pages()
        );
        Ok(Self { paging, directory })
    }

    /// View an existing directory.
    pub(crate) const fn from_directory(paging: &'p Paging<M, H>, directory: FrameNumber) -> Self {
        Self { paging, directory }
    }

    /// Frame of the page directory.
    #[inline]
    #[must_use]
    pub const fn directory_frame(&self) -> FrameNumber {
        self.directory
    }

    /// Whether this is the most recently loaded address space.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.paging.current_directory() == Some(self.directory)
    }

    /// Make this the active address space (writes CR3).
    ///
    /// # Safety
    /// If paging is enabled, the code, stack and data in use must be mapped
    /// identically in this address space. The shared region is.
    pub unsafe fn load(&self) {
        // SAFETY: Upheld by the caller.
        unsafe { self.paging.activate(self.directory) };
    }

    /// The directory entry at `index`.
    #[must_use]
    pub fn directory_entry(&self, index: DirectoryIndex) -> PdEntry {
        self.directory().get(index)
    }

    /// The page table entry for `va`, or `None` if no table covers it yet.
    #[must_use]
    pub fn table_entry(&self, va: VirtualAddress) -> Option<PtEntry> {
        let (dir_index, table_index) = split_indices(va);
        let table = self.directory().get(dir_index).table()?;
        // SAFETY: Present directory entries only point at tables this space allocated.
        let pt = unsafe { self.paging.table_ref(table) };
        Some(pt.get(table_index))
    }

    /// Translate `va` to the physical address it maps to.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let page = self.table_entry(va)?.page()?;
        Some(page.base() + va.page_offset())
    }

    fn directory(&self) -> &PageDirectory {
        // SAFETY: The directory frame belongs to this space and is only
        // written while a fault is handled or during construction.
        unsafe { self.paging.directory_ref(self.directory) }
    }

    /// Back the page at `address` with a process-pool frame.
    ///
    /// All-or-nothing: if the leaf frame cannot be allocated, a page table
    /// created for this fault is unlinked and returned to the kernel pool.
    pub(crate) fn map_on_demand(
        &self,
        config: &PagingConfig,
        address: VirtualAddress,
    ) -> Result<FaultResolution, PagingError> {
        let (dir_index, table_index) = split_indices(address);
        // SAFETY: The directory frame belongs to this space; the fault handler
        // is not reentrant.
        let pd = unsafe { self.paging.directory_mut(self.directory) };
        let previous = pd.get(dir_index);

        let (table, new_table) = if let Some(table) = previous.table() {
            (table, None)
        } else {
            let table = config.kernel_pool.get_frame()?;
            // SAFETY: Freshly allocated; nothing else refers to it.
            unsafe { *self.paging.table_mut(table) = PageTable::zeroed() };
            pd.set(dir_index, PdEntry::make_table(table));
            debug!("New page table {table} for {}", dir_index.base());
            (table, Some(table))
        };

        // SAFETY: Present directory entries only point at tables this space allocated.
        let pt = unsafe { self.paging.table_mut(table) };
        if pt.get(table_index).is_present() {
            warn!("Spurious page fault at {address}: page is already mapped");
            return Ok(FaultResolution::Spurious { address });
        }

        let frame = match config.process_pool.get_frame() {
            Ok(frame) => frame,
            Err(err) => {
                if let Some(table) = new_table {
                    pd.set(dir_index, previous);
                    let released = config.kernel_pool.release(table);
                    debug_assert_eq!(released, Ok(1));
                }
                return Err(err.into());
            }
        };

        // Not-present entries are never cached, so no invalidation is needed.
        pt.set(table_index, PtEntry::make_page(frame, true, true));
        debug!("Mapped {} to {frame}", address.page_base());

        Ok(FaultResolution::Mapped {
            address,
            frame,
            new_table,
        })
    }
}
