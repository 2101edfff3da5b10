//! # Paging Context
//!
//! [`Paging`] holds everything that is process-wide about paging: how
//! physical memory is reached, the control registers, the frame pools page
//! tables and pages come from, the size of the shared region, which page
//! directory is loaded and whether translation is on.
//!
//! ## Lifecycle
//!
//! ```text
//! Paging::new ─► init_paging ─► AddressSpace::new ─► load ─► enable_paging
//!                                                              │
//!                                   page fault ─► handle_fault ◄┘
//! ```
//!
//! [`Paging::init_paging`] must run exactly once before any
//! [`AddressSpace`] is built. The configuration is read-only afterwards.

use kernel_alloc::{FrameAllocError, FramePool, PhysMapper};
use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, VirtualAddress};
use log::{error, info, warn};
use spin::{Mutex, Once};

use crate::address_space::AddressSpace;
use crate::fault::{FaultContext, FaultResolution, PageFaultError};
use crate::hardware::PagingHardware;
use crate::page_table::TABLE_SPAN;
use crate::page_table::pd::PageDirectory;
use crate::page_table::pt::PageTable;

/// Settings fixed by [`Paging::init_paging`].
#[derive(Copy, Clone, Debug)]
pub struct PagingConfig {
    /// Pool for page directories and page tables.
    pub kernel_pool: &'static FramePool,
    /// Pool for pages mapped on demand.
    pub process_pool: &'static FramePool,
    /// Bytes at the bottom of memory identity-mapped into every address space.
    pub shared_size: u32,
}

impl PagingConfig {
    /// Number of whole pages in the shared region.
    #[inline]
    #[must_use]
    pub const fn shared_pages(&self) -> u32 {
        self.shared_size / FRAME_SIZE
    }
}

#[derive(Debug, thiserror::Error, Copy, Clone, Eq, PartialEq)]
pub enum PagingError {
    #[error("paging is already initialized")]
    AlreadyInitialized,
    #[error("shared region of {size:#x} bytes exceeds one page table ({max:#x} bytes)")]
    SharedRegionTooLarge { size: u32, max: u32 },
    #[error("paging is not initialized")]
    NotInitialized,
    #[error("no page directory is loaded")]
    NoActiveTable,
    #[error("unhandled page fault at {address}: {}", .error_code.explain())]
    UnhandledFault {
        address: VirtualAddress,
        error_code: PageFaultError,
    },
    #[error("out of frames: {0}")]
    OutOfFrames(#[from] FrameAllocError),
}

struct PagingState {
    current_directory: Option<FrameNumber>,
    enabled: bool,
}

/// Process-wide paging state over a [`PhysMapper`] and a [`PagingHardware`].
pub struct Paging<M, H> {
    mapper: M,
    hardware: H,
    config: Once<PagingConfig>,
    state: Mutex<PagingState>,
}

impl<M: PhysMapper, H: PagingHardware> Paging<M, H> {
    #[must_use]
    pub const fn new(mapper: M, hardware: H) -> Self {
        Self {
            mapper,
            hardware,
            config: Once::new(),
            state: Mutex::new(PagingState {
                current_directory: None,
                enabled: false,
            }),
        }
    }

    /// Record the frame pools and the shared-region size.
    ///
    /// # Errors
    /// - [`PagingError::AlreadyInitialized`] on any call after the first successful one.
    /// - [`PagingError::SharedRegionTooLarge`] if `shared_size` exceeds what
    ///   the first page table can map.
    pub fn init_paging(
        &self,
        kernel_pool: &'static FramePool,
        process_pool: &'static FramePool,
        shared_size: u32,
    ) -> Result<(), PagingError> {
        if shared_size > TABLE_SPAN {
            return Err(PagingError::SharedRegionTooLarge {
                size: shared_size,
                max: TABLE_SPAN,
            });
        }

        let mut installed = false;
        self.config.call_once(|| {
            installed = true;
            PagingConfig {
                kernel_pool,
                process_pool,
                shared_size,
            }
        });
        if !installed {
            return Err(PagingError::AlreadyInitialized);
        }

        info!(
            "Paging initialized: page tables from {kernel_pool:?}, pages from {process_pool:?}, {shared_size:#x} shared bytes"
        );
        Ok(())
    }

    /// The configuration recorded by [`init_paging`](Self::init_paging).
    ///
    /// # Errors
    /// [`PagingError::NotInitialized`] before initialization.
    pub fn config(&self) -> Result<&PagingConfig, PagingError> {
        self.config.get().ok_or(PagingError::NotInitialized)
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config.is_completed()
    }

    /// Frame of the most recently loaded page directory.
    #[must_use]
    pub fn current_directory(&self) -> Option<FrameNumber> {
        self.state.lock().current_directory
    }

    #[must_use]
    pub fn is_paging_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    #[inline]
    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    #[inline]
    #[must_use]
    pub const fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Turn address translation on.
    ///
    /// Calling this again, or when the hardware already translates, only logs.
    ///
    /// # Errors
    /// [`PagingError::NoActiveTable`] if no page directory was loaded.
    ///
    /// # Safety
    /// The loaded page directory must map the code, stack and data in use,
    /// which the shared identity mapping does for the kernel.
    pub unsafe fn enable_paging(&self) -> Result<(), PagingError> {
        let mut state = self.state.lock();
        if state.current_directory.is_none() {
            return Err(PagingError::NoActiveTable);
        }

        if state.enabled || self.hardware.paging_enabled() {
            warn!("Paging is already enabled");
            state.enabled = true;
            return Ok(());
        }

        // SAFETY: A directory is loaded; its mappings are upheld by the caller.
        unsafe { self.hardware.enable_paging() };
        state.enabled = true;
        info!("Paging enabled");
        Ok(())
    }

    /// Make `directory` the active page directory.
    ///
    /// # Safety
    /// See [`AddressSpace::load`].
    pub(crate) unsafe fn activate(&self, directory: FrameNumber) {
        let mut state = self.state.lock();
        // SAFETY: Upheld by the caller.
        unsafe { self.hardware.write_page_directory(directory.base()) };
        state.current_directory = Some(directory);
        info!("Loaded page directory at {}", directory.base());
    }

    /// Back the faulting page with a frame from the process pool.
    ///
    /// The faulting address is read from the hardware. If the directory entry
    /// covering it is not present, a page table is first taken from the
    /// kernel pool. Nothing is allocated when the call fails.
    ///
    /// # Errors
    /// - [`PagingError::UnhandledFault`] for protection and reserved-bit violations.
    /// - [`PagingError::NotInitialized`], [`PagingError::NoActiveTable`] when
    ///   paging is not set up.
    /// - [`PagingError::OutOfFrames`] if either pool cannot supply a frame.
    pub fn try_handle_fault(&self, fault: FaultContext) -> Result<FaultResolution, PagingError> {
        let address = self.hardware.read_fault_address();
        let error_code = fault.error_code;
        if !error_code.is_demand_fault() {
            return Err(PagingError::UnhandledFault {
                address,
                error_code,
            });
        }

        let config = self.config()?;
        let directory = self
            .current_directory()
            .ok_or(PagingError::NoActiveTable)?;
        debug_assert_eq!(
            self.hardware.read_page_directory(),
            directory.base(),
            "active page directory changed behind our back"
        );

        AddressSpace::from_directory(self, directory).map_on_demand(config, address)
    }

    /// Page fault entry point.
    ///
    /// # Panics
    /// On every error of [`try_handle_fault`](Self::try_handle_fault); the
    /// faulting access cannot be resumed.
    pub fn handle_fault(&self, fault: FaultContext) -> FaultResolution {
        match self.try_handle_fault(fault) {
            Ok(resolution) => resolution,
            Err(err) => {
                error!(
                    "Page fault {:#?} ({})",
                    fault.error_code,
                    fault.error_code.explain()
                );
                panic!("cannot handle page fault: {err}");
            }
        }
    }

    /// # Safety
    /// `frame` must hold a page directory that nothing else accesses for `'a`.
    pub(crate) unsafe fn directory_mut<'a>(&self, frame: FrameNumber) -> &'a mut PageDirectory {
        // SAFETY: Upheld by the caller; frames are 4 KiB-aligned.
        unsafe { self.mapper.phys_to_mut(frame.base()) }
    }

    /// # Safety
    /// `frame` must hold a page directory that is not mutated for `'a`.
    pub(crate) unsafe fn directory_ref<'a>(&self, frame: FrameNumber) -> &'a PageDirectory {
        // SAFETY: Upheld by the caller; frames are 4 KiB-aligned.
        unsafe { self.mapper.phys_to_ref(frame.base()) }
    }

    /// # Safety
    /// `frame` must hold a page table that nothing else accesses for `'a`.
    pub(crate) unsafe fn table_mut<'a>(&self, frame: FrameNumber) -> &'a mut PageTable {
        // SAFETY: Upheld by the caller; frames are 4 KiB-aligned.
        unsafe { self.mapper.phys_to_mut(frame.base()) }
    }

    /// # Safety
    /// `frame` must hold a page table that is not mutated for `'a`.
    pub(crate) unsafe fn table_ref<'a>(&self, frame: FrameNumber) -> &'a PageTable {
        // SAFETY: Upheld by the caller; frames are 4 KiB-aligned.
        unsafe { self.mapper.phys_to_ref(frame.base()) }
    }
}
