//! # Physical Memory Access
//!
//! Frame-pool bitmaps and page tables live in physical frames, but code can
//! only dereference addresses of the current address space. A [`PhysMapper`]
//! converts a physical address into a pointer that is valid right now.
//!
//! The kernel uses [`IdentityPhysMapper`]: its frame pools lie within the
//! shared region that every address space identity-maps, so a physical
//! address is also a valid virtual address before and after paging is
//! enabled. Hosted tests substitute a mapper over simulated RAM.
//!
//! ## Example
//! ```rust
//! use kernel_alloc::{IdentityPhysMapper, PhysMapper};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let ptr = IdentityPhysMapper.phys_to_ptr(PhysicalAddress::new(0x0020_0000));
//! assert_eq!(ptr.addr(), 0x0020_0000);
//! ```

use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, PhysicalAddress};

/// Converts physical addresses into pointers of the current address space.
pub trait PhysMapper {
    /// Pointer to the byte at `pa`.
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;

    /// Reinterpret the memory at `pa` as a `T`.
    ///
    /// # Safety
    /// - `pa` must be mapped, writable and suitably aligned for `T`.
    /// - The memory must hold a valid `T` and must not be aliased for `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        // SAFETY: Upheld by the caller.
        unsafe { &mut *self.phys_to_ptr(pa).cast::<T>() }
    }

    /// Shared view of the memory at `pa` as a `T`.
    ///
    /// # Safety
    /// - `pa` must be mapped and suitably aligned for `T`.
    /// - The memory must hold a valid `T` and must not be mutated for `'a`.
    #[inline]
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T {
        // SAFETY: Upheld by the caller.
        unsafe { &*self.phys_to_ptr(pa).cast::<T>() }
    }

    /// The bytes of `count` consecutive frames starting at `first`.
    ///
    /// # Safety
    /// - All frames must be mapped, writable and physically and virtually contiguous.
    /// - The bytes must not be accessed through any other path for `'a`.
    #[inline]
    unsafe fn frames_to_bytes<'a>(&self, first: FrameNumber, count: u32) -> &'a mut [u8] {
        let len = (count * FRAME_SIZE) as usize;
        // SAFETY: Upheld by the caller.
        unsafe { core::slice::from_raw_parts_mut(self.phys_to_ptr(first.base()), len) }
    }
}

/// [`PhysMapper`] for memory that is identity mapped (or accessed before paging).
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityPhysMapper;

impl PhysMapper for IdentityPhysMapper {
    #[inline]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        core::ptr::with_exposed_provenance_mut(pa.as_u32() as usize)
    }
}
