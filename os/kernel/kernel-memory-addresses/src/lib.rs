//! # Physical and Virtual Memory Address Types (IA-32)
//!
//! Strongly typed wrappers for raw 32-bit addresses and physical frame numbers
//! used by the frame allocator and the two-level paging code.
//!
//! ## Overview
//!
//! The types prevent mixing virtual addresses, physical addresses and frame
//! numbers at compile time while remaining zero-cost wrappers around `u32`.
//!
//! | Type | Meaning |
//! |----------|----------|
//! | [`FrameNumber`] | Index of a 4 KiB physical frame (`address >> 12`). |
//! | [`PhysicalAddress`] | A byte address in physical memory. |
//! | [`VirtualAddress`] | A byte address translated by the page tables. |
//!
//! ## Frames
//!
//! Physical memory is handed out in frames of [`FRAME_SIZE`] bytes. A frame is
//! identified only by its number; the byte address of its first byte is
//! `frame << FRAME_SHIFT`.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0020_1234);
//! let frame = pa.frame();
//! assert_eq!(frame, FrameNumber::new(0x201));
//! assert_eq!(frame.base().as_u32() + pa.frame_offset(), pa.as_u32());
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`.
//! - All conversions are `const fn`.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod frame_number;
mod physical_address;
mod virtual_address;

pub use frame_number::FrameNumber;
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// Size of a physical frame (and of a virtual page) in bytes.
pub const FRAME_SIZE: u32 = 4096;

/// log2([`FRAME_SIZE`]), i.e. the number of in-frame offset bits.
pub const FRAME_SHIFT: u32 = 12;

const _: () = assert!(1 << FRAME_SHIFT == FRAME_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_and_address_agree() {
        let pa = PhysicalAddress::new(0x0040_2ABC);
        assert_eq!(pa.frame(), FrameNumber::new(0x402));
        assert_eq!(pa.frame_offset(), 0xABC);
        assert_eq!(pa.frame().base(), PhysicalAddress::new(0x0040_2000));
    }

    #[test]
    fn virtual_page_alignment() {
        let va = VirtualAddress::new(0x0040_1FFF);
        assert_eq!(va.page_base(), VirtualAddress::new(0x0040_1000));
        assert_eq!(va.page_offset(), 0xFFF);
        assert!(!va.is_page_aligned());
        assert!(va.page_base().is_page_aligned());
    }

    #[test]
    fn frame_arithmetic() {
        let f = FrameNumber::new(100);
        assert_eq!(f + 5, FrameNumber::new(105));
        assert_eq!((f + 5).offset_from(f), Some(5));
        assert_eq!(f.offset_from(f + 1), None);
        assert_eq!(FrameNumber::new(u32::MAX).checked_add(1), None);
    }
}
