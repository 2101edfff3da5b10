//! # Typed IA-32 Control Registers
//!
//! Bitfield models of the control registers involved in two-level paging:
//!
//! | Register | Role |
//! |---|---|
//! | [`Cr0`](cr0::Cr0) | `PG` turns address translation on. |
//! | [`Cr2`](cr2::Cr2) | Linear address of the most recent page fault. |
//! | [`Cr3`](cr3::Cr3) | Physical base of the active page directory. |
//!
//! The register models are plain data and usable on any host. Loading and
//! storing the real registers is only compiled with the `asm` feature on
//! `target_arch = "x86"`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr0")]
pub mod cr0;

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}
