//! # Physical Frame Allocation
//!
//! Contiguous physical-frame allocation for the 32-bit kernel.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Frame Pool Registry (FRAME_POOLS)        │
//! │    • every constructed pool, in insertion order     │
//! │    • release_frames(frame) → owning pool            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  Frame Pool                         │
//! │    • fixed, contiguous range of frames              │
//! │    • first-fit runs, inaccessible ranges            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │          Two-bit state bitmap (in frames)           │
//! │    • four frames per byte                           │
//! │    • reached through a PhysMapper                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! - [`frame_state`]: the four frame states and their packing.
//! - [`frame_pool`]: [`FramePool`], [`needed_info_frames`] and the error types.
//! - [`registry`]: [`FramePoolRegistry`], [`FRAME_POOLS`] and [`release_frames`].
//! - [`phys_mapper`]: [`PhysMapper`], [`IdentityPhysMapper`].
//! - [`bootstrap`]: building the kernel and process pools of a
//!   [`MemoryLayout`](kernel_info::memory::MemoryLayout).
//!
//! ## Error Model
//!
//! Exhaustion and fragmentation are ordinary results
//! ([`FrameAllocError`]); the caller decides. Misuse (reserving occupied
//! frames, releasing a frame that does not head a run, releasing a frame no
//! pool owns) is a kernel bug: the plain operations panic, and `try_`
//! variants report the error without touching any state.
//!
//! ## Concurrency
//!
//! Each pool's bitmap and free count sit behind a [`spin::Mutex`], as does the
//! registry. No lock is held while another component's lock is taken.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bitmap;
pub mod bootstrap;
pub mod frame_pool;
pub mod frame_state;
pub mod phys_mapper;
pub mod registry;

pub use bootstrap::{BootstrapError, FramePools, init_frame_pools, init_frame_pools_in};
pub use frame_pool::{
    FrameAllocError, FramePool, FramePoolConfig, FramePoolError, ReleaseError, ReserveError,
    needed_info_frames,
};
pub use frame_state::FrameState;
pub use phys_mapper::{IdentityPhysMapper, PhysMapper};
pub use registry::{FRAME_POOLS, FramePoolRegistry, MAX_FRAME_POOLS, release_frames};
