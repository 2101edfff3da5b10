//! # Frame Pool Registry
//!
//! Runs are released by frame number alone, without a pool handle. The
//! registry keeps every constructed pool in insertion order and answers
//! "which pool owns frame N". Pool ranges are pairwise disjoint, so the answer
//! is unique.

use crate::frame_pool::{FramePool, FramePoolError, ReleaseError, ranges_overlap};
use kernel_memory_addresses::FrameNumber;
use spin::Mutex;

/// Maximum number of pools a registry can hold.
pub const MAX_FRAME_POOLS: usize = 8;

/// The process-wide registry consulted by [`release_frames`].
pub static FRAME_POOLS: FramePoolRegistry = FramePoolRegistry::new();

/// Release the run headed by `first_frame_no`, whichever registered pool owns it.
///
/// Returns the number of frames freed.
///
/// # Panics
/// If no pool in [`FRAME_POOLS`] owns the frame, or the frame is not the head
/// of an allocated run.
pub fn release_frames(first_frame_no: FrameNumber) -> u32 {
    FRAME_POOLS.release_frames(first_frame_no)
}

/// Append-only, insertion-ordered set of frame pools with disjoint ranges.
pub struct FramePoolRegistry {
    pools: Mutex<Pools>,
}

struct Pools {
    entries: [Option<&'static FramePool>; MAX_FRAME_POOLS],
    len: usize,
}

impl Pools {
    fn iter(&self) -> impl Iterator<Item = &'static FramePool> + '_ {
        self.entries[..self.len].iter().flatten().copied()
    }

    fn ensure_can_register(
        &self,
        base_frame_no: FrameNumber,
        frame_count: u32,
    ) -> Result<(), FramePoolError> {
        if let Some(existing) = self.iter().find(|pool| {
            ranges_overlap(
                pool.base_frame_no(),
                pool.frame_count(),
                base_frame_no,
                frame_count,
            )
        }) {
            return Err(FramePoolError::Overlapping {
                base_frame_no,
                frame_count,
                existing: existing.base_frame_no(),
            });
        }

        if self.len == MAX_FRAME_POOLS {
            return Err(FramePoolError::RegistryFull {
                capacity: MAX_FRAME_POOLS,
            });
        }

        Ok(())
    }
}

impl FramePoolRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pools: Mutex::new(Pools {
                entries: [None; MAX_FRAME_POOLS],
                len: 0,
            }),
        }
    }

    /// Append `pool`.
    ///
    /// # Errors
    /// [`FramePoolError::Overlapping`] if the pool shares frames with a
    /// registered one, [`FramePoolError::RegistryFull`] if there is no room.
    pub fn register(&self, pool: &'static FramePool) -> Result<(), FramePoolError> {
        let mut pools = self.pools.lock();
        pools.ensure_can_register(pool.base_frame_no(), pool.frame_count())?;

        let index = pools.len;
        pools.entries[index] = Some(pool);
        pools.len += 1;

        log::debug!(
            "Registered frame pool {index} at {}..+{}",
            pool.base_frame_no(),
            pool.frame_count()
        );
        Ok(())
    }

    /// Check whether a pool covering `base_frame_no..+frame_count` could be registered.
    ///
    /// # Errors
    /// The errors [`FramePoolRegistry::register`] would return.
    pub fn ensure_can_register(
        &self,
        base_frame_no: FrameNumber,
        frame_count: u32,
    ) -> Result<(), FramePoolError> {
        self.pools
            .lock()
            .ensure_can_register(base_frame_no, frame_count)
    }

    /// The registered pool owning `frame`.
    #[must_use]
    pub fn find_owner(&self, frame: FrameNumber) -> Option<&'static FramePool> {
        self.pools.lock().iter().find(|pool| pool.contains(frame))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.lock().len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the run headed by `first_frame_no` in whichever pool owns it.
    ///
    /// # Errors
    /// - [`ReleaseError::PoolNotFound`] if no registered pool owns the frame.
    /// - [`ReleaseError::NotSequenceHead`] if the frame does not start a run.
    pub fn try_release_frames(&self, first_frame_no: FrameNumber) -> Result<u32, ReleaseError> {
        let pool = self
            .find_owner(first_frame_no)
            .ok_or(ReleaseError::PoolNotFound(first_frame_no))?;
        pool.release(first_frame_no)
    }

    /// Release the run headed by `first_frame_no` and return the number of frames freed.
    ///
    /// # Panics
    /// On any [`ReleaseError`]: freeing an unowned or non-head frame is a kernel bug.
    pub fn release_frames(&self, first_frame_no: FrameNumber) -> u32 {
        match self.try_release_frames(first_frame_no) {
            Ok(released) => released,
            Err(e) => {
                log::error!("Cannot release frames: {e}");
                panic!("cannot release frames: {e}");
            }
        }
    }
}

impl Default for FramePoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
