//! # Contiguous Frame Pool
//!
//! A [`FramePool`] owns a fixed range of physical frames and hands out runs of
//! consecutive frames, first-fit. The state of every frame lives in a packed
//! two-bit bitmap (see [`frame_state`](crate::frame_state)) that is stored in
//! physical frames as well:
//!
//! - **self-managed** pools keep the bitmap in their own first frame(s) and
//!   mark those frames [`Inaccessible`](FrameState::Inaccessible);
//! - **externally managed** pools keep it in "info frames" outside their range,
//!   typically taken from the kernel pool.
//!
//! A run is recorded as one [`HeadOfSequence`](FrameState::HeadOfSequence)
//! frame followed by [`Continuation`](FrameState::Continuation) frames, so
//! releasing needs only the head: the walk stops at the first frame that is not
//! a continuation.
//!
//! ```text
//!  offset:   0    1    2    3    4    5    6    7
//!          +----+----+----+----+----+----+----+----+
//!          | I  | H  | C  | C  | F  | H  | F  | F  |
//!          +----+----+----+----+----+----+----+----+
//!            |    \_____run____/        \run/
//!        bitmap
//! ```

use crate::bitmap::FrameBitmap;
use crate::frame_state::{FRAMES_PER_BYTE, FrameState};
use crate::phys_mapper::PhysMapper;
use crate::registry::FramePoolRegistry;
use core::fmt;
use kernel_memory_addresses::{FRAME_SHIFT, FRAME_SIZE, FrameNumber};
use spin::{Mutex, Once};

/// Frames whose states fit into a single info frame.
pub const FRAMES_PER_INFO_FRAME: u32 = FRAME_SIZE * FRAMES_PER_BYTE;

/// Number of frames addressable with 32-bit physical addresses.
pub const MAX_FRAME_COUNT: u32 = 1 << (32 - FRAME_SHIFT);

/// Info frames needed to hold the bitmap of a pool of `frame_count` frames.
///
/// ```rust
/// # use kernel_alloc::needed_info_frames;
/// assert_eq!(needed_info_frames(1024), 1);
/// assert_eq!(needed_info_frames(16 * 1024), 1);
/// assert_eq!(needed_info_frames(16 * 1024 + 4), 2);
/// ```
#[inline]
#[must_use]
pub const fn needed_info_frames(frame_count: u32) -> u32 {
    frame_count.div_ceil(FRAMES_PER_INFO_FRAME)
}

/// Parameters of a frame pool.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FramePoolConfig {
    /// First frame owned by the pool.
    pub base_frame_no: FrameNumber,
    /// Number of frames owned by the pool. Must be a multiple of four.
    pub frame_count: u32,
    /// Where the bitmap lives, or `None` to keep it in the pool's own first frame(s).
    pub info_frame_no: Option<FrameNumber>,
    /// Frames reserved for the bitmap; `0` means [`needed_info_frames`].
    pub info_frame_count: u32,
}

impl FramePoolConfig {
    /// Build a configuration from raw frame numbers. An `info_frame_no` of
    /// `0` selects a self-managed pool.
    #[must_use]
    pub const fn new(
        base_frame_no: u32,
        frame_count: u32,
        info_frame_no: u32,
        info_frame_count: u32,
    ) -> Self {
        Self {
            base_frame_no: FrameNumber::new(base_frame_no),
            frame_count,
            info_frame_no: if info_frame_no == 0 {
                None
            } else {
                Some(FrameNumber::new(info_frame_no))
            },
            info_frame_count,
        }
    }

    #[must_use]
    pub const fn self_managed(base_frame_no: FrameNumber, frame_count: u32) -> Self {
        Self {
            base_frame_no,
            frame_count,
            info_frame_no: None,
            info_frame_count: 0,
        }
    }

    #[must_use]
    pub const fn with_info_frames(
        base_frame_no: FrameNumber,
        frame_count: u32,
        info_frame_no: FrameNumber,
        info_frame_count: u32,
    ) -> Self {
        Self {
            base_frame_no,
            frame_count,
            info_frame_no: Some(info_frame_no),
            info_frame_count,
        }
    }

    const fn resolved_info_frame_count(&self) -> u32 {
        if self.info_frame_count == 0 {
            needed_info_frames(self.frame_count)
        } else {
            self.info_frame_count
        }
    }
}

/// Why a pool could not be constructed or registered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FramePoolError {
    #[error("a frame pool must own at least one frame")]
    Empty,
    #[error("frame count {frame_count} is not a multiple of {per_byte}", per_byte = FRAMES_PER_BYTE)]
    Misaligned { frame_count: u32 },
    #[error("frames {base_frame_no}..+{frame_count} exceed the 32-bit physical address space")]
    RangeOverflow {
        base_frame_no: FrameNumber,
        frame_count: u32,
    },
    #[error("{frame_count} frames exceed the {capacity} addressable by {info_frames} info frame(s)")]
    TooLarge {
        frame_count: u32,
        info_frames: u32,
        capacity: u32,
    },
    #[error("the bitmap needs {info_frames} frames but the pool owns only {frame_count}")]
    BitmapDoesNotFit { info_frames: u32, frame_count: u32 },
    #[error("info frames {info_frame_no}..+{info_frames} exceed the 32-bit physical address space")]
    InfoFramesOutOfRange {
        info_frame_no: FrameNumber,
        info_frames: u32,
    },
    #[error("info frames at {info_frame_no} overlap the pool's own range")]
    InfoFramesInsidePool { info_frame_no: FrameNumber },
    #[error("the pool slot is already occupied")]
    SlotTaken,
    #[error("frames {base_frame_no}..+{frame_count} overlap the pool at {existing}")]
    Overlapping {
        base_frame_no: FrameNumber,
        frame_count: u32,
        existing: FrameNumber,
    },
    #[error("the frame pool registry is full ({capacity} pools)")]
    RegistryFull { capacity: usize },
}

/// Why a run could not be allocated. The pool is unchanged in both cases.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("requested {requested} frames but only {free} are free")]
    Exhausted { requested: u32, free: u32 },
    #[error("no {requested} contiguous free frames ({free} free in total)")]
    Fragmented { requested: u32, free: u32 },
}

/// Why a range could not be marked inaccessible.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ReserveError {
    #[error("frames {first}..+{count} are not owned by the pool")]
    OutOfRange { first: FrameNumber, count: u32 },
    #[error("frame {frame} is not free ({state:?})")]
    Occupied { frame: FrameNumber, state: FrameState },
}

/// Why a run could not be released.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ReleaseError {
    #[error("no frame pool owns frame {0}")]
    PoolNotFound(FrameNumber),
    #[error("frame {frame} is not the head of an allocated run ({state:?})")]
    NotSequenceHead { frame: FrameNumber, state: FrameState },
}

struct PoolState {
    bitmap: FrameBitmap,
    free_frame_count: u32,
}

/// A contiguous range of physical frames with first-fit run allocation.
///
/// ### Invariants
/// - `free_frame_count` equals the number of [`Free`](FrameState::Free) frames.
/// - Every [`Continuation`](FrameState::Continuation) frame directly follows a
///   head or another continuation of the same run.
/// - [`Inaccessible`](FrameState::Inaccessible) frames are never allocated or released.
pub struct FramePool {
    base_frame_no: FrameNumber,
    frame_count: u32,
    info_frame_no: FrameNumber,
    info_frame_count: u32,
    self_managed: bool,
    state: Mutex<PoolState>,
}

impl FramePool {
    /// Construct an unregistered pool and initialize its bitmap.
    ///
    /// # Errors
    /// Any [`FramePoolError`] describing an invalid configuration. Nothing is
    /// written to memory in that case.
    ///
    /// # Safety
    /// The bitmap frames (the pool's first frames if self-managed, otherwise
    /// `info_frame_no..+info_frame_count`) must be mapped by `mapper`, writable,
    /// contiguous, and used by nothing else for the rest of the kernel's life.
    pub unsafe fn new<M: PhysMapper>(
        mapper: &M,
        config: FramePoolConfig,
    ) -> Result<Self, FramePoolError> {
        let FramePoolConfig {
            base_frame_no,
            frame_count,
            ..
        } = config;

        if frame_count == 0 {
            return Err(FramePoolError::Empty);
        }
        if !frame_count.is_multiple_of(FRAMES_PER_BYTE) {
            return Err(FramePoolError::Misaligned { frame_count });
        }
        if base_frame_no
            .as_u32()
            .checked_add(frame_count)
            .is_none_or(|end| end > MAX_FRAME_COUNT)
        {
            return Err(FramePoolError::RangeOverflow {
                base_frame_no,
                frame_count,
            });
        }

        let info_frame_count = config.resolved_info_frame_count();
        let capacity = info_frame_count.saturating_mul(FRAMES_PER_INFO_FRAME);
        if frame_count > capacity {
            return Err(FramePoolError::TooLarge {
                frame_count,
                info_frames: info_frame_count,
                capacity,
            });
        }

        let info_frame_no = if let Some(info_frame_no) = config.info_frame_no {
            if info_frame_no
                .as_u32()
                .checked_add(info_frame_count)
                .is_none_or(|end| end > MAX_FRAME_COUNT)
            {
                return Err(FramePoolError::InfoFramesOutOfRange {
                    info_frame_no,
                    info_frames: info_frame_count,
                });
            }
            if ranges_overlap(info_frame_no, info_frame_count, base_frame_no, frame_count) {
                return Err(FramePoolError::InfoFramesInsidePool { info_frame_no });
            }
            info_frame_no
        } else {
            if info_frame_count > frame_count {
                return Err(FramePoolError::BitmapDoesNotFit {
                    info_frames: info_frame_count,
                    frame_count,
                });
            }
            base_frame_no
        };

        // SAFETY: The caller guarantees exclusive access to the bitmap frames.
        let bytes = unsafe { mapper.frames_to_bytes(info_frame_no, info_frame_count) };
        let mut bitmap = FrameBitmap::new(bytes, frame_count);

        let self_managed = config.info_frame_no.is_none();
        let mut free_frame_count = frame_count;
        if self_managed {
            bitmap.set_range(0, info_frame_count, FrameState::Inaccessible);
            free_frame_count -= info_frame_count;
        }

        log::info!(
            "Frame pool initialized: frames {base_frame_no}..+{frame_count}, {free_frame_count} free, bitmap in {info_frame_count} frame(s) at {info_frame_no}"
        );

        Ok(Self {
            base_frame_no,
            frame_count,
            info_frame_no,
            info_frame_count,
            self_managed,
            state: Mutex::new(PoolState {
                bitmap,
                free_frame_count,
            }),
        })
    }

    /// Construct a pool into `slot` and append it to `registry`.
    ///
    /// # Errors
    /// [`FramePoolError::SlotTaken`] if `slot` already holds a pool, the
    /// registry's errors if the range overlaps a registered pool or the registry
    /// is full, and every error of [`FramePool::new`].
    ///
    /// # Safety
    /// Same contract as [`FramePool::new`].
    pub unsafe fn install<M: PhysMapper>(
        slot: &'static Once<Self>,
        registry: &FramePoolRegistry,
        mapper: &M,
        config: FramePoolConfig,
    ) -> Result<&'static Self, FramePoolError> {
        if slot.is_completed() {
            return Err(FramePoolError::SlotTaken);
        }
        registry.ensure_can_register(config.base_frame_no, config.frame_count)?;

        // SAFETY: Forwarded to the caller.
        let pool = unsafe { Self::new(mapper, config) }?;
        let pool = slot.call_once(|| pool);
        registry.register(pool)?;
        Ok(pool)
    }

    #[inline]
    #[must_use]
    pub const fn base_frame_no(&self) -> FrameNumber {
        self.base_frame_no
    }

    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// First frame and number of frames holding this pool's bitmap.
    #[inline]
    #[must_use]
    pub const fn bitmap_frames(&self) -> (FrameNumber, u32) {
        (self.info_frame_no, self.info_frame_count)
    }

    #[inline]
    #[must_use]
    pub const fn is_self_managed(&self) -> bool {
        self.self_managed
    }

    #[must_use]
    pub fn free_frame_count(&self) -> u32 {
        self.state.lock().free_frame_count
    }

    /// Whether `frame` lies within `[base_frame_no, base_frame_no + frame_count)`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, frame: FrameNumber) -> bool {
        match frame.offset_from(self.base_frame_no) {
            Some(offset) => offset < self.frame_count,
            None => false,
        }
    }

    /// State of `frame`, or `None` if the pool does not own it.
    #[must_use]
    pub fn frame_state(&self, frame: FrameNumber) -> Option<FrameState> {
        let offset = self.offset_of_range(frame, 1)?;
        Some(self.state.lock().bitmap.get(offset))
    }

    /// Number of frames currently in `state`, counted from the bitmap.
    #[must_use]
    pub fn count_frames(&self, state: FrameState) -> u32 {
        self.state.lock().bitmap.count(state)
    }

    /// Allocate one frame.
    ///
    /// # Errors
    /// See [`FramePool::get_frames`].
    #[inline]
    pub fn get_frame(&self) -> Result<FrameNumber, FrameAllocError> {
        self.get_frames(1)
    }

    /// Allocate `count` contiguous frames and return the first one.
    ///
    /// The lowest-numbered run of free frames that is long enough wins.
    ///
    /// # Errors
    /// - [`FrameAllocError::Exhausted`] if fewer than `count` frames are free.
    /// - [`FrameAllocError::Fragmented`] if enough frames are free but no run
    ///   of `count` of them is contiguous.
    ///
    /// # Panics
    /// If `count` is zero.
    pub fn get_frames(&self, count: u32) -> Result<FrameNumber, FrameAllocError> {
        assert!(count > 0, "cannot allocate an empty run of frames");

        let mut state = self.state.lock();
        let free = state.free_frame_count;
        if count > free {
            return Err(FrameAllocError::Exhausted {
                requested: count,
                free,
            });
        }

        let Some(offset) = state.bitmap.find_free_run(count) else {
            log::warn!(
                "Frame pool at {}: no run of {count} frames among {free} free frames",
                self.base_frame_no
            );
            return Err(FrameAllocError::Fragmented {
                requested: count,
                free,
            });
        };

        state.bitmap.set(offset, FrameState::HeadOfSequence);
        state
            .bitmap
            .set_range(offset + 1, count - 1, FrameState::Continuation);
        state.free_frame_count -= count;

        let head = self.base_frame_no + offset;
        log::debug!("Allocated {count} frame(s) at {head}");
        Ok(head)
    }

    /// Permanently reserve `count` frames starting at `first`.
    ///
    /// The whole range is checked before anything is changed.
    ///
    /// # Errors
    /// - [`ReserveError::OutOfRange`] if the range is not entirely owned by this pool.
    /// - [`ReserveError::Occupied`] for the first frame that is not free.
    pub fn try_mark_inaccessible(&self, first: FrameNumber, count: u32) -> Result<(), ReserveError> {
        let offset = self
            .offset_of_range(first, count)
            .ok_or(ReserveError::OutOfRange { first, count })?;

        let mut state = self.state.lock();
        for i in offset..offset + count {
            let current = state.bitmap.get(i);
            if current != FrameState::Free {
                return Err(ReserveError::Occupied {
                    frame: self.base_frame_no + i,
                    state: current,
                });
            }
        }

        state
            .bitmap
            .set_range(offset, count, FrameState::Inaccessible);
        state.free_frame_count -= count;
        log::debug!("Marked frames {first}..+{count} inaccessible");
        Ok(())
    }

    /// Permanently reserve `count` frames starting at `first`.
    ///
    /// # Panics
    /// If the range is not owned by this pool or any frame in it is not free.
    pub fn mark_inaccessible(&self, first: FrameNumber, count: u32) {
        if let Err(e) = self.try_mark_inaccessible(first, count) {
            log::error!("Cannot mark frames inaccessible: {e}");
            panic!("cannot mark frames inaccessible: {e}");
        }
    }

    /// Release the run headed by `head` and return the number of frames freed.
    ///
    /// Prefer [`release_frames`](crate::release_frames) when the owning pool is
    /// not at hand.
    ///
    /// # Errors
    /// - [`ReleaseError::PoolNotFound`] if this pool does not own `head`.
    /// - [`ReleaseError::NotSequenceHead`] if `head` does not start a run.
    pub fn release(&self, head: FrameNumber) -> Result<u32, ReleaseError> {
        let offset = self
            .offset_of_range(head, 1)
            .ok_or(ReleaseError::PoolNotFound(head))?;

        let mut state = self.state.lock();
        let current = state.bitmap.get(offset);
        if current != FrameState::HeadOfSequence {
            return Err(ReleaseError::NotSequenceHead {
                frame: head,
                state: current,
            });
        }

        state.bitmap.set(offset, FrameState::Free);
        let mut released = 1;
        let mut next = offset + 1;
        while next < self.frame_count && state.bitmap.get(next) == FrameState::Continuation {
            state.bitmap.set(next, FrameState::Free);
            released += 1;
            next += 1;
        }
        state.free_frame_count += released;

        log::debug!("Released {released} frame(s) at {head}");
        Ok(released)
    }

    /// Offset of `first` if `[first, first + count)` lies within the pool.
    fn offset_of_range(&self, first: FrameNumber, count: u32) -> Option<u32> {
        let offset = first.offset_from(self.base_frame_no)?;
        let end = offset.checked_add(count)?;
        (end <= self.frame_count && offset < self.frame_count).then_some(offset)
    }
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("base_frame_no", &self.base_frame_no)
            .field("frame_count", &self.frame_count)
            .field("info_frame_no", &self.info_frame_no)
            .field("info_frame_count", &self.info_frame_count)
            .field("self_managed", &self.self_managed)
            .field("free_frame_count", &self.free_frame_count())
            .finish()
    }
}

/// Whether `[a, a + a_len)` and `[b, b + b_len)` share a frame.
pub(crate) fn ranges_overlap(a: FrameNumber, a_len: u32, b: FrameNumber, b_len: u32) -> bool {
    let (a, b) = (u64::from(a.as_u32()), u64::from(b.as_u32()));
    a < b + u64::from(b_len) && b < a + u64::from(a_len)
}
