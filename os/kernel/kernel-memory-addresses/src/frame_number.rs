use crate::{FRAME_SHIFT, PhysicalAddress};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Number of a 4 KiB physical frame.
///
/// ### Semantics
/// - Frame `n` covers the physical bytes `[n << 12, (n + 1) << 12)`.
/// - [`FrameNumber::base`] yields the first byte as a [`PhysicalAddress`];
///   [`PhysicalAddress::frame`] goes the other way.
///
/// ### Invariants
/// - On IA-32 without PAE only the low 20 bits are meaningful. Values above
///   that are representable but cannot be installed into a page table entry.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FrameNumber(u32);

impl FrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The frame containing `addr`.
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(addr.as_u32() >> FRAME_SHIFT)
    }

    /// Physical address of the first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << FRAME_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, count: u32) -> Option<Self> {
        match self.0.checked_add(count) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Distance from `origin` to `self` in frames, or `None` if `self` lies below `origin`.
    #[inline]
    #[must_use]
    pub const fn offset_from(self, origin: Self) -> Option<u32> {
        self.0.checked_sub(origin.0)
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameNumber {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<FrameNumber> for u32 {
    #[inline]
    fn from(f: FrameNumber) -> Self {
        f.as_u32()
    }
}

impl Add<u32> for FrameNumber {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for FrameNumber {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}
