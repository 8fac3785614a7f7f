//! # Typed Virtual Addresses for Image Layout
//!
//! A strongly typed, zero-cost wrapper around raw 64-bit virtual addresses,
//! together with page-granular alignment arithmetic. The layout builder works
//! exclusively in virtual address space (the physical load address is the
//! loader's business), so there is a single address type rather than a
//! virtual/physical pair.
//!
//! All arithmetic that can wrap the 64-bit address space is offered in a
//! `checked_*` form returning `Option`; layout code near the top of the
//! higher half must use those.
//!
//! ```rust
//! # use image_addresses::*;
//! let va = VirtualAddress::new(0xFFFF_FFFF_8000_000A);
//! let up = va.checked_align_up::<Size4K>().unwrap();
//! assert_eq!(up.as_u64(), 0xFFFF_FFFF_8000_1000);
//! assert!(up.is_aligned::<Size4K>());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::fmt;
use core::hash::Hash;
use core::ops::{Add, AddAssign};

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;

    fn as_str() -> &'static str;
}

/// 4 KiB page (4096 bytes), the alignment quantum at class boundaries.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;

    fn as_str() -> &'static str {
        "4K"
    }
}

impl fmt::Display for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(Self::as_str())
    }
}

impl fmt::Debug for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

/// Virtual memory address.
///
/// Carries the *kind* of value at the type level so raw sizes, offsets and
/// addresses don't get mixed up in layout arithmetic. No canonicality check
/// is performed; alignment is only guaranteed for values returned from the
/// `align_*` helpers.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align down to page boundary `S`.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !(S::SIZE - 1))
    }

    /// Whether the address sits on a page boundary of size `S`.
    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0 & (S::SIZE - 1) == 0
    }

    /// Align up to page boundary `S`, returning `None` on 64-bit wrap.
    #[inline]
    #[must_use]
    pub const fn checked_align_up<S: PageSize>(self) -> Option<Self> {
        self.checked_align_up_to(S::SIZE)
    }

    /// Align up to an arbitrary power-of-two boundary, returning `None` on
    /// 64-bit wrap. `align` must be a power of two (debug-asserted).
    #[inline]
    #[must_use]
    pub const fn checked_align_up_to(self, align: u64) -> Option<Self> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        match self.0.checked_add(align - 1) {
            Some(v) => Some(Self(v & !(align - 1))),
            None => None,
        }
    }

    /// Checked add of a byte count, returning `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Byte distance from `base` to `self`. `base` must not exceed `self`
    /// (debug-asserted).
    #[inline]
    #[must_use]
    pub const fn offset_from(self, base: Self) -> u64 {
        debug_assert!(base.0 <= self.0, "offset_from requires base <= self");
        self.0 - base.0
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u64 {
    #[inline]
    fn from(a: VirtualAddress) -> Self {
        a.as_u64()
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_helpers() {
        let a = VirtualAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u64(), 0x12000);
        assert_eq!(a.checked_align_up::<Size4K>().unwrap().as_u64(), 0x13000);
        assert_eq!(a.offset_from(VirtualAddress::new(0x12000)), 0x345);
        assert!(!a.is_aligned::<Size4K>());
        assert!(a.align_down::<Size4K>().is_aligned::<Size4K>());
    }

    #[test]
    fn align_up_is_identity_on_boundary() {
        let a = VirtualAddress::new(0xFFFF_FFFF_8000_0000);
        assert_eq!(a.checked_align_up::<Size4K>(), Some(a));
        assert_eq!(a.checked_align_up_to(16), Some(a));
    }

    #[test]
    fn sub_page_alignment() {
        let a = VirtualAddress::new(0xFFFF_FFFF_8000_000A);
        assert_eq!(
            a.checked_align_up_to(16).unwrap().as_u64(),
            0xFFFF_FFFF_8000_0010
        );
        assert_eq!(a.checked_align_up_to(1), Some(a));
    }

    #[test]
    fn checked_ops_catch_wrap() {
        let top = VirtualAddress::new(u64::MAX - 5);
        assert_eq!(top.checked_align_up::<Size4K>(), None);
        assert_eq!(top.checked_add(6), None);
        assert!(top.checked_add(5).is_some());
    }
}
