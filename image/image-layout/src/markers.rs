//! # Boundary Markers
//!
//! Exported named addresses marking the start and end of each class and of
//! the whole image, the moral equivalent of linker symbols. Early kernel
//! init resolves these by name to discover its own extents, e.g. to zero the
//! bss range or to set per-class page permissions.

use crate::section::SectionClass;
use core::fmt;
use image_addresses::VirtualAddress;

/// Whole-image start marker name.
pub const KERNEL_START: &str = "__KERNEL_START";
/// Whole-image end marker name.
pub const KERNEL_END: &str = "__KERNEL_END";

/// Half-open virtual address range of one class.
///
/// `start == end` is a legal empty class: all five classes always exist,
/// there is no absent-class state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassRange {
    start: VirtualAddress,
    end: VirtualAddress,
}

impl ClassRange {
    /// `start` must not exceed `end` (debug-asserted).
    #[inline]
    #[must_use]
    pub const fn new(start: VirtualAddress, end: VirtualAddress) -> Self {
        debug_assert!(start.as_u64() <= end.as_u64(), "range start exceeds end");
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn start(self) -> VirtualAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(self) -> VirtualAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> u64 {
        self.end.as_u64() - self.start.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.as_u64() == self.end.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, addr: VirtualAddress) -> bool {
        self.start.as_u64() <= addr.as_u64() && addr.as_u64() < self.end.as_u64()
    }
}

impl fmt::Display for ClassRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The complete marker set of one built image: a range per class plus the
/// whole-image extent. Immutable once built.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoundaryMarkers {
    classes: [ClassRange; SectionClass::COUNT],
    kernel: ClassRange,
}

impl BoundaryMarkers {
    #[must_use]
    pub(crate) const fn new(classes: [ClassRange; SectionClass::COUNT]) -> Self {
        let kernel = ClassRange::new(classes[0].start(), classes[SectionClass::COUNT - 1].end());
        Self { classes, kernel }
    }

    /// Range of one class.
    #[inline]
    #[must_use]
    pub const fn class(&self, class: SectionClass) -> ClassRange {
        self.classes[class.index()]
    }

    /// Whole-image extent, `__KERNEL_START..__KERNEL_END`.
    #[inline]
    #[must_use]
    pub const fn kernel(&self) -> ClassRange {
        self.kernel
    }

    /// Resolve one of the twelve fixed marker names to its address.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<VirtualAddress> {
        if name == KERNEL_START {
            return Some(self.kernel.start());
        }
        if name == KERNEL_END {
            return Some(self.kernel.end());
        }
        for class in SectionClass::ORDER {
            let (start_name, end_name) = class.marker_names();
            if name == start_name {
                return Some(self.class(class).start());
            }
            if name == end_name {
                return Some(self.class(class).end());
            }
        }
        None
    }

    /// All twelve `(name, address)` pairs in image order: the whole-image
    /// start, then each class pair, then the whole-image end.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, VirtualAddress)> + '_ {
        core::iter::once((KERNEL_START, self.kernel.start()))
            .chain(SectionClass::ORDER.into_iter().flat_map(|class| {
                let (start_name, end_name) = class.marker_names();
                let range = self.class(class);
                [(start_name, range.start()), (end_name, range.end())]
            }))
            .chain(core::iter::once((KERNEL_END, self.kernel.end())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn range(start: u64, end: u64) -> ClassRange {
        ClassRange::new(VirtualAddress::new(start), VirtualAddress::new(end))
    }

    fn markers() -> BoundaryMarkers {
        BoundaryMarkers::new([
            range(0x1000, 0x1010),
            range(0x2000, 0x3000),
            range(0x3000, 0x3008),
            range(0x4000, 0x5000),
            range(0x5000, 0x5000),
        ])
    }

    #[test]
    fn range_len_and_contains() {
        let r = range(0x1000, 0x1010);
        assert_eq!(r.len(), 0x10);
        assert!(!r.is_empty());
        assert!(r.contains(VirtualAddress::new(0x1000)));
        assert!(!r.contains(VirtualAddress::new(0x1010)));

        let empty = range(0x5000, 0x5000);
        assert!(empty.is_empty());
        assert!(!empty.contains(VirtualAddress::new(0x5000)));
    }

    #[test]
    fn kernel_extent_spans_first_to_last_class() {
        let m = markers();
        assert_eq!(m.kernel().start().as_u64(), 0x1000);
        assert_eq!(m.kernel().end().as_u64(), 0x5000);
    }

    #[test]
    fn resolve_knows_all_fixed_names() {
        let m = markers();
        assert_eq!(m.resolve("__KERNEL_START"), Some(VirtualAddress::new(0x1000)));
        assert_eq!(m.resolve("__TEXT_END"), Some(VirtualAddress::new(0x3000)));
        assert_eq!(m.resolve("__MISC_START"), m.resolve("__MISC_END"));
        assert_eq!(m.resolve("__HEAP_START"), None);
    }

    #[test]
    fn iteration_is_in_image_order() {
        let m = markers();
        let names: std::vec::Vec<&str> = m.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            [
                "__KERNEL_START",
                "__RODATA_START",
                "__RODATA_END",
                "__TEXT_START",
                "__TEXT_END",
                "__DATA_START",
                "__DATA_END",
                "__BSS_START",
                "__BSS_END",
                "__MISC_START",
                "__MISC_END",
                "__KERNEL_END",
            ]
        );
    }
}
