//! # Image Layout Builder
//!
//! The single-pass transformation from a [`SectionSet`] to a laid-out
//! [`KernelImage`]: classes in fixed order, page alignment before every
//! class, intra-class placement honoring each section's own alignment, and
//! the full boundary-marker set.
//!
//! The builder is a pure function of its inputs. It performs no I/O, holds no
//! state between invocations, and may be called from many threads at once
//! with distinct inputs.

extern crate alloc;

use crate::markers::{BoundaryMarkers, ClassRange};
use crate::section::{SectionClass, SectionSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use image_addresses::{PageSize, Size4K, VirtualAddress};
use log::{debug, trace};

/// Build-time layout failure. All variants are fatal and non-recoverable:
/// the computation is deterministic, so a retry with identical inputs
/// reproduces the identical failure.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// The virtual base address is not aligned to the page quantum.
    #[error("base address {0} is not aligned to the 4 KiB page quantum")]
    InvalidBaseAddress(VirtualAddress),
    /// A section requests an alignment larger than the page quantum, which
    /// cannot be satisfied within single-class contiguity. Policy is to
    /// reject rather than silently widen class boundaries.
    #[error("section `{name}` requests alignment {align:#x}, larger than the 4 KiB page quantum")]
    SectionAlignmentOverflow { name: String, align: u64 },
    /// Zero sections across all five classes. A kernel with no code is never
    /// intended; this is a build-configuration error, not a degenerate image.
    #[error("no input sections in any class")]
    EmptyImage,
    /// Section placement wrapped the 64-bit address space.
    #[error("section placement wrapped the 64-bit address space")]
    AddressWrap,
}

/// One laid-out class: its address range plus its initialized content.
///
/// `bytes` covers `range` for the initialized classes, with intra-class
/// alignment padding zero-filled. The bss class is size-only and carries no
/// bytes; a loader need not load content for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassImage {
    class: SectionClass,
    range: ClassRange,
    bytes: Vec<u8>,
}

impl ClassImage {
    #[inline]
    #[must_use]
    pub const fn class(&self) -> SectionClass {
        self.class
    }

    #[inline]
    #[must_use]
    pub const fn range(&self) -> ClassRange {
        self.range
    }

    /// Initialized content to load at `range().start()`; empty for bss.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The immutable product of one build: five laid-out classes at a fixed
/// virtual base, the boundary markers, and the entry address.
///
/// A build produces exactly one image; there is no update or deletion. A new
/// build is a new image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KernelImage {
    base: VirtualAddress,
    entry: VirtualAddress,
    classes: [ClassImage; SectionClass::COUNT],
    markers: BoundaryMarkers,
}

impl KernelImage {
    /// Lay out `sections` at the page-aligned virtual `base`.
    ///
    /// Classes are placed in the fixed order rodata, text, data, bss, misc;
    /// each class starts at the page-aligned ceiling of the previous class's
    /// end. An empty class collapses to a zero-length range at that aligned
    /// address and does not perturb the next class.
    ///
    /// # Errors
    ///
    /// [`LayoutError::InvalidBaseAddress`] if `base` is not page-aligned,
    /// [`LayoutError::EmptyImage`] if `sections` contains no section at all,
    /// [`LayoutError::SectionAlignmentOverflow`] if a section requests an
    /// alignment above the page quantum, and [`LayoutError::AddressWrap`] if
    /// placement runs off the end of the 64-bit address space.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(base: VirtualAddress, sections: &SectionSet) -> Result<Self, LayoutError> {
        if !base.is_aligned::<Size4K>() {
            return Err(LayoutError::InvalidBaseAddress(base));
        }
        if sections.is_empty() {
            return Err(LayoutError::EmptyImage);
        }

        let mut cursor = base;
        let mut classes: Vec<ClassImage> = Vec::with_capacity(SectionClass::COUNT);
        let mut ranges = [ClassRange::new(base, base); SectionClass::COUNT];

        for class in SectionClass::ORDER {
            let start = cursor
                .checked_align_up::<Size4K>()
                .ok_or(LayoutError::AddressWrap)?;
            cursor = start;

            let mut bytes = Vec::new();
            for section in sections.class(class) {
                let align = section.align();
                if align > Size4K::SIZE {
                    return Err(LayoutError::SectionAlignmentOverflow {
                        name: section.name().into(),
                        align,
                    });
                }

                let placed = cursor
                    .checked_align_up_to(align)
                    .ok_or(LayoutError::AddressWrap)?;
                let next = placed
                    .checked_add(section.len())
                    .ok_or(LayoutError::AddressWrap)?;
                if class != SectionClass::Bss {
                    // zero-fill the intra-class alignment gap, then the payload
                    bytes.resize(placed.offset_from(start) as usize, 0);
                    bytes.extend_from_slice(section.payload().initialized());
                    bytes.resize(next.offset_from(start) as usize, 0);
                }
                trace!(
                    "  {} at {placed}, {} bytes, align {align:#x}",
                    section.name(),
                    section.len()
                );

                cursor = next;
            }

            let range = ClassRange::new(start, cursor);
            debug!("{class} at {range} ({} bytes)", range.len());
            ranges[class.index()] = range;
            classes.push(ClassImage { class, range, bytes });
        }

        let markers = BoundaryMarkers::new(ranges);
        // conventional entry: _start at the top of .text
        let entry = markers.class(SectionClass::Text).start();

        let classes: [ClassImage; SectionClass::COUNT] = match classes.try_into() {
            Ok(c) => c,
            // ORDER has exactly COUNT entries
            Err(_) => unreachable!(),
        };

        Ok(Self {
            base,
            entry,
            classes,
            markers,
        })
    }

    /// The virtual base address the image was laid out at.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    /// The process entry address, the start of the text class.
    #[inline]
    #[must_use]
    pub const fn entry(&self) -> VirtualAddress {
        self.entry
    }

    /// The exported boundary markers.
    #[inline]
    #[must_use]
    pub const fn markers(&self) -> &BoundaryMarkers {
        &self.markers
    }

    /// One laid-out class.
    #[inline]
    #[must_use]
    pub const fn class(&self, class: SectionClass) -> &ClassImage {
        &self.classes[class.index()]
    }

    /// All five classes in placement order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassImage> {
        self.classes.iter()
    }

    /// Whole-image extent in bytes, `__KERNEL_END - __KERNEL_START`.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.markers.kernel().len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The loader-visible flat byte image for the whole extent: initialized
    /// classes at their offsets, alignment gaps between classes and the
    /// entire bss range zero-filled.
    ///
    /// The extent must fit host memory; the returned buffer has exactly
    /// [`len()`](Self::len) bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn flat_bytes(&self) -> Vec<u8> {
        let kernel_start = self.markers.kernel().start();
        let mut out = Vec::with_capacity(self.len() as usize);
        for class in &self.classes {
            out.resize(class.range.start().offset_from(kernel_start) as usize, 0);
            out.extend_from_slice(&class.bytes);
        }
        out.resize(self.len() as usize, 0);
        out
    }
}

impl fmt::Display for KernelImage {
    /// Renders the layout as a marker table for build logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "kernel image at {}, {} bytes", self.base, self.len())?;
        for (name, addr) in self.markers.iter() {
            writeln!(f, "  {name:<16} {addr}")?;
        }
        write!(f, "  {:<16} {}", "entry", self.entry)
    }
}
