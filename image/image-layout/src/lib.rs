//! # Kernel Image Layout
//!
//! Memory-layout builder for a statically linked, higher-half x86-64 kernel
//! image. Upstream compilation hands over named sections; this crate arranges
//! them into a single linear image at a fixed virtual base and exports the
//! boundary markers the kernel's early-init code uses to discover its own
//! extents.
//!
//! ## Layout contract
//!
//! | Class | Content | Consumer obligation |
//! |--------|----------|---------------------|
//! | rodata | read-only data | map non-writable, non-executable |
//! | text | executable code | map executable, non-writable |
//! | data | initialized writable data | map writable, non-executable |
//! | bss | zero-initialized writable data | kernel zeroes it before use; no load content |
//! | misc | relocations, GOT, symbol/string tables | optional at runtime |
//!
//! Classes are always emitted in this order, each one starting on a 4 KiB
//! page boundary; the order is contract, not configuration. Every class
//! exports a `__<CLASS>_START`/`__<CLASS>_END` marker pair and the whole
//! image exports `__KERNEL_START`/`__KERNEL_END`, with `start == end` for an
//! empty class.
//!
//! ## Usage
//!
//! ```rust
//! use image_addresses::VirtualAddress;
//! use image_layout::{KernelImage, Section, SectionSet, KERNEL_BASE};
//!
//! let mut sections = SectionSet::new();
//! sections.push_text(Section::bytes(".text", vec![0x90; 64], 16));
//! sections.push_bss(Section::zeroed(".bss", 4096, 4096));
//!
//! let image = KernelImage::build(VirtualAddress::new(KERNEL_BASE), &sections)?;
//! let bss = image.markers().resolve("__BSS_START").unwrap();
//! assert!(image.markers().class(image_layout::SectionClass::Bss).contains(bss));
//! # Ok::<(), image_layout::LayoutError>(())
//! ```
//!
//! Building is a pure function: no I/O, no shared state, deterministic. A
//! failed build produces no image at all.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod image;
pub mod markers;
pub mod section;

pub use image::{ClassImage, KernelImage, LayoutError};
pub use image_addresses::{PageSize, Size4K, VirtualAddress};
pub use markers::{BoundaryMarkers, ClassRange};
pub use section::{MiscKind, Section, SectionClass, SectionPayload, SectionSet};

/// Virtual address the kernel is linked to run at (VMA), in the upper half
/// of the address space.
pub const KERNEL_BASE: u64 = 0xFFFF_FFFF_8000_0000;

/// Alignment quantum at class boundaries.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

const _: () = {
    assert!(KERNEL_BASE.is_multiple_of(PAGE_SIZE));
    // higher half: sign-extended canonical address
    assert!(KERNEL_BASE >= 0xFFFF_8000_0000_0000);
    assert!(PAGE_SIZE.is_power_of_two());
};
