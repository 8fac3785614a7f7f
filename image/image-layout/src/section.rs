//! # Input Section Model
//!
//! Named, typed chunks of image content as handed over by upstream
//! compilation, grouped into the five fixed permission classes.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Permission/purpose class of linked content.
///
/// The set is closed and the order is contract, not configuration: it
/// separates non-writable data from executable code from writable state from
/// zero-fill state from link metadata, which loader and kernel rely on for
/// memory-protection decisions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SectionClass {
    Rodata,
    Text,
    Data,
    Bss,
    Misc,
}

impl SectionClass {
    /// Number of classes; every image has all of them, empty or not.
    pub const COUNT: usize = 5;

    /// Fixed placement order.
    pub const ORDER: [Self; Self::COUNT] =
        [Self::Rodata, Self::Text, Self::Data, Self::Bss, Self::Misc];

    /// Position in the placement order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Rodata => 0,
            Self::Text => 1,
            Self::Data => 2,
            Self::Bss => 3,
            Self::Misc => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rodata => "rodata",
            Self::Text => "text",
            Self::Data => "data",
            Self::Bss => "bss",
            Self::Misc => "misc",
        }
    }

    /// The exported `(start, end)` boundary marker names for this class.
    #[must_use]
    pub const fn marker_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Rodata => ("__RODATA_START", "__RODATA_END"),
            Self::Text => ("__TEXT_START", "__TEXT_END"),
            Self::Data => ("__DATA_START", "__DATA_END"),
            Self::Bss => ("__BSS_START", "__BSS_END"),
            Self::Misc => ("__MISC_START", "__MISC_END"),
        }
    }
}

impl fmt::Display for SectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-kind of the misc class: link-time metadata from distinct upstream
/// producers, placed as one class in this fixed sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MiscKind {
    /// Relocation-readonly data (`.data.rel.ro`).
    RelaRo,
    /// Dynamic relocation entries.
    DynRela,
    /// Global offset table entries.
    Got,
    /// Symbol table.
    SymbolTable,
    /// String tables.
    StringTable,
}

impl MiscKind {
    pub const COUNT: usize = 5;

    /// Fixed placement order within the misc class.
    pub const ORDER: [Self; Self::COUNT] = [
        Self::RelaRo,
        Self::DynRela,
        Self::Got,
        Self::SymbolTable,
        Self::StringTable,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RelaRo => "rela.ro",
            Self::DynRela => "rela.dyn",
            Self::Got => "got",
            Self::SymbolTable => "symtab",
            Self::StringTable => "strtab",
        }
    }
}

impl fmt::Display for MiscKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section content: raw bytes, or a size-only zero-fill request (bss style,
/// no bytes are stored or emitted for it).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SectionPayload {
    Bytes(Vec<u8>),
    Zeroed(u64),
}

impl SectionPayload {
    /// In-memory size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(b) => b.len() as u64,
            Self::Zeroed(n) => *n,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initialized content; a zeroed payload contributes none.
    #[inline]
    #[must_use]
    pub fn initialized(&self) -> &[u8] {
        match self {
            Self::Bytes(b) => b,
            Self::Zeroed(_) => &[],
        }
    }
}

/// A named input section with its intrinsic alignment request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Section {
    name: String,
    align: u64,
    payload: SectionPayload,
}

impl Section {
    /// Section backed by raw bytes. `align` must be a power of two
    /// (debug-asserted); whether it fits the page quantum is the layout
    /// builder's call.
    #[must_use]
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>, align: u64) -> Self {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        Self {
            name: name.into(),
            align,
            payload: SectionPayload::Bytes(bytes),
        }
    }

    /// Size-only zero-fill section (bss carries no bytes).
    #[must_use]
    pub fn zeroed(name: impl Into<String>, size: u64, align: u64) -> Self {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        Self {
            name: name.into(),
            align,
            payload: SectionPayload::Zeroed(size),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn align(&self) -> u64 {
        self.align
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.payload.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn payload(&self) -> &SectionPayload {
        &self.payload
    }
}

/// The full set of input sections for one build, keyed by class.
///
/// Misc sections carry a [`MiscKind`] tag; at placement time they are grouped
/// by the fixed sub-kind order, preserving input order within a sub-kind.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SectionSet {
    rodata: Vec<Section>,
    text: Vec<Section>,
    data: Vec<Section>,
    bss: Vec<Section>,
    misc: Vec<(MiscKind, Section)>,
}

impl SectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rodata(&mut self, section: Section) {
        self.rodata.push(section);
    }

    pub fn push_text(&mut self, section: Section) {
        self.text.push(section);
    }

    pub fn push_data(&mut self, section: Section) {
        self.data.push(section);
    }

    pub fn push_bss(&mut self, section: Section) {
        self.bss.push(section);
    }

    pub fn push_misc(&mut self, kind: MiscKind, section: Section) {
        self.misc.push((kind, section));
    }

    /// Sections of `class` in placement order. For misc this yields the
    /// fixed sub-kind sequence; for the other classes, plain input order.
    pub fn class(&self, class: SectionClass) -> impl Iterator<Item = &Section> {
        let (plain, misc): (&[Section], &[(MiscKind, Section)]) = match class {
            SectionClass::Rodata => (&self.rodata, &[]),
            SectionClass::Text => (&self.text, &[]),
            SectionClass::Data => (&self.data, &[]),
            SectionClass::Bss => (&self.bss, &[]),
            SectionClass::Misc => (&[], &self.misc),
        };
        plain.iter().chain(MiscKind::ORDER.iter().flat_map(move |k| {
            misc.iter()
                .filter(move |(kind, _)| kind == k)
                .map(|(_, s)| s)
        }))
    }

    /// Total number of sections across all five classes.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.rodata.len() + self.text.len() + self.data.len() + self.bss.len() + self.misc.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.section_count() == 0
    }
}
