use image_addresses::VirtualAddress;
use image_layout::{
    KERNEL_BASE, KernelImage, LayoutError, MiscKind, Section, SectionClass, SectionSet,
};

const BASE: VirtualAddress = VirtualAddress::new(KERNEL_BASE);

/// The canonical higher-half layout: one section per class, misc empty.
fn canonical_sections() -> SectionSet {
    let mut set = SectionSet::new();
    set.push_rodata(Section::bytes(".rodata", vec![0xAA; 10], 1));
    set.push_text(Section::bytes(".text", vec![0x90; 4096], 16));
    set.push_data(Section::bytes(".data", vec![0xDD; 8], 8));
    set.push_bss(Section::zeroed(".bss", 4096, 4096));
    set
}

#[test]
fn canonical_layout_markers() {
    let image = KernelImage::build(BASE, &canonical_sections()).unwrap();
    let m = image.markers();

    let expect = [
        ("__RODATA_START", 0xFFFF_FFFF_8000_0000),
        ("__RODATA_END", 0xFFFF_FFFF_8000_000A),
        ("__TEXT_START", 0xFFFF_FFFF_8000_1000),
        ("__TEXT_END", 0xFFFF_FFFF_8000_2000),
        ("__DATA_START", 0xFFFF_FFFF_8000_2000),
        ("__DATA_END", 0xFFFF_FFFF_8000_2008),
        ("__BSS_START", 0xFFFF_FFFF_8000_3000),
        ("__BSS_END", 0xFFFF_FFFF_8000_4000),
        // page-rounded even though misc is empty
        ("__MISC_START", 0xFFFF_FFFF_8000_4000),
        ("__MISC_END", 0xFFFF_FFFF_8000_4000),
        ("__KERNEL_START", 0xFFFF_FFFF_8000_0000),
        ("__KERNEL_END", 0xFFFF_FFFF_8000_4000),
    ];
    for (name, addr) in expect {
        assert_eq!(m.resolve(name), Some(VirtualAddress::new(addr)), "{name}");
    }

    assert_eq!(image.entry(), VirtualAddress::new(0xFFFF_FFFF_8000_1000));
    assert_eq!(image.len(), 0x4000);
}

#[test]
fn builds_are_deterministic() {
    let sections = canonical_sections();
    let a = KernelImage::build(BASE, &sections).unwrap();
    let b = KernelImage::build(BASE, &sections).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.flat_bytes(), b.flat_bytes());
    let markers_a: Vec<_> = a.markers().iter().collect();
    let markers_b: Vec<_> = b.markers().iter().collect();
    assert_eq!(markers_a, markers_b);
}

#[test]
fn class_ranges_are_monotonic_and_page_aligned() {
    let image = KernelImage::build(BASE, &canonical_sections()).unwrap();

    let mut prev_end = image.markers().kernel().start();
    for class in SectionClass::ORDER {
        let range = image.markers().class(class);
        assert!(range.start().as_u64().is_multiple_of(4096), "{class} start");
        assert!(prev_end <= range.start(), "{class} overlaps predecessor");
        assert!(range.start() <= range.end(), "{class} range inverted");
        prev_end = range.end();
    }
    assert_eq!(prev_end, image.markers().kernel().end());
}

#[test]
fn unaligned_base_is_rejected() {
    let base = VirtualAddress::new(KERNEL_BASE + 0x10);
    assert_eq!(
        KernelImage::build(base, &canonical_sections()),
        Err(LayoutError::InvalidBaseAddress(base))
    );
}

#[test]
fn all_empty_input_is_rejected() {
    assert_eq!(
        KernelImage::build(BASE, &SectionSet::new()),
        Err(LayoutError::EmptyImage)
    );
}

#[test]
fn empty_classes_collapse_without_perturbing_successors() {
    // only text and data; rodata, bss and misc are empty
    let mut set = SectionSet::new();
    set.push_text(Section::bytes(".text", vec![0x90; 32], 16));
    set.push_data(Section::bytes(".data", vec![0xDD; 4], 4));

    let image = KernelImage::build(BASE, &set).unwrap();
    let m = image.markers();

    let rodata = m.class(SectionClass::Rodata);
    assert!(rodata.is_empty());
    assert_eq!(rodata.start(), BASE);

    // text begins right at the same page the empty rodata collapsed onto
    assert_eq!(m.class(SectionClass::Text).start(), BASE);
    assert_eq!(
        m.class(SectionClass::Data).start().as_u64(),
        KERNEL_BASE + 0x1000
    );

    let bss = m.class(SectionClass::Bss);
    let misc = m.class(SectionClass::Misc);
    assert!(bss.is_empty());
    assert!(misc.is_empty());
    assert_eq!(bss.start(), misc.start());
    assert_eq!(m.kernel().end(), misc.end());
}

#[test]
fn alignment_above_page_quantum_is_rejected() {
    let mut set = canonical_sections();
    set.push_data(Section::bytes(".data.huge", vec![0; 16], 8192));

    assert_eq!(
        KernelImage::build(BASE, &set),
        Err(LayoutError::SectionAlignmentOverflow {
            name: ".data.huge".into(),
            align: 8192,
        })
    );
}

#[test]
fn misc_subkinds_are_placed_in_fixed_sequence() {
    let mut set = SectionSet::new();
    set.push_text(Section::bytes(".text", vec![0x90; 16], 16));
    // deliberately pushed out of order
    set.push_misc(MiscKind::StringTable, Section::bytes(".strtab", vec![3; 4], 1));
    set.push_misc(MiscKind::Got, Section::bytes(".got", vec![2; 4], 4));
    set.push_misc(MiscKind::RelaRo, Section::bytes(".data.rel.ro", vec![1; 4], 4));

    let image = KernelImage::build(BASE, &set).unwrap();
    let misc = image.class(SectionClass::Misc);
    assert_eq!(misc.range().len(), 12);
    assert_eq!(misc.bytes(), &[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
}

#[test]
fn flat_bytes_zero_fill_gaps_and_bss() {
    let image = KernelImage::build(BASE, &canonical_sections()).unwrap();
    let flat = image.flat_bytes();

    assert_eq!(flat.len() as u64, image.len());
    // rodata content, then padding up to the text page
    assert_eq!(&flat[..10], &[0xAA; 10]);
    assert!(flat[10..0x1000].iter().all(|&b| b == 0));
    assert_eq!(&flat[0x1000..0x2000], &[0x90; 4096]);
    assert_eq!(&flat[0x2000..0x2008], &[0xDD; 8]);
    // gap to bss and the bss range itself are zero
    assert!(flat[0x2008..0x4000].iter().all(|&b| b == 0));
}

#[test]
fn concurrent_builds_do_not_interfere() {
    use std::sync::{Arc, Barrier};
    use std::thread;

    let threads = 8;
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for i in 0..threads {
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            // distinct input per thread
            let mut set = canonical_sections();
            set.push_data(Section::bytes(".data.cpu", vec![i as u8; i + 1], 1));

            start.wait();
            let image = KernelImage::build(BASE, &set).unwrap();
            let again = KernelImage::build(BASE, &set).unwrap();
            assert_eq!(image, again);
            assert_eq!(
                image.markers().class(SectionClass::Data).len(),
                8 + (i as u64 + 1)
            );
            image.flat_bytes()
        }));
    }

    let blobs: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // each thread got its own bytes back, untouched by the others
    for (i, blob) in blobs.iter().enumerate() {
        assert_eq!(blob[0x2008], i as u8);
    }
}
