//! End-to-end tests for the module / section / byte interval / block tree.

use irtree::{
    Block, ByteInterval, FileFormat, IrConfig, IrError, Isa, Module, NodeId, NodeKind,
    OverlapStrategy, Section, SectionFlag,
};

fn rx() -> Vec<SectionFlag> {
    vec![SectionFlag::Readable, SectionFlag::Executable]
}

fn ids<'a, T: 'a>(items: impl IntoIterator<Item = &'a T>, id: fn(&T) -> NodeId) -> Vec<NodeId> {
    items.into_iter().map(id).collect()
}

#[test]
fn test_module_add_and_remove_sections() {
    let mut module = Module::new("m", "");
    let s1 = Section::new(".text", rx());
    let s2 = Section::new(".data", vec![SectionFlag::Readable, SectionFlag::Writable]);
    let (id1, id2) = (s1.id(), s2.id());

    module.add_section(s1).unwrap();
    module.add_section(s2).unwrap();
    assert_eq!(module.section_count(), 2);
    assert_eq!(module.section(id1).and_then(Section::module), Some(module.id()));

    let removed = module.remove_section(id1).unwrap();
    assert_eq!(removed.module(), None);
    assert_eq!(module.section_count(), 1);
    assert!(module.section(id2).is_some());

    match module.remove_section(id1) {
        Err(IrError::NotFound { kind, id }) => {
            assert_eq!(kind, NodeKind::Section);
            assert_eq!(id, id1);
        }
        other => panic!("expected NotFound, got {:?}", other.map(|s| s.id())),
    }

    // a detached section can be re-attached
    module.add_section(removed).unwrap();
    assert_eq!(module.section_count(), 2);
}

#[test]
fn test_section_bounds_track_intervals() {
    let mut section = Section::new(".text", rx());
    assert_eq!(section.address(), None);
    assert_eq!(section.size(), 0);

    let low = ByteInterval::new(Some(0x100), 0x10);
    let high = ByteInterval::new(Some(0x200), 0x05);
    let high_id = high.id();
    section.add_byte_interval(high).unwrap();
    section.add_byte_interval(low).unwrap();
    assert_eq!(section.address(), Some(0x100));
    assert_eq!(section.size(), 0x105);

    let floating = ByteInterval::new(None, 0x40);
    let floating_id = floating.id();
    section.add_byte_interval(floating).unwrap();
    assert_eq!(section.address(), None);
    assert_eq!(section.size(), 0);

    section.remove_byte_interval(floating_id).unwrap();
    section.remove_byte_interval(high_id).unwrap();
    assert_eq!(section.address(), Some(0x100));
    assert_eq!(section.size(), 0x10);
}

#[test]
fn test_module_bounds_roll_up() {
    let mut module = Module::new("m", "/tmp/m");
    let text = Section::with_byte_intervals(
        ".text",
        rx(),
        vec![ByteInterval::new(Some(0x1000), 0x100)],
    )
    .unwrap();
    let data = Section::with_byte_intervals(
        ".data",
        vec![SectionFlag::Readable],
        vec![ByteInterval::new(Some(0x3000), 0x80)],
    )
    .unwrap();
    module.add_section(data).unwrap();
    module.add_section(text).unwrap();

    assert_eq!(module.address(), Some(0x1000));
    assert_eq!(module.size(), 0x2080);
    let names: Vec<&str> = module.sections().map(Section::name).collect();
    assert_eq!(names, vec![".text", ".data"]);
}

#[test]
fn test_module_lookup_reaches_section_without_bounds() {
    let placed = ByteInterval::new(Some(0x1000), 0x100);
    let placed_id = placed.id();
    let mut placed_with_block = placed;
    placed_with_block.add_block(Block::code(0x10, 0x8)).unwrap();
    let section = Section::with_byte_intervals(
        ".text",
        rx(),
        vec![placed_with_block, ByteInterval::new(None, 0x20)],
    )
    .unwrap();
    assert_eq!(section.address(), None);
    assert_eq!(section.find_byte_intervals_on(0x1010).len(), 1);

    let mut module = Module::new("m", "");
    module.add_section(section).unwrap();
    assert_eq!(ids(module.find_byte_intervals_on(0x1010), ByteInterval::id), vec![placed_id]);
    assert_eq!(module.find_blocks_on(0x1014).len(), 1);
}

#[test]
fn test_module_lookup_reaches_long_early_interval() {
    let long = ByteInterval::new(Some(0x1000), 0x1000);
    let long_id = long.id();
    let mut long_with_block = long;
    long_with_block.add_block(Block::data(0x800, 0x10)).unwrap();
    let section = Section::with_byte_intervals(
        ".data",
        vec![SectionFlag::Readable],
        vec![long_with_block, ByteInterval::new(Some(0x1100), 0x10)],
    )
    .unwrap();
    // bounds end at the last interval, well short of the long one
    assert_eq!(section.size(), 0x110);

    let mut module = Module::new("m", "");
    module.add_section(section).unwrap();
    assert!(module.find_sections_on(0x1800).is_empty());
    assert_eq!(ids(module.find_byte_intervals_on(0x1800), ByteInterval::id), vec![long_id]);
    assert_eq!(module.find_blocks_on(0x1808).len(), 1);
}

#[test]
fn test_failed_interval_replace_leaves_section_intact() {
    let mut section = Section::with_byte_intervals(
        ".text",
        rx(),
        vec![
            ByteInterval::new(Some(0x100), 0x10),
            ByteInterval::new(Some(0x200), 0x10),
        ],
    )
    .unwrap();

    let dup = ByteInterval::new(Some(0x300), 0x10);
    assert!(matches!(
        section.set_byte_intervals(vec![dup.clone(), dup]),
        Err(IrError::Duplicate { .. })
    ));
    assert_eq!(section.byte_interval_count(), 2);
    assert_eq!(section.address(), Some(0x100));
    assert_eq!(section.size(), 0x110);
    assert!(section.find_byte_intervals_on(0x305).is_empty());
}

#[test]
fn test_exact_start_queries() {
    let mut section = Section::new(".text", rx());
    let a = ByteInterval::new(Some(0x10), 4);
    let b = ByteInterval::new(Some(0x10), 8);
    let c = ByteInterval::new(Some(0x20), 4);
    let (ia, ib, ic) = (a.id(), b.id(), c.id());
    for bi in [a, b, c] {
        section.add_byte_interval(bi).unwrap();
    }

    assert_eq!(ids(section.find_byte_intervals_at(0x10), ByteInterval::id), vec![ia, ib]);
    assert_eq!(ids(section.find_byte_intervals_at(0x20), ByteInterval::id), vec![ic]);
    assert!(section.find_byte_intervals_at(0x14).is_empty());
    assert_eq!(
        ids(section.find_byte_intervals_at_range(0x00, 0x20), ByteInterval::id),
        vec![ia, ib, ic]
    );
    assert_eq!(ids(section.find_byte_intervals_on(0x15), ByteInterval::id), vec![ib]);
    assert_eq!(
        ids(section.find_byte_intervals_on_range(0x14, 0x20), ByteInterval::id),
        vec![ib, ic]
    );
}

#[test]
fn test_block_lookup_through_module() {
    let mut interval = ByteInterval::with_contents(Some(0x4000), vec![0x90; 0x30]);
    let entry = Block::code(0x00, 0x10);
    let tail = Block::code(0x10, 0x20);
    let (entry_id, tail_id) = (entry.id(), tail.id());
    interval.add_block(tail).unwrap();
    interval.add_block(entry).unwrap();

    let mut module = Module::new("m", "");
    module
        .add_section(Section::with_byte_intervals(".text", rx(), vec![interval]).unwrap())
        .unwrap();

    let hit: Vec<NodeId> = module.find_blocks_on(0x4008).iter().map(|b| b.id()).collect();
    assert_eq!(hit, vec![entry_id]);
    let hit: Vec<NodeId> = module.find_blocks_on(0x402f).iter().map(|b| b.id()).collect();
    assert_eq!(hit, vec![tail_id]);
    assert!(module.find_blocks_on(0x4030).is_empty());
    assert_eq!(module.find_byte_intervals_on(0x4000).len(), 1);
}

#[test]
fn test_mutation_through_owner_keeps_queries_fresh() {
    let mut section = Section::new(".data", vec![SectionFlag::Readable]);
    let bi = ByteInterval::new(Some(0x100), 0x10);
    let id = bi.id();
    section.add_byte_interval(bi).unwrap();

    section
        .with_byte_interval_mut(id, |bi| bi.set_address(Some(0x800)))
        .unwrap();
    assert!(section.find_byte_intervals_on(0x100).is_empty());
    assert_eq!(section.find_byte_intervals_on(0x80f).len(), 1);
    assert_eq!(section.address(), Some(0x800));

    section.with_byte_interval_mut(id, |bi| bi.set_size(0x20)).unwrap();
    assert_eq!(section.find_byte_intervals_on(0x81f).len(), 1);
    assert_eq!(section.size(), 0x20);
}

#[test]
fn test_strategies_agree_on_module_queries() {
    let build = || {
        let mut module = Module::new("m", "");
        let mut text = Section::new(".text", rx());
        for i in 0..64u64 {
            let mut bi = ByteInterval::new(Some(0x1000 + i * 0x10), 0x10 + (i % 5) * 0x08);
            bi.add_block(Block::code(0, 4)).unwrap();
            text.add_byte_interval(bi).unwrap();
        }
        module.add_section(text).unwrap();
        module
    };

    let augmented = build();
    let mut scan = augmented.clone();
    let mut config = IrConfig::default();
    config.index.overlap_strategy = OverlapStrategy::Scan;
    scan.apply_index_config(&config.index);

    for address in (0x0ff0..0x1500).step_by(3) {
        let a: Vec<NodeId> = augmented.find_byte_intervals_on(address).iter().map(|b| b.id()).collect();
        let s: Vec<NodeId> = scan.find_byte_intervals_on(address).iter().map(|b| b.id()).collect();
        assert_eq!(a, s, "address {:#x}", address);
    }
}

#[test]
fn test_three_interval_bounds() -> anyhow::Result<()> {
    let spans = [(Some(0x100), 0x10), (Some(0x200), 0x20), (Some(0x300), 0x5)];
    let section = Section::with_byte_intervals(
        ".rodata",
        vec![SectionFlag::Readable],
        spans.iter().map(|&(address, size)| ByteInterval::new(address, size)),
    )?;
    assert_eq!(section.address(), Some(0x100));
    assert_eq!(section.size(), 0x205);

    let holed = Section::with_byte_intervals(
        ".rodata",
        vec![SectionFlag::Readable],
        [(Some(0x100), 0x10), (None, 0x20), (Some(0x300), 0x5)]
            .iter()
            .map(|&(address, size)| ByteInterval::new(address, size)),
    )?;
    assert_eq!(holed.address(), None);
    assert_eq!(holed.size(), 0);
    Ok(())
}

#[test]
fn test_json_round_trip() -> anyhow::Result<()> {
    let mut module = Module::new("demo", "/bin/demo");
    module.set_file_format(FileFormat::Elf);
    module.set_isa(Isa::X64);
    module.set_preferred_address(0x400000);
    let mut interval = ByteInterval::with_contents(Some(0x401000), vec![0x55, 0x48, 0x89, 0xe5]);
    interval.add_block(Block::code(0, 4)).unwrap();
    module
        .add_section(Section::with_byte_intervals(".text", rx(), vec![interval]).unwrap())
        .unwrap();

    let json = module.to_json_string()?;
    let back = Module::from_json_string(&json)?;
    assert_eq!(back.to_record(), module.to_record());
    assert_eq!(back.find_blocks_on(0x401002).len(), 1);
    assert_eq!(back.section_by_name(".text").map(Section::is_executable), Some(true));
    Ok(())
}
