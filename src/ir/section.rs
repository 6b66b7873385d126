//! Section type for named regions of a module.
//!
//! A section has no address of its own: its address and size are derived
//! from the byte intervals it holds (see [`Section::bounds`]).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::config::IndexConfig;
use crate::core::id::{NodeId, NodeKind};
use crate::error::{IrError, Result};
use crate::index::{AddressIndex, AggregateBounds, Indexable};

use super::block::Block;
use super::byte_interval::ByteInterval;
use super::{mutate_indexed, ordered, resolve};

/// Flags describing how a section is loaded and accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionFlag {
    Undefined,
    Readable,
    Writable,
    Executable,
    Loaded,
    Initialized,
    ThreadLocal,
}

/// A named section holding byte intervals.
#[derive(Debug, Clone)]
pub struct Section {
    id: NodeId,
    name: String,
    flags: Vec<SectionFlag>,
    module: Option<NodeId>,
    byte_intervals: HashMap<NodeId, ByteInterval>,
    interval_index: AddressIndex<NodeId>,
}

impl Section {
    pub fn new(name: impl Into<String>, flags: Vec<SectionFlag>) -> Self {
        Self::with_id(NodeId::new(), name, flags)
    }

    pub fn with_id(id: NodeId, name: impl Into<String>, flags: Vec<SectionFlag>) -> Self {
        Section {
            id,
            name: name.into(),
            flags,
            module: None,
            byte_intervals: HashMap::new(),
            interval_index: AddressIndex::new(),
        }
    }

    /// Build a section from an initial collection of byte intervals.
    pub fn with_byte_intervals(
        name: impl Into<String>,
        flags: Vec<SectionFlag>,
        byte_intervals: impl IntoIterator<Item = ByteInterval>,
    ) -> Result<Self> {
        let mut section = Self::new(name, flags);
        for interval in byte_intervals {
            section.add_byte_interval(interval)?;
        }
        Ok(section)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn flags(&self) -> &[SectionFlag] {
        &self.flags
    }

    pub fn set_flags(&mut self, flags: Vec<SectionFlag>) {
        self.flags = flags;
    }

    pub fn has_flag(&self, flag: SectionFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Check if section contains executable code
    pub fn is_executable(&self) -> bool {
        self.has_flag(SectionFlag::Executable)
    }

    /// Check if section is writable
    pub fn is_writable(&self) -> bool {
        self.has_flag(SectionFlag::Writable)
    }

    /// Check if section is read-only
    pub fn is_readonly(&self) -> bool {
        self.has_flag(SectionFlag::Readable) && !self.is_writable() && !self.is_executable()
    }

    /// Owning module, if attached.
    pub fn module(&self) -> Option<NodeId> {
        self.module
    }

    pub(crate) fn set_module(&mut self, module: Option<NodeId>) {
        self.module = module;
    }

    pub(crate) fn apply_index_config(&mut self, config: &IndexConfig) {
        self.interval_index.set_strategy(config.overlap_strategy);
        for interval in self.byte_intervals.values_mut() {
            interval.apply_index_config(config);
        }
    }

    /// Address of the lowest byte interval, if every interval has an
    /// address. `None` for an empty section.
    pub fn address(&self) -> Option<u64> {
        self.bounds().address
    }

    /// Span from the first interval's start to the last interval's end, or
    /// `0` when the address is unknown.
    pub fn size(&self) -> u64 {
        self.bounds().size
    }

    pub fn bounds(&self) -> AggregateBounds {
        self.interval_index.bounds()
    }

    pub fn add_byte_interval(&mut self, mut interval: ByteInterval) -> Result<()> {
        let id = interval.id();
        if self.byte_intervals.contains_key(&id) {
            return Err(IrError::duplicate(NodeKind::ByteInterval, id));
        }
        interval.set_section(Some(self.id));
        interval.apply_index_config(&IndexConfig {
            overlap_strategy: self.interval_index.strategy(),
        });
        self.interval_index.insert(&interval);
        debug!(section = %self.name, interval = %id, address = ?interval.address(), "byte interval added");
        self.byte_intervals.insert(id, interval);
        Ok(())
    }

    pub fn remove_byte_interval(&mut self, id: NodeId) -> Result<ByteInterval> {
        let mut interval = self
            .byte_intervals
            .remove(&id)
            .ok_or_else(|| crate::log_error!(IrError::not_found(NodeKind::ByteInterval, id)))?;
        self.interval_index.remove(&interval);
        interval.set_section(None);
        debug!(section = %self.name, interval = %id, "byte interval removed");
        Ok(interval)
    }

    /// Replace all byte intervals. Previously held intervals are returned
    /// detached, in address order.
    ///
    /// A batch that repeats an id is rejected with `Duplicate` and the
    /// section is left untouched.
    pub fn set_byte_intervals(
        &mut self,
        byte_intervals: impl IntoIterator<Item = ByteInterval>,
    ) -> Result<Vec<ByteInterval>> {
        let incoming: Vec<ByteInterval> = byte_intervals.into_iter().collect();
        let mut seen = HashSet::with_capacity(incoming.len());
        if let Some(dup) = incoming.iter().find(|bi| !seen.insert(bi.id())) {
            return Err(crate::log_error!(IrError::duplicate(
                NodeKind::ByteInterval,
                dup.id()
            )));
        }

        let old_ids: Vec<NodeId> = self.interval_index.ids().collect();
        let mut old = Vec::with_capacity(old_ids.len());
        for id in old_ids {
            if let Some(mut interval) = self.byte_intervals.remove(&id) {
                interval.set_section(None);
                old.push(interval);
            }
        }
        self.interval_index.clear();
        for interval in incoming {
            self.add_byte_interval(interval)?;
        }
        Ok(old)
    }

    pub fn byte_interval(&self, id: NodeId) -> Option<&ByteInterval> {
        self.byte_intervals.get(&id)
    }

    pub fn byte_interval_count(&self) -> usize {
        self.byte_intervals.len()
    }

    /// Byte intervals in ascending address order.
    pub fn byte_intervals(&self) -> impl Iterator<Item = &ByteInterval> + '_ {
        ordered(&self.byte_intervals, &self.interval_index)
    }

    /// Mutate a byte interval in place, keeping the index in step with its
    /// address and size.
    pub fn with_byte_interval_mut<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut ByteInterval) -> R,
    ) -> Result<R> {
        mutate_indexed(&mut self.byte_intervals, &mut self.interval_index, id, f)
            .ok_or_else(|| IrError::not_found(NodeKind::ByteInterval, id))
    }

    /// Byte intervals containing `address`.
    pub fn find_byte_intervals_on(&self, address: u64) -> Vec<&ByteInterval> {
        resolve(&self.byte_intervals, self.interval_index.query_containing(address))
    }

    /// Byte intervals intersecting `lo..=hi`.
    pub fn find_byte_intervals_on_range(&self, lo: u64, hi: u64) -> Vec<&ByteInterval> {
        resolve(
            &self.byte_intervals,
            self.interval_index.query_containing_range(lo, hi),
        )
    }

    /// Byte intervals starting exactly at `address`.
    pub fn find_byte_intervals_at(&self, address: u64) -> Vec<&ByteInterval> {
        resolve(&self.byte_intervals, self.interval_index.query_starting_at(address))
    }

    /// Byte intervals starting in `lo..=hi`.
    pub fn find_byte_intervals_at_range(&self, lo: u64, hi: u64) -> Vec<&ByteInterval> {
        resolve(
            &self.byte_intervals,
            self.interval_index.query_starting_in_range(lo, hi),
        )
    }

    /// Blocks containing absolute `address`, across all byte intervals.
    pub fn find_blocks_on(&self, address: u64) -> Vec<&Block> {
        self.find_byte_intervals_on(address)
            .into_iter()
            .flat_map(|interval| interval.find_blocks_on_address(address))
            .collect()
    }

    /// Get a human-readable description of the section
    pub fn description(&self) -> String {
        format!(
            "Section '{}' ({}, {}, {} byte intervals, flags: {})",
            self.name,
            self.id,
            self.bounds(),
            self.byte_intervals.len(),
            flags_string(&self.flags)
        )
    }
}

fn flags_string(flags: &[SectionFlag]) -> String {
    let mut perms = String::new();
    perms.push(if flags.contains(&SectionFlag::Readable) { 'r' } else { '-' });
    perms.push(if flags.contains(&SectionFlag::Writable) { 'w' } else { '-' });
    perms.push(if flags.contains(&SectionFlag::Executable) { 'x' } else { '-' });
    perms
}

impl Indexable for Section {
    type Id = NodeId;

    fn node_id(&self) -> NodeId {
        self.id
    }

    fn address(&self) -> Option<u64> {
        Section::address(self)
    }

    fn size(&self) -> u64 {
        Section::size(self)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Section '{}' ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_section() -> Section {
        Section::with_byte_intervals(
            ".text",
            vec![SectionFlag::Readable, SectionFlag::Executable],
            vec![
                ByteInterval::new(Some(0x300), 0x5),
                ByteInterval::new(Some(0x100), 0x10),
                ByteInterval::new(Some(0x200), 0x20),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_section_flags() {
        let section = text_section();
        assert!(section.is_executable());
        assert!(!section.is_writable());
        assert!(!section.is_readonly());
        assert_eq!(flags_string(section.flags()), "r-x");
        assert!(section.description().contains("[0x100, 0x305)"));
    }

    #[test]
    fn test_section_bounds() {
        let section = text_section();
        assert_eq!(section.address(), Some(0x100));
        assert_eq!(section.size(), 0x205);
        assert_eq!(section.start_key(), 0x100);
    }

    #[test]
    fn test_section_bounds_with_floating_interval() {
        let section = Section::with_byte_intervals(
            ".data",
            vec![],
            vec![
                ByteInterval::new(Some(0x100), 0x10),
                ByteInterval::new(None, 0x20),
                ByteInterval::new(Some(0x300), 0x5),
            ],
        )
        .unwrap();
        assert_eq!(section.address(), None);
        assert_eq!(section.size(), 0);
        assert_eq!(section.start_key(), 0);
    }

    #[test]
    fn test_empty_section_bounds() {
        let section = Section::new(".bss", vec![]);
        assert_eq!(section.address(), None);
        assert_eq!(section.size(), 0);
        assert_eq!(section.bounds(), AggregateBounds::UNDEFINED);
    }

    #[test]
    fn test_intervals_in_address_order() {
        let section = text_section();
        let addrs: Vec<Option<u64>> = section.byte_intervals().map(|bi| bi.address()).collect();
        assert_eq!(addrs, vec![Some(0x100), Some(0x200), Some(0x300)]);
        assert!(section
            .byte_intervals()
            .all(|bi| bi.section() == Some(section.id())));
    }

    #[test]
    fn test_interval_queries() {
        let section = text_section();
        assert_eq!(section.find_byte_intervals_on(0x210).len(), 1);
        assert!(section.find_byte_intervals_on(0x220).is_empty());
        assert_eq!(section.find_byte_intervals_on_range(0x10f, 0x200).len(), 2);
        assert_eq!(section.find_byte_intervals_at(0x300).len(), 1);
        assert!(section.find_byte_intervals_at(0x301).is_empty());
        assert_eq!(section.find_byte_intervals_at_range(0x100, 0x2ff).len(), 2);
    }

    #[test]
    fn test_move_interval_updates_bounds() {
        let mut section = text_section();
        let id = section.find_byte_intervals_at(0x100)[0].id();
        section
            .with_byte_interval_mut(id, |bi| bi.set_address(Some(0x400)))
            .unwrap();
        assert_eq!(section.address(), Some(0x200));
        assert_eq!(section.size(), 0x210);
        assert_eq!(section.find_byte_intervals_on(0x405)[0].id(), id);
        assert!(section.find_byte_intervals_on(0x105).is_empty());
    }

    #[test]
    fn test_remove_and_replace_intervals() {
        let mut section = text_section();
        let id = section.find_byte_intervals_at(0x200)[0].id();
        let removed = section.remove_byte_interval(id).unwrap();
        assert!(removed.section().is_none());
        assert!(section.remove_byte_interval(id).is_err());
        assert_eq!(section.byte_interval_count(), 2);

        let old = section
            .set_byte_intervals(vec![ByteInterval::new(Some(0x50), 0x10)])
            .unwrap();
        assert_eq!(old.len(), 2);
        assert_eq!(old[0].address(), Some(0x100));
        assert!(old.iter().all(|bi| bi.section().is_none()));
        assert_eq!(section.bounds().range().map(|r| r.start), Some(0x50));
        assert_eq!(section.size(), 0x10);
    }

    #[test]
    fn test_failed_replace_keeps_intervals() {
        let mut section = text_section();
        let before: Vec<NodeId> = section.byte_intervals().map(ByteInterval::id).collect();
        let bounds = section.bounds();

        let dup = ByteInterval::new(Some(0x50), 0x10);
        let result = section.set_byte_intervals(vec![dup.clone(), dup]);
        assert!(matches!(
            result,
            Err(IrError::Duplicate { kind: NodeKind::ByteInterval, .. })
        ));

        let after: Vec<NodeId> = section.byte_intervals().map(ByteInterval::id).collect();
        assert_eq!(after, before);
        assert_eq!(section.bounds(), bounds);
        assert!(section.byte_intervals().all(|bi| bi.section() == Some(section.id())));
    }

    #[test]
    fn test_find_blocks_on_address() {
        let mut interval = ByteInterval::new(Some(0x1000), 0x100);
        let block = Block::code(0x40, 0x10);
        let block_id = block.id();
        interval.add_block(block).unwrap();
        let section = Section::with_byte_intervals(".text", vec![], vec![interval]).unwrap();

        let found = section.find_blocks_on(0x1048);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), block_id);
        assert!(section.find_blocks_on(0x1050).is_empty());
    }
}
