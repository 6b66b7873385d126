//! Module: a single loaded binary and its sections.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::core::id::{NodeId, NodeKind};
use crate::error::{IrError, Result};
use crate::index::{AddressIndex, AggregateBounds};

use super::block::Block;
use super::byte_interval::ByteInterval;
use super::section::Section;
use super::{mutate_indexed, ordered, resolve};

/// Container format the module was lifted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileFormat {
    #[default]
    Undefined,
    Coff,
    Elf,
    Pe,
    IdaProDb32,
    IdaProDb64,
    Xcoff,
    MachO,
    Raw,
}

/// Instruction set architecture of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Isa {
    #[default]
    Undefined,
    Ia32,
    Ppc32,
    X64,
    Arm,
    ValidButUnsupported,
    Ppc64,
    Arm64,
    Mips32,
    Mips64,
}

/// A loaded binary. Sections are indexed by their derived address.
#[derive(Debug, Clone)]
pub struct Module {
    id: NodeId,
    name: String,
    binary_path: String,
    preferred_address: u64,
    rebase_delta: i64,
    file_format: FileFormat,
    isa: Isa,
    sections: HashMap<NodeId, Section>,
    section_index: AddressIndex<NodeId>,
}

impl Module {
    pub fn new(name: impl Into<String>, binary_path: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), name, binary_path)
    }

    pub fn with_id(id: NodeId, name: impl Into<String>, binary_path: impl Into<String>) -> Self {
        Module {
            id,
            name: name.into(),
            binary_path: binary_path.into(),
            preferred_address: 0,
            rebase_delta: 0,
            file_format: FileFormat::default(),
            isa: Isa::default(),
            sections: HashMap::new(),
            section_index: AddressIndex::new(),
        }
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

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    pub fn set_binary_path(&mut self, path: impl Into<String>) {
        self.binary_path = path.into();
    }

    pub fn preferred_address(&self) -> u64 {
        self.preferred_address
    }

    pub fn set_preferred_address(&mut self, address: u64) {
        self.preferred_address = address;
    }

    pub fn rebase_delta(&self) -> i64 {
        self.rebase_delta
    }

    pub fn set_rebase_delta(&mut self, delta: i64) {
        self.rebase_delta = delta;
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    pub fn set_file_format(&mut self, format: FileFormat) {
        self.file_format = format;
    }

    pub fn isa(&self) -> Isa {
        self.isa
    }

    pub fn set_isa(&mut self, isa: Isa) {
        self.isa = isa;
    }

    /// Apply index configuration to this module and everything below it.
    pub fn apply_index_config(&mut self, config: &IndexConfig) {
        self.section_index.set_strategy(config.overlap_strategy);
        for section in self.sections.values_mut() {
            section.apply_index_config(config);
        }
        info!(module = %self.name, strategy = ?config.overlap_strategy, "index config applied");
    }

    /// Lowest section address, if every section has one.
    pub fn address(&self) -> Option<u64> {
        self.bounds().address
    }

    pub fn size(&self) -> u64 {
        self.bounds().size
    }

    pub fn bounds(&self) -> AggregateBounds {
        self.section_index.bounds()
    }

    /// Attach a section and point its back-reference at this module.
    pub fn add_section(&mut self, mut section: Section) -> Result<()> {
        let id = section.id();
        if self.sections.contains_key(&id) {
            return Err(IrError::duplicate(NodeKind::Section, id));
        }
        section.set_module(Some(self.id));
        section.apply_index_config(&IndexConfig {
            overlap_strategy: self.section_index.strategy(),
        });
        self.section_index.insert(&section);
        debug!(module = %self.name, section = %section.name(), address = ?section.address(), "section added");
        self.sections.insert(id, section);
        Ok(())
    }

    /// Detach a section, clearing its back-reference, and hand it back.
    pub fn remove_section(&mut self, id: NodeId) -> Result<Section> {
        let mut section = self
            .sections
            .remove(&id)
            .ok_or_else(|| crate::log_error!(IrError::not_found(NodeKind::Section, id)))?;
        self.section_index.remove(&section);
        section.set_module(None);
        debug!(module = %self.name, section = %section.name(), "section removed");
        Ok(section)
    }

    pub fn section(&self, id: NodeId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections().find(|s| s.name() == name)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Sections in ascending address order. Sections without an address
    /// sort first, keyed at 0.
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        ordered(&self.sections, &self.section_index)
    }

    /// Mutate a section in place. A section's address is derived from its
    /// byte intervals, so any change to them re-keys the section here.
    pub fn with_section_mut<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Section) -> R) -> Result<R> {
        mutate_indexed(&mut self.sections, &mut self.section_index, id, f)
            .ok_or_else(|| IrError::not_found(NodeKind::Section, id))
    }

    pub fn find_sections_on(&self, address: u64) -> Vec<&Section> {
        resolve(&self.sections, self.section_index.query_containing(address))
    }

    pub fn find_sections_on_range(&self, lo: u64, hi: u64) -> Vec<&Section> {
        resolve(&self.sections, self.section_index.query_containing_range(lo, hi))
    }

    pub fn find_sections_at(&self, address: u64) -> Vec<&Section> {
        resolve(&self.sections, self.section_index.query_starting_at(address))
    }

    pub fn find_sections_at_range(&self, lo: u64, hi: u64) -> Vec<&Section> {
        resolve(&self.sections, self.section_index.query_starting_in_range(lo, hi))
    }

    /// Byte intervals containing `address`, across all sections.
    ///
    /// Every section is searched: a section's derived bounds can miss its
    /// own intervals when one lacks an address or an early one runs long.
    pub fn find_byte_intervals_on(&self, address: u64) -> Vec<&ByteInterval> {
        self.sections()
            .flat_map(|section| section.find_byte_intervals_on(address))
            .collect()
    }

    /// Blocks containing `address`, across all sections.
    pub fn find_blocks_on(&self, address: u64) -> Vec<&Block> {
        self.sections()
            .flat_map(|section| section.find_blocks_on(address))
            .collect()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module '{}' ({:?}/{:?}, {} sections, {})",
            self.name,
            self.file_format,
            self.isa,
            self.sections.len(),
            self.bounds()
        )
    }
}
