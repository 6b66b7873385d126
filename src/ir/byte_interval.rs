//! Byte intervals: contiguous runs of bytes that hold blocks.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::IndexConfig;
use crate::core::address_range::AddressRange;
use crate::core::id::{NodeId, NodeKind};
use crate::error::{IrError, Result};
use crate::index::{AddressIndex, Indexable};

use super::block::Block;
use super::{mutate_indexed, ordered, resolve};

/// A contiguous run of bytes, optionally pinned to an address.
///
/// `contents` holds the initialized prefix of the interval and may be
/// shorter than `size` (the remainder is e.g. `.bss`-style zero fill).
/// Blocks are indexed by their offset into the interval.
#[derive(Debug, Clone)]
pub struct ByteInterval {
    id: NodeId,
    address: Option<u64>,
    size: u64,
    contents: Vec<u8>,
    section: Option<NodeId>,
    blocks: HashMap<NodeId, Block>,
    block_index: AddressIndex<NodeId>,
}

impl ByteInterval {
    /// An uninitialized interval of `size` bytes.
    pub fn new(address: Option<u64>, size: u64) -> Self {
        Self::with_id(NodeId::new(), address, size)
    }

    pub fn with_id(id: NodeId, address: Option<u64>, size: u64) -> Self {
        ByteInterval {
            id,
            address,
            size,
            contents: Vec::new(),
            section: None,
            blocks: HashMap::new(),
            block_index: AddressIndex::new(),
        }
    }

    /// A fully initialized interval sized to `contents`.
    pub fn with_contents(address: Option<u64>, contents: Vec<u8>) -> Self {
        let mut interval = Self::new(address, contents.len() as u64);
        interval.contents = contents;
        interval
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> Option<u64> {
        self.address
    }

    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The interval's address range, if it has an address.
    pub fn range(&self) -> Option<AddressRange> {
        self.address.map(|start| AddressRange::new(start, self.size))
    }

    /// Owning section, if attached.
    pub fn section(&self) -> Option<NodeId> {
        self.section
    }

    pub fn set_address(&mut self, address: Option<u64>) {
        self.address = address;
    }

    /// Resize the interval, truncating initialized contents that no longer
    /// fit.
    pub fn set_size(&mut self, size: u64) {
        self.size = size;
        if (self.contents.len() as u64) > size {
            self.contents.truncate(size as usize);
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Replace the initialized bytes, growing the interval if they do not
    /// fit.
    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.size = self.size.max(contents.len() as u64);
        self.contents = contents;
    }

    /// Number of initialized bytes.
    pub fn initialized_size(&self) -> u64 {
        self.contents.len() as u64
    }

    pub(crate) fn set_section(&mut self, section: Option<NodeId>) {
        self.section = section;
    }

    pub(crate) fn apply_index_config(&mut self, config: &IndexConfig) {
        self.block_index.set_strategy(config.overlap_strategy);
    }

    /// Attach a block. Fails if a block with the same id is already here.
    pub fn add_block(&mut self, mut block: Block) -> Result<()> {
        let id = block.id();
        if self.blocks.contains_key(&id) {
            return Err(IrError::duplicate(NodeKind::Block, id));
        }
        block.set_byte_interval(Some(self.id));
        self.block_index.insert(&block);
        debug!(interval = %self.id, block = %id, offset = block.offset(), "block added");
        self.blocks.insert(id, block);
        Ok(())
    }

    /// Detach a block and hand it back.
    pub fn remove_block(&mut self, id: NodeId) -> Result<Block> {
        let mut block = self
            .blocks
            .remove(&id)
            .ok_or_else(|| crate::log_error!(IrError::not_found(NodeKind::Block, id)))?;
        self.block_index.remove(&block);
        block.set_byte_interval(None);
        debug!(interval = %self.id, block = %id, "block removed");
        Ok(block)
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in ascending offset order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        ordered(&self.blocks, &self.block_index)
    }

    /// Mutate a block in place; the block index follows offset/size changes.
    pub fn with_block_mut<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Block) -> R) -> Result<R> {
        mutate_indexed(&mut self.blocks, &mut self.block_index, id, f)
            .ok_or_else(|| IrError::not_found(NodeKind::Block, id))
    }

    /// Blocks whose extent contains `offset`.
    pub fn find_blocks_on(&self, offset: u64) -> Vec<&Block> {
        resolve(&self.blocks, self.block_index.query_containing(offset))
    }

    /// Blocks whose extent intersects offsets `lo..=hi`.
    pub fn find_blocks_on_range(&self, lo: u64, hi: u64) -> Vec<&Block> {
        resolve(&self.blocks, self.block_index.query_containing_range(lo, hi))
    }

    /// Blocks starting exactly at `offset`.
    pub fn find_blocks_at(&self, offset: u64) -> Vec<&Block> {
        resolve(&self.blocks, self.block_index.query_starting_at(offset))
    }

    /// Blocks starting at an offset in `lo..=hi`.
    pub fn find_blocks_at_range(&self, lo: u64, hi: u64) -> Vec<&Block> {
        resolve(&self.blocks, self.block_index.query_starting_in_range(lo, hi))
    }

    /// Blocks containing absolute `address`. Empty if the interval has no
    /// address or does not cover it.
    pub fn find_blocks_on_address(&self, address: u64) -> Vec<&Block> {
        match self.address {
            Some(start) if address >= start => self.find_blocks_on(address - start),
            _ => Vec::new(),
        }
    }

    /// Absolute address of a block in this interval.
    pub fn block_address(&self, block: &Block) -> Option<u64> {
        self.address
            .and_then(|start| start.checked_add(block.offset()))
    }

    /// Initialized bytes covered by a block; may be shorter than the block.
    pub fn block_bytes(&self, block: &Block) -> &[u8] {
        let len = self.contents.len() as u64;
        let start = block.offset().min(len);
        let end = block.offset().saturating_add(block.size()).min(len);
        &self.contents[start as usize..end as usize]
    }
}

impl Indexable for ByteInterval {
    type Id = NodeId;

    fn node_id(&self) -> NodeId {
        self.id
    }

    fn address(&self) -> Option<u64> {
        self.address
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for ByteInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range() {
            Some(range) => write!(f, "ByteInterval {} {}", self.id, range),
            None => write!(f, "ByteInterval {} (no address, {} bytes)", self.id, self.size),
        }
    }
}
