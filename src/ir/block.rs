//! Code and data blocks inside a byte interval.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::id::NodeId;
use crate::index::Indexable;

/// What a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Instructions. `decode_mode` distinguishes e.g. ARM from Thumb.
    Code { decode_mode: u64 },
    /// Non-executable bytes.
    Data,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Code { decode_mode: 0 } => write!(f, "code"),
            BlockKind::Code { decode_mode } => write!(f, "code/{}", decode_mode),
            BlockKind::Data => write!(f, "data"),
        }
    }
}

/// A block located by its offset within the owning byte interval.
///
/// Blocks are indexed by offset, never by absolute address, so moving the
/// byte interval does not invalidate its block index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: NodeId,
    offset: u64,
    size: u64,
    kind: BlockKind,
    byte_interval: Option<NodeId>,
}

impl Block {
    pub fn new(offset: u64, size: u64, kind: BlockKind) -> Self {
        Self::with_id(NodeId::new(), offset, size, kind)
    }

    pub fn code(offset: u64, size: u64) -> Self {
        Self::new(offset, size, BlockKind::Code { decode_mode: 0 })
    }

    pub fn data(offset: u64, size: u64) -> Self {
        Self::new(offset, size, BlockKind::Data)
    }

    pub fn with_id(id: NodeId, offset: u64, size: u64, kind: BlockKind) -> Self {
        Block {
            id,
            offset,
            size,
            kind,
            byte_interval: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, BlockKind::Code { .. })
    }

    /// Owning byte interval, if attached.
    pub fn byte_interval(&self) -> Option<NodeId> {
        self.byte_interval
    }

    /// Move the block. Only reachable through the owner's `with_block_mut`
    /// when attached, which re-keys the owner's index afterwards.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_kind(&mut self, kind: BlockKind) {
        self.kind = kind;
    }

    pub(crate) fn set_byte_interval(&mut self, byte_interval: Option<NodeId>) {
        self.byte_interval = byte_interval;
    }
}

impl Indexable for Block {
    type Id = NodeId;

    fn node_id(&self) -> NodeId {
        self.id
    }

    /// Blocks are keyed by offset, which is always defined.
    fn address(&self) -> Option<u64> {
        Some(self.offset)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} (+{:#x}, {} bytes, {})",
            self.id, self.offset, self.size, self.kind
        )
    }
}
