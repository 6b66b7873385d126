//! Node identity for IR entities.
//!
//! Every module, section, byte interval and block carries a `NodeId`. The
//! address index stores node ids rather than the nodes themselves, and
//! parent back-references are node ids too, so ownership stays a tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of entity in the IR tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// A loaded binary (top-level container of sections)
    Module,
    /// A named section of a module
    Section,
    /// A contiguous run of bytes within a section
    ByteInterval,
    /// A code or data block within a byte interval
    Block,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Module => write!(f, "Module"),
            NodeKind::Section => write!(f, "Section"),
            NodeKind::ByteInterval => write!(f, "ByteInterval"),
            NodeKind::Block => write!(f, "Block"),
        }
    }
}

/// A stable identifier for a node in the IR tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }

    /// The all-zero id. Useful in tests and as a placeholder.
    pub fn nil() -> Self {
        NodeId(Uuid::nil())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        NodeId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an id from its hyphenated text form.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(NodeId)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        NodeId(uuid)
    }
}
