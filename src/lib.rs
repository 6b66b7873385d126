//! In-memory object model for a binary program's intermediate
//! representation.
//!
//! Modules hold sections, sections hold byte intervals and byte intervals
//! hold code and data blocks. Every level stores its children in an
//! [`index::AddressIndex`], which answers ordered iteration, exact-start
//! and overlap queries, and derives the parent's aggregate bounds.

/// Core data types module
pub mod core;

pub mod config;
pub mod error;
pub mod index;
pub mod ir;
pub mod logging;

pub use crate::config::{IndexConfig, IrConfig, OverlapStrategy};
pub use crate::core::address::UNDEFINED_ADDRESS_KEY;
pub use crate::core::address_range::AddressRange;
pub use crate::core::id::{NodeId, NodeKind};
pub use crate::error::{IrError, Result};
pub use crate::index::{AddressIndex, AggregateBounds, IndexEntry, Indexable};
pub use crate::ir::{Block, BlockKind, ByteInterval, FileFormat, Isa, Module, Section, SectionFlag};
