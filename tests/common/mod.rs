//! Common test utilities and helpers.

#![allow(dead_code)]

use irtree::{AddressIndex, IndexConfig, Indexable, OverlapStrategy};

/// A bare indexable item for driving the index without the entity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub id: usize,
    pub address: Option<u64>,
    pub size: u64,
}

impl Span {
    pub fn at(id: usize, address: u64, size: u64) -> Self {
        Span {
            id,
            address: Some(address),
            size,
        }
    }

    pub fn floating(id: usize, size: u64) -> Self {
        Span {
            id,
            address: None,
            size,
        }
    }
}

impl Indexable for Span {
    type Id = usize;

    fn node_id(&self) -> usize {
        self.id
    }

    fn address(&self) -> Option<u64> {
        self.address
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Build an index over `spans` in the given order.
pub fn build_index(spans: &[Span], strategy: OverlapStrategy) -> AddressIndex<usize> {
    let mut index = AddressIndex::with_config(&IndexConfig {
        overlap_strategy: strategy,
    });
    index.extend(spans.iter());
    index
}
