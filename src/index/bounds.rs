//! Aggregate bounds of a container, derived from its indexed children.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address_range::AddressRange;

use super::IndexEntry;

/// Effective address and size of a container.
///
/// `address` is `None` when the container has no children or when any child
/// lacks an address; in both cases `size` is `0`. A container whose children
/// are all zero-sized at a fixed address has `Some(address)` and size `0`,
/// which is distinct from the undefined case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AggregateBounds {
    pub address: Option<u64>,
    pub size: u64,
}

impl AggregateBounds {
    pub const UNDEFINED: AggregateBounds = AggregateBounds {
        address: None,
        size: 0,
    };

    /// Fold entries visited in ascending key order.
    ///
    /// The address is the first entry's; the size runs to the end of the
    /// *last* entry visited, not the furthest end. A large early child that
    /// extends past a later one does not widen the result.
    pub fn from_ordered<'a, I, T>(entries: T) -> Self
    where
        I: 'a,
        T: IntoIterator<Item = &'a IndexEntry<I>>,
    {
        let mut start = None;
        let mut end = 0u64;
        for entry in entries {
            let Some(address) = entry.address else {
                return Self::UNDEFINED;
            };
            start.get_or_insert(address);
            end = address.saturating_add(entry.size);
        }
        match start {
            Some(start) => AggregateBounds {
                address: Some(start),
                size: end.saturating_sub(start),
            },
            None => Self::UNDEFINED,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.address.is_some()
    }

    /// The bounds as a range, when the address is known.
    pub fn range(&self) -> Option<AddressRange> {
        self.address.map(|start| AddressRange::new(start, self.size))
    }
}

impl fmt::Display for AggregateBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range() {
            Some(range) => write!(f, "{}", range),
            None => write!(f, "<no address>"),
        }
    }
}
