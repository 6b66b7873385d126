//! Address-range index shared by every containment level of the IR.
//!
//! [`AddressIndex`] is an ordered multimap from start key to the entries
//! stored under it. Modules index their sections, sections their byte
//! intervals and byte intervals their blocks, all through this one type.
//!
//! The index never owns items. It records an [`IndexEntry`] per insertion:
//! the item's id plus its address and size *as they were at insertion*.
//! If an item's address or size changes afterwards its entry is stale until
//! the item is removed and inserted again. The index does not watch for
//! this; the entity types in [`crate::ir`] re-key children for you when
//! they are mutated through their owner.

mod bounds;
mod iter;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{IndexConfig, OverlapStrategy};
use crate::core::address::{self, span_contains, span_end, span_intersects};

pub use bounds::AggregateBounds;
pub use iter::Iter;

use tree::Link;

/// Capability of anything that can be placed in an [`AddressIndex`].
pub trait Indexable {
    /// Identity used to find the item again on removal.
    type Id: Copy + PartialEq + fmt::Debug;

    fn node_id(&self) -> Self::Id;

    /// The item's address, if it has one.
    fn address(&self) -> Option<u64>;

    /// Extent used by overlap queries; `0` for markers.
    fn size(&self) -> u64;

    /// Key the item is stored under. Undefined addresses map to
    /// [`address::UNDEFINED_ADDRESS_KEY`].
    fn start_key(&self) -> u64 {
        address::start_key(self.address())
    }

    /// Snapshot of the item as the index stores it.
    fn index_entry(&self) -> IndexEntry<Self::Id> {
        IndexEntry {
            id: self.node_id(),
            address: self.address(),
            size: self.size(),
        }
    }
}

/// One stored reference to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry<I> {
    pub id: I,
    /// Address at insertion time; `None` is keyed at the sentinel
    pub address: Option<u64>,
    pub size: u64,
}

impl<I> IndexEntry<I> {
    pub fn new(id: I, address: Option<u64>, size: u64) -> Self {
        IndexEntry { id, address, size }
    }

    /// Key this entry is stored under.
    pub fn key(&self) -> u64 {
        address::start_key(self.address)
    }

    /// Exclusive end of the entry's span, widened so it cannot overflow.
    pub fn end(&self) -> u128 {
        span_end(self.key(), self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        span_contains(self.key(), self.size, address)
    }

    pub fn intersects(&self, lo: u64, hi: u64) -> bool {
        span_intersects(self.key(), self.size, lo, hi)
    }
}

/// Ordered multimap from start key to the entries sharing it.
///
/// * iteration is key-ascending, insertion order within a key;
/// * duplicate keys and even duplicate ids under one key are allowed;
/// * every query returns a (possibly empty) `Vec`, never an error.
///
/// Undefined-address items are keyed at `0` and take part in overlap
/// queries with their size, exactly like an item at real address `0`.
#[derive(Debug, Clone)]
pub struct AddressIndex<I> {
    root: Link<I>,
    len: usize,
    strategy: OverlapStrategy,
}

impl<I> Default for AddressIndex<I> {
    fn default() -> Self {
        AddressIndex {
            root: None,
            len: 0,
            strategy: OverlapStrategy::default(),
        }
    }
}

impl<I: Copy + PartialEq + fmt::Debug> AddressIndex<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &IndexConfig) -> Self {
        AddressIndex {
            strategy: config.overlap_strategy,
            ..Self::default()
        }
    }

    pub fn strategy(&self) -> OverlapStrategy {
        self.strategy
    }

    /// Switch overlap strategy. Storage is shared by both, so this is free.
    pub fn set_strategy(&mut self, strategy: OverlapStrategy) {
        self.strategy = strategy;
    }

    /// Number of entries (not keys).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct keys. Walks the tree.
    pub fn key_count(&self) -> usize {
        tree::node_count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Store `item` under its current start key, after any entries already
    /// there.
    pub fn insert<T: Indexable<Id = I> + ?Sized>(&mut self, item: &T) {
        self.insert_entry(item.index_entry());
    }

    pub fn insert_entry(&mut self, entry: IndexEntry<I>) {
        trace!(key = entry.key(), size = entry.size, id = ?entry.id, "index insert");
        self.root = Some(tree::insert(self.root.take(), entry));
        self.len += 1;
    }

    /// Remove the first entry for `item` under its *current* start key.
    ///
    /// Returns `false` when no such entry exists, including when the item's
    /// key changed since it was inserted; use [`remove_at`](Self::remove_at)
    /// with the old key in that case.
    pub fn remove<T: Indexable<Id = I> + ?Sized>(&mut self, item: &T) -> bool {
        self.remove_at(item.start_key(), item.node_id())
    }

    /// Remove the first entry for `id` stored under `key`.
    pub fn remove_at(&mut self, key: u64, id: I) -> bool {
        let mut removed = false;
        self.root = tree::remove(self.root.take(), key, &id, &mut removed);
        if removed {
            self.len -= 1;
            trace!(key, id = ?id, "index remove");
        } else {
            trace!(key, id = ?id, "index remove: not found");
        }
        removed
    }

    /// Whether an entry for `item` exists under its current start key.
    pub fn contains<T: Indexable<Id = I> + ?Sized>(&self, item: &T) -> bool {
        let id = item.node_id();
        tree::find(&self.root, item.start_key())
            .is_some_and(|node| node.entries.iter().any(|e| e.id == id))
    }

    /// All entries, key-ascending. Restartable: each call starts over.
    pub fn iter(&self) -> Iter<'_, I> {
        Iter::new(&self.root, self.len)
    }

    /// Ids of all entries, in iteration order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.iter().map(|e| e.id)
    }

    /// First entry in iteration order.
    pub fn first(&self) -> Option<&IndexEntry<I>> {
        tree::leftmost(&self.root).and_then(|n| n.entries.first())
    }

    /// Last entry in iteration order.
    pub fn last(&self) -> Option<&IndexEntry<I>> {
        tree::rightmost(&self.root).and_then(|n| n.entries.last())
    }

    /// Entries whose span `[key, key + size)` contains `address`.
    pub fn query_containing(&self, address: u64) -> Vec<IndexEntry<I>> {
        let mut out = Vec::new();
        match self.strategy {
            OverlapStrategy::Augmented => tree::stab(&self.root, address, &mut out),
            OverlapStrategy::Scan => {
                tree::for_each_bucket(&self.root, 0, address, &mut |bucket: &[IndexEntry<I>]| {
                    out.extend(bucket.iter().filter(|e| e.contains(address)).copied())
                })
            }
        }
        out
    }

    /// Entries whose span intersects `lo..=hi` (`key <= hi && end > lo`).
    ///
    /// Empty when `lo > hi`.
    pub fn query_containing_range(&self, lo: u64, hi: u64) -> Vec<IndexEntry<I>> {
        let mut out = Vec::new();
        if lo > hi {
            return out;
        }
        match self.strategy {
            OverlapStrategy::Augmented => tree::overlapping(&self.root, lo, hi, &mut out),
            OverlapStrategy::Scan => {
                tree::for_each_bucket(&self.root, 0, hi, &mut |bucket: &[IndexEntry<I>]| {
                    out.extend(bucket.iter().filter(|e| e.intersects(lo, hi)).copied())
                })
            }
        }
        out
    }

    /// Entries stored exactly under `address`, in insertion order.
    pub fn query_starting_at(&self, address: u64) -> Vec<IndexEntry<I>> {
        tree::find(&self.root, address)
            .map(|node| node.entries.clone())
            .unwrap_or_default()
    }

    /// Entries whose key lies in `lo..=hi`, key-ascending.
    ///
    /// Empty when `lo > hi`.
    pub fn query_starting_in_range(&self, lo: u64, hi: u64) -> Vec<IndexEntry<I>> {
        let mut out = Vec::new();
        if lo <= hi {
            tree::for_each_bucket(&self.root, lo, hi, &mut |bucket: &[IndexEntry<I>]| {
                out.extend_from_slice(bucket)
            });
        }
        out
    }

    /// Effective address and size of the entries taken together.
    pub fn bounds(&self) -> AggregateBounds {
        AggregateBounds::from_ordered(self.iter())
    }
}

impl<'a, I: Copy + PartialEq + fmt::Debug> IntoIterator for &'a AddressIndex<I> {
    type Item = &'a IndexEntry<I>;
    type IntoIter = Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, I, T> Extend<&'a T> for AddressIndex<I>
where
    I: Copy + PartialEq + fmt::Debug,
    T: Indexable<Id = I> + 'a,
{
    fn extend<It: IntoIterator<Item = &'a T>>(&mut self, iter: It) {
        for item in iter {
            self.insert(item);
        }
    }
}
