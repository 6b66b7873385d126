//! Entity layer of the IR: modules, sections, byte intervals and blocks.
//!
//! Each container owns its children by id in a map and keeps exactly one
//! [`AddressIndex`] over them. Children are only mutable through the
//! owner's `with_*_mut` methods, which re-key the index when a child's
//! address or size changes. Parent links are plain ids.

pub mod block;
pub mod byte_interval;
pub mod module;
pub mod record;
pub mod section;

use std::collections::HashMap;

use crate::core::id::NodeId;
use crate::index::{AddressIndex, IndexEntry, Indexable};

pub use block::{Block, BlockKind};
pub use byte_interval::ByteInterval;
pub use module::{FileFormat, Isa, Module};
pub use record::{BlockRecord, ByteIntervalRecord, ModuleRecord, SectionRecord};
pub use section::{Section, SectionFlag};

/// Map index entries back to the children they refer to.
fn resolve<T>(children: &HashMap<NodeId, T>, entries: Vec<IndexEntry<NodeId>>) -> Vec<&T> {
    entries
        .into_iter()
        .filter_map(|entry| children.get(&entry.id))
        .collect()
}

/// Children in index order.
fn ordered<'a, T>(
    children: &'a HashMap<NodeId, T>,
    index: &'a AddressIndex<NodeId>,
) -> impl Iterator<Item = &'a T> + 'a {
    index.ids().filter_map(move |id| children.get(&id))
}

/// Run `f` on a child and move its index entry if its span changed.
fn mutate_indexed<T, R, F>(
    children: &mut HashMap<NodeId, T>,
    index: &mut AddressIndex<NodeId>,
    id: NodeId,
    f: F,
) -> Option<R>
where
    T: Indexable<Id = NodeId>,
    F: FnOnce(&mut T) -> R,
{
    let child = children.get_mut(&id)?;
    let before = child.index_entry();
    let out = f(child);
    let after = child.index_entry();
    if before != after {
        index.remove_at(before.key(), id);
        index.insert_entry(after);
        tracing::debug!(
            id = %id,
            from = before.key(),
            to = after.key(),
            size = after.size,
            "re-keyed child"
        );
    }
    Some(out)
}
