//! Flattening iterator over an [`AddressIndex`](super::AddressIndex).

use std::iter::FusedIterator;
use std::slice;

use super::tree::{Link, Node};
use super::IndexEntry;

/// In-order iterator over index entries.
///
/// Keys ascend; entries that share a key come out in insertion order. The
/// iterator borrows the index, so the index cannot change underneath it.
/// Call [`AddressIndex::iter`](super::AddressIndex::iter) again to restart.
pub struct Iter<'a, I> {
    stack: Vec<&'a Node<I>>,
    bucket: slice::Iter<'a, IndexEntry<I>>,
    remaining: usize,
}

impl<'a, I> Iter<'a, I> {
    pub(crate) fn new(root: &'a Link<I>, len: usize) -> Self {
        let mut iter = Iter {
            stack: Vec::new(),
            bucket: Default::default(),
            remaining: len,
        };
        iter.push_left_spine(root.as_deref());
        iter
    }

    fn push_left_spine(&mut self, mut node: Option<&'a Node<I>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, I> Iterator for Iter<'a, I> {
    type Item = &'a IndexEntry<I>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.bucket.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            let node = self.stack.pop()?;
            self.bucket = node.entries.iter();
            self.push_left_spine(node.right.as_deref());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<I> ExactSizeIterator for Iter<'_, I> {}

impl<I> FusedIterator for Iter<'_, I> {}

impl<I> Clone for Iter<'_, I> {
    fn clone(&self) -> Self {
        Iter {
            stack: self.stack.clone(),
            bucket: self.bucket.clone(),
            remaining: self.remaining,
        }
    }
}
