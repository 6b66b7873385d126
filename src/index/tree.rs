//! Augmented AVL tree backing the address index.
//!
//! Each node owns one key and the bucket of entries stored under it, in
//! insertion order. Every node also tracks the largest exclusive end of any
//! entry in its subtree, which lets stabbing and range-overlap queries skip
//! subtrees that end before the query.

use std::cmp::Ordering;

use super::IndexEntry;

pub(crate) type Link<I> = Option<Box<Node<I>>>;

#[derive(Debug, Clone)]
pub(crate) struct Node<I> {
    pub(crate) key: u64,
    pub(crate) entries: Vec<IndexEntry<I>>,
    height: i32,
    /// Largest end among this node's own entries
    bucket_end: u128,
    /// Largest end in the whole subtree
    max_end: u128,
    pub(crate) left: Link<I>,
    pub(crate) right: Link<I>,
}

impl<I> Node<I> {
    fn new(entry: IndexEntry<I>) -> Box<Self> {
        let end = entry.end();
        Box::new(Node {
            key: entry.key(),
            entries: vec![entry],
            height: 1,
            bucket_end: end,
            max_end: end,
            left: None,
            right: None,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        self.max_end = self
            .bucket_end
            .max(max_end(&self.left))
            .max(max_end(&self.right));
    }

    fn refresh_bucket_end(&mut self) {
        self.bucket_end = self.entries.iter().map(IndexEntry::end).max().unwrap_or(0);
    }

    fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn height<I>(link: &Link<I>) -> i32 {
    link.as_ref().map_or(0, |n| n.height)
}

fn max_end<I>(link: &Link<I>) -> u128 {
    link.as_ref().map_or(0, |n| n.max_end)
}

fn rotate_right<I>(mut node: Box<Node<I>>) -> Box<Node<I>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update();
    pivot.right = Some(node);
    pivot.update();
    pivot
}

fn rotate_left<I>(mut node: Box<Node<I>>) -> Box<Node<I>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update();
    pivot.left = Some(node);
    pivot.update();
    pivot
}

fn rebalance<I>(mut node: Box<Node<I>>) -> Box<Node<I>> {
    node.update();
    let bf = node.balance_factor();
    if bf > 1 {
        if node.left.as_ref().map_or(0, |l| l.balance_factor()) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if bf < -1 {
        if node.right.as_ref().map_or(0, |r| r.balance_factor()) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

/// Append `entry` to the bucket for its key, creating the node if needed.
pub(crate) fn insert<I>(link: Link<I>, entry: IndexEntry<I>) -> Box<Node<I>> {
    let Some(mut node) = link else {
        return Node::new(entry);
    };
    match entry.key().cmp(&node.key) {
        Ordering::Less => node.left = Some(insert(node.left.take(), entry)),
        Ordering::Greater => node.right = Some(insert(node.right.take(), entry)),
        Ordering::Equal => {
            node.bucket_end = node.bucket_end.max(entry.end());
            node.entries.push(entry);
        }
    }
    rebalance(node)
}

/// Remove the first entry for `id` under `key`. Drops the node when its
/// bucket empties. Sets `removed` when something was taken out.
pub(crate) fn remove<I: PartialEq>(link: Link<I>, key: u64, id: &I, removed: &mut bool) -> Link<I> {
    let mut node = link?;
    match key.cmp(&node.key) {
        Ordering::Less => node.left = remove(node.left.take(), key, id, removed),
        Ordering::Greater => node.right = remove(node.right.take(), key, id, removed),
        Ordering::Equal => {
            let Some(pos) = node.entries.iter().position(|e| &e.id == id) else {
                return Some(node);
            };
            node.entries.remove(pos);
            *removed = true;
            if node.entries.is_empty() {
                return unlink(node);
            }
            node.refresh_bucket_end();
        }
    }
    Some(rebalance(node))
}

fn unlink<I>(node: Box<Node<I>>) -> Link<I> {
    let Node { left, right, .. } = *node;
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (left, Some(right)) => {
            let (mut successor, rest) = take_min(right);
            successor.left = left;
            successor.right = rest;
            Some(rebalance(successor))
        }
    }
}

/// Detach the leftmost node, returning it and the remaining subtree.
fn take_min<I>(mut node: Box<Node<I>>) -> (Box<Node<I>>, Link<I>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (node, rest)
        }
        Some(left) => {
            let (min, rest) = take_min(left);
            node.left = rest;
            (min, Some(rebalance(node)))
        }
    }
}

pub(crate) fn find<I>(link: &Link<I>, key: u64) -> Option<&Node<I>> {
    let mut cur = link.as_deref();
    while let Some(node) = cur {
        cur = match key.cmp(&node.key) {
            Ordering::Less => node.left.as_deref(),
            Ordering::Greater => node.right.as_deref(),
            Ordering::Equal => return Some(node),
        };
    }
    None
}

pub(crate) fn node_count<I>(link: &Link<I>) -> usize {
    link.as_ref()
        .map_or(0, |n| 1 + node_count(&n.left) + node_count(&n.right))
}

pub(crate) fn leftmost<I>(link: &Link<I>) -> Option<&Node<I>> {
    let mut node = link.as_deref()?;
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    Some(node)
}

pub(crate) fn rightmost<I>(link: &Link<I>) -> Option<&Node<I>> {
    let mut node = link.as_deref()?;
    while let Some(right) = node.right.as_deref() {
        node = right;
    }
    Some(node)
}

/// Visit every bucket whose key lies in `lo..=hi`, ascending.
pub(crate) fn for_each_bucket<I, F>(link: &Link<I>, lo: u64, hi: u64, f: &mut F)
where
    F: FnMut(&[IndexEntry<I>]),
{
    let Some(node) = link else {
        return;
    };
    if node.key > lo {
        for_each_bucket(&node.left, lo, hi, f);
    }
    if lo <= node.key && node.key <= hi {
        f(&node.entries);
    }
    if node.key < hi {
        for_each_bucket(&node.right, lo, hi, f);
    }
}

/// Collect entries containing `address`, pruning by subtree max end.
pub(crate) fn stab<I: Copy>(link: &Link<I>, address: u64, out: &mut Vec<IndexEntry<I>>) {
    let Some(node) = link else {
        return;
    };
    if node.max_end <= address as u128 {
        return;
    }
    stab(&node.left, address, out);
    if node.key <= address {
        if node.bucket_end > address as u128 {
            out.extend(node.entries.iter().filter(|e| e.contains(address)).copied());
        }
        stab(&node.right, address, out);
    }
}

/// Collect entries intersecting `lo..=hi`, pruning by subtree max end.
pub(crate) fn overlapping<I: Copy>(link: &Link<I>, lo: u64, hi: u64, out: &mut Vec<IndexEntry<I>>) {
    let Some(node) = link else {
        return;
    };
    if node.max_end <= lo as u128 {
        return;
    }
    overlapping(&node.left, lo, hi, out);
    if node.key <= hi {
        if node.bucket_end > lo as u128 {
            out.extend(node.entries.iter().filter(|e| e.intersects(lo, hi)).copied());
        }
        overlapping(&node.right, lo, hi, out);
    }
}

/// Walk the whole tree and assert the AVL, ordering and max-end invariants.
/// Returns the number of entries.
#[cfg(test)]
pub(crate) fn check_invariants<I>(link: &Link<I>) -> usize {
    fn walk<I>(link: &Link<I>, lo: Option<u64>, hi: Option<u64>) -> (i32, u128, usize) {
        let Some(node) = link else {
            return (0, 0, 0);
        };
        assert!(!node.entries.is_empty(), "empty bucket at {:#x}", node.key);
        assert!(lo.map_or(true, |lo| node.key > lo), "key order violated");
        assert!(hi.map_or(true, |hi| node.key < hi), "key order violated");
        assert!(node.entries.iter().all(|e| e.key() == node.key));
        let (lh, lmax, lcount) = walk(&node.left, lo, Some(node.key));
        let (rh, rmax, rcount) = walk(&node.right, Some(node.key), hi);
        assert!((lh - rh).abs() <= 1, "unbalanced at {:#x}", node.key);
        assert_eq!(node.height, 1 + lh.max(rh));
        let bucket = node.entries.iter().map(IndexEntry::end).max().unwrap_or(0);
        assert_eq!(node.bucket_end, bucket);
        assert_eq!(node.max_end, bucket.max(lmax).max(rmax));
        (node.height, node.max_end, lcount + rcount + node.entries.len())
    }
    walk(link, None, None).2
}
