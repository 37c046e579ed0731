//! Interval tree augmented with a per-subtree maximum endpoint.
//!
//! Nodes are ordered by the low endpoint only (ties go right) and each node
//! caches `max_end`, the largest high endpoint stored in its subtree. The
//! overlap query uses that aggregate to skip left subtrees that end before
//! the query starts, and stops descending right once a node starts after the
//! query ends.

use std::cmp::Ordering;
use std::fmt;

use log::{debug, trace};

use crate::arena::{Arena, Linked, NodeRef};
use crate::error::{Error, Result};
use crate::Config;

/// A closed interval `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    pub low: T,
    pub high: T,
}

impl<T: Ord> Interval<T> {
    /// Build an interval, rejecting `low > high`.
    pub fn new(low: T, high: T) -> Result<Self> {
        if low > high {
            return Err(Error::InvalidInterval);
        }
        Ok(Self { low, high })
    }

    /// Whether this interval shares at least one point with `[low, high]`.
    #[inline]
    pub fn overlaps(&self, low: &T, high: &T) -> bool {
        self.low <= *high && self.high >= *low
    }
}

#[derive(Clone)]
pub(crate) struct Node<T, V> {
    pub(crate) interval: Interval<T>,
    pub(crate) value: V,
    pub(crate) left: NodeRef,
    pub(crate) right: NodeRef,
    pub(crate) height: u8,
    pub(crate) max_end: T,
}

impl<T: Copy, V> Node<T, V> {
    fn leaf(interval: Interval<T>, value: V) -> Self {
        Self {
            max_end: interval.high,
            interval,
            value,
            left: NodeRef::NULL,
            right: NodeRef::NULL,
            height: 1,
        }
    }
}

impl<T, V> Linked for Node<T, V> {
    #[inline]
    fn left(&self) -> NodeRef {
        self.left
    }
    #[inline]
    fn right(&self) -> NodeRef {
        self.right
    }
    #[inline]
    fn height(&self) -> u8 {
        self.height
    }
    #[inline]
    fn set_left(&mut self, r: NodeRef) {
        self.left = r;
    }
    #[inline]
    fn set_right(&mut self, r: NodeRef) {
        self.right = r;
    }
}

/// An AVL-balanced interval tree with O(log n + m) overlap queries.
///
/// # Example
///
/// ```rust
/// use avl_index::IntervalTree;
///
/// let mut tree = IntervalTree::new();
/// tree.insert(300, 360, "GOOGL");
/// tree.insert(196, 220, "UBER");
/// tree.insert(180, 210, "ORCL");
///
/// let mut hits = tree.range_query(180, 220);
/// hits.sort();
/// assert_eq!(hits, vec![&"ORCL", &"UBER"]);
/// assert_eq!(tree.top_k(1), vec![&"GOOGL"]);
/// ```
#[derive(Clone)]
pub struct IntervalTree<T, V> {
    pub(crate) nodes: Arena<Node<T, V>>,
    pub(crate) root: NodeRef,
}

impl<T, V> IntervalTree<T, V> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(Config::default().with_initial_capacity(capacity))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            nodes: Arena::with_capacity(config.initial_capacity),
            root: NodeRef::NULL,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// Number of stored intervals, counted by walking the tree.
    pub fn size(&self) -> usize {
        self.count(self.root)
    }

    fn count(&self, at: NodeRef) -> usize {
        if at.is_null() {
            return 0;
        }
        let node = &self.nodes[at];
        1 + self.count(node.left) + self.count(node.right)
    }

    pub fn height(&self) -> usize {
        self.nodes.height(self.root) as usize
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NodeRef::NULL;
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.memory_usage()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Rewrite the node arena so live nodes are stored densely. Returns the
    /// number of nodes that changed slot.
    pub fn compact(&mut self) -> usize {
        let (root, moved) = self.nodes.compact(self.root);
        self.root = root;
        debug!("interval: compacted arena, {moved} nodes relocated");
        moved
    }

    /// Up to `k` values in descending order of low endpoint.
    pub fn top_k(&self, k: usize) -> Vec<&V> {
        let mut out = Vec::with_capacity(k.min(64));
        self.collect_desc(self.root, k, &mut out);
        out
    }

    fn collect_desc<'a>(&'a self, at: NodeRef, k: usize, out: &mut Vec<&'a V>) {
        if at.is_null() || out.len() >= k {
            return;
        }
        let node = &self.nodes[at];
        self.collect_desc(node.right, k, out);
        if out.len() < k {
            out.push(&node.value);
            self.collect_desc(node.left, k, out);
        }
    }

    /// Up to `k` values in ascending order of low endpoint.
    pub fn bottom_k(&self, k: usize) -> Vec<&V> {
        let mut out = Vec::with_capacity(k.min(64));
        self.collect_asc(self.root, k, &mut out);
        out
    }

    fn collect_asc<'a>(&'a self, at: NodeRef, k: usize, out: &mut Vec<&'a V>) {
        if at.is_null() || out.len() >= k {
            return;
        }
        let node = &self.nodes[at];
        self.collect_asc(node.left, k, out);
        if out.len() < k {
            out.push(&node.value);
            self.collect_asc(node.right, k, out);
        }
    }

    /// Entries in ascending order of low endpoint.
    pub fn iter(&self) -> Iter<'_, T, V> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::with_capacity(self.height()),
        };
        iter.push_left_spine(self.root);
        iter
    }
}

impl<T: Ord + Copy, V> IntervalTree<T, V> {
    /// Largest high endpoint stored, or `None` when empty.
    pub fn max_end(&self) -> Option<T> {
        if self.root.is_null() {
            None
        } else {
            Some(self.nodes[self.root].max_end)
        }
    }

    /// Insert `[low, high]`. The caller guarantees `low <= high`; use
    /// [`try_insert`](Self::try_insert) to have it checked.
    pub fn insert(&mut self, low: T, high: T, value: V) {
        let interval = Interval { low, high };
        self.root = self.insert_at(self.root, interval, value);
    }

    pub fn try_insert(&mut self, low: T, high: T, value: V) -> Result<()> {
        let interval = Interval::new(low, high)?;
        self.root = self.insert_at(self.root, interval, value);
        Ok(())
    }

    fn insert_at(&mut self, at: NodeRef, interval: Interval<T>, value: V) -> NodeRef {
        if at.is_null() {
            return self.nodes.alloc(Node::leaf(interval, value));
        }
        let low = interval.low;
        if low < self.nodes[at].interval.low {
            let left = self.insert_at(self.nodes[at].left, interval, value);
            self.nodes[at].left = left;
        } else {
            let right = self.insert_at(self.nodes[at].right, interval, value);
            self.nodes[at].right = right;
        }
        self.refresh(at);
        self.rebalance_after_insert(at, low)
    }

    /// Pick the rotation by where `low` went below the heavy child. An equal
    /// low went right of that child, same as the descent.
    fn rebalance_after_insert(&mut self, at: NodeRef, low: T) -> NodeRef {
        let balance = self.nodes.balance(at);
        if balance > 1 {
            let left = self.nodes[at].left;
            if low >= self.nodes[left].interval.low {
                let left = self.rotate_left(left);
                self.nodes[at].left = left;
            }
            return self.rotate_right(at);
        }
        if balance < -1 {
            let right = self.nodes[at].right;
            if low < self.nodes[right].interval.low {
                let right = self.rotate_right(right);
                self.nodes[at].right = right;
            }
            return self.rotate_left(at);
        }
        at
    }

    /// Remove the first interval found whose low endpoint equals `low` and
    /// return its value.
    ///
    /// Only `low` steers the search, so among several intervals sharing a low
    /// endpoint the one met first on the way down is removed, whatever its
    /// high endpoint.
    pub fn delete(&mut self, low: T, high: T) -> Option<V> {
        let (root, removed) = self.delete_at(self.root, low);
        self.root = root;
        match removed {
            Some((interval, value)) => {
                if interval.high != high {
                    debug!("interval: delete removed an interval with the same low but a different high");
                }
                Some(value)
            }
            None => {
                debug!("interval: delete found no interval with the requested low");
                None
            }
        }
    }

    fn delete_at(&mut self, at: NodeRef, low: T) -> (NodeRef, Option<(Interval<T>, V)>) {
        if at.is_null() {
            return (at, None);
        }
        let (ord, left, right) = {
            let node = &self.nodes[at];
            (low.cmp(&node.interval.low), node.left, node.right)
        };

        let removed = match ord {
            Ordering::Less => {
                let (left, removed) = self.delete_at(left, low);
                self.nodes[at].left = left;
                removed
            }
            Ordering::Greater => {
                let (right, removed) = self.delete_at(right, low);
                self.nodes[at].right = right;
                removed
            }
            Ordering::Equal => {
                if left.is_null() || right.is_null() {
                    let node = self.nodes.free(at);
                    let child = if left.is_null() { right } else { left };
                    return (child, Some((node.interval, node.value)));
                }
                let (right, successor) = self.detach_min(right);
                let successor = self.nodes.free(successor);
                let node = &mut self.nodes[at];
                node.right = right;
                let interval = std::mem::replace(&mut node.interval, successor.interval);
                let value = std::mem::replace(&mut node.value, successor.value);
                Some((interval, value))
            }
        };

        if removed.is_none() {
            return (at, None);
        }
        self.refresh(at);
        (self.rebalance_after_delete(at), removed)
    }

    fn detach_min(&mut self, at: NodeRef) -> (NodeRef, NodeRef) {
        let left = self.nodes[at].left;
        if left.is_null() {
            let right = self.nodes[at].right;
            self.nodes[at].right = NodeRef::NULL;
            return (right, at);
        }
        let (left, min) = self.detach_min(left);
        self.nodes[at].left = left;
        self.refresh(at);
        (self.rebalance_after_delete(at), min)
    }

    /// Sign-based rebalance: a heavy child leaning the other way gets a
    /// double rotation, a level one a single rotation.
    fn rebalance_after_delete(&mut self, at: NodeRef) -> NodeRef {
        let balance = self.nodes.balance(at);
        if balance > 1 {
            let left = self.nodes[at].left;
            if self.nodes.balance(left) < 0 {
                let left = self.rotate_left(left);
                self.nodes[at].left = left;
            }
            return self.rotate_right(at);
        }
        if balance < -1 {
            let right = self.nodes[at].right;
            if self.nodes.balance(right) > 0 {
                let right = self.rotate_right(right);
                self.nodes[at].right = right;
            }
            return self.rotate_left(at);
        }
        at
    }

    /// Delete `[low, high]` and insert `[new_low, new_high]` carrying
    /// `value`. Returns the value removed by the delete step.
    pub fn update(&mut self, low: T, high: T, new_low: T, new_high: T, value: V) -> Option<V> {
        let old = self.delete(low, high);
        self.insert(new_low, new_high, value);
        old
    }

    /// Values of every stored interval overlapping `[low, high]`.
    pub fn range_query(&self, low: T, high: T) -> Vec<&V> {
        self.overlapping(low, high)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Intervals and values overlapping `[low, high]`, in the same order as
    /// [`range_query`](Self::range_query).
    pub fn overlapping(&self, low: T, high: T) -> Vec<(&Interval<T>, &V)> {
        let mut out = Vec::new();
        self.search_overlaps(self.root, &low, &high, &mut out);
        out
    }

    fn search_overlaps<'a>(
        &'a self,
        at: NodeRef,
        low: &T,
        high: &T,
        out: &mut Vec<(&'a Interval<T>, &'a V)>,
    ) {
        if at.is_null() {
            return;
        }
        let node = &self.nodes[at];
        if node.interval.overlaps(low, high) {
            out.push((&node.interval, &node.value));
        }
        // Nothing on the left reaches `low` unless its max_end does.
        if !node.left.is_null() && self.nodes[node.left].max_end >= *low {
            self.search_overlaps(node.left, low, high, out);
        }
        // Everything on the right starts at or after this node.
        if node.interval.low <= *high {
            self.search_overlaps(node.right, low, high, out);
        }
    }

    /// Recompute height and max_end from the children.
    fn refresh(&mut self, at: NodeRef) {
        let height = self.nodes.fresh_height(at);
        let node = &self.nodes[at];
        let mut max_end = node.interval.high;
        for child in [node.left, node.right] {
            if !child.is_null() {
                max_end = max_end.max(self.nodes[child].max_end);
            }
        }
        let node = &mut self.nodes[at];
        node.height = height;
        node.max_end = max_end;
    }

    fn rotate_left(&mut self, z: NodeRef) -> NodeRef {
        let y = self.nodes[z].right;
        let t2 = self.nodes[y].left;
        self.nodes[y].left = z;
        self.nodes[z].right = t2;
        self.refresh(z);
        self.refresh(y);
        trace!("interval: rotate left at slot {}", z.index());
        y
    }

    fn rotate_right(&mut self, z: NodeRef) -> NodeRef {
        let y = self.nodes[z].left;
        let t3 = self.nodes[y].right;
        self.nodes[y].right = z;
        self.nodes[z].left = t3;
        self.refresh(z);
        self.refresh(y);
        trace!("interval: rotate right at slot {}", z.index());
        y
    }
}

impl<T, V> Default for IntervalTree<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, V: fmt::Debug> fmt::Debug for IntervalTree<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: Ord + Copy, V> FromIterator<(Interval<T>, V)> for IntervalTree<T, V> {
    fn from_iter<I: IntoIterator<Item = (Interval<T>, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        for (interval, value) in iter {
            tree.insert(interval.low, interval.high, value);
        }
        tree
    }
}

impl<'a, T, V> IntoIterator for &'a IntervalTree<T, V> {
    type Item = (&'a Interval<T>, &'a V);
    type IntoIter = Iter<'a, T, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T, V> {
    tree: &'a IntervalTree<T, V>,
    stack: Vec<NodeRef>,
}

impl<'a, T, V> Iter<'a, T, V> {
    fn push_left_spine(&mut self, mut at: NodeRef) {
        while !at.is_null() {
            self.stack.push(at);
            at = self.tree.nodes[at].left;
        }
    }
}

impl<'a, T, V> Iterator for Iter<'a, T, V> {
    type Item = (&'a Interval<T>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.stack.pop()?;
        let tree = self.tree;
        let node = &tree.nodes[at];
        self.push_left_spine(node.right);
        Some((&node.interval, &node.value))
    }
}
