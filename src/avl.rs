//! Self-balancing ordered map.
//!
//! A binary search tree kept height-balanced with AVL rotations. Keys that
//! compare strictly less than a node go left, everything else (including an
//! equal key) goes right. Duplicate keys are therefore stored, not merged;
//! lookups and deletes act on the first equal key met while descending from
//! the root, so an earlier duplicate can shadow a later one.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use log::{debug, trace};

use crate::arena::{Arena, Linked, NodeRef};
use crate::Config;

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: NodeRef,
    pub(crate) right: NodeRef,
    pub(crate) height: u8,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            left: NodeRef::NULL,
            right: NodeRef::NULL,
            height: 1,
        }
    }
}

impl<K, V> Linked for Node<K, V> {
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

/// Visiting order for [`AvlMap::traverse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// Left, node, right. Yields keys in ascending order.
    InOrder,
    /// Node, left, right.
    PreOrder,
    /// Left, right, node.
    PostOrder,
    /// Level by level, left to right.
    BreadthFirst,
}

/// An ordered map balanced with AVL rotations.
///
/// # Example
///
/// ```rust
/// use avl_index::AvlMap;
///
/// let mut map = AvlMap::new();
/// for k in [8, 9, 10, 2, 1, 5, 3, 6, 4, 7] {
///     map.insert(k, k * 10);
/// }
///
/// assert_eq!(map.search(&6), Some(&60));
/// assert_eq!(map.bforder(), vec![&5, &3, &8, &2, &4, &6, &9, &1, &7, &10]);
/// ```
#[derive(Clone)]
pub struct AvlMap<K, V> {
    pub(crate) nodes: Arena<Node<K, V>>,
    pub(crate) root: NodeRef,
}

impl<K, V> AvlMap<K, V> {
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

    /// Number of stored entries, counted by walking the tree.
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

    /// Height of the root, `0` for an empty map.
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

    /// Rewrite the node arena so live nodes are stored densely.
    ///
    /// Deletes leave free slots that later inserts reuse; this drops them
    /// outright. Returns the number of nodes that changed slot.
    pub fn compact(&mut self) -> usize {
        let (root, moved) = self.nodes.compact(self.root);
        self.root = root;
        debug!("avl: compacted arena, {moved} nodes relocated");
        moved
    }

    /// Call `visit` on every entry in the given order.
    pub fn traverse<'a>(&'a self, order: Traversal, mut visit: impl FnMut(&'a K, &'a V)) {
        match order {
            Traversal::InOrder => self.walk_in(self.root, &mut visit),
            Traversal::PreOrder => self.walk_pre(self.root, &mut visit),
            Traversal::PostOrder => self.walk_post(self.root, &mut visit),
            Traversal::BreadthFirst => {
                if self.root.is_null() {
                    return;
                }
                let mut queue = VecDeque::new();
                queue.push_back(self.root);
                while let Some(at) = queue.pop_front() {
                    let node = &self.nodes[at];
                    visit(&node.key, &node.value);
                    if !node.left.is_null() {
                        queue.push_back(node.left);
                    }
                    if !node.right.is_null() {
                        queue.push_back(node.right);
                    }
                }
            }
        }
    }

    fn walk_in<'a, F: FnMut(&'a K, &'a V)>(&'a self, at: NodeRef, visit: &mut F) {
        if at.is_null() {
            return;
        }
        let node = &self.nodes[at];
        self.walk_in(node.left, visit);
        visit(&node.key, &node.value);
        self.walk_in(node.right, visit);
    }

    fn walk_pre<'a, F: FnMut(&'a K, &'a V)>(&'a self, at: NodeRef, visit: &mut F) {
        if at.is_null() {
            return;
        }
        let node = &self.nodes[at];
        visit(&node.key, &node.value);
        self.walk_pre(node.left, visit);
        self.walk_pre(node.right, visit);
    }

    fn walk_post<'a, F: FnMut(&'a K, &'a V)>(&'a self, at: NodeRef, visit: &mut F) {
        if at.is_null() {
            return;
        }
        let node = &self.nodes[at];
        self.walk_post(node.left, visit);
        self.walk_post(node.right, visit);
        visit(&node.key, &node.value);
    }

    /// Keys in the given order.
    pub fn keys(&self, order: Traversal) -> Vec<&K> {
        let mut keys = Vec::new();
        self.traverse(order, |k, _| keys.push(k));
        keys
    }

    pub fn inorder(&self) -> Vec<&K> {
        self.keys(Traversal::InOrder)
    }

    pub fn preorder(&self) -> Vec<&K> {
        self.keys(Traversal::PreOrder)
    }

    pub fn postorder(&self) -> Vec<&K> {
        self.keys(Traversal::PostOrder)
    }

    pub fn bforder(&self) -> Vec<&K> {
        self.keys(Traversal::BreadthFirst)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            map: self,
            stack: Vec::with_capacity(self.height()),
        };
        iter.push_left_spine(self.root);
        iter
    }
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Insert an entry. An equal key already present is kept; the new entry
    /// is placed to its right.
    pub fn insert(&mut self, key: K, value: V) {
        self.root = self.insert_at(self.root, key, value);
    }

    fn insert_at(&mut self, at: NodeRef, key: K, value: V) -> NodeRef {
        if at.is_null() {
            return self.nodes.alloc(Node::leaf(key, value));
        }
        if key < self.nodes[at].key {
            let left = self.insert_at(self.nodes[at].left, key, value);
            self.nodes[at].left = left;
        } else {
            let right = self.insert_at(self.nodes[at].right, key, value);
            self.nodes[at].right = right;
        }
        self.update_height(at);
        self.rebalance(at)
    }

    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let at = self.find(key);
        if at.is_null() {
            None
        } else {
            Some(&self.nodes[at].value)
        }
    }

    pub fn search_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let at = self.find(key);
        if at.is_null() {
            None
        } else {
            Some(&mut self.nodes[at].value)
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        !self.find(key).is_null()
    }

    fn find<Q>(&self, key: &Q) -> NodeRef
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut at = self.root;
        while !at.is_null() {
            let node = &self.nodes[at];
            at = match key.cmp(node.key.borrow()) {
                Ordering::Equal => return at,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        NodeRef::NULL
    }

    /// Remove the first entry found for `key` and return its value.
    ///
    /// A missing key leaves the map untouched.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = self.delete_at(self.root, key);
        self.root = root;
        if removed.is_none() {
            debug!("avl: delete found no matching key");
        }
        removed
    }

    fn delete_at<Q>(&mut self, at: NodeRef, key: &Q) -> (NodeRef, Option<V>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if at.is_null() {
            return (at, None);
        }
        let (ord, left, right) = {
            let node = &self.nodes[at];
            (key.cmp(node.key.borrow()), node.left, node.right)
        };

        let removed = match ord {
            Ordering::Less => {
                let (left, removed) = self.delete_at(left, key);
                self.nodes[at].left = left;
                removed
            }
            Ordering::Greater => {
                let (right, removed) = self.delete_at(right, key);
                self.nodes[at].right = right;
                removed
            }
            Ordering::Equal => {
                if left.is_null() || right.is_null() {
                    let node = self.nodes.free(at);
                    let child = if left.is_null() { right } else { left };
                    return (child, Some(node.value));
                }
                // Two children: move the in-order successor into this slot.
                let (right, successor) = self.detach_min(right);
                let successor = self.nodes.free(successor);
                let node = &mut self.nodes[at];
                node.right = right;
                node.key = successor.key;
                Some(std::mem::replace(&mut node.value, successor.value))
            }
        };

        if removed.is_none() {
            return (at, None);
        }
        self.update_height(at);
        (self.rebalance(at), removed)
    }

    /// Unlink the leftmost node under `at`, rebalancing the path back up.
    /// Returns the new subtree root and the detached (still allocated) node.
    fn detach_min(&mut self, at: NodeRef) -> (NodeRef, NodeRef) {
        let left = self.nodes[at].left;
        if left.is_null() {
            let right = self.nodes[at].right;
            self.nodes[at].right = NodeRef::NULL;
            return (right, at);
        }
        let (left, min) = self.detach_min(left);
        self.nodes[at].left = left;
        self.update_height(at);
        (self.rebalance(at), min)
    }

    #[inline]
    fn update_height(&mut self, at: NodeRef) {
        self.nodes[at].height = self.nodes.fresh_height(at);
    }

    fn rebalance(&mut self, at: NodeRef) -> NodeRef {
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

    fn rotate_left(&mut self, z: NodeRef) -> NodeRef {
        let y = self.nodes[z].right;
        let t2 = self.nodes[y].left;
        self.nodes[y].left = z;
        self.nodes[z].right = t2;
        self.update_height(z);
        self.update_height(y);
        trace!("avl: rotate left at slot {}", z.index());
        y
    }

    fn rotate_right(&mut self, z: NodeRef) -> NodeRef {
        let y = self.nodes[z].left;
        let t3 = self.nodes[y].right;
        self.nodes[y].right = z;
        self.nodes[z].left = t3;
        self.update_height(z);
        self.update_height(y);
        trace!("avl: rotate right at slot {}", z.index());
        y
    }
}

impl<K, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over an [`AvlMap`].
pub struct Iter<'a, K, V> {
    map: &'a AvlMap<K, V>,
    stack: Vec<NodeRef>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left_spine(&mut self, mut at: NodeRef) {
        while !at.is_null() {
            self.stack.push(at);
            at = self.map.nodes[at].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.stack.pop()?;
        let map = self.map;
        let node = &map.nodes[at];
        self.push_left_spine(node.right);
        Some((&node.key, &node.value))
    }
}
