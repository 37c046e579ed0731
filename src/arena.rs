//! Slot arena shared by both trees.
//!
//! Nodes live in a single `Vec` and refer to each other through 32-bit
//! indices instead of boxed pointers. A rotation rewrites a handful of
//! indices and never moves or clones a node. Freed slots are kept on a free
//! list and handed out again by the next allocation.

use std::ops::{Index, IndexMut};

/// A 32-bit reference to a node slot in an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeRef(u32);

impl NodeRef {
    pub(crate) const NULL: NodeRef = NodeRef(u32::MAX);

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    fn new(idx: usize) -> Self {
        assert!(idx < u32::MAX as usize, "node arena exceeds u32 slots");
        NodeRef(idx as u32)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::NULL
    }
}

/// Child links and cached height, the part of a node the arena needs to
/// answer height and balance questions.
pub(crate) trait Linked {
    fn left(&self) -> NodeRef;
    fn right(&self) -> NodeRef;
    fn height(&self) -> u8;

    fn set_left(&mut self, r: NodeRef);
    fn set_right(&mut self, r: NodeRef);
}

#[derive(Clone)]
pub(crate) struct Arena<N> {
    slots: Vec<Option<N>>,
    free: Vec<u32>,
    live: usize,
}

impl<N> Arena<N> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn alloc(&mut self, node: N) -> NodeRef {
        self.live += 1;
        match self.free.pop() {
            Some(idx) => {
                debug_assert!(self.slots[idx as usize].is_none());
                self.slots[idx as usize] = Some(node);
                NodeRef(idx)
            }
            None => {
                let r = NodeRef::new(self.slots.len());
                self.slots.push(Some(node));
                r
            }
        }
    }

    /// Release a slot, returning the node that occupied it.
    ///
    /// # Panics
    /// Panics if the slot is already free.
    pub(crate) fn free(&mut self, r: NodeRef) -> N {
        let idx = r.index();
        match self.slots[idx].take() {
            Some(node) => {
                self.live -= 1;
                self.free.push(idx as u32);
                node
            }
            None => panic!("double free of node slot {idx}"),
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    pub(crate) fn memory_usage(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Option<N>>()
            + self.free.capacity() * std::mem::size_of::<u32>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}

impl<N: Linked> Arena<N> {
    #[inline]
    pub(crate) fn height(&self, r: NodeRef) -> u8 {
        if r.is_null() {
            0
        } else {
            self[r].height()
        }
    }

    /// Left height minus right height; 0 for an absent node.
    #[inline]
    pub(crate) fn balance(&self, r: NodeRef) -> i32 {
        if r.is_null() {
            return 0;
        }
        let node = &self[r];
        self.height(node.left()) as i32 - self.height(node.right()) as i32
    }

    /// Height implied by the node's children.
    #[inline]
    pub(crate) fn fresh_height(&self, r: NodeRef) -> u8 {
        let node = &self[r];
        1 + self.height(node.left()).max(self.height(node.right()))
    }

    /// Rebuild the arena so the subtree under `root` occupies slots
    /// `0..live` in pre-order. Returns the new root and how many nodes
    /// changed slot.
    pub(crate) fn compact(&mut self, root: NodeRef) -> (NodeRef, usize) {
        let live = self.live;
        let mut old = std::mem::replace(self, Arena::with_capacity(live));
        if root.is_null() {
            return (NodeRef::NULL, 0);
        }

        let mut moved = 0usize;
        // (old slot, new parent, attach as left child)
        let mut stack: Vec<(NodeRef, NodeRef, bool)> = vec![(root, NodeRef::NULL, false)];
        let mut new_root = NodeRef::NULL;
        while let Some((old_ref, parent, is_left)) = stack.pop() {
            let mut node = old.free(old_ref);
            let (left, right) = (node.left(), node.right());
            node.set_left(NodeRef::NULL);
            node.set_right(NodeRef::NULL);
            let new_ref = self.alloc(node);
            if new_ref != old_ref {
                moved += 1;
            }
            if parent.is_null() {
                new_root = new_ref;
            } else if is_left {
                self[parent].set_left(new_ref);
            } else {
                self[parent].set_right(new_ref);
            }
            if !right.is_null() {
                stack.push((right, new_ref, false));
            }
            if !left.is_null() {
                stack.push((left, new_ref, true));
            }
        }
        debug_assert_eq!(old.live(), 0, "compaction left unreachable nodes behind");
        (new_root, moved)
    }
}

impl<N> Index<NodeRef> for Arena<N> {
    type Output = N;

    fn index(&self, r: NodeRef) -> &N {
        match &self.slots[r.index()] {
            Some(node) => node,
            None => panic!("node slot {} is free", r.0),
        }
    }
}

impl<N> IndexMut<NodeRef> for Arena<N> {
    fn index_mut(&mut self, r: NodeRef) -> &mut N {
        match &mut self.slots[r.index()] {
            Some(node) => node,
            None => panic!("node slot {} is free", r.0),
        }
    }
}
