//! Integrity checks and structure dumps for troubleshooting.

use std::fmt::{self, Write};

use crate::arena::{Arena, Linked, NodeRef};
use crate::avl::AvlMap;
use crate::error::Violation;
use crate::interval::IntervalTree;

/// Walk every reachable node and check stored heights and balance factors.
fn check_shape<N: Linked>(nodes: &Arena<N>, root: NodeRef, issues: &mut Vec<Violation>) {
    let mut reachable = 0usize;
    let mut stack = Vec::new();
    if !root.is_null() {
        stack.push(root);
    }
    while let Some(at) = stack.pop() {
        reachable += 1;
        let node = &nodes[at];
        let expected = nodes.fresh_height(at);
        if node.height() != expected {
            issues.push(Violation::Height {
                node: at.index(),
                stored: node.height(),
                expected,
            });
        }
        let balance = nodes.balance(at);
        if !(-1..=1).contains(&balance) {
            issues.push(Violation::Unbalanced {
                node: at.index(),
                balance,
            });
        }
        for child in [node.left(), node.right()] {
            if !child.is_null() {
                stack.push(child);
            }
        }
    }
    if reachable != nodes.live() {
        issues.push(Violation::Leaked {
            live: nodes.live(),
            reachable,
        });
    }
}

fn check_sorted<'a, K: Ord + 'a>(keys: impl Iterator<Item = &'a K>, issues: &mut Vec<Violation>) {
    let mut prev: Option<&K> = None;
    for (position, key) in keys.enumerate() {
        if prev.is_some_and(|p| key < p) {
            issues.push(Violation::Order { position });
        }
        prev = Some(key);
    }
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Verify tree integrity; returns every problem found.
    ///
    /// Checks cached heights, the AVL balance bound, in-order key order, and
    /// that every live arena slot is reachable from the root.
    pub fn verify_integrity(&self) -> Vec<Violation> {
        let mut issues = Vec::new();
        check_shape(&self.nodes, self.root, &mut issues);
        check_sorted(self.iter().map(|(k, _)| k), &mut issues);
        issues
    }
}

impl<K: fmt::Debug, V> AvlMap<K, V> {
    /// Render the tree sideways, one node per line, children indented.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        dump_node(&self.nodes, self.root, 0, &mut out, |n| format!("{:?}", n.key));
        out
    }
}

impl<T: Ord + Copy, V> IntervalTree<T, V> {
    /// Verify tree integrity; returns every problem found.
    ///
    /// In addition to the shape and order checks of
    /// [`AvlMap::verify_integrity`], every cached `max_end` must equal the
    /// largest high endpoint in its subtree.
    pub fn verify_integrity(&self) -> Vec<Violation> {
        let mut issues = Vec::new();
        check_shape(&self.nodes, self.root, &mut issues);
        check_sorted(self.iter().map(|(i, _)| &i.low), &mut issues);
        self.check_max_end(self.root, &mut issues);
        issues
    }

    /// Returns the true maximum high endpoint under `at`.
    fn check_max_end(&self, at: NodeRef, issues: &mut Vec<Violation>) -> Option<T> {
        if at.is_null() {
            return None;
        }
        let node = &self.nodes[at];
        let mut max_end = node.interval.high;
        for child in [node.left, node.right] {
            if let Some(end) = self.check_max_end(child, issues) {
                max_end = max_end.max(end);
            }
        }
        if node.max_end != max_end {
            issues.push(Violation::MaxEnd { node: at.index() });
        }
        Some(max_end)
    }
}

impl<T: fmt::Debug, V> IntervalTree<T, V> {
    /// Render the tree sideways with each node's interval and `max_end`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        dump_node(&self.nodes, self.root, 0, &mut out, |n| {
            format!(
                "[{:?}, {:?}] max_end={:?}",
                n.interval.low, n.interval.high, n.max_end
            )
        });
        out
    }
}

fn dump_node<N: Linked>(
    nodes: &Arena<N>,
    at: NodeRef,
    depth: usize,
    out: &mut String,
    label: impl Fn(&N) -> String + Copy,
) {
    if at.is_null() {
        if depth == 0 {
            out.push_str("(empty)\n");
        }
        return;
    }
    let node = &nodes[at];
    dump_node(nodes, node.right(), depth + 1, out, label);
    let _ = writeln!(
        out,
        "{}{} (h={})",
        "    ".repeat(depth),
        label(node),
        node.height()
    );
    dump_node(nodes, node.left(), depth + 1, out, label);
}
