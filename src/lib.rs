//! # avl-index
//!
//! Two height-balanced binary search trees sharing one arena layout:
//!
//! - [`AvlMap`]: an ordered key-value map kept balanced with AVL rotations,
//!   with point lookup, delete, and the four classic traversals.
//! - [`IntervalTree`]: closed intervals keyed by their low endpoint, each node
//!   augmented with the largest high endpoint in its subtree so overlap
//!   queries run in O(log n + m).
//!
//! Nodes live in a per-tree arena and link to each other through 32-bit
//! indices, so a rotation is a few index writes.
//!
//! ## Example
//!
//! ```rust
//! use avl_index::{AvlMap, IntervalTree};
//!
//! let mut map = AvlMap::new();
//! map.insert(2, "two");
//! map.insert(1, "one");
//! assert_eq!(map.search(&1), Some(&"one"));
//! assert_eq!(map.inorder(), vec![&1, &2]);
//!
//! let mut ranges = IntervalTree::new();
//! ranges.insert(10, 20, 'a');
//! ranges.insert(15, 40, 'b');
//! ranges.insert(50, 60, 'c');
//! let mut hits = ranges.range_query(18, 30);
//! hits.sort();
//! assert_eq!(hits, vec![&'a', &'b']);
//! ```
//!
//! Neither tree synchronizes access. Share one across threads behind a lock.

#![warn(clippy::all)]

mod arena;
mod config;
mod debug;
mod error;

pub mod avl;
pub mod interval;

pub use avl::{AvlMap, Traversal};
pub use config::Config;
pub use error::{Error, Result, Violation};
pub use interval::{Interval, IntervalTree};

#[cfg(test)]
mod proptests;
