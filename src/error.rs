//! Error and diagnostic types.

use thiserror::Error;

/// Errors returned by the validating entry points.
///
/// The core tree operations never fail; a missing key is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid interval: low endpoint is greater than high endpoint")]
    InvalidInterval,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A structural problem found by `verify_integrity`.
///
/// `node` is the arena slot of the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("node {node}: stored height {stored}, children imply {expected}")]
    Height { node: usize, stored: u8, expected: u8 },

    #[error("node {node}: balance factor {balance} outside -1..=1")]
    Unbalanced { node: usize, balance: i32 },

    #[error("in-order position {position}: key is smaller than its predecessor")]
    Order { position: usize },

    #[error("node {node}: cached max_end is stale")]
    MaxEnd { node: usize },

    #[error("arena holds {live} live nodes but {reachable} are reachable from the root")]
    Leaked { live: usize, reachable: usize },
}
