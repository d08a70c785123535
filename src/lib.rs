#![deny(missing_docs)]

//! This crate implements an in-memory [BTree] of keys where the node order is chosen at run time.
//!
//! Unlike a textbook B-tree, an overflowing node is not split straight away. A key is first
//! rotated through the parent into the nearest sibling that has room, which defers splits
//! (and new nodes) until a whole run of siblings is full.
//!
//! Most of the implementation is in the tree and node modules, see [BTree].
//!
//! # Example
//!
//! ```
//!     use rotating_btree::BTree;
//!     let mut tree = BTree::with_order(3).unwrap();
//!     for key in [10, 20, 30] {
//!         tree.insert(key);
//!     }
//!     assert!(!tree.insert(20));
//!     assert_eq!(tree.height(), 2);
//!
//!     let mut out = Vec::new();
//!     tree.print_inorder(&mut out).unwrap();
//!     assert_eq!(out, b"10(0) 20(0) 30(0) ");
//! ```
//!
//! # Logging
//!
//! Rotations, splits and root growth are reported as `tracing` events at trace level.

mod error;
mod node;
mod tree;
mod vecs;

pub use error::{Error, Result};
pub use tree::{BTree, InOrder, Iter};

/// Smallest order accepted by [BTree::with_order]. With order 2 a split would leave an empty node.
pub const MIN_ORDER: usize = 3;

/// Order used by [BTree::new].
pub const DEFAULT_ORDER: usize = 32;

const _: () = assert!(DEFAULT_ORDER >= MIN_ORDER);

// Tests.

/* mimalloc cannot be used with miri */
#[cfg(all(test, not(miri)))]
use mimalloc::MiMalloc;

#[cfg(all(test, not(miri)))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
