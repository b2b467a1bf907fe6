//! An AVL tree over `i64` keys with order-statistic and prefix-sum augmentation.
//!
//! [`AvlTree`] is an ordered map that keeps itself height-balanced and caches, at every node,
//! the height, size, and key sum of the subtree below it. On top of the usual map operations
//! this gives O(log n):
//!
//! - [`select`](AvlTree::select) - The value at a given one-based position in key order
//! - [`rank_of`](AvlTree::rank_of) - The one-based position of a key
//! - [`sum_up_to`](AvlTree::sum_up_to) - The sum of all keys at or below a threshold
//! - Indexing by [`Rank`] - e.g., `tree[Rank(1)]` for the value under the smallest key
//!
//! # Example
//!
//! ```
//! use avl_stat_tree::{AvlTree, Rank, TreeError};
//!
//! let mut scores = AvlTree::new();
//! for (id, name) in [(40, "Dana"), (10, "Alice"), (30, "Carol"), (20, "Bob")] {
//!     scores.insert(id, name)?;
//! }
//!
//! assert_eq!(scores.get(30), Some(&"Carol"));
//! assert_eq!(scores.len(), 4);
//!
//! // Order-statistic operations (O(log n)).
//! assert_eq!(scores.select(2), Some(&"Bob"));
//! assert_eq!(scores.rank_of(40), Some(4));
//! assert_eq!(scores[Rank(1)], "Alice");
//!
//! // Prefix sums over the keys themselves.
//! assert_eq!(scores.sum_up_to(25), 30);
//!
//! // Mutations report the rotations they needed; misses are errors.
//! assert_eq!(scores.delete(50), Err(TreeError::KeyNotFound { key: 50 }));
//! # Ok::<(), TreeError>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Arena storage** - Nodes live in one contiguous allocation and refer to each other by index
//! - **Rebalancing counts** - `insert` and `delete` return the number of rotations performed
//!
//! # Logging
//!
//! Structural steps are reported through [`tracing`]: rotations and per-key inserts and deletes
//! at `TRACE`, and any mutation that rotated at `DEBUG`. No subscriber is installed by this crate.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod order_statistic;
mod raw;

pub mod avl_tree;

pub use avl_tree::AvlTree;
pub use error::{Result, TreeError};
pub use order_statistic::Rank;
