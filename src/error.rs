/// Errors reported by [`AvlTree`](crate::AvlTree) operations.
///
/// Every error is reported before any structural change, so the tree is left exactly as it was.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum TreeError {
    /// An insert named a key that is already in the tree.
    #[error("key {key} is already present in the tree")]
    DuplicateKey {
        /// The rejected key.
        key: i64,
    },
    /// A delete named a key that is not in the tree.
    #[error("key {key} is not present in the tree")]
    KeyNotFound {
        /// The missing key.
        key: i64,
    },
    /// A rank fell outside `1..=len`.
    #[error("rank {rank} is out of range for a tree of {len} keys")]
    RankOutOfRange {
        /// The requested one-based rank.
        rank: usize,
        /// The number of keys in the tree.
        len: usize,
    },
}

/// A `Result` whose error defaults to [`TreeError`].
pub type Result<T, E = TreeError> = core::result::Result<T, E>;
