use core::ops::Index;

use super::AvlTree;
use crate::Rank;
use crate::error::{Result, TreeError};

impl<V> AvlTree<V> {
    /// Returns the value stored under the `rank`-th smallest key.
    ///
    /// The rank is one-based: `select(1)` is the minimum and `select(len)` the maximum.
    /// Returns `None` if `rank` is outside `1..=len`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(30, "c").unwrap();
    /// tree.insert(10, "a").unwrap();
    /// tree.insert(20, "b").unwrap();
    ///
    /// assert_eq!(tree.select(2), Some(&"b"));
    /// assert_eq!(tree.select(0), None);
    /// assert_eq!(tree.select(4), None);
    /// ```
    #[must_use]
    pub fn select(&self, rank: usize) -> Option<&V> {
        self.select_entry(rank).map(|(_, value)| value)
    }

    /// Returns the entry with the `rank`-th smallest key (one-based).
    #[must_use]
    pub fn select_entry(&self, rank: usize) -> Option<(i64, &V)> {
        let node = self.raw.node(self.raw.select(rank)?);
        Some((node.key(), node.value()))
    }

    /// Like [`select`](AvlTree::select), but reports an out-of-range rank as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::RankOutOfRange`] if `rank` is outside `1..=len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::{AvlTree, TreeError};
    ///
    /// let tree = AvlTree::with_root(7, "seven");
    /// assert_eq!(tree.try_select(1), Ok(&"seven"));
    /// assert_eq!(tree.try_select(2), Err(TreeError::RankOutOfRange { rank: 2, len: 1 }));
    /// ```
    pub fn try_select(&self, rank: usize) -> Result<&V> {
        self.select(rank).ok_or(TreeError::RankOutOfRange { rank, len: self.len() })
    }

    /// Returns the one-based rank of `key`, or `None` if it is not in the tree.
    ///
    /// This is the inverse of [`select_entry`](AvlTree::select_entry).
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(10, ()).unwrap();
    /// tree.insert(20, ()).unwrap();
    ///
    /// assert_eq!(tree.rank_of(20), Some(2));
    /// assert_eq!(tree.rank_of(15), None);
    /// ```
    #[must_use]
    pub fn rank_of(&self, key: i64) -> Option<usize> {
        self.raw.rank_of(key)
    }

    /// Returns the sum of every key less than or equal to `threshold`.
    ///
    /// `threshold` need not be a key in the tree. The sum is 0 when the tree is empty or
    /// `threshold` is below the smallest key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// for key in [5, 1, 9, 3] {
    ///     tree.insert(key, ()).unwrap();
    /// }
    ///
    /// assert_eq!(tree.sum_up_to(0), 0);
    /// assert_eq!(tree.sum_up_to(3), 4);
    /// assert_eq!(tree.sum_up_to(8), 9);
    /// assert_eq!(tree.sum_up_to(100), 18);
    /// ```
    #[must_use]
    pub fn sum_up_to(&self, threshold: i64) -> i128 {
        self.raw.sum_up_to(threshold)
    }
}

/// Indexes into the tree by one-based rank.
///
/// # Panics
///
/// Panics if `rank` is outside `1..=len`.
///
/// # Examples
///
/// ```
/// use avl_stat_tree::{AvlTree, Rank};
///
/// let mut tree = AvlTree::new();
/// tree.insert(1, "a").unwrap();
/// tree.insert(2, "b").unwrap();
///
/// assert_eq!(tree[Rank(2)], "b");
/// ```
impl<V> Index<Rank> for AvlTree<V> {
    type Output = V;

    fn index(&self, rank: Rank) -> &Self::Output {
        self.select(rank.0).expect("rank out of bounds")
    }
}
