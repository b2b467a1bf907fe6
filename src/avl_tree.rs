use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

use crate::error::Result;
use crate::raw::{Handle, RawAvlTree};

mod capacity;
mod order_statistic;

pub use crate::Rank;

/// An ordered map from distinct `i64` keys to values, kept height-balanced as an [AVL tree].
///
/// Besides lookup, insertion and deletion in O(log n), every node caches the size and the key sum
/// of its subtree. That makes two queries logarithmic as well:
///
/// - [`select`](AvlTree::select): the value with the k-th smallest key, and its inverse
///   [`rank_of`](AvlTree::rank_of);
/// - [`sum_up_to`](AvlTree::sum_up_to): the sum of all keys less than or equal to a threshold.
///
/// [`insert`](AvlTree::insert) and [`delete`](AvlTree::delete) report how many rotations they
/// needed to restore balance. Inserting a key that is already present, or deleting one that is
/// absent, is an error and leaves the tree untouched.
///
/// # Examples
///
/// ```
/// use avl_stat_tree::{AvlTree, TreeError};
///
/// let mut tree = AvlTree::new();
/// assert_eq!(tree.insert(10, "ten"), Ok(0));
/// assert_eq!(tree.insert(20, "twenty"), Ok(0));
/// // The third ascending key tips the root over and a single rotation fixes it.
/// assert_eq!(tree.insert(30, "thirty"), Ok(1));
/// assert_eq!(tree.root_key(), Some(20));
///
/// assert_eq!(tree.get(20), Some(&"twenty"));
/// assert_eq!(tree.insert(20, "again"), Err(TreeError::DuplicateKey { key: 20 }));
///
/// // Order statistics are one-based.
/// assert_eq!(tree.select(1), Some(&"ten"));
/// assert_eq!(tree.sum_up_to(25), 30);
///
/// assert_eq!(tree.delete(10), Ok(0));
/// assert_eq!(tree.keys_in_order(), [20, 30]);
/// ```
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlTree<V> {
    raw: RawAvlTree<V>,
}

/// An iterator over the entries of an `AvlTree`, in key order.
///
/// This `struct` is created by the [`iter`] method on [`AvlTree`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use avl_stat_tree::AvlTree;
///
/// let mut tree = AvlTree::new();
/// tree.insert(2, "b").unwrap();
/// tree.insert(1, "a").unwrap();
///
/// let mut iter = tree.iter();
/// assert_eq!(iter.next(), Some((1, &"a")));
/// assert_eq!(iter.next_back(), Some((2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: AvlTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, V> {
    tree: &'a RawAvlTree<V>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

/// An iterator over the keys of an `AvlTree`, in ascending order.
///
/// This `struct` is created by the [`keys`] method on [`AvlTree`].
///
/// [`keys`]: AvlTree::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, V> {
    inner: Iter<'a, V>,
}

/// An iterator over the values of an `AvlTree`, in key order.
///
/// This `struct` is created by the [`values`] method on [`AvlTree`].
///
/// [`values`]: AvlTree::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, V> {
    inner: Iter<'a, V>,
}

/// An owning iterator over the entries of an `AvlTree`, in key order.
///
/// This `struct` is created by the [`into_iter`] method on [`AvlTree`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<V> {
    inner: alloc::vec::IntoIter<(i64, V)>,
}

impl<V> AvlTree<V> {
    /// Makes a new, empty `AvlTree`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let tree: AvlTree<&str> = AvlTree::new();
    /// assert!(tree.is_empty());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        AvlTree { raw: RawAvlTree::new() }
    }

    /// Makes a tree holding a single entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let tree = AvlTree::with_root(5, "five");
    /// assert_eq!(tree.len(), 1);
    /// assert_eq!(tree.root_key(), Some(5));
    /// ```
    #[must_use]
    pub fn with_root(key: i64, value: V) -> Self {
        let mut tree = Self::new();
        let _ = tree.raw.insert(key, value);
        tree
    }

    /// Clears the tree, removing all entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::with_root(1, "a");
    /// tree.clear();
    /// assert!(tree.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the number of entries in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the height of the tree: 0 for a single node, -1 for an empty tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// assert_eq!(tree.height(), -1);
    /// for key in 1..=7 {
    ///     tree.insert(key, ()).unwrap();
    /// }
    /// assert_eq!(tree.height(), 2);
    /// ```
    #[must_use]
    pub fn height(&self) -> i32 {
        self.raw.root_stats().height
    }

    /// Returns the key stored at the root, if any.
    #[must_use]
    pub fn root_key(&self) -> Option<i64> {
        self.raw.root().map(|root| self.raw.node(root).key())
    }

    /// Returns the sum of every key in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn total_sum(&self) -> i128 {
        self.raw.root_stats().sum
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let tree = AvlTree::with_root(1, "a");
    /// assert_eq!(tree.get(1), Some(&"a"));
    /// assert_eq!(tree.get(2), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&V> {
        self.raw.find(key).map(|handle| self.raw.node(handle).value())
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::with_root(1, 10);
    /// if let Some(value) = tree.get_mut(1) {
    ///     *value += 1;
    /// }
    /// assert_eq!(tree.get(1), Some(&11));
    /// ```
    pub fn get_mut(&mut self, key: i64) -> Option<&mut V> {
        let handle = self.raw.find(key)?;
        Some(self.raw.node_mut(handle).value_mut())
    }

    /// Returns `true` if the tree holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: i64) -> bool {
        self.raw.find(key).is_some()
    }

    /// Inserts a new entry, returning the number of rotations needed to rebalance (0, 1 or 2).
    ///
    /// A single rotation restores balance along the whole insertion path, so a double rotation
    /// is the most an insert ever performs.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DuplicateKey`](crate::TreeError::DuplicateKey) if `key` is already
    /// present. The existing entry is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::{AvlTree, TreeError};
    ///
    /// let mut tree = AvlTree::new();
    /// assert_eq!(tree.insert(30, "c"), Ok(0));
    /// assert_eq!(tree.insert(10, "a"), Ok(0));
    /// // Left child, then its right child: a left-right double rotation.
    /// assert_eq!(tree.insert(20, "b"), Ok(2));
    /// assert_eq!(tree.insert(10, "z"), Err(TreeError::DuplicateKey { key: 10 }));
    /// assert_eq!(tree.get(10), Some(&"a"));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: i64, value: V) -> Result<usize> {
        self.raw.insert(key, value)
    }

    /// Deletes the entry for `key`, returning the number of rotations needed to rebalance.
    ///
    /// Unlike insertion, a deletion may rotate at every level on the way back to the root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::KeyNotFound`](crate::TreeError::KeyNotFound) if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::{AvlTree, TreeError};
    ///
    /// let mut tree = AvlTree::new();
    /// for key in [20, 10, 30] {
    ///     tree.insert(key, ()).unwrap();
    /// }
    /// assert_eq!(tree.delete(20), Ok(0));
    /// assert_eq!(tree.delete(20), Err(TreeError::KeyNotFound { key: 20 }));
    /// assert_eq!(tree.min_key(), Some(10));
    /// assert_eq!(tree.max_key(), Some(30));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn delete(&mut self, key: i64) -> Result<usize> {
        self.raw.remove(key).map(|(_, rotations)| rotations)
    }

    /// Removes the entry for `key`, returning its value along with the number of rotations.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::KeyNotFound`](crate::TreeError::KeyNotFound) if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::with_root(1, "a");
    /// assert_eq!(tree.remove(1), Ok(("a", 0)));
    /// assert!(tree.is_empty());
    /// ```
    pub fn remove(&mut self, key: i64) -> Result<(V, usize)> {
        self.raw.remove(key)
    }

    /// Returns the value stored under the smallest key.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn min(&self) -> Option<&V> {
        self.first_key_value().map(|(_, value)| value)
    }

    /// Returns the value stored under the largest key.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn max(&self) -> Option<&V> {
        self.last_key_value().map(|(_, value)| value)
    }

    /// Returns the smallest key.
    #[must_use]
    pub fn min_key(&self) -> Option<i64> {
        self.first_key_value().map(|(key, _)| key)
    }

    /// Returns the largest key.
    #[must_use]
    pub fn max_key(&self) -> Option<i64> {
        self.last_key_value().map(|(key, _)| key)
    }

    /// Returns the entry with the smallest key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// assert_eq!(tree.first_key_value(), None);
    /// tree.insert(2, "b").unwrap();
    /// tree.insert(1, "a").unwrap();
    /// assert_eq!(tree.first_key_value(), Some((1, &"a")));
    /// ```
    #[must_use]
    pub fn first_key_value(&self) -> Option<(i64, &V)> {
        let node = self.raw.node(self.raw.min()?);
        Some((node.key(), node.value()))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(i64, &V)> {
        let node = self.raw.node(self.raw.max()?);
        Some((node.key(), node.value()))
    }

    /// Returns every key in ascending order.
    ///
    /// # Complexity
    ///
    /// O(n)
    #[must_use]
    pub fn keys_in_order(&self) -> Vec<i64> {
        self.keys().collect()
    }

    /// Returns every value, ordered by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(2, "b").unwrap();
    /// tree.insert(1, "a").unwrap();
    /// assert_eq!(tree.values_in_order(), [&"a", &"b"]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    #[must_use]
    pub fn values_in_order(&self) -> Vec<&V> {
        self.values().collect()
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            tree: &self.raw,
            front: self.raw.min(),
            back: self.raw.max(),
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the tree, in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(2, ()).unwrap();
    /// tree.insert(1, ()).unwrap();
    /// let keys: Vec<i64> = tree.keys().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the tree, in order by key.
    pub fn values(&self) -> Values<'_, V> {
        Values { inner: self.iter() }
    }
}

impl<V> Default for AvlTree<V> {
    /// Creates an empty `AvlTree`.
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for AvlTree<V> {
    fn clone(&self) -> Self {
        AvlTree { raw: self.raw.clone() }
    }
}

impl<V: fmt::Debug> fmt::Debug for AvlTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for AvlTree<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for AvlTree<V> {}

impl<'a, V> IntoIterator for &'a AvlTree<V> {
    type Item = (i64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<V> IntoIterator for AvlTree<V> {
    type Item = (i64, V);
    type IntoIter = IntoIter<V>;

    /// Gets an owning iterator over the entries of the tree, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_stat_tree::AvlTree;
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(2, "b").unwrap();
    /// tree.insert(1, "a").unwrap();
    /// let entries: Vec<(i64, &str)> = tree.into_iter().collect();
    /// assert_eq!(entries, [(1, "a"), (2, "b")]);
    /// ```
    fn into_iter(mut self) -> IntoIter<V> {
        IntoIter {
            inner: self.raw.drain_to_vec().into_iter(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (i64, &'a V);

    fn next(&mut self) -> Option<(i64, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let tree = self.tree;
        let handle = self.front?;
        self.remaining -= 1;
        self.front = tree.successor(handle);
        let node = tree.node(handle);
        Some((node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<(i64, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let tree = self.tree;
        let handle = self.back?;
        self.remaining -= 1;
        self.back = tree.predecessor(handle);
        let node = tree.node(handle);
        Some((node.key(), node.value()))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<V> Iterator for Keys<'_, V> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for Keys<'_, V> {
    fn next_back(&mut self) -> Option<i64> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<V> ExactSizeIterator for Keys<'_, V> {}

impl<V> FusedIterator for Keys<'_, V> {}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, V> DoubleEndedIterator for Values<'a, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<V> ExactSizeIterator for Values<'_, V> {}

impl<V> FusedIterator for Values<'_, V> {}

impl<V> Iterator for IntoIter<V> {
    type Item = (i64, V);

    fn next(&mut self) -> Option<(i64, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<(i64, V)> {
        self.inner.next_back()
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> FusedIterator for IntoIter<V> {}
