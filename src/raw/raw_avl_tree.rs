use alloc::vec::Vec;
use core::cmp::Ordering;

use tracing::{debug, trace};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Node, Stats};
use crate::error::{Result, TreeError};

/// The AVL engine backing `AvlTree`.
///
/// Nodes live in an arena and refer to each other by [`Handle`]. An absent child is `None`
/// and reads as [`Stats::EMPTY`] wherever aggregates are computed.
#[derive(Clone)]
pub(crate) struct RawAvlTree<V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<V>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Handle to the node holding the smallest key.
    min: Option<Handle>,
    /// Handle to the node holding the largest key.
    max: Option<Handle>,
}

/// How far up the retracing walk may rotate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Retrace {
    /// One rotation restores the whole insertion path, so balancing stops after the first.
    Insert,
    /// Every ancestor may need a rotation.
    Delete,
}

impl<V> RawAvlTree<V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            min: None,
            max: None,
        }
    }

    /// Creates a new tree with room for `capacity` nodes.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            root: None,
            min: None,
            max: None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Returns the number of keys in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.min = None;
        self.max = None;
    }

    pub(crate) const fn root(&self) -> Option<Handle> {
        self.root
    }

    pub(crate) const fn min(&self) -> Option<Handle> {
        self.min
    }

    pub(crate) const fn max(&self) -> Option<Handle> {
        self.max
    }

    /// Returns a reference to a node by handle.
    pub(crate) fn node(&self, handle: Handle) -> &Node<V> {
        self.nodes.get(handle)
    }

    /// Returns a mutable reference to a node by handle.
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut Node<V> {
        self.nodes.get_mut(handle)
    }

    /// Aggregates of the subtree at `link`, with `None` reading as the empty subtree.
    #[inline]
    pub(crate) fn stats(&self, link: Option<Handle>) -> Stats {
        link.map_or(Stats::EMPTY, |handle| self.nodes.get(handle).stats())
    }

    /// Aggregates of the whole tree.
    pub(crate) fn root_stats(&self) -> Stats {
        self.stats(self.root)
    }

    /// Finds the node holding `key`.
    pub(crate) fn find(&self, key: i64) -> Option<Handle> {
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            current = match key.cmp(&node.key()) {
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
                Ordering::Equal => return Some(handle),
            };
        }
        None
    }

    /// Inserts `key`, returning the number of rotations performed (0, 1 or 2).
    ///
    /// Fails with [`TreeError::DuplicateKey`] without touching the tree if `key` is present.
    pub(crate) fn insert(&mut self, key: i64, value: V) -> Result<usize> {
        let Some(mut current) = self.root else {
            let handle = self.nodes.alloc(Node::new(key, value, None));
            self.root = Some(handle);
            self.min = Some(handle);
            self.max = Some(handle);
            trace!(key, "inserted first key");
            return Ok(0);
        };

        // Descend to the empty slot that should hold `key`.
        let parent = loop {
            let node = self.nodes.get(current);
            let next = match key.cmp(&node.key()) {
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
                Ordering::Equal => return Err(TreeError::DuplicateKey { key }),
            };
            match next {
                Some(child) => current = child,
                None => break current,
            }
        };

        let handle = self.nodes.alloc(Node::new(key, value, Some(parent)));
        let parent_node = self.nodes.get_mut(parent);
        if key < parent_node.key() {
            parent_node.set_left(Some(handle));
        } else {
            parent_node.set_right(Some(handle));
        }

        if self.min.is_some_and(|min| key < self.nodes.get(min).key()) {
            self.min = Some(handle);
        }
        if self.max.is_some_and(|max| key > self.nodes.get(max).key()) {
            self.max = Some(handle);
        }

        let rotations = self.retrace(Some(parent), Retrace::Insert);
        trace!(key, rotations, "inserted key");
        if rotations > 0 {
            debug!(key, rotations, "rebalanced after insert");
        }
        Ok(rotations)
    }

    /// Removes `key`, returning its value and the number of rotations performed.
    ///
    /// Fails with [`TreeError::KeyNotFound`] without touching the tree if `key` is absent.
    pub(crate) fn remove(&mut self, key: i64) -> Result<(V, usize)> {
        let target = self.find(key).ok_or(TreeError::KeyNotFound { key })?;
        let node = self.nodes.get(target);
        let (parent, left, right) = (node.parent(), node.left(), node.right());

        let retrace_from = match (left, right) {
            (Some(left), Some(right)) => Some(self.splice_successor(target, parent, left, right)),
            (child, None) | (None, child) => {
                if let Some(child) = child {
                    self.nodes.get_mut(child).set_parent(parent);
                }
                self.replace_child(parent, target, child);
                parent
            }
        };

        let value = self.nodes.take(target).into_value();
        let rotations = self.retrace(retrace_from, Retrace::Delete);

        // The cached extremes are re-derived from the root rather than patched.
        if self.min == Some(target) {
            self.min = self.root.map(|root| self.leftmost(root));
        }
        if self.max == Some(target) {
            self.max = self.root.map(|root| self.rightmost(root));
        }

        trace!(key, rotations, "removed key");
        if rotations > 0 {
            debug!(key, rotations, "rebalanced after delete");
        }
        Ok((value, rotations))
    }

    /// Moves the in-order successor of `target` into `target`'s position.
    ///
    /// Returns the deepest node whose subtree changed, where retracing has to start.
    fn splice_successor(&mut self, target: Handle, parent: Option<Handle>, left: Handle, right: Handle) -> Handle {
        let successor = self.leftmost(right);

        let retrace_from = if successor == right {
            // The successor keeps its own right subtree and only adopts `left`.
            successor
        } else {
            // Detach the successor first: its right subtree takes its place under its parent.
            let successor_node = self.nodes.get(successor);
            let successor_parent = successor_node
                .parent()
                .expect("`RawAvlTree::splice_successor()` - successor below `right` has no parent!");
            let successor_right = successor_node.right();

            self.nodes.get_mut(successor_parent).set_left(successor_right);
            if let Some(child) = successor_right {
                self.nodes.get_mut(child).set_parent(Some(successor_parent));
            }

            self.nodes.get_mut(successor).set_right(Some(right));
            self.nodes.get_mut(right).set_parent(Some(successor));
            successor_parent
        };

        self.nodes.get_mut(successor).set_left(Some(left));
        self.nodes.get_mut(left).set_parent(Some(successor));
        self.nodes.get_mut(successor).set_parent(parent);
        self.replace_child(parent, target, Some(successor));

        retrace_from
    }

    /// Points whichever link referred to `old` (a child slot of `parent`, or the root) at `new`.
    fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let node = self.nodes.get_mut(parent);
                if node.left() == Some(old) {
                    node.set_left(new);
                } else {
                    node.set_right(new);
                }
            }
        }
    }

    /// Walks from `from` to the root, refreshing aggregates and rotating unbalanced nodes.
    ///
    /// Returns the number of rotations performed.
    fn retrace(&mut self, from: Option<Handle>, mode: Retrace) -> usize {
        let mut rotations = 0;
        let mut balancing = true;
        let mut current = from;

        while let Some(handle) = current {
            self.refresh(handle);
            let mut top = handle;

            if balancing && self.balance_factor(handle).abs() > 1 {
                let (subtree_root, count) = self.rebalance(handle);
                top = subtree_root;
                rotations += count;
                balancing = mode == Retrace::Delete;
            }

            current = self.nodes.get(top).parent();
        }

        rotations
    }

    /// Recomputes the cached aggregates of `handle` from its children.
    #[inline]
    fn refresh(&mut self, handle: Handle) {
        let node = self.nodes.get(handle);
        let stats = Stats::combine(node.key(), self.stats(node.left()), self.stats(node.right()));
        self.nodes.get_mut(handle).set_stats(stats);
    }

    /// Height of the left subtree minus height of the right subtree.
    #[inline]
    pub(crate) fn balance_factor(&self, handle: Handle) -> i32 {
        let node = self.nodes.get(handle);
        self.stats(node.left()).height - self.stats(node.right()).height
    }

    /// Restores balance at `handle` (balance factor of ±2) with a single or double rotation.
    ///
    /// Returns the new root of the subtree and the number of rotations used.
    fn rebalance(&mut self, handle: Handle) -> (Handle, usize) {
        let node = self.nodes.get(handle);
        if self.balance_factor(handle) > 0 {
            let left = node.left().expect("`RawAvlTree::rebalance()` - left-heavy node has no left child!");
            if self.balance_factor(left) >= 0 {
                trace!(pivot = node.key(), "LL rotation");
                (self.rotate_right(handle), 1)
            } else {
                trace!(pivot = node.key(), "LR rotation");
                self.rotate_left(left);
                (self.rotate_right(handle), 2)
            }
        } else {
            let right = node.right().expect("`RawAvlTree::rebalance()` - right-heavy node has no right child!");
            if self.balance_factor(right) <= 0 {
                trace!(pivot = node.key(), "RR rotation");
                (self.rotate_left(handle), 1)
            } else {
                trace!(pivot = node.key(), "RL rotation");
                self.rotate_right(right);
                (self.rotate_left(handle), 2)
            }
        }
    }

    /// Rotates the subtree at `pivot` to the right, lifting its left child. Returns the new subtree root.
    fn rotate_right(&mut self, pivot: Handle) -> Handle {
        let pivot_node = self.nodes.get(pivot);
        let parent = pivot_node.parent();
        let lifted = pivot_node.left().expect("`RawAvlTree::rotate_right()` - pivot has no left child!");
        let inner = self.nodes.get(lifted).right();

        self.nodes.get_mut(pivot).set_left(inner);
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).set_parent(Some(pivot));
        }
        self.nodes.get_mut(pivot).set_parent(Some(lifted));

        let lifted_node = self.nodes.get_mut(lifted);
        lifted_node.set_right(Some(pivot));
        lifted_node.set_parent(parent);
        self.replace_child(parent, pivot, Some(lifted));

        self.refresh(pivot);
        self.refresh(lifted);
        lifted
    }

    /// Rotates the subtree at `pivot` to the left, lifting its right child. Returns the new subtree root.
    fn rotate_left(&mut self, pivot: Handle) -> Handle {
        let pivot_node = self.nodes.get(pivot);
        let parent = pivot_node.parent();
        let lifted = pivot_node.right().expect("`RawAvlTree::rotate_left()` - pivot has no right child!");
        let inner = self.nodes.get(lifted).left();

        self.nodes.get_mut(pivot).set_right(inner);
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).set_parent(Some(pivot));
        }
        self.nodes.get_mut(pivot).set_parent(Some(lifted));

        let lifted_node = self.nodes.get_mut(lifted);
        lifted_node.set_left(Some(pivot));
        lifted_node.set_parent(parent);
        self.replace_child(parent, pivot, Some(lifted));

        self.refresh(pivot);
        self.refresh(lifted);
        lifted
    }

    /// Returns the node with the smallest key in the subtree at `handle`.
    pub(crate) fn leftmost(&self, mut handle: Handle) -> Handle {
        while let Some(left) = self.nodes.get(handle).left() {
            handle = left;
        }
        handle
    }

    /// Returns the node with the largest key in the subtree at `handle`.
    pub(crate) fn rightmost(&self, mut handle: Handle) -> Handle {
        while let Some(right) = self.nodes.get(handle).right() {
            handle = right;
        }
        handle
    }

    /// Returns the node holding the next larger key.
    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        if let Some(right) = self.nodes.get(handle).right() {
            return Some(self.leftmost(right));
        }
        // Climb until we leave a left subtree.
        let mut child = handle;
        let mut parent = self.nodes.get(handle).parent();
        while let Some(ancestor) = parent {
            if self.nodes.get(ancestor).left() == Some(child) {
                return Some(ancestor);
            }
            child = ancestor;
            parent = self.nodes.get(ancestor).parent();
        }
        None
    }

    /// Returns the node holding the next smaller key.
    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        if let Some(left) = self.nodes.get(handle).left() {
            return Some(self.rightmost(left));
        }
        let mut child = handle;
        let mut parent = self.nodes.get(handle).parent();
        while let Some(ancestor) = parent {
            if self.nodes.get(ancestor).right() == Some(child) {
                return Some(ancestor);
            }
            child = ancestor;
            parent = self.nodes.get(ancestor).parent();
        }
        None
    }

    /// Returns the node at one-based position `rank` in key order.
    pub(crate) fn select(&self, rank: usize) -> Option<Handle> {
        if rank == 0 || rank > self.len() {
            return None;
        }

        let mut rank = rank;
        let mut current = self.root?;
        loop {
            let node = self.nodes.get(current);
            let here = self.stats(node.left()).size + 1;
            current = match rank.cmp(&here) {
                Ordering::Equal => return Some(current),
                Ordering::Less => node.left()?,
                Ordering::Greater => {
                    rank -= here;
                    node.right()?
                }
            };
        }
    }

    /// Returns the one-based position of `key` in key order.
    pub(crate) fn rank_of(&self, key: i64) -> Option<usize> {
        let mut preceding = 0;
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            match key.cmp(&node.key()) {
                Ordering::Less => current = node.left(),
                Ordering::Equal => return Some(preceding + self.stats(node.left()).size + 1),
                Ordering::Greater => {
                    preceding += self.stats(node.left()).size + 1;
                    current = node.right();
                }
            }
        }
        None
    }

    /// Returns the sum of every key `<= threshold`.
    ///
    /// Each step right of a node accounts for that node and its entire left subtree at once.
    pub(crate) fn sum_up_to(&self, threshold: i64) -> i128 {
        let mut sum = 0;
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            if node.key() <= threshold {
                sum += self.stats(node.left()).sum + i128::from(node.key());
                current = node.right();
            } else {
                current = node.left();
            }
        }
        sum
    }

    /// Empties the tree, returning its entries in key order.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(i64, V)> {
        let mut order = Vec::with_capacity(self.len());
        let mut current = self.min;
        while let Some(handle) = current {
            order.push(handle);
            current = self.successor(handle);
        }

        let entries = order
            .into_iter()
            .map(|handle| {
                let node = self.nodes.take(handle);
                (node.key(), node.into_value())
            })
            .collect();
        self.clear();
        entries
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::uninlined_format_args)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use proptest::prelude::*;

    impl<V> RawAvlTree<V> {
        /// Validates every structural and aggregate invariant. Panics with a descriptive message
        /// listing all violations found.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            let Some(root) = self.root else {
                assert_eq!(self.len(), 0, "Empty tree should have no nodes");
                assert!(self.min.is_none(), "Empty tree should have no min");
                assert!(self.max.is_none(), "Empty tree should have no max");
                return;
            };

            if self.nodes.get(root).parent().is_some() {
                errors.push(alloc::format!("Root {:?} has a parent", root));
            }

            let stats = self.validate_node(root, None, None, &mut errors);
            if stats.size != self.len() {
                errors.push(alloc::format!("Root size {} != arena len {}", stats.size, self.len()));
            }

            let leftmost = self.leftmost(root);
            let rightmost = self.rightmost(root);
            if self.min != Some(leftmost) {
                errors.push(alloc::format!("Cached min {:?} != leftmost {:?}", self.min, leftmost));
            }
            if self.max != Some(rightmost) {
                errors.push(alloc::format!("Cached max {:?} != rightmost {:?}", self.max, rightmost));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Recomputes the aggregates of the subtree at `handle` from scratch, checking them against
        /// the cached values along the way.
        fn validate_node(&self, handle: Handle, lower: Option<i64>, upper: Option<i64>, errors: &mut Vec<String>) -> Stats {
            let node = self.nodes.get(handle);
            let key = node.key();

            if lower.is_some_and(|lower| key <= lower) || upper.is_some_and(|upper| key >= upper) {
                errors.push(alloc::format!("Key {} at {:?} outside ({:?}, {:?})", key, handle, lower, upper));
            }

            let mut child_stats = |child: Option<Handle>, lower: Option<i64>, upper: Option<i64>| match child {
                None => Stats::EMPTY,
                Some(child) => {
                    if self.nodes.get(child).parent() != Some(handle) {
                        errors.push(alloc::format!("Child {:?} of {:?} has the wrong parent", child, handle));
                    }
                    self.validate_node(child, lower, upper, errors)
                }
            };
            let left = child_stats(node.left(), lower, Some(key));
            let right = child_stats(node.right(), Some(key), upper);

            let expected = Stats::combine(key, left, right);
            if node.stats() != expected {
                errors.push(alloc::format!(
                    "Stats mismatch at key {}: cached {:?}, actual {:?}",
                    key,
                    node.stats(),
                    expected
                ));
            }
            if (left.height - right.height).abs() > 1 {
                errors.push(alloc::format!(
                    "Unbalanced at key {}: left height {}, right height {}",
                    key,
                    left.height,
                    right.height
                ));
            }

            expected
        }

        fn root_key(&self) -> Option<i64> {
            self.root.map(|root| self.nodes.get(root).key())
        }

        fn keys(&self) -> Vec<i64> {
            let mut keys = Vec::new();
            let mut current = self.min;
            while let Some(handle) = current {
                keys.push(self.nodes.get(handle).key());
                current = self.successor(handle);
            }
            keys
        }
    }

    fn tree_from(keys: &[i64]) -> RawAvlTree<i64> {
        let mut tree = RawAvlTree::new();
        for &key in keys {
            tree.insert(key, key * 10).expect("keys are distinct");
            tree.validate_invariants();
        }
        tree
    }

    // ─── Rotation shapes ─────────────────────────────────────────────────────

    #[test]
    fn ascending_inserts_rotate_left() {
        let mut tree = RawAvlTree::new();
        assert_eq!(tree.insert(10, ()), Ok(0));
        assert_eq!(tree.insert(20, ()), Ok(0));
        assert_eq!(tree.insert(30, ()), Ok(1));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(20));
        assert_eq!(tree.root_stats().height, 1);
    }

    #[test]
    fn descending_inserts_rotate_right() {
        let mut tree = RawAvlTree::new();
        assert_eq!(tree.insert(30, ()), Ok(0));
        assert_eq!(tree.insert(20, ()), Ok(0));
        assert_eq!(tree.insert(10, ()), Ok(1));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(20));
    }

    #[test]
    fn zig_zag_inserts_double_rotate() {
        let mut tree = RawAvlTree::new();
        tree.insert(30, ()).unwrap();
        tree.insert(10, ()).unwrap();
        assert_eq!(tree.insert(20, ()), Ok(2), "left-right");
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(20));

        let mut tree = RawAvlTree::new();
        tree.insert(10, ()).unwrap();
        tree.insert(30, ()).unwrap();
        assert_eq!(tree.insert(20, ()), Ok(2), "right-left");
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(20));
    }

    #[test]
    fn left_right_rotation_at_root() {
        //        50
        //      /    \
        //    20      70
        //   /  \
        //  10  30
        //        \
        //        40  <- 50 becomes left-heavy through a right-heavy child
        let mut tree = tree_from(&[50, 20, 70, 10, 30]);
        assert_eq!(tree.insert(40, 400), Ok(2));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(30));
        assert_eq!(tree.root_stats().sum, 220);
        assert_eq!(tree.root_stats().size, 6);
    }

    // ─── Deletion topologies ─────────────────────────────────────────────────

    #[test]
    fn delete_only_node_empties_tree() {
        let mut tree = tree_from(&[5]);
        assert_eq!(tree.remove(5), Ok((50, 0)));
        tree.validate_invariants();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
    }

    #[test]
    fn delete_from_two_node_tree() {
        for (keys, gone, left) in [([1, 2], 1, 2), ([1, 2], 2, 1), ([2, 1], 2, 1), ([2, 1], 1, 2)] {
            let mut tree = tree_from(&keys);
            assert_eq!(tree.remove(gone), Ok((gone * 10, 0)));
            tree.validate_invariants();
            assert_eq!(tree.root_key(), Some(left));
            assert_eq!(tree.root_stats(), Stats::leaf(left));
            assert_eq!(tree.min(), tree.max());
        }
    }

    #[test]
    fn delete_leaf() {
        let mut tree = tree_from(&[20, 10, 30, 5]);
        assert_eq!(tree.remove(5), Ok((50, 0)));
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![10, 20, 30]);
    }

    #[test]
    fn delete_node_with_one_child() {
        let mut tree = tree_from(&[20, 10, 30, 25]);
        assert_eq!(tree.remove(30), Ok((300, 0)));
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![10, 20, 25]);
    }

    #[test]
    fn delete_with_successor_as_right_child() {
        let mut tree = tree_from(&[20, 10, 30]);
        assert_eq!(tree.remove(20), Ok((200, 0)));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(30));
        assert_eq!(tree.keys(), vec![10, 30]);
    }

    #[test]
    fn delete_with_deep_successor() {
        //      20
        //    /    \
        //   10     40
        //  /      /  \
        // 5      30   50
        //          \
        //          35
        let mut tree = tree_from(&[20, 10, 40, 5, 30, 50, 35]);
        assert_eq!(tree.remove(20).map(|(value, _)| value), Ok(200));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(30));
        assert_eq!(tree.keys(), vec![5, 10, 30, 35, 40, 50]);
    }

    #[test]
    fn delete_can_rotate_at_several_levels() {
        // A Fibonacci-shaped tree: removing from the shallow side forces a rotation at each level.
        let mut tree = tree_from(&[8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1]);
        assert_eq!(tree.root_key(), Some(8));
        assert_eq!(tree.remove(12).map(|(_, rotations)| rotations), Ok(2));
        tree.validate_invariants();
        assert_eq!(tree.root_key(), Some(5));
    }

    #[test]
    fn delete_extremes_refreshes_cached_min_max() {
        let mut tree = tree_from(&[4, 2, 6, 1, 3, 5, 7]);
        tree.remove(1).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.node(tree.min().unwrap()).key(), 2);
        tree.remove(7).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.node(tree.max().unwrap()).key(), 6);
    }

    #[test]
    fn missing_and_duplicate_keys_leave_tree_untouched() {
        let mut tree = tree_from(&[1, 2, 3]);
        assert_eq!(tree.insert(2, 0), Err(TreeError::DuplicateKey { key: 2 }));
        assert_eq!(tree.remove(9), Err(TreeError::KeyNotFound { key: 9 }));
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![1, 2, 3]);
        assert_eq!(tree.find(2).map(|h| *tree.node(h).value()), Some(20));
    }

    #[test]
    fn freed_nodes_are_reused() {
        let mut tree = tree_from(&[1, 2, 3, 4]);
        let capacity = tree.capacity();
        for _ in 0..100 {
            tree.remove(4).unwrap();
            tree.insert(4, 40).unwrap();
        }
        tree.validate_invariants();
        assert_eq!(tree.capacity(), capacity);
    }

    #[test]
    fn drain_returns_entries_in_order() {
        let mut tree = tree_from(&[3, 1, 2]);
        assert_eq!(tree.drain_to_vec(), vec![(1, 10), (2, 20), (3, 30)]);
        tree.validate_invariants();
        assert!(tree.is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let tree = tree_from(&[1, 2, 3]);
        let mut copy = tree.clone();
        copy.remove(2).unwrap();
        copy.validate_invariants();
        assert_eq!(tree.keys(), vec![1, 2, 3]);
        assert_eq!(copy.keys(), vec![1, 3]);
    }

    // ─── Order statistics ────────────────────────────────────────────────────

    #[test]
    fn select_and_rank_on_empty_tree() {
        let tree: RawAvlTree<()> = RawAvlTree::new();
        assert!(tree.select(0).is_none());
        assert!(tree.select(1).is_none());
        assert!(tree.rank_of(1).is_none());
        assert_eq!(tree.sum_up_to(i64::MAX), 0);
    }

    #[test]
    fn predecessor_walks_backwards() {
        let tree = tree_from(&[4, 2, 6, 1, 3, 5, 7]);
        let mut keys = Vec::new();
        let mut current = tree.max();
        while let Some(handle) = current {
            keys.push(tree.node(handle).key());
            current = tree.predecessor(handle);
        }
        assert_eq!(keys, vec![7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn negative_one_is_an_ordinary_key() {
        let mut tree = tree_from(&[-1, 0, -2]);
        assert_eq!(tree.sum_up_to(-1), -3);
        assert_eq!(tree.remove(-1), Ok((-10, 0)));
        tree.validate_invariants();
        assert_eq!(tree.keys(), vec![-2, 0]);
    }

    // ─── Randomized ──────────────────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i64),
        Remove(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (-500i64..500).prop_map(Op::Insert),
            2 => (-500i64..500).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..400)) {
            let mut tree: RawAvlTree<i64> = RawAvlTree::new();
            let mut model: BTreeMap<i64, i64> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let expected = if model.contains_key(&key) {
                            Err(TreeError::DuplicateKey { key })
                        } else {
                            model.insert(key, -key);
                            Ok(())
                        };
                        prop_assert_eq!(tree.insert(key, -key).map(|_| ()), expected);
                    }
                    Op::Remove(key) => {
                        let expected = model.remove(&key).ok_or(TreeError::KeyNotFound { key });
                        prop_assert_eq!(tree.remove(key).map(|(value, _)| value), expected);
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }

            prop_assert_eq!(tree.keys(), model.keys().copied().collect::<Vec<_>>());
        }

        #[test]
        fn rotation_counts_are_bounded(keys in prop::collection::vec(-1000i64..1000, 1..300)) {
            let mut tree: RawAvlTree<()> = RawAvlTree::new();
            for key in keys {
                if let Ok(rotations) = tree.insert(key, ()) {
                    prop_assert!(rotations <= 2, "insert({}) rotated {} times", key, rotations);
                }
            }
            let height = tree.root_stats().height;
            let keys = tree.keys();
            for key in keys {
                let (_, rotations) = tree.remove(key).expect("key was inserted");
                // At most one single or double rotation per level.
                prop_assert!(rotations <= 2 * (height as usize + 1));
                tree.validate_invariants();
            }
        }

        #[test]
        fn select_and_rank_agree_with_sorted_keys(keys in prop::collection::btree_set(any::<i64>(), 0..200)) {
            let keys: Vec<i64> = keys.into_iter().collect();
            let mut tree: RawAvlTree<()> = RawAvlTree::new();
            for &key in keys.iter().rev() {
                tree.insert(key, ()).unwrap();
            }

            for (index, &key) in keys.iter().enumerate() {
                let handle = tree.select(index + 1).expect("rank in range");
                prop_assert_eq!(tree.node(handle).key(), key);
                prop_assert_eq!(tree.rank_of(key), Some(index + 1));
            }
            prop_assert!(tree.select(0).is_none());
            prop_assert!(tree.select(keys.len() + 1).is_none());
        }

        #[test]
        fn sum_up_to_matches_brute_force(
            keys in prop::collection::btree_set(-1000i64..1000, 0..150),
            thresholds in prop::collection::vec(-1100i64..1100, 1..50),
        ) {
            let mut tree: RawAvlTree<()> = RawAvlTree::new();
            for &key in &keys {
                tree.insert(key, ()).unwrap();
            }
            for threshold in thresholds {
                let expected: i128 = keys.iter().filter(|&&key| key <= threshold).map(|&key| i128::from(key)).sum();
                prop_assert_eq!(tree.sum_up_to(threshold), expected, "threshold {}", threshold);
            }
        }
    }
}
