/// A one-based rank into the key order of an [`AvlTree`](crate::AvlTree).
///
/// `Rank(1)` is the smallest key and `Rank(tree.len())` the largest.
///
/// # Examples
///
/// ```
/// use avl_stat_tree::{AvlTree, Rank};
///
/// let mut tree = AvlTree::new();
/// tree.insert(20, "b").unwrap();
/// tree.insert(10, "a").unwrap();
///
/// assert_eq!(tree[Rank(1)], "a");
/// assert_eq!(tree[Rank(2)], "b");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rank(pub usize);
