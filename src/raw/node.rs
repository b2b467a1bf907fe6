use super::handle::Handle;

/// Aggregates cached at every node, derived bottom-up from its children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Stats {
    /// Height of the subtree; a leaf is 0 and an empty subtree is -1.
    pub(crate) height: i32,
    /// Number of nodes in the subtree.
    pub(crate) size: usize,
    /// Sum of all keys in the subtree.
    pub(crate) sum: i128,
}

impl Stats {
    /// The aggregates of an empty subtree. Every `None` child link reads as this.
    pub(crate) const EMPTY: Self = Self {
        height: -1,
        size: 0,
        sum: 0,
    };

    pub(crate) const fn leaf(key: i64) -> Self {
        Self {
            height: 0,
            size: 1,
            sum: key as i128,
        }
    }

    /// Derives a node's aggregates from its key and the aggregates of its two subtrees.
    #[inline]
    pub(crate) fn combine(key: i64, left: Self, right: Self) -> Self {
        Self {
            height: 1 + left.height.max(right.height),
            size: 1 + left.size + right.size,
            sum: i128::from(key) + left.sum + right.sum,
        }
    }
}

/// A single tree node. Links are arena handles; `parent` is a back-reference only.
#[derive(Clone)]
pub(crate) struct Node<V> {
    key: i64,
    value: V,
    parent: Option<Handle>,
    left: Option<Handle>,
    right: Option<Handle>,
    stats: Stats,
}

impl<V> Node<V> {
    /// Creates a childless node hanging off `parent`.
    pub(crate) const fn new(key: i64, value: V, parent: Option<Handle>) -> Self {
        Self {
            key,
            value,
            parent,
            left: None,
            right: None,
            stats: Stats::leaf(key),
        }
    }

    #[inline]
    pub(crate) const fn key(&self) -> i64 {
        self.key
    }

    #[inline]
    pub(crate) const fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) const fn left(&self) -> Option<Handle> {
        self.left
    }

    pub(crate) fn set_left(&mut self, left: Option<Handle>) {
        self.left = left;
    }

    #[inline]
    pub(crate) const fn right(&self) -> Option<Handle> {
        self.right
    }

    pub(crate) fn set_right(&mut self, right: Option<Handle>) {
        self.right = right;
    }

    #[inline]
    pub(crate) const fn stats(&self) -> Stats {
        self.stats
    }

    pub(crate) fn set_stats(&mut self, stats: Stats) {
        self.stats = stats;
    }
}
