use std::{borrow::Borrow, collections::TryReserveError, mem};

use tracing::trace;

use crate::vecs::FixedCapVec;

type KeyVec<K> = FixedCapVec<K>;
type NodeVec<K> = FixedCapVec<Node<K>>;

/// A B-tree node.
///
/// `keys` has capacity `order`, one more than a node may hold between insertions, so an
/// insert can land before the overflow is resolved. `children` has capacity `order + 1`
/// for internal nodes and 0 for leaves, and children are owned by value, so dropping a node
/// drops its whole subtree. The drop recurses once per level, which is fine as height is
/// logarithmic in the number of keys.
#[derive(Debug, Clone)]
pub(crate) struct Node<K> {
    pub(crate) keys: KeyVec<K>,
    pub(crate) children: NodeVec<K>,
}

/// Outcome of [`Node::rotation_test`] for an overflowed child.
///
/// The distance is how many separators the rotation crosses, one more than the number of
/// full siblings it cascades through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rotation {
    /// Rotate into the sibling this many positions to the left.
    Left(usize),
    /// Rotate into the sibling this many positions to the right.
    Right(usize),
    /// No sibling has room, the child must be split.
    Split,
}

/// State threaded through a single insertion.
pub(crate) struct InsertCtx<K> {
    /// Node to receive the upper half of a leaf split.
    leaf_spare: Option<Node<K>>,
    /// Nodes to receive upper halves of internal splits, or to become the new root.
    spares: Vec<Node<K>>,
    /// Set once the key has been placed in a leaf.
    pub(crate) inserted: bool,
}

impl<K> Default for InsertCtx<K> {
    fn default() -> Self {
        Self {
            leaf_spare: None,
            spares: Vec::new(),
            inserted: false,
        }
    }
}

impl<K> InsertCtx<K> {
    /// Allocate every node an insertion could need up front, so that running out of memory
    /// is reported before the tree is touched.
    pub(crate) fn reserve(
        order: usize,
        leaf: bool,
        internal: usize,
    ) -> Result<Self, TryReserveError> {
        let mut cx = Self::default();
        if leaf {
            cx.leaf_spare = Some(Node::try_new(order, true)?);
        }
        cx.spares.try_reserve_exact(internal)?;
        for _ in 0..internal {
            cx.spares.push(Node::try_new(order, false)?);
        }
        Ok(cx)
    }

    /// Take a reserved node of the required shape, or allocate one if none was reserved.
    fn take_spare(&mut self, order: usize, leaf: bool) -> Node<K> {
        let spare = if leaf {
            self.leaf_spare.take()
        } else {
            self.spares.pop()
        };
        spare.unwrap_or_else(|| Node::new(order, leaf))
    }
}

impl<K> Node<K> {
    pub(crate) fn new(order: usize, leaf: bool) -> Self {
        Self {
            keys: KeyVec::new(order),
            children: NodeVec::new(if leaf { 0 } else { order + 1 }),
        }
    }

    fn try_new(order: usize, leaf: bool) -> Result<Self, TryReserveError> {
        Ok(Self {
            keys: KeyVec::try_new(order)?,
            children: NodeVec::try_new(if leaf { 0 } else { order + 1 })?,
        })
    }

    #[inline]
    pub(crate) fn order(&self) -> usize {
        self.keys.cap()
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Can take one more key without overflowing.
    #[inline]
    fn has_spare(&self) -> bool {
        self.keys.len() + 1 < self.order()
    }

    #[inline]
    fn overflowed(&self) -> bool {
        self.keys.is_full()
    }

    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self;
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut node = self;
        loop {
            match node.keys.search(|k| k.borrow().cmp(key)) {
                Ok(_) => return true,
                Err(i) => match node.children.get(i) {
                    Some(child) => node = child,
                    None => return false,
                },
            }
        }
    }

    /// Work out which nodes inserting `key` could allocate: whether the leaf may split, and
    /// how many internal nodes (split halves or a new root) may be needed.
    /// Returns `None` if the key is already present.
    pub(crate) fn plan_insert(&self, key: &K) -> Option<(bool, usize)>
    where
        K: Ord,
    {
        let (mut node, mut depth, mut full_run) = (self, 0, 0);
        loop {
            depth += 1;
            let i = match node.keys.search(|k| k.cmp(key)) {
                Ok(_) => return None,
                Err(i) => i,
            };
            if node.has_spare() {
                full_run = 0;
            } else {
                full_run += 1;
            }
            match node.children.get(i) {
                Some(child) => node = child,
                None => break,
            }
        }
        if full_run == 0 {
            return Some((false, 0));
        }
        // Splits stop at the first ancestor with room, the root splitting also needs a new root.
        let new_root = usize::from(full_run == depth);
        Some((true, full_run - 1 + new_root))
    }

    /// Insert `key` below this node. Returns true if this node is left overflowed.
    pub(crate) fn insert(&mut self, key: K, cx: &mut InsertCtx<K>) -> bool
    where
        K: Ord,
    {
        let i = match self.keys.search(|k| k.cmp(&key)) {
            Ok(_) => return false,
            Err(i) => i,
        };
        if self.is_leaf() {
            self.keys.shift_insert(i, key);
            cx.inserted = true;
            return self.overflowed();
        }
        if !self.children.ixm(i).insert(key, cx) {
            return false;
        }
        match self.rotation_test(i) {
            Rotation::Left(distance) => {
                self.rotate_with_left(i, distance);
                false
            }
            Rotation::Right(distance) => {
                self.rotate_with_right(i, distance);
                false
            }
            Rotation::Split => {
                self.node_split(i, cx);
                self.overflowed()
            }
        }
    }

    /// Find the nearest sibling of child `src` that has room, preferring the left side.
    pub(crate) fn rotation_test(&self, src: usize) -> Rotation {
        let room = |j: &usize| self.children.ix(*j).has_spare();
        if let Some(dst) = (0..src).rev().find(room) {
            return Rotation::Left(src - dst);
        }
        if let Some(dst) = (src + 1..self.children.len()).find(room) {
            return Rotation::Right(dst - src);
        }
        Rotation::Split
    }

    /// Pass one key at a time from child `src` leftwards through the separators until
    /// child `src - distance` absorbs it. Children in between must be full.
    pub(crate) fn rotate_with_left(&mut self, src: usize, distance: usize) {
        trace!(src, distance, "rotate left");
        for now in (src + 1 - distance..=src).rev() {
            let (key, subtree) = self.children.ixm(now).take_first();
            let key = mem::replace(self.keys.ixm(now - 1), key);
            self.children.ixm(now - 1).put_last(key, subtree);
        }
    }

    /// Mirror of [`Node::rotate_with_left`], moving keys towards child `src + distance`.
    pub(crate) fn rotate_with_right(&mut self, src: usize, distance: usize) {
        trace!(src, distance, "rotate right");
        for now in src..src + distance {
            let (key, subtree) = self.children.ixm(now).take_last();
            let key = mem::replace(self.keys.ixm(now), key);
            self.children.ixm(now + 1).put_first(key, subtree);
        }
    }

    fn take_first(&mut self) -> (K, Option<Node<K>>) {
        let key = self.keys.shift_delete(0);
        let subtree = (!self.is_leaf()).then(|| self.children.shift_delete(0));
        (key, subtree)
    }

    fn take_last(&mut self) -> (K, Option<Node<K>>) {
        let key = self.keys.shift_delete(self.keys.len() - 1);
        let subtree = self.children.pop();
        (key, subtree)
    }

    fn put_first(&mut self, key: K, subtree: Option<Node<K>>) {
        self.keys.shift_insert(0, key);
        if let Some(subtree) = subtree {
            self.children.shift_insert(0, subtree);
        }
    }

    fn put_last(&mut self, key: K, subtree: Option<Node<K>>) {
        self.keys.push(key);
        if let Some(subtree) = subtree {
            self.children.push(subtree);
        }
    }

    /// Move the upper half of an overflowed node into `right` (which must be empty).
    /// This node keeps `ceil((order - 1) / 2) + 1` keys, its last key being the median.
    pub(crate) fn node_separation(&mut self, mut right: Node<K>) -> Node<K> {
        let lower = (self.order() - 1).div_ceil(2);
        self.keys.move_tail(lower + 1, &mut right.keys);
        if !self.is_leaf() {
            self.children.move_tail(lower + 1, &mut right.children);
        }
        right
    }

    /// Split overflowed child `idx`, promoting its median into this node.
    pub(crate) fn node_split(&mut self, idx: usize, cx: &mut InsertCtx<K>) {
        let child = self.children.ixm(idx);
        let spare = cx.take_spare(child.order(), child.is_leaf());
        let right = child.node_separation(spare);
        let med = child.keys.shift_delete(child.keys.len() - 1);
        trace!(idx, "split");
        self.keys.shift_insert(idx, med);
        self.children.shift_insert(idx + 1, right);
    }

    /// Split this overflowed root and replace it with a new root holding the median.
    pub(crate) fn grow(&mut self, cx: &mut InsertCtx<K>) {
        let order = self.order();
        let spare = cx.take_spare(order, self.is_leaf());
        let right = self.node_separation(spare);
        let med = self.keys.shift_delete(self.keys.len() - 1);
        let mut root = cx.take_spare(order, false);
        root.keys.push(med);
        let left = mem::replace(self, root);
        self.children.push(left);
        self.children.push(right);
    }

    /// Assert the steady-state invariants for this subtree, returning its key count and height.
    #[cfg(test)]
    pub(crate) fn check(&self, is_root: bool, lo: Option<&K>, hi: Option<&K>) -> (usize, usize)
    where
        K: Ord,
    {
        assert!(self.keys.len() < self.order(), "node left overflowed");
        assert!(is_root || !self.keys.is_empty(), "empty non-root node");
        assert!(self.keys.windows(2).all(|w| w[0] < w[1]), "keys out of order");
        if let (Some(lo), Some(first)) = (lo, self.keys.first()) {
            assert!(lo < first, "key below separator");
        }
        if let (Some(hi), Some(last)) = (hi, self.keys.last()) {
            assert!(last < hi, "key above separator");
        }
        if self.is_leaf() {
            return (self.keys.len(), 1);
        }
        assert_eq!(self.children.len(), self.keys.len() + 1);
        let mut count = self.keys.len();
        let mut height = None;
        for (i, child) in self.children.iter().enumerate() {
            let lo = if i == 0 { lo } else { Some(self.keys.ix(i - 1)) };
            let hi = self.keys.get(i).or(hi);
            let (n, h) = child.check(false, lo, hi);
            assert!(height.is_none() || height == Some(h), "leaves at different depths");
            height = Some(h);
            count += n;
        }
        (count, height.unwrap_or(0) + 1)
    }
}
