use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display},
    io,
    iter::FusedIterator,
};

use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    node::{InsertCtx, Node},
    DEFAULT_ORDER, MIN_ORDER,
};

/// B-tree of keys with an order chosen at construction.
///
/// Each node holds at most `order - 1` keys. When an insertion overflows a node, a key is
/// first rotated through the parent into the nearest sibling with room (left siblings
/// before right ones), cascading through any full siblings in between. Only when every
/// sibling is full is the node split around its median. The tree grows in height only when
/// the root itself splits.
///
/// Keys cannot be removed.
#[derive(Clone)]
pub struct BTree<K> {
    len: usize,
    root: Node<K>,
}

impl<K> Default for BTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> BTree<K> {
    /// Returns a new, empty tree of order [`DEFAULT_ORDER`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            len: 0,
            root: Node::new(DEFAULT_ORDER, true),
        }
    }

    /// Returns a new, empty tree where nodes have at most `order` children.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOrder`] if `order` is less than [`MIN_ORDER`].
    pub fn with_order(order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(Error::InvalidOrder { order });
        }
        debug!(order, "new btree");
        Ok(Self {
            len: 0,
            root: Node::new(order, true),
        })
    }

    /// Maximum number of children of a node.
    #[must_use]
    pub fn order(&self) -> usize {
        self.root.order()
    }

    /// Get number of keys in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the tree empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, an empty tree has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Remove all keys, keeping the order.
    pub fn clear(&mut self) {
        self.len = 0;
        self.root = Node::new(self.order(), true);
    }

    /// Insert `key`. Returns false if it was already present, in which case the tree is
    /// unchanged.
    pub fn insert(&mut self, key: K) -> bool
    where
        K: Ord,
    {
        self.insert_with(key, InsertCtx::default())
    }

    /// Like [`BTree::insert`], but reserves every node the insertion could need before
    /// changing anything.
    ///
    /// # Errors
    ///
    /// [`Error::AllocFailed`] if the memory could not be reserved. The tree is unchanged.
    pub fn try_insert(&mut self, key: K) -> Result<bool>
    where
        K: Ord,
    {
        let Some((leaf, internal)) = self.root.plan_insert(&key) else {
            return Ok(false);
        };
        let cx = InsertCtx::reserve(self.order(), leaf, internal)?;
        Ok(self.insert_with(key, cx))
    }

    fn insert_with(&mut self, key: K, mut cx: InsertCtx<K>) -> bool
    where
        K: Ord,
    {
        if self.root.insert(key, &mut cx) {
            self.root.grow(&mut cx);
            trace!(height = self.height(), "root split");
        }
        if cx.inserted {
            self.len += 1;
        }
        cx.inserted
    }

    /// Does the tree contain `key`?
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.root.contains(key)
    }

    /// Get in-order iterator over keys, each paired with its position inside its node.
    #[must_use]
    pub fn inorder(&self) -> InOrder<'_, K> {
        let mut x = InOrder {
            stack: StkVec::new(),
            remaining: self.len,
        };
        x.descend(&self.root);
        x
    }

    /// Get iterator over keys in ascending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K> {
        Iter(self.inorder())
    }

    /// Write every key as `key(index) ` in order, where index is the key's position inside
    /// its node.
    ///
    /// # Errors
    ///
    /// Any error from writing to `out`.
    pub fn print_inorder<W>(&self, out: &mut W) -> io::Result<()>
    where
        W: io::Write,
        K: Display,
    {
        for (key, i) in self.inorder() {
            write!(out, "{key}({i}) ")?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Node<K> {
        &self.root
    }

    #[cfg(test)]
    pub(crate) fn check(&self)
    where
        K: Ord,
    {
        let (count, height) = self.root.check(true, None, None);
        assert_eq!(count, self.len);
        assert_eq!(height, self.height());
    }
}

impl<K: Debug> Debug for BTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord> FromIterator<K> for BTree<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut tree = BTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord> Extend<K> for BTree<K> {
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for BTree<K> {
    fn from(arr: [K; N]) -> Self {
        BTree::from_iter(arr)
    }
}

impl<'a, K> IntoIterator for &'a BTree<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;
    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

// Every node below the root holds at least one key, so height is at most log2(len) + 1.
type StkVec<T> = arrayvec::ArrayVec<T, 64>;

/// Iterator returned by [`BTree::inorder`].
pub struct InOrder<'a, K> {
    /// Nodes on the path to the next key, with the index of the next key to yield in each.
    stack: StkVec<(&'a Node<K>, usize)>,
    remaining: usize,
}

impl<'a, K> InOrder<'a, K> {
    fn descend(&mut self, mut node: &'a Node<K>) {
        loop {
            self.stack.push((node, 0));
            match node.children.first() {
                Some(child) => node = child,
                None => return,
            }
        }
    }
}

impl<'a, K> Iterator for InOrder<'a, K> {
    type Item = (&'a K, usize);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, i) = self.stack.pop()?;
            if i < node.keys.len() {
                self.stack.push((node, i + 1));
                if let Some(child) = node.children.get(i + 1) {
                    self.descend(child);
                }
                self.remaining -= 1;
                return Some((node.keys.ix(i), i));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
impl<'a, K> ExactSizeIterator for InOrder<'a, K> {
    fn len(&self) -> usize {
        self.remaining
    }
}
impl<'a, K> FusedIterator for InOrder<'a, K> {}

/// Iterator returned by [`BTree::iter`].
pub struct Iter<'a, K>(InOrder<'a, K>);

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K> ExactSizeIterator for Iter<'a, K> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K> FusedIterator for Iter<'a, K> {}
