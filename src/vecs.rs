use std::{cmp::Ordering, collections::TryReserveError, fmt, ops::Deref};

/// Vec with fixed capacity.
///
/// Storage for all `cap` elements is reserved when the vec is created and it never
/// reallocates afterwards. Every position-changing edit goes through [`FixedCapVec::shift_insert`]
/// or [`FixedCapVec::shift_delete`], so the elements stay packed in `0..len`.
pub(crate) struct FixedCapVec<T> {
    cap: usize,
    v: Vec<T>,
}

impl<T> Default for FixedCapVec<T> {
    fn default() -> Self {
        Self {
            cap: 0,
            v: Vec::new(),
        }
    }
}

impl<T> FixedCapVec<T> {
    /// Allocate a vec with capacity `cap`, aborting if memory is not available.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            v: Vec::with_capacity(cap),
        }
    }

    /// Allocate a vec with capacity `cap`, reporting allocation failure.
    pub fn try_new(cap: usize) -> Result<Self, TryReserveError> {
        let mut v = Vec::new();
        v.try_reserve_exact(cap)?;
        Ok(Self { cap, v })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.v.len()
    }

    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.v.len() == self.cap
    }

    /// Append `value`. Capacity must be greater than len.
    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(self.len() < self.cap);
        self.v.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.v.pop()
    }

    /// Move elements at `at..len` one slot right and write `value` at `at`.
    /// Capacity must be greater than len and `at <= len`.
    pub fn shift_insert(&mut self, at: usize, value: T) {
        debug_assert!(self.len() < self.cap);
        self.v.insert(at, value);
    }

    /// Take the element at `at` and move the elements after it one slot left.
    pub fn shift_delete(&mut self, at: usize) -> T {
        self.v.remove(at)
    }

    /// Move elements `at..len` to the end of `dst`, which must have room for them.
    pub fn move_tail(&mut self, at: usize, dst: &mut Self) {
        debug_assert!(dst.len() + self.len() - at <= dst.cap);
        dst.v.extend(self.v.drain(at..));
    }

    /// Get reference to ith element.
    #[inline]
    pub fn ix(&self, ix: usize) -> &T {
        &self.v[ix]
    }

    /// Get mutable reference to ith element.
    #[inline]
    pub fn ixm(&mut self, ix: usize) -> &mut T {
        &mut self.v[ix]
    }

    /// Binary search, `Ok` is the position of a match, `Err` is the insertion point.
    pub fn search<F>(&self, mut f: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        let (mut i, mut j) = (0, self.len());
        while i < j {
            let m = (i + j) / 2;
            match f(self.ix(m)) {
                Ordering::Equal => {
                    return Ok(m);
                }
                Ordering::Less => i = m + 1,
                Ordering::Greater => j = m,
            }
        }
        Err(i)
    }
}

impl<T> Deref for FixedCapVec<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        &self.v
    }
}

// Vec::clone only keeps len worth of capacity, so reserve the full cap again.
impl<T: Clone> Clone for FixedCapVec<T> {
    fn clone(&self) -> Self {
        let mut result = Self::new(self.cap);
        result.v.extend(self.v.iter().cloned());
        result
    }
}

impl<T> fmt::Debug for FixedCapVec<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
