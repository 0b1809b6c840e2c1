/// Identifies one slot in a [`Pool`][crate::Pool].
///
/// The key is the slot's position in the pool as a whole: the first group holds keys
/// `0..GROUP_SIZE`, the second group `GROUP_SIZE..2 * GROUP_SIZE` and so on. A group owns a key
/// if and only if the key falls in its range, which makes ownership a plain range check.
///
/// Keys are reused once the slot they identify has been released.
///
/// # Example
///
/// ```rust
/// use group_pool::Pool;
///
/// let pool = Pool::<i32, 4>::new(0);
///
/// let first = pool.make(10);
/// let second = pool.make(20);
///
/// assert_eq!(first.key().index(), 0);
/// assert_eq!(second.key().index(), 1);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotKey {
    index_in_pool: usize,
}

impl SlotKey {
    #[must_use]
    pub(crate) fn new(index_in_pool: usize) -> Self {
        Self { index_in_pool }
    }

    /// The position of the slot across the whole group chain.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index_in_pool
    }
}
