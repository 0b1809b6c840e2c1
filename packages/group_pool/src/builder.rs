use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use crate::{DropPolicy, Pool, ReleasePolicy};

/// Builder for creating an instance of [`Pool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`Pool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use group_pool::{DropPolicy, Pool, ReleasePolicy};
///
/// let pool = Pool::<i32, 64>::builder(0)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .release_policy(ReleasePolicy::Retain)
///     .initial_groups(NonZero::new(2).unwrap())
///     .build();
///
/// assert_eq!(pool.capacity(), 128);
/// ```
///
/// [1]: Pool::new
#[must_use]
pub struct PoolBuilder<T, const GROUP_SIZE: usize> {
    default_value: T,
    drop_policy: DropPolicy,
    release_policy: ReleasePolicy,
    initial_groups: NonZero<usize>,
}

impl<T, const GROUP_SIZE: usize> fmt::Debug for PoolBuilder<T, GROUP_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("group_size", &GROUP_SIZE)
            .field("drop_policy", &self.drop_policy)
            .field("release_policy", &self.release_policy)
            .field("initial_groups", &self.initial_groups)
            .finish_non_exhaustive()
    }
}

impl<T: Clone, const GROUP_SIZE: usize> PoolBuilder<T, GROUP_SIZE> {
    pub(crate) fn new(default_value: T) -> Self {
        Self {
            default_value,
            drop_policy: DropPolicy::default(),
            release_policy: ReleasePolicy::default(),
            initial_groups: NonZero::<usize>::MIN,
        }
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat slots that are still allocated when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use group_pool::{DropPolicy, Pool};
    ///
    /// let pool = Pool::<i32, 8>::builder(0)
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the [release policy][ReleasePolicy] for the pool. This governs what
    /// happens to a value when the handle owning it is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use group_pool::{Pool, ReleasePolicy};
    ///
    /// let pool = Pool::<Vec<u8>, 8>::builder(Vec::new())
    ///     .release_policy(ReleasePolicy::Retain)
    ///     .build();
    /// ```
    pub fn release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    /// Sets how many groups are carved when the pool is built. Defaults to one.
    ///
    /// Further groups are still added on demand once these are full.
    pub fn initial_groups(mut self, count: NonZero<usize>) -> Self {
        self.initial_groups = count;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if `GROUP_SIZE` is zero or if memory for the initial groups cannot be obtained.
    ///
    /// # Examples
    ///
    /// ```
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 8>::builder(0).build();
    /// assert_eq!(pool.group_count(), 1);
    /// ```
    #[must_use]
    pub fn build(self) -> Pool<T, GROUP_SIZE> {
        Pool::new_inner(
            self.default_value,
            self.drop_policy,
            self.release_policy,
            self.initial_groups,
        )
    }
}
