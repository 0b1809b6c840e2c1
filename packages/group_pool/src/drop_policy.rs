/// Determines what happens when a [`Pool`][crate::Pool] is dropped while slots are still
/// allocated.
///
/// A [`Handle`][crate::Handle] borrows its pool, so ordinary code cannot drop a pool that still
/// has live handles. Slots can nevertheless remain allocated at teardown if a handle was leaked,
/// for example via [`std::mem::forget()`].
///
/// # Examples
///
/// ```
/// use group_pool::{DropPolicy, Pool};
///
/// let pool = Pool::<i32, 16>::builder(0)
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Allocated slots are dropped together with the pool. This is the default.
    #[default]
    MayDropItems,

    /// The pool panics if any slot is still allocated when it is dropped.
    ///
    /// Use this to detect leaked handles, which would otherwise go unnoticed.
    MustNotDropItems,
}
