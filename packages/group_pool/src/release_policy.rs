/// Determines what happens to the value held by a slot when that slot is released.
///
/// # Examples
///
/// ```
/// use group_pool::{Pool, ReleasePolicy};
///
/// let pool = Pool::<String, 8>::builder(String::new())
///     .release_policy(ReleasePolicy::Retain)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReleasePolicy {
    /// The released value is dropped immediately and the slot is primed again with a clone
    /// of the pool's default value. This is the default.
    #[default]
    ResetToDefault,

    /// The released value stays in the slot until the slot is reused, at which point it is
    /// overwritten (and dropped) by the next allocation.
    ///
    /// This avoids a clone per release but keeps any resources owned by stale values alive.
    Retain,
}
