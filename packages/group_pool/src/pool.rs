use std::any::type_name;
use std::mem;
use std::num::NonZero;
use std::ptr;
use std::{fmt, iter, thread};

use tracing::{error, trace};

use crate::{DropPolicy, Group, Handle, PoolBuilder, PoolError, ReleasePolicy, Result, SlotKey};

/// An object pool for values of one type, built from a chain of fixed-capacity groups.
///
/// Every group holds `GROUP_SIZE` slots. When all slots in the chain are allocated, a new group is
/// appended to the end of the chain. Groups are only freed when the pool itself is dropped, so
/// pointers into the pool remain stable and the chain only ever grows.
///
/// Allocating a slot returns a [`Handle`], which owns the slot and gives access to its value. The
/// slot is released back to the pool when the handle is dropped, whichever way the scope holding
/// it is left. Handles borrow the pool, so a handle can never outlive the pool it came from.
///
/// # Default value
///
/// The pool is created with a default value. Every slot of every newly carved group starts out
/// as a clone of it and, under the default [`ReleasePolicy`], released slots are reset to it.
///
/// # Allocation order
///
/// Groups are tried in chain order, oldest first. Within a group, the most recently released slot
/// is reused first.
///
/// # Thread safety
///
/// The pool may be moved between threads (if `T` allows it) but not shared between them. Use one
/// pool per thread or serialize access externally.
///
/// # Example
///
/// ```rust
/// use group_pool::Pool;
///
/// let pool = Pool::<i32, 4>::new(0);
///
/// let mut item = pool.make(42);
/// *item += 1;
/// assert_eq!(*item, 43);
/// assert_eq!(pool.len(), 1);
///
/// drop(item);
/// assert!(pool.is_empty());
/// ```
pub struct Pool<T, const GROUP_SIZE: usize> {
    /// Used to prime the slots of new groups. Never mutated after construction.
    default_value: T,

    /// Produces the value a released slot is reset to. Always `T::clone`, captured when the pool
    /// is built because handles release their slots from a `Drop` impl that has no `T: Clone`.
    reset: fn(&T) -> T,

    head: Group<T, GROUP_SIZE>,

    drop_policy: DropPolicy,
    release_policy: ReleasePolicy,
}

impl<T: Clone, const GROUP_SIZE: usize> Pool<T, GROUP_SIZE> {
    /// # Panics
    ///
    /// Panics if `GROUP_SIZE` is zero or if memory for the initial groups cannot be obtained.
    #[must_use]
    pub(crate) fn new_inner(
        default_value: T,
        drop_policy: DropPolicy,
        release_policy: ReleasePolicy,
        initial_groups: NonZero<usize>,
    ) -> Self {
        assert!(GROUP_SIZE > 0, "Pool must have non-zero group size");

        let head = Group::new(0, &default_value).unwrap_or_else(|error| panic!("{error}"));

        let pool = Self {
            default_value,
            reset: T::clone,
            head,
            drop_policy,
            release_policy,
        };

        let mut tail = &pool.head;
        for _ in 1..initial_groups.get() {
            tail = tail
                .next_or_carve(&pool.default_value)
                .unwrap_or_else(|error| panic!("{error}"));
        }

        pool
    }

    /// Creates a new [`Pool`] with the default configuration.
    ///
    /// The pool starts with one group and grows as needed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<String, 16>::new(String::new());
    ///
    /// assert!(pool.is_empty());
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `GROUP_SIZE` is zero.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self::builder(default_value).build()
    }

    /// Starts building a new [`Pool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::{DropPolicy, Pool};
    ///
    /// let pool = Pool::<i32, 16>::builder(0)
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder(default_value: T) -> PoolBuilder<T, GROUP_SIZE> {
        PoolBuilder::new(default_value)
    }

    /// Allocates a slot, fills it with a value constructed from `args` and returns the handle
    /// that owns it.
    ///
    /// Anything `T` can be created from via [`From`] is accepted, including `T` itself. Types
    /// that need several arguments can implement `From` for a tuple.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// #[derive(Clone, Default)]
    /// struct Node {
    ///     id: u32,
    ///     name: String,
    /// }
    ///
    /// impl From<(u32, &str)> for Node {
    ///     fn from((id, name): (u32, &str)) -> Self {
    ///         Self { id, name: name.to_string() }
    ///     }
    /// }
    ///
    /// let pool = Pool::<Node, 32>::new(Node::default());
    ///
    /// let node = pool.make((7_u32, "root"));
    /// assert_eq!(node.id, 7);
    /// assert_eq!(node.name, "root");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the chain is full and memory for a new group cannot be obtained.
    #[must_use]
    pub fn make<A>(&self, args: A) -> Handle<'_, T, GROUP_SIZE>
    where
        T: From<A>,
    {
        match self.try_make(args) {
            Ok(handle) => handle,
            Err(error) => panic!("{error}"),
        }
    }

    /// Like [`make()`][Self::make] but reports a failure to grow the pool as an error.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`][crate::PoolError::OutOfMemory] if the chain is full and
    /// memory for a new group cannot be obtained.
    pub fn try_make<A>(&self, args: A) -> Result<Handle<'_, T, GROUP_SIZE>>
    where
        T: From<A>,
    {
        let value = T::from(args);

        let mut handle = self.acquire()?;

        // The handle already owns the slot, so a panic while dropping the previous occupant
        // still returns the slot to the pool.
        let previous = mem::replace(&mut *handle, value);
        drop(previous);

        Ok(handle)
    }

    /// Allocates a slot and lets `initialize` update the value in place.
    ///
    /// The closure receives the value currently in the slot: a copy of the default value or,
    /// under [`ReleasePolicy::Retain`], possibly a stale value left by a previous owner.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<Vec<u8>, 8>::new(Vec::with_capacity(64));
    ///
    /// let buffer = pool.make_with(|buffer| buffer.extend_from_slice(b"abc"));
    /// assert_eq!(*buffer, b"abc");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the chain is full and memory for a new group cannot be obtained. If
    /// `initialize` panics, the slot is released before the panic continues.
    #[must_use]
    pub fn make_with<F>(&self, initialize: F) -> Handle<'_, T, GROUP_SIZE>
    where
        F: FnOnce(&mut T),
    {
        let mut handle = match self.acquire() {
            Ok(handle) => handle,
            Err(error) => panic!("{error}"),
        };

        initialize(&mut *handle);

        handle
    }

    /// Ensures the pool can hold at least `additional` more values without carving new groups
    /// during allocation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 4>::new(0);
    ///
    /// pool.reserve(10);
    /// assert!(pool.capacity() >= 10);
    /// assert_eq!(pool.group_count(), 3);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if memory for the new groups cannot be obtained.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn reserve(&self, additional: usize) {
        if let Err(error) = self.try_reserve(additional) {
            panic!("{error}");
        }
    }

    /// Like [`reserve()`][Self::reserve] but reports a failure to grow the pool as an error.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`][crate::PoolError::OutOfMemory] if memory for the new
    /// groups cannot be obtained. Groups carved before the failure remain part of the pool.
    ///
    /// # Panics
    ///
    /// Panics if the requested capacity overflows `usize`.
    pub fn try_reserve(&self, additional: usize) -> Result<()> {
        let required = self
            .len()
            .checked_add(additional)
            .expect("capacity overflow: requested capacity exceeds maximum possible value");

        let missing_groups = required
            .saturating_sub(self.capacity())
            .div_ceil(GROUP_SIZE);

        let mut tail = self.tail();
        for _ in 0..missing_groups {
            tail = tail.next_or_carve(&self.default_value)?;
        }

        Ok(())
    }

    pub(crate) fn default_value(&self) -> &T {
        &self.default_value
    }

    fn acquire(&self) -> Result<Handle<'_, T, GROUP_SIZE>> {
        let mut group = &self.head;

        loop {
            if let Some((key, value)) = group.try_acquire() {
                #[cfg(debug_assertions)]
                group.integrity_check();

                trace!(
                    key = key.index(),
                    group = group.ordinal(),
                    "acquired slot"
                );
                return Ok(Handle::new(self, key, value));
            }

            group = group.next_or_carve(&self.default_value)?;
        }
    }
}

impl<T, const GROUP_SIZE: usize> Pool<T, GROUP_SIZE> {
    /// The number of allocated slots, i.e. the number of live handles (plus any leaked ones).
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 4>::new(0);
    /// assert_eq!(pool.len(), 0);
    ///
    /// let a = pool.make(1);
    /// let b = pool.make(2);
    /// assert_eq!(pool.len(), 2);
    ///
    /// drop(a);
    /// assert_eq!(pool.len(), 1);
    /// # drop(b);
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn len(&self) -> usize {
        self.groups().map(Group::len).sum()
    }

    /// Whether no slots are allocated.
    ///
    /// An empty pool still holds all the groups it has ever carved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups().all(|group| group.len() == 0)
    }

    /// The total number of slots across all groups, allocated or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.group_count()
            .checked_mul(GROUP_SIZE)
            .expect("overflow here would mean the pool holds more slots than virtual memory can fit")
    }

    /// The number of groups in the chain.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 2>::new(0);
    /// assert_eq!(pool.group_count(), 1);
    ///
    /// let items: Vec<_> = (0..3).map(|i| pool.make(i)).collect();
    /// assert_eq!(pool.group_count(), 2);
    /// # drop(items);
    /// ```
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups().count()
    }

    /// The number of slots in each group.
    #[must_use]
    pub const fn group_size(&self) -> usize {
        GROUP_SIZE
    }

    /// Whether `value` lives inside this pool's storage.
    ///
    /// This compares addresses only. It is true for any reference into the pool's slots, such
    /// as one obtained by dereferencing a [`Handle`] from this pool, and false for references to
    /// values that live anywhere else.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 4>::new(0);
    /// let pooled = pool.make(1);
    /// let outsider = 1_i32;
    ///
    /// assert!(pool.contains(&pooled));
    /// assert!(!pool.contains(&outsider));
    /// ```
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        let address = ptr::from_ref(value);

        self.groups().any(|group| group.owns_address(address))
    }

    fn groups(&self) -> impl Iterator<Item = &Group<T, GROUP_SIZE>> {
        iter::successors(Some(&self.head), |group| group.next())
    }

    fn tail(&self) -> &Group<T, GROUP_SIZE> {
        self.groups()
            .last()
            .expect("the chain always contains at least the head group")
    }

    /// Returns a slot to the group that owns it.
    ///
    /// This is the release path used by [`Handle`]. The key must identify a slot that is
    /// currently allocated, with no references to its value remaining.
    pub(crate) fn release(&self, key: SlotKey) -> Result<()> {
        let result = match self.groups().find(|group| group.owns(key)) {
            Some(group) => {
                trace!(
                    key = key.index(),
                    group = group.ordinal(),
                    "releasing slot"
                );
                group.release(key, self.release_policy, || (self.reset)(&self.default_value))
            }
            None => Err(PoolError::UnownedRelease { index: key.index() }),
        };

        if let Err(rejection) = &result {
            error!(
                %rejection,
                item_type = type_name::<T>(),
                "slot release rejected"
            );
        }

        result
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        for group in self.groups() {
            group.integrity_check();
        }
    }
}

impl<T: Default + Clone, const GROUP_SIZE: usize> Default for Pool<T, GROUP_SIZE> {
    /// Creates a new [`Pool`] that uses `T::default()` as its default value.
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, const GROUP_SIZE: usize> Drop for Pool<T, GROUP_SIZE> {
    fn drop(&mut self) {
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                self.is_empty(),
                "dropped a pool of {} with {} allocated slots under a policy that says it must be empty when dropped",
                type_name::<T>(),
                self.len()
            );
        }
    }
}

impl<T, const GROUP_SIZE: usize> fmt::Debug for Pool<T, GROUP_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("group_size", &GROUP_SIZE)
            .field("group_count", &self.group_count())
            .field("len", &self.len())
            .field("drop_policy", &self.drop_policy)
            .field("release_policy", &self.release_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::indexing_slicing,
        clippy::cast_possible_truncation,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(Pool<u32, 4>: Send);
    assert_not_impl_any!(Pool<u32, 4>: Sync);
    assert_not_impl_any!(Pool<Rc<u32>, 4>: Send);

    #[test]
    fn smoke_test() {
        let pool = Pool::<i32, 3>::new(0);

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());

        let a = pool.make(42);
        let b = pool.make(43);
        let c = pool.make(44);

        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());
        assert_eq!(*a, 42);
        assert_eq!(*b, 43);
        assert_eq!(*c, 44);

        drop(b);

        let d = pool.make(45);

        assert_eq!(*a, 42);
        assert_eq!(*c, 44);
        assert_eq!(*d, 45);
        assert_eq!(pool.group_count(), 1);

        pool.integrity_check();
    }

    #[test]
    fn capacity_grows_one_group_at_a_time() {
        let pool = Pool::<i32, 4>::new(0);
        let mut handles = Vec::new();

        for i in 0..5 {
            handles.push(pool.make(i));
        }
        assert_eq!(pool.group_count(), 2);

        for i in 5..9 {
            handles.push(pool.make(i));
        }
        assert_eq!(pool.group_count(), 3);
        assert_eq!(pool.capacity(), 12);
        assert_eq!(pool.len(), 9);
    }

    #[test]
    fn lifo_reuse_within_group() {
        let pool = Pool::<i32, 4>::new(0);

        let a = pool.make(1);
        let b = pool.make(2);
        let _c = pool.make(3);

        let a_key = a.key();
        let b_key = b.key();

        drop(b);
        drop(a);

        let first = pool.make(4);
        let second = pool.make(5);

        assert_eq!(first.key(), a_key);
        assert_eq!(second.key(), b_key);
    }

    #[test]
    fn groups_are_tried_head_first() {
        let pool = Pool::<i32, 2>::new(0);

        let a = pool.make(1);
        let _b = pool.make(2);
        let _c = pool.make(3);
        let d = pool.make(4);

        let a_key = a.key();
        drop(d);
        drop(a);

        // The head group has a free slot again, so it is used before the second group.
        assert_eq!(pool.make(5).key(), a_key);
    }

    #[test]
    fn every_slot_is_owned_by_exactly_one_group() {
        let pool = Pool::<i32, 3>::new(0);
        let handles: Vec<_> = (0..10).map(|i| pool.make(i)).collect();

        for handle in &handles {
            let owners = pool.groups().filter(|group| group.owns(handle.key())).count();
            assert_eq!(owners, 1);

            let address_owners = pool
                .groups()
                .filter(|group| group.owns_address(handle.ptr().as_ptr()))
                .count();
            assert_eq!(address_owners, 1);
        }
    }

    #[test]
    fn all_slots_come_back_after_release() {
        let pool = Pool::<i32, 4>::new(0);

        let mut handles: Vec<_> = (0..10).map(|i| pool.make(i)).collect();
        let capacity = pool.capacity();

        // Release in an order that is neither allocation order nor its reverse.
        while !handles.is_empty() {
            let index = handles.len() / 2;
            drop(handles.swap_remove(index));
        }

        assert_eq!(pool.len(), 0);
        pool.integrity_check();

        let reused: Vec<_> = (0..capacity)
            .map(|i| pool.make(i32::try_from(i).unwrap()))
            .collect();
        assert_eq!(pool.capacity(), capacity);

        let keys: HashSet<_> = reused.iter().map(Handle::key).collect();
        assert_eq!(keys.len(), capacity);
    }

    #[test]
    fn double_release_is_reported_and_harmless() {
        let pool = Pool::<i32, 4>::new(0);

        let handle = pool.make(1);
        let key = handle.key();
        drop(handle);

        assert_eq!(
            pool.release(key),
            Err(PoolError::DoubleRelease { index: key.index() })
        );

        // Nothing got corrupted: the next allocations do not alias.
        let a = pool.make(2);
        let b = pool.make(3);
        assert_ne!(a.key(), b.key());
        assert_eq!(*a, 2);
        assert_eq!(*b, 3);

        pool.integrity_check();
    }

    #[test]
    fn foreign_release_is_reported() {
        let pool = Pool::<i32, 4>::new(0);

        assert_eq!(
            pool.release(SlotKey::new(4)),
            Err(PoolError::UnownedRelease { index: 4 })
        );
    }

    #[test]
    fn make_with_sees_default_value() {
        let pool = Pool::<String, 2>::new("seed".to_string());

        let handle = pool.make_with(|value| value.push('!'));

        assert_eq!(*handle, "seed!");
    }

    #[test]
    fn make_with_panic_releases_slot() {
        let pool = Pool::<i32, 2>::new(0);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _handle = pool.make_with(|_| panic!("initializer failed"));
        }));

        assert!(result.is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn release_resets_value_by_default() {
        let pool = Pool::<i32, 1>::new(7);

        let handle = pool.make_with(|value| *value += 1);
        assert_eq!(*handle, 8);
        drop(handle);

        let handle = pool.make_with(|_| {});
        assert_eq!(*handle, 7);
    }

    #[test]
    fn retain_policy_keeps_stale_value() {
        let pool = Pool::<i32, 1>::builder(7)
            .release_policy(ReleasePolicy::Retain)
            .build();

        drop(pool.make(8));

        let handle = pool.make_with(|_| {});
        assert_eq!(*handle, 8);
    }

    #[test]
    fn reserve_carves_enough_groups() {
        let pool = Pool::<i32, 4>::new(0);
        let _a = pool.make(1);

        pool.reserve(8);

        assert_eq!(pool.group_count(), 3);
        assert!(pool.capacity() >= pool.len() + 8);

        // Already enough room, nothing changes.
        pool.reserve(3);
        assert_eq!(pool.group_count(), 3);
    }

    #[test]
    fn contains_is_address_based() {
        let first = Pool::<i32, 2>::new(0);
        let second = Pool::<i32, 2>::new(0);

        let a = first.make(1);
        let b = second.make(1);

        assert!(first.contains(&a));
        assert!(!first.contains(&b));
        assert!(second.contains(&b));
        assert!(!first.contains(first.default_value()));
    }

    #[test]
    fn values_are_dropped_with_pool() {
        #[derive(Clone)]
        struct Tracked(Rc<Cell<usize>>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));

        {
            let pool = Pool::<Tracked, 3>::new(Tracked(Rc::clone(&drops)));
            let _handle = pool.make_with(|_| {});
        }

        // The released value, the three slots and the default value itself.
        assert_eq!(drops.get(), 5);
    }

    #[test]
    #[should_panic]
    fn leaked_handle_with_forbidden_to_drop_policy_panics() {
        let pool = Pool::<i32, 4>::builder(0)
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        std::mem::forget(pool.make(123));
    }

    #[test]
    fn empty_with_forbidden_to_drop_policy_ok() {
        let pool = Pool::<i32, 4>::builder(0)
            .drop_policy(DropPolicy::MustNotDropItems)
            .build();

        drop(pool.make(1));
        drop(pool);
    }

    #[test]
    fn default_pool_uses_default_value() {
        let pool = Pool::<i32, 4>::default();

        assert_eq!(*pool.make_with(|_| {}), 0);
    }

    #[test]
    fn debug_output_describes_chain() {
        let pool = Pool::<i32, 2>::new(0);
        let _handles: Vec<_> = (0..3).map(|i| pool.make(i)).collect();

        let output = format!("{pool:?}");

        assert!(output.contains("group_count: 2"));
        assert!(output.contains("len: 3"));
    }

    #[test]
    #[should_panic]
    fn zero_group_size_is_panic() {
        drop(Pool::<i32, 0>::new(0));
    }

    #[test]
    #[should_panic(expected = "out of memory")]
    fn unobtainable_head_group_is_panic() {
        drop(Pool::<u64, { usize::MAX / 4 }>::new(0));
    }
}
