use std::any::type_name;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::thread;

use tracing::error;

use crate::{Pool, SlotKey};

/// Exclusive ownership of one allocated slot in a [`Pool`].
///
/// A handle is the only way to reach the value in its slot and the only way to give the slot
/// back. Dropping the handle releases the slot, whether the scope holding it ends normally, is
/// left early via `return` or `?`, or unwinds from a panic.
///
/// Handles are move-only. Moving a handle transfers ownership of the slot; there is no implicit
/// copy because two handles to one slot would release it twice. Use
/// [`duplicate()`][Self::duplicate] to copy the value into a new slot instead.
///
/// The handle borrows the pool it came from, so the pool cannot be dropped while the handle
/// exists.
///
/// # Single-threaded design
///
/// This type is neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use group_pool::Pool;
///
/// let pool = Pool::<String, 8>::new(String::new());
///
/// let mut greeting = pool.make("Hello");
/// greeting.push_str(", world");
/// assert_eq!(*greeting, "Hello, world");
///
/// // Dropping the handle returns the slot to the pool.
/// drop(greeting);
/// assert!(pool.is_empty());
/// ```
pub struct Handle<'p, T, const GROUP_SIZE: usize> {
    pool: &'p Pool<T, GROUP_SIZE>,
    key: SlotKey,

    /// Points at the value in our slot. Valid for as long as we exist: the slot is ours
    /// until we release it and the group holding it lives as long as the pool.
    ptr: NonNull<T>,
}

impl<'p, T, const GROUP_SIZE: usize> Handle<'p, T, GROUP_SIZE> {
    /// Wraps a freshly acquired slot. Only the pool creates handles.
    #[must_use]
    pub(crate) fn new(pool: &'p Pool<T, GROUP_SIZE>, key: SlotKey, ptr: NonNull<T>) -> Self {
        Self { pool, key, ptr }
    }

    /// The key of the slot owned by this handle.
    #[must_use]
    pub fn key(&self) -> SlotKey {
        self.key
    }

    /// The pool this handle was allocated from.
    #[must_use]
    pub fn pool(&self) -> &'p Pool<T, GROUP_SIZE> {
        self.pool
    }

    /// Releases the slot back to the pool. This is the same as dropping the handle.
    pub fn release(self) {
        drop(self);
    }

    #[must_use]
    pub(crate) fn ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<'p, T: Clone, const GROUP_SIZE: usize> Handle<'p, T, GROUP_SIZE> {
    /// Allocates a new slot in the same pool holding a clone of this handle's value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<i32, 8>::new(0);
    ///
    /// let original = pool.make(5);
    /// let copy = original.duplicate();
    ///
    /// assert_eq!(*copy, 5);
    /// assert_ne!(original.key(), copy.key());
    /// assert_eq!(pool.len(), 2);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the chain is full and memory for a new group cannot be obtained.
    #[must_use]
    pub fn duplicate(&self) -> Handle<'p, T, GROUP_SIZE> {
        let pool = self.pool;
        pool.make_with(|slot| slot.clone_from(self))
    }

    /// Moves the value out of the slot and releases the slot.
    ///
    /// The slot is left holding a clone of the pool's default value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use group_pool::Pool;
    ///
    /// let pool = Pool::<String, 8>::new(String::new());
    ///
    /// let name = pool.make("Alice").take();
    ///
    /// assert_eq!(name, "Alice");
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn take(mut self) -> T {
        let replacement = self.pool.default_value().clone();

        mem::replace(&mut *self, replacement)
    }
}

impl<T, const GROUP_SIZE: usize> Deref for Handle<'_, T, GROUP_SIZE> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot is allocated to us and the pool never creates references to the
        // values of allocated slots, so the value is initialized and not mutably aliased.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, const GROUP_SIZE: usize> DerefMut for Handle<'_, T, GROUP_SIZE> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The slot is allocated to us and we are its only owner. Exclusive access to
        // the handle therefore means exclusive access to the value.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, const GROUP_SIZE: usize> Drop for Handle<'_, T, GROUP_SIZE> {
    fn drop(&mut self) {
        let Err(rejection) = self.pool.release(self.key) else {
            return;
        };

        // A handle owns its slot, so a rejected release means the pool's bookkeeping is
        // corrupted. The pool already logged the rejection.
        if thread::panicking() {
            error!(
                key = self.key.index(),
                item_type = type_name::<T>(),
                "slot release rejected during unwinding"
            );
        } else {
            panic!("{rejection}");
        }
    }
}

impl<T, const GROUP_SIZE: usize> fmt::Debug for Handle<'_, T, GROUP_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("item_type", &type_name::<T>())
            .field("key", &self.key)
            .field("ptr", &self.ptr)
            .finish_non_exhaustive()
    }
}
