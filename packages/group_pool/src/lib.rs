//! This package provides [`Pool`], an object pool for values of a single type that grows as a
//! chain of fixed-capacity groups and hands out scoped [`Handle`]s.
//!
//! It is intended for hot-path objects that would otherwise be allocated on the heap one at a
//! time: the pool carves storage in groups of `GROUP_SIZE` slots and recycles released slots.
//!
//! # Features
//!
//! - **Scoped ownership**: [`Pool::make()`] returns a [`Handle`] that owns its slot and releases
//!   it when dropped, on every exit path including early returns and panics.
//! - **Move-only handles**: a slot is never owned by two handles. Copying a value into a new slot
//!   is explicit via [`Handle::duplicate()`].
//! - **Monotonic growth**: when every slot is taken, a new group is appended to the chain. Groups
//!   are only freed together with the pool, so addresses of pooled values are stable.
//! - **LIFO reuse**: the most recently released slot of the oldest group with space is reused
//!   first.
//! - **Checked releases**: releasing a slot twice or to the wrong pool is detected and reported
//!   as a [`PoolError`] instead of corrupting the free list.
//! - **Lifetime-checked teardown**: handles borrow their pool, so the compiler rejects code that
//!   drops a pool while handles are outstanding. [`DropPolicy::MustNotDropItems`] additionally
//!   detects leaked handles at runtime.
//!
//! # Example
//!
//! ```rust
//! use group_pool::Pool;
//!
//! let pool = Pool::<i32, 4>::new(0);
//!
//! // Four values fill the first group exactly.
//! let handles: Vec<_> = [5, 6, 7, 8].into_iter().map(|v| pool.make(v)).collect();
//! assert_eq!(pool.group_count(), 1);
//!
//! // The fifth value needs a second group.
//! let nine = pool.make(9);
//! assert_eq!(pool.group_count(), 2);
//! assert_eq!(*nine, 9);
//!
//! // Releasing a value makes its slot the next one to be reused.
//! let mut handles = handles;
//! let six = handles.remove(1);
//! let six_key = six.key();
//! drop(six);
//!
//! let answer = pool.make(42);
//! assert_eq!(answer.key(), six_key);
//! assert_eq!(*answer, 42);
//! ```
//!
//! # Thread safety
//!
//! The pool has no internal synchronization. It is [`Send`] when `T` is but never [`Sync`], and
//! handles are neither. Use one pool per thread or serialize access externally.

mod builder;
mod drop_policy;
mod error;
mod group;
mod handle;
mod key;
mod pool;
mod release_policy;
mod slot;

pub use builder::*;
pub use drop_policy::*;
pub use error::PoolError;
pub(crate) use error::Result;
pub(crate) use group::*;
pub use handle::*;
pub use key::*;
pub use pool::*;
pub use release_policy::*;
pub(crate) use slot::*;
