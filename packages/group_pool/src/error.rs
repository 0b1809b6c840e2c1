use thiserror::Error;

/// Errors reported by a [`Pool`][crate::Pool] when its bookkeeping cannot honor a request.
///
/// None of these are recoverable conditions. They indicate either misuse of the pool (a slot
/// being returned twice or to the wrong pool) or exhaustion of the memory needed to grow it.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum PoolError {
    /// A slot was returned to a pool whose group chain does not contain it.
    #[error("slot {index} does not belong to any group in this pool")]
    UnownedRelease {
        /// The pool-wide index of the slot that was returned.
        index: usize,
    },

    /// A slot was returned to the pool while it was already free.
    #[error("slot {index} was released while already free")]
    DoubleRelease {
        /// The pool-wide index of the slot that was returned.
        index: usize,
    },

    /// Backing storage for a new group could not be obtained.
    #[error("out of memory while carving a group of {group_size} slots of {item_type}")]
    OutOfMemory {
        /// Name of the pooled item type.
        item_type: &'static str,

        /// Number of slots the group would have held.
        group_size: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`PoolError`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, PoolError>;
