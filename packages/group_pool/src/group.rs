use std::any::type_name;
use std::cell::{Cell, OnceCell};
use std::mem;
use std::ptr::NonNull;

use tracing::debug;

use crate::{PoolError, ReleasePolicy, Result, Slot, SlotKey, SlotState};

/// The backing storage of a `Pool`: a fixed block of `GROUP_SIZE` slots, the free list threaded
/// through them and an optional successor group.
///
/// The slot array is allocated once, when the group is carved, and never reallocated, so pointers
/// to slot values stay valid for the lifetime of the group. Groups link to at most one successor,
/// which is created lazily the first time the chain runs out of free slots. Successors are never
/// detached before the whole chain is dropped.
///
/// All bookkeeping lives in [`Cell`]s so the pool can allocate and release through a shared
/// reference while handles hold pointers into the slots.
#[derive(Debug)]
pub(crate) struct Group<T, const GROUP_SIZE: usize> {
    slots: Box<[Slot<T>]>,

    /// Position of this group in the chain, starting from zero at the head.
    ordinal: usize,

    /// Pool-wide index of our first slot. Keys in `first_index..first_index + GROUP_SIZE` are ours.
    first_index: usize,

    /// Index of the most recently freed slot. Think of this as the top of a stack of free slots,
    /// with the stack entries stored in the slots themselves. `None` if the group is full.
    free_head: Cell<Option<usize>>,

    /// Number of allocated slots.
    count: Cell<usize>,

    next: OnceCell<Box<Self>>,
}

impl<T: Clone, const GROUP_SIZE: usize> Group<T, GROUP_SIZE> {
    /// Carves a new group at position `ordinal` of the chain, priming every slot with a clone of
    /// `default_value`.
    ///
    /// # Panics
    ///
    /// Panics if `GROUP_SIZE` is zero.
    pub(crate) fn new(ordinal: usize, default_value: &T) -> Result<Self> {
        assert!(GROUP_SIZE > 0, "Group must have non-zero capacity");

        let first_index = ordinal
            .checked_mul(GROUP_SIZE)
            .expect("a chain long enough to overflow usize cannot exist in virtual memory");

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(GROUP_SIZE)
            .map_err(|_reserve_error| PoolError::OutOfMemory {
                item_type: type_name::<T>(),
                group_size: GROUP_SIZE,
            })?;

        // Initially the free list runs through the slots in order: 0, 1, 2, ...
        for index in 0..GROUP_SIZE {
            let next_free = index.checked_add(1).filter(|next| *next < GROUP_SIZE);
            slots.push(Slot::new(default_value.clone(), next_free));
        }

        debug!(
            ordinal,
            first_index,
            group_size = GROUP_SIZE,
            item_type = type_name::<T>(),
            "carved new group"
        );

        Ok(Self {
            slots: slots.into_boxed_slice(),
            ordinal,
            first_index,
            free_head: Cell::new(Some(0)),
            count: Cell::new(0),
            next: OnceCell::new(),
        })
    }

    /// Returns the successor of this group, carving it first if the chain ends here.
    pub(crate) fn next_or_carve(&self, default_value: &T) -> Result<&Self> {
        if let Some(next) = self.next() {
            return Ok(next);
        }

        let successor_ordinal = self
            .ordinal
            .checked_add(1)
            .expect("a chain long enough to overflow usize cannot exist in virtual memory");

        let successor = Box::new(Self::new(successor_ordinal, default_value)?);

        // Cloning the default value could in principle reenter the pool and attach a successor
        // before we get here. In that case the one already attached wins.
        drop(self.next.set(successor));

        Ok(self
            .next()
            .expect("we attached a successor just above if there was none"))
    }
}

impl<T, const GROUP_SIZE: usize> Group<T, GROUP_SIZE> {
    /// Returns an allocated slot to the free list.
    ///
    /// The caller must have verified via [`owns()`][Self::owns] that the key belongs here, and
    /// must not hold any reference to the slot's value. Under [`ReleasePolicy::ResetToDefault`]
    /// the value is replaced with whatever `reset` returns.
    pub(crate) fn release(
        &self,
        key: SlotKey,
        policy: ReleasePolicy,
        reset: impl FnOnce() -> T,
    ) -> Result<()> {
        let index = self.index_in_group(key);

        let slot = self
            .slots
            .get(index)
            .expect("caller guarantees the key is owned by this group");

        if !slot.is_allocated() {
            return Err(PoolError::DoubleRelease { index: key.index() });
        }

        let stale = match policy {
            ReleasePolicy::ResetToDefault => {
                let mut value_ptr = slot.value_ptr();

                // SAFETY: The slot is allocated and its owner is giving it up, so nobody else is
                // referencing the value right now.
                let value = unsafe { value_ptr.as_mut() };

                Some(mem::replace(value, reset()))
            }
            ReleasePolicy::Retain => None,
        };

        // Push the slot onto the free stack.
        slot.set_state(SlotState::Free {
            next_free: self.free_head.get(),
        });
        self.free_head.set(Some(index));

        self.count.set(
            self.count
                .get()
                .checked_sub(1)
                .expect("the slot was allocated so the count must be non-zero"),
        );

        // Dropped last so that a reentrant or panicking destructor sees consistent bookkeeping.
        drop(stale);

        Ok(())
    }

    #[must_use]
    pub(crate) fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub(crate) fn len(&self) -> usize {
        self.count.get()
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.free_head.get().is_none()
    }

    #[must_use]
    pub(crate) fn next(&self) -> Option<&Self> {
        self.next.get().map(|next| &**next)
    }

    /// Whether the key falls in this group's range of slots.
    ///
    /// This is a bounds test only. It says nothing about whether the slot is currently allocated.
    #[must_use]
    pub(crate) fn owns(&self, key: SlotKey) -> bool {
        key.index()
            .checked_sub(self.first_index)
            .is_some_and(|index| index < GROUP_SIZE)
    }

    /// Whether the address lies inside this group's slot storage.
    ///
    /// Like [`owns()`][Self::owns], this is a bounds test only.
    #[must_use]
    pub(crate) fn owns_address(&self, address: *const T) -> bool {
        let storage = self.slots.as_ptr_range();

        storage.start.addr() <= address.addr() && address.addr() < storage.end.addr()
    }

    /// Pops the most recently freed slot, marks it allocated and returns its key together with a
    /// pointer to its value. Returns `None` if the group is full.
    ///
    /// The value is whatever the slot held while free; the caller is expected to overwrite it.
    #[must_use]
    pub(crate) fn try_acquire(&self) -> Option<(SlotKey, NonNull<T>)> {
        let index = self.free_head.get()?;

        let slot = self
            .slots
            .get(index)
            .expect("free list only ever contains indexes of our own slots");

        let SlotState::Free { next_free } = slot.state() else {
            panic!(
                "slot {index} was on the free list but allocated in group {} of {}",
                self.ordinal,
                type_name::<T>()
            );
        };

        slot.set_state(SlotState::Allocated);
        self.free_head.set(next_free);

        self.count.set(
            self.count
                .get()
                .checked_add(1)
                .expect("guarded by the group having a free slot"),
        );

        let key = SlotKey::new(
            self.first_index
                .checked_add(index)
                .expect("guarded by first_index being computed without overflow for the full group"),
        );

        Some((key, slot.value_ptr()))
    }

    fn index_in_group(&self, key: SlotKey) -> usize {
        let index = key
            .index()
            .checked_sub(self.first_index)
            .expect("caller guarantees the key is owned by this group");

        assert!(
            index < GROUP_SIZE,
            "key {} is beyond group {} of {}",
            key.index(),
            self.ordinal,
            type_name::<T>()
        );

        index
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn integrity_check(&self) {
        let observed_allocated = self.slots.iter().filter(|slot| slot.is_allocated()).count();

        assert!(
            self.count.get() == observed_allocated,
            "count {} does not match the observed allocated count {} in group {} of {}",
            self.count.get(),
            observed_allocated,
            self.ordinal,
            type_name::<T>()
        );

        // Walk the free list. Every entry must be a free slot and the walk must visit exactly
        // the free slots, which also rules out cycles.
        let mut visited: usize = 0;
        let mut cursor = self.free_head.get();

        while let Some(index) = cursor {
            assert!(
                visited < GROUP_SIZE,
                "free list of group {} of {} is longer than the group, so it has a cycle",
                self.ordinal,
                type_name::<T>()
            );

            let slot = self.slots.get(index).unwrap_or_else(|| {
                panic!(
                    "free list of group {} of {} points out of bounds at {index}",
                    self.ordinal,
                    type_name::<T>()
                )
            });

            let SlotState::Free { next_free } = slot.state() else {
                panic!(
                    "free list of group {} of {} contains allocated slot {index}",
                    self.ordinal,
                    type_name::<T>()
                );
            };

            visited = visited
                .checked_add(1)
                .expect("guarded by the cycle assertion above");
            cursor = next_free;
        }

        assert!(
            visited
                .checked_add(observed_allocated)
                .is_some_and(|total| total == GROUP_SIZE),
            "free list of group {} of {} reaches {visited} slots but {} are free",
            self.ordinal,
            type_name::<T>(),
            GROUP_SIZE.saturating_sub(observed_allocated)
        );
    }
}

impl<T, const GROUP_SIZE: usize> Drop for Group<T, GROUP_SIZE> {
    fn drop(&mut self) {
        // Unlink the successors one by one. Letting the boxes drop recursively would use stack
        // proportional to the length of the chain.
        let mut next = self.next.take();

        while let Some(mut group) = next {
            next = group.next.take();
        }
    }
}
