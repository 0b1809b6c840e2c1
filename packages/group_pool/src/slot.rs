use std::any::type_name;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ptr::NonNull;

/// One storage cell of a group.
///
/// The slot always holds an initialized `T`. While the slot is free that value is either a copy
/// of the pool's default value or a stale value left behind by the previous owner; neither is
/// logically alive. While the slot is allocated, the value belongs to exactly one handle.
///
/// The value lives in an [`UnsafeCell`] because handles write to it through raw pointers while
/// the group itself is only ever shared. The group never creates references to the value of an
/// allocated slot.
pub(crate) struct Slot<T> {
    value: UnsafeCell<T>,
    state: Cell<SlotState>,
}

/// Whether a slot is on its group's free list, and if so, what follows it there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SlotState {
    /// The slot is on the free list. `next_free` is the index (within the same group) of the
    /// next free slot, with `None` marking the end of the list.
    Free { next_free: Option<usize> },

    Allocated,
}

impl<T> Slot<T> {
    #[must_use]
    pub(crate) fn new(value: T, next_free: Option<usize>) -> Self {
        Self {
            value: UnsafeCell::new(value),
            state: Cell::new(SlotState::Free { next_free }),
        }
    }

    #[must_use]
    pub(crate) fn state(&self) -> SlotState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: SlotState) {
        self.state.set(state);
    }

    #[must_use]
    pub(crate) fn is_allocated(&self) -> bool {
        self.state() == SlotState::Allocated
    }

    /// Pointer to the value. Dereferencing it is only valid for whoever owns the slot at the time.
    #[must_use]
    pub(crate) fn value_ptr(&self) -> NonNull<T> {
        // SAFETY: `UnsafeCell::get()` never returns null.
        unsafe { NonNull::new_unchecked(self.value.get()) }
    }
}

impl<T> fmt::Debug for Slot<T> {
    // The value is not printed because a handle may hold an exclusive reference to it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("item_type", &type_name::<T>())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
