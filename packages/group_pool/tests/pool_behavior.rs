//! End-to-end behavior of the pool through its public API.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use group_pool::{DropPolicy, Pool, ReleasePolicy};

#[test]
fn growth_adds_exactly_one_group_per_overflow() {
    const GROUP_SIZE: usize = 8;

    let pool = Pool::<usize, GROUP_SIZE>::new(0);

    let mut handles: Vec<_> = (0..=GROUP_SIZE).map(|i| pool.make(i)).collect();
    assert_eq!(pool.group_count(), 2);

    handles.extend((0..GROUP_SIZE).map(|i| pool.make(i)));
    assert_eq!(handles.len(), 2 * GROUP_SIZE + 1);
    assert_eq!(pool.group_count(), 3);
}

#[test]
fn most_recently_released_slot_is_reused_first() {
    let pool = Pool::<i32, 4>::new(0);

    let a = pool.make(1);
    let b = pool.make(2);
    let c = pool.make(3);

    let (a_key, b_key) = (a.key(), b.key());

    drop(b);
    drop(a);

    let first = pool.make(10);
    let second = pool.make(20);

    assert_eq!(first.key(), a_key);
    assert_eq!(second.key(), b_key);
    assert_eq!(*c, 3);
}

#[test]
fn pooled_values_are_recognized_as_members() {
    let pool = Pool::<u64, 3>::new(0);
    let other = Pool::<u64, 3>::new(0);

    let handles: Vec<_> = (0..10_u64).map(|i| pool.make(i)).collect();
    let foreign = other.make(1_u64);

    for handle in &handles {
        assert!(pool.contains(handle));
        assert!(!other.contains(handle));
    }

    assert!(!pool.contains(&foreign));
}

#[test]
fn any_release_order_returns_every_slot() {
    let pool = Pool::<i32, 5>::new(0);

    let mut handles: Vec<_> = (0..23).map(|i| pool.make(i)).collect();
    let capacity = pool.capacity();
    assert_eq!(pool.len(), 23);

    // Interleave releases from both ends.
    let mut from_front = true;
    while !handles.is_empty() {
        if from_front {
            drop(handles.remove(0));
        } else {
            drop(handles.pop());
        }
        from_front = !from_front;
    }

    assert_eq!(pool.len(), 0);
    assert!(pool.is_empty());

    let refill: Vec<_> = (0..capacity).map(|_| pool.make_with(|_| {})).collect();
    let keys: HashSet<_> = refill.iter().map(|handle| handle.key()).collect();

    assert_eq!(keys.len(), capacity);
    assert_eq!(pool.capacity(), capacity);
}

#[derive(Debug)]
struct ParseFailure;

fn use_then_fail(pool: &Pool<i32, 4>) -> Result<(), ParseFailure> {
    let mut scratch = pool.make(1);
    *scratch += 1;

    let _value: i32 = "twelve".parse().map_err(|_parse_error| ParseFailure)?;

    Ok(())
}

#[test]
fn propagated_failure_releases_scoped_handle() {
    let pool = Pool::<i32, 4>::new(0);
    let _keep = pool.make(0);
    let before = pool.len();

    assert!(use_then_fail(&pool).is_err());

    assert_eq!(pool.len(), before);
}

#[test]
fn documented_scenario() {
    let pool = Pool::<i32, 4>::new(0);

    let five = pool.make(5);
    let six = pool.make(6);
    let seven = pool.make(7);
    let eight = pool.make(8);
    assert_eq!(pool.group_count(), 1);
    assert_eq!(pool.len(), 4);

    let nine = pool.make(9);
    assert_eq!(pool.group_count(), 2);
    assert_eq!(*nine, 9);
    assert_eq!(nine.key().index(), 4);

    let six_key = six.key();
    drop(six);

    let answer = pool.make(42);
    assert_eq!(*answer, 42);
    assert_eq!(answer.key(), six_key);

    assert_eq!((*five, *seven, *eight), (5, 7, 8));
}

#[test]
fn values_are_dropped_on_release() {
    #[derive(Clone, Default)]
    struct Counted(Option<Rc<Cell<usize>>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            if let Some(drops) = &self.0 {
                drops.set(drops.get() + 1);
            }
        }
    }

    let drops = Rc::new(Cell::new(0));
    let pool = Pool::<Counted, 2>::default();

    let handle = pool.make(Counted(Some(Rc::clone(&drops))));
    assert_eq!(drops.get(), 0);

    drop(handle);
    assert_eq!(drops.get(), 1);
}

#[test]
fn retained_values_are_dropped_on_reuse() {
    #[derive(Clone, Default)]
    struct Counted(Option<Rc<Cell<usize>>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            if let Some(drops) = &self.0 {
                drops.set(drops.get() + 1);
            }
        }
    }

    let drops = Rc::new(Cell::new(0));
    let pool = Pool::<Counted, 1>::builder(Counted::default())
        .release_policy(ReleasePolicy::Retain)
        .build();

    drop(pool.make(Counted(Some(Rc::clone(&drops)))));
    assert_eq!(drops.get(), 0);

    drop(pool.make(Counted::default()));
    assert_eq!(drops.get(), 1);
}

#[test]
fn strict_pool_with_all_handles_released_drops_cleanly() {
    let pool = Pool::<String, 4>::builder(String::new())
        .drop_policy(DropPolicy::MustNotDropItems)
        .build();

    {
        let _a = pool.make("a");
        let _b = pool.make("b");
    }

    drop(pool);
}

#[test]
fn try_make_succeeds_under_normal_conditions() {
    let pool = Pool::<i32, 2>::new(0);

    let handles: Vec<_> = (0..5).map(|i| pool.try_make(i).unwrap()).collect();

    assert_eq!(pool.len(), 5);
    assert_eq!(pool.group_count(), 3);
    assert_eq!(*handles[4], 4);
}
