//! Basic usage of the `group_pool` crate:
//!
//! * Creating a pool.
//! * Making values.
//! * Using and releasing them through handles.

use group_pool::Pool;

#[derive(Clone, Debug, Default)]
struct Node {
    id: u32,
    name: String,
}

impl From<(u32, &str)> for Node {
    fn from((id, name): (u32, &str)) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

fn main() {
    let pool = Pool::<Node, 4>::new(Node::default());

    // Making a value gives you a handle that owns the slot it lives in.
    let root = pool.make((1_u32, "root"));
    let mut child = pool.make((2_u32, "child"));

    println!(
        "Pool holds {} nodes in {} group(s) with room for {}",
        pool.len(),
        pool.group_count(),
        pool.capacity()
    );

    // Handles dereference to the pooled value.
    child.name.push_str("-renamed");
    println!("Root #{}: {}", root.id, root.name);
    println!("Child: {:?}", *child);

    // Dropping a handle returns its slot to the pool. The next value reuses it.
    let child_key = child.key();
    drop(child);

    let sibling = pool.make((3_u32, "sibling"));
    println!(
        "Sibling reused slot {} (child had slot {})",
        sibling.key().index(),
        child_key.index()
    );

    // Exceeding the capacity of the first group appends another one to the chain.
    let extra: Vec<_> = (10..15_u32).map(|id| pool.make((id, "extra"))).collect();
    println!(
        "After {} more nodes the pool has {} group(s)",
        extra.len(),
        pool.group_count()
    );
}
