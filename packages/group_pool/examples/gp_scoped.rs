//! Handles release their slot on every exit path, including early returns via `?`.

use group_pool::Pool;

fn checksum(pool: &Pool<Vec<u8>, 8>, input: &str) -> Result<u32, std::num::ParseIntError> {
    let mut buffer = pool.make_with(Vec::clear);

    for part in input.split(',') {
        // An unparseable part returns early; the buffer slot is still released.
        buffer.push(part.trim().parse()?);
    }

    Ok(buffer.iter().copied().map(u32::from).sum())
}

fn main() {
    let pool = Pool::<Vec<u8>, 8>::new(Vec::with_capacity(32));

    println!("checksum(\"1, 2, 3\") = {:?}", checksum(&pool, "1, 2, 3"));
    println!("checksum(\"1, x, 3\") = {:?}", checksum(&pool, "1, x, 3"));

    println!("Live buffers after both calls: {}", pool.len());
}
