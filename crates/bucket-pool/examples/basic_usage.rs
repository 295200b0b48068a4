//! Basic usage of nebula-bucket-pool
//!
//! Declares a profile, allocates through two element types sharing one
//! pool, and prints pool statistics.
//!
//! Run with `RUST_LOG=trace cargo run --example basic_usage` to see the
//! allocator's events.

use std::ptr::NonNull;

use nebula_bucket_pool::prelude::*;
use tracing_subscriber::EnvFilter;

pool_profile! {
    /// Small records and occasional buffers
    pub struct Demo { (24, 4_096), (32, 1_024), (1_024, 64) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
    z: f64,
}

fn main() -> MemoryResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== nebula-bucket-pool: basic usage ===\n");

    let points = PoolAllocator::<Point, Demo>::with_config(PoolConfig::monitored(), default_source())?;
    let bytes = points.rebind::<u8>();
    println!("Allocators share a pool: {}", points.equals(&bytes));

    // 1. Typed allocation: one Point fits the 24-byte bucket exactly
    let ptr: NonNull<Point> = points.allocate(1)?;
    // SAFETY: ptr addresses storage for one Point.
    unsafe { ptr.write(Point { x: 1.0, y: 2.0, z: 3.0 }) };
    // SAFETY: written above.
    println!("Stored {:?}", unsafe { ptr.read() });

    // 2. Byte buffer: 700 bytes is served by the 1 KiB bucket
    let buffer = bytes.allocate(700)?;

    for (index, stats) in points.bucket_stats().iter().enumerate() {
        println!(
            "bucket {index}: {:>5} B blocks, {:>5}/{:<5} free, largest run {}",
            stats.block_size, stats.free_blocks, stats.block_count, stats.largest_free_run
        );
    }

    // SAFETY: both pointers came from allocators sharing this pool and are
    // not used afterwards.
    unsafe {
        points.deallocate(ptr, 1);
        bytes.deallocate(buffer, 700);
    }

    // 3. Misuse is reported, not fatal
    let mut local = Point { x: 0.0, y: 0.0, z: 0.0 };
    // SAFETY: the pool rejects the pointer by address and never touches it.
    match unsafe { points.try_deallocate(NonNull::from(&mut local), 1) } {
        Ok(()) => println!("unexpected: foreign pointer accepted"),
        Err(err) => println!("Foreign pointer rejected: {err} [{}]", err.code()),
    }

    if let Some(stats) = points.stats() {
        println!("\n{stats}");
    }
    Ok(())
}
