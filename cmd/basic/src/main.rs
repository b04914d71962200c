//! Basic fanpool example
//!
//! Doubles a handful of numbers on a small pool with tight queues, then
//! shows a pool that keeps going when a transform panics.
//!
//! # Environment Variables
//!
//! - `FP_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `FP_FLUSH_EPRINT=1` - Flush log output immediately
//! - `FP_WORKERS`, `FP_INTAKE_CAPACITY`, `FP_OUTTAKE_CAPACITY` - Pool shape

use fanpool::{kdebug, kinfo, Outcome, Pool, PoolConfig, PoolResult};

// FP_LOG_LEVEL=debug cargo run -p fanpool-basic
fn main() -> PoolResult<()> {
    println!("=== fanpool Basic Example ===\n");

    doubling()?;
    outcomes()?;

    println!("\n=== Example Complete ===");
    Ok(())
}

fn doubling() -> PoolResult<()> {
    let config = PoolConfig::from_env().num_workers(2).capacities(2, 2);
    config.print();

    let pool = Pool::run(config, |x: u64| {
        kdebug!("doubling {}", x);
        x * 2
    })?;

    for x in 1..=5 {
        pool.submit(x)?;
    }
    pool.close_intake()?;

    let summary = pool.wait()?;
    kinfo!("doubling finished: {}", summary);

    let mut doubled = pool.collect()?;
    println!("arrival order: {:?}", doubled);
    doubled.sort_unstable();
    println!("sorted:        {:?}", doubled);
    Ok(())
}

fn outcomes() -> PoolResult<()> {
    println!("\n--- panicking transform ---");

    let config = PoolConfig::from_env().num_workers(3);
    let pool = Pool::with_outcomes(config, |x: u64| {
        if x % 4 == 0 {
            panic!("refusing multiple of four: {}", x);
        }
        100 / x
    })?;
    pool.start()?;

    let source = pool.feed(1..=10u64)?;
    for outcome in pool.drain()? {
        match outcome {
            Outcome::Done(v) => println!("  ok     {}", v),
            Outcome::Failed(failure) => println!("  failed {}", failure),
        }
    }

    let report = source.join()?;
    let summary = pool.wait()?;
    println!("fed {} job(s); {}", report.submitted, summary);
    Ok(())
}
