//! Stress test - many jobs through one pool
//!
//! Usage: `stress [jobs] [workers]` (defaults: 1,000,000 jobs, FP_WORKERS)

use std::time::{Duration, Instant};

use fanpool::{Pool, PoolConfig, PoolResult};

fn main() -> PoolResult<()> {
    println!("=== fanpool Stress Test ===\n");

    let mut args = std::env::args().skip(1);
    let num_jobs: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1_000_000);
    let mut config = PoolConfig::from_env();
    if let Some(workers) = args.next().and_then(|s| s.parse().ok()) {
        config = config.num_workers(workers);
    }
    config.print();

    let pool = Pool::run(config, |x: u64| x.wrapping_mul(2_654_435_761) >> 7)?;
    let start = Instant::now();
    let source = pool.feed(0..num_jobs)?;

    let mut received = 0u64;
    let mut checksum = 0u64;
    let mut last_report = Instant::now();
    for v in pool.drain()? {
        received += 1;
        checksum = checksum.wrapping_add(v);
        if last_report.elapsed() > Duration::from_millis(250) {
            print!("\rReceived: {}/{}", received, num_jobs);
            last_report = Instant::now();
        }
    }

    let report = source.join()?;
    let summary = pool.wait()?;
    let total_time = start.elapsed();

    println!("\n\n=== Results ===");
    println!("Submitted:   {}", report.submitted);
    println!("Received:    {}", received);
    println!("Checksum:    {:#x}", checksum);
    println!("Summary:     {}", summary);
    println!("Total time:  {:?}", total_time);
    println!(
        "Throughput:  {:.0} jobs/sec",
        received as f64 / total_time.as_secs_f64()
    );

    println!("\n=== Stress Test Complete ===");
    Ok(())
}
