//! Deadline example
//!
//! `sleep-and-talk`: a 5s sleep raced against a 1s deadline, which wins.
//! `pool`: an endless job source whose pool is cancelled by a deadline.
//!
//! Usage: `context [talk|pool]` (default: talk)

use std::thread;
use std::time::{Duration, Instant};

use fanpool::{kinfo, sleep_or_cancel, CancellationToken, Deadline, SleepOutcome};
use fanpool::{Pool, PoolConfig, PoolResult};

fn sleep_and_talk(token: &CancellationToken, d: Duration, msg: &str) {
    match sleep_or_cancel(d, token) {
        SleepOutcome::Elapsed => println!("{}", msg),
        SleepOutcome::Cancelled => println!("cancelled"),
    }
}

fn talk() -> PoolResult<()> {
    println!("started");
    let token = CancellationToken::new();
    let _deadline = Deadline::after(Duration::from_secs(1), &token)?;

    let start = Instant::now();
    sleep_and_talk(&token, Duration::from_secs(5), "hello");
    println!("returned after {:?}", start.elapsed());
    Ok(())
}

fn pool() -> PoolResult<()> {
    let config = PoolConfig::from_env().num_workers(4).capacities(8, 8);
    let pool = Pool::run(config, |x: u64| {
        thread::sleep(Duration::from_millis(5));
        x * x
    })?;

    let deadline = Deadline::after(Duration::from_millis(500), &pool.cancellation_token())?;
    let source = pool.feed(0u64..)?;

    let mut seen = 0u64;
    for _ in pool.drain()? {
        seen += 1;
    }

    let report = source.join()?;
    let summary = pool.wait()?;
    kinfo!("deadline fired: {}", deadline.fired());
    println!("source submitted {} job(s), stopped by {:?}", report.submitted, report.stopped);
    println!("drained {} result(s); {}", seen, summary);
    Ok(())
}

fn main() -> PoolResult<()> {
    match std::env::args().nth(1).as_deref() {
        Some("pool") => pool(),
        Some("talk") | None => talk(),
        Some(other) => {
            eprintln!("unknown mode '{}': expected talk or pool", other);
            std::process::exit(2);
        }
    }
}
