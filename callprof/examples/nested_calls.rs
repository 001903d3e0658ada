//! Nested calls demo - a CPU-bound function calling a helper in a loop
//!
//! Writes `realtime_monitor.json` and `function_statistics.json` into the
//! current directory, then prints the report.
//!
//! Run with: RUST_LOG=debug cargo run --example nested_calls

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use callprof::export::render_report;
use callprof::{location, Session, SessionConfig, Tracer};

const THIS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/examples/nested_calls.rs");

fn checksum(tracer: &Tracer, seed: u64) -> u64 {
    let _scope = tracer.scope(location!("checksum"));
    (0..2_000_000u64).fold(seed, |acc, x| acc.wrapping_mul(31).wrapping_add(x))
}

fn pause(tracer: &Tracer) {
    let _scope = tracer.scope(location!("pause"));
    std::thread::sleep(Duration::from_millis(300));
}

fn pipeline(tracer: &Tracer) -> u64 {
    let _scope = tracer.scope(location!("pipeline"));
    let mut total = 0;
    for seed in 0..5 {
        total ^= checksum(tracer, seed);
        pause(tracer);
    }
    total
}

fn main() -> Result<()> {
    env_logger::init();

    let config = SessionConfig::new(THIS_FILE)
        .with_interval(Duration::from_millis(100))
        .with_output_dir(Path::new("."));

    let (total, output) = Session::new(config)?
        .run(|tracer| -> Result<u64> { Ok(pipeline(tracer)) })
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("pipeline result: {total:#x}");
    print!("{}", render_report(&output.stats.rows(), &output.series));
    Ok(())
}
