//! Failing target demo - the profiled code returns an error part way through
//!
//! The session still persists what it recorded before the failure and hands
//! the error back together with those partial results.
//!
//! Run with: RUST_LOG=info cargo run --example failing_target

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use callprof::export::render_report;
use callprof::session::SessionError;
use callprof::{location, Session, SessionConfig, Tracer};

const THIS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/examples/failing_target.rs");

fn load_record(tracer: &Tracer, index: u32) -> Result<u32> {
    let _scope = tracer.scope(location!("load_record"));
    std::thread::sleep(Duration::from_millis(150));
    if index == 3 {
        bail!("record {index} is corrupt");
    }
    Ok(index * 10)
}

fn import(tracer: &Tracer) -> Result<u32> {
    let _scope = tracer.scope(location!("import"));
    let mut sum = 0;
    for index in 0..6 {
        sum += load_record(tracer, index)?;
    }
    Ok(sum)
}

fn main() -> Result<()> {
    env_logger::init();

    let config = SessionConfig::new(THIS_FILE)
        .with_interval(Duration::from_millis(50))
        .with_output_dir(Path::new("."));

    match Session::new(config)?.run(import) {
        Ok((sum, output)) => {
            println!("imported {sum}");
            print!("{}", render_report(&output.stats.rows(), &output.series));
        }
        Err(SessionError::Target(run)) => {
            println!("import failed: {}", run.fault);
            println!("partial results ({} ticks):", run.output.ticks);
            print!("{}", render_report(&run.output.stats.rows(), &run.output.series));
        }
        Err(SessionError::Profiler(e)) => return Err(e.into()),
    }
    Ok(())
}
