//! # callprof - Report Entry Point
//!
//! Loads the artifacts of a finished profiling session and prints the
//! function statistics table, followed by the per-second resource log when
//! one is given.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use callprof::cli::Args;
use callprof::export::{load_stats, load_timeseries, render_report, sorted_rows};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
                _ => EXIT_USAGE,
            };
            // Printing help/usage to the terminal; nothing useful to do on failure
            let _ = e.print();
            std::process::exit(code);
        }
    };

    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run(args: &Args) -> Result<()> {
    let stats = load_stats(&args.stats)
        .with_context(|| format!("Failed to load statistics from {}", args.stats.display()))?;
    debug!("loaded {} function entries", stats.len());

    let mut rows = sorted_rows(stats);
    if args.top > 0 {
        rows.truncate(args.top);
    }

    let series = match &args.timeseries {
        Some(path) => load_timeseries(path)
            .with_context(|| format!("Failed to load time series from {}", path.display()))?,
        None => Vec::new(),
    };
    debug!("loaded {} per-second entries", series.len());

    print!("{}", render_report(&rows, &series));
    Ok(())
}
