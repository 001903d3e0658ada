//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "callprof",
    about = "Print the report for a recorded callprof session",
    after_help = "\
EXAMPLES:
    callprof --stats function_statistics.json
    callprof --stats function_statistics.json --timeseries realtime_monitor.json
    callprof --stats function_statistics.json --top 10"
)]
pub struct Args {
    /// Per-function statistics file written at the end of a session
    #[arg(long, value_name = "FILE")]
    pub stats: PathBuf,

    /// Per-second resource log written during a session
    #[arg(long, value_name = "FILE")]
    pub timeseries: Option<PathBuf>,

    /// Show only the N functions with the highest total time (0 = all)
    #[arg(long, default_value = "0", value_name = "N")]
    pub top: usize,
}
