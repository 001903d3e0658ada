//! Command-line interface for the report binary

mod args;

pub use args::Args;
