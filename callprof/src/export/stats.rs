//! Final per-function statistics file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::analysis::{FunctionStats, StatsReport};
use crate::domain::ExportError;

/// Write `report` as a JSON object keyed by `file:function:line`.
///
/// # Errors
/// Returns [`ExportError::WriteFailed`] if the file cannot be created or
/// written.
pub fn write_stats(path: &Path, report: &StatsReport) -> Result<(), ExportError> {
    let write_failed = |source| ExportError::WriteFailed { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(write_failed)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report.to_map())?;
    writer.flush().map_err(write_failed)?;
    Ok(())
}

/// Load a persisted statistics file.
///
/// # Errors
/// Fails if the file cannot be read or does not hold a statistics mapping.
pub fn load_stats(path: &Path) -> Result<BTreeMap<String, FunctionStats>, ExportError> {
    let file = File::open(path)
        .map_err(|source| ExportError::ReadFailed { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Loaded statistics as display rows, sorted by total time descending.
pub fn sorted_rows(stats: BTreeMap<String, FunctionStats>) -> Vec<(String, FunctionStats)> {
    let mut rows: Vec<(String, FunctionStats)> = stats.into_iter().collect();
    rows.sort_by(|(a_key, a), (b_key, b)| {
        b.total_time.total_cmp(&a.total_time).then_with(|| a_key.cmp(b_key))
    });
    rows
}
