//! Human-readable tabular report.
//!
//! ```text
//! Function Statistics:
//! Function                                           Calls      Total Time(s) Avg CPU(%) ...
//! ------------------------------------------------------------------------------------- ...
//! app.rs:a:10                                        1          0.3021       97.50      ...
//! ```

use std::fmt::Write as _;

use crate::analysis::FunctionStats;
use crate::export::PerSecondLogEntry;

const STATS_RULE_WIDTH: usize = 120;
const SERIES_RULE_WIDTH: usize = 80;

/// Render function rows (already in display order) and the time series.
pub fn render_report(rows: &[(String, FunctionStats)], series: &[PerSecondLogEntry]) -> String {
    let mut out = String::new();
    render_function_table(&mut out, rows);
    render_series_table(&mut out, series);
    out
}

fn render_function_table(out: &mut String, rows: &[(String, FunctionStats)]) {
    let _ = writeln!(out, "\nFunction Statistics:");
    let _ = writeln!(
        out,
        "{:<50} {:<10} {:<13} {:<10} {:<11} {:<11} {:<12}",
        "Function", "Calls", "Total Time(s)", "Avg CPU(%)", "Avg Mem(MB)", "Peak CPU(%)", "Peak Mem(MB)"
    );
    let _ = writeln!(out, "{}", "-".repeat(STATS_RULE_WIDTH));

    for (key, stats) in rows {
        let _ = writeln!(
            out,
            "{:<50} {:<10} {:<13.4} {:<10.2} {:<11.2} {:<11.2} {:<12.2}",
            key,
            stats.calls,
            stats.total_time,
            stats.avg_cpu,
            stats.avg_mem,
            stats.peak_cpu,
            stats.peak_mem
        );
    }
}

fn render_series_table(out: &mut String, series: &[PerSecondLogEntry]) {
    let _ = writeln!(out, "\nResource Usage Per Second:");
    let _ = writeln!(out, "{:<10} {:<8} {:<11} {:<50}", "Time", "CPU (%)", "Memory (MB)", "Active Functions");
    let _ = writeln!(out, "{}", "-".repeat(SERIES_RULE_WIDTH));

    for entry in series {
        let _ = writeln!(
            out,
            "{:<10} {:<8.1} {:<11.1} {:<50}",
            entry.timestamp,
            entry.cpu,
            entry.mem,
            entry.active_functions.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_rows_in_given_order() {
        let rows = vec![
            ("app.rs:slow:3".to_string(), FunctionStats { calls: 1, total_time: 1.5, ..Default::default() }),
            ("app.rs:fast:9".to_string(), FunctionStats { calls: 4, total_time: 0.2, ..Default::default() }),
        ];
        let report = render_report(&rows, &[]);

        let slow = report.find("app.rs:slow:3").unwrap();
        let fast = report.find("app.rs:fast:9").unwrap();
        assert!(slow < fast);
        assert!(report.contains("1.5000"));
        assert!(report.contains("Function Statistics:"));
    }

    #[test]
    fn test_report_includes_series() {
        let series = vec![PerSecondLogEntry {
            timestamp: "09:15:02".to_string(),
            cpu: 42.0,
            mem: 128.25,
            active_functions: vec!["app.rs:<main>:1".to_string(), "app.rs:load:5".to_string()],
        }];
        let report = render_report(&[], &series);

        assert!(report.contains("Resource Usage Per Second:"));
        assert!(report.contains("09:15:02"));
        assert!(report.contains("42.0"));
        assert!(report.contains("app.rs:<main>:1, app.rs:load:5"));
    }
}
