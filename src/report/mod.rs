//! Statistics reduction and result rows.
//!
//! Each [`BenchmarkResult`] collapses to a [`Summary`] (trial count, worst
//! sample, mean) and then to a seven-cell row for the results table.

pub mod table;

use thiserror::Error;

use crate::result::BenchmarkResult;

pub use table::{Align, StreamingTable, TableLayout};

/// Column headers of the results table.
pub const RESULT_HEADERS: [&str; 7] = [
    "Benchmark",
    "Implementation",
    "Browser",
    "Version",
    "Trials",
    "Worst (ms)",
    "Avg (ms)",
];

/// Column headers of the manual-mode dispatch table.
pub const DISPATCH_HEADERS: [&str; 3] = ["Benchmark", "Implementation", "URL"];

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("result for {implementation}/{name} has no samples")]
    EmptySamples { name: String, implementation: String },
}

/// Reduced view of one result's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub trials: usize,
    pub worst: f64,
    pub avg: f64,
}

/// Reduce a result's samples to worst and mean.
pub fn summarize(result: &BenchmarkResult) -> Result<Summary, StatsError> {
    let samples = &result.millis;
    if samples.is_empty() {
        return Err(StatsError::EmptySamples {
            name: result.name.clone(),
            implementation: result.implementation.clone(),
        });
    }

    let worst = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;

    Ok(Summary {
        trials: samples.len(),
        worst,
        avg,
    })
}

/// Format a millisecond value with the table's fixed precision.
pub fn format_millis(value: f64) -> String {
    format!("{:.3}", value)
}

/// Build the table row for a result.
pub fn result_row(result: &BenchmarkResult) -> Result<Vec<String>, StatsError> {
    let summary = summarize(result)?;
    Ok(vec![
        result.name.clone(),
        result.implementation.clone(),
        result.browser.name.clone(),
        result.browser.version.clone(),
        summary.trials.to_string(),
        format_millis(summary.worst),
        format_millis(summary.avg),
    ])
}

/// Layout for the results table: text left, numbers right.
pub fn result_layout() -> TableLayout {
    TableLayout::new(vec![
        (16, Align::Left),
        (16, Align::Left),
        (8, Align::Left),
        (14, Align::Left),
        (6, Align::Right),
        (12, Align::Right),
        (12, Align::Right),
    ])
}

/// Layout for the dispatch table.
pub fn dispatch_layout() -> TableLayout {
    TableLayout::new(vec![(16, Align::Left), (16, Align::Left), (48, Align::Left)])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
