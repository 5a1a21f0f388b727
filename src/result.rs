//! Trial data reported back by a browser.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser that produced a result, as reported in its `User-Agent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

impl BrowserInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new("unknown", "unknown")
    }
}

impl fmt::Display for BrowserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Timings for one completed run: one sample per trial, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub implementation: String,
    pub browser: BrowserInfo,
    pub millis: Vec<f64>,
}

impl BenchmarkResult {
    /// Catalog path of the benchmark this result claims to be for.
    pub fn relative_dir(&self) -> String {
        format!("{}/{}", self.implementation, self.name)
    }
}
