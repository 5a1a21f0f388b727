//! browserbench -- serve browser benchmark cases, drive browsers through
//! them, and tabulate the timings.
//!
//! This crate provides the spec resolver, the benchmark HTTP server, browser
//! drivers, the two execution modes, statistics and table output, and the
//! per-benchmark run history.

pub mod config;
pub mod driver;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod server;
pub mod spec;
pub mod store;
