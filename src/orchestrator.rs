//! Execution modes.
//!
//! **Automatic** owns the browsers: for each browser in turn it launches a
//! driver, walks every spec (register run, navigate, wait for the result),
//! closes the driver, and finally prints the whole table and closes the
//! server.
//!
//! **Manual** launches nothing: it prints one dispatch URL per spec for an
//! operator to open, prints the results header, and spawns a task that
//! appends a row for every result the server receives. That task never ends
//! on its own, and the server is left open; stopping the process is the
//! caller's concern.

use std::io::{self, Write};

use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::driver::{
    BrowserDriver, BrowserKind, BrowserSelectionError, DriverError, DriverLauncher,
};
use crate::report::table::render_table;
use crate::report::{
    dispatch_layout, result_layout, result_row, StatsError, StreamingTable, DISPATCH_HEADERS,
    RESULT_HEADERS,
};
use crate::result::BenchmarkResult;
use crate::server::{BenchServer, ResultFeed, ServerError};
use crate::spec::BenchmarkSpec;
use crate::store::{BenchmarkSession, RunStore, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RunError {
    #[error("trial count must be positive, got {0}")]
    InvalidTrials(u32),

    #[error(transparent)]
    Browsers(#[from] BrowserSelectionError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("run of {expected} reported results for {reported}")]
    WrongBenchmark { expected: String, reported: String },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How the resolved specs get executed. Chosen once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Automatic { browsers: Vec<BrowserKind> },
    Manual,
}

impl Mode {
    /// Pick the mode, validating the browser selector for automatic runs.
    pub fn from_options(manual: bool, browser_selector: &str) -> Result<Self, RunError> {
        if manual {
            return Ok(Mode::Manual);
        }
        let browsers = crate::driver::parse_browsers(browser_selector)?;
        Ok(Mode::Automatic { browsers })
    }
}

/// Reject configurations that can never run.
pub fn validate_trials(trials: u32) -> Result<(), RunError> {
    if trials == 0 {
        return Err(RunError::InvalidTrials(trials));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Automatic mode
// ---------------------------------------------------------------------------

/// Run every spec in every browser, one at a time, then print the table.
///
/// The server is closed on every exit path. Any failure aborts the run;
/// nothing is retried and no partial table is printed.
pub async fn run_automatic<W: Write>(
    server: BenchServer,
    launcher: &dyn DriverLauncher,
    browsers: &[BrowserKind],
    specs: &[BenchmarkSpec],
    store: Option<&RunStore>,
    out: &mut W,
) -> Result<(), RunError> {
    let outcome = collect_all(&server, launcher, browsers, specs, store).await;

    let rendered = match outcome {
        Ok(rows) => {
            let table = render_table(&result_layout(), &RESULT_HEADERS, &rows);
            out.write_all(table.as_bytes())
                .and_then(|_| out.flush())
                .map_err(RunError::from)
        }
        Err(e) => Err(e),
    };

    let closed = server.close().await;
    rendered?;
    closed?;
    Ok(())
}

async fn collect_all(
    server: &BenchServer,
    launcher: &dyn DriverLauncher,
    browsers: &[BrowserKind],
    specs: &[BenchmarkSpec],
    store: Option<&RunStore>,
) -> Result<Vec<Vec<String>>, RunError> {
    let mut rows = Vec::with_capacity(browsers.len() * specs.len());

    for &browser in browsers {
        let mut driver = launcher.launch(browser).await?;
        info!(browser = %browser, specs = specs.len(), "running benchmarks");

        let outcome = run_specs(server, driver.as_mut(), browser, specs, store, &mut rows).await;

        // Release the browser even when a spec failed.
        let closed = driver.close().await;
        if let (Err(_), Err(close_err)) = (&outcome, &closed) {
            warn!(browser = %browser, error = %close_err, "failed to close browser after error");
        }
        outcome?;
        closed?;
    }

    Ok(rows)
}

async fn run_specs(
    server: &BenchServer,
    driver: &mut dyn BrowserDriver,
    browser: BrowserKind,
    specs: &[BenchmarkSpec],
    store: Option<&RunStore>,
    rows: &mut Vec<Vec<String>>,
) -> Result<(), RunError> {
    for spec in specs {
        let handle = server.run_benchmark(spec).await?;
        info!(browser = %browser, spec = %spec, run_id = %handle.run_id, "dispatching run");

        driver.navigate(&handle.url).await?;
        let result = handle.result().await?;
        info!(
            browser = %result.browser,
            spec = %spec,
            samples = result.millis.len(),
            "collected result"
        );

        if result.name != spec.name || result.implementation != spec.implementation {
            return Err(RunError::WrongBenchmark {
                expected: spec.relative_dir(),
                reported: result.relative_dir(),
            });
        }

        rows.push(result_row(&result)?);
        if let Some(store) = store {
            save_session(store, &spec.relative_dir(), &result).await?;
        }
    }
    Ok(())
}

async fn save_session(
    store: &RunStore,
    benchmark: &str,
    result: &BenchmarkResult,
) -> Result<(), RunError> {
    let session = BenchmarkSession::from_result(result)?;
    store.append(benchmark, &session).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Manual mode
// ---------------------------------------------------------------------------

/// Print the dispatch table and results header, then stream result rows
/// from a background task for as long as the process lives.
///
/// Returns the consumer task. The server is not closed here.
pub async fn run_manual<W>(
    server: &BenchServer,
    specs: &[BenchmarkSpec],
    store: Option<RunStore>,
    mut out: W,
) -> Result<JoinHandle<()>, RunError>
where
    W: Write + Send + 'static,
{
    // Subscribe before any URL is printed so no early result is missed.
    let feed = server.stream_results().await?;

    let mut dispatch = Vec::with_capacity(specs.len());
    for spec in specs {
        let handle = server.run_benchmark(spec).await?;
        dispatch.push(vec![
            spec.name.clone(),
            spec.implementation.clone(),
            handle.url.clone(),
        ]);
    }
    let table = render_table(&dispatch_layout(), &DISPATCH_HEADERS, &dispatch);
    out.write_all(table.as_bytes())?;
    writeln!(out)?;

    let mut results = StreamingTable::new(result_layout(), out);
    results.write_header(&RESULT_HEADERS)?;

    info!(specs = specs.len(), url = %server.base_url(), "waiting for manual results");
    Ok(tokio::spawn(consume_feed(feed, results, store)))
}

async fn consume_feed<W: Write>(
    mut feed: ResultFeed,
    mut table: StreamingTable<W>,
    store: Option<RunStore>,
) {
    while let Some(result) = feed.next().await {
        match result_row(&result) {
            Ok(row) => {
                if let Err(e) = table.push_row(&row) {
                    error!(error = %e, "failed to write result row");
                }
            }
            Err(e) => {
                warn!(error = %e, "skipping result");
                continue;
            }
        }
        if let Some(store) = &store {
            if let Err(e) = save_session(store, &result.relative_dir(), &result).await {
                error!(error = %e, "failed to save session");
            }
        }
    }
    info!("result feed closed");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
