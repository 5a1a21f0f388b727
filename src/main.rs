use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use browserbench::config::BenchConfig;
use browserbench::driver::ProcessLauncher;
use browserbench::orchestrator::{self, Mode};
use browserbench::server::{BenchServer, ServerOptions};
use browserbench::spec::resolve_specs;
use browserbench::store::RunStore;

#[derive(Parser)]
#[command(
    name = "browserbench",
    about = "Browser benchmark harness: serve benchmark cases, drive browsers, tabulate timings",
    version,
    long_about = None
)]
struct Cli {
    /// Interface for the benchmark server
    #[arg(long)]
    host: Option<String>,

    /// Port for the benchmark server (0 picks a free port)
    #[arg(long)]
    port: Option<u16>,

    /// Benchmarks to run: `*` or a comma-separated list
    #[arg(short = 'n', long, default_value = "*")]
    name: String,

    /// Implementations to run: `*` or a comma-separated list
    #[arg(short = 'i', long, default_value = "lit-html")]
    implementation: String,

    /// Browsers to drive in automatic mode (comma-separated: chrome, firefox)
    #[arg(short = 'b', long, default_value = "chrome")]
    browser: String,

    /// Trials per benchmark
    #[arg(short = 't', long, default_value_t = 10)]
    trials: u32,

    /// Print URLs to open by hand and stream results as they arrive
    #[arg(short = 'm', long)]
    manual: bool,

    /// Append each result to the benchmark's runs.json history
    #[arg(short = 's', long)]
    save: bool,

    /// Config file (defaults: $BROWSERBENCH_CONFIG, ./browserbench.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(level: &str, verbose: bool) {
    let default = if verbose { "debug" } else { level };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = BenchConfig::resolve(cli.config.as_deref())?;
    init_tracing(&resolved.config.logging.level, cli.verbose);
    resolved.log();
    let config = resolved.config;

    // Configuration errors are reported before anything starts.
    orchestrator::validate_trials(cli.trials)?;
    let mode = Mode::from_options(cli.manual, &cli.browser)?;

    let root = config.benchmarks.root.clone();
    let specs = resolve_specs(&root, &cli.implementation, &cli.name, cli.trials)
        .await
        .with_context(|| format!("failed to list benchmarks under {}", root.display()))?;
    tracing::info!(count = specs.len(), root = %root.display(), "resolved benchmarks");

    let server = BenchServer::start(ServerOptions {
        host: cli.host.unwrap_or(config.server.host),
        port: cli.port.unwrap_or(config.server.port),
        root: root.clone(),
    })
    .await?;

    let store = cli.save.then(|| RunStore::new(&root));

    match mode {
        Mode::Automatic { browsers } => {
            let launcher = ProcessLauncher::new(config.browsers);
            let mut stdout = std::io::stdout();
            orchestrator::run_automatic(
                server,
                &launcher,
                &browsers,
                &specs,
                store.as_ref(),
                &mut stdout,
            )
            .await?;
        }
        Mode::Manual => {
            let consumer =
                orchestrator::run_manual(&server, &specs, store, std::io::stdout()).await?;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for interrupt")?;
            tracing::info!("interrupted, exiting");
            // The server is not closed on this path; the process exit releases it.
            consumer.abort();
        }
    }

    Ok(())
}
