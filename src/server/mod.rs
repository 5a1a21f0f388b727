//! Benchmark HTTP server.
//!
//! [`BenchServer`] serves the benchmark catalog, hands out [`RunHandle`]s
//! that pair a navigable URL with a one-shot result channel, and optionally
//! republishes every submitted result on a live [`ResultFeed`].
//!
//! Lifecycle is `start -> serve -> close`; `close` consumes the server so it
//! can run at most once.

mod routes;
pub mod user_agent;

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::result::BenchmarkResult;
use crate::spec::BenchmarkSpec;

pub use routes::Submission;

/// How long `close` waits for in-flight connections to drain.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("benchmark root {} is not a readable directory: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("benchmark {spec} not found at {}: {source}", path.display())]
    Benchmark {
        spec: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("run {run_id} ended without reporting a result")]
    ResultDropped { run_id: String },

    #[error("live result feed already has a subscriber")]
    FeedTaken,

    #[error("server task failed: {0}")]
    Serve(String),
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared between the server handle and its request handlers.
#[derive(Default)]
pub(crate) struct ServerState {
    /// Runs awaiting a submission, keyed by run id.
    pending: Mutex<HashMap<String, oneshot::Sender<BenchmarkResult>>>,
    /// Live feed sender; only set once someone subscribes.
    feed: Mutex<Option<mpsc::UnboundedSender<BenchmarkResult>>>,
}

impl ServerState {
    pub(crate) async fn register(&self, run_id: String) -> oneshot::Receiver<BenchmarkResult> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        // Drop runs whose handle is gone; nobody will read their result.
        pending.retain(|_, tx| !tx.is_closed());
        pending.insert(run_id, tx);
        rx
    }

    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<BenchmarkResult>, ServerError> {
        let mut feed = self.feed.lock().await;
        if feed.is_some() {
            return Err(ServerError::FeedTaken);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *feed = Some(tx);
        Ok(rx)
    }

    /// Route a submitted result to its pending run and the live feed.
    pub(crate) async fn deliver(&self, run_id: Option<&str>, result: BenchmarkResult) {
        if let Some(run_id) = run_id {
            match self.pending.lock().await.remove(run_id) {
                Some(tx) => {
                    // The run handle may already be gone (manual mode).
                    let _ = tx.send(result.clone());
                }
                None => warn!(run_id, "result submitted for unknown run"),
            }
        }

        let mut feed = self.feed.lock().await;
        if let Some(tx) = feed.as_ref() {
            if tx.send(result).is_err() {
                debug!("live feed subscriber dropped");
                *feed = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RunHandle / ResultFeed
// ---------------------------------------------------------------------------

/// A registered run: where to point the browser, and where its result lands.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: String,
    pub url: String,
    result: oneshot::Receiver<BenchmarkResult>,
}

impl RunHandle {
    /// Wait for the browser to report this run's trials. No timeout.
    pub async fn result(self) -> Result<BenchmarkResult, ServerError> {
        self.result.await.map_err(|_| ServerError::ResultDropped {
            run_id: self.run_id,
        })
    }
}

/// Every submitted result, in arrival order. Ends only when the server is
/// dropped.
#[derive(Debug)]
pub struct ResultFeed {
    rx: mpsc::UnboundedReceiver<BenchmarkResult>,
}

impl Stream for ResultFeed {
    type Item = BenchmarkResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// BenchServer
// ---------------------------------------------------------------------------

/// Where and what to serve.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    /// `0` asks the OS for a free port.
    pub port: u16,
    pub root: PathBuf,
}

pub struct BenchServer {
    root: PathBuf,
    addr: SocketAddr,
    base_url: String,
    state: Arc<ServerState>,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl BenchServer {
    /// Bind the listener and begin serving in a background task.
    pub async fn start(options: ServerOptions) -> Result<Self, ServerError> {
        let meta = tokio::fs::metadata(&options.root)
            .await
            .map_err(|source| ServerError::Root {
                path: options.root.clone(),
                source,
            })?;
        if !meta.is_dir() {
            return Err(ServerError::Root {
                path: options.root.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        let bind_addr = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind((options.host.as_str(), options.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: bind_addr,
            source,
        })?;

        let state = Arc::new(ServerState::default());
        let app = routes::router(Arc::clone(&state), &options.root);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let base_url = format!("http://{}", url_authority(addr));
        info!(addr = %addr, root = %options.root.display(), "benchmark server listening");

        Ok(Self {
            root: options.root,
            addr,
            base_url,
            state,
            shutdown_tx,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Root URL, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL that runs `spec` when opened in a browser.
    pub fn spec_url(&self, spec: &BenchmarkSpec) -> String {
        format!(
            "{}/{}/{}/?trials={}",
            self.base_url, spec.implementation, spec.name, spec.trials
        )
    }

    /// Register a run of `spec` and return its dispatch URL and result channel.
    pub async fn run_benchmark(&self, spec: &BenchmarkSpec) -> Result<RunHandle, ServerError> {
        let path = self.root.join(&spec.implementation).join(&spec.name);
        tokio::fs::metadata(&path)
            .await
            .map_err(|source| ServerError::Benchmark {
                spec: spec.relative_dir(),
                path: path.clone(),
                source,
            })?;

        let run_id = Uuid::new_v4().to_string();
        let url = format!("{}&runId={}", self.spec_url(spec), run_id);
        let result = self.state.register(run_id.clone()).await;

        debug!(run_id = %run_id, spec = %spec, "registered run");
        Ok(RunHandle {
            run_id,
            url,
            result,
        })
    }

    /// Subscribe to every result submitted from now on. One subscriber only.
    pub async fn stream_results(&self) -> Result<ResultFeed, ServerError> {
        let rx = self.state.subscribe().await?;
        Ok(ResultFeed { rx })
    }

    /// Stop accepting connections and release the listening socket.
    pub async fn close(self) -> Result<(), ServerError> {
        let _ = self.shutdown_tx.send(());
        let mut task = self.task;
        match tokio::time::timeout(CLOSE_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(ServerError::Serve(e.to_string())),
            Ok(Err(e)) => return Err(ServerError::Serve(e.to_string())),
            Err(_) => {
                warn!("server did not drain in time, aborting");
                task.abort();
            }
        }
        info!(addr = %self.addr, "benchmark server closed");
        Ok(())
    }
}

/// `host:port` suitable for a URL; wildcard binds are reached via loopback.
fn url_authority(addr: SocketAddr) -> String {
    let ip = addr.ip();
    if ip.is_unspecified() {
        match addr {
            SocketAddr::V4(_) => format!("127.0.0.1:{}", addr.port()),
            SocketAddr::V6(_) => format!("[::1]:{}", addr.port()),
        }
    } else {
        addr.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
