//! Per-benchmark run history.
//!
//! Each benchmark directory holds a `runs.json` document of the form
//! `{ "sessions": [ ... ] }`. [`RunStore::append`] reads the document, adds
//! one session at the end, and rewrites the file. Prior sessions and any
//! other top-level fields are carried over untouched.
//!
//! The read-modify-write is not locked: two processes appending to the same
//! file at once can lose an update. One writer per file at a time.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::report::{summarize, StatsError};
use crate::result::{BenchmarkResult, BrowserInfo};

/// History file name inside each benchmark directory.
pub const HISTORY_FILE: &str = "runs.json";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access run history {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("run history {} is corrupted: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("benchmark path {0:?} does not stay inside the catalog")]
    OutsideCatalog(String),

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// On-disk history document. Sessions are kept as raw JSON so older
/// entries survive byte-for-byte regardless of the current session shape.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunHistory {
    #[serde(default)]
    pub sessions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary of one completed run, as persisted by the harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSession {
    pub timestamp: DateTime<Utc>,
    pub browser: BrowserInfo,
    pub implementation: String,
    pub trials: usize,
    pub worst: f64,
    pub avg: f64,
    pub millis: Vec<f64>,
}

impl BenchmarkSession {
    pub fn from_result(result: &BenchmarkResult) -> Result<Self, StatsError> {
        let summary = summarize(result)?;
        Ok(Self {
            timestamp: Utc::now(),
            browser: result.browser.clone(),
            implementation: result.implementation.clone(),
            trials: summary.trials,
            worst: summary.worst,
            avg: summary.avg,
            millis: result.millis.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// RunStore
// ---------------------------------------------------------------------------

/// History files rooted at the benchmark catalog.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// History file for a benchmark, given its path relative to the root
    /// (e.g. `lit-html/render`). Only plain directory names are accepted.
    pub fn history_path(&self, benchmark: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(benchmark);
        let mut components = relative.components().peekable();
        let plain = components.peek().is_some()
            && components.all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StoreError::OutsideCatalog(benchmark.to_string()));
        }
        Ok(self.root.join(relative).join(HISTORY_FILE))
    }

    /// Load a benchmark's history. Missing or blank files are empty history.
    pub async fn load(&self, benchmark: &str) -> Result<RunHistory, StoreError> {
        read_history(&self.history_path(benchmark)?).await
    }

    /// Append `session` to the end of a benchmark's history.
    pub async fn append<S: Serialize>(&self, benchmark: &str, session: &S) -> Result<(), StoreError> {
        let path = self.history_path(benchmark)?;
        let mut history = read_history(&path).await?;

        history.sessions.push(serde_json::to_value(session)?);

        let encoded = serde_json::to_string_pretty(&history)?;
        tokio::fs::write(&path, encoded)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        info!(
            path = %path.display(),
            sessions = history.sessions.len(),
            "appended session to run history"
        );
        Ok(())
    }
}

async fn read_history(path: &Path) -> Result<RunHistory, StoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no run history yet");
            return Ok(RunHistory::default());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(RunHistory::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_benchmark() -> (tempfile::TempDir, RunStore) {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("lit-html/render")).unwrap();
        let store = RunStore::new(dir.path());
        (dir, store)
    }

    fn read_json(store: &RunStore) -> Value {
        let path = store.history_path("lit-html/render").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn test_append_to_missing_file() {
        let (_dir, store) = store_with_benchmark();

        store
            .append("lit-html/render", &json!({ "id": "A" }))
            .await
            .unwrap();

        assert_eq!(read_json(&store), json!({ "sessions": [{ "id": "A" }] }));
    }

    #[tokio::test]
    async fn test_append_preserves_prior_sessions() {
        let (_dir, store) = store_with_benchmark();
        std::fs::write(
            store.history_path("lit-html/render").unwrap(),
            r#"{ "sessions": [ { "id": "A", "nested": { "x": [1, 2] } } ] }"#,
        )
        .unwrap();

        store
            .append("lit-html/render", &json!({ "id": "B" }))
            .await
            .unwrap();

        assert_eq!(
            read_json(&store),
            json!({ "sessions": [
                { "id": "A", "nested": { "x": [1, 2] } },
                { "id": "B" }
            ] })
        );
    }

    #[tokio::test]
    async fn test_whitespace_file_is_empty_history() {
        let (_dir, store) = store_with_benchmark();
        let path = store.history_path("lit-html/render").unwrap();
        std::fs::write(path, "  \n\t\n").unwrap();

        store
            .append("lit-html/render", &json!({ "id": "A" }))
            .await
            .unwrap();

        assert_eq!(read_json(&store), json!({ "sessions": [{ "id": "A" }] }));
    }

    #[tokio::test]
    async fn test_missing_sessions_field_is_initialized() {
        let (_dir, store) = store_with_benchmark();
        std::fs::write(
            store.history_path("lit-html/render").unwrap(),
            r#"{ "note": "kept" }"#,
        )
        .unwrap();

        store
            .append("lit-html/render", &json!({ "id": "A" }))
            .await
            .unwrap();

        assert_eq!(
            read_json(&store),
            json!({ "note": "kept", "sessions": [{ "id": "A" }] })
        );
    }

    #[tokio::test]
    async fn test_corrupt_history_is_fatal_and_untouched() {
        let (_dir, store) = store_with_benchmark();
        let path = store.history_path("lit-html/render").unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = store
            .append("lit-html/render", &json!({ "id": "A" }))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let (_dir, store) = store_with_benchmark();
        let path = store.history_path("lit-html/render").unwrap();
        std::fs::write(path, r#"{ "sessions": 3 }"#).unwrap();

        let err = store.load("lit-html/render").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_session_from_result() {
        let (_dir, store) = store_with_benchmark();
        let result = BenchmarkResult {
            name: "render".to_string(),
            implementation: "lit-html".to_string(),
            browser: BrowserInfo::new("firefox", "121.0"),
            millis: vec![10.0, 20.0, 15.0],
        };
        let session = BenchmarkSession::from_result(&result).unwrap();
        assert_eq!(session.trials, 3);
        assert_eq!(session.worst, 20.0);
        assert_eq!(session.avg, 15.0);

        store.append("lit-html/render", &session).await.unwrap();
        store.append("lit-html/render", &session).await.unwrap();

        let history = store.load("lit-html/render").await.unwrap();
        assert_eq!(history.sessions.len(), 2);
        let decoded: BenchmarkSession =
            serde_json::from_value(history.sessions[1].clone()).unwrap();
        assert_eq!(decoded, session);
    }

    #[tokio::test]
    async fn test_history_path_stays_inside_catalog() {
        let outer = tempfile::TempDir::new().unwrap();
        let root = outer.path().join("catalog");
        std::fs::create_dir_all(&root).unwrap();
        let store = RunStore::new(&root);

        for benchmark in ["../.", "..", "lit-html/../../x", "/tmp/x", "", "./render"] {
            let err = store.append(benchmark, &json!({ "id": "A" })).await.unwrap_err();
            assert!(
                matches!(err, StoreError::OutsideCatalog(_)),
                "{benchmark:?} accepted"
            );
        }
        assert!(!outer.path().join(HISTORY_FILE).exists());
    }
}
