//! Benchmark specs and the selector resolver.
//!
//! A selector is either `*` (everything on disk) or a comma-separated list.
//! Implementations are resolved first, then benchmark names within each
//! implementation, producing the cross-product in a stable order.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selector value meaning "every entry on disk".
pub const WILDCARD: &str = "*";

/// Directory entries that never name an implementation or a benchmark.
pub const IGNORED_ENTRIES: &[&str] = &["node_modules", "package.json", "package-lock.json"];

// ---------------------------------------------------------------------------
// BenchmarkSpec
// ---------------------------------------------------------------------------

/// One benchmark case to execute: a named benchmark of one implementation,
/// run for a fixed number of trials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    pub name: String,
    pub implementation: String,
    pub trials: u32,
}

impl BenchmarkSpec {
    pub fn new(name: impl Into<String>, implementation: impl Into<String>, trials: u32) -> Self {
        Self {
            name: name.into(),
            implementation: implementation.into(),
            trials,
        }
    }

    /// Path of this benchmark relative to the catalog root.
    pub fn relative_dir(&self) -> String {
        format!("{}/{}", self.implementation, self.name)
    }
}

/// Whether `segment` can name one catalog directory: non-empty, not `.` or
/// `..`, and free of path separators.
pub fn is_catalog_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

impl fmt::Display for BenchmarkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} x{}", self.implementation, self.name, self.trials)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Expand the implementation and name selectors into concrete specs.
///
/// Named entries are not checked for existence; a missing directory shows
/// up later when the server is asked to serve it.
pub async fn resolve_specs(
    root: &Path,
    implementation_selector: &str,
    name_selector: &str,
    trials: u32,
) -> io::Result<Vec<BenchmarkSpec>> {
    let implementations = if implementation_selector == WILDCARD {
        list_entries(root).await?
    } else {
        split_selector(implementation_selector)
    };

    let mut specs = Vec::new();
    for implementation in implementations {
        let names = if name_selector == WILDCARD {
            list_entries(&root.join(&implementation)).await?
        } else {
            split_selector(name_selector)
        };
        for name in names {
            specs.push(BenchmarkSpec::new(name, implementation.clone(), trials));
        }
    }

    debug!(count = specs.len(), "resolved benchmark specs");
    Ok(specs)
}

fn split_selector(selector: &str) -> Vec<String> {
    selector.split(',').map(str::to_string).collect()
}

/// Subdirectories of `dir`, minus the ignore set, sorted by name.
async fn list_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED_ENTRIES.contains(&name.as_str()) {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            names.push(name);
        }
    }
    // read_dir order is filesystem-defined
    names.sort();
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_catalog() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        for path in [
            "lit-html/render",
            "lit-html/update",
            "lit-html/node_modules/dep",
            "preact/render",
            "node_modules/whatever",
        ] {
            std::fs::create_dir_all(root.join(path)).unwrap();
        }
        std::fs::write(root.join("package.json"), "{}").unwrap();
        std::fs::write(root.join("package-lock.json"), "{}").unwrap();
        std::fs::write(root.join("lit-html/package.json"), "{}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_wildcards_expand_full_cross_product() {
        let dir = make_catalog();

        let specs = resolve_specs(dir.path(), "*", "*", 7).await.unwrap();

        assert_eq!(
            specs,
            vec![
                BenchmarkSpec::new("render", "lit-html", 7),
                BenchmarkSpec::new("update", "lit-html", 7),
                BenchmarkSpec::new("render", "preact", 7),
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_lists_preserve_order_without_existence_check() {
        let dir = tempfile::TempDir::new().unwrap();

        let specs = resolve_specs(dir.path(), "b-impl,a-impl", "zeta,alpha", 3)
            .await
            .unwrap();

        assert_eq!(
            specs,
            vec![
                BenchmarkSpec::new("zeta", "b-impl", 3),
                BenchmarkSpec::new("alpha", "b-impl", 3),
                BenchmarkSpec::new("zeta", "a-impl", 3),
                BenchmarkSpec::new("alpha", "a-impl", 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_implementation_with_wildcard_names() {
        let dir = make_catalog();

        let specs = resolve_specs(dir.path(), "preact", "*", 1).await.unwrap();

        assert_eq!(specs, vec![BenchmarkSpec::new("render", "preact", 1)]);
    }

    #[tokio::test]
    async fn test_wildcard_names_under_missing_implementation_is_io_error() {
        let dir = make_catalog();

        let err = resolve_specs(dir.path(), "does-not-exist", "*", 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_spec_display_and_relative_dir() {
        let spec = BenchmarkSpec::new("render", "lit-html", 10);
        assert_eq!(spec.to_string(), "lit-html/render x10");
        assert_eq!(spec.relative_dir(), "lit-html/render");
    }

    #[test]
    fn test_catalog_segments() {
        assert!(is_catalog_segment("lit-html"));
        assert!(is_catalog_segment("render.v2"));
        for bad in ["", ".", "..", "a/b", "..\\x", "/etc"] {
            assert!(!is_catalog_segment(bad), "{bad:?} accepted");
        }
    }
}
