//! Browser drivers for automatic mode.
//!
//! A [`DriverLauncher`] turns a [`BrowserKind`] into a running
//! [`BrowserDriver`], which can be pointed at URLs and closed. The harness
//! only ever needs those two operations; how the browser is controlled is up
//! to the implementation.

pub mod process;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

pub use process::ProcessLauncher;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Problems with the `--browser` selector.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserSelectionError {
    #[error("no browsers selected")]
    Empty,

    #[error("unsupported browser '{0}' (supported: chrome, firefox)")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no {browser} binary found; set browsers.{browser}_path in the config")]
    BinaryNotFound { browser: BrowserKind },

    #[error("failed to launch {browser}: configured binary {} is not usable: {source}", path.display())]
    BinaryUnusable {
        browser: BrowserKind,
        path: PathBuf,
        #[source]
        source: which::Error,
    },

    #[error("failed to launch {browser}: {source}")]
    Launch {
        browser: BrowserKind,
        #[source]
        source: io::Error,
    },

    #[error("failed to navigate {browser} to {url}: {source}")]
    Navigate {
        browser: BrowserKind,
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to close {browser}: {source}")]
    Close {
        browser: BrowserKind,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// BrowserKind
// ---------------------------------------------------------------------------

/// Browser families the harness can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

impl BrowserKind {
    pub const ALL: [BrowserKind; 2] = [BrowserKind::Chrome, BrowserKind::Firefox];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = BrowserSelectionError;

    /// Exact, case-sensitive match on the family name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BrowserKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BrowserSelectionError::Unsupported(s.to_string()))
    }
}

/// Parse a comma-separated browser selector.
///
/// Entries are trimmed and blanks dropped; repeats collapse to the first
/// occurrence. Fails if nothing is left or any entry is unsupported.
pub fn parse_browsers(selector: &str) -> Result<Vec<BrowserKind>, BrowserSelectionError> {
    let mut browsers = Vec::new();
    for entry in selector.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let kind: BrowserKind = entry.parse()?;
        if !browsers.contains(&kind) {
            browsers.push(kind);
        }
    }
    if browsers.is_empty() {
        return Err(BrowserSelectionError::Empty);
    }
    Ok(browsers)
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A launched browser instance.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Point the browser at `url`.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Shut the browser down and release its resources.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Starts browser instances.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self, browser: BrowserKind) -> Result<Box<dyn BrowserDriver>, DriverError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
