//! TOML configuration for the browserbench harness.
//!
//! A layered configuration model with sensible defaults, an environment
//! variable override for the config file path, and a working-directory
//! fallback. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "BROWSERBENCH_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const LOCAL_CONFIG_FILE: &str = "browserbench.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for a harness process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub benchmarks: BenchmarksConfig,
    #[serde(default)]
    pub browsers: BrowsersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Resolve the configuration for this process from `$BROWSERBENCH_CONFIG`
    /// and the working directory. See [`BenchConfig::resolve_with`].
    pub fn resolve(explicit: Option<&Path>) -> Result<ResolvedConfig> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::resolve_with(explicit, env_path.as_deref(), Path::new(LOCAL_CONFIG_FILE))
    }

    /// An explicit path must load; otherwise, in order:
    /// 1. `env_path` (the value of `BROWSERBENCH_CONFIG`).
    /// 2. `local`, if it exists.
    /// 3. Compiled-in defaults.
    ///
    /// Fallbacks never fail; each skipped file is recorded so it can be
    /// reported once logging is up.
    pub fn resolve_with(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        local: &Path,
    ) -> Result<ResolvedConfig> {
        if let Some(path) = explicit {
            return Ok(ResolvedConfig::from_file(Self::load(path)?, path));
        }

        let mut skipped = Vec::new();

        if let Some(path) = env_path {
            match Self::load(path) {
                Ok(cfg) => return Ok(ResolvedConfig::from_file(cfg, path)),
                Err(e) => skipped.push(SkippedConfig {
                    path: path.to_path_buf(),
                    error: format!("{e:#}"),
                    reason: "BROWSERBENCH_CONFIG set but file could not be loaded, trying fallback",
                }),
            }
        }

        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(ResolvedConfig::from_file(cfg, local).with_skipped(skipped)),
                Err(e) => skipped.push(SkippedConfig {
                    path: local.to_path_buf(),
                    error: format!("{e:#}"),
                    reason: "local config file exists but could not be loaded, using defaults",
                }),
            }
        }

        Ok(ResolvedConfig {
            config: Self::default(),
            source: None,
            skipped,
        })
    }
}

/// A config candidate that was passed over during resolution.
#[derive(Debug, Clone)]
pub struct SkippedConfig {
    pub path: PathBuf,
    pub error: String,
    pub reason: &'static str,
}

/// The configuration in effect, and how it was found.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: BenchConfig,
    /// File the configuration came from; `None` means compiled-in defaults.
    pub source: Option<PathBuf>,
    pub skipped: Vec<SkippedConfig>,
}

impl ResolvedConfig {
    fn from_file(config: BenchConfig, path: &Path) -> Self {
        Self {
            config,
            source: Some(path.to_path_buf()),
            skipped: Vec::new(),
        }
    }

    fn with_skipped(mut self, skipped: Vec<SkippedConfig>) -> Self {
        self.skipped = skipped;
        self
    }

    /// Report how the configuration was resolved. Call after tracing is set up.
    pub fn log(&self) {
        for skipped in &self.skipped {
            warn!(path = %skipped.path.display(), error = %skipped.error, "{}", skipped.reason);
        }
        match &self.source {
            Some(path) => info!(path = %path.display(), "loaded harness configuration"),
            None => debug!("no config file found, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Listener settings for the benchmark HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port; `0` asks the OS for a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Location of the on-disk benchmark catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarksConfig {
    /// Root directory holding `<implementation>/<benchmark>/` trees.
    pub root: PathBuf,
}

impl Default for BenchmarksConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("benchmarks"),
        }
    }
}

// ---------------------------------------------------------------------------
// Browsers
// ---------------------------------------------------------------------------

/// Browser binaries used by automatic mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowsersConfig {
    /// Explicit Chrome/Chromium binary. Looked up on `$PATH` when unset.
    pub chrome_path: Option<PathBuf>,
    /// Explicit Firefox binary. Looked up on `$PATH` when unset.
    pub firefox_path: Option<PathBuf>,
    /// Run browsers without a visible window.
    pub headless: bool,
}

impl Default for BrowsersConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            firefox_path: None,
            headless: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
