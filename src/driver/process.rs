//! Browser driver backed by a plain child process.
//!
//! Each driver owns a throwaway profile directory. Navigating replaces the
//! running browser process with a fresh one opened at the new URL; the
//! benchmark page reports back to the server on its own.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BrowserDriver, BrowserKind, DriverError, DriverLauncher};
use crate::config::BrowsersConfig;

/// Executables tried on `$PATH` when no explicit binary is configured.
fn candidates(browser: BrowserKind) -> &'static [&'static str] {
    match browser {
        BrowserKind::Chrome => &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
        ],
        BrowserKind::Firefox => &["firefox", "firefox-esr"],
    }
}

/// Command-line arguments that open `url` with an isolated profile.
pub fn browser_args(browser: BrowserKind, profile: &Path, headless: bool, url: &str) -> Vec<String> {
    let profile = profile.to_string_lossy().to_string();
    let mut args = Vec::new();
    match browser {
        BrowserKind::Chrome => {
            if headless {
                args.push("--headless=new".to_string());
            }
            args.push(format!("--user-data-dir={}", profile));
            args.push("--no-first-run".to_string());
            args.push("--no-default-browser-check".to_string());
            args.push("--disable-extensions".to_string());
        }
        BrowserKind::Firefox => {
            if headless {
                args.push("-headless".to_string());
            }
            args.push("-no-remote".to_string());
            args.push("-profile".to_string());
            args.push(profile);
        }
    }
    args.push(url.to_string());
    args
}

// ---------------------------------------------------------------------------
// ProcessLauncher
// ---------------------------------------------------------------------------

/// Launches browsers found on disk.
pub struct ProcessLauncher {
    config: BrowsersConfig,
}

impl ProcessLauncher {
    pub fn new(config: BrowsersConfig) -> Self {
        Self { config }
    }

    fn locate_binary(&self, browser: BrowserKind) -> Result<PathBuf, DriverError> {
        let configured = match browser {
            BrowserKind::Chrome => &self.config.chrome_path,
            BrowserKind::Firefox => &self.config.firefox_path,
        };
        if let Some(path) = configured {
            // `which` checks that the file exists and is executable.
            return which::which(path).map_err(|source| DriverError::BinaryUnusable {
                browser,
                path: path.clone(),
                source,
            });
        }
        candidates(browser)
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or(DriverError::BinaryNotFound { browser })
    }
}

#[async_trait]
impl DriverLauncher for ProcessLauncher {
    async fn launch(&self, browser: BrowserKind) -> Result<Box<dyn BrowserDriver>, DriverError> {
        let binary = self.locate_binary(browser)?;
        let profile = std::env::temp_dir().join(format!("browserbench-{}-{}", browser, Uuid::new_v4()));
        tokio::fs::create_dir_all(&profile)
            .await
            .map_err(|source| DriverError::Launch { browser, source })?;

        info!(
            browser = %browser,
            binary = %binary.display(),
            profile = %profile.display(),
            "browser ready"
        );

        Ok(Box::new(ProcessDriver {
            browser,
            binary,
            profile,
            headless: self.config.headless,
            child: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// ProcessDriver
// ---------------------------------------------------------------------------

pub struct ProcessDriver {
    browser: BrowserKind,
    binary: PathBuf,
    profile: PathBuf,
    headless: bool,
    child: Option<Child>,
}

impl ProcessDriver {
    async fn stop_child(&mut self) -> std::io::Result<()> {
        if let Some(mut child) = self.child.take() {
            if child.try_wait()?.is_none() {
                child.kill().await?;
            }
            debug!(browser = %self.browser, "browser process stopped");
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ProcessDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let browser = self.browser;
        let navigate_err = |source| DriverError::Navigate {
            browser,
            url: url.to_string(),
            source,
        };

        self.stop_child().await.map_err(navigate_err)?;

        let child = Command::new(&self.binary)
            .args(browser_args(browser, &self.profile, self.headless, url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(navigate_err)?;

        debug!(browser = %browser, url, pid = ?child.id(), "navigated");
        self.child = Some(child);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let browser = self.browser;
        self.stop_child()
            .await
            .map_err(|source| DriverError::Close { browser, source })?;

        match tokio::fs::remove_dir_all(&self.profile).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(profile = %self.profile.display(), error = %e, "failed to remove browser profile");
            }
        }
        info!(browser = %browser, "browser closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_args() {
        let args = browser_args(
            BrowserKind::Chrome,
            Path::new("/tmp/profile"),
            true,
            "http://127.0.0.1:1234/x/y/?trials=1",
        );
        assert_eq!(args[0], "--headless=new");
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert_eq!(args.last().unwrap(), "http://127.0.0.1:1234/x/y/?trials=1");
    }

    #[test]
    fn test_firefox_args_headful() {
        let args = browser_args(
            BrowserKind::Firefox,
            Path::new("/tmp/profile"),
            false,
            "http://localhost/",
        );
        assert!(!args.iter().any(|a| a == "-headless"));
        assert_eq!(
            args,
            vec!["-no-remote", "-profile", "/tmp/profile", "http://localhost/"]
        );
    }

    /// Stand-in browser that ignores its arguments and exits.
    #[cfg(unix)]
    fn stand_in() -> PathBuf {
        which::which("true").unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_binary_wins() {
        let chrome = stand_in();
        let launcher = ProcessLauncher::new(BrowsersConfig {
            chrome_path: Some(chrome.clone()),
            firefox_path: None,
            headless: true,
        });
        assert_eq!(launcher.locate_binary(BrowserKind::Chrome).unwrap(), chrome);
    }

    #[tokio::test]
    async fn test_launch_with_missing_binary_fails() {
        let launcher = ProcessLauncher::new(BrowsersConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/bin/chrome")),
            firefox_path: None,
            headless: true,
        });

        let err = launcher.launch(BrowserKind::Chrome).await.err().unwrap();
        assert!(matches!(
            err,
            DriverError::BinaryUnusable {
                browser: BrowserKind::Chrome,
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to launch chrome"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_configured_binary_must_be_executable() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("chrome");
        std::fs::write(&plain, "not a program").unwrap();
        let launcher = ProcessLauncher::new(BrowsersConfig {
            chrome_path: Some(plain),
            firefox_path: None,
            headless: true,
        });

        let err = launcher.launch(BrowserKind::Chrome).await.err().unwrap();
        assert!(matches!(err, DriverError::BinaryUnusable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_navigate_respawns_and_close_stops_browser() {
        let launcher = ProcessLauncher::new(BrowsersConfig {
            chrome_path: Some(stand_in()),
            firefox_path: None,
            headless: true,
        });
        let mut driver = launcher.launch(BrowserKind::Chrome).await.unwrap();

        driver.navigate("http://127.0.0.1:9/a").await.unwrap();
        driver.navigate("http://127.0.0.1:9/b").await.unwrap();
        driver.close().await.unwrap();
    }
}
