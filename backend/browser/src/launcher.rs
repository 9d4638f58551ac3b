//! Chromium process launcher.
//!
//! Starts a headless browser with remote debugging on an ephemeral port and
//! reads the DevTools WebSocket endpoint from its stderr.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use restabot_core::RestabotError;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

const EXECUTABLE_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

const MACOS_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    executable: PathBuf,
    window_size: (u32, u32),
    startup_timeout: Duration,
    extra_args: Vec<String>,
}

impl BrowserLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            window_size: (1280, 1024),
            startup_timeout: Duration::from_secs(20),
            extra_args: Vec::new(),
        }
    }

    /// Use `explicit` when given, otherwise search PATH for a Chromium build.
    pub fn detect(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        match find_executable() {
            Some(path) => Ok(Self::new(path)),
            None => Err(RestabotError::Browser(
                "no Chromium/Chrome executable found; set CHROME_PATH".into(),
            )
            .into()),
        }
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line for a headless instance using `profile_dir`.
    pub fn args(&self, profile_dir: &Path) -> Vec<String> {
        let (w, h) = self.window_size;
        let mut args = vec![
            "--headless=new".to_string(),
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--window-size={w},{h}"),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--mute-audio".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push("about:blank".to_string());
        args
    }

    pub async fn launch(&self) -> Result<BrowserProcess> {
        let profile_dir = tempfile::Builder::new()
            .prefix("restabot-chrome-")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        debug!(executable = %self.executable.display(), "Launching browser");
        let mut child = Command::new(&self.executable)
            .args(self.args(profile_dir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.executable.display()))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RestabotError::Browser("browser stderr not captured".into()))?;
        let mut lines = BufReader::new(stderr).lines();

        let wait_for_banner = async {
            while let Some(line) = lines.next_line().await? {
                if let Some(endpoint) = parse_devtools_line(&line) {
                    return Ok(endpoint);
                }
                debug!(target: "chrome", "{line}");
            }
            Err::<String, anyhow::Error>(
                RestabotError::Browser(
                    "browser exited before announcing its DevTools endpoint".into(),
                )
                .into(),
            )
        };
        let ws_endpoint = tokio::time::timeout(self.startup_timeout, wait_for_banner)
            .await
            .map_err(|_| RestabotError::Browser("timed out waiting for browser startup".into()))??;

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "chrome", "{line}");
            }
        });

        info!(endpoint = %ws_endpoint, "Browser ready");
        Ok(BrowserProcess {
            child,
            ws_endpoint,
            _profile_dir: profile_dir,
        })
    }
}

/// A running browser. The process is killed when this is dropped.
pub struct BrowserProcess {
    child: Child,
    ws_endpoint: String,
    _profile_dir: TempDir,
}

impl BrowserProcess {
    pub fn ws_endpoint(&self) -> &str {
        &self.ws_endpoint
    }

    /// Wait briefly for a clean exit (after `Browser.close`), then kill.
    pub async fn shutdown(mut self, grace: Duration) {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Browser exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for browser"),
            Err(_) => {
                warn!("Browser did not exit in time, killing it");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Failed to kill browser");
                }
            }
        }
    }
}

/// Extract the WebSocket URL from Chromium's startup banner.
pub fn parse_devtools_line(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(DEVTOOLS_PREFIX)?;
    rest.starts_with("ws://").then(|| rest.to_string())
}

fn find_executable() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for name in EXECUTABLE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    let mac = PathBuf::from(MACOS_CHROME);
    mac.is_file().then_some(mac)
}
