use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use tracing::warn;

use crate::config::{PipelineConfig, RenderMode};
use crate::http_client::http_client;

/// Source of rendered season pages. Implementations must be shareable across
/// the optional per-season worker threads.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str, year: u16) -> Result<String>;
}

/// Plain GET. No script runs, so pages that build the table client-side come
/// back without it; use `--browser=` against live pages.
pub struct HttpFetcher {
    client: &'static Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, _year: u16) -> Result<String> {
        let resp = self.client.get(url).send().context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}"));
        }
        Ok(body)
    }
}

/// Runs a Chromium-compatible binary with `--dump-dom`. The virtual time
/// budget (`render_wait`) is a blind wait before the DOM is dumped: slow
/// pages can still come back without the table.
pub struct BrowserFetcher {
    binary: String,
    budget: Duration,
}

impl BrowserFetcher {
    pub fn new(binary: impl Into<String>, budget: Duration) -> Self {
        Self {
            binary: binary.into(),
            budget,
        }
    }
}

impl PageFetcher for BrowserFetcher {
    fn fetch(&self, url: &str, _year: u16) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg(format!("--virtual-time-budget={}", self.budget.as_millis()))
            .arg("--dump-dom")
            .arg(url)
            .output()
            .with_context(|| format!("launch browser {}", self.binary))?;
        if !output.status.success() {
            return Err(anyhow!(
                "browser exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub struct SnapshotFetcher {
    dir: PathBuf,
}

impl SnapshotFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, year: u16) -> PathBuf {
        self.dir.join(format!("{year}.html"))
    }
}

impl PageFetcher for SnapshotFetcher {
    fn fetch(&self, _url: &str, year: u16) -> Result<String> {
        let path = self.path_for(year);
        read_snapshot(&path)
    }
}

fn read_snapshot(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))
}

pub fn fetcher_for(cfg: &PipelineConfig) -> Result<Box<dyn PageFetcher>> {
    Ok(match &cfg.render {
        RenderMode::Http => {
            warn!("plain http fetch runs no scripts; pass --browser= for live pages");
            Box::new(HttpFetcher::new()?)
        }
        RenderMode::Browser { binary } => Box::new(BrowserFetcher::new(binary, cfg.render_wait)),
        RenderMode::Snapshots { dir } => Box::new(SnapshotFetcher::new(dir)),
    })
}
