use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://personvardi.pmlp.gov.lv";
const DEFAULT_OUTPUT: &str = "output/personvardi.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;

/// Runtime settings: built-in defaults, then `PERSONVARDI_*` env vars, then CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub output: PathBuf,
    /// Worker pool size. `None` means available hardware parallelism.
    pub concurrency: Option<usize>,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let d = Self::default();
        Config::builder()
            .set_default("base_url", d.base_url)?
            .set_default("output", d.output.to_string_lossy().into_owned())?
            .set_default("timeout_secs", d.timeout_secs as i64)?
            .set_default("retries", d.retries as i64)?
            .set_default("backoff_ms", d.backoff_ms as i64)?
            .add_source(Environment::with_prefix("PERSONVARDI").try_parsing(true))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid PERSONVARDI_* settings")
    }

    pub fn pool_size(&self) -> usize {
        self.concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            concurrency: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}
