// src/config/app.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

pub const ENV_CONFIG_PATH: &str = "PROPERTY_YIELD_CONFIG";
pub const ENV_DATASET: &str = "PROPERTY_YIELD_DATASET";
pub const ENV_MAX_POLLS: &str = "PROPERTY_YIELD_MAX_POLLS";
pub const ENV_CACHE_TTL_SECS: &str = "PROPERTY_YIELD_CACHE_TTL_SECS";
pub const ENV_TOKEN: &str = "PROVIDER_TOKEN";

fn default_trigger_url() -> String {
    "https://api.brightdata.com/datasets/v3/trigger?dataset_id=gd_lfqkr8wm13ixtbd8f5".to_string()
}
fn default_snapshot_url_base() -> String {
    "https://api.brightdata.com/datasets/v3/snapshot".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Submission endpoint; receives `[{"url": <detail url>}]`.
    pub trigger_url: String,
    /// Status endpoint prefix; the snapshot id is appended.
    pub snapshot_url_base: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            trigger_url: default_trigger_url(),
            snapshot_url_base: default_snapshot_url_base(),
        }
    }
}

impl ProviderConfig {
    pub fn snapshot_url(&self, snapshot_id: &str) -> String {
        format!(
            "{}/{}?format=csv",
            self.snapshot_url_base.trim_end_matches('/'),
            snapshot_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Wait before the first status request.
    pub initial_delay_secs: u64,
    /// Wait between "not ready" responses.
    pub interval_secs: u64,
    /// Upper bound on status requests per job; reaching it means `TimedOut`.
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            interval_secs: 10,
            max_polls: 60,
        }
    }
}

impl PollConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `None` keeps outcomes for the lifetime of the process.
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    /// File holding the bearer token; `$PROVIDER_TOKEN` takes priority.
    pub token_path: PathBuf,
    pub provider: ProviderConfig,
    pub poll: PollConfig,
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("Zillow-Property-Listing-Info.csv"),
            token_path: PathBuf::from("TOKEN.txt"),
            provider: ProviderConfig::default(),
            poll: PollConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing app config toml")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading app config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load config using env var + fallbacks, then apply env overrides:
    /// 1) $PROPERTY_YIELD_CONFIG (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(p) = env::var(ENV_DATASET) {
            if !p.trim().is_empty() {
                self.dataset_path = PathBuf::from(p.trim());
            }
        }
        if let Some(n) = env::var(ENV_MAX_POLLS)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            self.poll.max_polls = n;
        }
        if let Some(ttl) = env::var(ENV_CACHE_TTL_SECS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.cache.ttl_secs = Some(ttl);
        }
    }

    /// Keep values usable: at least one poll, no zero TTL.
    pub fn sanitize(&mut self) {
        if self.poll.max_polls == 0 {
            self.poll.max_polls = 1;
        }
        if self.cache.ttl_secs == Some(0) {
            self.cache.ttl_secs = None;
        }
    }

    /// Bearer token for the provider: `$PROVIDER_TOKEN`, else the token file.
    pub fn read_token(&self) -> Result<String> {
        if let Ok(t) = env::var(ENV_TOKEN) {
            if !t.trim().is_empty() {
                return Ok(t.trim().to_string());
            }
        }
        let raw = fs::read_to_string(&self.token_path)
            .with_context(|| format!("reading provider token from {}", self.token_path.display()))?;
        let token = raw.trim();
        if token.is_empty() {
            bail!("provider token file {} is empty", self.token_path.display());
        }
        Ok(token.to_string())
    }
}
