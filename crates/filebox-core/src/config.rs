use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (0 = retry immediately).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.0,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Proxy protocol understood by libcurl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Http,
    Socks4,
    Socks5,
    /// SOCKS5 with hostname resolution on the proxy.
    Socks5h,
}

impl ProxyKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "https" => Some(ProxyKind::Http),
            "socks4" => Some(ProxyKind::Socks4),
            "socks5" | "socks" => Some(ProxyKind::Socks5),
            "socks5h" => Some(ProxyKind::Socks5h),
            _ => None,
        }
    }
}

/// Egress proxy for every request of a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Network configuration for remote handles.
///
/// Loaded from `~/.config/filebox/config.toml` and overridden by
/// `FILEBOX_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBoxConfig {
    /// Maximum time to receive the response head of any single request.
    pub request_timeout_ms: u64,
    /// Maximum gap between two body bytes once the response has started.
    pub response_timeout_ms: u64,
    /// Bytes per range request, and the default transform chunk size.
    pub chunk_size: u64,
    /// Always use a single GET even for large, range-capable resources.
    #[serde(default)]
    pub no_slice_down: bool,
    /// Range requests kept in flight at once (None = 4).
    #[serde(default)]
    pub chunk_concurrency: Option<usize>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

pub const DEFAULT_CHUNK_CONCURRENCY: usize = 4;

impl Default for FileBoxConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            response_timeout_ms: 60_000,
            chunk_size: DEFAULT_CHUNK_SIZE as u64,
            no_slice_down: false,
            chunk_concurrency: None,
            retry: None,
            proxy: None,
        }
    }
}

impl FileBoxConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn chunk_concurrency(&self) -> usize {
        self.chunk_concurrency
            .unwrap_or(DEFAULT_CHUNK_CONCURRENCY)
            .max(1)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    /// Apply `FILEBOX_*` overrides read through `lookup`.
    ///
    /// Numeric values that do not parse or are zero leave the current value
    /// in place.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    tracing::warn!(key, value = %raw, "ignoring invalid numeric setting");
                    None
                }
            }
        };

        if let Some(ms) = positive("FILEBOX_HTTP_REQUEST_TIMEOUT") {
            self.request_timeout_ms = ms;
        }
        if let Some(ms) = positive("FILEBOX_HTTP_RESPONSE_TIMEOUT")
            .or_else(|| positive("FILEBOX_HTTP_TIMEOUT"))
        {
            self.response_timeout_ms = ms;
        }
        if let Some(size) = positive("FILEBOX_HTTP_CHUNK_SIZE") {
            self.chunk_size = size;
        }
        if let Some(n) = positive("FILEBOX_HTTP_CHUNK_CONCURRENCY") {
            self.chunk_concurrency = Some(n as usize);
        }
        if let Some(v) = lookup("FILEBOX_NO_SLICE_DOWN") {
            self.no_slice_down = v.trim() == "true";
        }

        if let Some(host) = lookup("FILEBOX_PROXY_HOST").filter(|h| !h.trim().is_empty()) {
            let port = positive("FILEBOX_PROXY_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(8080);
            let kind = lookup("FILEBOX_PROXY_TYPE")
                .and_then(|t| ProxyKind::parse(&t))
                .unwrap_or_default();
            self.proxy = Some(ProxyConfig {
                kind,
                host: host.trim().to_string(),
                port,
                username: lookup("FILEBOX_PROXY_USERNAME"),
                password: lookup("FILEBOX_PROXY_PASSWORD"),
            });
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("filebox")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<FileBoxConfig> {
    let path = config_path()?;
    let mut cfg = if !path.exists() {
        let default_cfg = FileBoxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    } else {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data)?
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}
