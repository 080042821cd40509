use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://letterboxd.com";
pub const DEFAULT_MAX_COLLECTION_PAGES: u32 = 10_000;

/// What the batch multiplexer does when one of its sub-streams fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorPolicy {
    /// Record the failure, keep relaying the remaining sub-streams, report at the end.
    #[default]
    Continue,
    /// Stop the whole batch at the first failed sub-stream.
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub database_url: Option<String>,
    pub page_ttl_min_secs: i64,
    pub page_ttl_max_secs: i64,
    pub film_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: None,
            page_ttl_min_secs: 24 * 60 * 60,
            page_ttl_max_secs: 72 * 60 * 60,
            film_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    /// Upper bound on middle pages fetched at the same time.
    pub page_concurrency: usize,
    /// Upper bound on concurrent enhancement lookups.
    pub enhance_concurrency: usize,
    /// Capacity of every item channel handed to consumers.
    pub stream_buffer: usize,
    /// Guard for collections that only expose a "next" link.
    pub max_sequential_pages: u32,
    /// Cap on the page count a paginated collection may report.
    pub max_collection_pages: u32,
    pub batch_errors: BatchErrorPolicy,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("boxd/{}", env!("CARGO_PKG_VERSION")),
            http_timeout_secs: 10,
            page_concurrency: 5,
            enhance_concurrency: 5,
            stream_buffer: 1,
            max_sequential_pages: 500,
            max_collection_pages: DEFAULT_MAX_COLLECTION_PAGES,
            batch_errors: BatchErrorPolicy::Continue,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, then the TOML file (explicit path, `$BOXD_CONFIG`, or the user config dir), then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("BOXD_CONFIG").map(PathBuf::from))
            .or_else(default_config_path);
        let mut cfg = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config: {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        Ok(cfg.normalized())
    }

    pub(crate) fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |k: &str| var(k).and_then(|s| s.trim().parse::<i64>().ok());
        if let Some(v) = var("BOXD_BASE_URL").filter(|s| !s.trim().is_empty()) { self.base_url = v.trim().to_string(); }
        if let Some(v) = parsed("BOXD_PAGE_CONCURRENCY") { self.page_concurrency = v.max(0) as usize; }
        if let Some(v) = parsed("BOXD_ENHANCE_CONCURRENCY") { self.enhance_concurrency = v.max(0) as usize; }
        if let Some(v) = parsed("BOXD_PAGES_TTL_SECS") {
            self.cache.page_ttl_min_secs = v;
            self.cache.page_ttl_max_secs = v;
        }
        if let Some(v) = parsed("BOXD_FILM_TTL_SECS") { self.cache.film_ttl_secs = v; }
        if let Some(v) = var("BOXD_DISABLE_CACHE") {
            if matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") { self.cache.enabled = false; }
        }
        if let Some(v) = var("BOXD_DATABASE_URL").filter(|s| !s.trim().is_empty()) { self.cache.database_url = Some(v); }
    }

    fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.page_concurrency = self.page_concurrency.max(1);
        self.enhance_concurrency = self.enhance_concurrency.max(1);
        self.stream_buffer = self.stream_buffer.max(1);
        self.max_sequential_pages = self.max_sequential_pages.max(1);
        self.max_collection_pages = self.max_collection_pages.max(1);
        if self.cache.page_ttl_max_secs < self.cache.page_ttl_min_secs {
            self.cache.page_ttl_max_secs = self.cache.page_ttl_min_secs;
        }
        self
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "boxd", "boxd").map(|p| p.config_dir().join("boxd.toml"))
}
