use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::cache::{CachePolicy, DEFAULT_CACHE_DURATION};

pub const DEFAULT_DATA_BASE_URL: &str =
    "https://raw.githubusercontent.com/Signius/mesh-automations/main/mesh-gov-updates";
pub const DEFAULT_START_YEAR: i32 = 2024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_base_url: String,
    pub cache_enabled: bool,
    pub cache_file: PathBuf,
    pub start_year: i32,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_base_url = get("DASHBOARD_DATA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_DATA_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // enabled unless explicitly switched off
        let cache_enabled = get("ENABLE_DEV_CACHE")
            .map(|v| !matches!(v.trim(), "false" | "FALSE" | "0" | "no" | "NO"))
            .unwrap_or(true);

        let cache_file = get("DASHBOARD_CACHE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dashboard_cache.json"));

        let start_year = match get("DASHBOARD_START_YEAR") {
            Some(v) => v
                .trim()
                .parse::<i32>()
                .with_context(|| format!("DASHBOARD_START_YEAR is not a year: {v}"))?,
            None => DEFAULT_START_YEAR,
        };

        let bind_addr =
            get("DASHBOARD_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        if !data_base_url.starts_with("http://") && !data_base_url.starts_with("https://") {
            bail!("DASHBOARD_DATA_BASE_URL must start with http:// or https://");
        }

        Ok(Self {
            data_base_url,
            cache_enabled,
            cache_file,
            start_year,
            bind_addr,
        })
    }

    pub fn cache_policy(&self) -> CachePolicy {
        if self.cache_enabled {
            CachePolicy::new(DEFAULT_CACHE_DURATION)
        } else {
            CachePolicy::new(Duration::ZERO)
        }
    }
}
