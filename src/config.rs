use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::models::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_POPULAR_SYMBOLS: [&str; 10] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "JPM", "V", "WMT",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub data_dir: PathBuf,
    /// Symbols refreshed by the "all stocks" list; the free API has no full listing.
    pub popular_symbols: Vec<String>,
    /// Feed size requested from NEWS_SENTIMENT
    pub news_limit: u32,
    pub page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: "demo".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            data_dir: PathBuf::from("./data"),
            popular_symbols: DEFAULT_POPULAR_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            news_limit: 50,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present), then read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(anyhow!("failed to read .env: {}", e));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let popular_symbols = match get("EQUITY_PULSE_POPULAR_SYMBOLS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.popular_symbols,
        };

        Ok(Self {
            api_key: get("ALPHA_VANTAGE_API_KEY").unwrap_or(defaults.api_key),
            base_url: get("EQUITY_PULSE_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout_secs: parse_num(get("EQUITY_PULSE_TIMEOUT_SECS"), "EQUITY_PULSE_TIMEOUT_SECS", defaults.timeout_secs)?,
            data_dir: get("EQUITY_PULSE_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            popular_symbols,
            news_limit: parse_num(get("EQUITY_PULSE_NEWS_LIMIT"), "EQUITY_PULSE_NEWS_LIMIT", defaults.news_limit)?,
            page_size: parse_num(get("EQUITY_PULSE_PAGE_SIZE"), "EQUITY_PULSE_PAGE_SIZE", defaults.page_size)?,
        })
    }
}

fn parse_num<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| anyhow!("{} must be a number, got {:?}", key, v)),
        None => Ok(default),
    }
}
