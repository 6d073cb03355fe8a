use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::DEFAULT_CAPACITY;
use crate::sources::dex_quote::DEFAULT_DEX_QUOTE_API_URL;
use crate::sources::price::DEFAULT_PRICE_API_URL;

pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_QUOTE_TOKEN: &str = "USDC";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
    pub http_timeout_seconds: u64,
    pub price_api_url: String,
    pub dex_quote_api_url: String,
    pub dex_quote_token: String,
    pub zerox_api_key: Option<String>,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let cache_ttl_seconds = match var("CACHE_TTL_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| "CACHE_TTL_SECONDS must be a valid number")?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };

        let cache_capacity = match var("CACHE_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err("CACHE_CAPACITY must be a positive number".to_string()),
            },
            None => DEFAULT_CAPACITY,
        };

        let http_timeout_seconds = match var("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| "HTTP_TIMEOUT_SECONDS must be a valid number")?,
            None => DEFAULT_HTTP_TIMEOUT_SECONDS,
        };

        let listen_addr = var("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| "LISTEN_ADDR must be a socket address like 0.0.0.0:8080")?;

        Ok(Self {
            cache_ttl_seconds,
            cache_capacity,
            http_timeout_seconds,
            price_api_url: var("PRICE_API_URL").unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string()),
            dex_quote_api_url: var("DEX_QUOTE_API_URL")
                .unwrap_or_else(|| DEFAULT_DEX_QUOTE_API_URL.to_string()),
            dex_quote_token: var("DEX_QUOTE_TOKEN").unwrap_or_else(|| DEFAULT_QUOTE_TOKEN.to_string()),
            zerox_api_key: var("ZEROX_API_KEY"),
            listen_addr,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}
