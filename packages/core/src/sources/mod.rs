//! Cost data sources
//!
//! Four independent fetchers (gas, price, DEX quote, latency) sit behind
//! small async traits so the estimator never depends on a concrete
//! provider. Every fetcher resolves to a [`Sourced`] value: either a value
//! read from an endpoint or a documented static fallback. None of them
//! return an error; transport and parse failures are absorbed at this
//! boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::chains::{Chain, ChainRegistry};
use crate::config::Config;

pub mod dex_quote;
pub mod gas;
pub mod latency;
pub mod mock;
pub mod price;

pub use dex_quote::HttpDexQuoteSource;
pub use gas::HttpGasSource;
pub use latency::BlockTimeLatencySource;
pub use price::HttpPriceSource;

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Read from the given endpoint.
    Endpoint(String),
    /// No external source exists for this key.
    StaticDefault,
    /// The external source failed or answered with an unusable shape.
    StaticFallback,
    /// Derived locally from static metadata; never external.
    StaticEstimate,
    /// The fetch task itself crashed and the estimator substituted a value.
    ErrorFallback,
}

impl SourceOrigin {
    pub fn tag(&self) -> &str {
        match self {
            SourceOrigin::Endpoint(url) => url,
            SourceOrigin::StaticDefault => "static-default",
            SourceOrigin::StaticFallback => "static-fallback",
            SourceOrigin::StaticEstimate => "static-estimate",
            SourceOrigin::ErrorFallback => "error-fallback",
        }
    }

    /// `true` when the value is a substitute for a failed or missing source.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            SourceOrigin::StaticDefault | SourceOrigin::StaticFallback | SourceOrigin::ErrorFallback
        )
    }
}

/// A fetched value together with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub origin: SourceOrigin,
}

impl<T> Sourced<T> {
    pub fn new(value: T, origin: SourceOrigin) -> Self {
        Self { value, origin }
    }

    pub fn endpoint(value: T, url: impl Into<String>) -> Self {
        Self::new(value, SourceOrigin::Endpoint(url.into()))
    }

    pub fn source(&self) -> &str {
        self.origin.tag()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasData {
    /// Gas price in gwei.
    pub gas_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceData {
    /// USD per token.
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DexQuoteData {
    pub slippage_pct: f64,
    pub price_impact_pct: f64,
    pub protocol_fee_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyData {
    pub latency_seconds: f64,
}

#[async_trait]
pub trait GasSource: Send + Sync {
    async fn fetch_gas(&self, chain: Chain) -> Sourced<GasData>;
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, token: &str) -> Sourced<PriceData>;
}

#[async_trait]
pub trait DexQuoteSource: Send + Sync {
    async fn fetch_quote(&self, sell_token: &str, buy_token: &str, amount: f64)
        -> Sourced<DexQuoteData>;
}

#[async_trait]
pub trait LatencySource: Send + Sync {
    async fn fetch_latency(&self, chain: Chain) -> Sourced<LatencyData>;
}

/// The set of sources one estimator queries.
#[derive(Clone)]
pub struct CostSources {
    pub gas: Arc<dyn GasSource>,
    pub price: Arc<dyn PriceSource>,
    pub dex_quote: Arc<dyn DexQuoteSource>,
    pub latency: Arc<dyn LatencySource>,
    /// Token the DEX quote is priced against.
    pub quote_token: String,
}

impl CostSources {
    /// Network-backed sources sharing one HTTP client.
    pub fn from_config(config: &Config, chains: ChainRegistry) -> Self {
        let http = build_http_client(config.http_timeout());

        let mut dex_quote = HttpDexQuoteSource::new(http.clone(), config.dex_quote_api_url.as_str());
        if let Some(api_key) = &config.zerox_api_key {
            dex_quote = dex_quote.with_api_key(api_key.as_str());
        }

        Self {
            gas: Arc::new(HttpGasSource::new(http.clone(), chains.clone())),
            price: Arc::new(HttpPriceSource::new(http, config.price_api_url.as_str())),
            dex_quote: Arc::new(dex_quote),
            latency: Arc::new(BlockTimeLatencySource::new(chains)),
            quote_token: config.dex_quote_token.clone(),
        }
    }
}

/// Build the HTTP client shared by all network sources.
///
/// The timeout bounds every request, so a hung oracle resolves to its
/// fallback instead of stalling the whole estimate.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Failed to build HTTP client with timeout, using defaults: {}", err);
            Client::new()
        })
}

/// Read a JSON value that may be a number or a numeric string.
pub(crate) fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
