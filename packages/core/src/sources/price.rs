//! Token price source backed by a CoinGecko-style `simple/price` API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::SourceError;
use crate::sources::{json_number, PriceData, PriceSource, SourceOrigin, Sourced};

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Price (USD) assumed when no quote is available.
pub const DEFAULT_PRICE_USD: f64 = 1.0;

/// Token symbol to price-API identifier.
const TOKEN_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("USDC", "usd-coin"),
    ("MATIC", "matic-network"),
    ("BNB", "binancecoin"),
    ("AVAX", "avalanche-2"),
];

/// Resolve a token symbol (case-insensitive) to its external identifier.
pub fn token_id(symbol: &str) -> Option<&'static str> {
    let symbol = symbol.trim();
    TOKEN_IDS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(symbol))
        .map(|(_, id)| *id)
}

#[derive(Clone)]
pub struct HttpPriceSource {
    http: Client,
    base_url: String,
}

impl HttpPriceSource {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn query_price(&self, id: &str) -> Result<f64, SourceError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("ids", id), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::unavailable(format!(
                "Price API returned HTTP {}",
                response.status()
            )));
        }

        let body = response.json::<Value>().await?;
        let price = body
            .get(id)
            .and_then(|entry| entry.get("usd"))
            .and_then(json_number)
            .ok_or_else(|| SourceError::malformed(format!("no usd price for '{}'", id)))?;

        if price < 0.0 {
            return Err(SourceError::malformed(format!("negative usd price {} for '{}'", price, id)));
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self, token: &str) -> Sourced<PriceData> {
        let Some(id) = token_id(token) else {
            tracing::debug!("No price mapping for token {}, using default", token);
            return Sourced::new(PriceData { price: DEFAULT_PRICE_USD }, SourceOrigin::StaticDefault);
        };

        match self.query_price(id).await {
            Ok(price) => Sourced::endpoint(PriceData { price }, self.base_url.clone()),
            Err(err) => {
                tracing::warn!("Price lookup for {} fell back to default: {}", token, err);
                Sourced::new(PriceData { price: DEFAULT_PRICE_USD }, SourceOrigin::StaticFallback)
            }
        }
    }
}
