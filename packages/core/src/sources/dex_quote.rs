//! DEX aggregator quote source (0x swap API shape).
//!
//! Slippage is derived from the spread between the quoted `price` and the
//! `guaranteedPrice`; price impact is read directly when present.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::SourceError;
use crate::sources::{json_number, DexQuoteData, DexQuoteSource, SourceOrigin, Sourced};

pub const DEFAULT_DEX_QUOTE_API_URL: &str = "https://api.0x.org/swap/v1/quote";

/// Used when the aggregator omits a field it normally reports.
const ASSUMED_PCT: f64 = 0.3;

pub const FALLBACK_QUOTE: DexQuoteData = DexQuoteData {
    slippage_pct: 0.5,
    price_impact_pct: 0.4,
    protocol_fee_usd: 0.0,
};

#[derive(Clone)]
pub struct HttpDexQuoteSource {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDexQuoteSource {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn query_quote(
        &self,
        sell_token: &str,
        buy_token: &str,
        amount: f64,
    ) -> Result<DexQuoteData, SourceError> {
        let sell_amount = to_base_units(amount)?;
        let mut request = self.http.get(&self.base_url).query(&[
            ("sellToken", sell_token),
            ("buyToken", buy_token),
            ("sellAmount", sell_amount.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("0x-api-key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::unavailable(format!(
                "DEX quote API returned HTTP {}",
                response.status()
            )));
        }

        let body = response.json::<Value>().await?;
        parse_quote(&body)
    }
}

/// Convert a token amount to 18-decimal base units as an integer string.
pub fn to_base_units(amount: f64) -> Result<String, SourceError> {
    let scaled = (amount * 1e18).round();
    if !scaled.is_finite() || scaled < 0.0 {
        return Err(SourceError::malformed(format!("cannot express {} in base units", amount)));
    }
    Ok(format!("{:.0}", scaled))
}

/// Extract slippage and price impact from a quote body.
pub fn parse_quote(body: &Value) -> Result<DexQuoteData, SourceError> {
    if !body.is_object() {
        return Err(SourceError::malformed("quote response is not an object"));
    }

    let price_impact_pct = body
        .get("priceImpact")
        .and_then(json_number)
        .unwrap_or(ASSUMED_PCT);

    let price = body.get("price").and_then(json_number);
    let guaranteed = body.get("guaranteedPrice").and_then(json_number);
    let slippage_pct = match (price, guaranteed) {
        (Some(price), Some(guaranteed)) if price > 0.0 => (price - guaranteed) / price * 100.0,
        _ => ASSUMED_PCT,
    };

    Ok(DexQuoteData {
        slippage_pct,
        price_impact_pct,
        protocol_fee_usd: 0.0,
    })
}

#[async_trait]
impl DexQuoteSource for HttpDexQuoteSource {
    async fn fetch_quote(
        &self,
        sell_token: &str,
        buy_token: &str,
        amount: f64,
    ) -> Sourced<DexQuoteData> {
        match self.query_quote(sell_token, buy_token, amount).await {
            Ok(quote) => Sourced::endpoint(quote, self.base_url.clone()),
            Err(err) => {
                tracing::warn!(
                    "DEX quote {} -> {} fell back to static estimate: {}",
                    sell_token,
                    buy_token,
                    err
                );
                Sourced::new(FALLBACK_QUOTE, SourceOrigin::StaticFallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn base_units_use_eighteen_decimals() {
        assert_eq!(to_base_units(1.0).unwrap(), "1000000000000000000");
        assert_eq!(to_base_units(0.5).unwrap(), "500000000000000000");
        assert_eq!(to_base_units(0.0).unwrap(), "0");
        assert!(to_base_units(f64::NAN).is_err());
    }

    #[test]
    fn slippage_comes_from_guaranteed_price_spread() {
        let quote = parse_quote(&json!({
            "price": "2000",
            "guaranteedPrice": "1980",
            "priceImpact": "0.12"
        }))
        .unwrap();

        assert!((quote.slippage_pct - 1.0).abs() < 1e-9);
        assert_eq!(quote.price_impact_pct, 0.12);
        assert_eq!(quote.protocol_fee_usd, 0.0);
    }

    #[test]
    fn missing_fields_use_assumed_percentages() {
        let quote = parse_quote(&json!({ "price": "2000" })).unwrap();
        assert_eq!(quote.slippage_pct, ASSUMED_PCT);
        assert_eq!(quote.price_impact_pct, ASSUMED_PCT);
    }

    #[test]
    fn non_object_quote_is_malformed() {
        assert!(parse_quote(&json!([1, 2, 3])).is_err());
    }

    #[tokio::test]
    async fn quote_request_carries_tokens_amount_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("sellToken", "ETH"))
            .and(query_param("buyToken", "USDC"))
            .and(query_param("sellAmount", "2000000000000000000"))
            .and(header("0x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "price": "100",
                "guaranteedPrice": "99.5"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/quote", server.uri());
        let quote = HttpDexQuoteSource::new(Client::new(), base.clone())
            .with_api_key("secret")
            .fetch_quote("ETH", "USDC", 2.0)
            .await;

        assert!((quote.value.slippage_pct - 0.5).abs() < 1e-9);
        assert_eq!(quote.source(), base);
    }

    #[tokio::test]
    async fn rejected_quote_uses_static_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "reason": "Validation Failed"
            })))
            .mount(&server)
            .await;

        let quote = HttpDexQuoteSource::new(Client::new(), format!("{}/quote", server.uri()))
            .fetch_quote("ETH", "ETH", 1.0)
            .await;

        assert_eq!(quote.value, FALLBACK_QUOTE);
        assert_eq!(quote.source(), "static-fallback");
    }
}
