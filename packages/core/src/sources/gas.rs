//! Gas-price oracle source.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::chains::{Chain, ChainRegistry};
use crate::error::SourceError;
use crate::sources::{json_number, GasData, GasSource, SourceOrigin, Sourced};

/// Gas price (gwei) used whenever no oracle answer is available.
pub const DEFAULT_GAS_PRICE_GWEI: f64 = 30.0;

/// Reads gas prices from the per-chain oracle configured in [`ChainRegistry`].
#[derive(Clone)]
pub struct HttpGasSource {
    http: Client,
    chains: ChainRegistry,
}

impl HttpGasSource {
    pub fn new(http: Client, chains: ChainRegistry) -> Self {
        Self { http, chains }
    }

    async fn query_oracle(&self, url: &str) -> Result<f64, SourceError> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::unavailable(format!(
                "Gas oracle returned HTTP {}",
                response.status()
            )));
        }

        let body = response.json::<Value>().await?;
        parse_gas_price(&body)
    }
}

/// Oracles disagree on shape; try the known fields in priority order.
pub fn parse_gas_price(body: &Value) -> Result<f64, SourceError> {
    const GAS_PRICE_FIELDS: [&str; 3] = ["/result/ProposeGasPrice", "/average", "/result/FastGasPrice"];

    let gas_price = GAS_PRICE_FIELDS
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(json_number))
        .ok_or_else(|| SourceError::malformed("no recognised gas price field in oracle response"))?;

    if gas_price < 0.0 {
        return Err(SourceError::malformed(format!("negative gas price {}", gas_price)));
    }
    Ok(gas_price)
}

#[async_trait]
impl GasSource for HttpGasSource {
    async fn fetch_gas(&self, chain: Chain) -> Sourced<GasData> {
        let Some(url) = self.chains.metadata(chain).gas_oracle_url else {
            return Sourced::new(
                GasData { gas_price: DEFAULT_GAS_PRICE_GWEI },
                SourceOrigin::StaticDefault,
            );
        };

        match self.query_oracle(&url).await {
            Ok(gas_price) => Sourced::endpoint(GasData { gas_price }, url),
            Err(err) => {
                tracing::warn!("Gas lookup for {} fell back to default: {}", chain, err);
                Sourced::new(
                    GasData { gas_price: DEFAULT_GAS_PRICE_GWEI },
                    SourceOrigin::StaticFallback,
                )
            }
        }
    }
}
