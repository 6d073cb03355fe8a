//! Static chain metadata.
//!
//! Maps each supported chain to its native token, average block time and
//! an optional gas-price oracle. The built-in table can be overridden per
//! chain so deployments (and tests) can point oracles elsewhere.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported chain identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    BinanceSmartChain,
    Avalanche,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::BinanceSmartChain,
        Chain::Avalanche,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::BinanceSmartChain => "binance-smart-chain",
            Chain::Avalanche => "avalanche",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unsupported chain: {}", s))
    }
}

/// Per-chain metadata consumed by the gas and latency sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainMetadata {
    pub native_token: String,
    pub block_time_secs: f64,
    pub gas_oracle_url: Option<String>,
}

impl ChainMetadata {
    fn new(native_token: &str, block_time_secs: f64, gas_oracle_url: Option<&str>) -> Self {
        Self {
            native_token: native_token.to_string(),
            block_time_secs,
            gas_oracle_url: gas_oracle_url.map(str::to_string),
        }
    }
}

fn builtin_metadata(chain: Chain) -> ChainMetadata {
    match chain {
        Chain::Ethereum => ChainMetadata::new(
            "ETH",
            12.0,
            Some("https://api.etherscan.io/api?module=gastracker&action=gasoracle"),
        ),
        Chain::Polygon => {
            ChainMetadata::new("MATIC", 2.0, Some("https://gasstation-mainnet.matic.network"))
        }
        Chain::Arbitrum => ChainMetadata::new("ETH", 2.0, None),
        Chain::Optimism => ChainMetadata::new("ETH", 2.0, None),
        Chain::BinanceSmartChain => ChainMetadata::new("BNB", 3.0, Some("https://bscgas.info/gas")),
        Chain::Avalanche => ChainMetadata::new("AVAX", 3.0, None),
    }
}

/// Lookup table from [`Chain`] to [`ChainMetadata`].
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<Chain, ChainMetadata>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self {
            chains: Chain::ALL
                .into_iter()
                .map(|chain| (chain, builtin_metadata(chain)))
                .collect(),
        }
    }
}

impl ChainRegistry {
    pub fn metadata(&self, chain: Chain) -> ChainMetadata {
        self.chains
            .get(&chain)
            .cloned()
            .unwrap_or_else(|| builtin_metadata(chain))
    }

    pub fn with_gas_oracle(mut self, chain: Chain, url: impl Into<String>) -> Self {
        self.entry(chain).gas_oracle_url = Some(url.into());
        self
    }

    pub fn without_gas_oracle(mut self, chain: Chain) -> Self {
        self.entry(chain).gas_oracle_url = None;
        self
    }

    pub fn with_block_time(mut self, chain: Chain, block_time_secs: f64) -> Self {
        self.entry(chain).block_time_secs = block_time_secs;
        self
    }

    fn entry(&mut self, chain: Chain) -> &mut ChainMetadata {
        self.chains
            .entry(chain)
            .or_insert_with(|| builtin_metadata(chain))
    }
}
