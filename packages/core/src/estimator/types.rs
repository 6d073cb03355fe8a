//! Core data types for cost estimation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chains::Chain;
use crate::error::EstimateError;

/// Schema tag carried by every versioned record.
pub const SCHEMA_VERSION: &str = "1.0";

/// Gas units assumed for actions without a dedicated profile.
pub const DEFAULT_GAS_UNITS: u64 = 100_000;

/// The on-chain action being costed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Swap,
    Transfer,
    Bridge,
    Mint,
    Stake,
    Withdraw,
    /// Any action the estimator has no gas profile for.
    #[serde(other)]
    Other,
}

impl Action {
    pub const KNOWN: [Action; 6] = [
        Action::Swap,
        Action::Transfer,
        Action::Bridge,
        Action::Mint,
        Action::Stake,
        Action::Withdraw,
    ];

    /// Approximate gas consumed by the action.
    pub fn gas_units(&self) -> u64 {
        match self {
            Action::Swap => 120_000,
            Action::Transfer => 45_000,
            Action::Bridge => 200_000,
            Action::Mint => 150_000,
            Action::Stake => 180_000,
            Action::Withdraw => 150_000,
            Action::Other => DEFAULT_GAS_UNITS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Swap => "swap",
            Action::Transfer => "transfer",
            Action::Bridge => "bridge",
            Action::Mint => "mint",
            Action::Stake => "stake",
            Action::Withdraw => "withdraw",
            Action::Other => "other",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Action::KNOWN
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(Action::Other))
    }
}

/// A single estimation request. Immutable once handed to the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPayload {
    pub chain: Chain,
    pub token: String,
    pub action: Action,
    pub amount: f64,
}

impl InputPayload {
    pub fn new(chain: Chain, token: impl Into<String>, action: Action, amount: f64) -> Self {
        Self {
            chain,
            token: token.into(),
            action,
            amount,
        }
    }

    /// Reject amounts that are negative or not finite, and blank tokens.
    pub fn validate(&self) -> Result<(), EstimateError> {
        if !self.amount.is_finite() {
            return Err(EstimateError::invalid_input(format!(
                "amount must be a finite number, got {}",
                self.amount
            )));
        }
        if self.amount < 0.0 {
            return Err(EstimateError::invalid_input(format!(
                "amount must not be negative, got {}",
                self.amount
            )));
        }
        if self.token.trim().is_empty() {
            return Err(EstimateError::invalid_input("token symbol must not be empty"));
        }
        Ok(())
    }
}

/// Canonical record every cost derivation reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDatum {
    pub schema_version: String,
    pub chain: Chain,
    pub token: String,
    pub action: Action,
    pub amount: f64,
    /// Gas cost in native token units.
    pub gas_native: f64,
    pub gas_usd: f64,
    /// 0 to 100
    pub slippage_pct: f64,
    /// 0 to 100
    pub price_impact_pct: f64,
    pub protocol_fee_usd: f64,
    pub latency_s: f64,
    pub confidence: f64,
    /// Unix seconds at normalization.
    pub timestamp: i64,
}

/// Three-tier classification of total cost relative to gross value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostEfficiency {
    Green,
    Yellow,
    Red,
}

impl CostEfficiency {
    /// `< 1` green, `[1, 5)` yellow, `>= 5` red.
    pub fn from_cost_pct(cost_pct: f64) -> Self {
        if cost_pct < 1.0 {
            CostEfficiency::Green
        } else if cost_pct < 5.0 {
            CostEfficiency::Yellow
        } else {
            CostEfficiency::Red
        }
    }
}

impl fmt::Display for CostEfficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CostEfficiency::Green => "green",
            CostEfficiency::Yellow => "yellow",
            CostEfficiency::Red => "red",
        };
        f.write_str(label)
    }
}

/// Final, user-facing result of an estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub schema_version: String,
    pub total_cost_usd: f64,
    pub net_received_usd: f64,
    pub predicted_latency_s: f64,
    pub cost_efficiency: CostEfficiency,
    pub data_sources: Vec<String>,
    pub confidence: f64,
    pub timestamp: i64,
}

/// Round to 6 decimal places.
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
