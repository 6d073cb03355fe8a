//! Merge the request and the four source answers into a [`CostDatum`].

use chrono::Utc;

use crate::estimator::types::{CostDatum, InputPayload, SCHEMA_VERSION};
use crate::sources::{DexQuoteData, GasData, LatencyData, PriceData};

/// Gwei per native token.
const GWEI_PER_NATIVE: f64 = 1e9;

/// Price record with a negative or NaN quote floored at zero. The engine
/// hands this same record to the normalizer, processors and aggregator.
pub fn normalize_price(price: &PriceData) -> PriceData {
    PriceData {
        price: non_negative(price.price),
    }
}

/// Build the canonical record for one request.
///
/// Gas units come from the action's profile; the native gas cost is
/// `gas_price * gas_units / 1e9` and is converted to USD with the token
/// price. Negative or NaN gas prices, token prices and protocol fees are
/// floored at zero. Confidence is fixed at 1.0.
pub fn normalize(
    input: &InputPayload,
    gas: &GasData,
    price: &PriceData,
    dex: &DexQuoteData,
    latency: &LatencyData,
) -> CostDatum {
    let gas_units = input.action.gas_units() as f64;
    let gas_native = non_negative(gas.gas_price) * gas_units / GWEI_PER_NATIVE;
    let gas_usd = gas_native * non_negative(price.price);

    CostDatum {
        schema_version: SCHEMA_VERSION.to_string(),
        chain: input.chain,
        token: input.token.clone(),
        action: input.action,
        amount: input.amount,
        gas_native,
        gas_usd,
        slippage_pct: clamp_pct(dex.slippage_pct),
        price_impact_pct: clamp_pct(dex.price_impact_pct),
        protocol_fee_usd: non_negative(dex.protocol_fee_usd),
        latency_s: latency.latency_seconds,
        confidence: 1.0,
        timestamp: Utc::now().timestamp(),
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
