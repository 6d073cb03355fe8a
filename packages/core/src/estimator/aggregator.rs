//! Combine processor outputs into the user-facing [`CostSummary`].

use crate::estimator::processors::{GasCost, LatencyEstimate, NetReceived, SlippageCost};
use crate::estimator::types::{round6, CostDatum, CostEfficiency, CostSummary, SCHEMA_VERSION};
use crate::sources::PriceData;

/// All processor outputs for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedCosts {
    pub gas: GasCost,
    pub slippage: SlippageCost,
    pub latency: LatencyEstimate,
    pub net_received: NetReceived,
}

/// Total cost as a percentage of gross value. Zero gross value yields 0.
pub fn cost_pct(total_cost_usd: f64, gross_usd: f64) -> f64 {
    if gross_usd > 0.0 {
        total_cost_usd / gross_usd * 100.0
    } else {
        0.0
    }
}

/// Keep the first occurrence of each tag, in order.
pub fn dedup_sources<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        if !seen.iter().any(|s| s == tag) {
            seen.push(tag.to_string());
        }
    }
    seen
}

/// Build the summary. Net received comes from the net-received processor,
/// which applies the same gross-minus-costs formula floored at zero.
pub fn aggregate(
    datum: &CostDatum,
    costs: &ProcessedCosts,
    price: &PriceData,
    sources: &[&str],
) -> CostSummary {
    let total_cost_usd = costs.gas.gas_usd + costs.slippage.slippage_usd + datum.protocol_fee_usd;
    let gross_usd = datum.amount * price.price;
    let cost_efficiency = CostEfficiency::from_cost_pct(cost_pct(total_cost_usd, gross_usd));

    CostSummary {
        schema_version: SCHEMA_VERSION.to_string(),
        total_cost_usd: round6(total_cost_usd),
        net_received_usd: round6(costs.net_received.net_received_usd),
        predicted_latency_s: round6(costs.latency.latency_seconds),
        cost_efficiency,
        data_sources: dedup_sources(sources.iter().copied()),
        confidence: round6(datum.confidence),
        timestamp: datum.timestamp,
    }
}
