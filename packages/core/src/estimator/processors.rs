//! Cost processors
//!
//! Pure, independent derivations over a [`CostDatum`]. None of them depends
//! on another's output except net-received, which sums the gas and
//! slippage facets.

use crate::estimator::types::CostDatum;
use crate::sources::PriceData;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasCost {
    pub gas_usd: f64,
    pub gas_native: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlippageCost {
    pub slippage_usd: f64,
    pub price_impact_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyEstimate {
    pub latency_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetReceived {
    pub net_received_usd: f64,
}

/// Gas facet. Passes the normalizer's figures through; tiered fees or
/// rebates would be applied here.
pub fn process_gas_cost(datum: &CostDatum) -> GasCost {
    GasCost {
        gas_usd: datum.gas_usd,
        gas_native: datum.gas_native,
    }
}

pub fn process_slippage(datum: &CostDatum, price: &PriceData) -> SlippageCost {
    SlippageCost {
        slippage_usd: datum.amount * price.price * datum.slippage_pct / 100.0,
        price_impact_pct: datum.price_impact_pct,
    }
}

pub fn process_latency(datum: &CostDatum) -> LatencyEstimate {
    LatencyEstimate {
        latency_seconds: datum.latency_s,
    }
}

/// Gross value minus all costs, floored at zero.
pub fn process_net_received(
    datum: &CostDatum,
    price: &PriceData,
    gas: &GasCost,
    slippage: &SlippageCost,
) -> NetReceived {
    let gross_usd = datum.amount * price.price;
    let total_costs = gas.gas_usd + slippage.slippage_usd + datum.protocol_fee_usd;
    NetReceived {
        net_received_usd: (gross_usd - total_costs).max(0.0),
    }
}
