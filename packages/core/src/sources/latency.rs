//! Confirmation latency estimate from static block times.

use async_trait::async_trait;
use rand::Rng;

use crate::chains::{Chain, ChainRegistry};
use crate::sources::{LatencyData, LatencySource, SourceOrigin, Sourced};

/// Block time scaled by a random congestion multiplier in `[1, 2)`.
#[derive(Clone, Default)]
pub struct BlockTimeLatencySource {
    chains: ChainRegistry,
}

impl BlockTimeLatencySource {
    pub fn new(chains: ChainRegistry) -> Self {
        Self { chains }
    }

    /// Latency for a given multiplier, rounded to whole seconds.
    pub fn latency_for(&self, chain: Chain, multiplier: f64) -> f64 {
        (self.chains.metadata(chain).block_time_secs * multiplier).round()
    }
}

#[async_trait]
impl LatencySource for BlockTimeLatencySource {
    async fn fetch_latency(&self, chain: Chain) -> Sourced<LatencyData> {
        let multiplier = rand::thread_rng().gen_range(1.0..2.0);
        Sourced::new(
            LatencyData {
                latency_seconds: self.latency_for(chain, multiplier),
            },
            SourceOrigin::StaticEstimate,
        )
    }
}
