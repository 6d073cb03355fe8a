//! Deterministic in-memory sources.
//!
//! Each mock returns a fixed value with a configurable source tag and counts
//! how often it was called. A mock can also be told to panic so the
//! estimator's task-failure path can be exercised. The CLI's `--offline`
//! mode uses [`MockSources::offline`] to run without any network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::chains::Chain;
use crate::sources::{
    CostSources, DexQuoteData, DexQuoteSource, GasData, GasSource, LatencyData, LatencySource,
    PriceData, PriceSource, SourceOrigin, Sourced,
};

/// A fixed answer plus call accounting shared by every mock source.
#[derive(Debug)]
pub struct MockSource<T> {
    answer: Sourced<T>,
    panic_on_fetch: bool,
    calls: AtomicUsize,
}

impl<T: Clone> MockSource<T> {
    pub fn new(value: T, origin: SourceOrigin) -> Self {
        Self {
            answer: Sourced::new(value, origin),
            panic_on_fetch: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Tag the answer with a custom source string.
    pub fn tagged(value: T, tag: impl Into<String>) -> Self {
        Self::new(value, SourceOrigin::Endpoint(tag.into()))
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_fetch = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> Sourced<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_fetch {
            panic!("mock source configured to panic");
        }
        self.answer.clone()
    }
}

pub type MockGasSource = MockSource<GasData>;
pub type MockPriceSource = MockSource<PriceData>;
pub type MockDexQuoteSource = MockSource<DexQuoteData>;
pub type MockLatencySource = MockSource<LatencyData>;

#[async_trait]
impl GasSource for MockGasSource {
    async fn fetch_gas(&self, _chain: Chain) -> Sourced<GasData> {
        self.answer()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_price(&self, _token: &str) -> Sourced<PriceData> {
        self.answer()
    }
}

#[async_trait]
impl DexQuoteSource for MockDexQuoteSource {
    async fn fetch_quote(&self, _sell: &str, _buy: &str, _amount: f64) -> Sourced<DexQuoteData> {
        self.answer()
    }
}

#[async_trait]
impl LatencySource for MockLatencySource {
    async fn fetch_latency(&self, _chain: Chain) -> Sourced<LatencyData> {
        self.answer()
    }
}

/// Handles to a full set of mocks, kept so tests can inspect call counts
/// after handing [`CostSources`] to an estimator.
#[derive(Clone)]
pub struct MockSources {
    pub gas: Arc<MockGasSource>,
    pub price: Arc<MockPriceSource>,
    pub dex_quote: Arc<MockDexQuoteSource>,
    pub latency: Arc<MockLatencySource>,
}

impl MockSources {
    pub fn new(
        gas: MockGasSource,
        price: MockPriceSource,
        dex_quote: MockDexQuoteSource,
        latency: MockLatencySource,
    ) -> Self {
        Self {
            gas: Arc::new(gas),
            price: Arc::new(price),
            dex_quote: Arc::new(dex_quote),
            latency: Arc::new(latency),
        }
    }

    /// Static values only: the same answers the network sources give when
    /// every upstream is down.
    pub fn offline(block_time_secs: f64) -> Self {
        Self::new(
            MockSource::new(GasData { gas_price: 30.0 }, SourceOrigin::StaticDefault),
            MockSource::new(PriceData { price: 1.0 }, SourceOrigin::StaticDefault),
            MockSource::new(
                DexQuoteData {
                    slippage_pct: 0.5,
                    price_impact_pct: 0.4,
                    protocol_fee_usd: 0.0,
                },
                SourceOrigin::StaticFallback,
            ),
            MockSource::new(
                LatencyData { latency_seconds: block_time_secs },
                SourceOrigin::StaticEstimate,
            ),
        )
    }

    pub fn total_calls(&self) -> usize {
        self.gas.calls() + self.price.calls() + self.dex_quote.calls() + self.latency.calls()
    }

    pub fn sources(&self) -> CostSources {
        CostSources {
            gas: self.gas.clone(),
            price: self.price.clone(),
            dex_quote: self.dex_quote.clone(),
            latency: self.latency.clone(),
            quote_token: "USDC".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_counts_each_fetch() {
        let gas = MockGasSource::tagged(GasData { gas_price: 12.0 }, "mock-gas");
        gas.fetch_gas(Chain::Ethereum).await;
        let answer = gas.fetch_gas(Chain::Polygon).await;

        assert_eq!(gas.calls(), 2);
        assert_eq!(answer.source(), "mock-gas");
        assert_eq!(answer.value.gas_price, 12.0);
    }

    #[tokio::test]
    async fn offline_set_mirrors_static_fallbacks() {
        let mocks = MockSources::offline(12.0);
        let sources = mocks.sources();

        let price = sources.price.fetch_price("ETH").await;
        assert_eq!(price.value.price, 1.0);
        assert_eq!(price.source(), "static-default");
        assert_eq!(mocks.total_calls(), 1);
    }
}
