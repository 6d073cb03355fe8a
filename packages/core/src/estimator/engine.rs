//! Cost estimator - central orchestrator for a single estimate
//!
//! One request moves through `Fetching -> Normalizing -> Processing ->
//! Aggregating -> Done`, with a cache check up front and summary hooks at
//! the end. Identical requests that overlap in time share one computation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::JoinError;

use crate::cache::{ResultCache, DEFAULT_CAPACITY};
use crate::error::EstimateError;
use crate::estimator::aggregator::{aggregate, ProcessedCosts};
use crate::estimator::hooks::HookChain;
use crate::estimator::normalizer::{normalize, normalize_price};
use crate::estimator::processors::{
    process_gas_cost, process_latency, process_net_received, process_slippage,
};
use crate::estimator::settle::{
    dex_quote_fallback, gas_fallback, latency_fallback, price_fallback, unwrap_settled,
};
use crate::estimator::types::{CostSummary, InputPayload};
use crate::metrics::AppMetrics;
use crate::sources::{
    CostSources, DexQuoteData, GasData, LatencyData, PriceData, SourceOrigin, Sourced,
};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

type EstimateResult = Result<CostSummary, EstimateError>;
type SharedEstimate = Shared<BoxFuture<'static, EstimateResult>>;

/// Pipeline stage of an in-progress estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Normalizing,
    Processing,
    Aggregating,
    Done,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Normalizing => "normalizing",
            Stage::Processing => "processing",
            Stage::Aggregating => "aggregating",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

/// Settled answers from all four sources.
struct Fetched {
    gas: Sourced<GasData>,
    price: Sourced<PriceData>,
    dex_quote: Sourced<DexQuoteData>,
    latency: Sourced<LatencyData>,
}

struct EstimatorInner {
    sources: CostSources,
    hooks: HookChain,
    cache: Mutex<ResultCache<String, CostSummary>>,
    in_flight: Mutex<HashMap<String, SharedEstimate>>,
    metrics: Option<Arc<AppMetrics>>,
}

/// Builder for [`CostEstimator`].
pub struct CostEstimatorBuilder {
    sources: CostSources,
    hooks: HookChain,
    cache_ttl: Duration,
    cache_capacity: usize,
    metrics: Option<Arc<AppMetrics>>,
}

impl CostEstimatorBuilder {
    pub fn hooks(mut self, hooks: HookChain) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> CostEstimator {
        tracing::debug!(
            "Building estimator: {} hook(s), cache ttl {:?}, capacity {}",
            self.hooks.len(),
            self.cache_ttl,
            self.cache_capacity
        );
        CostEstimator {
            inner: Arc::new(EstimatorInner {
                sources: self.sources,
                hooks: self.hooks,
                cache: Mutex::new(ResultCache::new(self.cache_ttl, self.cache_capacity)),
                in_flight: Mutex::new(HashMap::new()),
                metrics: self.metrics,
            }),
        }
    }
}

/// Estimates the USD cost and latency of one on-chain action.
///
/// Cheap to clone; clones share the cache and the in-flight map.
#[derive(Clone)]
pub struct CostEstimator {
    inner: Arc<EstimatorInner>,
}

impl CostEstimator {
    pub fn builder(sources: CostSources) -> CostEstimatorBuilder {
        CostEstimatorBuilder {
            sources,
            hooks: HookChain::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            metrics: None,
        }
    }

    /// Estimator with default cache settings and no hooks.
    pub fn new(sources: CostSources) -> Self {
        Self::builder(sources).build()
    }

    pub async fn cache_ttl(&self) -> Duration {
        self.inner.cache.lock().await.ttl()
    }

    pub async fn cached_entries(&self) -> usize {
        self.inner.cache.lock().await.len()
    }

    /// Produce a cost summary for `input`.
    ///
    /// A fresh cached summary for an identical request is returned as-is.
    /// Otherwise the request joins an identical computation already in
    /// flight, or starts one. Only invalid input, key serialization and
    /// hook failures surface as errors; failures are never cached.
    pub async fn estimate(&self, input: &InputPayload) -> EstimateResult {
        input.validate()?;
        let key = cache_key(input)?;
        self.inner.observe(|m| m.estimates_total.inc());

        if let Some(hit) = self.inner.cache.lock().await.get(&key) {
            tracing::debug!("Cache hit for {} {} on {}", input.action, input.token, input.chain);
            self.inner.observe(|m| m.cache_hits_total.inc());
            return Ok(hit);
        }

        let pending = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::debug!("Joining in-flight estimate for {}", key);
                    self.inner.observe(|m| m.coalesced_total.inc());
                    pending.clone()
                }
                None => {
                    let computation = self
                        .inner
                        .clone()
                        .compute(key.clone(), input.clone())
                        .boxed()
                        .shared();
                    in_flight.insert(key, computation.clone());
                    computation
                }
            }
        };

        pending.await
    }
}

/// Deterministic request key.
pub fn cache_key(input: &InputPayload) -> Result<String, EstimateError> {
    serde_json::to_string(input).map_err(|err| EstimateError::serialization(err.to_string()))
}

impl EstimatorInner {
    fn observe(&self, record: impl FnOnce(&AppMetrics)) {
        if let Some(metrics) = self.metrics.as_deref() {
            record(metrics);
        }
    }

    /// Run the pipeline on its own task, store a successful result, then
    /// release the in-flight slot so later callers hit the cache instead.
    /// A panicking pipeline becomes `EstimateError::Aborted` and still
    /// releases the slot.
    async fn compute(self: Arc<Self>, key: String, input: InputPayload) -> EstimateResult {
        let started = Instant::now();
        enter(Stage::Idle, &input);

        let pipeline = {
            let inner = self.clone();
            let input = input.clone();
            tokio::spawn(async move { inner.run_pipeline(&input).await })
        };
        let result = pipeline.await.unwrap_or_else(|err| Err(aborted(err)));

        match &result {
            Ok(summary) => {
                self.cache.lock().await.set(key.clone(), summary.clone());
                tracing::info!(
                    "Estimated {} {} {} on {}: ${:.6} total, {}",
                    input.action,
                    input.amount,
                    input.token,
                    input.chain,
                    summary.total_cost_usd,
                    summary.cost_efficiency
                );
            }
            Err(err) => {
                enter(Stage::Error, &input);
                tracing::warn!("Estimate for {} failed: {}", key, err);
                if matches!(err, EstimateError::Hook { .. }) {
                    self.observe(|m| m.hook_failures_total.inc());
                }
            }
        }

        self.in_flight.lock().await.remove(&key);
        self.observe(|m| m.estimate_duration.observe(started.elapsed().as_secs_f64()));
        result
    }

    async fn run_pipeline(&self, input: &InputPayload) -> EstimateResult {
        enter(Stage::Fetching, input);
        let fetched = self.fetch_all(input).await;
        self.record_fallbacks(&fetched);

        enter(Stage::Normalizing, input);
        let price = &normalize_price(&fetched.price.value);
        let datum = normalize(
            input,
            &fetched.gas.value,
            price,
            &fetched.dex_quote.value,
            &fetched.latency.value,
        );

        enter(Stage::Processing, input);
        let gas = process_gas_cost(&datum);
        let slippage = process_slippage(&datum, price);
        let latency = process_latency(&datum);
        let net_received = process_net_received(&datum, price, &gas, &slippage);

        enter(Stage::Aggregating, input);
        let costs = ProcessedCosts {
            gas,
            slippage,
            latency,
            net_received,
        };
        let summary = aggregate(
            &datum,
            &costs,
            price,
            &[
                fetched.gas.source(),
                fetched.price.source(),
                fetched.dex_quote.source(),
                fetched.latency.source(),
            ],
        );

        let summary = self.hooks.apply(summary)?;
        enter(Stage::Done, input);
        Ok(summary)
    }

    /// Launch all four fetches and wait for every one to settle.
    async fn fetch_all(&self, input: &InputPayload) -> Fetched {
        let chain = input.chain;

        let gas = {
            let source = self.sources.gas.clone();
            tokio::spawn(async move { source.fetch_gas(chain).await })
        };
        let price = {
            let source = self.sources.price.clone();
            let token = input.token.clone();
            tokio::spawn(async move { source.fetch_price(&token).await })
        };
        let dex_quote = {
            let source = self.sources.dex_quote.clone();
            let sell = input.token.clone();
            let buy = self.sources.quote_token.clone();
            let amount = input.amount;
            tokio::spawn(async move { source.fetch_quote(&sell, &buy, amount).await })
        };
        let latency = {
            let source = self.sources.latency.clone();
            tokio::spawn(async move { source.fetch_latency(chain).await })
        };

        let (gas, price, dex_quote, latency) = tokio::join!(gas, price, dex_quote, latency);

        Fetched {
            gas: unwrap_settled("gas", gas, gas_fallback),
            price: unwrap_settled("price", price, price_fallback),
            dex_quote: unwrap_settled("dex quote", dex_quote, dex_quote_fallback),
            latency: unwrap_settled("latency", latency, latency_fallback),
        }
    }

    fn record_fallbacks(&self, fetched: &Fetched) {
        let origins: [(&str, &SourceOrigin); 4] = [
            ("gas", &fetched.gas.origin),
            ("price", &fetched.price.origin),
            ("dex_quote", &fetched.dex_quote.origin),
            ("latency", &fetched.latency.origin),
        ];
        for (label, origin) in origins {
            if origin.is_fallback() {
                tracing::debug!("{} source answered with {}", label, origin.tag());
                self.observe(|m| m.source_fallbacks_total.with_label_values(&[label]).inc());
            }
        }
    }
}

fn aborted(err: JoinError) -> EstimateError {
    if !err.is_panic() {
        return EstimateError::aborted("estimate was cancelled");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    EstimateError::aborted(format!("estimate panicked: {}", message))
}

fn enter(stage: Stage, input: &InputPayload) {
    tracing::debug!("Estimate {} {} on {}: {}", input.action, input.token, input.chain, stage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::chains::Chain;
    use crate::estimator::hooks::HookError;
    use crate::estimator::types::{Action, CostEfficiency};
    use crate::sources::mock::{
        MockDexQuoteSource, MockGasSource, MockLatencySource, MockPriceSource, MockSources,
    };

    fn reference_mocks() -> MockSources {
        MockSources::new(
            MockGasSource::tagged(GasData { gas_price: 50.0 }, "mock-gas"),
            MockPriceSource::tagged(PriceData { price: 2.0 }, "mock-price"),
            MockDexQuoteSource::tagged(
                DexQuoteData {
                    slippage_pct: 1.0,
                    price_impact_pct: 0.5,
                    protocol_fee_usd: 0.2,
                },
                "mock-dex",
            ),
            MockLatencySource::tagged(LatencyData { latency_seconds: 15.0 }, "mock-latency"),
        )
    }

    fn swap(amount: f64) -> InputPayload {
        InputPayload::new(Chain::Ethereum, "ETH", Action::Swap, amount)
    }

    #[tokio::test]
    async fn estimate_matches_reference_swap() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());

        let summary = estimator.estimate(&swap(10.0)).await.unwrap();

        // gas 50 gwei * 120000 / 1e9 = 0.006 ETH * $2 = 0.012
        // slippage 10 * 2 * 1% = 0.2, protocol fee 0.2
        assert_eq!(summary.total_cost_usd, 0.412);
        assert_eq!(summary.net_received_usd, 19.588);
        assert_eq!(summary.predicted_latency_s, 15.0);
        assert_eq!(summary.cost_efficiency, CostEfficiency::Yellow);
        assert_eq!(
            summary.data_sources,
            vec!["mock-gas", "mock-price", "mock-dex", "mock-latency"]
        );
        assert_eq!(summary.confidence, 1.0);
    }

    #[tokio::test]
    async fn repeated_request_is_served_from_cache() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());

        let first = estimator.estimate(&swap(10.0)).await.unwrap();
        let calls_after_first = mocks.total_calls();
        let second = estimator.estimate(&swap(10.0)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls_after_first, 4);
        assert_eq!(mocks.total_calls(), 4);
        assert_eq!(estimator.cached_entries().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::builder(mocks.sources())
            .cache_ttl(Duration::ZERO)
            .build();

        estimator.estimate(&swap(10.0)).await.unwrap();
        estimator.estimate(&swap(10.0)).await.unwrap();

        assert_eq!(mocks.total_calls(), 8);
    }

    #[tokio::test]
    async fn different_inputs_use_different_keys() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());

        estimator.estimate(&swap(10.0)).await.unwrap();
        estimator.estimate(&swap(11.0)).await.unwrap();

        assert_eq!(mocks.total_calls(), 8);
        assert_eq!(estimator.cached_entries().await, 2);
    }

    #[tokio::test]
    async fn overlapping_identical_requests_fetch_once() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());
        let input = swap(10.0);

        let (a, b) = tokio::join!(estimator.estimate(&input), estimator.estimate(&input));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(mocks.gas.calls(), 1);
        assert_eq!(mocks.total_calls(), 4);
    }

    #[tokio::test]
    async fn zero_amount_is_green_with_nothing_received() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());

        let summary = estimator.estimate(&swap(0.0)).await.unwrap();

        assert_eq!(summary.net_received_usd, 0.0);
        assert_eq!(summary.cost_efficiency, CostEfficiency::Green);
        assert!(summary.total_cost_usd >= 0.0);
    }

    #[tokio::test]
    async fn coinciding_source_tags_are_reported_once() {
        let mocks = MockSources::offline(12.0);
        let estimator = CostEstimator::new(mocks.sources());

        let summary = estimator.estimate(&swap(1.0)).await.unwrap();

        assert_eq!(
            summary.data_sources,
            vec!["static-default", "static-fallback", "static-estimate"]
        );
    }

    #[tokio::test]
    async fn crashed_fetch_is_replaced_by_error_fallback() {
        let mocks = MockSources::new(
            MockGasSource::tagged(GasData { gas_price: 50.0 }, "mock-gas").panicking(),
            MockPriceSource::tagged(PriceData { price: 2.0 }, "mock-price"),
            MockDexQuoteSource::tagged(
                DexQuoteData {
                    slippage_pct: 0.0,
                    price_impact_pct: 0.0,
                    protocol_fee_usd: 0.0,
                },
                "mock-dex",
            ),
            MockLatencySource::tagged(LatencyData { latency_seconds: 15.0 }, "mock-latency"),
        );
        let estimator = CostEstimator::new(mocks.sources());

        let summary = estimator.estimate(&swap(10.0)).await.unwrap();

        // fallback 30 gwei * 120000 / 1e9 * $2
        assert_eq!(summary.total_cost_usd, 0.0072);
        assert_eq!(summary.data_sources[0], "error-fallback");
    }

    #[tokio::test]
    async fn hook_failure_surfaces_and_is_not_cached() {
        let mocks = reference_mocks();
        let hooks = HookChain::new().with_hook(|_| Err(HookError::new("mev check failed")));
        let estimator = CostEstimator::builder(mocks.sources()).hooks(hooks).build();

        let err = estimator.estimate(&swap(10.0)).await.unwrap_err();
        assert_eq!(err, EstimateError::hook(0, "mev check failed"));
        assert_eq!(estimator.cached_entries().await, 0);

        estimator.estimate(&swap(10.0)).await.unwrap_err();
        assert_eq!(mocks.total_calls(), 8);
    }

    #[tokio::test]
    async fn hook_output_is_what_gets_cached() {
        let mocks = reference_mocks();
        let hooks = HookChain::new().with_hook(|s| {
            Ok(Some(CostSummary {
                cost_efficiency: CostEfficiency::Red,
                ..s.clone()
            }))
        });
        let estimator = CostEstimator::builder(mocks.sources()).hooks(hooks).build();

        estimator.estimate(&swap(10.0)).await.unwrap();
        let cached = estimator.estimate(&swap(10.0)).await.unwrap();

        assert_eq!(cached.cost_efficiency, CostEfficiency::Red);
        assert_eq!(mocks.total_calls(), 4);
    }

    #[tokio::test]
    async fn panicking_hook_aborts_one_call_and_frees_the_key() {
        let mocks = reference_mocks();
        let crashed = Arc::new(AtomicBool::new(false));
        let flag = crashed.clone();
        let hooks = HookChain::new().with_hook(move |_| {
            if !flag.swap(true, Ordering::SeqCst) {
                panic!("risk scorer crashed");
            }
            Ok(None)
        });
        let estimator = CostEstimator::builder(mocks.sources())
            .hooks(hooks)
            .cache_ttl(Duration::from_secs(u64::MAX))
            .build();

        let err = estimator.estimate(&swap(10.0)).await.unwrap_err();
        assert_eq!(err, EstimateError::aborted("estimate panicked: risk scorer crashed"));
        assert_eq!(estimator.cached_entries().await, 0);

        let summary = estimator.estimate(&swap(10.0)).await.unwrap();
        assert_eq!(summary.total_cost_usd, 0.412);
        assert_eq!(mocks.total_calls(), 8);
    }

    #[tokio::test]
    async fn unbounded_ttl_caches_without_overflow() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::builder(mocks.sources())
            .cache_ttl(Duration::from_secs(u64::MAX))
            .build();

        estimator.estimate(&swap(10.0)).await.unwrap();
        estimator.estimate(&swap(10.0)).await.unwrap();

        assert_eq!(mocks.total_calls(), 4);
        assert_eq!(estimator.cache_ttl().await, Duration::from_secs(u64::MAX));
    }

    #[tokio::test]
    async fn negative_upstream_price_cannot_make_costs_negative() {
        let mocks = MockSources::new(
            MockGasSource::tagged(GasData { gas_price: -500.0 }, "mock-gas"),
            MockPriceSource::tagged(PriceData { price: -2.0 }, "mock-price"),
            MockDexQuoteSource::tagged(
                DexQuoteData {
                    slippage_pct: 1.0,
                    price_impact_pct: 0.5,
                    protocol_fee_usd: -1.0,
                },
                "mock-dex",
            ),
            MockLatencySource::tagged(LatencyData { latency_seconds: 15.0 }, "mock-latency"),
        );
        let estimator = CostEstimator::new(mocks.sources());

        let summary = estimator.estimate(&swap(10.0)).await.unwrap();

        assert_eq!(summary.total_cost_usd, 0.0);
        assert_eq!(summary.net_received_usd, 0.0);
        assert_eq!(summary.cost_efficiency, CostEfficiency::Green);
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_before_fetching() {
        let mocks = reference_mocks();
        let estimator = CostEstimator::new(mocks.sources());

        let err = estimator.estimate(&swap(-5.0)).await.unwrap_err();

        assert!(matches!(err, EstimateError::InvalidInput { .. }));
        assert_eq!(mocks.total_calls(), 0);
    }

    #[tokio::test]
    async fn metrics_track_hits_and_fallbacks() {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let mocks = MockSources::offline(12.0);
        let estimator = CostEstimator::builder(mocks.sources())
            .metrics(metrics.clone())
            .build();

        estimator.estimate(&swap(1.0)).await.unwrap();
        estimator.estimate(&swap(1.0)).await.unwrap();

        assert_eq!(metrics.estimates_total.get(), 2.0);
        assert_eq!(metrics.cache_hits_total.get(), 1.0);
        assert_eq!(
            metrics.source_fallbacks_total.with_label_values(&["gas"]).get(),
            1.0
        );
        assert_eq!(
            metrics.source_fallbacks_total.with_label_values(&["latency"]).get(),
            0.0
        );
    }

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(cache_key(&swap(1.0)).unwrap(), cache_key(&swap(1.0)).unwrap());
        assert_ne!(cache_key(&swap(1.0)).unwrap(), cache_key(&swap(2.0)).unwrap());
    }
}
