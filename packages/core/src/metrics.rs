//! Prometheus metrics registry for the cost estimator.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the estimator. Exposed at `GET /metrics` in Prometheus text exposition
//! format (`text/plain; version=0.0.4`).

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Estimates requested (cache hits included).
    pub estimates_total: Counter,
    /// Estimates answered straight from the result cache.
    pub cache_hits_total: Counter,
    /// Requests that joined an identical computation already in flight.
    pub coalesced_total: Counter,
    /// Source answers that were fallbacks, labelled by source.
    pub source_fallbacks_total: CounterVec,
    /// Estimates aborted by a failing summary hook.
    pub hook_failures_total: Counter,
    /// Wall time of uncached estimates, in seconds.
    pub estimate_duration: Histogram,
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let estimates_total = Counter::with_opts(Opts::new(
            "cost_estimator_estimates_total",
            "Cost estimates requested",
        ))?;

        let cache_hits_total = Counter::with_opts(Opts::new(
            "cost_estimator_cache_hits_total",
            "Cost estimates served from the result cache",
        ))?;

        let coalesced_total = Counter::with_opts(Opts::new(
            "cost_estimator_coalesced_total",
            "Cost estimates that awaited an identical in-flight computation",
        ))?;

        let source_fallbacks_total = CounterVec::new(
            Opts::new(
                "cost_estimator_source_fallbacks_total",
                "Source answers substituted by a static fallback",
            ),
            &["source"],
        )?;

        let hook_failures_total = Counter::with_opts(Opts::new(
            "cost_estimator_hook_failures_total",
            "Cost estimates aborted by a summary hook",
        ))?;

        let estimate_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cost_estimator_estimate_duration_seconds",
                "Uncached cost estimate latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(estimates_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(coalesced_total.clone()))?;
        registry.register(Box::new(source_fallbacks_total.clone()))?;
        registry.register(Box::new(hook_failures_total.clone()))?;
        registry.register(Box::new(estimate_duration.clone()))?;

        Ok(Self {
            estimates_total,
            cache_hits_total,
            coalesced_total,
            source_fallbacks_total,
            hook_failures_total,
            estimate_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
