//! Unwrapping of settled fetch tasks.
//!
//! Fetchers never fail at their boundary, so the only thing left to handle
//! here is a fetch task that panicked or was cancelled. Its slot is filled
//! with the estimator's fallback, tagged `error-fallback`.

use tokio::task::JoinError;

use crate::sources::{DexQuoteData, GasData, LatencyData, PriceData, SourceOrigin, Sourced};

/// Fallback values for each slot when a fetch task does not complete.
pub fn gas_fallback() -> Sourced<GasData> {
    Sourced::new(GasData { gas_price: 30.0 }, SourceOrigin::ErrorFallback)
}

pub fn price_fallback() -> Sourced<PriceData> {
    Sourced::new(PriceData { price: 1.0 }, SourceOrigin::ErrorFallback)
}

pub fn dex_quote_fallback() -> Sourced<DexQuoteData> {
    Sourced::new(
        DexQuoteData {
            slippage_pct: 0.5,
            price_impact_pct: 0.4,
            protocol_fee_usd: 0.0,
        },
        SourceOrigin::ErrorFallback,
    )
}

pub fn latency_fallback() -> Sourced<LatencyData> {
    Sourced::new(LatencyData { latency_seconds: 30.0 }, SourceOrigin::ErrorFallback)
}

/// Return the task's value, or `fallback()` if the task did not finish.
pub fn unwrap_settled<T>(
    label: &str,
    settled: Result<Sourced<T>, JoinError>,
    fallback: impl FnOnce() -> Sourced<T>,
) -> Sourced<T> {
    match settled {
        Ok(value) => value,
        Err(err) => {
            let cause = if err.is_panic() { "panicked" } else { "was cancelled" };
            tracing::warn!("{} fetch {}, substituting fallback", label, cause);
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completed_task_passes_through() {
        let settled = tokio::spawn(async { Sourced::endpoint(PriceData { price: 2.0 }, "p") }).await;
        let price = unwrap_settled("price", settled, price_fallback);

        assert_eq!(price.value.price, 2.0);
        assert_eq!(price.source(), "p");
    }

    async fn crashing_fetch() -> Sourced<GasData> {
        panic!("oracle client crashed")
    }

    #[tokio::test]
    async fn panicked_task_yields_error_fallback() {
        let settled = tokio::spawn(crashing_fetch()).await;
        let gas = unwrap_settled("gas", settled, gas_fallback);

        assert_eq!(gas.value.gas_price, 30.0);
        assert_eq!(gas.source(), "error-fallback");
    }

    #[tokio::test]
    async fn cancelled_task_yields_error_fallback() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Sourced::endpoint(LatencyData { latency_seconds: 1.0 }, "never")
        });
        handle.abort();
        let latency = unwrap_settled("latency", handle.await, latency_fallback);

        assert_eq!(latency.value.latency_seconds, 30.0);
        assert_eq!(latency.origin, SourceOrigin::ErrorFallback);
    }
}
