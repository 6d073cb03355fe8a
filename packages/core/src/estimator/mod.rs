//! Cost Estimator Module
//!
//! Turns an [`InputPayload`] into a [`CostSummary`]: concurrent source
//! fetches, normalization into a [`CostDatum`], independent cost processors,
//! aggregation with an efficiency rating, then optional summary hooks.

pub mod aggregator;
pub mod engine;
pub mod hooks;
pub mod normalizer;
pub mod processors;
pub mod settle;
pub mod types;


pub use engine::{CostEstimator, CostEstimatorBuilder, Stage, DEFAULT_CACHE_TTL};
pub use hooks::{HookChain, HookError, SummaryHook};
pub use types::*;
