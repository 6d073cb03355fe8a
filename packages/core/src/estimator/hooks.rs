//! Post-aggregation summary hooks.
//!
//! A hook sees the current summary and either returns a replacement or
//! `None` to keep it. Hooks run in the order they were added; the first
//! error aborts the chain and the estimate.

use std::fmt;
use std::sync::Arc;

use crate::error::EstimateError;
use crate::estimator::types::CostSummary;

/// Error raised by a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HookError {}

pub type SummaryHook =
    Arc<dyn Fn(&CostSummary) -> Result<Option<CostSummary>, HookError> + Send + Sync>;

/// Ordered, append-only list of hooks owned by one estimator.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<SummaryHook>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CostSummary) -> Result<Option<CostSummary>, HookError> + Send + Sync + 'static,
    {
        self.push(hook);
        self
    }

    pub fn push<F>(&mut self, hook: F)
    where
        F: Fn(&CostSummary) -> Result<Option<CostSummary>, HookError> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn apply(&self, summary: CostSummary) -> Result<CostSummary, EstimateError> {
        if self.is_empty() {
            return Ok(summary);
        }
        let mut current = summary;
        for (index, hook) in self.hooks.iter().enumerate() {
            match hook(&current) {
                Ok(Some(replacement)) => current = replacement,
                Ok(None) => {}
                Err(err) => return Err(EstimateError::hook(index, err.to_string())),
            }
        }
        Ok(current)
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain").field("hooks", &self.hooks.len()).finish()
    }
}
