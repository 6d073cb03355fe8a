//! Error types for the estimator and the binary that hosts it.

use thiserror::Error;

/// Failures a caller of [`CostEstimator::estimate`] can observe.
///
/// Source failures never show up here: every fetcher absorbs its own
/// transport and parse problems and substitutes a static fallback.
/// `Clone` is required so a single failed computation can be handed to
/// every request that was coalesced onto it.
///
/// [`CostEstimator::estimate`]: crate::estimator::CostEstimator::estimate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Failed to serialize request key: {message}")]
    Serialization { message: String },

    #[error("Summary hook #{index} failed: {message}")]
    Hook { index: usize, message: String },

    /// The computation panicked or was cancelled before producing a result.
    #[error("Estimate aborted: {message}")]
    Aborted { message: String },
}

impl EstimateError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    pub fn hook(index: usize, message: impl Into<String>) -> Self {
        Self::Hook { index, message: message.into() }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted { message: message.into() }
    }
}

/// Errors raised inside a source fetcher before it falls back.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unavailable: {message}")]
    Unavailable { message: String },

    #[error("Malformed source response: {message}")]
    Malformed { message: String },
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::malformed(err.to_string())
        } else {
            SourceError::unavailable(err.to_string())
        }
    }
}

/// Unified application error for the binary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_error_names_the_failing_hook() {
        let err = EstimateError::hook(2, "boom");
        assert_eq!(err.to_string(), "Summary hook #2 failed: boom");
    }

    #[test]
    fn aborted_error_carries_the_cause() {
        let err = EstimateError::aborted("estimate panicked: boom");
        assert_eq!(err.to_string(), "Estimate aborted: estimate panicked: boom");
    }

    #[test]
    fn estimate_error_converts_into_app_error() {
        let err: AppError = EstimateError::invalid_input("amount must be finite").into();
        assert!(matches!(err, AppError::Estimate(EstimateError::InvalidInput { .. })));
        assert_eq!(err.to_string(), "Invalid input: amount must be finite");
    }
}
