// Library root. The binary in `src/main.rs` and the integration tests in
// `tests/` both build on these modules.

pub mod api;
pub mod cache;
pub mod chains;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod sources;

// Binary plumbing, public so integration tests can reach it.
pub mod cli;
pub mod config;
pub mod logging;
