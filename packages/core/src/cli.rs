use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use crate::chains::Chain;
use crate::estimator::Action;

/// On-chain cost estimator CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "onchain-cost-estimator",
    version,
    about = "Estimate the USD cost and latency of on-chain actions"
)]
pub struct Cli {
    /// Result cache TTL in seconds
    #[arg(long, global = true)]
    pub cache_ttl: Option<u64>,

    /// Timeout for each upstream HTTP request, in seconds
    #[arg(long, global = true)]
    pub http_timeout: Option<u64>,

    /// Token the DEX quote is priced against
    #[arg(long, global = true)]
    pub quote_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate one action and print the summary
    Estimate(EstimateArgs),
    /// Serve estimates over HTTP
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
}

#[derive(Debug, clap::Args)]
pub struct EstimateArgs {
    /// Chain name, e.g. ethereum or polygon
    #[arg(long)]
    pub chain: Chain,

    /// Token symbol, e.g. ETH
    #[arg(long)]
    pub token: String,

    /// Action to cost; unknown actions use the default gas profile
    #[arg(long, default_value = "swap")]
    pub action: Action,

    /// Amount of the token
    #[arg(long)]
    pub amount: f64,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Use static values only, no network access
    #[arg(long)]
    pub offline: bool,
}
