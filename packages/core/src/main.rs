use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use onchain_cost_estimator::api::{self, ApiState};
use onchain_cost_estimator::chains::ChainRegistry;
use onchain_cost_estimator::cli::{Cli, Command, EstimateArgs};
use onchain_cost_estimator::config::Config;
use onchain_cost_estimator::error::{AppError, EstimateError};
use onchain_cost_estimator::estimator::{
    CostEstimator, CostEstimatorBuilder, CostSummary, InputPayload,
};
use onchain_cost_estimator::logging::init_logging;
use onchain_cost_estimator::metrics::AppMetrics;
use onchain_cost_estimator::sources::mock::MockSources;
use onchain_cost_estimator::sources::CostSources;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let mut config = Config::from_env()
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });
    apply_overrides(&mut config, &cli);
    tracing::debug!("Running with config: {:?}", config);

    let result = match cli.command {
        Command::Estimate(args) => run_estimate(&config, args).await,
        Command::Serve { listen } => serve(config, listen).await,
    };

    if let Err(err) = result {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ttl) = cli.cache_ttl {
        config.cache_ttl_seconds = ttl;
    }
    if let Some(timeout) = cli.http_timeout {
        config.http_timeout_seconds = timeout;
    }
    if let Some(token) = &cli.quote_token {
        config.dex_quote_token = token.clone();
    }
}

fn estimator_builder(config: &Config, sources: CostSources) -> CostEstimatorBuilder {
    CostEstimator::builder(sources)
        .cache_ttl(config.cache_ttl())
        .cache_capacity(config.cache_capacity)
}

async fn run_estimate(config: &Config, args: EstimateArgs) -> Result<(), AppError> {
    let chains = ChainRegistry::default();
    let metadata = chains.metadata(args.chain);
    let sources = if args.offline {
        MockSources::offline(metadata.block_time_secs).sources()
    } else {
        CostSources::from_config(config, chains)
    };

    let estimator = estimator_builder(config, sources).build();
    let input = InputPayload::new(args.chain, args.token, args.action, args.amount);
    let summary = estimator.estimate(&input).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|err| EstimateError::serialization(err.to_string()))?;
        println!("{}", rendered);
    } else {
        print_summary(&input, &metadata.native_token, &summary);
    }
    Ok(())
}

fn print_summary(input: &InputPayload, native_token: &str, summary: &CostSummary) {
    println!("{} {} {} on {}", input.action, input.amount, input.token, input.chain);
    println!("  gas paid in:   {}", native_token);
    println!("  total cost:    ${:.6}", summary.total_cost_usd);
    println!("  net received:  ${:.6}", summary.net_received_usd);
    println!("  latency:       {}s", summary.predicted_latency_s);
    println!("  efficiency:    {}", summary.cost_efficiency);
    println!("  sources:       {}", summary.data_sources.join(", "));
}

async fn serve(config: Config, listen: Option<SocketAddr>) -> Result<(), AppError> {
    let metrics = Arc::new(AppMetrics::new().map_err(|err| AppError::Server(err.to_string()))?);
    let sources = CostSources::from_config(&config, ChainRegistry::default());
    let estimator = estimator_builder(&config, sources)
        .metrics(metrics.clone())
        .build();

    let app = api::create_router(ApiState { estimator, metrics });

    let addr = listen.unwrap_or(config.listen_addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Server(format!("Failed to bind {}: {}", addr, err)))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Server(err.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
    }
}
