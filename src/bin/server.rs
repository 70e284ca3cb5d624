//! Portfolio analytics server - headless service exposing the HTTP API
//! described in the external interfaces surface, plus a background
//! collector that keeps the price store warm.
//!
//! # Environment Variables
//! See `Config::from_env` for the full list. Key ones:
//! - `BIND_ADDR` - address the HTTP server listens on (default 0.0.0.0:8080)
//! - `COLLECTOR_ENABLED` - whether the background refresh loop runs (default true)
//! - `LOG_FORMAT` - `pretty` or `json` (default pretty)

use std::sync::Arc;

use anyhow::Result;
use fks_portfolio::api;
use fks_portfolio::application::asset_registry::AssetRegistry;
use fks_portfolio::application::router::Router;
use fks_portfolio::application::signal_store::loader::SignalLoader;
use fks_portfolio::config::{Config, LogFormat};
use fks_portfolio::domain::asset_config::AssetConfig;
use fks_portfolio::domain::ports::Adapter;
use fks_portfolio::infrastructure::adapters::{alphavantage, binance, coingecko, coinmarketcap, polygon, yahoofinance};
use fks_portfolio::infrastructure::ai_client::AiClient;
use fks_portfolio::infrastructure::cache::DataCache;
use fks_portfolio::infrastructure::collector::Collector;
use fks_portfolio::infrastructure::store::Store;
use fks_portfolio::application::decision::log_store::DecisionLogStore;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

const DEFAULT_ASSETS: [&str; 5] = ["BTC", "ETH", "SOL", "AAPL", "SPY"];

fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    match format {
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
            tracing_subscriber::registry().with(env_filter).with(layer).init();
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().json();
            tracing_subscriber::registry().with(env_filter).with(layer).init();
        }
    }
}

fn build_adapters(config: &Config) -> Vec<Arc<dyn Adapter>> {
    let mut adapters: Vec<Arc<dyn Adapter>> = vec![
        Arc::new(binance::BinanceAdapter::new(config.binance_base_url.clone())),
        Arc::new(yahoofinance::YahooFinanceAdapter::new(config.yahoofinance_base_url.clone())),
        Arc::new(coingecko::CoinGeckoAdapter::new(
            config.coingecko_base_url.clone(),
            (!config.coingecko_api_key.is_empty()).then(|| config.coingecko_api_key.clone()),
        )),
    ];

    if !config.coinmarketcap_api_key.is_empty() {
        adapters.push(Arc::new(coinmarketcap::CoinMarketCapAdapter::new(
            config.coinmarketcap_base_url.clone(),
            config.coinmarketcap_api_key.clone(),
        )));
    }
    if !config.alphavantage_api_key.is_empty() {
        adapters.push(Arc::new(alphavantage::AlphaVantageAdapter::new(
            config.alphavantage_base_url.clone(),
            config.alphavantage_api_key.clone(),
        )));
    }
    if !config.polygon_api_key.is_empty() {
        adapters.push(Arc::new(polygon::PolygonAdapter::new(
            config.polygon_base_url.clone(),
            config.polygon_api_key.clone(),
        )));
    }

    adapters
}

fn seed_registry(registry: &AssetRegistry) {
    for (idx, symbol) in DEFAULT_ASSETS.iter().enumerate() {
        let priority = (idx / 2) as u8 + 1;
        registry.upsert(AssetConfig::new(*symbol, priority));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_logging(config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "portfolio server starting");

    let store = Arc::new(Store::new(&config.database_url).await?);
    let cache = Arc::new(DataCache::new(config.cache_ttl_seconds));
    let adapters = build_adapters(&config);
    info!(adapter_count = adapters.len(), "adapters registered");

    let router = Arc::new(Router::new(adapters, cache, store));

    let registry = Arc::new(AssetRegistry::new());
    seed_registry(&registry);

    let ai_client = Arc::new(AiClient::new(
        config.ai_enrichment_base_url.clone(),
        config.ai_enrichment_enabled,
        config.ai_enrichment_timeout_seconds,
    ));

    let decision_log_store = Arc::new(DecisionLogStore::new("data/logs"));
    let signal_loader = Arc::new(SignalLoader::new(config.signal_store_dir.clone()));

    let state = api::AppState {
        router: router.clone(),
        registry: registry.clone(),
        ai_client,
        decision_log_store,
        signal_loader,
    };

    let collector_handle = if config.collector_enabled {
        let collector = Collector::new(router.clone(), registry.clone(), config.collector_interval_seconds);
        info!(interval_seconds = config.collector_interval_seconds, "background collector starting");
        Some(collector.start())
    } else {
        info!("background collector disabled");
        None
    };

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "http server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    if let Some(handle) = collector_handle {
        handle.abort();
    }

    Ok(())
}
