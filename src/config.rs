use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid LOG_FORMAT: {}. Must be 'pretty' or 'json'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub cache_ttl_seconds: u64,
    pub cache_dir: Option<String>,
    pub signal_store_dir: String,

    pub binance_base_url: String,
    pub coingecko_base_url: String,
    pub coingecko_api_key: String,
    pub coinmarketcap_base_url: String,
    pub coinmarketcap_api_key: String,
    pub yahoofinance_base_url: String,
    pub alphavantage_base_url: String,
    pub alphavantage_api_key: String,
    pub polygon_base_url: String,
    pub polygon_api_key: String,

    pub collector_interval_seconds: u64,
    pub collector_enabled: bool,

    pub btc_numeraire_min_pct: f64,
    pub btc_numeraire_max_pct: f64,

    pub cvar_confidence: f64,
    pub cvar_monte_carlo_iterations: usize,
    pub cvar_seed: u64,

    pub ai_enrichment_enabled: bool,
    pub ai_enrichment_base_url: String,
    pub ai_enrichment_api_key: String,
    pub ai_enrichment_timeout_seconds: u64,

    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://portfolio.db".to_string());
        let cache_ttl_seconds = env::var("CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);
        let cache_dir = env::var("CACHE_DIR").ok();
        let signal_store_dir =
            env::var("SIGNAL_STORE_DIR").unwrap_or_else(|_| "./signals".to_string());

        let binance_base_url = env::var("BINANCE_BASE_URL")
            .unwrap_or_else(|_| "https://api.binance.com".to_string());
        let coingecko_base_url = env::var("COINGECKO_BASE_URL")
            .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string());
        let coingecko_api_key = env::var("COINGECKO_API_KEY").unwrap_or_default();
        let coinmarketcap_base_url = env::var("COINMARKETCAP_BASE_URL")
            .unwrap_or_else(|_| "https://pro-api.coinmarketcap.com".to_string());
        let coinmarketcap_api_key = env::var("COINMARKETCAP_API_KEY").unwrap_or_default();
        let yahoofinance_base_url = env::var("YAHOOFINANCE_BASE_URL")
            .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string());
        let alphavantage_base_url = env::var("ALPHAVANTAGE_BASE_URL")
            .unwrap_or_else(|_| "https://www.alphavantage.co".to_string());
        let alphavantage_api_key = env::var("ALPHAVANTAGE_API_KEY").unwrap_or_default();
        let polygon_base_url =
            env::var("POLYGON_BASE_URL").unwrap_or_else(|_| "https://api.polygon.io".to_string());
        let polygon_api_key = env::var("POLYGON_API_KEY").unwrap_or_default();

        let collector_interval_seconds = env::var("COLLECTOR_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);
        let collector_enabled = env::var("COLLECTOR_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        let btc_numeraire_min_pct = env::var("BTC_NUMERAIRE_MIN_PCT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.50);
        let btc_numeraire_max_pct = env::var("BTC_NUMERAIRE_MAX_PCT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.60);

        let cvar_confidence = env::var("CVAR_CONFIDENCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.95);
        let cvar_monte_carlo_iterations = env::var("CVAR_MONTE_CARLO_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        let cvar_seed = env::var("CVAR_SEED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(42);

        let ai_enrichment_enabled = env::var("AI_ENRICHMENT_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);
        let ai_enrichment_base_url = env::var("AI_ENRICHMENT_BASE_URL").unwrap_or_default();
        let ai_enrichment_api_key = env::var("AI_ENRICHMENT_API_KEY").unwrap_or_default();
        let ai_enrichment_timeout_seconds = env::var("AI_ENRICHMENT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let log_format_str = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let log_format: LogFormat = log_format_str.parse().context("parsing LOG_FORMAT")?;

        Ok(Self {
            bind_addr,
            database_url,
            cache_ttl_seconds,
            cache_dir,
            signal_store_dir,
            binance_base_url,
            coingecko_base_url,
            coingecko_api_key,
            coinmarketcap_base_url,
            coinmarketcap_api_key,
            yahoofinance_base_url,
            alphavantage_base_url,
            alphavantage_api_key,
            polygon_base_url,
            polygon_api_key,
            collector_interval_seconds,
            collector_enabled,
            btc_numeraire_min_pct,
            btc_numeraire_max_pct,
            cvar_confidence,
            cvar_monte_carlo_iterations,
            cvar_seed,
            ai_enrichment_enabled,
            ai_enrichment_base_url,
            ai_enrichment_api_key,
            ai_enrichment_timeout_seconds,
            log_format,
        })
    }
}
