use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::signal_store::lot_sizing::{LotBucket, LotSizeCalculation};
use crate::application::signal_store::loader::EntryPlan;
use crate::domain::allocation::AllocationReport;
use crate::domain::bias::BiasFlag;
use crate::domain::decision::{ExecutionState, Recommendation, RiskLevel};
use crate::domain::signal::TradingSignal;

fn comma_separated(input: &str) -> Vec<String> {
    input.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

pub fn parse_symbols(raw: &Option<String>) -> Vec<String> {
    raw.as_deref().map(comma_separated).unwrap_or_default()
}

// ---- /api/assets/prices ----

#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    pub symbols: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceEntry {
    pub symbol: String,
    pub price_usd: Decimal,
    pub price_btc: Option<f64>,
    pub change_24h: Option<f64>,
}

// ---- /api/assets/enabled ----

#[derive(Debug, Serialize)]
pub struct EnabledAsset {
    pub symbol: String,
    pub priority: u8,
    pub adapters: Vec<String>,
    pub collection_interval: &'static str,
    pub last_collected: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EnabledAssetsResponse {
    pub assets: Vec<EnabledAsset>,
}

// ---- /api/portfolio/value ----

#[derive(Debug, Deserialize)]
pub struct PortfolioValueQuery {
    pub allocations: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioValueResponse {
    pub total_btc: f64,
    pub holdings_btc: HashMap<String, f64>,
    pub btc_allocation: f64,
    pub timestamp: DateTime<Utc>,
}

// ---- /api/correlation/btc & /api/correlation/matrix ----

#[derive(Debug, Deserialize)]
pub struct CorrelationQuery {
    pub symbols: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

fn default_lookback_days() -> i64 {
    90
}

#[derive(Debug, Serialize)]
pub struct SymbolCorrelation {
    pub symbol: String,
    pub correlation_to_btc: f64,
}

#[derive(Debug, Serialize)]
pub struct CorrelationMatrixResponse {
    pub matrix: HashMap<String, HashMap<String, f64>>,
    pub symbols: Vec<String>,
}

// ---- /api/diversification/score ----

#[derive(Debug, Deserialize)]
pub struct DiversificationQuery {
    pub symbols: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

#[derive(Debug, Serialize)]
pub struct DiversificationResponse {
    pub score: f64,
    pub is_diversified: bool,
    pub suggestions: Vec<String>,
    pub symbols: Vec<String>,
}

// ---- /api/rebalancing/plan ----

#[derive(Debug, Deserialize)]
pub struct RebalancingQuery {
    pub allocations: String,
    pub target_btc_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct RebalancingAction {
    pub symbol: String,
    pub action: &'static str,
    pub amount: f64,
    pub current_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct RebalancingPlanResponse {
    pub target: f64,
    pub current: f64,
    pub actions: Vec<RebalancingAction>,
}

// ---- /api/signals/generate ----

#[derive(Debug, Deserialize)]
pub struct GenerateSignalsQuery {
    pub category: String,
    pub symbols: Option<String>,
    #[serde(default)]
    pub ai_enhanced: bool,
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub signals: Vec<TradingSignal>,
    pub count: usize,
    pub category: String,
}

// ---- /api/signals/from-files ----

#[derive(Debug, Deserialize)]
pub struct SignalsFromFilesQuery {
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub symbol: Option<String>,
    #[serde(default)]
    pub include_lot_size: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrichedSignal {
    #[serde(flatten)]
    pub raw: serde_json::Value,
    pub lot_size: Option<LotSizeCalculationDto>,
    pub entry_plan: Option<EntryPlan>,
}

#[derive(Debug, Serialize)]
pub struct LotSizeCalculationDto {
    pub risk_amount_usd: f64,
    pub position_size_usd: f64,
    pub position_size_tokens: Option<f64>,
    pub position_size_units: Option<f64>,
    pub lot_size: Option<f64>,
    pub lot_bucket: Option<&'static str>,
}

impl From<&LotSizeCalculation> for LotSizeCalculationDto {
    fn from(calc: &LotSizeCalculation) -> Self {
        Self {
            risk_amount_usd: calc.risk_amount_usd,
            position_size_usd: calc.position_size_usd,
            position_size_tokens: calc.position_size_tokens,
            position_size_units: calc.position_size_units,
            lot_size: calc.lot_size,
            lot_bucket: calc.lot_bucket.map(|b| match b {
                LotBucket::Standard => "standard",
                LotBucket::Mini => "mini",
                LotBucket::Micro => "micro",
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignalsFromFilesResponse {
    pub signals: Vec<EnrichedSignal>,
    pub summary: Option<serde_json::Value>,
    pub performance: Option<serde_json::Value>,
}

// ---- /api/guidance/recommendations & /api/guidance/workflow ----

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub category: String,
    pub symbols: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationDto {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub bias_flags: Vec<BiasFlag>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RecommendationDto>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowQuery {
    pub symbol: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub signal: Option<TradingSignal>,
    pub steps: Vec<&'static str>,
    pub recommendation: Option<RecommendationDto>,
}

// ---- /api/guidance/log ----

#[derive(Debug, Deserialize)]
pub struct LogDecisionRequest {
    pub symbol: String,
    pub signal_timestamp: DateTime<Utc>,
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Vec<String>,
    pub decision: ExecutionState,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogDecisionResponse {
    pub status: &'static str,
    pub decision: ExecutionState,
}

// ---- /api/ai/compare ----

#[derive(Debug, Deserialize)]
pub struct AiCompareQuery {
    pub category: String,
    pub symbols: Option<String>,
    #[serde(default = "default_compare_days")]
    pub days: i64,
}

fn default_compare_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub struct AiCompareResponse {
    pub category: String,
    pub baseline_avg_confidence: f64,
    pub enhanced_avg_confidence: f64,
    pub confidence_delta: f64,
    pub sample_size: usize,
}

// ---- /api/v1/allocation/calculate ----

#[derive(Debug, Deserialize)]
pub struct AllocationHoldingInput {
    pub symbol: String,
    pub asset_class: String,
    pub value: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AllocationCalculateRequest {
    pub holdings: Vec<AllocationHoldingInput>,
    pub portfolio_value: Decimal,
    pub threshold: Option<f64>,
}

pub type AllocationCalculateResponse = AllocationReport;
