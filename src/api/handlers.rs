use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;

use crate::api::dto::*;
use crate::api::state::AppState;
use crate::application::allocation::tracker::{AllocationTracker, Holding};
use crate::application::btc_converter::BtcConverter;
use crate::application::decision::support::analyze_signal;
use crate::application::quant::correlation::CorrelationEngine;
use crate::application::signals::engine;
use crate::domain::decision::DecisionLog;
use crate::domain::errors::AppError;
use crate::domain::signal::TradeCategory;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    if state.router.symbols().is_empty() {
        return Err(AppError::UpstreamUnavailable("no adapters registered".to_string()));
    }
    Ok(Json(serde_json::json!({ "status": "ready" })))
}

pub async fn get_prices(
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<Vec<PriceEntry>>, AppError> {
    let symbols = parse_symbols(&query.symbols);
    if symbols.is_empty() {
        return Err(AppError::validation("symbols query parameter is required"));
    }

    let converter = BtcConverter::new(&state.router);
    let mut out = Vec::new();
    for symbol in symbols {
        let Ok(Some(obs)) = state.router.fetch_price(&symbol, None).await else {
            continue;
        };
        let price_btc = converter.to_btc(1.0, &symbol).await;
        out.push(PriceEntry {
            symbol,
            price_usd: obs.close,
            price_btc,
            change_24h: None,
        });
    }
    Ok(Json(out))
}

pub async fn get_enabled_assets(State(state): State<AppState>) -> Json<EnabledAssetsResponse> {
    let assets = state
        .registry
        .enabled_snapshot()
        .into_iter()
        .map(|cfg| EnabledAsset {
            symbol: cfg.symbol,
            priority: cfg.priority,
            adapters: cfg.preferred_adapters,
            collection_interval: match cfg.cadence {
                crate::domain::asset_config::CollectionCadence::Daily => "daily",
                crate::domain::asset_config::CollectionCadence::Hourly => "hourly",
                crate::domain::asset_config::CollectionCadence::Minute => "minute",
            },
            last_collected: cfg.last_collected,
        })
        .collect();
    Json(EnabledAssetsResponse { assets })
}

pub async fn get_portfolio_value(
    State(state): State<AppState>,
    Query(query): Query<PortfolioValueQuery>,
) -> Result<Json<PortfolioValueResponse>, AppError> {
    let allocations: HashMap<String, f64> = match &query.allocations {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::validation(format!("invalid allocations JSON: {e}")))?,
        None => HashMap::new(),
    };

    let converter = BtcConverter::new(&state.router);
    let (holdings_btc, total_btc) = converter.portfolio_to_btc(&allocations).await;
    let btc_allocation = converter.btc_allocation(&allocations).await;

    Ok(Json(PortfolioValueResponse {
        total_btc,
        holdings_btc,
        btc_allocation,
        timestamp: Utc::now(),
    }))
}

pub async fn get_correlation_btc(
    State(state): State<AppState>,
    Query(query): Query<CorrelationQuery>,
) -> Result<Json<Vec<SymbolCorrelation>>, AppError> {
    let symbols = comma_separated_required(&query.symbols)?;
    let end = Utc::now().date_naive();
    let start = end - chrono::Duration::days(query.lookback_days);

    let engine = CorrelationEngine::new(&state.router);
    let correlations = engine.correlation_to_btc(&symbols, start, end).await;

    let out = symbols
        .into_iter()
        .filter_map(|symbol| {
            correlations.get(&symbol).map(|c| SymbolCorrelation { symbol, correlation_to_btc: *c })
        })
        .collect();
    Ok(Json(out))
}

pub async fn get_correlation_matrix(
    State(state): State<AppState>,
    Query(query): Query<CorrelationQuery>,
) -> Result<Json<CorrelationMatrixResponse>, AppError> {
    let symbols = comma_separated_required(&query.symbols)?;
    let end = Utc::now().date_naive();
    let start = end - chrono::Duration::days(query.lookback_days);

    let engine = CorrelationEngine::new(&state.router);
    let pairwise = engine.correlation_matrix(&symbols, start, end).await;

    let mut matrix: HashMap<String, HashMap<String, f64>> = HashMap::new();
    for ((a, b), corr) in pairwise {
        matrix.entry(a).or_default().insert(b, corr);
    }

    Ok(Json(CorrelationMatrixResponse { matrix, symbols }))
}

pub async fn get_diversification_score(
    State(state): State<AppState>,
    Query(query): Query<DiversificationQuery>,
) -> Result<Json<DiversificationResponse>, AppError> {
    let symbols = comma_separated_required(&query.symbols)?;
    let end = Utc::now().date_naive();
    let start = end - chrono::Duration::days(query.lookback_days);

    let engine = CorrelationEngine::new(&state.router);
    let btc_correlations = engine.correlation_to_btc(&symbols, start, end).await;

    let score = if btc_correlations.is_empty() {
        0.0
    } else {
        1.0 - btc_correlations.values().map(|c| c.abs()).sum::<f64>() / btc_correlations.len() as f64
    };
    let is_diversified = score >= 0.5;

    let mut suggestions = Vec::new();
    if !is_diversified {
        let well_diversified = engine.low_correlation_filter(&btc_correlations, 0.3);
        for symbol in &symbols {
            if !well_diversified.contains(symbol) {
                suggestions.push(format!("{symbol} is highly correlated with BTC; consider reducing its weight"));
            }
        }
    }

    Ok(Json(DiversificationResponse { score, is_diversified, suggestions, symbols }))
}

pub async fn get_rebalancing_plan(
    State(state): State<AppState>,
    Query(query): Query<RebalancingQuery>,
) -> Result<Json<RebalancingPlanResponse>, AppError> {
    let allocations: HashMap<String, f64> = serde_json::from_str(&query.allocations)
        .map_err(|e| AppError::validation(format!("invalid allocations JSON: {e}")))?;

    let converter = BtcConverter::new(&state.router);
    let current = converter.btc_allocation(&allocations).await;
    let target = query.target_btc_pct;

    let mut actions = Vec::new();
    let diff = current - target;
    if diff.abs() > 1e-6 {
        let (_, total_btc) = converter.portfolio_to_btc(&allocations).await;
        let amount = (diff * total_btc).abs();
        actions.push(RebalancingAction {
            symbol: "BTC".to_string(),
            action: if diff > 0.0 { "sell" } else { "buy" },
            amount,
            current_amount: allocations.get("BTC").copied().unwrap_or(0.0),
        });
    }

    Ok(Json(RebalancingPlanResponse { target, current, actions }))
}

fn category_from_query(raw: &str) -> Result<TradeCategory, AppError> {
    raw.parse().map_err(|_| AppError::validation(format!("unknown category: {raw}")))
}

pub async fn generate_signals(
    State(state): State<AppState>,
    Query(query): Query<GenerateSignalsQuery>,
) -> Result<Json<SignalsResponse>, AppError> {
    let category = category_from_query(&query.category)?;
    let symbols = parse_symbols(&query.symbols);
    if symbols.is_empty() {
        return Err(AppError::validation("symbols query parameter is required"));
    }

    let mut signals = Vec::new();
    for symbol in &symbols {
        if let Some(mut signal) = engine::generate(&state.router, symbol, category).await {
            if query.ai_enhanced {
                let analysis = state
                    .ai_client
                    .analyze(symbol, serde_json::json!({ "indicators": &signal.indicators }))
                    .await;
                let mut enhancements = HashMap::new();
                enhancements.insert("ai_confidence".to_string(), serde_json::json!(analysis.confidence));
                enhancements.insert("ai_decision".to_string(), serde_json::json!(analysis.final_decision));
                signal.ai_enhancements = Some(enhancements);
            }
            signals.push(signal);
        }
    }

    Ok(Json(SignalsResponse { count: signals.len(), signals, category: query.category }))
}

pub async fn get_signals_from_files(
    State(state): State<AppState>,
    Query(query): Query<SignalsFromFilesQuery>,
) -> Result<Json<SignalsFromFilesResponse>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let raw_signals = state.signal_loader.load_signals_for_date(date, query.symbol.as_deref()).await;

    let filtered: Vec<serde_json::Value> = match &query.category {
        Some(category) => raw_signals
            .into_iter()
            .filter(|v| v.get("category").and_then(serde_json::Value::as_str) == Some(category.as_str()))
            .collect(),
        None => raw_signals,
    };

    let now = Utc::now();
    let signals = filtered
        .into_iter()
        .map(|raw| {
            if !query.include_lot_size {
                return EnrichedSignal { raw, lot_size: None, entry_plan: None };
            }
            match crate::application::signal_store::loader::enrich_signal(&raw, 10_000.0, 1.0, now) {
                Ok((lot, plan)) => EnrichedSignal {
                    raw,
                    lot_size: Some(LotSizeCalculationDto::from(&lot)),
                    entry_plan: Some(plan),
                },
                Err(_) => EnrichedSignal { raw, lot_size: None, entry_plan: None },
            }
        })
        .collect();

    let summary = state.signal_loader.load_daily_summary(date).await;
    let performance = state.signal_loader.load_performance(date).await;

    Ok(Json(SignalsFromFilesResponse { signals, summary, performance }))
}

async fn recommendation_for(
    state: &AppState,
    symbol: &str,
    category: TradeCategory,
) -> Option<RecommendationDto> {
    let signal = engine::generate(&state.router, symbol, category).await?;
    let log = analyze_signal(&signal, Utc::now());
    Some(RecommendationDto {
        symbol: symbol.to_string(),
        recommendation: log.recommendation,
        risk_level: log.risk_level,
        confidence: log.confidence,
        rationale: log.rationale,
        bias_flags: signal.bias_flags,
    })
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    let category = category_from_query(&query.category)?;
    let symbols = parse_symbols(&query.symbols);
    if symbols.is_empty() {
        return Err(AppError::validation("symbols query parameter is required"));
    }

    let mut recommendations = Vec::new();
    for symbol in &symbols {
        if let Some(rec) = recommendation_for(&state, symbol, category).await {
            recommendations.push(rec);
        }
    }

    Ok(Json(RecommendationsResponse { count: recommendations.len(), recommendations }))
}

pub async fn get_workflow(
    State(state): State<AppState>,
    Query(query): Query<WorkflowQuery>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let category = category_from_query(&query.category)?;
    let signal = engine::generate(&state.router, &query.symbol, category).await;
    let recommendation = match &signal {
        Some(s) => {
            let log = analyze_signal(s, Utc::now());
            Some(RecommendationDto {
                symbol: query.symbol.clone(),
                recommendation: log.recommendation,
                risk_level: log.risk_level,
                confidence: log.confidence,
                rationale: log.rationale,
                bias_flags: s.bias_flags.clone(),
            })
        }
        None => None,
    };

    Ok(Json(WorkflowResponse {
        signal,
        steps: vec!["fetch_history", "compute_indicators", "generate_signal", "assess_bias", "score_decision"],
        recommendation,
    }))
}

pub async fn log_decision(
    State(state): State<AppState>,
    Json(request): Json<LogDecisionRequest>,
) -> Result<Json<LogDecisionResponse>, AppError> {
    let mut log = DecisionLog::new(
        request.symbol,
        request.signal_timestamp,
        request.recommendation,
        request.risk_level,
        request.confidence,
        request.rationale,
    );
    log.decision = request.decision;
    if let Some(price) = request.price {
        log.record_execution(price);
    }

    state.decision_log_store.append(&log).await?;
    Ok(Json(LogDecisionResponse { status: "recorded", decision: log.decision }))
}

pub async fn ai_compare(
    State(state): State<AppState>,
    Query(query): Query<AiCompareQuery>,
) -> Result<Json<AiCompareResponse>, AppError> {
    let category = category_from_query(&query.category)?;
    let symbols = parse_symbols(&query.symbols);
    if symbols.is_empty() {
        return Err(AppError::validation("symbols query parameter is required"));
    }

    let mut baseline_total = 0.0;
    let mut enhanced_total = 0.0;
    let mut sample_size = 0usize;

    for symbol in &symbols {
        let Some(signal) = engine::generate(&state.router, symbol, category).await else {
            continue;
        };
        let analysis = state
            .ai_client
            .analyze(symbol, serde_json::json!({ "indicators": &signal.indicators }))
            .await;
        baseline_total += signal.confidence;
        enhanced_total += analysis.confidence;
        sample_size += 1;
    }

    let (baseline_avg, enhanced_avg) = if sample_size == 0 {
        (0.0, 0.0)
    } else {
        (baseline_total / sample_size as f64, enhanced_total / sample_size as f64)
    };

    Ok(Json(AiCompareResponse {
        category: query.category,
        baseline_avg_confidence: baseline_avg,
        enhanced_avg_confidence: enhanced_avg,
        confidence_delta: enhanced_avg - baseline_avg,
        sample_size,
    }))
}

pub async fn calculate_allocation(
    Json(request): Json<AllocationCalculateRequest>,
) -> Result<Json<AllocationCalculateResponse>, AppError> {
    let tracker = match request.threshold {
        Some(threshold) => AllocationTracker::with_threshold(threshold),
        None => AllocationTracker::new(),
    };

    let holdings: Vec<Holding> = request
        .holdings
        .into_iter()
        .map(|h| Holding { symbol: h.symbol, asset_class: h.asset_class, value: h.value })
        .collect();

    let report = tracker.calculate_allocation(&holdings, request.portfolio_value);
    Ok(Json(report))
}

fn comma_separated_required(raw: &str) -> Result<Vec<String>, AppError> {
    let symbols: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    if symbols.is_empty() {
        return Err(AppError::validation("symbols query parameter is required"));
    }
    Ok(symbols)
}
