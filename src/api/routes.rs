use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::api::state::AppState;

/// Wires every endpoint from the external interfaces surface onto one axum
/// Router, sharing a single `AppState` clone per request.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/api/assets/prices", get(handlers::get_prices))
        .route("/api/assets/enabled", get(handlers::get_enabled_assets))
        .route("/api/portfolio/value", get(handlers::get_portfolio_value))
        .route("/api/correlation/btc", get(handlers::get_correlation_btc))
        .route("/api/correlation/matrix", get(handlers::get_correlation_matrix))
        .route("/api/diversification/score", get(handlers::get_diversification_score))
        .route("/api/rebalancing/plan", get(handlers::get_rebalancing_plan))
        .route("/api/signals/generate", get(handlers::generate_signals))
        .route("/api/signals/from-files", get(handlers::get_signals_from_files))
        .route("/api/guidance/recommendations", get(handlers::get_recommendations))
        .route("/api/guidance/workflow", get(handlers::get_workflow))
        .route("/api/guidance/log", post(handlers::log_decision))
        .route("/api/ai/compare", get(handlers::ai_compare))
        .route("/api/v1/allocation/calculate", post(handlers::calculate_allocation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
