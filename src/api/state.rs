use std::sync::Arc;

use crate::application::asset_registry::AssetRegistry;
use crate::application::decision::log_store::DecisionLogStore;
use crate::application::router::Router;
use crate::application::signal_store::loader::SignalLoader;
use crate::infrastructure::ai_client::AiClient;

/// Shared handles every HTTP handler reads from; cloned per request (all
/// fields are `Arc`, so cloning is cheap and never duplicates state).
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub registry: Arc<AssetRegistry>,
    pub ai_client: Arc<AiClient>,
    pub decision_log_store: Arc<DecisionLogStore>,
    pub signal_loader: Arc<SignalLoader>,
}
