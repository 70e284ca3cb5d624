use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::asset_config::AssetConfig;

/// In-memory registry of assets the Collector keeps warm. Mutated only by
/// operator-style operations; the Collector reads a consistent snapshot
/// once per cycle.
pub struct AssetRegistry {
    assets: RwLock<HashMap<String, AssetConfig>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            assets: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, config: AssetConfig) {
        self.assets
            .write()
            .expect("registry lock poisoned")
            .insert(config.symbol.clone(), config);
    }

    pub fn set_enabled(&self, symbol: &str, enabled: bool) -> bool {
        let mut assets = self.assets.write().expect("registry lock poisoned");
        match assets.get_mut(symbol) {
            Some(cfg) => {
                cfg.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn mark_collected(&self, symbol: &str, at: chrono::DateTime<chrono::Utc>) {
        let mut assets = self.assets.write().expect("registry lock poisoned");
        if let Some(cfg) = assets.get_mut(symbol) {
            cfg.mark_collected(at);
        }
    }

    /// Enabled assets ordered (priority asc, symbol asc), the order the
    /// Collector processes them in each cycle.
    pub fn enabled_snapshot(&self) -> Vec<AssetConfig> {
        let assets = self.assets.read().expect("registry lock poisoned");
        let mut snapshot: Vec<AssetConfig> = assets.values().filter(|a| a.enabled).cloned().collect();
        snapshot.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.symbol.cmp(&b.symbol)));
        snapshot
    }

    pub fn get(&self, symbol: &str) -> Option<AssetConfig> {
        self.assets.read().expect("registry lock poisoned").get(symbol).cloned()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_snapshot_orders_by_priority_then_symbol() {
        let registry = AssetRegistry::new();
        registry.upsert(AssetConfig::new("ETH", 2));
        registry.upsert(AssetConfig::new("BTC", 1));
        registry.upsert(AssetConfig::new("ADA", 1));

        let snapshot = registry.enabled_snapshot();
        let symbols: Vec<&str> = snapshot.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ADA", "BTC", "ETH"]);
    }

    #[test]
    fn disabled_assets_are_excluded_from_snapshot() {
        let registry = AssetRegistry::new();
        registry.upsert(AssetConfig::new("BTC", 1));
        registry.set_enabled("BTC", false);
        assert!(registry.enabled_snapshot().is_empty());
    }
}
