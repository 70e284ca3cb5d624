use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionCadence {
    Daily,
    Hourly,
    Minute,
}

impl CollectionCadence {
    pub fn interval(self) -> chrono::Duration {
        match self {
            CollectionCadence::Daily => chrono::Duration::days(1),
            CollectionCadence::Hourly => chrono::Duration::hours(1),
            CollectionCadence::Minute => chrono::Duration::minutes(1),
        }
    }
}

/// Registry entry for an asset the Collector should keep warm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    pub enabled: bool,
    pub preferred_adapters: Vec<String>,
    pub cadence: CollectionCadence,
    pub priority: u8,
    pub last_collected: Option<DateTime<Utc>>,
}

impl AssetConfig {
    pub fn new(symbol: impl Into<String>, priority: u8) -> Self {
        Self {
            symbol: symbol.into(),
            enabled: true,
            preferred_adapters: Vec::new(),
            cadence: CollectionCadence::Daily,
            priority: priority.clamp(1, 3),
            last_collected: None,
        }
    }

    pub fn mark_collected(&mut self, at: DateTime<Utc>) {
        self.last_collected = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped_to_valid_range() {
        let cfg = AssetConfig::new("BTC", 9);
        assert_eq!(cfg.priority, 3);
        let cfg = AssetConfig::new("BTC", 0);
        assert_eq!(cfg.priority, 1);
    }
}
