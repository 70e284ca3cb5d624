use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::domain::observation::PriceObservation;

#[derive(Clone)]
struct Entry {
    observation: PriceObservation,
    inserted_at: Instant,
}

fn cache_key(adapter: &str, symbol: &str, date: NaiveDate) -> String {
    format!("{adapter}:{symbol}:{date}")
}

/// In-memory TTL cache for price observations, keyed by (adapter, symbol, date).
/// The original had an optional file-backed tier (pickle); this process-local
/// cache is a deliberate simplification since the durable Store already
/// covers cross-process persistence (see DESIGN.md).
pub struct DataCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl DataCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, adapter: &str, symbol: &str, date: NaiveDate) -> Option<PriceObservation> {
        let key = cache_key(adapter, symbol, date);
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(&key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.observation.clone())
        } else {
            None
        }
    }

    pub fn put(&self, observation: PriceObservation) {
        let key = cache_key(&observation.adapter, &observation.symbol, observation.date);
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key,
            Entry {
                observation,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops expired entries; call this periodically from the collector loop
    /// rather than on every read, to keep reads lock-cheap.
    pub fn evict_expired(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(date: NaiveDate) -> PriceObservation {
        PriceObservation::new(
            "BTC",
            date,
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(10),
            "binance",
        )
        .unwrap()
    }

    #[test]
    fn returns_cached_value_within_ttl() {
        let cache = DataCache::new(300);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cache.put(sample(date));
        assert!(cache.get("binance", "BTC", date).is_some());
    }

    #[test]
    fn misses_on_unknown_key() {
        let cache = DataCache::new(300);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(cache.get("binance", "ETH", date).is_none());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = DataCache::new(0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cache.put(sample(date));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("binance", "BTC", date).is_none());
        cache.evict_expired();
        assert!(cache.is_empty());
    }
}
