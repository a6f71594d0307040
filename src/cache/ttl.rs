use chrono::{DateTime, Duration, Utc};

/// A single cached value together with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry<K, V> {
    key: K,
    value: V,
    inserted_at: DateTime<Utc>,
}

/// A small bounded cache with a fixed time-to-live.
///
/// Entries older than the TTL are treated as absent. When the capacity is
/// exceeded the least-recently-inserted entry is evicted. Sized for a
/// handful of entries (measurement windows a caller flips between), so
/// lookups are a linear scan.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: Vec<CacheEntry<K, V>>,
}

impl<K: PartialEq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Vec::new(),
        }
    }

    /// Look up a key, treating entries older than the TTL as absent.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Utc::now();
        self.entries
            .iter()
            .find(|entry| entry.key == *key && now - entry.inserted_at <= self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Insert a value, replacing any entry with the same key and evicting
    /// the oldest entry once the capacity is exceeded.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.retain(|entry| entry.key != key);
        self.entries.push(CacheEntry {
            key,
            value,
            inserted_at: Utc::now(),
        });
        while self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
    }

    /// Drop every entry, expired or not.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backdate every entry, test hook for expiry behavior.
    #[cfg(test)]
    fn age_all(&mut self, by: Duration) {
        for entry in &mut self.entries {
            entry.inserted_at -= by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let mut cache: TtlCache<u32, String> = TtlCache::new(4, Duration::hours(1));
        cache.insert(1, "a".to_string());
        assert_eq!(cache.get(&1), Some("a".to_string()));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn expired_entries_are_absent() {
        let mut cache: TtlCache<u32, u32> = TtlCache::new(4, Duration::hours(1));
        cache.insert(1, 10);
        cache.age_all(Duration::minutes(61));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut cache: TtlCache<u32, u32> = TtlCache::new(2, Duration::hours(1));
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(3, 30);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(20));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn reinsert_replaces_existing_key() {
        let mut cache: TtlCache<u32, u32> = TtlCache::new(2, Duration::hours(1));
        cache.insert(1, 10);
        cache.insert(1, 11);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), Some(11));
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache: TtlCache<u32, u32> = TtlCache::new(4, Duration::hours(1));
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
