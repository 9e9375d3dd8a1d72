use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Cache of question -> generated SPARQL translations. Entries are evicted by
/// capacity (LRU) and ignored past their TTL. Keys bind the provider and model
/// so switching either never replays a stale translation.
pub struct TranslationCache {
    entries: Mutex<LruCache<String, CachedTranslation>>,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

struct CachedTranslation {
    sparql: String,
    created_at: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl TranslationCache {
    pub fn new(max_size: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Stable cache key over provider, model and the normalized question.
    pub fn key(provider: &str, model: &str, question: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_bytes());
        hasher.update(b"\0");
        hasher.update(model.as_bytes());
        hasher.update(b"\0");
        hasher.update(question.trim().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                let sparql = entry.sparql.clone();
                let mut stats = self.stats.lock();
                stats.hits += 1;
                return Some(sparql);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }

        let mut stats = self.stats.lock();
        stats.misses += 1;
        stats.size = entries.len();
        None
    }

    pub fn put(&self, key: &str, sparql: &str) {
        let mut entries = self.entries.lock();
        entries.put(
            key.to_string(),
            CachedTranslation {
                sparql: sparql.to_string(),
                created_at: Instant::now(),
            },
        );
        self.stats.lock().size = entries.len();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.stats.lock().size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let cache = TranslationCache::new(10, 60);
        let key = TranslationCache::key("openai", "gpt-3.5-turbo", "list all pathways");
        cache.put(&key, "SELECT * WHERE { ?s ?p ?o }");
        assert_eq!(cache.get(&key), Some("SELECT * WHERE { ?s ?p ?o }".to_string()));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_miss_recorded() {
        let cache = TranslationCache::new(10, 60);
        assert_eq!(cache.get("nope"), None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = TranslationCache::new(10, 0);
        cache.put("k", "SELECT 1");
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = TranslationCache::new(2, 60);
        cache.put("a", "1");
        cache.put("b", "2");
        cache.put("c", "3");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c"), Some("3".to_string()));
    }

    #[test]
    fn test_key_binds_model_and_question() {
        let base = TranslationCache::key("openai", "gpt-3.5-turbo", "q");
        assert_ne!(base, TranslationCache::key("openai", "gpt-4o", "q"));
        assert_ne!(base, TranslationCache::key("openai", "gpt-3.5-turbo", "other"));
        // trimming normalizes whitespace-only differences
        assert_eq!(base, TranslationCache::key("openai", "gpt-3.5-turbo", "  q  "));
    }
}
