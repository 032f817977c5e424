//! One-reply-per-day latch.
//!
//! Bounded LRU keyed by `(person, author)` holding the last day a reply was
//! sent. Older pairs fall out once capacity is reached; [`ReplyLatch::evict_before`]
//! sweeps stale days explicitly.

use std::num::NonZeroUsize;

use chrono::NaiveDate;
use lru::LruCache;
use tokio::sync::Mutex;

type LatchKey = (String, String);

pub struct ReplyLatch {
    replied: Mutex<LruCache<LatchKey, NaiveDate>>,
}

impl ReplyLatch {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            replied: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Claim the reply for `(person, author, day)`.
    ///
    /// Returns `true` exactly once per key and day; later calls return `false`
    /// until the day changes or the claim is released.
    pub async fn try_latch(&self, person: &str, author: &str, day: NaiveDate) -> bool {
        let mut cache = self.replied.lock().await;
        let key = (person.to_string(), author.to_string());
        match cache.get(&key) {
            Some(last) if *last >= day => false,
            _ => {
                cache.put(key, day);
                true
            }
        }
    }

    /// Undo a claim, e.g. after the reply could not be delivered.
    pub async fn release(&self, person: &str, author: &str, day: NaiveDate) {
        let mut cache = self.replied.lock().await;
        let key = (person.to_string(), author.to_string());
        if cache.peek(&key) == Some(&day) {
            cache.pop(&key);
        }
    }

    pub async fn is_latched(&self, person: &str, author: &str, day: NaiveDate) -> bool {
        let cache = self.replied.lock().await;
        cache
            .peek(&(person.to_string(), author.to_string()))
            .is_some_and(|last| *last >= day)
    }

    /// Drop entries whose day is before `day`; returns how many were removed.
    pub async fn evict_before(&self, day: NaiveDate) -> usize {
        let mut cache = self.replied.lock().await;
        let stale: Vec<LatchKey> = cache
            .iter()
            .filter(|(_, last)| **last < day)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        stale.len()
    }

    pub async fn len(&self) -> usize {
        self.replied.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.replied.lock().await.is_empty()
    }
}

impl std::fmt::Debug for ReplyLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyLatch").finish_non_exhaustive()
    }
}
