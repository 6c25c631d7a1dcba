//! Enhancement session: result cache plus duplicate-request debounce.
//!
//! Owned by `AppState` behind a mutex and passed explicitly to the enhancement flow.
//! Every time-dependent method has an `_at` variant taking the current instant.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::enhancement::EnhancementError;

#[derive(Debug, Clone)]
struct CacheEntry {
    output: String,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LastRequest {
    input: String,
    at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct EnhancementSession {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    debounce: Duration,
    last_request: Option<LastRequest>,
}

impl EnhancementSession {
    pub fn new(capacity: usize, ttl: Duration, debounce: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            ttl,
            debounce,
            last_request: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&mut self, input: &str) -> Option<String> {
        self.get_at(input, Utc::now())
    }

    /// Cached output for `input`. Expired entries are removed on lookup.
    pub fn get_at(&mut self, input: &str, now: DateTime<Utc>) -> Option<String> {
        let entry = self.entries.get(input)?;
        if now - entry.stored_at > self.ttl {
            self.entries.remove(input);
            return None;
        }
        Some(entry.output.clone())
    }

    pub fn put(&mut self, input: &str, output: &str) {
        self.put_at(input, output, Utc::now());
    }

    /// Stores `output`; when over capacity the oldest entry is evicted.
    pub fn put_at(&mut self, input: &str, output: &str, now: DateTime<Utc>) {
        self.entries.insert(
            input.to_string(),
            CacheEntry {
                output: output.to_string(),
                stored_at: now,
            },
        );

        if self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                debug!("Evicting oldest cached enhancement");
                self.entries.remove(&key);
            }
        }
    }

    pub fn check_debounce(&mut self, input: &str) -> Result<(), EnhancementError> {
        self.check_debounce_at(input, Utc::now())
    }

    /// Rejects `input` if it repeats the previous request within the debounce window;
    /// otherwise records it as the latest request.
    pub fn check_debounce_at(
        &mut self,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EnhancementError> {
        if let Some(last) = &self.last_request {
            if last.input == input && now - last.at < self.debounce {
                return Err(EnhancementError::Duplicate);
            }
        }
        self.last_request = Some(LastRequest {
            input: input.to_string(),
            at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EnhancementSession {
        EnhancementSession::new(2, Duration::seconds(60), Duration::milliseconds(2000))
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut s = session();
        let t0 = Utc::now();
        s.put_at("in", "out", t0);
        assert_eq!(s.get_at("in", t0 + Duration::seconds(59)), Some("out".to_string()));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let mut s = session();
        let t0 = Utc::now();
        s.put_at("in", "out", t0);
        assert_eq!(s.get_at("in", t0 + Duration::seconds(61)), None);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_oldest_entry_is_evicted_at_capacity() {
        let mut s = session();
        let t0 = Utc::now();
        s.put_at("a", "1", t0);
        s.put_at("b", "2", t0 + Duration::seconds(1));
        s.put_at("c", "3", t0 + Duration::seconds(2));
        assert_eq!(s.len(), 2);
        assert_eq!(s.get_at("a", t0 + Duration::seconds(3)), None);
        assert_eq!(s.get_at("c", t0 + Duration::seconds(3)), Some("3".to_string()));
    }

    #[test]
    fn test_duplicate_within_window_is_rejected() {
        let mut s = session();
        let t0 = Utc::now();
        assert!(s.check_debounce_at("same", t0).is_ok());
        assert!(matches!(
            s.check_debounce_at("same", t0 + Duration::milliseconds(1999)),
            Err(EnhancementError::Duplicate)
        ));
    }

    #[test]
    fn test_debounce_allows_other_input_and_later_repeat() {
        let mut s = session();
        let t0 = Utc::now();
        assert!(s.check_debounce_at("one", t0).is_ok());
        assert!(s.check_debounce_at("two", t0 + Duration::milliseconds(10)).is_ok());
        assert!(s
            .check_debounce_at("two", t0 + Duration::milliseconds(2010))
            .is_ok());
    }
}
