use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use lru::LruCache;
use tracing::{debug, warn};

use crate::board::BoardState;
use crate::error::BoardLookupFailure;
use crate::moves::{format_history, Move};
use crate::rules::RulesService;

type LookupResult = Result<Arc<BoardState>, BoardLookupFailure>;
type InFlight = Arc<OnceLock<LookupResult>>;

/// Hit/miss counters of a [`BoardCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered without a new rules-service query.
    pub hits: u64,
    /// Lookups that queried the rules service.
    pub misses: u64,
    /// Snapshots currently held.
    pub len: usize,
}

/// Memoized move-history → board snapshot lookup in front of a rules service.
///
/// Bounded by least-recently-used eviction. Concurrent lookups of the same
/// history share a single remote query; failures are handed to every waiter
/// but never memoized.
pub struct BoardCache<R: RulesService> {
    rules: R,
    entries: Mutex<LruCache<Vec<Move>, Arc<BoardState>>>,
    in_flight: Mutex<HashMap<Vec<Move>, InFlight>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: RulesService> BoardCache<R> {
    /// Create a cache holding at most `capacity` snapshots (at least 1).
    pub fn new(rules: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            rules,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Board snapshot for `history`, querying the rules service at most once
    /// per history while it stays cached.
    pub fn load(&self, history: &[Move]) -> LookupResult {
        if let Some(state) = self.cached(history) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(state);
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            // A query for this key may have finished since the first check
            if let Some(state) = self.cached(history) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(state);
            }
            Arc::clone(
                in_flight
                    .entry(history.to_vec())
                    .or_insert_with(|| Arc::new(OnceLock::new())),
            )
        };

        let mut queried = false;
        let result = cell
            .get_or_init(|| {
                queried = true;
                self.fetch(history)
            })
            .clone();

        if queried {
            self.misses.fetch_add(1, Ordering::Relaxed);
            if let Ok(state) = &result {
                self.entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .put(history.to_vec(), Arc::clone(state));
            }
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight
                .get(history)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(history);
            }
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, history: &[Move]) -> Option<Arc<BoardState>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(history)
            .cloned()
    }

    fn fetch(&self, history: &[Move]) -> LookupResult {
        debug!(ply = history.len(), "Board cache miss");
        self.rules
            .summary(history)
            .and_then(|summary| summary.into_board_state(history.to_vec()))
            .map(Arc::new)
            .map_err(|e| {
                let failure = BoardLookupFailure {
                    history: format_history(history),
                    reason: e.to_string(),
                };
                warn!(history = %failure.history, reason = %failure.reason, "Board lookup failed");
                failure
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Outcome, Side};
    use crate::scripted::ScriptedRules;

    #[test]
    fn test_repeated_load_hits_cache() {
        let cache = BoardCache::new(ScriptedRules::line(4, Outcome::Draw), 16);

        let first = cache.load(&[]).unwrap();
        let second = cache.load(&[]).unwrap();

        assert_eq!(*first, *second);
        assert_eq!(cache.rules().query_count(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = BoardCache::new(ScriptedRules::line(4, Outcome::Draw), 2);
        let a = vec![ScriptedRules::line_moves(0)[0]];
        let b = vec![ScriptedRules::line_moves(0)[1]];

        cache.load(&[]).unwrap();
        cache.load(&a).unwrap();
        // Touch the root so `a` is the least recently used entry
        cache.load(&[]).unwrap();
        cache.load(&b).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.rules().query_count(), 3);

        cache.load(&[]).unwrap();
        assert_eq!(cache.rules().query_count(), 3);
        cache.load(&a).unwrap();
        assert_eq!(cache.rules().query_count(), 4);
    }

    #[test]
    fn test_failures_are_not_memoized() {
        let mut rules = ScriptedRules::line(2, Outcome::Winner(Side::PlayerOne));
        rules.fail_on(Vec::new());
        let cache = BoardCache::new(rules, 8);

        let err = cache.load(&[]).unwrap_err();
        assert_eq!(err.history, "");
        assert!(cache.load(&[]).is_err());
        assert_eq!(cache.rules().query_count(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = BoardCache::new(ScriptedRules::line(1, Outcome::Draw), 0);
        cache.load(&[]).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
