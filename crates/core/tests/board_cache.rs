use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use newcular_core::{
    BoardCache, Move, Outcome, RulesError, RulesService, ScriptedRules, Side, Summary,
};

/// Rules service that answers slowly, so concurrent lookups overlap.
struct SlowRules {
    inner: ScriptedRules,
    delay: Duration,
    calls: AtomicUsize,
}

impl RulesService for SlowRules {
    fn summary(&self, history: &[Move]) -> Result<Summary, RulesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.summary(history)
    }
}

#[test]
fn identical_history_is_queried_once() {
    let cache = BoardCache::new(ScriptedRules::line(6, Outcome::Draw), 64);
    let history = vec![
        ScriptedRules::line_moves(0)[1],
        ScriptedRules::line_moves(1)[0],
    ];

    let first = cache.load(&history).unwrap();
    let second = cache.load(&history).unwrap();

    assert_eq!(first.legal_moves(), second.legal_moves());
    assert_eq!(first.representation(), second.representation());
    assert_eq!(first.history(), history.as_slice());
    assert_eq!(cache.rules().query_count(), 1);
}

#[test]
fn concurrent_identical_lookups_are_coalesced() {
    let cache = Arc::new(BoardCache::new(
        SlowRules {
            inner: ScriptedRules::line(3, Outcome::Winner(Side::PlayerOne)),
            delay: Duration::from_millis(50),
            calls: AtomicUsize::new(0),
        },
        64,
    ));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.load(&[]).map(|state| state.legal_moves().len())
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 2);
    }

    assert_eq!(cache.rules().calls.load(Ordering::SeqCst), 1);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
}

#[test]
fn concurrent_distinct_lookups_each_query() {
    let cache = Arc::new(BoardCache::new(ScriptedRules::line(3, Outcome::Draw), 64));

    let handles: Vec<_> = ScriptedRules::line_moves(0)
        .into_iter()
        .map(|mv| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.load(&[mv]).is_ok())
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap());
    }
    assert_eq!(cache.rules().query_count(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn terminal_snapshot_carries_outcome() {
    let cache = BoardCache::new(ScriptedRules::line(1, Outcome::Winner(Side::PlayerTwo)), 8);
    let state = cache.load(&[ScriptedRules::line_moves(0)[0]]).unwrap();

    assert!(state.is_terminal());
    assert!(state.legal_moves().is_empty());
    assert_eq!(state.outcome(), Some(Outcome::Winner(Side::PlayerTwo)));
    assert_eq!(state.side_to_move(), Side::PlayerTwo);
}
