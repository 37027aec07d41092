use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use newcular_core::{BoardCache, RulesService};
use newcular_mcts::{CancelToken, Evaluator};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{error, info, warn};

use crate::config::SelfPlayConfig;
use crate::data::GameRecord;
use crate::error::SelfPlayError;
use crate::game::play_game;

/// Finished games of one run, in game order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: Vec<GameRecord>,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    pub fn total_examples(&self) -> usize {
        self.records.iter().map(|r| r.examples.len()).sum()
    }
}

/// RNG for game `index`, derived from the configured base seed
pub fn game_rng(seed: Option<u64>, index: usize) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => ChaCha20Rng::from_entropy(),
    }
}

/// Play `games` independent games on `workers` threads
///
/// All workers share the board cache and the evaluator; each game owns its
/// own search tree. Failed games are logged and counted, never partially
/// recorded.
pub fn run_games<R, E>(
    cache: &BoardCache<R>,
    evaluator: &E,
    config: &SelfPlayConfig,
    games: usize,
    workers: usize,
    cancel: &CancelToken,
) -> RunSummary
where
    R: RulesService,
    E: Evaluator + ?Sized,
{
    let next_game = AtomicUsize::new(0);
    let finished = Mutex::new(Vec::with_capacity(games));
    let failed = AtomicUsize::new(0);
    let cancelled = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..workers.clamp(1, games.max(1)) {
            let (next_game, finished, failed, cancelled) =
                (&next_game, &finished, &failed, &cancelled);

            s.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let index = next_game.fetch_add(1, Ordering::SeqCst);
                if index >= games {
                    break;
                }

                let mut rng = game_rng(config.seed, index);
                match play_game(cache, evaluator, config, &mut rng, Some(cancel)) {
                    Ok(record) => {
                        info!(
                            worker,
                            game = index,
                            plies = record.len(),
                            outcome = ?record.outcome,
                            "game recorded"
                        );
                        finished
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push((index, record));
                    }
                    Err(SelfPlayError::Cancelled { plies }) => {
                        warn!(worker, game = index, plies, "game cancelled");
                        cancelled.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        error!(worker, game = index, error = %err, "game failed");
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    let mut finished = finished.into_inner().unwrap_or_else(|e| e.into_inner());
    finished.sort_by_key(|(index, _)| *index);

    RunSummary {
        records: finished.into_iter().map(|(_, record)| record).collect(),
        failed: failed.into_inner(),
        cancelled: cancelled.into_inner(),
    }
}
