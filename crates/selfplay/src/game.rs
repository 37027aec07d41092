use newcular_core::{BoardCache, Outcome, RulesService};
use newcular_mcts::{CancelToken, Evaluator, Mcts, SearchContext};
use rand::Rng;
use tracing::{debug, info};

use crate::config::SelfPlayConfig;
use crate::data::GameRecord;
use crate::error::{Result, SelfPlayError};
use crate::recorder::ExampleRecorder;

/// Play a single self-play game
///
/// Every ply runs a fresh search from the current position, records the
/// position and its visit-count policy, then plays the chosen move. Once the
/// game ends all examples receive their value targets. On error no examples
/// are returned.
///
/// # Arguments
/// * `cache` - Board snapshots, shared with any concurrent games
/// * `evaluator` - Policy/value evaluator for leaf positions
/// * `config` - Self-play configuration
/// * `rng` - Source of Dirichlet noise and move sampling
/// * `cancel` - Stops the game between simulations or plies
pub fn play_game<R, E, G>(
    cache: &BoardCache<R>,
    evaluator: &E,
    config: &SelfPlayConfig,
    rng: &mut G,
    cancel: Option<&CancelToken>,
) -> Result<GameRecord>
where
    R: RulesService,
    E: Evaluator + ?Sized,
    G: Rng + ?Sized,
{
    let mut ctx = SearchContext::new(cache, evaluator, &config.mcts);
    if let Some(cancel) = cancel {
        ctx = ctx.with_cancel(cancel);
    }

    let mut mcts = Mcts::new();
    let mut recorder = ExampleRecorder::new();
    let mut history = Vec::new();
    let mut adjudicated = false;

    let outcome = loop {
        let ply = history.len();
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SelfPlayError::Cancelled { plies: ply });
        }

        let position = cache.load(&history)?;
        if let Some(outcome) = position.outcome() {
            break outcome;
        }
        if config.max_plies.is_some_and(|max| ply >= max) {
            debug!(ply, "ply cap reached, adjudicating draw");
            adjudicated = true;
            break Outcome::Draw;
        }

        // Run MCTS search
        let result = mcts
            .search(&history, &ctx, rng)
            .map_err(|source| SelfPlayError::Search { ply, source })?;
        if result.cancelled {
            return Err(SelfPlayError::Cancelled { plies: ply });
        }

        debug!(
            ply,
            mv = %result.best_move,
            simulations = result.num_simulations_run,
            root_value = result.root_value,
            excluded = result.excluded_moves.len(),
            "move chosen"
        );

        // Record state and policy, then apply the move
        recorder.record(&position, result.policy_distribution);
        history.push(result.best_move);

        // The next search starts from a fresh tree
        mcts.reset();
    };

    info!(
        plies = history.len(),
        outcome = ?outcome,
        adjudicated,
        "game finished"
    );

    Ok(GameRecord {
        moves: history,
        outcome,
        adjudicated,
        examples: recorder.finalize(outcome),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use newcular_core::{ScriptedRules, Side};
    use newcular_mcts::{MctsConfig, UniformEvaluator};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn config() -> SelfPlayConfig {
        SelfPlayConfig::default().with_mcts(MctsConfig::default().with_simulations(8))
    }

    #[test]
    fn test_game_follows_the_line() {
        let cache = BoardCache::new(ScriptedRules::line(4, Outcome::Winner(Side::PlayerOne)), 256);
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let record = play_game(&cache, &UniformEvaluator, &config(), &mut rng, None).unwrap();

        assert_eq!(record.len(), 4);
        assert!(!record.adjudicated);
        for (ply, mv) in record.moves.iter().enumerate() {
            assert!(ScriptedRules::line_moves(ply).contains(mv));
        }
    }

    #[test]
    fn test_ply_cap_adjudicates_draw() {
        let cache = BoardCache::new(ScriptedRules::line(20, Outcome::Winner(Side::PlayerTwo)), 512);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let config = config().with_max_plies(Some(3));

        let record = play_game(&cache, &UniformEvaluator, &config, &mut rng, None).unwrap();

        assert_eq!(record.len(), 3);
        assert!(record.adjudicated);
        assert_eq!(record.outcome, Outcome::Draw);
        assert!(record.examples.iter().all(|e| e.value == 0.0));
    }

    #[test]
    fn test_cancelled_game_emits_nothing() {
        let cache = BoardCache::new(ScriptedRules::line(4, Outcome::Draw), 64);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = play_game(&cache, &UniformEvaluator, &config(), &mut rng, Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, SelfPlayError::Cancelled { plies: 0 }));
    }

    #[test]
    fn test_root_lookup_failure_aborts_game() {
        let cache = BoardCache::new(ScriptedRules::new(), 4);
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let err = play_game(&cache, &UniformEvaluator, &config(), &mut rng, None).unwrap_err();
        assert!(matches!(err, SelfPlayError::BoardLookup(_)));
    }
}
