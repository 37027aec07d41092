use newcular_core::{format_history, BoardCache, Move, RulesService, ACTION_SPACE};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::backup::backup;
use crate::cancel::CancelToken;
use crate::config::MctsConfig;
use crate::dirichlet::add_dirichlet_noise_to_root;
use crate::error::{MctsError, Result};
use crate::evaluation::Evaluator;
use crate::expansion::{branch_failure, build_node, expand_edge};
use crate::search_result::SearchResult;
use crate::selection::{descend, Descent, PathStep};
use crate::tree::{BranchFailure, MctsTree, NodeId};

/// Collaborators shared by every search of a game
pub struct SearchContext<'a, R: RulesService, E: Evaluator + ?Sized> {
    pub cache: &'a BoardCache<R>,
    pub evaluator: &'a E,
    pub config: &'a MctsConfig,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a, R: RulesService, E: Evaluator + ?Sized> SearchContext<'a, R, E> {
    pub fn new(cache: &'a BoardCache<R>, evaluator: &'a E, config: &'a MctsConfig) -> Self {
        Self {
            cache,
            evaluator,
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}

/// Outcome of a single simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Simulation {
    Completed,
    Aborted,
    Blocked,
}

/// Monte Carlo Tree Search with PUCT selection
pub struct Mcts {
    tree: MctsTree,
}

impl Mcts {
    /// Create a new MCTS instance
    pub fn new() -> Self {
        Self {
            tree: MctsTree::new(),
        }
    }

    /// Run MCTS search from the position reached by `history`
    ///
    /// The tree is rebuilt from scratch on every call. Failures while
    /// expanding a non-root branch exclude that branch and abort only the
    /// current simulation; failures at the root are returned.
    pub fn search<R, E, G>(
        &mut self,
        history: &[Move],
        ctx: &SearchContext<'_, R, E>,
        rng: &mut G,
    ) -> Result<SearchResult>
    where
        R: RulesService,
        E: Evaluator + ?Sized,
        G: Rng + ?Sized,
    {
        let config = ctx.config;
        config.validate()?;

        // 1. Initialize root node
        let root_id = self.initialize_root(history, ctx)?;

        // 2. Add Dirichlet noise if configured (for self-play)
        if config.add_dirichlet_noise {
            add_dirichlet_noise_to_root(&mut self.tree, root_id, config, rng)?;
        }

        // 3. Run simulations
        let mut completed = 0u32;
        let mut cancelled = false;
        for sim in 0..config.num_simulations {
            if ctx.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.simulate(root_id, ctx)? {
                Simulation::Completed => completed += 1,
                Simulation::Aborted => trace!(sim, "simulation aborted"),
                Simulation::Blocked => {
                    debug!(sim, "every root move excluded, stopping search");
                    break;
                }
            }
        }

        // 4. Extract results
        let result = self.create_search_result(root_id, config, completed, cancelled, rng)?;
        debug!(
            ply = history.len(),
            simulations = completed,
            tree_size = self.tree.size(),
            best_move = %result.best_move,
            root_value = result.root_value,
            "search finished"
        );
        Ok(result)
    }

    /// Initialize the tree with root node
    fn initialize_root<R, E>(
        &mut self,
        history: &[Move],
        ctx: &SearchContext<'_, R, E>,
    ) -> Result<NodeId>
    where
        R: RulesService,
        E: Evaluator + ?Sized,
    {
        let root = build_node(ctx.cache, ctx.evaluator, history, 1.0)?;
        if root.is_terminal() {
            return Err(MctsError::TerminalPosition);
        }
        Ok(self.tree.initialize_root(root))
    }

    /// One selection, expansion, evaluation and backup pass
    fn simulate<R, E>(
        &mut self,
        root_id: NodeId,
        ctx: &SearchContext<'_, R, E>,
    ) -> Result<Simulation>
    where
        R: RulesService,
        E: Evaluator + ?Sized,
    {
        let path = match descend(&self.tree, root_id, ctx.config.c_puct) {
            Descent::Blocked => return Ok(Simulation::Blocked),
            Descent::Leaf { path, node } => {
                let value = self.tree.nodes[node].value;
                backup(&mut self.tree, &path, value);
                return Ok(Simulation::Completed);
            }
            Descent::Unexpanded { path } => path,
        };

        let Some(&step) = path.last() else {
            return Ok(Simulation::Blocked);
        };

        match expand_edge(&mut self.tree, ctx.cache, ctx.evaluator, step.node, step.edge) {
            Ok(child) => {
                let value = self.tree.nodes[child].value;
                backup(&mut self.tree, &path, value);
                Ok(Simulation::Completed)
            }
            Err(err) => {
                let Some(failure) = branch_failure(&err) else {
                    return Err(err);
                };
                warn!(
                    depth = path.len(),
                    mv = %self.tree.nodes[step.node].edges[step.edge].mv,
                    error = %err,
                    "excluding branch from search"
                );
                self.exclude_branch(&path, failure);
                Ok(Simulation::Aborted)
            }
        }
    }

    /// Exclude the last edge of `path`, then every edge leading into a node
    /// that no longer has a live edge
    fn exclude_branch(&mut self, path: &[PathStep], failure: BranchFailure) {
        for (depth, step) in path.iter().enumerate().rev() {
            let node = &mut self.tree.nodes[step.node];
            node.edges[step.edge].excluded = Some(failure);
            if node.edges.iter().any(|e| !e.is_excluded()) {
                break;
            }
            if depth > 0 {
                debug!(depth, "every move excluded, excluding the edge into this node");
            }
        }
    }

    /// Create search result from root edge statistics
    fn create_search_result<G: Rng + ?Sized>(
        &self,
        root_id: NodeId,
        config: &MctsConfig,
        completed: u32,
        cancelled: bool,
        rng: &mut G,
    ) -> Result<SearchResult> {
        let root = &self.tree.nodes[root_id];

        let live: Vec<_> = root.edges.iter().filter(|e| !e.is_excluded()).collect();
        if live.is_empty() {
            return Err(unplayable(root_id, &self.tree));
        }

        // Normalized visit counts, or priors when nothing was visited
        let total_visits: u32 = live.iter().map(|e| e.visit_count).sum();
        let weights: Vec<(Move, usize, f32)> = if total_visits > 0 {
            live.iter()
                .map(|e| (e.mv, e.action, e.visit_count as f32))
                .collect()
        } else {
            live.iter().map(|e| (e.mv, e.action, e.prior)).collect()
        };

        let mut policy_distribution = vec![0.0; ACTION_SPACE];
        let total: f32 = weights.iter().map(|(_, _, w)| w).sum();
        for &(_, action, w) in &weights {
            policy_distribution[action] = if total > 0.0 {
                w / total
            } else {
                1.0 / weights.len() as f32
            };
        }

        let candidates: Vec<(Move, f32)> = weights.iter().map(|&(mv, _, w)| (mv, w)).collect();
        let temperature = config.temperature_at(root.state.ply());
        let best_move = Self::select_move(&candidates, temperature, rng)
            .ok_or_else(|| unplayable(root_id, &self.tree))?;

        Ok(SearchResult {
            best_move,
            policy_distribution,
            root_value: root.q_value(),
            num_simulations_run: completed,
            root_visit_counts: root.edges.iter().map(|e| (e.mv, e.visit_count)).collect(),
            excluded_moves: root
                .edges
                .iter()
                .filter(|e| e.is_excluded())
                .map(|e| e.mv)
                .collect(),
            cancelled,
        })
    }

    /// Select move based on temperature
    ///
    /// - temperature < 0.01: argmax, earliest move on ties
    /// - temperature = 1: proportional to weight
    /// - temperature > 1: more exploration (weight^(1/t))
    fn select_move<G: Rng + ?Sized>(
        candidates: &[(Move, f32)],
        temperature: f32,
        rng: &mut G,
    ) -> Option<Move> {
        let argmax = || {
            candidates
                .iter()
                .fold(None, |best: Option<(Move, f32)>, &(mv, w)| match best {
                    Some((_, bw)) if w <= bw => best,
                    _ => Some((mv, w)),
                })
                .map(|(mv, _)| mv)
        };

        if temperature < 0.01 {
            return argmax();
        }

        let inv_temp = 1.0f64 / temperature as f64;
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&(_, w)| if w <= 0.0 { 0.0 } else { (w as f64).powf(inv_temp) })
            .collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => Some(candidates[dist.sample(rng)].0),
            Err(_) => argmax(),
        }
    }

    /// Read-only view of the current search tree
    pub fn tree(&self) -> &MctsTree {
        &self.tree
    }

    /// Reset the tree (clear all nodes)
    pub fn reset(&mut self) {
        self.tree.clear();
    }

    /// Get the number of nodes in the tree
    pub fn tree_size(&self) -> usize {
        self.tree.size()
    }
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new()
    }
}

fn unplayable(root_id: NodeId, tree: &MctsTree) -> MctsError {
    let root = &tree.nodes[root_id];
    let count = |failure| {
        root.edges
            .iter()
            .filter(|e| e.excluded == Some(failure))
            .count()
    };

    MctsError::UnplayablePosition {
        history: format_history(root.state.history()),
        edges: root.edges.len(),
        lookup_failures: count(BranchFailure::BoardLookup),
        evaluator_failures: count(BranchFailure::Evaluator),
        degenerate: count(BranchFailure::DegenerateMask),
    }
}
