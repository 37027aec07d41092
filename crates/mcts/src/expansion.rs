use newcular_core::{format_history, BoardCache, Move, RulesService};
use tracing::trace;

use crate::error::{MctsError, Result};
use crate::evaluation::{evaluate_position, legal_action_indices, legal_priors, Evaluator};
use crate::tree::{BranchFailure, Edge, MctsNode, MctsTree, NodeId};

/// Materialize and evaluate the position reached by `history`
///
/// Terminal positions get their fixed outcome value and no evaluator call.
/// Other positions are evaluated once and receive one edge per legal move,
/// with priors masked and renormalized over the legal moves.
pub fn build_node<R, E>(
    cache: &BoardCache<R>,
    evaluator: &E,
    history: &[Move],
    prior: f32,
) -> Result<MctsNode>
where
    R: RulesService,
    E: Evaluator + ?Sized,
{
    let state = cache.load(history)?;

    if let Some(outcome) = state.outcome() {
        let value = outcome.value_for(state.side_to_move());
        trace!(ply = state.ply(), value, "terminal node");
        return Ok(MctsNode::new_terminal(state, prior, value));
    }

    if state.legal_moves().is_empty() {
        return Err(MctsError::DegenerateMask {
            history: format_history(history),
        });
    }

    let evaluation = evaluate_position(&state, evaluator)?;
    let priors = legal_priors(&state, &evaluation.policy);

    let edges = state
        .legal_moves()
        .iter()
        .zip(legal_action_indices(&state))
        .zip(priors)
        .map(|((&mv, action), p)| Edge::new(mv, action, p))
        .collect();

    Ok(MctsNode::new_interior(state, prior, evaluation.value, edges))
}

/// Create the child behind `edge` of `parent` and attach it to the tree
pub fn expand_edge<R, E>(
    tree: &mut MctsTree,
    cache: &BoardCache<R>,
    evaluator: &E,
    parent: NodeId,
    edge: usize,
) -> Result<NodeId>
where
    R: RulesService,
    E: Evaluator + ?Sized,
{
    let node = &tree.nodes[parent];
    let target = &node.edges[edge];
    let history = node.state.child_history(target.mv);
    let child = build_node(cache, evaluator, &history, target.prior)?;

    Ok(tree.attach_child(parent, edge, child))
}

/// Classify an expansion error as a failure local to one branch
///
/// Returns `None` for errors that must abort the whole search.
pub fn branch_failure(err: &MctsError) -> Option<BranchFailure> {
    match err {
        MctsError::BoardLookup(_) => Some(BranchFailure::BoardLookup),
        MctsError::Evaluator(_) => Some(BranchFailure::Evaluator),
        MctsError::DegenerateMask { .. } => Some(BranchFailure::DegenerateMask),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::UniformEvaluator;
    use approx::assert_relative_eq;
    use newcular_core::{Outcome, ScriptedRules, Side};

    #[test]
    fn test_build_root_node() {
        let cache = BoardCache::new(ScriptedRules::line(3, Outcome::Draw), 16);
        let node = build_node(&cache, &UniformEvaluator, &[], 1.0).unwrap();

        assert!(!node.is_terminal());
        assert_eq!(node.edges.len(), 2);
        for edge in &node.edges {
            assert_relative_eq!(edge.prior, 0.5);
            assert_eq!(edge.visit_count, 0);
            assert!(edge.child.is_none());
        }
    }

    #[test]
    fn test_terminal_value_is_for_side_to_move() {
        let cache = BoardCache::new(
            ScriptedRules::line(1, Outcome::Winner(Side::PlayerOne)),
            16,
        );
        let history = [ScriptedRules::line_moves(0)[1]];
        let node = build_node(&cache, &UniformEvaluator, &history, 0.5).unwrap();

        // PlayerTwo is to move after the winning ply
        assert_eq!(node.terminal_value, Some(-1.0));
        assert!(node.edges.is_empty());
        assert_relative_eq!(node.prior_probability, 0.5);
    }

    #[test]
    fn test_expand_edge_attaches_child() {
        let cache = BoardCache::new(ScriptedRules::line(3, Outcome::Draw), 16);
        let mut tree = MctsTree::new();
        tree.initialize_root(build_node(&cache, &UniformEvaluator, &[], 1.0).unwrap());

        let child = expand_edge(&mut tree, &cache, &UniformEvaluator, 0, 1).unwrap();

        assert_eq!(tree.nodes[0].edges[1].child, Some(child));
        assert_eq!(
            tree.nodes[child].state.history(),
            &[ScriptedRules::line_moves(0)[1]]
        );
    }

    #[test]
    fn test_empty_legal_moves_is_degenerate() {
        let mut rules = ScriptedRules::new();
        rules.insert(Vec::new(), ScriptedRules::position(&[], None, [[[0; 7]; 9]; 7]));
        let cache = BoardCache::new(rules, 4);

        let err = build_node(&cache, &UniformEvaluator, &[], 1.0).unwrap_err();
        assert!(matches!(err, MctsError::DegenerateMask { .. }));
        assert_eq!(branch_failure(&err), Some(BranchFailure::DegenerateMask));
    }

    #[test]
    fn test_lookup_failure_is_branch_local() {
        let cache = BoardCache::new(ScriptedRules::new(), 4);
        let err = build_node(&cache, &UniformEvaluator, &[], 1.0).unwrap_err();

        assert_eq!(branch_failure(&err), Some(BranchFailure::BoardLookup));
        assert_eq!(branch_failure(&MctsError::TerminalPosition), None);
    }
}
