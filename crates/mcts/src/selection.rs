use crate::tree::{MctsNode, MctsTree, NodeId};

/// One traversed edge of a simulation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub node: NodeId,
    pub edge: usize,
}

/// Where a descent from the root stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descent {
    /// Reached an existing node that cannot be descended further: terminal,
    /// or every outgoing edge has been excluded
    Leaf { path: Vec<PathStep>, node: NodeId },

    /// The last step selected an edge whose child has not been created yet
    Unexpanded { path: Vec<PathStep> },

    /// The root has no selectable edge
    Blocked,
}

/// Walk from `root_id` choosing the max-PUCT edge at every node
///
/// The walk ends at the first edge without a child (to be expanded by the
/// caller) or at a node with nothing left to select.
pub fn descend(tree: &MctsTree, root_id: NodeId, c_puct: f32) -> Descent {
    let mut path = Vec::new();
    let mut current_id = root_id;

    loop {
        let node = &tree.nodes[current_id];

        let edge = if node.is_terminal() {
            None
        } else {
            select_edge(node, c_puct)
        };

        let Some(edge) = edge else {
            if path.is_empty() && !node.is_terminal() {
                return Descent::Blocked;
            }
            return Descent::Leaf {
                path,
                node: current_id,
            };
        };

        path.push(PathStep {
            node: current_id,
            edge,
        });

        match node.edges[edge].child {
            Some(child) => current_id = child,
            None => return Descent::Unexpanded { path },
        }
    }
}

/// Index of the edge with the highest PUCT score
///
/// Excluded edges are skipped. Ties go to the earliest edge so selection is
/// stable for a fixed edge order.
pub fn select_edge(node: &MctsNode, c_puct: f32) -> Option<usize> {
    let sqrt_total = (node.total_visits() as f32).sqrt();

    node.edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| !edge.is_excluded())
        .map(|(i, edge)| {
            (
                i,
                puct_score(edge.q_value(), edge.prior, edge.visit_count, sqrt_total, c_puct),
            )
        })
        .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// Calculate PUCT score for an edge
///
/// PUCT(s, a) = Q(s, a) + c_puct * P(s, a) * sqrt(N(s)) / (1 + N(s, a))
///
/// Where:
/// - Q(s, a) = W(s, a) / N(s, a) is the average action value
/// - P(s, a) is the prior probability from the evaluator
/// - N(s) is the sum of visit counts over sibling edges
/// - N(s, a) is the edge visit count
pub fn puct_score(q: f32, prior: f32, visits: u32, sqrt_total: f32, c_puct: f32) -> f32 {
    q + c_puct * prior * sqrt_total / (1.0 + visits as f32)
}
