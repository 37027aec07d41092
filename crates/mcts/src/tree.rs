use std::sync::Arc;

use newcular_core::{BoardState, Move};

/// Node ID in the arena-style tree
pub type NodeId = usize;

/// Why an edge was dropped from the current search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchFailure {
    BoardLookup,
    Evaluator,
    DegenerateMask,
}

/// Statistics for one legal move out of a node.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Move in board coordinates
    pub mv: Move,

    /// Action index of the move oriented for the side to move
    pub action: usize,

    /// Prior probability from the evaluator, renormalized over legal moves
    pub prior: f32,

    /// Number of simulations that went through this edge
    pub visit_count: u32,

    /// Sum of values backed up through this edge, from the mover's perspective
    pub total_value: f32,

    /// Child node, created the first time the edge is selected
    pub child: Option<NodeId>,

    /// Set once expansion through this edge has failed
    pub excluded: Option<BranchFailure>,
}

impl Edge {
    pub fn new(mv: Move, action: usize, prior: f32) -> Self {
        Self {
            mv,
            action,
            prior,
            visit_count: 0,
            total_value: 0.0,
            child: None,
            excluded: None,
        }
    }

    /// Get Q-value (average value)
    pub fn q_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.total_value / self.visit_count as f32
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded.is_some()
    }
}

/// A single node in the MCTS tree
///
/// Nodes never point at their parent; the path of a simulation is tracked
/// separately while descending.
#[derive(Debug)]
pub struct MctsNode {
    /// Board state at this node
    pub state: Arc<BoardState>,

    /// Prior probability of the edge that led here (1.0 for the root)
    pub prior_probability: f32,

    /// One edge per legal move, in legal-move order
    pub edges: Vec<Edge>,

    /// Evaluator value (or fixed outcome) from the side to move's perspective
    pub value: f32,

    /// Fixed outcome value if the position is finished
    pub terminal_value: Option<f32>,
}

impl MctsNode {
    /// Create a terminal node with a known value
    pub fn new_terminal(state: Arc<BoardState>, prior: f32, value: f32) -> Self {
        Self {
            state,
            prior_probability: prior,
            edges: Vec::new(),
            value,
            terminal_value: Some(value),
        }
    }

    /// Create an evaluated interior node
    pub fn new_interior(state: Arc<BoardState>, prior: f32, value: f32, edges: Vec<Edge>) -> Self {
        Self {
            state,
            prior_probability: prior,
            edges,
            value,
            terminal_value: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_value.is_some()
    }

    /// Sum of visit counts over all edges
    pub fn total_visits(&self) -> u32 {
        self.edges.iter().map(|e| e.visit_count).sum()
    }

    /// Mean backed-up value over all edges, or the node's own value when unvisited
    pub fn q_value(&self) -> f32 {
        let visits = self.total_visits();
        if visits == 0 {
            self.value
        } else {
            self.edges.iter().map(|e| e.total_value).sum::<f32>() / visits as f32
        }
    }
}

/// MCTS tree using arena allocation
pub struct MctsTree {
    /// Arena of all nodes
    pub nodes: Vec<MctsNode>,

    /// Root node ID (usually 0)
    pub root_id: NodeId,
}

impl MctsTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(1024),
            root_id: 0,
        }
    }

    /// Initialize the tree with a root node
    pub fn initialize_root(&mut self, root: MctsNode) -> NodeId {
        self.nodes.clear();
        self.nodes.push(root);
        self.root_id = 0;
        self.root_id
    }

    /// Add a new node and return its ID
    pub fn add_node(&mut self, node: MctsNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Add `node` as the child reached through `edge` of `parent`
    pub fn attach_child(&mut self, parent: NodeId, edge: usize, node: MctsNode) -> NodeId {
        let id = self.add_node(node);
        self.nodes[parent].edges[edge].child = Some(id);
        id
    }

    pub fn root(&self) -> Option<&MctsNode> {
        self.nodes.get(self.root_id)
    }

    /// Get the number of nodes in the tree
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Clear the tree
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl Default for MctsTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use newcular_core::REPRESENTATION_LEN;

    pub(crate) fn dummy_state(history: Vec<Move>, legal: Vec<Move>) -> Arc<BoardState> {
        Arc::new(BoardState::new(
            history,
            legal,
            vec![0.0; REPRESENTATION_LEN],
            String::new(),
            None,
        )
        .unwrap())
    }

    /// Root with one edge per prior, moves taken from the start of the action space
    pub(crate) fn tree_with_root(priors: &[f32]) -> MctsTree {
        let edges = priors
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let mv = Move::from_index(i).unwrap();
                Edge::new(mv, mv.index(), p)
            })
            .collect();
        let legal = (0..priors.len())
            .map(|i| Move::from_index(i).unwrap())
            .collect();
        let mut tree = MctsTree::new();
        tree.initialize_root(MctsNode::new_interior(
            dummy_state(Vec::new(), legal),
            1.0,
            0.0,
            edges,
        ));
        tree
    }

    #[test]
    fn test_edge_q_value() {
        let mut edge = Edge::new(Move::from_index(0).unwrap(), 0, 0.5);
        assert_eq!(edge.q_value(), 0.0);

        edge.visit_count = 4;
        edge.total_value = 2.0;
        assert_eq!(edge.q_value(), 0.5);
    }

    #[test]
    fn test_attach_child() {
        let mut tree = tree_with_root(&[0.5, 0.5]);
        let child = MctsNode::new_terminal(dummy_state(Vec::new(), Vec::new()), 0.5, -1.0);

        let child_id = tree.attach_child(0, 1, child);

        assert_eq!(child_id, 1);
        assert_eq!(tree.size(), 2);
        assert_eq!(tree.nodes[0].edges[1].child, Some(1));
        assert!(tree.nodes[0].edges[0].child.is_none());
        assert!(tree.nodes[1].is_terminal());
    }

    #[test]
    fn test_node_q_value_falls_back_to_own_value() {
        let mut tree = tree_with_root(&[0.5, 0.5]);
        tree.nodes[0].value = 0.25;
        assert_eq!(tree.nodes[0].q_value(), 0.25);

        tree.nodes[0].edges[0].visit_count = 2;
        tree.nodes[0].edges[0].total_value = 1.0;
        tree.nodes[0].edges[1].visit_count = 2;
        tree.nodes[0].edges[1].total_value = -0.2;
        assert!((tree.nodes[0].q_value() - 0.2).abs() < 1e-6);
        assert_eq!(tree.nodes[0].total_visits(), 4);
    }

    #[test]
    fn test_clear() {
        let mut tree = tree_with_root(&[1.0]);
        assert_eq!(tree.size(), 1);
        tree.clear();
        assert_eq!(tree.size(), 0);
        assert!(tree.root().is_none());
    }
}
