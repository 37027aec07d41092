use crate::selection::PathStep;
use crate::tree::MctsTree;

/// Backup a leaf value along the simulation path
///
/// `leaf_value` is from the perspective of the side to move at the leaf.
/// Each edge stores values from the perspective of the side that played it,
/// so the sign flips at every ply on the way up.
pub fn backup(tree: &mut MctsTree, path: &[PathStep], leaf_value: f32) {
    let mut value = -leaf_value;

    for step in path.iter().rev() {
        let edge = &mut tree.nodes[step.node].edges[step.edge];
        edge.visit_count += 1;
        edge.total_value += value;
        value = -value;
    }
}
