use rand::Rng;
use rand_distr::{Dirichlet, Distribution};

use crate::config::MctsConfig;
use crate::error::{MctsError, Result};
use crate::tree::{MctsTree, NodeId};

/// Add Dirichlet noise to root edge priors for exploration
///
/// The noise is mixed with the original prior: P' = (1-ε)*P + ε*noise.
/// Roots with fewer than two edges are left untouched.
pub fn add_dirichlet_noise_to_root<G: Rng + ?Sized>(
    tree: &mut MctsTree,
    root_id: NodeId,
    config: &MctsConfig,
    rng: &mut G,
) -> Result<()> {
    let root = tree
        .nodes
        .get_mut(root_id)
        .ok_or(MctsError::RootNotInitialized)?;

    let n = root.edges.len();
    if n < 2 {
        return Ok(());
    }

    let alpha = vec![config.dirichlet_alpha as f64; n];
    let dirichlet =
        Dirichlet::new(&alpha).map_err(|e| MctsError::DirichletError(e.to_string()))?;
    let noise = dirichlet.sample(rng);

    let eps = config.dirichlet_epsilon;
    for (edge, &eta) in root.edges.iter_mut().zip(&noise) {
        edge.prior = (1.0 - eps) * edge.prior + eps * eta as f32;
    }

    Ok(())
}
