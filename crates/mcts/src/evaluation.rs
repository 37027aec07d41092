use newcular_core::{mask, BoardState, ACTION_SPACE, REPRESENTATION_LEN};

use crate::error::EvaluatorError;

/// Output of a policy/value evaluator for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Value estimate for the side to move, in [-1, 1]
    pub value: f32,
    /// Probability over the full action space (3969 entries)
    pub policy: Vec<f32>,
}

/// Minimal interface required from a policy/value evaluator.
///
/// Inputs are board representations oriented for the side to move; the
/// policy is indexed by oriented move index.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError>;

    /// Evaluate several positions at once. Defaults to one call per position.
    fn evaluate_batch(
        &self,
        representations: &[Vec<f32>],
    ) -> Result<Vec<Evaluation>, EvaluatorError> {
        representations
            .iter()
            .map(|repr| self.evaluate(repr))
            .collect()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(representation)
    }

    fn evaluate_batch(
        &self,
        representations: &[Vec<f32>],
    ) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate_batch(representations)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError> {
        (**self).evaluate(representation)
    }

    fn evaluate_batch(
        &self,
        representations: &[Vec<f32>],
    ) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate_batch(representations)
    }
}

/// Evaluator with a uniform policy and a neutral value.
///
/// Masking restricts the uniform policy to legal moves, so search driven by
/// it is plain PUCT with equal priors.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError> {
        check_len("representation", REPRESENTATION_LEN, representation.len())?;
        Ok(Evaluation {
            value: 0.0,
            policy: vec![1.0 / ACTION_SPACE as f32; ACTION_SPACE],
        })
    }
}

/// Evaluate a position from the side to move's point of view.
///
/// The value is clamped to [-1, 1]; a policy of the wrong length is an error.
pub fn evaluate_position<E: Evaluator + ?Sized>(
    state: &BoardState,
    evaluator: &E,
) -> Result<Evaluation, EvaluatorError> {
    let mut evaluation = evaluator.evaluate(&state.oriented_representation())?;
    check_len("policy", ACTION_SPACE, evaluation.policy.len())?;

    if !evaluation.value.is_finite() {
        return Err(EvaluatorError::EvaluationFailed(format!(
            "non-finite value {}",
            evaluation.value
        )));
    }
    evaluation.value = evaluation.value.clamp(-1.0, 1.0);

    Ok(evaluation)
}

/// Oriented action indices of the legal moves, in legal-move order.
pub fn legal_action_indices(state: &BoardState) -> Vec<usize> {
    let side = state.side_to_move();
    state
        .legal_moves()
        .iter()
        .map(|&mv| side.orient_move(mv).index())
        .collect()
}

/// Restrict `policy` to the positions marked in `legal_mask` and renormalize.
///
/// Returns a distribution over the full action space that is exactly zero
/// outside the mask. When the evaluator put no mass on any legal move the
/// result is uniform over the legal moves. An empty mask yields all zeros.
pub fn mask_policy(policy: &[f32], legal_mask: &[f32]) -> Vec<f32> {
    let mut masked: Vec<f32> = policy
        .iter()
        .zip(legal_mask)
        .map(|(&p, &m)| if m > 0.0 && p.is_finite() && p > 0.0 { p } else { 0.0 })
        .collect();

    let sum: f32 = masked.iter().sum();
    if sum > 0.0 {
        masked.iter_mut().for_each(|p| *p /= sum);
        return masked;
    }

    let legal_count = legal_mask.iter().filter(|&&m| m > 0.0).count();
    if legal_count > 0 {
        let uniform = 1.0 / legal_count as f32;
        for (p, &m) in masked.iter_mut().zip(legal_mask) {
            *p = if m > 0.0 { uniform } else { 0.0 };
        }
    }
    masked
}

/// Prior probability per legal move of `state`, in legal-move order.
pub fn legal_priors(state: &BoardState, policy: &[f32]) -> Vec<f32> {
    let side = state.side_to_move();
    let oriented: Vec<_> = state
        .legal_moves()
        .iter()
        .map(|&mv| side.orient_move(mv))
        .collect();
    let masked = mask_policy(policy, &mask(&oriented));

    legal_action_indices(state)
        .into_iter()
        .map(|idx| masked[idx])
        .collect()
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), EvaluatorError> {
    if expected != actual {
        return Err(EvaluatorError::Shape {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use newcular_core::Move;

    fn state(history: Vec<Move>, legal: &[&str]) -> BoardState {
        BoardState::new(
            history,
            legal.iter().map(|s| s.parse().unwrap()).collect(),
            vec![0.0; REPRESENTATION_LEN],
            String::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_mask_policy_sums_to_one_and_zero_outside() {
        let legal: Vec<Move> = ["B2B3", "C1E3", "D2D2"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let policy: Vec<f32> = (0..ACTION_SPACE).map(|i| (i % 13) as f32 + 0.5).collect();

        let legal_mask = mask(&legal);
        let masked = mask_policy(&policy, &legal_mask);

        assert_relative_eq!(masked.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        for (i, &p) in masked.iter().enumerate() {
            if legal_mask[i] == 0.0 {
                assert_eq!(p, 0.0);
            } else {
                assert!(p > 0.0);
            }
        }
    }

    #[test]
    fn test_mask_policy_preserves_ratios() {
        let mut policy = vec![0.0; ACTION_SPACE];
        policy[10] = 0.3;
        policy[20] = 0.1;
        policy[30] = 0.6;
        let mut legal_mask = vec![0.0; ACTION_SPACE];
        legal_mask[10] = 1.0;
        legal_mask[20] = 1.0;

        let masked = mask_policy(&policy, &legal_mask);

        assert_relative_eq!(masked[10], 0.75, epsilon = 1e-6);
        assert_relative_eq!(masked[20], 0.25, epsilon = 1e-6);
        assert_eq!(masked[30], 0.0);
    }

    #[test]
    fn test_mask_policy_falls_back_to_uniform() {
        let mut policy = vec![0.0; ACTION_SPACE];
        policy[5] = 1.0;
        let mut legal_mask = vec![0.0; ACTION_SPACE];
        legal_mask[1] = 1.0;
        legal_mask[2] = 1.0;

        let masked = mask_policy(&policy, &legal_mask);

        assert_relative_eq!(masked[1], 0.5);
        assert_relative_eq!(masked[2], 0.5);
        assert_eq!(masked[5], 0.0);
    }

    #[test]
    fn test_mask_policy_empty_mask() {
        let masked = mask_policy(&vec![0.1; ACTION_SPACE], &vec![0.0; ACTION_SPACE]);
        assert!(masked.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_legal_priors_player_two_uses_inverted_indices() {
        let first: Move = "A1A2".parse().unwrap();
        let s = state(vec![first], &["B8B7"]);
        let inverted: Move = "B2B3".parse().unwrap();

        assert_eq!(legal_action_indices(&s), vec![inverted.index()]);

        let mut policy = vec![0.0; ACTION_SPACE];
        policy[inverted.index()] = 0.2;
        assert_relative_eq!(legal_priors(&s, &policy)[0], 1.0);
    }

    #[test]
    fn test_uniform_evaluator() {
        let eval = UniformEvaluator::new();
        let result = eval.evaluate(&vec![0.0; REPRESENTATION_LEN]).unwrap();

        assert_eq!(result.policy.len(), ACTION_SPACE);
        assert_eq!(result.value, 0.0);
        assert!(eval.evaluate(&[0.0; 3]).is_err());
    }

    #[test]
    fn test_evaluate_position_clamps_value() {
        struct Overconfident;
        impl Evaluator for Overconfident {
            fn evaluate(&self, _: &[f32]) -> Result<Evaluation, EvaluatorError> {
                Ok(Evaluation {
                    value: 3.0,
                    policy: vec![0.0; ACTION_SPACE],
                })
            }
        }

        let s = state(Vec::new(), &["B2B3"]);
        let evaluation = evaluate_position(&s, &Overconfident).unwrap();
        assert_eq!(evaluation.value, 1.0);
    }

    #[test]
    fn test_evaluate_position_rejects_bad_policy_shape() {
        struct Short;
        impl Evaluator for Short {
            fn evaluate(&self, _: &[f32]) -> Result<Evaluation, EvaluatorError> {
                Ok(Evaluation {
                    value: 0.0,
                    policy: vec![1.0; 64],
                })
            }
        }

        let s = state(Vec::new(), &["B2B3"]);
        assert!(matches!(
            evaluate_position(&s, &Short),
            Err(EvaluatorError::Shape { actual: 64, .. })
        ));
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let probs = softmax(&[1000.0, 1001.0, 1002.0]);

        assert!(probs.iter().all(|&p| p.is_finite()));
        assert_relative_eq!(probs.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }
}
