use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::{Array, Array1, Array2, Array4};
use ndarray_npy::write_npy;
use newcular_core::{ACTION_SPACE, COLS, PLANES, REPRESENTATION_LEN, ROWS};

use crate::data::TrainingExample;

/// Save training data to NPY files
///
/// Creates three separate files:
/// - `{path}_states.npy`: (N, 7, 9, 7) oriented board representations
/// - `{path}_policies.npy`: (N, 3969) policy targets
/// - `{path}_values.npy`: (N,) value targets
///
/// # Example
/// ```no_run
/// use newcular_selfplay::storage::save_training_data;
/// use newcular_selfplay::TrainingExample;
///
/// let examples = vec![
///     TrainingExample::new(vec![0.0; 441], vec![0.0; 3969], 1.0),
/// ];
/// save_training_data(&examples, "selfplay_data").unwrap();
/// // Creates: selfplay_data_states.npy, selfplay_data_policies.npy, selfplay_data_values.npy
/// ```
pub fn save_training_data(examples: &[TrainingExample], path: impl AsRef<Path>) -> Result<()> {
    if examples.is_empty() {
        anyhow::bail!("Cannot save empty training data");
    }
    let path = path.as_ref();
    let n = examples.len();

    // Extract and flatten states: (N, 7, 9, 7)
    let states: Vec<f32> = examples
        .iter()
        .flat_map(|e| e.state.iter().copied())
        .collect();
    anyhow::ensure!(
        states.len() == n * REPRESENTATION_LEN,
        "states must have {REPRESENTATION_LEN} values per example"
    );
    let states_array: Array4<f32> = Array::from_shape_vec((n, PLANES, ROWS, COLS), states)?;

    // Extract and flatten policies: (N, 3969)
    let policies: Vec<f32> = examples
        .iter()
        .flat_map(|e| e.policy.iter().copied())
        .collect();
    anyhow::ensure!(
        policies.len() == n * ACTION_SPACE,
        "policies must have {ACTION_SPACE} values per example"
    );
    let policies_array: Array2<f32> = Array::from_shape_vec((n, ACTION_SPACE), policies)?;

    // Extract values: (N,)
    let values_array: Array1<f32> = examples.iter().map(|e| e.value).collect();

    for (suffix, result) in [
        ("_states.npy", write_npy(output_path(path, "_states.npy"), &states_array)),
        ("_policies.npy", write_npy(output_path(path, "_policies.npy"), &policies_array)),
        ("_values.npy", write_npy(output_path(path, "_values.npy"), &values_array)),
    ] {
        result.with_context(|| format!("writing {}{suffix}", path.display()))?;
    }

    Ok(())
}

/// `{path}{suffix}`, keeping any directory part of `path`
pub fn output_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray_npy::read_npy;

    #[test]
    fn test_save_and_load_training_data() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("selfplay");

        let mut policy = vec![0.0; ACTION_SPACE];
        policy[7] = 1.0;
        let examples = vec![
            TrainingExample::new(vec![1.0; REPRESENTATION_LEN], policy.clone(), 1.0),
            TrainingExample::new(vec![0.0; REPRESENTATION_LEN], policy, -1.0),
        ];

        save_training_data(&examples, &base).unwrap();

        let states: Array4<f32> = read_npy(output_path(&base, "_states.npy")).unwrap();
        let policies: Array2<f32> = read_npy(output_path(&base, "_policies.npy")).unwrap();
        let values: Array1<f32> = read_npy(output_path(&base, "_values.npy")).unwrap();

        assert_eq!(states.shape(), &[2, PLANES, ROWS, COLS]);
        assert_eq!(policies.shape(), &[2, ACTION_SPACE]);
        assert_eq!(values.shape(), &[2]);

        assert_eq!(states[[0, 6, 8, 6]], 1.0);
        assert_eq!(policies[[1, 7]], 1.0);
        assert_relative_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], -1.0);
    }

    #[test]
    fn test_save_empty_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = save_training_data(&[], dir.path().join("empty"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_rejects_wrong_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let examples = vec![TrainingExample::new(vec![0.0; 192], vec![0.0; 64], 0.0)];
        assert!(save_training_data(&examples, dir.path().join("bad")).is_err());
    }
}
