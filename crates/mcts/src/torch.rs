use std::path::Path;
use std::sync::Mutex;

use newcular_core::{ACTION_SPACE, COLS, PLANES, REPRESENTATION_LEN, ROWS};
use tch::{CModule, Device, IValue, Kind, Tensor};

use crate::error::EvaluatorError;
use crate::evaluation::{softmax, Evaluation, Evaluator};

/// TorchScript policy/value network.
///
/// The module takes a `[B, 7, 9, 7]` float tensor and returns a tuple of
/// policy logits (`[B, 9, 7, 9, 7]` or `[B, 3969]`) and values (`[B]` or `[B, 1]`).
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModel {
    pub fn load<P: AsRef<Path>>(path: P, device: Device) -> Result<Self, EvaluatorError> {
        let module = CModule::load_on_device(path, device).map_err(model_error)?;
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    fn forward(&self, x: &Tensor) -> Result<(Tensor, Tensor), EvaluatorError> {
        let module = self
            .module
            .lock()
            .map_err(|_| EvaluatorError::Model("model lock poisoned".into()))?;
        let iv = module
            .forward_is(&[IValue::Tensor(x.shallow_clone())])
            .map_err(model_error)?;

        match iv {
            IValue::Tuple(elems) if elems.len() == 2 => {
                let mut elems = elems.into_iter();
                match (elems.next(), elems.next()) {
                    (Some(IValue::Tensor(policy)), Some(IValue::Tensor(value))) => {
                        Ok((policy, value))
                    }
                    _ => Err(EvaluatorError::Model(
                        "Expected a (policy, value) tuple of tensors".into(),
                    )),
                }
            }
            other => Err(EvaluatorError::Model(format!(
                "Expected TorchScript output to be a 2-tuple, got {other:?}"
            ))),
        }
    }
}

impl Evaluator for TorchModel {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError> {
        let mut batch = self.evaluate_batch(&[representation.to_vec()])?;
        batch
            .pop()
            .ok_or_else(|| EvaluatorError::EvaluationFailed("empty batch output".into()))
    }

    fn evaluate_batch(
        &self,
        representations: &[Vec<f32>],
    ) -> Result<Vec<Evaluation>, EvaluatorError> {
        let batch = representations.len();
        let mut flat = Vec::with_capacity(batch * REPRESENTATION_LEN);
        for repr in representations {
            if repr.len() != REPRESENTATION_LEN {
                return Err(EvaluatorError::Shape {
                    what: "representation",
                    expected: REPRESENTATION_LEN,
                    actual: repr.len(),
                });
            }
            flat.extend_from_slice(repr);
        }

        let _guard = tch::no_grad_guard();
        let input = Tensor::from_slice(&flat)
            .view([batch as i64, PLANES as i64, ROWS as i64, COLS as i64])
            .to_device(self.device);
        let (policy, value) = self.forward(&input)?;

        let logits = tensor_to_vec_f32(&policy, batch * ACTION_SPACE, "policy")?;
        let values = tensor_to_vec_f32(&value, batch, "value")?;

        Ok(logits
            .chunks(ACTION_SPACE)
            .zip(values)
            .map(|(row, value)| Evaluation {
                value,
                policy: softmax(row),
            })
            .collect())
    }
}

/// Helper: Copy a tensor of any shape into a flat Vec<f32>
fn tensor_to_vec_f32(
    tensor: &Tensor,
    expected: usize,
    what: &'static str,
) -> Result<Vec<f32>, EvaluatorError> {
    let tensor = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .contiguous();
    let numel = tensor.numel();
    if numel != expected {
        return Err(EvaluatorError::Shape {
            what,
            expected,
            actual: numel,
        });
    }

    let mut out = vec![0.0f32; numel];
    tensor.copy_data(&mut out, numel);
    Ok(out)
}

fn model_error(err: tch::TchError) -> EvaluatorError {
    EvaluatorError::Model(err.to_string())
}
