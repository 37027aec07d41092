use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::error::EvaluatorError;
use crate::evaluation::{Evaluation, Evaluator};

/// A batched wrapper around an evaluator.
///
/// Calls to `evaluate` enqueue the representation and block until the
/// background worker flushes a batch through `evaluate_batch` and returns the
/// matching result. Useful when several self-play workers share one model.
pub struct BatchingEvaluator {
    inner: Arc<BatchingInner>,
}

type Reply = Result<Evaluation, EvaluatorError>;

struct BatchWork {
    input: Vec<f32>,
    resp_tx: Sender<Reply>,
}

struct BatchingInner {
    sender: Sender<BatchWork>,
    _handle: thread::JoinHandle<()>,
}

impl BatchingEvaluator {
    /// Create a new batching wrapper.
    ///
    /// - `evaluator`: the underlying evaluator, owned by the worker thread
    /// - `batch_size`: maximum items per batch (>=1)
    /// - `timeout`: maximum time to wait before flushing a partial batch
    pub fn new<E: Evaluator + 'static>(evaluator: E, batch_size: usize, timeout: Duration) -> Self {
        let batch_size = batch_size.max(1);
        let (tx, rx) = bounded::<BatchWork>(batch_size * 4);

        let handle = thread::spawn(move || worker_loop(evaluator, batch_size, timeout, rx));

        Self {
            inner: Arc::new(BatchingInner {
                sender: tx,
                _handle: handle,
            }),
        }
    }
}

impl Clone for BatchingEvaluator {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Evaluator for BatchingEvaluator {
    fn evaluate(&self, representation: &[f32]) -> Result<Evaluation, EvaluatorError> {
        let (resp_tx, resp_rx) = bounded::<Reply>(1);

        self.inner
            .sender
            .send(BatchWork {
                input: representation.to_vec(),
                resp_tx,
            })
            .map_err(|_| EvaluatorError::WorkerStopped)?;

        resp_rx.recv().map_err(|_| EvaluatorError::WorkerStopped)?
    }
}

fn worker_loop<E: Evaluator>(
    evaluator: E,
    batch_size: usize,
    timeout: Duration,
    rx: Receiver<BatchWork>,
) {
    // Loop until all senders are dropped.
    while let Ok(first) = rx.recv() {
        let mut inputs = Vec::with_capacity(batch_size);
        let mut responders = Vec::with_capacity(batch_size);

        inputs.push(first.input);
        responders.push(first.resp_tx);

        // Fill up to batch_size or until timeout expires.
        let deadline = Instant::now() + timeout;
        while responders.len() < batch_size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(work) => {
                    inputs.push(work.input);
                    responders.push(work.resp_tx);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        trace!(batch = inputs.len(), "flushing evaluation batch");

        match evaluator.evaluate_batch(&inputs) {
            Ok(results) if results.len() == responders.len() => {
                for (tx, result) in responders.into_iter().zip(results) {
                    let _ = tx.send(Ok(result));
                }
            }
            Ok(results) => {
                let err = EvaluatorError::Shape {
                    what: "batch",
                    expected: responders.len(),
                    actual: results.len(),
                };
                for tx in responders {
                    let _ = tx.send(Err(err.clone()));
                }
            }
            Err(err) => {
                for tx in responders {
                    let _ = tx.send(Err(err.clone()));
                }
            }
        }
    }

    debug!("batching worker stopped");
}
