use std::thread::JoinHandle;

use shared::{
    errors::{MinerError, MinerResult},
    proof::combine,
    types::{Proof, RoundContext},
};
use tokio::sync::mpsc;
use tracing::*;

use crate::{
    container::Container,
    generator::Batch,
    thread::{CoreThread, UnitTask},
};

/// Scores every candidate of a batch. `proofs[k]` belongs to `candidates[k]`.
pub trait BatchEvaluator: Send {
    fn name(&self) -> &'static str;

    fn evaluate_batch(&mut self, ctx: &RoundContext, candidates: &Batch) -> MinerResult<Vec<Proof>>;
}

/// Scores the batch on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

impl BatchEvaluator for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn evaluate_batch(&mut self, ctx: &RoundContext, candidates: &Batch) -> MinerResult<Vec<Proof>> {
        Ok(candidates.iter().map(|indices| combine(indices, ctx)).collect())
    }
}

/// Persistent worker threads; each batch is split into one contiguous chunk per worker.
pub struct WorkerPool {
    sender: Option<mpsc::UnboundedSender<UnitTask>>,
    handlers: Vec<JoinHandle<()>>,
    next_batch: u64,
}

impl WorkerPool {
    pub fn start(cores: usize, pin: bool) -> MinerResult<Self> {
        if cores == 0 {
            return Err(MinerError::WorkerPool("worker pool needs at least one core".to_string()));
        }
        let (sender, handlers) = CoreThread::start(cores, pin)?;
        info!("worker pool started, threads: {cores}, pinned: {pin}");
        Ok(Self { sender: Some(sender), handlers, next_batch: 0 })
    }

    pub fn workers(&self) -> usize {
        self.handlers.len()
    }

    fn alive(&self) -> bool {
        !self.handlers.iter().any(|handler| handler.is_finished())
    }
}

impl BatchEvaluator for WorkerPool {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn evaluate_batch(&mut self, ctx: &RoundContext, candidates: &Batch) -> MinerResult<Vec<Proof>> {
        if !self.alive() {
            return Err(MinerError::WorkerPool("a worker thread has exited".to_string()));
        }
        let Some(sender) = self.sender.as_ref() else {
            return Err(MinerError::WorkerPool("worker pool is shut down".to_string()));
        };

        let total = candidates.len();
        if total == 0 {
            return Ok(vec![]);
        }

        let batch = self.next_batch;
        self.next_batch += 1;

        let step = total.div_ceil(self.handlers.len());
        let chunks = total.div_ceil(step);
        let (container_tx, container) = Container::new(batch, chunks, total);

        for chunk in 0..chunks {
            let start = chunk * step;
            let task = UnitTask {
                container: container_tx.clone(),
                batch,
                ctx: *ctx,
                candidates: candidates.clone(),
                range: start..(start + step).min(total),
            };
            if sender.send(task).is_err() {
                return Err(MinerError::WorkerPool("task channel closed".to_string()));
            }
        }
        // only the workers hold senders now, so a dead pool ends `collect`
        drop(container_tx);

        container.collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // closing the channel makes every worker return
        self.sender.take();
        for handler in self.handlers.drain(..) {
            if let Err(err) = handler.join() {
                error!("worker pool thread panicked: {err:?}");
            }
        }
    }
}
