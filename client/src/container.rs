use std::sync::mpsc;

use shared::{
    errors::{MinerError, MinerResult},
    types::Proof,
};
use tracing::*;

use crate::thread::ChunkResult;

/// Collects the chunk results of one batch and puts them back in candidate order.
pub(crate) struct Container {
    batch: u64,
    chunks: usize,
    total: usize,
    receiver: mpsc::Receiver<ChunkResult>,
}

impl Container {
    pub fn new(batch: u64, chunks: usize, total: usize) -> (mpsc::Sender<ChunkResult>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { batch, chunks, total, receiver })
    }

    /// Blocks until every chunk arrived. Fails when all senders are gone before that.
    pub fn collect(self) -> MinerResult<Vec<Proof>> {
        let mut proofs = vec![Proof::ONES; self.total];
        let mut filled = 0;

        let mut received = 0;
        while received < self.chunks {
            let chunk = self.receiver.recv().map_err(|_| {
                MinerError::WorkerPool(format!(
                    "batch {} lost {} of {} chunks",
                    self.batch,
                    self.chunks - received,
                    self.chunks
                ))
            })?;

            if chunk.batch != self.batch {
                warn!("dropping chunk of batch {} while collecting {}", chunk.batch, self.batch);
                continue;
            }

            let end = chunk.start + chunk.proofs.len();
            if end > self.total {
                return Err(MinerError::WorkerPool(format!("chunk {}..{end} out of range", chunk.start)));
            }
            proofs[chunk.start..end].copy_from_slice(&chunk.proofs);
            filled += chunk.proofs.len();
            received += 1;
        }

        if filled != self.total {
            return Err(MinerError::WorkerPool(format!("batch {} filled {filled} of {}", self.batch, self.total)));
        }

        Ok(proofs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(n: u32) -> Proof {
        Proof::from_limbs([n, 0, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn reassembles_out_of_order_chunks() {
        let (sender, container) = Container::new(3, 2, 4);
        sender.send(ChunkResult { batch: 3, start: 2, proofs: vec![proof(2), proof(3)] }).unwrap();
        sender.send(ChunkResult { batch: 3, start: 0, proofs: vec![proof(0), proof(1)] }).unwrap();
        drop(sender);

        assert_eq!(container.collect().unwrap(), vec![proof(0), proof(1), proof(2), proof(3)]);
    }

    #[test]
    fn missing_chunks_fail() {
        let (sender, container) = Container::new(1, 2, 2);
        sender.send(ChunkResult { batch: 1, start: 0, proofs: vec![proof(0)] }).unwrap();
        drop(sender);

        assert!(matches!(container.collect(), Err(MinerError::WorkerPool(_))));
    }

    #[test]
    fn stale_chunks_do_not_count() {
        let (sender, container) = Container::new(2, 1, 1);
        sender.send(ChunkResult { batch: 1, start: 0, proofs: vec![proof(7)] }).unwrap();
        drop(sender);

        assert!(container.collect().is_err());
    }
}
