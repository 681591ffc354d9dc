use std::{
    ops::Range,
    sync::{mpsc, Arc, Mutex},
    thread::JoinHandle,
};

use cfg_if::cfg_if;
use core_affinity::CoreId;
use shared::{
    errors::{MinerError, MinerResult},
    proof::combine,
    types::{Proof, RoundContext},
};
use tokio::sync::mpsc as task_mpsc;
use tracing::*;

use crate::generator::Batch;

/// Proofs for one contiguous slice of a batch.
pub(crate) struct ChunkResult {
    pub batch: u64,
    pub start: usize,
    pub proofs: Vec<Proof>,
}

pub(crate) struct UnitTask {
    pub container: mpsc::Sender<ChunkResult>,
    pub batch: u64,
    pub ctx: RoundContext,
    pub candidates: Batch,
    pub range: Range<usize>,
}

pub(crate) struct CoreThread {
    pub receiver: Arc<Mutex<task_mpsc::UnboundedReceiver<UnitTask>>>,
}

cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "windows", target_os = "android"))] {
        fn pin_to(core: CoreId) {
            if !core_affinity::set_for_current(core) {
                debug!("failed to pin worker to core {}", core.id);
            }
        }
    } else {
        fn pin_to(_core: CoreId) {}
    }
}

impl CoreThread {
    /// Spawns `cores` workers sharing one task queue.
    pub fn start(
        cores: usize,
        pin: bool,
    ) -> MinerResult<(task_mpsc::UnboundedSender<UnitTask>, Vec<JoinHandle<()>>)> {
        let (assign_tx, assign_rx) = task_mpsc::unbounded_channel();

        let manager = CoreThread {
            receiver: Arc::new(Mutex::new(assign_rx)),
        };

        let core_ids = if pin { core_affinity::get_core_ids().unwrap_or_default() } else { vec![] };

        let mut handlers = Vec::with_capacity(cores);
        for id in 0..cores {
            let core = core_ids.get(id % core_ids.len().max(1)).copied();
            let handler = manager
                .run(id, core)
                .map_err(|err| MinerError::WorkerPool(format!("failed to spawn worker {id}: {err}")))?;
            handlers.push(handler);
        }

        Ok((assign_tx, handlers))
    }

    fn run(&self, cid: usize, core: Option<CoreId>) -> std::io::Result<JoinHandle<()>> {
        debug!("unit core: {cid}, pinned: {:?}", core.map(|c| c.id));

        let receiver = self.receiver.clone();

        std::thread::Builder::new().name(format!("bid-worker-{cid}")).spawn(move || {
            if let Some(core) = core {
                pin_to(core);
            }

            loop {
                // receive task from channel
                let data = {
                    let Ok(mut guard) = receiver.lock() else {
                        error!("core: {cid}, task receiver poisoned");
                        return;
                    };
                    guard.blocking_recv()
                };

                let Some(task) = data else {
                    debug!("core: {cid}, task receiver closed");
                    return;
                };

                let UnitTask {
                    container,
                    batch,
                    ctx,
                    candidates,
                    range,
                } = task;

                trace!("batch: {batch}, core: {cid}, range: {range:?}");

                let start = range.start;
                let proofs = candidates[range].iter().map(|indices| combine(indices, &ctx)).collect();

                if container.send(ChunkResult { batch, start, proofs }).is_err() {
                    trace!("batch: {batch}, core: {cid}, collector gone");
                }
            }
        })
    }
}
