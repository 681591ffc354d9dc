use std::time::{Duration, Instant};

use shared::{
    bigint::WORST_SCORE,
    deadline::Deadline,
    errors::{MinerError, MinerResult},
    proof::verify,
    types::{BestResult, BidWindow, Proof, RoundContext},
    utils::now_nanos,
};
use tracing::*;

use crate::{
    config::{MinerConfig, Strategy},
    evaluator::{BatchEvaluator, Sequential, WorkerPool},
    generator::CandidateGenerator,
};

/// Knobs for one search.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Widest batch the search may run.
    pub batch_size: usize,
    /// Candidates the evaluator scores side by side; batches grow in multiples of it.
    pub lanes: usize,
    /// Share of the remaining budget one batch may take.
    pub budget_fraction: f64,
    pub safety_margin_secs: f64,
    pub verify_best: bool,
}

/// Width of the next batch, given the measured time of one wave of `lanes` candidates.
///
/// Never below one wave, never above `batch_size`.
pub fn next_batch_width(
    wave_secs: f64,
    remaining_secs: f64,
    budget_fraction: f64,
    lanes: usize,
    batch_size: usize,
) -> usize {
    let lanes = lanes.clamp(1, batch_size.max(1));
    let max_waves = batch_size.max(1).div_ceil(lanes);
    let waves = if wave_secs > 0.0 {
        let fit = (remaining_secs.max(0.0) * budget_fraction / wave_secs).floor();
        if fit >= max_waves as f64 {
            max_waves
        } else {
            (fit as usize).max(1)
        }
    } else {
        max_waves
    };
    (waves * lanes).min(batch_size.max(1))
}

/// What a bid produced and what it cost.
#[derive(Debug, Clone)]
pub struct BidOutcome {
    pub best: BestResult,
    pub trials: u64,
    pub batches: u64,
    pub elapsed: Duration,
    pub evaluator: &'static str,
    /// Set when the configured evaluator failed and the search finished sequentially.
    pub degraded: bool,
    /// `(trial, proof)` of every new best, in the order they were found.
    pub improvements: Vec<(u64, Proof)>,
}

impl BidOutcome {
    pub fn trial_rate(&self) -> f64 {
        self.trials as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

/// The bid loop: score whole batches until the deadline has passed, keeping the lowest proof.
///
/// At least one batch always runs, and the deadline is only looked at between batches, so
/// the call returns at most one batch duration after the deadline. The first batch is a
/// single wave of `lanes` candidates; later widths follow the measured cost so one batch
/// stays within `budget_fraction` of what is left.
pub fn search(
    ctx: &RoundContext,
    window: &BidWindow,
    evaluator: &mut dyn BatchEvaluator,
    generator: &mut CandidateGenerator,
    options: &SearchOptions,
) -> MinerResult<BidOutcome> {
    ctx.validate()?;

    let deadline = Deadline::from_window(window, options.safety_margin_secs);
    let batch_size = options.batch_size.max(1);
    let mut lanes = options.lanes.clamp(1, batch_size);
    let mut width = lanes;
    let start = Instant::now();

    info!(
        "bid start, round: {}, period: {:.3}s, budget: {:.3}s, evaluator: {}, batch: {lanes}..{batch_size}",
        ctx.round_id,
        window.period_seconds,
        deadline.remaining_secs(now_nanos()),
        evaluator.name(),
    );

    let mut best = BestResult::worst();
    let mut improvements = vec![];
    let mut fallback: Option<Sequential> = None;
    let mut trials = 0u64;
    let mut batches = 0u64;

    loop {
        let candidates = generator.batch(width, ctx.max_indices);
        let batch_start = Instant::now();

        let proofs = match fallback.as_mut() {
            Some(sequential) => sequential.evaluate_batch(ctx, &candidates)?,
            None => {
                let evaluated = evaluator.evaluate_batch(ctx, &candidates).and_then(|proofs| {
                    if proofs.len() == candidates.len() {
                        Ok(proofs)
                    } else {
                        Err(MinerError::WorkerPool(format!(
                            "{} proofs for {} candidates",
                            proofs.len(),
                            candidates.len()
                        )))
                    }
                });
                match evaluated {
                    Ok(proofs) => proofs,
                    Err(err) => {
                        warn!("{} evaluator failed, continuing sequentially: {err}", evaluator.name());
                        lanes = 1;
                        fallback.insert(Sequential).evaluate_batch(ctx, &candidates)?
                    }
                }
            }
        };

        // first of equal proofs wins, both inside the batch and against the running best
        if let Some((k, proof)) = proofs.iter().enumerate().min_by(|a, b| a.1.cmp(b.1)) {
            if best.offer(&candidates[k], proof) {
                let trial = trials + k as u64 + 1;
                let score = proof.approx_magnitude();
                debug!("found new best, trial: {trial}, score: {score:e}, ratio: {:e}", WORST_SCORE / score);
                improvements.push((trial, *proof));
            }
        }

        trials += candidates.len() as u64;
        batches += 1;
        let waves = candidates.len().div_ceil(lanes).max(1);
        let wave_secs = batch_start.elapsed().as_secs_f64() / waves as f64;
        trace!("batch {batches} done, width: {width}, wave: {:.3}ms, trials: {trials}", wave_secs * 1e3);

        let now = now_nanos();
        if deadline.passed_at(now) {
            break;
        }
        width = next_batch_width(
            wave_secs,
            deadline.remaining_secs(now),
            options.budget_fraction,
            lanes,
            batch_size,
        );
    }

    if options.verify_best {
        if let Err(err) = verify(&best.indices, &best.proof, ctx) {
            error!("best proof failed verification: {err}");
        }
    }

    let outcome = BidOutcome {
        best,
        trials,
        batches,
        elapsed: start.elapsed(),
        evaluator: if fallback.is_some() { "sequential" } else { evaluator.name() },
        degraded: fallback.is_some(),
        improvements,
    };

    info!(
        "bid finish, trials: {}, batches: {}, elapsed: {:.3}s, rate: {:.1} trials/s",
        outcome.trials,
        outcome.batches,
        outcome.elapsed.as_secs_f64(),
        outcome.trial_rate()
    );

    Ok(outcome)
}

/// Owns the generator and a lazily started worker pool across rounds.
pub struct Miner {
    config: MinerConfig,
    generator: CandidateGenerator,
    pool: Option<WorkerPool>,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        let generator = CandidateGenerator::new(config.seed);
        Self { config, generator, pool: None }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    fn wants_pool(&self, window: &BidWindow) -> bool {
        match self.config.strategy {
            Strategy::Sequential => false,
            Strategy::Pool => true,
            Strategy::Auto => window.period_seconds >= self.config.pool_threshold_secs,
        }
    }

    /// Computes the bid for one round.
    pub fn make_bid(&mut self, ctx: &RoundContext, window: &BidWindow) -> MinerResult<BidOutcome> {
        ctx.validate()?;

        let use_pool = self.wants_pool(window);
        if use_pool && self.pool.is_none() {
            match WorkerPool::start(self.config.cores(), self.config.pin_cores) {
                Ok(pool) => self.pool = Some(pool),
                Err(err) => warn!("worker pool unavailable, bidding sequentially: {err}"),
            }
        }

        let mut sequential = Sequential;
        let (evaluator, workers): (&mut dyn BatchEvaluator, usize) = match self.pool.as_mut() {
            Some(pool) if use_pool => {
                let workers = pool.workers();
                (pool as &mut dyn BatchEvaluator, workers)
            }
            _ => (&mut sequential, 1),
        };

        let options = SearchOptions {
            batch_size: self.config.batch_width(workers),
            lanes: workers,
            budget_fraction: self.config.batch_budget_fraction,
            safety_margin_secs: self.config.safety_margin_secs,
            verify_best: self.config.verify_best,
        };

        let outcome = search(ctx, window, evaluator, &mut self.generator, &options)?;
        if outcome.degraded && self.pool.take().is_some() {
            warn!("worker pool dropped, it will be restarted for the next round");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_fits_the_remaining_budget() {
        // 10ms waves of 4, 10% of 1s left: ten waves
        assert_eq!(next_batch_width(0.01, 1.0, 0.1, 4, 64), 40);
        assert_eq!(next_batch_width(0.01, 10.0, 0.1, 4, 64), 64);
        assert_eq!(next_batch_width(0.0, 1.0, 0.1, 4, 64), 64);
    }

    #[test]
    fn width_never_drops_below_one_wave() {
        assert_eq!(next_batch_width(2.0, 0.3, 0.1, 4, 64), 4);
        assert_eq!(next_batch_width(0.5, -1.0, 0.1, 1, 16), 1);
        assert_eq!(next_batch_width(0.5, 1.0, 0.1, 8, 3), 3);
    }
}
