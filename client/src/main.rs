use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use bid_client::{load_config_file, Miner, MinerConfig, Strategy};
use clap::Parser;
use colored::Colorize;
use rand::Rng;
use shared::{
    bigint::WORST_SCORE,
    timestamp,
    types::{BidWindow, RoundConstants, RoundContext},
    utils::format_duration,
};
use tokio::{signal, task};
use tracing::*;

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    #[arg(long, value_name = "CONFIG_FILE", help = "JSON miner config")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "CORES_COUNT", help = "The number of worker threads")]
    cores: Option<usize>,

    #[arg(long, value_enum, help = "How batches are evaluated")]
    strategy: Option<Strategy>,

    #[arg(long, value_name = "BATCH", help = "Candidates per batch")]
    batch: Option<usize>,

    #[arg(long, help = "Seed for reproducible candidates")]
    seed: Option<u64>,

    #[arg(long, default_value_t = 3, help = "Synthetic rounds to bid on")]
    rounds: u32,

    #[arg(long, default_value_t = 2.0, help = "Bid period of each round in seconds")]
    period: f64,

    #[arg(long, default_value_t = 16, help = "Ratchet steps per index")]
    hash_steps: u32,

    #[arg(long, default_value_t = 16, help = "Indices per candidate")]
    max_indices: u32,

    #[arg(long, value_name = "DIRECTIVE", help = "Extra log directive, e.g. bid_client=debug")]
    log: Option<String>,
}

impl Args {
    fn miner_config(&self) -> anyhow::Result<MinerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path).context("failed to load miner config")?,
            None => MinerConfig::default(),
        };
        if let Some(cores) = self.cores {
            config.cores = Some(cores);
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if self.batch.is_some() {
            config.batch_size = self.batch;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

/// Stand-in for the protocol layer: a fresh random round.
fn synthetic_round(args: &Args) -> RoundContext {
    let mut rng = rand::thread_rng();
    let chain_data: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
    RoundContext::with_chain_data(
        timestamp() as u64,
        rng.gen(),
        &chain_data,
        args.hash_steps,
        args.max_indices,
        RoundConstants(rng.gen()),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    shared::log::init_log(args.log.as_deref());

    let config = args.miner_config()?;
    info!(
        "Client Starting... VERSION: {}, Threads: {}, Strategy: {:?}",
        env!("CARGO_PKG_VERSION"),
        config.cores(),
        config.strategy
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let clone_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("ctrl+c received, stopping after the current round");
            clone_shutdown.store(true, Ordering::SeqCst);
        }
    });

    let mut miner = Miner::new(config);

    for round in 1..=args.rounds {
        if shutdown.load(Ordering::SeqCst) {
            warn!("shutdown flag is set. exiting...");
            break;
        }

        info!("{}", format!("======================== round {round} ========================").bold().red());

        let ctx = synthetic_round(&args);
        let window = BidWindow::ending_in(args.period);

        // the search is CPU bound, keep it off the async workers
        let (returned, result) = task::spawn_blocking(move || {
            let result = miner.make_bid(&ctx, &window);
            (miner, result)
        })
        .await
        .context("bid task panicked")?;
        miner = returned;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("round {round} failed: {err}");
                continue;
            }
        };

        let score = outcome.best.proof.approx_magnitude();
        info!(
            "bid: {} indices, proof: {}, ratio: {:e}",
            outcome.best.indices.len(),
            outcome.best.proof,
            WORST_SCORE / score
        );
        info!(
            "evaluator: {}{}, trials: {}, time: {}, rate: {:.1} trials/s",
            outcome.evaluator,
            if outcome.degraded { " (degraded)" } else { "" },
            outcome.trials,
            format_duration(outcome.elapsed.as_secs_f64()),
            outcome.trial_rate()
        );
    }

    info!("{}", format!("rounds done, strategy: {:?}", miner.config().strategy).green());
    Ok(())
}
