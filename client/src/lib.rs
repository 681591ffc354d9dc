pub mod config;
mod container;
pub mod evaluator;
pub mod generator;
pub mod scheduler;
mod thread;


pub use config::{load_config_file, MinerConfig, Strategy};
pub use evaluator::{BatchEvaluator, Sequential, WorkerPool};
pub use generator::{Batch, CandidateGenerator};
pub use scheduler::{search, BidOutcome, Miner, SearchOptions};
