use std::{fs::File, io::BufReader, path::Path};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use shared::{
    deadline::SAFETY_MARGIN_SECS,
    errors::{MinerError, MinerResult},
};

/// How a batch gets evaluated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Sequential,
    Pool,
    /// Pool for periods of at least `pool_threshold_secs`, sequential below.
    #[default]
    Auto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    pub strategy: Strategy,
    /// Worker threads; defaults to the logical CPU count.
    pub cores: Option<usize>,
    /// Candidates per worker per batch.
    pub batch_per_core: usize,
    /// Fixed batch width, overriding `batch_per_core`.
    pub batch_size: Option<usize>,
    /// Share of the remaining budget one batch may take once its cost is measured.
    pub batch_budget_fraction: f64,
    pub safety_margin_secs: f64,
    pub pool_threshold_secs: f64,
    pub pin_cores: bool,
    /// Seed for reproducible candidates.
    pub seed: Option<u64>,
    pub verify_best: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            cores: None,
            batch_per_core: 16,
            batch_size: None,
            batch_budget_fraction: 0.1,
            safety_margin_secs: SAFETY_MARGIN_SECS,
            pool_threshold_secs: 1.0,
            pin_cores: true,
            seed: None,
            verify_best: true,
        }
    }
}

impl MinerConfig {
    pub fn cores(&self) -> usize {
        self.cores.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Batch width for `workers` evaluating threads, never below one.
    pub fn batch_width(&self, workers: usize) -> usize {
        self.batch_size.unwrap_or(self.batch_per_core.saturating_mul(workers)).max(1)
    }
}

pub fn load_config_file<P>(config_file: P) -> MinerResult<MinerConfig>
where
    P: AsRef<Path>, {
    let path = config_file.as_ref();
    let file = File::open(path)
        .map_err(|err| MinerError::Config(format!("{}: {err}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| MinerError::Config(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: MinerConfig = serde_json::from_str(r#"{ "strategy": "pool", "cores": 4, "seed": 9 }"#).unwrap();
        assert_eq!(config.strategy, Strategy::Pool);
        assert_eq!(config.cores(), 4);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.batch_width(4), 64);
        assert_eq!(config.safety_margin_secs, SAFETY_MARGIN_SECS);
        assert_eq!(config.batch_budget_fraction, 0.1);
        assert!(config.verify_best);
    }

    #[test]
    fn batch_width_is_at_least_one() {
        let config = MinerConfig { batch_size: Some(0), ..Default::default() };
        assert_eq!(config.batch_width(8), 1);
        let config = MinerConfig { batch_per_core: 0, ..Default::default() };
        assert_eq!(config.batch_width(8), 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<MinerConfig>(r#"{ "gpu": true }"#).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_config_file("/nonexistent/bidder.json").unwrap_err();
        assert!(matches!(err, MinerError::Config(_)));
    }
}
