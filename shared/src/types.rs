use serde::{Deserialize, Serialize};

use crate::{
    bigint::BigUint256,
    errors::{MinerError, MinerResult},
    utils::{chain_digest, now_nanos},
};

/// Hard ceiling on indices per candidate; keeps every generated index far below `u32::MAX`.
pub const MAX_INDICES: u32 = 65_536;

/// Hard ceiling on ratchet steps per index.
pub const MAX_HASH_STEPS: u32 = 1 << 24;

/// XOR-fold of the ratchet outputs of one candidate. Lower is better.
pub type Proof = BigUint256;

/// Strictly increasing, positive indices for one candidate.
pub type CandidateIndices = Vec<u32>;

/// The four words driving every hash step of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundConstants(pub [u32; 4]);

impl RoundConstants {
    pub fn words(&self) -> &[u32; 4] {
        &self.0
    }
}

/// Per-round inputs supplied by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContext {
    pub round_id: u64,
    pub round_salt: u64,
    pub chain_digest: u64,
    pub hash_steps: u32,
    pub max_indices: u32,
    pub c: RoundConstants,
}

impl RoundContext {
    /// Builds a context whose chain digest is the FNV-1a hash of the round's chain data.
    pub fn with_chain_data(
        round_id: u64,
        round_salt: u64,
        chain_data: &[u8],
        hash_steps: u32,
        max_indices: u32,
        c: RoundConstants,
    ) -> Self {
        Self {
            round_id,
            round_salt,
            chain_digest: chain_digest(chain_data),
            hash_steps,
            max_indices,
            c,
        }
    }

    pub fn validate(&self) -> MinerResult<()> {
        if self.max_indices > MAX_INDICES {
            return Err(MinerError::InvalidRound(format!(
                "max_indices {} exceeds limit {MAX_INDICES}",
                self.max_indices
            )));
        }
        if self.hash_steps > MAX_HASH_STEPS {
            return Err(MinerError::InvalidRound(format!(
                "hash_steps {} exceeds limit {MAX_HASH_STEPS}",
                self.hash_steps
            )));
        }
        Ok(())
    }
}

/// Timing of one bid request, as seen by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidWindow {
    /// Server-side instant after which bids are rejected, nanoseconds since the Unix epoch.
    pub server_receive_deadline_nanos: u64,
    /// Positive when the local clock runs ahead of the server.
    pub clock_skew_estimate_seconds: f64,
    pub period_seconds: f64,
}

impl BidWindow {
    /// A window whose server deadline lies `period_seconds` from now, assuming no skew.
    pub fn ending_in(period_seconds: f64) -> Self {
        let period_nanos = (period_seconds.max(0.0) * 1e9) as i64;
        let deadline = now_nanos().saturating_add(period_nanos).max(0) as u64;
        Self {
            server_receive_deadline_nanos: deadline,
            clock_skew_estimate_seconds: 0.0,
            period_seconds,
        }
    }
}

/// Best candidate seen so far and its proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestResult {
    pub indices: CandidateIndices,
    pub proof: Proof,
}

impl BestResult {
    /// The starting point of every search: no indices and the largest possible proof.
    pub fn worst() -> Self {
        Self { indices: vec![], proof: Proof::ONES }
    }

    /// Replaces the current best when `proof` is strictly lower. Ties keep the earlier find.
    pub fn offer(&mut self, indices: &[u32], proof: &Proof) -> bool {
        if proof < &self.proof {
            self.indices = indices.to_vec();
            self.proof = *proof;
            true
        } else {
            false
        }
    }
}

impl Default for BestResult {
    fn default() -> Self {
        Self::worst()
    }
}
