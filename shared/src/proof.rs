use crate::{
    bigint::BigUint256,
    errors::{MinerError, MinerResult},
    hash_step::{hash_step, ratchet},
    types::{Proof, RoundContext},
};

/// Initial state for `index`.
///
/// Limbs, low to high: `[index, 0, id, id, salt, salt, digest, digest]`, each of
/// `round_id`, `round_salt` and `chain_digest` contributing its low 32 bits twice.
pub fn seed(index: u32, ctx: &RoundContext) -> BigUint256 {
    let id = ctx.round_id as u32;
    let salt = ctx.round_salt as u32;
    let digest = ctx.chain_digest as u32;
    BigUint256::from_limbs([index, 0, id, id, salt, salt, digest, digest])
}

/// `seed(index)` advanced by `ctx.hash_steps` ratchet steps.
pub fn evaluate(index: u32, ctx: &RoundContext) -> BigUint256 {
    ratchet(seed(index, ctx), &ctx.c, ctx.hash_steps)
}

/// XOR of the evaluated indices. An empty candidate folds to zero.
pub fn combine(indices: &[u32], ctx: &RoundContext) -> Proof {
    indices.iter().fold(Proof::ZERO, |proof, index| proof ^ evaluate(*index, ctx))
}

/// Rebuilds the proof through the reference step and checks the index sequence.
pub fn verify(indices: &[u32], proof: &Proof, ctx: &RoundContext) -> MinerResult<()> {
    if indices.first() == Some(&0) {
        return Err(MinerError::InvalidIndices("index 0 is not allowed".to_string()));
    }
    if let Some(pair) = indices.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(MinerError::InvalidIndices(format!(
            "indices are not strictly increasing: {} then {}",
            pair[0], pair[1]
        )));
    }

    let expected = indices.iter().fold(Proof::ZERO, |proof, index| {
        let mut state = seed(*index, ctx);
        for _ in 0..ctx.hash_steps {
            state = hash_step(&state, &ctx.c);
        }
        proof ^ state
    });

    if expected == *proof {
        Ok(())
    } else {
        Err(MinerError::ProofMismatch)
    }
}
