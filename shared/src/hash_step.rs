//! The per-round ratchet.
//!
//! One step maps a state `x = H·2^128 + L` to `(L·c + H) mod 2^256`, where `c` is the
//! round's four constants read as a 128-bit number. [`hash_step`] spells this out as
//! multiply, add the high half into the low product, then ripple the carry through the
//! high product. [`hash_step_fused`] does the same in a single column pass and is the
//! one the evaluators run; the two must agree bit for bit.

use crate::{
    bigint::{add_limbs, add_scalar_limbs, widen_mul4, BigUint256, LIMBS},
    types::RoundConstants,
};

fn halves(limbs: &[u32; LIMBS]) -> ([u32; 4], [u32; 4]) {
    (
        [limbs[0], limbs[1], limbs[2], limbs[3]],
        [limbs[4], limbs[5], limbs[6], limbs[7]],
    )
}

fn join(lo: [u32; 4], hi: [u32; 4]) -> BigUint256 {
    BigUint256::from_limbs([lo[0], lo[1], lo[2], lo[3], hi[0], hi[1], hi[2], hi[3]])
}

/// Reference definition of a single step.
pub fn hash_step(state: &BigUint256, c: &RoundConstants) -> BigUint256 {
    let (lo, hi) = halves(state.limbs());
    let (p_lo, p_hi) = halves(&widen_mul4(&lo, c.words()));

    let (new_lo, carry) = add_limbs(&p_lo, &hi);
    // the carry enters at the bottom of the high product and may ripple to the top
    let (new_hi, _) = add_scalar_limbs(&p_hi, u32::from(carry));

    join(new_lo, new_hi)
}

/// Single pass over the eight output columns.
///
/// `acc` carries the partial product sums between columns, `carry` carries the `+ H`
/// chain. Column 7 has no partial products and only receives carries.
pub fn hash_step_fused(state: &BigUint256, c: &RoundConstants) -> BigUint256 {
    let x = state.limbs();
    let c = c.words();
    let mut out = [0u32; LIMBS];
    let mut acc: u128 = 0;
    let mut carry: u64 = 0;

    for (col, limb) in out.iter_mut().enumerate() {
        for j in col.saturating_sub(3)..=col.min(3) {
            acc += u128::from(x[j]) * u128::from(c[col - j]);
        }
        let high = if col < 4 { u64::from(x[col + 4]) } else { 0 };
        let t = u64::from(acc as u32) + high + carry;
        *limb = t as u32;
        carry = t >> 32;
        acc >>= 32;
    }

    BigUint256::from_limbs(out)
}

/// Applies `steps` ratchet steps in sequence.
pub fn ratchet(mut state: BigUint256, c: &RoundConstants, steps: u32) -> BigUint256 {
    for _ in 0..steps {
        state = hash_step_fused(&state, c);
    }
    state
}
