use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter},
    ops::BitXor,
};

use serde::{Deserialize, Serialize};

/// Number of 32-bit limbs in a [`BigUint256`].
pub const LIMBS: usize = 8;

/// 2^256 as `f64`, one past the largest proof. Only used for progress ratios.
pub const WORST_SCORE: f64 = 1.157920892373162e77;

const LIMB_RADIX: f64 = 4294967296.0;

/// A 256-bit unsigned integer stored as 8 little-endian 32-bit limbs.
///
/// Every operation is reduced modulo 2^256: carry out of the top limb is
/// reported (where an operation reports it) and otherwise dropped.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BigUint256 {
    limbs: [u32; LIMBS],
}

impl BigUint256 {
    pub const ZERO: Self = Self { limbs: [0; LIMBS] };
    pub const ONES: Self = Self { limbs: [u32::MAX; LIMBS] };

    pub const fn zero() -> Self {
        Self::ZERO
    }

    pub const fn all_ones() -> Self {
        Self::ONES
    }

    pub const fn from_limbs(limbs: [u32; LIMBS]) -> Self {
        Self { limbs }
    }

    /// Limbs, least significant first.
    pub const fn limbs(&self) -> &[u32; LIMBS] {
        &self.limbs
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|limb| *limb == 0)
    }

    /// Ripple-carry addition, returning the truncated sum and the carry out of limb 7.
    pub fn overflowing_add(&self, rhs: &Self) -> (Self, bool) {
        let (limbs, carry) = add_limbs(&self.limbs, &rhs.limbs);
        (Self { limbs }, carry)
    }

    /// Adds a single word at limb 0 and propagates the carry upward.
    pub fn overflowing_add_u32(&self, rhs: u32) -> (Self, bool) {
        let (limbs, carry) = add_scalar_limbs(&self.limbs, rhs);
        (Self { limbs }, carry)
    }

    pub fn xor(&self, rhs: &Self) -> Self {
        let mut limbs = self.limbs;
        for (limb, other) in limbs.iter_mut().zip(rhs.limbs.iter()) {
            *limb ^= other;
        }
        Self { limbs }
    }

    /// Unsigned comparison, most significant limb first.
    pub fn compare(&self, rhs: &Self) -> Ordering {
        for (a, b) in self.limbs.iter().rev().zip(rhs.limbs.iter().rev()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    /// Lossy magnitude for human readable scores. Never use it to rank proofs.
    pub fn approx_magnitude(&self) -> f64 {
        self.limbs.iter().rev().fold(0.0, |acc, limb| acc * LIMB_RADIX + f64::from(*limb))
    }
}

impl Ord for BigUint256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for BigUint256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BitXor for BigUint256 {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.xor(&rhs)
    }
}

impl Display for BigUint256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for limb in self.limbs.iter().rev() {
            write!(f, "{limb:08x}")?;
        }
        Ok(())
    }
}

impl Debug for BigUint256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BigUint256({:?})", self.limbs)
    }
}

/// `a + b` over `N` limbs, returning the carry out of the top limb.
pub fn add_limbs<const N: usize>(a: &[u32; N], b: &[u32; N]) -> ([u32; N], bool) {
    let mut out = [0u32; N];
    let mut carry = false;
    for i in 0..N {
        let (partial, c1) = a[i].overflowing_add(b[i]);
        let (sum, c2) = partial.overflowing_add(u32::from(carry));
        out[i] = sum;
        carry = c1 || c2;
    }
    (out, carry)
}

/// `a + b` where `b` enters at the bottom limb and ripples through all `N` limbs.
pub fn add_scalar_limbs<const N: usize>(a: &[u32; N], b: u32) -> ([u32; N], bool) {
    let mut out = *a;
    let mut carry = b;
    for limb in out.iter_mut() {
        if carry == 0 {
            break;
        }
        let (sum, overflow) = limb.overflowing_add(carry);
        *limb = sum;
        carry = u32::from(overflow);
    }
    (out, carry != 0)
}

/// Full 128x128 -> 256 bit schoolbook product, limbs least significant first.
pub fn widen_mul4(a: &[u32; 4], b: &[u32; 4]) -> [u32; 8] {
    let mut out = [0u32; 8];
    for (i, &ai) in a.iter().enumerate() {
        let mut carry = 0u64;
        for (j, &bj) in b.iter().enumerate() {
            // (2^32-1)^2 + 2(2^32-1) == 2^64-1, so this never overflows
            let t = u64::from(ai) * u64::from(bj) + u64::from(out[i + j]) + carry;
            out[i + j] = t as u32;
            carry = t >> 32;
        }
        out[i + 4] = carry as u32;
    }
    out
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn big(limbs: &[u32]) -> BigUint {
        BigUint::from_slice(limbs)
    }

    fn random(rng: &mut StdRng) -> BigUint256 {
        BigUint256::from_limbs(rng.gen())
    }

    #[test]
    fn constants() {
        assert!(BigUint256::zero().is_zero());
        assert_eq!(BigUint256::all_ones().limbs(), &[u32::MAX; LIMBS]);
        assert!(BigUint256::zero() < BigUint256::all_ones());
    }

    #[test]
    fn widen_mul4_matches_reference() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cases: Vec<([u32; 4], [u32; 4])> =
            vec![([u32::MAX; 4], [u32::MAX; 4]), ([0; 4], [u32::MAX; 4]), ([1, 0, 0, 0], [u32::MAX; 4])];
        for _ in 0..500 {
            cases.push((rng.gen(), rng.gen()));
        }

        for (a, b) in cases {
            let product = widen_mul4(&a, &b);
            assert_eq!(big(&product), big(&a) * big(&b), "a={a:?} b={b:?}");
        }
    }

    #[test]
    fn add_carry_matches_reference() {
        let mut rng = StdRng::seed_from_u64(11);
        let modulus = BigUint::from(1u8) << 256u32;
        let mut cases = vec![
            (BigUint256::ONES, BigUint256::from_limbs([1, 0, 0, 0, 0, 0, 0, 0])),
            (BigUint256::ONES, BigUint256::ONES),
            (BigUint256::ZERO, BigUint256::ZERO),
        ];
        for _ in 0..500 {
            cases.push((random(&mut rng), random(&mut rng)));
        }

        for (a, b) in cases {
            let (sum, carry) = a.overflowing_add(&b);
            let expected = big(a.limbs()) + big(b.limbs());
            let got = big(sum.limbs()) + if carry { modulus.clone() } else { BigUint::from(0u8) };
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn scalar_carry_ripples_through_every_limb() {
        let (sum, carry) = BigUint256::ONES.overflowing_add_u32(1);
        assert!(sum.is_zero());
        assert!(carry);

        let lower = BigUint256::from_limbs([u32::MAX, u32::MAX, u32::MAX, 0, 0, 0, 0, 9]);
        let (sum, carry) = lower.overflowing_add_u32(2);
        assert_eq!(sum.limbs(), &[1, 0, 0, 1, 0, 0, 0, 9]);
        assert!(!carry);

        let (out, carry) = add_scalar_limbs(&[u32::MAX; 4], 1);
        assert_eq!(out, [0; 4]);
        assert!(carry);
    }

    #[test]
    fn compare_is_most_significant_first() {
        let high = BigUint256::from_limbs([0, 0, 0, 0, 0, 0, 0, 1]);
        let mut limbs = [u32::MAX; LIMBS];
        limbs[7] = 0;
        let low = BigUint256::from_limbs(limbs);
        assert_eq!(high.compare(&low), Ordering::Greater);
        assert_eq!(low.compare(&high), Ordering::Less);
        assert_eq!(low.compare(&low), Ordering::Equal);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let (a, b) = (random(&mut rng), random(&mut rng));
            assert_eq!(a.compare(&b), big(a.limbs()).cmp(&big(b.limbs())));
        }
    }

    #[test]
    fn xor_is_limb_wise() {
        let a = BigUint256::from_limbs([1, 2, 3, 4, 5, 6, 7, 8]);
        let b = BigUint256::from_limbs([1, 1, 1, 1, 1, 1, 1, 1]);
        assert_eq!((a ^ b).limbs(), &[0, 3, 2, 5, 4, 7, 6, 9]);
        assert!((a ^ a).is_zero());
    }

    #[test]
    fn approx_magnitude_and_display() {
        assert_eq!(BigUint256::ZERO.approx_magnitude(), 0.0);
        assert_eq!(BigUint256::from_limbs([5, 1, 0, 0, 0, 0, 0, 0]).approx_magnitude(), 4294967301.0);
        let ratio = WORST_SCORE / BigUint256::ONES.approx_magnitude();
        assert!((ratio - 1.0).abs() < 1e-12);

        let value = BigUint256::from_limbs([0xdeadbeef, 0, 0, 0, 0, 0, 0, 0x1]);
        assert_eq!(value.to_string(), format!("00000001{}deadbeef", "0".repeat(48)));
    }
}
