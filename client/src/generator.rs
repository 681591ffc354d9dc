use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::types::CandidateIndices;

/// Smallest and largest gap between consecutive indices.
pub const MIN_GAP: u32 = 1;
pub const MAX_GAP: u32 = 10;

/// A batch of candidates, shared read-only with the evaluator that scores it.
pub type Batch = Arc<[CandidateIndices]>;

/// Random walk over the positive integers.
///
/// Each owner gets its own generator; nothing here is global.
pub struct CandidateGenerator {
    rng: StdRng,
}

impl CandidateGenerator {
    /// Seeded generators repeat their candidates; unseeded ones draw from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// One candidate of `max_indices` indices, each gap uniform in `[MIN_GAP, MAX_GAP]`.
    pub fn generate(&mut self, max_indices: u32) -> CandidateIndices {
        let rng = &mut self.rng;
        let mut cursor = 0u32;
        (0..max_indices)
            .map(|_| {
                cursor += rng.gen_range(MIN_GAP..=MAX_GAP);
                cursor
            })
            .collect()
    }

    pub fn batch(&mut self, size: usize, max_indices: u32) -> Batch {
        (0..size).map(|_| self.generate(max_indices)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_strictly_increase() {
        let mut generator = CandidateGenerator::new(Some(1));
        for _ in 0..200 {
            let indices = generator.generate(64);
            assert_eq!(indices.len(), 64);
            assert!((MIN_GAP..=MAX_GAP).contains(&indices[0]));
            for pair in indices.windows(2) {
                let gap = pair[1] - pair[0];
                assert!((MIN_GAP..=MAX_GAP).contains(&gap), "gap {gap}");
            }
        }
    }

    #[test]
    fn seeded_generators_repeat() {
        let mut a = CandidateGenerator::new(Some(99));
        let mut b = CandidateGenerator::new(Some(99));
        assert_eq!(a.batch(8, 16), b.batch(8, 16));

        let mut c = CandidateGenerator::new(Some(100));
        assert_ne!(a.generate(32), c.generate(32));
    }

    #[test]
    fn zero_length_candidates_are_empty() {
        let mut generator = CandidateGenerator::new(None);
        assert!(generator.generate(0).is_empty());
        let batch = generator.batch(3, 0);
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn largest_round_stays_in_range() {
        let mut generator = CandidateGenerator::new(Some(5));
        let indices = generator.generate(shared::types::MAX_INDICES);
        assert!(*indices.last().unwrap_or(&0) <= shared::types::MAX_INDICES * MAX_GAP);
    }
}
