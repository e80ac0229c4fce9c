// ============================================================
// Layer 3 — Probe Tensor
// ============================================================
// Random input shaped to an artifact's contract. Only the
// shape matters to the verifier; the values are standard
// normal noise and are never persisted.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::shape::ShapeContract;

/// Row-major f32 data with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTensor {
    shape: Vec<usize>,
    data:  Vec<f32>,
}

impl ProbeTensor {
    /// Draw `shape.iter().product()` standard normal values.
    pub fn standard_normal<R: Rng + ?Sized>(shape: Vec<usize>, rng: &mut R) -> Self {
        let len = shape.iter().product();
        let data = (0..len).map(|_| rng.sample::<f32, _>(StandardNormal)).collect();
        Self { shape, data }
    }

    /// A probe for `contract` at the given batch size.
    pub fn for_contract<R: Rng + ?Sized>(contract: &ShapeContract, batch: usize, rng: &mut R) -> Self {
        Self::standard_normal(contract.concrete(batch), rng)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_probe_matches_contract() {
        let mut rng = StdRng::seed_from_u64(7);
        let probe = ProbeTensor::for_contract(&ShapeContract::ecg(), 2, &mut rng);
        assert_eq!(probe.shape(), &[2, 2500, 1]);
        assert_eq!(probe.data().len(), 5000);
    }

    #[test]
    fn test_probe_values_are_finite_and_not_constant() {
        let mut rng = StdRng::seed_from_u64(11);
        let probe = ProbeTensor::standard_normal(vec![1, 100, 1], &mut rng);
        assert!(probe.data().iter().all(|v| v.is_finite()));
        let first = probe.data()[0];
        assert!(probe.data().iter().any(|&v| v != first));
    }
}
