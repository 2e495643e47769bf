use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Builds a generator for one fit or split. With no seed the generator is drawn from
/// OS entropy, so repeated runs differ.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    // Box-Muller; `1.0 - u` keeps the log argument in (0, 1].
    let u1: f32 = 1.0 - rng.gen::<f32>();
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

pub fn normal<R: Rng + ?Sized>(rng: &mut R, size: usize, mean: f32, std_dev: f32) -> Vec<f32> {
    (0..size)
        .map(|_| standard_normal(rng) * std_dev + mean)
        .collect()
}

pub fn uniform<R: Rng + ?Sized>(rng: &mut R, size: usize, low: f32, high: f32) -> Vec<f32> {
    (0..size).map(|_| rng.gen_range(low..high)).collect()
}

/// Gaussian vector scaled to unit length.
pub fn unit_gaussian<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<f32> {
    let mut vector = normal(rng, size, 0.0, 1.0);
    crate::utils::normalize_vector(&mut vector);
    vector
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InitializationMethod {
    #[default]
    UnitGaussian,
    Normal { mean: f32, std_dev: f32 },
    Uniform { low: f32, high: f32 },
}

impl InitializationMethod {
    pub fn initialize<R: Rng + ?Sized>(&self, rng: &mut R, size: usize) -> Vec<f32> {
        match self {
            InitializationMethod::UnitGaussian => unit_gaussian(rng, size),
            InitializationMethod::Normal { mean, std_dev } => normal(rng, size, *mean, *std_dev),
            InitializationMethod::Uniform { low, high } => uniform(rng, size, *low, *high),
        }
    }

    /// One factor vector per row, drawn in row order from `rng`.
    pub fn initialize_factors<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        rows: usize,
        rank: usize,
    ) -> Vec<DVector<f32>> {
        (0..rows)
            .map(|_| DVector::from_vec(self.initialize(rng, rank)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_gaussian_has_unit_norm() {
        let mut rng = seeded_rng(Some(7));
        let v = unit_gaussian(&mut rng, 16);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_eq!(v.len(), 16);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let method = InitializationMethod::UnitGaussian;
        let a = method.initialize_factors(&mut seeded_rng(Some(42)), 3, 4);
        let b = method.initialize_factors(&mut seeded_rng(Some(42)), 3, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_within_bounds() {
        let mut rng = seeded_rng(Some(1));
        for value in uniform(&mut rng, 100, -0.5, 0.5) {
            assert!((-0.5..0.5).contains(&value));
        }
    }
}
