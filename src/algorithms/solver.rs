use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("normal equation has no observations")]
    Empty,
    #[error("normal equation is singular")]
    Singular,
}

/// Accumulates `AᵀA` and `Aᵀb` for one least-squares subproblem.
#[derive(Debug, Clone)]
pub struct NormalEquation {
    ata: DMatrix<f64>,
    atb: DVector<f64>,
    count: usize,
}

impl NormalEquation {
    pub fn new(rank: usize) -> Self {
        Self {
            ata: DMatrix::zeros(rank, rank),
            atb: DVector::zeros(rank),
            count: 0,
        }
    }

    pub fn rank(&self) -> usize {
        self.atb.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn add(&mut self, factor: &DVector<f32>, rating: f32) {
        let y = factor.map(|x| x as f64);
        self.ata.ger(1.0, &y, &y, 1.0);
        self.atb.axpy(rating as f64, &y, 1.0);
        self.count += 1;
    }

    pub fn reset(&mut self) {
        self.ata.fill(0.0);
        self.atb.fill(0.0);
        self.count = 0;
    }

    /// Solves `(AᵀA + λ·n·I) x = Aᵀb`, where `n` is the number of
    /// observations added.
    pub fn solve(&self, regularization: f64) -> Result<DVector<f32>, SolverError> {
        if self.count == 0 {
            return Err(SolverError::Empty);
        }

        let mut lhs = self.ata.clone();
        let lambda = regularization * self.count as f64;
        for i in 0..self.rank() {
            lhs[(i, i)] += lambda;
        }

        let solution = match lhs.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&self.atb),
            None => lhs.lu().solve(&self.atb).ok_or(SolverError::Singular)?,
        };

        if solution.iter().all(|x| x.is_finite()) {
            Ok(solution.map(|x| x as f32))
        } else {
            Err(SolverError::Singular)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_solution_without_regularization() {
        // Observations of y·x with x = (2, -1).
        let mut ne = NormalEquation::new(2);
        ne.add(&DVector::from_vec(vec![1.0, 0.0]), 2.0);
        ne.add(&DVector::from_vec(vec![0.0, 1.0]), -1.0);
        ne.add(&DVector::from_vec(vec![1.0, 1.0]), 1.0);

        let x = ne.solve(0.0).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-5);
        assert!((x[1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_regularization_shrinks_solution() {
        let mut ne = NormalEquation::new(1);
        ne.add(&DVector::from_vec(vec![1.0]), 4.0);

        // (1 + 1·1) x = 4
        let x = ne.solve(1.0).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_and_singular_systems() {
        let ne = NormalEquation::new(2);
        assert_eq!(ne.solve(0.1), Err(SolverError::Empty));

        let mut ne = NormalEquation::new(2);
        ne.add(&DVector::from_vec(vec![1.0, 1.0]), 1.0);
        assert_eq!(ne.solve(0.0), Err(SolverError::Singular));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut ne = NormalEquation::new(2);
        ne.add(&DVector::from_vec(vec![1.0, 2.0]), 3.0);
        ne.reset();
        assert_eq!(ne.count(), 0);
        assert_eq!(ne.solve(0.1), Err(SolverError::Empty));
    }
}
