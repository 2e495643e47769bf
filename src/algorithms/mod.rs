pub mod initializer;
pub mod solver;

use crate::models::*;
use initializer::InitializationMethod;
use nalgebra::DVector;
use rayon::prelude::*;
use solver::{NormalEquation, SolverError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AlsError {
    #[error("rank must be at least 1")]
    InvalidRank,
    #[error("max_iterations must be at least 1")]
    InvalidIterations,
    #[error("regularization must be finite and non-negative, got {0}")]
    InvalidRegularization(f64),
    #[error("cannot fit a model on an empty ratings set")]
    EmptyTrainingData,
    #[error("rating for user {user_id}, movie {movie_id} is not finite")]
    NonFiniteRating { user_id: u32, movie_id: u32 },
    #[error("failed to solve factors for {side} {id}: {source}")]
    Solve {
        side: &'static str,
        id: u32,
        #[source]
        source: SolverError,
    },
}

/// Anything that can score a (user, movie) pair.
pub trait RatingPredictor: Send + Sync {
    fn predict(&self, user_id: u32, movie_id: u32) -> Option<f32>;

    fn cold_start_strategy(&self) -> ColdStartStrategy {
        ColdStartStrategy::Keep
    }

    /// Scores every row. Rows the model cannot score carry `None`, or are
    /// left out under [`ColdStartStrategy::Drop`].
    fn transform(&self, ratings: &[Rating]) -> Vec<Prediction> {
        let predictions = ratings
            .iter()
            .map(|rating| Prediction::new(rating, self.predict(rating.user_id, rating.movie_id)));

        match self.cold_start_strategy() {
            ColdStartStrategy::Keep => predictions.collect(),
            ColdStartStrategy::Drop => predictions.filter(Prediction::is_defined).collect(),
        }
    }
}

/// Predicts one fixed value for every pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPredictor {
    pub value: f32,
}

impl RatingPredictor for ConstantPredictor {
    fn predict(&self, _user_id: u32, _movie_id: u32) -> Option<f32> {
        Some(self.value)
    }
}

/// Dense re-indexing of sparse ids.
#[derive(Debug, Clone, Default)]
struct IdIndex {
    ids: Vec<u32>,
    positions: HashMap<u32, usize>,
}

impl IdIndex {
    fn insert(&mut self, id: u32) -> usize {
        if let Some(&position) = self.positions.get(&id) {
            return position;
        }
        let position = self.ids.len();
        self.ids.push(id);
        self.positions.insert(id, position);
        position
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Ratings grouped by both sides, in dense index space.
struct RatingBlocks {
    users: IdIndex,
    movies: IdIndex,
    by_user: Vec<Vec<(usize, f32)>>,
    by_movie: Vec<Vec<(usize, f32)>>,
}

impl RatingBlocks {
    fn build(ratings: &[Rating]) -> Result<Self, AlsError> {
        let mut users = IdIndex::default();
        let mut movies = IdIndex::default();
        let mut by_user: Vec<Vec<(usize, f32)>> = Vec::new();
        let mut by_movie: Vec<Vec<(usize, f32)>> = Vec::new();

        for rating in ratings {
            if !rating.rating.is_finite() {
                return Err(AlsError::NonFiniteRating {
                    user_id: rating.user_id,
                    movie_id: rating.movie_id,
                });
            }

            let u = users.insert(rating.user_id);
            let m = movies.insert(rating.movie_id);
            if u == by_user.len() {
                by_user.push(Vec::new());
            }
            if m == by_movie.len() {
                by_movie.push(Vec::new());
            }
            by_user[u].push((m, rating.rating));
            by_movie[m].push((u, rating.rating));
        }

        Ok(Self {
            users,
            movies,
            by_user,
            by_movie,
        })
    }
}

/// Explicit-feedback alternating least squares.
#[derive(Debug, Clone)]
pub struct AlternatingLeastSquares {
    params: AlsParams,
    initialization: InitializationMethod,
}

impl AlternatingLeastSquares {
    pub fn new(params: AlsParams) -> Self {
        Self {
            params,
            initialization: InitializationMethod::default(),
        }
    }

    pub fn with_initialization(mut self, method: InitializationMethod) -> Self {
        self.initialization = method;
        self
    }

    fn validate(&self) -> Result<(), AlsError> {
        if self.params.rank == 0 {
            return Err(AlsError::InvalidRank);
        }
        if self.params.max_iterations == 0 {
            return Err(AlsError::InvalidIterations);
        }
        let reg = self.params.regularization;
        if !reg.is_finite() || reg < 0.0 {
            return Err(AlsError::InvalidRegularization(reg));
        }
        Ok(())
    }

    pub fn fit(&self, ratings: &[Rating]) -> Result<MatrixFactorizationModel, AlsError> {
        self.validate()?;
        if ratings.is_empty() {
            return Err(AlsError::EmptyTrainingData);
        }

        let blocks = RatingBlocks::build(ratings)?;
        let rank = self.params.rank;
        info!(
            "Fitting ALS rank={} iterations={} regularization={} on {} ratings ({} users, {} movies)",
            rank,
            self.params.max_iterations,
            self.params.regularization,
            ratings.len(),
            blocks.users.len(),
            blocks.movies.len()
        );

        let mut rng = initializer::seeded_rng(self.params.seed);
        let mut user_factors = self
            .initialization
            .initialize_factors(&mut rng, blocks.users.len(), rank);
        let mut movie_factors = self
            .initialization
            .initialize_factors(&mut rng, blocks.movies.len(), rank);

        for iteration in 0..self.params.max_iterations {
            movie_factors =
                self.solve_side(&blocks.by_movie, &user_factors, &blocks.movies, "movie")?;
            user_factors =
                self.solve_side(&blocks.by_user, &movie_factors, &blocks.users, "user")?;
            debug!(
                "ALS iteration {} training rmse {:.5}",
                iteration + 1,
                training_rmse(&blocks, &user_factors, &movie_factors)
            );
        }

        Ok(MatrixFactorizationModel {
            params: self.params,
            user_index: blocks.users.positions,
            movie_index: blocks.movies.positions,
            user_factors,
            movie_factors,
        })
    }

    /// Re-solves every factor on one side with the other side held fixed.
    fn solve_side(
        &self,
        observations: &[Vec<(usize, f32)>],
        fixed: &[DVector<f32>],
        index: &IdIndex,
        side: &'static str,
    ) -> Result<Vec<DVector<f32>>, AlsError> {
        let rank = self.params.rank;
        let regularization = self.params.regularization;

        observations
            .par_iter()
            .enumerate()
            .map_init(
                || NormalEquation::new(rank),
                |ne, (position, rated)| {
                    ne.reset();
                    for &(other, rating) in rated {
                        ne.add(&fixed[other], rating);
                    }
                    ne.solve(regularization).map_err(|source| AlsError::Solve {
                        side,
                        id: index.ids[position],
                        source,
                    })
                },
            )
            .collect()
    }
}

fn training_rmse(
    blocks: &RatingBlocks,
    user_factors: &[DVector<f32>],
    movie_factors: &[DVector<f32>],
) -> f64 {
    let (sum, count) = blocks
        .by_user
        .iter()
        .enumerate()
        .flat_map(|(u, rated)| rated.iter().map(move |&(m, r)| (u, m, r)))
        .fold((0.0f64, 0usize), |(sum, count), (u, m, r)| {
            let err = (user_factors[u].dot(&movie_factors[m]) - r) as f64;
            (sum + err * err, count + 1)
        });

    if count > 0 {
        (sum / count as f64).sqrt()
    } else {
        0.0
    }
}

/// User and movie factors learned by [`AlternatingLeastSquares::fit`].
#[derive(Debug, Clone)]
pub struct MatrixFactorizationModel {
    params: AlsParams,
    user_index: HashMap<u32, usize>,
    movie_index: HashMap<u32, usize>,
    user_factors: Vec<DVector<f32>>,
    movie_factors: Vec<DVector<f32>>,
}

impl MatrixFactorizationModel {
    pub fn rank(&self) -> usize {
        self.params.rank
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.len()
    }

    pub fn num_movies(&self) -> usize {
        self.movie_factors.len()
    }

    pub fn knows_user(&self, user_id: u32) -> bool {
        self.user_index.contains_key(&user_id)
    }

    pub fn user_factors(&self, user_id: u32) -> Option<&DVector<f32>> {
        self.user_index.get(&user_id).map(|&i| &self.user_factors[i])
    }

    pub fn movie_factors(&self, movie_id: u32) -> Option<&DVector<f32>> {
        self.movie_index.get(&movie_id).map(|&i| &self.movie_factors[i])
    }

    /// Movie ids with learned factors, in no particular order.
    pub fn movie_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.movie_index.keys().copied()
    }
}

impl RatingPredictor for MatrixFactorizationModel {
    fn predict(&self, user_id: u32, movie_id: u32) -> Option<f32> {
        let user = self.user_factors(user_id)?;
        let movie = self.movie_factors(movie_id)?;
        Some(user.dot(movie))
    }

    fn cold_start_strategy(&self) -> ColdStartStrategy {
        self.params.cold_start_strategy
    }
}
