use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A row of `ratings.csv` as it sits on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRating {
    #[serde(rename = "userId")]
    pub user_id: u32,
    #[serde(rename = "movieId")]
    pub movie_id: u32,
    pub rating: f32,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A row of `movies.csv` as it sits on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMovie {
    #[serde(rename = "movieId", alias = "id", alias = "ID")]
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub genres: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: u32,
    pub movie_id: u32,
    pub rating: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u32,
    pub title: String,
}

impl From<RawRating> for Rating {
    fn from(raw: RawRating) -> Self {
        Self {
            user_id: raw.user_id,
            movie_id: raw.movie_id,
            rating: raw.rating,
        }
    }
}

impl From<RawMovie> for Movie {
    fn from(raw: RawMovie) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
        }
    }
}

impl Rating {
    pub fn new(user_id: u32, movie_id: u32, rating: f32) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
        }
    }
}

/// A scored rating. `prediction` is `None` when the model has no factors for
/// the user or the movie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub user_id: u32,
    pub movie_id: u32,
    pub rating: f32,
    pub prediction: Option<f32>,
}

impl Prediction {
    pub fn new(rating: &Rating, prediction: Option<f32>) -> Self {
        Self {
            user_id: rating.user_id,
            movie_id: rating.movie_id,
            rating: rating.rating,
            prediction,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.prediction.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColdStartStrategy {
    /// Emit a prediction row with no value.
    #[default]
    Keep,
    /// Omit rows whose user or movie was not seen in training.
    Drop,
}

/// Hyperparameters for one ALS fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlsParams {
    pub rank: usize,
    pub max_iterations: usize,
    pub regularization: f64,
    pub seed: Option<u64>,
    pub cold_start_strategy: ColdStartStrategy,
}

impl Default for AlsParams {
    fn default() -> Self {
        Self {
            rank: 10,
            max_iterations: 5,
            regularization: 0.1,
            seed: None,
            cold_start_strategy: ColdStartStrategy::Keep,
        }
    }
}

impl AlsParams {
    pub fn new(rank: usize, max_iterations: usize, regularization: f64) -> Self {
        Self {
            rank,
            max_iterations,
            regularization,
            ..Self::default()
        }
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cold_start_strategy(mut self, strategy: ColdStartStrategy) -> Self {
        self.cold_start_strategy = strategy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePopularity {
    pub movie_id: u32,
    pub title: String,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankEvaluation {
    pub rank: usize,
    pub rmse: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub movie_id: u32,
    pub title: Option<String>,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub raw_ratings: usize,
    pub ratings: usize,
    pub raw_movies: usize,
    pub movies: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitSizes {
    pub training: usize,
    pub validation: usize,
    pub test: usize,
}

impl SplitSizes {
    pub fn total(&self) -> usize {
        self.training + self.validation + self.test
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub dataset: DatasetSummary,
    pub splits: SplitSizes,
    pub popular_movies: Vec<MoviePopularity>,
    pub rank_evaluations: Vec<RankEvaluation>,
    pub best_rank: usize,
    pub validation_rmse: f64,
    pub test_rmse: f64,
    pub training_average: f64,
    pub baseline_rmse: f64,
    pub recommendations: Option<UserRecommendations>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecommendations {
    pub user_id: u32,
    pub items: Vec<RecommendationItem>,
}

impl EvaluationReport {
    /// How much lower the trained model's test error is than the baseline's.
    pub fn improvement_over_baseline(&self) -> f64 {
        if self.baseline_rmse > 0.0 {
            (self.baseline_rmse - self.test_rmse) / self.baseline_rmse
        } else {
            0.0
        }
    }
}
