use crate::models::{AlsParams, ColdStartStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub als: AlsConfig,
    pub popularity: PopularityConfig,
    pub validation: ValidationConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub ratings_path: PathBuf,
    pub movies_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Relative sizes of the training, validation and test splits.
    pub weights: [f64; 3],
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlsConfig {
    pub max_iterations: usize,
    pub regularization: f64,
    pub candidate_ranks: Vec<usize>,
    pub seed: Option<u64>,
    pub cold_start_strategy: ColdStartStrategy,
}

impl AlsConfig {
    /// Parameters shared by every candidate; the rank is filled in per candidate.
    pub fn base_params(&self) -> AlsParams {
        AlsParams {
            rank: self.candidate_ranks.first().copied().unwrap_or(1),
            max_iterations: self.max_iterations,
            regularization: self.regularization,
            seed: self.seed,
            cold_start_strategy: self.cold_start_strategy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularitySort {
    Count,
    Average,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularityConfig {
    /// Movies need strictly more ratings than this to be listed.
    pub min_ratings: usize,
    pub top_n: usize,
    pub sort_by: PopularitySort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownRating {
    pub user_id: u32,
    pub movie_id: u32,
    pub rating: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub expected_ratings: Option<usize>,
    pub expected_movies: Option<usize>,
    pub known_title: Option<String>,
    pub known_rating: Option<KnownRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                ratings_path: PathBuf::from("data/ratings.csv"),
                movies_path: PathBuf::from("data/movies.csv"),
            },
            split: SplitConfig {
                weights: [0.6, 0.2, 0.2],
                seed: None,
            },
            als: AlsConfig {
                max_iterations: 5,
                regularization: 0.1,
                candidate_ranks: vec![4, 8, 12],
                seed: None,
                cold_start_strategy: ColdStartStrategy::Keep,
            },
            popularity: PopularityConfig {
                min_ratings: 500,
                top_n: 20,
                sort_by: PopularitySort::Count,
            },
            validation: ValidationConfig {
                enabled: true,
                expected_ratings: Some(20_000_263),
                expected_movies: Some(27_278),
                known_title: Some("Toy Story (1995)".to_string()),
                known_rating: Some(KnownRating {
                    user_id: 6,
                    movie_id: 1,
                    rating: 5.0,
                }),
            },
            execution: ExecutionConfig {
                workers: num_cpus::get(),
            },
        }
    }
}

impl Config {
    /// Layers the defaults, an optional file at `path` and `MOVIEREC_*`
    /// environment variables, in that order.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MOVIEREC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = Config::default();
        assert_eq!(config.split.weights, [0.6, 0.2, 0.2]);
        assert_eq!(config.als.candidate_ranks, vec![4, 8, 12]);
        assert_eq!(config.als.max_iterations, 5);
        assert!((config.als.regularization - 0.1).abs() < 1e-12);
        assert_eq!(config.popularity.min_ratings, 500);
        assert!(config.execution.workers >= 1);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::from_file("does/not/exist.toml").unwrap();
        assert_eq!(config.als.candidate_ranks, vec![4, 8, 12]);
        assert_eq!(config.popularity.top_n, 20);
    }
}
