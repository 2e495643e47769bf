use crate::algorithms::initializer::seeded_rng;
use crate::models::*;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {what}: {source}")]
    Csv {
        what: String,
        #[source]
        source: csv::Error,
    },
    #[error("split weights must be non-negative, finite and sum to a positive value: {0:?}")]
    InvalidSplitWeights(Vec<f64>),
}

/// Ratings and movies after the unused columns have been dropped.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub ratings: Vec<Rating>,
    pub movies: Vec<Movie>,
    pub summary: DatasetSummary,
}

impl Dataset {
    pub fn load(ratings_path: &Path, movies_path: &Path) -> Result<Self, DatasetError> {
        let ratings_file = open(ratings_path)?;
        let movies_file = open(movies_path)?;
        let dataset = Self::from_readers(
            ratings_file,
            &ratings_path.display().to_string(),
            movies_file,
            &movies_path.display().to_string(),
        )?;

        info!(
            "There are {} ratings and {} movies in the datasets",
            dataset.summary.ratings, dataset.summary.movies
        );
        Ok(dataset)
    }

    pub fn from_readers<R1: Read, R2: Read>(
        ratings: R1,
        ratings_name: &str,
        movies: R2,
        movies_name: &str,
    ) -> Result<Self, DatasetError> {
        let raw_ratings: Vec<RawRating> = read_csv(ratings, ratings_name)?;
        let raw_movies: Vec<RawMovie> = read_csv(movies, movies_name)?;
        Ok(Self::from_raw(raw_ratings, raw_movies))
    }

    /// Drops the timestamp and genres columns, recording counts on both sides
    /// of the projection.
    pub fn from_raw(raw_ratings: Vec<RawRating>, raw_movies: Vec<RawMovie>) -> Self {
        let raw_ratings_count = raw_ratings.len();
        let raw_movies_count = raw_movies.len();

        let ratings: Vec<Rating> = raw_ratings.into_iter().map(Rating::from).collect();
        let movies: Vec<Movie> = raw_movies.into_iter().map(Movie::from).collect();

        let summary = DatasetSummary {
            raw_ratings: raw_ratings_count,
            ratings: ratings.len(),
            raw_movies: raw_movies_count,
            movies: movies.len(),
        };

        Self {
            ratings,
            movies,
            summary,
        }
    }
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_csv<T: DeserializeOwned, R: Read>(reader: R, what: &str) -> Result<Vec<T>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| DatasetError::Csv {
            what: what.to_string(),
            source,
        })
}

/// Training, validation and test partitions of one ratings set.
#[derive(Debug, Clone, Default)]
pub struct DataSplits {
    pub training: Vec<Rating>,
    pub validation: Vec<Rating>,
    pub test: Vec<Rating>,
}

impl DataSplits {
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            training: self.training.len(),
            validation: self.validation.len(),
            test: self.test.len(),
        }
    }
}

/// Assigns every rating to exactly one partition, independently at random,
/// with probability proportional to its weight.
pub fn random_split(
    ratings: &[Rating],
    weights: &[f64],
    seed: Option<u64>,
) -> Result<Vec<Vec<Rating>>, DatasetError> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty()
        || weights.iter().any(|w| !w.is_finite() || *w < 0.0)
        || total <= 0.0
    {
        return Err(DatasetError::InvalidSplitWeights(weights.to_vec()));
    }

    let bounds: Vec<f64> = weights
        .iter()
        .scan(0.0, |acc, w| {
            *acc += w / total;
            Some(*acc)
        })
        .collect();

    let mut rng = seeded_rng(seed);

    let mut parts: Vec<Vec<Rating>> = weights
        .iter()
        .map(|w| Vec::with_capacity((ratings.len() as f64 * w / total) as usize))
        .collect();
    let last = parts.len() - 1;

    for rating in ratings {
        let draw: f64 = rng.gen();
        let part = bounds.iter().position(|&b| draw < b).unwrap_or(last);
        parts[part].push(*rating);
    }

    Ok(parts)
}

pub fn split_three_ways(
    ratings: &[Rating],
    weights: [f64; 3],
    seed: Option<u64>,
) -> Result<DataSplits, DatasetError> {
    let mut parts = random_split(ratings, &weights, seed)?.into_iter();
    let splits = DataSplits {
        training: parts.next().unwrap_or_default(),
        validation: parts.next().unwrap_or_default(),
        test: parts.next().unwrap_or_default(),
    };

    info!(
        "Training: {}, validation: {}, test: {}",
        splits.training.len(),
        splits.validation.len(),
        splits.test.len()
    );
    Ok(splits)
}
