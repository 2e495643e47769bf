use crate::config::{KnownRating, ValidationConfig};
use crate::models::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{table}: projection changed row count from {raw} to {projected}")]
    ProjectionChangedCount {
        table: &'static str,
        raw: usize,
        projected: usize,
    },
    #[error("{table}: expected {expected} rows, found {actual}")]
    UnexpectedCount {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("title {title:?} appears {count} times, expected exactly once")]
    KnownTitle { title: String, count: usize },
    #[error("rating ({user_id}, {movie_id}, {rating}) appears {count} times, expected exactly once")]
    KnownRating {
        user_id: u32,
        movie_id: u32,
        rating: f32,
        count: usize,
    },
}

pub fn validate_projection(summary: &DatasetSummary) -> Result<(), ValidationError> {
    if summary.raw_ratings != summary.ratings {
        return Err(ValidationError::ProjectionChangedCount {
            table: "ratings",
            raw: summary.raw_ratings,
            projected: summary.ratings,
        });
    }
    if summary.raw_movies != summary.movies {
        return Err(ValidationError::ProjectionChangedCount {
            table: "movies",
            raw: summary.raw_movies,
            projected: summary.movies,
        });
    }
    Ok(())
}

pub fn validate_count(
    table: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::UnexpectedCount {
            table,
            expected,
            actual,
        });
    }
    Ok(())
}

pub fn validate_known_title(movies: &[Movie], title: &str) -> Result<(), ValidationError> {
    let count = movies.iter().filter(|m| m.title == title).count();
    if count != 1 {
        return Err(ValidationError::KnownTitle {
            title: title.to_string(),
            count,
        });
    }
    Ok(())
}

pub fn validate_known_rating(
    ratings: &[Rating],
    known: &KnownRating,
) -> Result<(), ValidationError> {
    let count = ratings
        .iter()
        .filter(|r| {
            r.user_id == known.user_id && r.movie_id == known.movie_id && r.rating == known.rating
        })
        .count();
    if count != 1 {
        return Err(ValidationError::KnownRating {
            user_id: known.user_id,
            movie_id: known.movie_id,
            rating: known.rating,
            count,
        });
    }
    Ok(())
}

/// Runs the projection check and, when enabled, every configured expectation.
pub fn validate_dataset(
    summary: &DatasetSummary,
    ratings: &[Rating],
    movies: &[Movie],
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    validate_projection(summary)?;

    if !config.enabled {
        return Ok(());
    }

    if let Some(expected) = config.expected_ratings {
        validate_count("ratings", expected, ratings.len())?;
    }
    if let Some(expected) = config.expected_movies {
        validate_count("movies", expected, movies.len())?;
    }
    if let Some(ref title) = config.known_title {
        validate_known_title(movies, title)?;
    }
    if let Some(ref known) = config.known_rating {
        validate_known_rating(ratings, known)?;
    }

    Ok(())
}
