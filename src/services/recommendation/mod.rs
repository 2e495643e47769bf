use crate::algorithms::{MatrixFactorizationModel, RatingPredictor};
use crate::models::*;
use crate::utils::top_k_indices;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Ranks unseen movies for a user with a trained model.
pub struct RecommendationService<'a> {
    model: &'a MatrixFactorizationModel,
    titles: HashMap<u32, &'a str>,
}

impl<'a> RecommendationService<'a> {
    pub fn new(model: &'a MatrixFactorizationModel, movies: &'a [Movie]) -> Self {
        let titles = movies.iter().map(|m| (m.id, m.title.as_str())).collect();
        Self { model, titles }
    }

    /// The `n` highest-scoring movies the user has not rated in `history`.
    /// Users the model has never seen get an empty list.
    pub fn recommend_for_user(
        &self,
        user_id: u32,
        history: &[Rating],
        n: usize,
    ) -> Vec<RecommendationItem> {
        if !self.model.knows_user(user_id) {
            info!("User {} is unknown to the model; no recommendations", user_id);
            return Vec::new();
        }

        let seen: HashSet<u32> = history
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.movie_id)
            .collect();

        let mut candidates: Vec<u32> =
            self.model.movie_ids().filter(|id| !seen.contains(id)).collect();
        // Stable order so equal scores rank deterministically.
        candidates.sort_unstable();

        let scores: Vec<f32> = candidates
            .iter()
            .map(|&movie_id| self.model.predict(user_id, movie_id).unwrap_or(f32::NEG_INFINITY))
            .collect();
        debug!("Scored {} candidate movies for user {}", candidates.len(), user_id);

        top_k_indices(&scores, n)
            .into_iter()
            .map(|i| RecommendationItem {
                movie_id: candidates[i],
                title: self.titles.get(&candidates[i]).map(|t| t.to_string()),
                score: scores[i],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::AlternatingLeastSquares;

    fn ratings() -> Vec<Rating> {
        vec![
            Rating::new(1, 10, 5.0),
            Rating::new(1, 11, 1.0),
            Rating::new(2, 10, 5.0),
            Rating::new(2, 11, 1.0),
            Rating::new(2, 12, 5.0),
            Rating::new(2, 13, 1.0),
            Rating::new(3, 12, 4.0),
            Rating::new(3, 13, 2.0),
        ]
    }

    fn movies() -> Vec<Movie> {
        (10..14)
            .map(|id| Movie { id, title: format!("Movie {}", id) })
            .collect()
    }

    #[test]
    fn test_recommendations_exclude_rated_movies() {
        let ratings = ratings();
        let movies = movies();
        let model = AlternatingLeastSquares::new(AlsParams::new(2, 10, 0.05).with_seed(Some(4)))
            .fit(&ratings)
            .unwrap();
        let service = RecommendationService::new(&model, &movies);

        let items = service.recommend_for_user(1, &ratings, 5);
        let ids: HashSet<u32> = items.iter().map(|i| i.movie_id).collect();
        assert_eq!(ids, HashSet::from([12, 13]));
        assert!(items.iter().all(|i| i.title.is_some() && i.score.is_finite()));
        assert!(items[0].score >= items[1].score);
    }

    #[test]
    fn test_unknown_user_gets_nothing() {
        let ratings = ratings();
        let movies = movies();
        let model = AlternatingLeastSquares::new(AlsParams::new(2, 3, 0.1).with_seed(Some(4)))
            .fit(&ratings)
            .unwrap();
        let service = RecommendationService::new(&model, &movies);

        assert!(service.recommend_for_user(77, &ratings, 5).is_empty());
        assert_eq!(service.recommend_for_user(1, &ratings, 1).len(), 1);
    }
}
