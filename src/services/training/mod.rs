use crate::algorithms::{
    AlsError, AlternatingLeastSquares, ConstantPredictor, MatrixFactorizationModel, RatingPredictor,
};
use crate::models::*;
use crate::utils::mean;
use crate::utils::metrics::{count_undefined, RegressionEvaluator};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no candidate ranks to search")]
    NoCandidates,
    #[error("no candidate rank produced a defined prediction on the validation set")]
    NoScoredCandidate,
    #[error("model produced no defined predictions for the {0} set")]
    NoDefinedPredictions(&'static str),
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error(transparent)]
    Als(#[from] AlsError),
}

/// The winning candidate of a rank search.
#[derive(Debug, Clone)]
pub struct RankSelection {
    pub rank: usize,
    pub model: MatrixFactorizationModel,
    pub rmse: f64,
    /// Every candidate in search order, including unscored ones.
    pub evaluations: Vec<RankEvaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineEvaluation {
    pub training_average: f64,
    pub rmse: f64,
}

/// Trains and scores ALS models.
#[derive(Debug, Clone)]
pub struct TrainingService {
    base_params: AlsParams,
    evaluator: RegressionEvaluator,
}

impl TrainingService {
    /// `base_params` supplies everything but the rank, which each candidate
    /// overrides.
    pub fn new(base_params: AlsParams) -> Self {
        Self {
            base_params,
            evaluator: RegressionEvaluator::rmse(),
        }
    }

    /// Fits one model per candidate rank and keeps the one with the lowest
    /// validation RMSE. On a tie the earlier candidate wins. Candidates with
    /// no defined validation prediction are recorded but never selected.
    pub fn select_rank(
        &self,
        candidate_ranks: &[usize],
        training: &[Rating],
        validation: &[Rating],
    ) -> Result<RankSelection, TrainingError> {
        if candidate_ranks.is_empty() {
            return Err(TrainingError::NoCandidates);
        }

        let mut evaluations = Vec::with_capacity(candidate_ranks.len());
        let best = candidate_ranks.iter().try_fold(
            None::<(usize, MatrixFactorizationModel, f64)>,
            |best, &rank| -> Result<_, TrainingError> {
                let params = self.base_params.with_rank(rank);
                let model = AlternatingLeastSquares::new(params).fit(training)?;
                let rmse = self.score(&model, validation);
                evaluations.push(RankEvaluation { rank, rmse });

                match rmse {
                    Some(error) => {
                        info!("For rank {} the RMSE is {}", rank, error);
                        Ok(match best {
                            Some((_, _, best_error)) if error >= best_error => best,
                            _ => Some((rank, model, error)),
                        })
                    }
                    None => {
                        warn!("Rank {} produced no defined validation predictions", rank);
                        Ok(best)
                    }
                }
            },
        )?;

        let (rank, model, rmse) = best.ok_or(TrainingError::NoScoredCandidate)?;
        info!("The best model was trained with rank {}", rank);

        Ok(RankSelection {
            rank,
            model,
            rmse,
            evaluations,
        })
    }

    /// RMSE of `model` over `ratings`, ignoring rows it cannot predict.
    pub fn score<P: RatingPredictor>(&self, model: &P, ratings: &[Rating]) -> Option<f64> {
        let predictions = model.transform(ratings);
        debug!(
            "Dropping {} of {} predictions without a value",
            count_undefined(&predictions),
            predictions.len()
        );
        self.evaluator.evaluate(&predictions)
    }

    /// Held-out RMSE of the selected model.
    pub fn evaluate_test<P: RatingPredictor>(
        &self,
        model: &P,
        test: &[Rating],
    ) -> Result<f64, TrainingError> {
        let rmse = self
            .score(model, test)
            .ok_or(TrainingError::NoDefinedPredictions("test"))?;
        info!("The model had a RMSE on the test set of {}", rmse);
        Ok(rmse)
    }

    /// RMSE on `test` of always predicting the mean training rating.
    pub fn evaluate_baseline(
        &self,
        training: &[Rating],
        test: &[Rating],
    ) -> Result<BaselineEvaluation, TrainingError> {
        let training_average =
            mean(training.iter().map(|r| r.rating as f64)).ok_or(TrainingError::EmptyTrainingSet)?;
        info!("The average rating for movies in the training set is {}", training_average);

        let baseline = ConstantPredictor {
            value: training_average as f32,
        };
        let rmse = self
            .score(&baseline, test)
            .ok_or(TrainingError::NoDefinedPredictions("test"))?;
        info!("The RMSE on the average set is {}", rmse);

        Ok(BaselineEvaluation { training_average, rmse })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TrainingService {
        TrainingService::new(AlsParams::new(2, 5, 0.1).with_seed(Some(21)))
    }

    fn ratings() -> Vec<Rating> {
        let mut ratings = Vec::new();
        for user in 0..6u32 {
            for movie in 0..6u32 {
                if (user + movie) % 3 != 0 {
                    ratings.push(Rating::new(user, movie, 1.0 + ((user * movie) % 5) as f32));
                }
            }
        }
        ratings
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let err = service().select_rank(&[], &ratings(), &ratings()).unwrap_err();
        assert!(matches!(err, TrainingError::NoCandidates));
    }

    #[test]
    fn test_unscorable_validation_has_no_winner() {
        // Validation users never appear in training.
        let validation = vec![Rating::new(100, 0, 3.0), Rating::new(101, 1, 4.0)];
        let err = service().select_rank(&[2, 3], &ratings(), &validation).unwrap_err();
        assert!(matches!(err, TrainingError::NoScoredCandidate));
    }

    #[test]
    fn test_selection_records_every_candidate() {
        let data = ratings();
        let selection = service().select_rank(&[1, 2, 3], &data, &data).unwrap();

        let ranks: Vec<usize> = selection.evaluations.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let best = selection
            .evaluations
            .iter()
            .filter_map(|e| e.rmse)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(selection.rmse, best);
        assert_eq!(selection.model.rank(), selection.rank);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        // All-zero ratings solve to zero factors at any rank, so every
        // candidate scores exactly 0.0.
        let zeros: Vec<Rating> = ratings()
            .iter()
            .map(|r| Rating::new(r.user_id, r.movie_id, 0.0))
            .collect();

        let selection = service().select_rank(&[4, 8], &zeros, &zeros).unwrap();
        assert_eq!(selection.evaluations[0].rmse, Some(0.0));
        assert_eq!(selection.evaluations[1].rmse, Some(0.0));
        assert_eq!(selection.rank, 4);
        assert_eq!(selection.model.rank(), 4);

        let reversed = service().select_rank(&[8, 4], &zeros, &zeros).unwrap();
        assert_eq!(reversed.rank, 8);
    }

    #[test]
    fn test_baseline_uses_training_mean() {
        let training = vec![Rating::new(1, 1, 2.0), Rating::new(1, 2, 4.0)];
        let test = vec![Rating::new(2, 1, 1.0), Rating::new(2, 2, 5.0)];

        let baseline = service().evaluate_baseline(&training, &test).unwrap();
        assert!((baseline.training_average - 3.0).abs() < 1e-12);
        assert!((baseline.rmse - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_baseline_needs_training_data() {
        let err = service().evaluate_baseline(&[], &ratings()).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyTrainingSet));
    }

    #[test]
    fn test_evaluate_test_needs_defined_predictions() {
        let model = AlternatingLeastSquares::new(AlsParams::new(2, 2, 0.1).with_seed(Some(1)))
            .fit(&ratings())
            .unwrap();
        let err = service().evaluate_test(&model, &[Rating::new(500, 1, 3.0)]).unwrap_err();
        assert!(matches!(err, TrainingError::NoDefinedPredictions("test")));
    }
}
