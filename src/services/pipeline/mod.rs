use crate::config::Config;
use crate::models::*;
use crate::services::dataset::{split_three_ways, Dataset};
use crate::services::popularity::most_popular;
use crate::services::recommendation::RecommendationService;
use crate::services::training::TrainingService;
use crate::utils::validation::validate_dataset;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// One end-to-end run: load, check, aggregate, split, search, evaluate.
pub struct Pipeline {
    config: Config,
    training_service: TrainingService,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let training_service = TrainingService::new(config.als.base_params());
        Self {
            config,
            training_service,
        }
    }

    /// Loads both CSV files and runs the sanity checks.
    pub fn load_dataset(&self) -> Result<Dataset> {
        let data = &self.config.data;
        let dataset = Dataset::load(&data.ratings_path, &data.movies_path)
            .context("failed to load the ratings dataset")?;
        self.check_dataset(&dataset)?;
        Ok(dataset)
    }

    pub fn check_dataset(&self, dataset: &Dataset) -> Result<()> {
        validate_dataset(
            &dataset.summary,
            &dataset.ratings,
            &dataset.movies,
            &self.config.validation,
        )
        .context("dataset sanity check failed")?;
        Ok(())
    }

    /// Everything after loading. `recommend_for` adds a top-N list for that
    /// user to the report.
    pub fn run(
        &self,
        dataset: &Dataset,
        recommend_for: Option<(u32, usize)>,
    ) -> Result<EvaluationReport> {
        let run_id = Uuid::new_v4();
        info!("Starting evaluation run {}", run_id);

        let popular_movies =
            most_popular(&dataset.ratings, &dataset.movies, &self.config.popularity);

        let split = &self.config.split;
        let splits = split_three_ways(&dataset.ratings, split.weights, split.seed)?;

        let selection = self.training_service.select_rank(
            &self.config.als.candidate_ranks,
            &splits.training,
            &splits.validation,
        )?;
        let test_rmse = self.training_service.evaluate_test(&selection.model, &splits.test)?;
        let baseline = self
            .training_service
            .evaluate_baseline(&splits.training, &splits.test)?;

        let recommendations = recommend_for.map(|(user_id, n)| {
            let service = RecommendationService::new(&selection.model, &dataset.movies);
            UserRecommendations {
                user_id,
                items: service.recommend_for_user(user_id, &dataset.ratings, n),
            }
        });

        Ok(EvaluationReport {
            run_id,
            generated_at: Utc::now(),
            dataset: dataset.summary,
            splits: splits.sizes(),
            popular_movies,
            rank_evaluations: selection.evaluations,
            best_rank: selection.rank,
            validation_rmse: selection.rmse,
            test_rmse,
            training_average: baseline.training_average,
            baseline_rmse: baseline.rmse,
            recommendations,
        })
    }
}
