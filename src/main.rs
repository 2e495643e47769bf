use anyhow::Result;
use clap::Parser;
use movierec::services::dataset::Dataset;
use movierec::utils::truncate_display;
use movierec::{init_thread_pool, init_tracing, Config, EvaluationReport, Pipeline};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to ratings.csv
    #[arg(long)]
    ratings: Option<PathBuf>,

    /// Path to movies.csv
    #[arg(long)]
    movies: Option<PathBuf>,

    /// Seed for the data split and factor initialisation
    #[arg(long)]
    seed: Option<u64>,

    /// Candidate ranks, e.g. 4,8,12
    #[arg(long, value_delimiter = ',')]
    ranks: Option<Vec<usize>>,

    /// Print top recommendations for this user id
    #[arg(long)]
    recommend_for: Option<u32>,

    #[arg(long, default_value_t = 10)]
    recommend_count: usize,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Only check that column projection kept every row
    #[arg(long)]
    skip_sanity_checks: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(ref path) = self.ratings {
            config.data.ratings_path = path.clone();
        }
        if let Some(ref path) = self.movies {
            config.data.movies_path = path.clone();
        }
        if let Some(seed) = self.seed {
            config.split.seed = Some(seed);
            config.als.seed = Some(seed);
        }
        if let Some(ref ranks) = self.ranks {
            config.als.candidate_ranks = ranks.clone();
        }
        if self.skip_sanity_checks {
            config.validation.enabled = false;
        }
    }
}

const PREVIEW_ROWS: usize = 3;
const TITLE_WIDTH: usize = 48;

fn print_preview(dataset: &Dataset) {
    println!(
        "There are {} ratings and {} movies in the datasets",
        dataset.summary.ratings, dataset.summary.movies
    );
    println!("Ratings:");
    println!("{:>8} {:>8} {:>6}", "userId", "movieId", "rating");
    for r in dataset.ratings.iter().take(PREVIEW_ROWS) {
        println!("{:>8} {:>8} {:>6.1}", r.user_id, r.movie_id, r.rating);
    }
    println!("Movies:");
    println!("{:>8} {}", "ID", "title");
    for m in dataset.movies.iter().take(PREVIEW_ROWS) {
        println!("{:>8} {}", m.id, m.title);
    }
    println!();
}

fn print_report(report: &EvaluationReport) {
    println!("Movies with highest ratings:");
    println!(
        "{:>8} {:<width$} {:>7} {:>8}",
        "movieId",
        "title",
        "count",
        "average",
        width = TITLE_WIDTH
    );
    for m in &report.popular_movies {
        println!(
            "{:>8} {:<width$} {:>7} {:>8.4}",
            m.movie_id,
            truncate_display(&m.title, TITLE_WIDTH),
            m.count,
            m.average,
            width = TITLE_WIDTH
        );
    }
    println!();

    let splits = &report.splits;
    println!(
        "Training: {}, validation: {}, test: {}",
        splits.training, splits.validation, splits.test
    );
    for evaluation in &report.rank_evaluations {
        match evaluation.rmse {
            Some(rmse) => println!("For rank {} the RMSE is {}", evaluation.rank, rmse),
            None => println!("For rank {} no validation prediction was defined", evaluation.rank),
        }
    }
    println!("The best model was trained with rank {}", report.best_rank);
    println!("The model had a RMSE on the test set of {}", report.test_rmse);
    println!("The average rating for movies in the training set is {}", report.training_average);
    println!("The RMSE on the average set is {}", report.baseline_rmse);
    println!(
        "Improvement over the average baseline: {:.2}%",
        report.improvement_over_baseline() * 100.0
    );

    if let Some(ref recs) = report.recommendations {
        println!();
        if recs.items.is_empty() {
            println!("No recommendations for user {}", recs.user_id);
        } else {
            println!("Top recommendations for user {}:", recs.user_id);
            for item in &recs.items {
                let title = item.title.as_deref().unwrap_or("<unknown title>");
                println!(
                    "{:>8} {:<width$} {:>7.3}",
                    item.movie_id,
                    truncate_display(title, TITLE_WIDTH),
                    item.score,
                    width = TITLE_WIDTH
                );
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::from_file(&args.config)?;
    args.apply(&mut config);
    info!("Configuration loaded: {:?}", config);

    init_thread_pool(config.execution.workers)?;

    let pipeline = Pipeline::new(config);
    let dataset = pipeline.load_dataset()?;
    if !args.json {
        print_preview(&dataset);
    }

    let recommend_for = args.recommend_for.map(|user| (user, args.recommend_count));
    let report = pipeline.run(&dataset, recommend_for)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
