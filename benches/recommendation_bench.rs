use criterion::{black_box, criterion_group, criterion_main, Criterion};
use movierec::algorithms::{AlternatingLeastSquares, RatingPredictor};
use movierec::config::{PopularityConfig, PopularitySort};
use movierec::services::dataset::split_three_ways;
use movierec::services::popularity::most_popular;
use movierec::utils::metrics::rmse;
use movierec::*;

fn synthetic_ratings(users: u32, movies: u32) -> Vec<Rating> {
    let mut ratings = Vec::new();
    for u in 0..users {
        for m in 0..movies {
            if (u * 7 + m * 13) % 3 != 0 {
                ratings.push(Rating::new(u, m, 1.0 + ((u + 2 * m) % 5) as f32));
            }
        }
    }
    ratings
}

fn synthetic_movies(movies: u32) -> Vec<Movie> {
    (0..movies)
        .map(|id| Movie { id, title: format!("Movie {}", id) })
        .collect()
}

fn benchmark_als(c: &mut Criterion) {
    let ratings = synthetic_ratings(300, 200);

    for rank in [4, 8, 12] {
        c.bench_function(&format!("als_fit_rank_{}", rank), |b| {
            let als = AlternatingLeastSquares::new(AlsParams::new(rank, 5, 0.1).with_seed(Some(1)));
            b.iter(|| black_box(als.fit(black_box(&ratings)).unwrap()));
        });
    }

    let model = AlternatingLeastSquares::new(AlsParams::new(8, 5, 0.1).with_seed(Some(1)))
        .fit(&ratings)
        .unwrap();

    c.bench_function("als_transform_and_rmse", |b| {
        b.iter(|| {
            let predictions = model.transform(black_box(&ratings));
            black_box(rmse(&predictions))
        });
    });
}

fn benchmark_dataset_ops(c: &mut Criterion) {
    let ratings = synthetic_ratings(1000, 500);
    let movies = synthetic_movies(500);
    let config = PopularityConfig {
        min_ratings: 100,
        top_n: 20,
        sort_by: PopularitySort::Count,
    };

    c.bench_function("random_split_three_ways", |b| {
        b.iter(|| {
            black_box(split_three_ways(black_box(&ratings), [0.6, 0.2, 0.2], Some(7)).unwrap())
        });
    });

    c.bench_function("most_popular", |b| {
        b.iter(|| black_box(most_popular(black_box(&ratings), &movies, &config)));
    });
}

criterion_group!(benches, benchmark_als, benchmark_dataset_ops);
criterion_main!(benches);
