use crate::config::{PopularityConfig, PopularitySort};
use crate::models::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::info;

/// Rating count and mean for one movie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAggregate {
    pub movie_id: u32,
    pub count: usize,
    pub average: f64,
}

/// Groups ratings by movie. Output is ordered by movie id.
pub fn aggregate_by_movie(ratings: &[Rating]) -> Vec<RatingAggregate> {
    let mut totals: HashMap<u32, (usize, f64)> = HashMap::new();
    for rating in ratings {
        let entry = totals.entry(rating.movie_id).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += rating.rating as f64;
    }

    let mut aggregates: Vec<RatingAggregate> = totals
        .into_iter()
        .map(|(movie_id, (count, sum))| RatingAggregate {
            movie_id,
            count,
            average: sum / count as f64,
        })
        .collect();
    aggregates.sort_by_key(|a| a.movie_id);
    aggregates
}

/// Inner join of the aggregates with movie titles. Aggregates for movies
/// without a title are dropped.
pub fn join_titles(aggregates: &[RatingAggregate], movies: &[Movie]) -> Vec<MoviePopularity> {
    let titles: HashMap<u32, &str> = movies.iter().map(|m| (m.id, m.title.as_str())).collect();

    aggregates
        .iter()
        .filter_map(|a| {
            titles.get(&a.movie_id).map(|title| MoviePopularity {
                movie_id: a.movie_id,
                title: title.to_string(),
                count: a.count,
                average: a.average,
            })
        })
        .collect()
}

fn compare(a: &MoviePopularity, b: &MoviePopularity, sort_by: PopularitySort) -> Ordering {
    let by_count = b.count.cmp(&a.count);
    let by_average = b.average.partial_cmp(&a.average).unwrap_or(Ordering::Equal);
    let primary = match sort_by {
        PopularitySort::Count => by_count.then(by_average),
        PopularitySort::Average => by_average.then(by_count),
    };
    primary.then(a.movie_id.cmp(&b.movie_id))
}

/// Movies with more than `min_ratings` ratings, best first, limited to `top_n`.
pub fn most_popular(
    ratings: &[Rating],
    movies: &[Movie],
    config: &PopularityConfig,
) -> Vec<MoviePopularity> {
    let aggregates = aggregate_by_movie(ratings);
    let mut popular: Vec<MoviePopularity> = join_titles(&aggregates, movies)
        .into_iter()
        .filter(|m| m.count > config.min_ratings)
        .collect();

    info!(
        "{} movies have more than {} ratings; keeping top {}",
        popular.len(),
        config.min_ratings,
        config.top_n.min(popular.len())
    );

    popular.sort_by(|a, b| compare(a, b, config.sort_by));
    popular.truncate(config.top_n);
    popular
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movies() -> Vec<Movie> {
        vec![
            Movie { id: 1, title: "A".to_string() },
            Movie { id: 2, title: "B".to_string() },
            Movie { id: 3, title: "C".to_string() },
        ]
    }

    fn ratings() -> Vec<Rating> {
        let mut ratings = Vec::new();
        // movie 1: three ratings averaging 3.0
        ratings.extend([Rating::new(1, 1, 2.0), Rating::new(2, 1, 3.0), Rating::new(3, 1, 4.0)]);
        // movie 2: two ratings averaging 5.0
        ratings.extend([Rating::new(1, 2, 5.0), Rating::new(2, 2, 5.0)]);
        // movie 3: one rating
        ratings.push(Rating::new(1, 3, 1.0));
        // movie 9 has no title
        ratings.extend([Rating::new(1, 9, 4.0), Rating::new(2, 9, 4.0), Rating::new(3, 9, 4.0)]);
        ratings
    }

    #[test]
    fn test_aggregate_by_movie() {
        let aggregates = aggregate_by_movie(&ratings());
        assert_eq!(aggregates.len(), 4);
        assert_eq!(aggregates[0], RatingAggregate { movie_id: 1, count: 3, average: 3.0 });
        assert_eq!(aggregates[1], RatingAggregate { movie_id: 2, count: 2, average: 5.0 });
    }

    #[test]
    fn test_join_drops_untitled_movies() {
        let joined = join_titles(&aggregate_by_movie(&ratings()), &movies());
        assert_eq!(joined.len(), 3);
        assert!(joined.iter().all(|m| m.movie_id != 9));
    }

    #[test]
    fn test_threshold_is_strict_and_sorted_by_count() {
        let config = PopularityConfig { min_ratings: 1, top_n: 10, sort_by: PopularitySort::Count };
        let popular = most_popular(&ratings(), &movies(), &config);

        let ids: Vec<u32> = popular.iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_sort_by_average_and_top_n() {
        let config = PopularityConfig {
            min_ratings: 0,
            top_n: 2,
            sort_by: PopularitySort::Average,
        };
        let popular = most_popular(&ratings(), &movies(), &config);

        let ids: Vec<u32> = popular.iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
