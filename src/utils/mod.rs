pub mod metrics;
pub mod validation;

pub fn normalize_vector(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Arithmetic mean, or `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Indices of the `k` highest scores, best first. Ties keep input order.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indexed_scores: Vec<(usize, f32)> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| (i, score))
        .collect();

    indexed_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    indexed_scores
        .into_iter()
        .take(k)
        .map(|(i, _)| i)
        .collect()
}

/// Truncates `input` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_display(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        input.to_string()
    } else {
        let mut out: String = input.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_vector(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_top_k_indices() {
        let scores = vec![0.1, 0.5, 0.3, 0.9, 0.2];
        let top_2 = top_k_indices(&scores, 2);
        assert_eq!(top_2, vec![3, 1]);
    }

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display("Toy Story (1995)", 40), "Toy Story (1995)");
        assert_eq!(truncate_display("abcdef", 4), "abc…");
    }
}
