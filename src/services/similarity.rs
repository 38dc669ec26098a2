use std::collections::HashSet;

use crate::models::Movie;

/// Candidates at or below this similarity are never reported as similar
pub const SIMILARITY_THRESHOLD: f64 = 0.1;

/// Jaccard index of two genre id lists, treated as sets
///
/// Returns 0 when either side has no genres.
pub fn jaccard(a: &[u32], b: &[u32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: HashSet<u32> = a.iter().copied().collect();
    let b: HashSet<u32> = b.iter().copied().collect();

    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();

    intersection as f64 / union as f64
}

/// Genre similarity between two catalog entries
pub fn genre_similarity(a: &Movie, b: &Movie) -> f64 {
    jaccard(&a.genre_ids, &b.genre_ids)
}

/// Entries from `pool` most similar to `source`, best first
///
/// The source itself is skipped. Equal scores keep their pool order.
pub fn rank_similar(source: &Movie, pool: &[Movie], limit: usize) -> Vec<Movie> {
    let mut scored: Vec<(f64, &Movie)> = pool
        .iter()
        .filter(|candidate| candidate.id != source.id)
        .map(|candidate| (genre_similarity(source, candidate), candidate))
        .filter(|(similarity, _)| *similarity > SIMILARITY_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, movie)| movie.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, genres: &[u32]) -> Movie {
        Movie {
            id,
            genre_ids: genres.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_jaccard_values() {
        assert_eq!(jaccard(&[1, 2, 3], &[2, 3, 4]), 0.5);
        assert_eq!(jaccard(&[1], &[1]), 1.0);
        assert_eq!(jaccard(&[1, 2], &[3, 4]), 0.0);
        assert_eq!(jaccard(&[], &[1]), 0.0);
        assert_eq!(jaccard(&[1], &[]), 0.0);
    }

    #[test]
    fn test_jaccard_ignores_duplicates() {
        assert_eq!(jaccard(&[1, 1, 2], &[2, 2]), 0.5);
    }

    #[test]
    fn test_rank_similar_filters_sorts_and_truncates() {
        let source = movie(1, &[28, 12, 878]);
        let pool = vec![
            movie(1, &[28, 12, 878]),
            movie(2, &[35]),
            movie(3, &[28]),
            movie(4, &[28, 12, 878]),
            movie(5, &[28, 12]),
            movie(6, &[28]),
        ];

        let ranked: Vec<u64> = rank_similar(&source, &pool, 10)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ranked, vec![4, 5, 3, 6]);

        let top: Vec<u64> = rank_similar(&source, &pool, 2).iter().map(|m| m.id).collect();
        assert_eq!(top, vec![4, 5]);
    }

    #[test]
    fn test_rank_similar_threshold_is_exclusive() {
        // 1 shared genre out of 10 is exactly 0.1
        let source = movie(1, &[1, 2, 3, 4, 5]);
        let pool = vec![movie(2, &[5, 6, 7, 8, 9, 10])];

        assert_eq!(jaccard(&source.genre_ids, &pool[0].genre_ids), 0.1);
        assert!(rank_similar(&source, &pool, 10).is_empty());
    }
}
