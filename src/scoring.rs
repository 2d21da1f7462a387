use rayon::prelude::*;
use tracing::debug;

use crate::filter::haystack;
use crate::models::{Article, CandidatePool, ScoredArticle};

pub const DEFAULT_MAX_CANDIDATES: usize = 5;

/// Sum of weights of every keyword present in title + summary.
/// Presence only: a keyword appearing twice still counts once.
pub fn score(article: &Article, weighted: &[(String, i64)]) -> i64 {
    let text = haystack(article);
    weighted
        .iter()
        .filter(|(k, _)| text.contains(&k.to_lowercase()))
        .map(|(_, w)| *w)
        .sum()
}

/// Scores every article, stable-sorts by score descending and keeps the top `max_candidates`.
/// Ties keep collection order so the same input always yields the same pool.
pub fn select_candidates(
    articles: Vec<Article>,
    weighted: &[(String, i64)],
    max_candidates: usize,
) -> CandidatePool {
    let total = articles.len();
    let scored: Vec<ScoredArticle> = articles
        .into_par_iter()
        .map(|article| {
            let preliminary_score = score(&article, weighted);
            ScoredArticle {
                article,
                preliminary_score,
            }
        })
        .collect();

    let pool = CandidatePool::from_scored(scored, max_candidates);
    debug!(
        "Candidate selection - scored={}, kept={}, top_score={}",
        total,
        pool.len(),
        pool.top().map(|c| c.preliminary_score).unwrap_or(0)
    );
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fixtures::article;

    fn weights() -> Vec<(String, i64)> {
        vec![("breakthrough".to_string(), 3), ("launches".to_string(), 2)]
    }

    #[test]
    fn distinct_keywords_accumulate() {
        let mut a = article("Lab launches model", "https://a", 1);
        a.summary = "A real Breakthrough in reasoning".to_string();
        assert_eq!(score(&a, &weights()), 5);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let a = article("launches, launches, launches", "https://a", 1);
        assert_eq!(score(&a, &weights()), 2);
        assert_eq!(score(&article("nothing here", "https://b", 1), &weights()), 0);
    }

    #[test]
    fn ties_keep_collection_order() {
        let list = vec![
            article("plain one", "https://1", 1),
            article("launches two", "https://2", 1),
            article("plain three", "https://3", 1),
            article("launches four", "https://4", 1),
            article("breakthrough five", "https://5", 1),
        ];
        let pool = select_candidates(list, &weights(), 5);
        let links: Vec<_> = pool.iter().map(|c| c.article.link.as_str()).collect();
        assert_eq!(links, vec!["https://5", "https://2", "https://4", "https://1", "https://3"]);
    }

    #[test]
    fn pool_is_bounded() {
        let list: Vec<_> = (0..12)
            .map(|i| article(&format!("launches {i}"), &format!("https://{i}"), 1))
            .collect();
        let pool = select_candidates(list, &weights(), DEFAULT_MAX_CANDIDATES);
        assert_eq!(pool.len(), DEFAULT_MAX_CANDIDATES);
        assert_eq!(pool.top().unwrap().article.link, "https://0");
        assert_eq!(pool.get(5).unwrap().article.link, "https://4");
    }

    #[test]
    fn five_candidate_scenario() {
        let mut a = article("Startup launches agent", "https://a", 1);
        a.summary = "Called a breakthrough by analysts".to_string();
        let list = vec![
            article("Quiet update", "https://q", 1),
            a,
            article("Another launches post", "https://b", 1),
            article("Roundup", "https://c", 1),
            article("Interview", "https://d", 1),
        ];
        let pool = select_candidates(list, &weights(), 5);
        assert_eq!(pool.len(), 5);
        let top = pool.top().unwrap();
        assert_eq!(top.article.link, "https://a");
        assert_eq!(top.preliminary_score, 5);
    }
}
