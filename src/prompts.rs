use crate::models::CandidatePool;
use crate::normalize::truncate_chars;

pub const PROMPT_SUMMARY_CHARS: usize = 300;

pub fn format_candidates(pool: &CandidatePool) -> String {
    pool.iter()
        .enumerate()
        .map(|(i, c)| {
            let a = &c.article;
            format!(
                "Candidate {idx}:\nTitle: {title}\nSource: {source}\nURL: {link}\nPublished: {published}\nSummary: {summary}\n",
                idx = i + 1,
                title = a.title,
                source = a.source_name,
                link = a.link,
                published = a.published_at.format("%Y-%m-%d %H:%M %:z"),
                summary = truncate_chars(&a.summary, PROMPT_SUMMARY_CHARS),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn user_surprise_ranking(candidates_text: &str) -> String {
    format!(r#"You are a researcher and analyst specializing in AI news.

From the candidate news items below, pick **exactly one** AI-related item with the highest surprise factor and analyze it.

## Evaluation criteria (surprise)

1. **Impact**: is the performance, price, user count or business effect an order of magnitude beyond the norm?
2. **Novelty**: is the idea, mechanism or scale discontinuous with what came before rather than an incremental extension?
3. **Availability**: is it usable today, or backed by a concrete release date or working demo?
4. **Credibility**: is it backed by an official announcement from a company or research lab, or another trustworthy primary source?

## Candidates

{candidates}

## Output format

Reply with this JSON object:

```json
{{
  "selected_index": 1,
  "title_localized": "Title in Japanese",
  "summary": "3-5 line overview: who announced what, what is distinctive, when it is available",
  "surprise_reasons": [
    "Why the impact is surprising (be specific)",
    "What is new compared to existing approaches",
    "How real it is (usable now / concrete roadmap)"
  ],
  "engineer_impact": "What it means for engineers (development, operations, architecture)",
  "business_impact": "What it means for business (cost, revenue, strategy)",
  "surprise_score": 85,
  "other_candidates_comparison": "Why this beats the other candidates on surprise"
}}
```

Output only the JSON."#, candidates = candidates_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fixtures::article;
    use crate::models::ScoredArticle;

    #[test]
    fn candidates_are_numbered_from_one_with_short_summaries() {
        let mut a = article("First", "https://a", 1);
        a.summary = "x".repeat(450);
        let pool = CandidatePool::from_scored(
            vec![
                ScoredArticle { article: a, preliminary_score: 3 },
                ScoredArticle { article: article("Second", "https://b", 2), preliminary_score: 1 },
            ],
            5,
        );
        let text = format_candidates(&pool);
        assert!(text.starts_with("Candidate 1:\nTitle: First"));
        assert!(text.contains("Candidate 2:\nTitle: Second"));
        assert!(text.contains("Published: 2025-03-10 20:00 +09:00"));
        assert!(text.contains(&format!("Summary: {}\n", "x".repeat(300))));
        assert!(!text.contains(&"x".repeat(301)));

        let prompt = user_surprise_ranking(&text);
        assert!(prompt.contains("\"selected_index\": 1"));
        assert!(prompt.contains("Candidate 2:"));
    }
}
