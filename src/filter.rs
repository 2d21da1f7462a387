use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::models::Article;

/// `now` in the working timezone minus the lookback window.
pub fn cutoff(now: DateTime<Utc>, timezone: Tz, hours_lookback: i64) -> DateTime<FixedOffset> {
    let local = now.with_timezone(&timezone);
    let fixed = local.with_timezone(&local.offset().fix());
    fixed - Duration::hours(hours_lookback)
}

/// Keeps articles published at or after `cutoff`, preserving order.
pub fn filter_by_time(articles: Vec<Article>, cutoff: DateTime<FixedOffset>) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| a.published_at >= cutoff)
        .collect()
}

/// First occurrence per link wins; relative order is kept.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    articles
        .into_iter()
        .unique_by(|a| a.link.clone())
        .collect()
}

pub fn haystack(article: &Article) -> String {
    format!("{} {}", article.title, article.summary).to_lowercase()
}

/// Case-insensitive substring match of any keyword against title + summary.
/// No tokenization: "AI" matches inside "said".
pub fn is_relevant(article: &Article, keywords: &[String]) -> bool {
    let text = haystack(article);
    keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::Language;
    use chrono::TimeZone;

    pub fn article(title: &str, link: &str, hours_ago: i64) -> Article {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let tokyo = chrono_tz::Asia::Tokyo;
        let local = (base - Duration::hours(hours_ago)).with_timezone(&tokyo);
        Article {
            title: title.to_string(),
            link: link.to_string(),
            published_at: local.with_timezone(&local.offset().fix()),
            summary: String::new(),
            source_name: "Test Feed".to_string(),
            language: Language::En,
        }
    }

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{article, now};
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keeps_articles_inside_window_inclusive() {
        let c = cutoff(now(), chrono_tz::Asia::Tokyo, 24);
        let kept = filter_by_time(
            vec![
                article("fresh", "https://a", 1),
                article("edge", "https://b", 24),
                article("stale", "https://c", 25),
            ],
            c,
        );
        let titles: Vec<_> = kept.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["fresh", "edge"]);
    }

    #[test]
    fn cutoff_is_timezone_independent_instant() {
        let tokyo = cutoff(now(), chrono_tz::Asia::Tokyo, 24);
        let ny = cutoff(now(), chrono_tz::America::New_York, 24);
        assert_eq!(tokyo, ny);
        assert_eq!(tokyo.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn earlier_cutoff_keeps_a_superset() {
        let list: Vec<_> = (0..48).map(|h| article("t", &format!("https://{h}"), h)).collect();
        for (h1, h2) in [(48, 24), (24, 12), (12, 12), (30, 1)] {
            let wide: HashSet<_> = filter_by_time(list.clone(), cutoff(now(), chrono_tz::UTC, h1))
                .into_iter()
                .map(|a| a.link)
                .collect();
            let narrow: HashSet<_> = filter_by_time(list.clone(), cutoff(now(), chrono_tz::UTC, h2))
                .into_iter()
                .map(|a| a.link)
                .collect();
            assert!(narrow.is_subset(&wide));
        }
    }

    #[test]
    fn dedupe_keeps_first_and_is_idempotent() {
        let list = vec![
            article("first", "https://a", 1),
            article("other", "https://b", 1),
            article("second", "https://a", 2),
            article("third", "https://b", 3),
            article("lone", "https://c", 3),
        ];
        let once = dedupe(list);
        let titles: Vec<_> = once.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "other", "lone"]);

        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
        let links: HashSet<_> = twice.iter().map(|a| &a.link).collect();
        assert_eq!(links.len(), twice.len());
    }

    #[test]
    fn relevance_is_case_insensitive_substring() {
        let mut a = article("Startup raises funds", "https://a", 1);
        a.summary = "Built on a large language model".to_string();
        let kw = vec!["LLM".to_string(), "Large Language Model".to_string()];
        assert!(is_relevant(&a, &kw));

        let b = article("Weather update", "https://b", 1);
        assert!(!is_relevant(&b, &kw));
        assert!(!is_relevant(&b, &[]));
    }

    #[test]
    fn relevance_matches_inside_words() {
        let a = article("Minister said nothing new", "https://a", 1);
        assert!(is_relevant(&a, &["AI".to_string()]));
    }

    #[test]
    fn relevance_matches_japanese_keywords() {
        let mut a = article("新製品", "https://a", 1);
        a.summary = "生成AIを活用したサービスを発表".to_string();
        assert!(is_relevant(&a, &["生成AI".to_string()]));
    }
}
