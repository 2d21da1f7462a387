// src/render.rs
use chrono::{DateTime, FixedOffset};

use crate::models::Decision;
use crate::normalize::truncate_chars;
use crate::rank::NOT_AVAILABLE;

const TIME_FMT: &str = "%Y-%m-%d %H:%M %:z";

fn or_na(s: &str) -> &str {
    if s.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        s.trim()
    }
}

fn when(dt: &DateTime<FixedOffset>) -> String {
    dt.format(TIME_FMT).to_string()
}

pub fn render_report_markdown(d: &Decision, source_kinds: &[&str]) -> String {
    let a = &d.selected_article.article;
    let an = &d.analysis;
    let mut md = String::new();

    md.push_str("# AI News Surprise Report\n\n");
    md.push_str(&format!("Generated: {}\n\n---\n\n", d.generated_at.format("%Y-%m-%d %H:%M:%S %:z")));

    md.push_str("## Selected News\n\n");
    md.push_str(&format!("### Title\n{}\n\n", or_na(&an.title_localized)));
    md.push_str(&format!("### Source\n{} ({})\n\n", or_na(&a.source_name), a.language));
    md.push_str(&format!("### URL\n{}\n\n", or_na(&a.link)));
    md.push_str(&format!("### Published\n{}\n\n---\n\n", when(&a.published_at)));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("{}\n\n---\n\n", or_na(&an.summary)));

    md.push_str("## Why It Is Surprising\n\n");
    if an.surprise_reasons.is_empty() {
        md.push_str(&format!("{}\n", NOT_AVAILABLE));
    }
    for (i, reason) in an.surprise_reasons.iter().enumerate() {
        md.push_str(&format!("{}. **{}**\n", i + 1, reason.trim()));
    }
    md.push_str("\n---\n\n");

    md.push_str("## Impact Analysis\n\n");
    md.push_str(&format!("### Engineer Perspective\n\n{}\n\n", or_na(&an.engineer_impact)));
    md.push_str(&format!("### Business Perspective\n\n{}\n\n---\n\n", or_na(&an.business_impact)));

    md.push_str("## Surprise Score\n\n");
    match an.surprise_score {
        Some(s) => md.push_str(&format!("**{} / 100**\n\n---\n\n", s)),
        None => md.push_str(&format!("**{} / 100**\n\n---\n\n", NOT_AVAILABLE)),
    }

    md.push_str("## Comparison With Other Candidates\n\n");
    md.push_str(&format!("{}\n\n---\n\n", or_na(&an.comparison_narrative)));

    md.push_str("## All Candidates\n");
    for (i, c) in d.all_candidates.iter().enumerate() {
        let ca = &c.article;
        md.push_str(&format!("\n### Candidate {}: {}\n", i + 1, truncate_chars(or_na(&ca.title), 80)));
        md.push_str(&format!("- **Source**: {}\n", or_na(&ca.source_name)));
        md.push_str(&format!("- **URL**: {}\n", or_na(&ca.link)));
        md.push_str(&format!("- **Published**: {}\n", when(&ca.published_at)));
        md.push_str(&format!("- **Preliminary score**: {}\n", c.preliminary_score));
    }

    md.push_str("\n---\n\n## Metadata\n\n");
    md.push_str(&format!("- **Ranking model**: {}\n", or_na(&d.model)));
    md.push_str(&format!("- **Fallback mode**: {}\n", if d.is_fallback { "yes" } else { "no" }));
    md.push_str(&format!("- **Candidate count**: {}\n", d.all_candidates.len()));
    let kinds = if source_kinds.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        source_kinds.join(", ")
    };
    md.push_str(&format!("- **Collected sources**: {}\n", kinds));

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fixtures::{article, now};
    use crate::models::{CandidatePool, ScoredArticle};
    use crate::rank::{fallback_selection, parse_analysis};
    use chrono::FixedOffset;

    fn pool() -> CandidatePool {
        CandidatePool::from_scored(
            vec![
                ScoredArticle { article: article("Alpha launches", "https://alpha", 2), preliminary_score: 2 },
                ScoredArticle { article: article("Beta", "https://beta", 3), preliminary_score: 0 },
            ],
            5,
        )
    }

    fn decision(text: Option<&str>) -> Decision {
        let p = pool();
        let (selected, analysis) = match text {
            Some(t) => parse_analysis(t, &p).unwrap(),
            None => fallback_selection(&p).unwrap(),
        };
        Decision {
            run_id: "r".to_string(),
            generated_at: now().with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap()),
            model: "llama-test".to_string(),
            is_fallback: text.is_none(),
            selected_article: selected,
            analysis,
            all_candidates: p,
        }
    }

    #[test]
    fn sections_appear_in_order() {
        let md = render_report_markdown(
            &decision(Some(r#"{"selected_index":2,"surprise_reasons":["big","new"],"surprise_score":70}"#)),
            &["RSS"],
        );
        let order = [
            "Generated: 2025-03-10 21:00:00 +09:00",
            "## Selected News",
            "### URL\nhttps://beta",
            "## Summary",
            "## Why It Is Surprising",
            "1. **big**",
            "2. **new**",
            "### Engineer Perspective",
            "### Business Perspective",
            "**70 / 100**",
            "## Comparison With Other Candidates",
            "### Candidate 1: Alpha launches",
            "- **Preliminary score**: 2",
            "### Candidate 2: Beta",
            "- **Ranking model**: llama-test",
            "- **Fallback mode**: no",
            "- **Candidate count**: 2",
        ];
        let mut at = 0;
        for needle in order {
            let found = md[at..].find(needle).unwrap_or_else(|| panic!("missing or out of order: {needle}"));
            at += found + needle.len();
        }
    }

    #[test]
    fn placeholders_fill_missing_fields() {
        let md = render_report_markdown(&decision(Some("{}")), &[]);
        assert!(md.contains("### Engineer Perspective\n\nN/A"));
        assert!(md.contains("## Summary\n\nN/A"));
        assert!(md.contains("**N/A / 100**"));
        assert!(md.contains("- **Collected sources**: N/A"));
    }

    #[test]
    fn fallback_is_stated() {
        let md = render_report_markdown(&decision(None), &["RSS", "X (search)"]);
        assert!(md.contains("- **Fallback mode**: yes"));
        assert!(md.contains("**2 / 100**"));
        assert!(md.contains("RSS, X (search)"));
    }
}
