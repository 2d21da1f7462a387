use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ja,
}

impl Language {
    /// Heuristic for content without a declared language: mostly-ASCII text is English.
    pub fn detect(text: &str) -> Self {
        let total = text.chars().count();
        if total == 0 {
            return Language::En;
        }
        let ascii = text.chars().filter(|c| c.is_ascii()).count();
        if ascii as f32 / total as f32 > 0.7 {
            Language::En
        } else {
            Language::Ja
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source is collected and how strictly its entries are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    AccountFeed,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub language: Language,
    #[serde(default = "default_kind")]
    pub kind: SourceKind,
}

fn default_kind() -> SourceKind {
    SourceKind::Feed
}

impl SourceDescriptor {
    pub fn feed(name: &str, url: &str, language: Language) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            language,
            kind: SourceKind::Feed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String, // identity key
    pub published_at: DateTime<FixedOffset>, // working timezone offset
    pub summary: String, // plain text, ≤ 500 chars
    pub source_name: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub preliminary_score: i64,
}

/// Score-sorted, bounded candidate set handed to the ranking step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidatePool(Vec<ScoredArticle>);

impl CandidatePool {
    /// Stable-sorts descending by score and keeps the first `max` entries.
    pub fn from_scored(mut scored: Vec<ScoredArticle>, max: usize) -> Self {
        scored.sort_by(|a, b| b.preliminary_score.cmp(&a.preliminary_score));
        scored.truncate(max);
        Self(scored)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn top(&self) -> Option<&ScoredArticle> {
        self.0.first()
    }

    /// 1-based lookup, matching the numbering shown to the ranking model.
    pub fn get(&self, index: usize) -> Option<&ScoredArticle> {
        index.checked_sub(1).and_then(|i| self.0.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredArticle> {
        self.0.iter()
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisOrigin {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub origin: AnalysisOrigin,
    pub selected_index: usize, // 1-based into the pool
    pub title_localized: String,
    pub summary: String,
    pub surprise_reasons: Vec<String>,
    pub engineer_impact: String,
    pub business_impact: String,
    pub surprise_score: Option<u8>, // 0..=100
    pub comparison_narrative: String,
}

/// Outcome of one pipeline run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub run_id: String,
    pub generated_at: DateTime<FixedOffset>,
    pub model: String,
    pub selected_article: ScoredArticle,
    pub analysis: AnalysisResult,
    pub all_candidates: CandidatePool,
    pub is_fallback: bool,
}
