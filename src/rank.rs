use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api_types::RankingResponse;
use crate::error::RankError;
use crate::llm::RankingClient;
use crate::models::{AnalysisOrigin, AnalysisResult, CandidatePool, Decision, ScoredArticle};
use crate::prompts::{format_candidates, user_surprise_ranking};

pub const MAX_SURPRISE_REASONS: usize = 5;
pub const NOT_AVAILABLE: &str = "N/A";
pub const FALLBACK_REASON: &str = "Automatic analysis failed; selected by keyword score";

/// Identity of the run a decision belongs to.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub generated_at: DateTime<FixedOffset>,
}

pub struct SurpriseRanker<'a> {
    client: &'a dyn RankingClient,
    timeout: Duration,
}

impl<'a> SurpriseRanker<'a> {
    pub fn new(client: &'a dyn RankingClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Picks one winner from the pool. Any ranking failure lands on the
    /// top-scored candidate. An empty pool makes no call and yields `None`.
    pub async fn rank(&self, pool: CandidatePool, ctx: &RunContext) -> Option<Decision> {
        if pool.is_empty() {
            debug!("Ranking skipped - empty candidate pool");
            return None;
        }

        let prompt = user_surprise_ranking(&format_candidates(&pool));
        let outcome = match self.ask(&prompt).await {
            Ok(text) => parse_analysis(&text, &pool),
            Err(e) => Err(e),
        };

        let (selected, analysis) = match outcome {
            Ok(found) => found,
            Err(e) => {
                warn!("Ranking failed, using keyword-score fallback - error={}", e);
                fallback_selection(&pool)?
            }
        };

        let is_fallback = analysis.origin == AnalysisOrigin::Fallback;
        info!(
            "Ranking completed - selected_index={}, fallback={}, surprise_score={:?}",
            analysis.selected_index, is_fallback, analysis.surprise_score
        );

        Some(Decision {
            run_id: ctx.run_id.clone(),
            generated_at: ctx.generated_at,
            model: self.client.model().to_string(),
            selected_article: selected,
            analysis,
            all_candidates: pool,
            is_fallback,
        })
    }

    async fn ask(&self, prompt: &str) -> Result<String, RankError> {
        match tokio::time::timeout(self.timeout, self.client.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(RankError::Timeout(self.timeout)),
        }
    }
}

/// Slice from the first `{` to the last `}`, so prose around the object is tolerated.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub fn parse_analysis(
    text: &str,
    pool: &CandidatePool,
) -> Result<(ScoredArticle, AnalysisResult), RankError> {
    let block = extract_json_block(text).ok_or(RankError::NoJsonObject)?;
    let resp: RankingResponse = serde_json::from_str(block)?;

    let index = match resp.selected_index {
        Some(i) if i >= 1 && (i as usize) <= pool.len() => i as usize,
        other => {
            debug!("Clamping selected_index to 1 - got={:?}, pool={}", other, pool.len());
            1
        }
    };
    let selected = pool.get(index).ok_or(RankError::NoJsonObject)?.clone();

    let title = resp.title();
    let comparison = resp.comparison_narrative();
    let mut reasons = resp.surprise_reasons.unwrap_or_default();
    reasons.retain(|r| !r.trim().is_empty());
    reasons.truncate(MAX_SURPRISE_REASONS);

    let analysis = AnalysisResult {
        origin: AnalysisOrigin::Model,
        selected_index: index,
        title_localized: non_blank(title).unwrap_or_else(|| selected.article.title.clone()),
        summary: non_blank(resp.summary).unwrap_or_else(|| selected.article.summary.clone()),
        surprise_reasons: reasons,
        engineer_impact: non_blank(resp.engineer_impact).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        business_impact: non_blank(resp.business_impact).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        surprise_score: resp.surprise_score.map(clamp_score),
        comparison_narrative: non_blank(comparison)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    };
    Ok((selected, analysis))
}

/// The pool is score-sorted, so its head is the highest preliminary score
/// (first in pool order on ties).
pub fn fallback_selection(pool: &CandidatePool) -> Option<(ScoredArticle, AnalysisResult)> {
    let top = pool.top()?.clone();
    let analysis = AnalysisResult {
        origin: AnalysisOrigin::Fallback,
        selected_index: 1,
        title_localized: top.article.title.clone(),
        summary: top.article.summary.clone(),
        surprise_reasons: vec![FALLBACK_REASON.to_string()],
        engineer_impact: NOT_AVAILABLE.to_string(),
        business_impact: NOT_AVAILABLE.to_string(),
        surprise_score: Some(clamp_score(top.preliminary_score)),
        comparison_narrative: NOT_AVAILABLE.to_string(),
    };
    Some((top, analysis))
}

fn clamp_score(v: i64) -> u8 {
    v.clamp(0, 100) as u8
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
