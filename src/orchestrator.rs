use anyhow::Result;
use chrono::{DateTime, Offset, Utc};
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Settings;
use crate::fetch::Collector;
use crate::filter::{cutoff, dedupe, filter_by_time, is_relevant};
use crate::llm::RankingClient;
use crate::models::{Article, Decision};
use crate::normalize::Normalizer;
use crate::publish::{PublishOutcome, Publisher};
use crate::rank::{RunContext, SurpriseRanker};
use crate::report::{persist, synthesize};
use crate::scoring::select_candidates;

#[derive(Debug)]
pub enum RunOutcome {
    NoArticles,
    NoRelevantArticles,
    NoCandidates,
    Completed(Box<CompletedRun>),
}

#[derive(Debug)]
pub struct CompletedRun {
    pub decision: Decision,
    pub artifact_path: PathBuf,
    pub report_path: PathBuf,
    pub published: Option<PublishOutcome>,
}

/// Result of the network-free part of a run.
#[derive(Debug)]
pub enum Selection {
    Stopped(RunOutcome),
    Decided(Decision),
}

/// `YYYYmmdd_HHMMSS` in the working timezone plus the matching timestamp.
pub fn run_context(settings: &Settings, now: DateTime<Utc>) -> RunContext {
    let local = now.with_timezone(&settings.timezone);
    RunContext {
        run_id: local.format("%Y%m%d_%H%M%S").to_string(),
        generated_at: local.with_timezone(&local.offset().fix()),
    }
}

/// filter → dedupe → relevance → score → rank.
pub async fn process(
    articles: Vec<Article>,
    settings: &Settings,
    client: &dyn RankingClient,
    now: DateTime<Utc>,
) -> Selection {
    let ctx = run_context(settings, now);
    let collected = articles.len();

    let since = cutoff(now, settings.timezone, settings.hours_lookback);
    let recent = dedupe(filter_by_time(articles, since));
    info!(
        "Time window applied - collected={}, recent={}, cutoff={}",
        collected,
        recent.len(),
        since.to_rfc3339()
    );
    if recent.is_empty() {
        warn!("No articles found within the last {} hours", settings.hours_lookback);
        return Selection::Stopped(RunOutcome::NoArticles);
    }

    let relevant: Vec<Article> = recent
        .into_iter()
        .filter(|a| is_relevant(a, &settings.keywords.relevance))
        .collect();
    info!("AI-related articles: {}", relevant.len());
    if relevant.is_empty() {
        warn!("No AI-related articles found");
        return Selection::Stopped(RunOutcome::NoRelevantArticles);
    }

    let pool = select_candidates(relevant, &settings.keywords.surprise, settings.max_candidates);
    info!("Candidate pool selected - size={}", pool.len());

    let ranker = SurpriseRanker::new(client, settings.ranker.timeout);
    match ranker.rank(pool, &ctx).await {
        Some(decision) => Selection::Decided(decision),
        None => {
            warn!("No candidates available for ranking");
            Selection::Stopped(RunOutcome::NoCandidates)
        }
    }
}

/// One full invocation. Errors are only configuration or artifact-write failures;
/// every collection, ranking and publishing problem degrades inside the run.
pub async fn run(
    settings: &Settings,
    client: &dyn RankingClient,
    publisher: Option<&dyn Publisher>,
) -> Result<RunOutcome> {
    let now = Utc::now();
    let ctx = run_context(settings, now);
    let span = info_span!("run", run_id = %ctx.run_id);
    run_inner(settings, client, publisher, now).instrument(span).await
}

async fn run_inner(
    settings: &Settings,
    client: &dyn RankingClient,
    publisher: Option<&dyn Publisher>,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let pipeline_start = std::time::Instant::now();
    info!("Pipeline started - timezone={}, lookback={}h", settings.timezone, settings.hours_lookback);

    let normalizer = Normalizer::new(settings.timezone, now, settings.collection.social_date_policy);
    let collector = Collector::new(&settings.collection, normalizer)?;
    let fetch_start = std::time::Instant::now();
    let collected = collector.collect_all().await;
    info!(
        "Collection completed - articles={}, duration={:.2}s",
        collected.articles.len(),
        fetch_start.elapsed().as_secs_f32()
    );
    if collected.articles.is_empty() {
        warn!("No articles collected from any source");
        return Ok(RunOutcome::NoArticles);
    }

    let rank_start = std::time::Instant::now();
    let decision = match process(collected.articles, settings, client, now).await {
        Selection::Decided(d) => d,
        Selection::Stopped(outcome) => return Ok(outcome),
    };
    info!("Ranking stage completed - duration={:.2}s", rank_start.elapsed().as_secs_f32());

    let report = synthesize(&decision, &collected.kinds)?;
    let persisted = persist(&report, &settings.output_dir, &decision.run_id)?;
    info!(
        "Report saved - artifact={}, report={}",
        persisted.artifact_path.display(),
        persisted.report_path.display()
    );

    let published = match (publisher, &settings.publish) {
        (Some(p), Some(cfg)) => {
            let outcome = p.publish(&decision, cfg.report_url.as_deref()).await;
            if !outcome.success {
                warn!("Publishing failed - error={}", outcome.error.as_deref().unwrap_or("unknown"));
            }
            Some(outcome)
        }
        _ => None,
    };

    info!("Pipeline completed - total_duration={:.2}s", pipeline_start.elapsed().as_secs_f32());

    Ok(RunOutcome::Completed(Box::new(CompletedRun {
        decision,
        artifact_path: persisted.artifact_path,
        report_path: persisted.report_path,
        published,
    })))
}
