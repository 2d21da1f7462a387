mod api_types;
mod config;
mod error;
mod fetch;
mod filter;
mod llm;
mod models;
mod normalize;
mod orchestrator;
mod prompts;
mod publish;
mod rank;
mod render;
mod report;
mod scoring;
mod sources;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

use config::{Settings, SocialDatePolicy, DEFAULT_RANKER_BASE_URL, DEFAULT_RANKER_MODEL, DEFAULT_X_API_BASE};
use llm::ChatCompletionsClient;
use orchestrator::{run, RunOutcome};
use publish::{Publisher, XPublisher};

/// Surprise News - picks the single most surprising AI story of the day
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// API key for the OpenAI-compatible ranking endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// IANA timezone used for the time window, run id and report timestamps
    #[arg(long, env = "TIMEZONE", default_value = "Asia/Tokyo")]
    pub timezone: String,

    /// Only articles published within this many hours are considered
    #[arg(long, env = "HOURS_LOOKBACK", default_value_t = 24)]
    pub hours_lookback: i64,

    /// Size of the candidate pool handed to the ranker
    #[arg(long, env = "MAX_CANDIDATES", default_value_t = scoring::DEFAULT_MAX_CANDIDATES)]
    pub max_candidates: usize,

    /// Output directory for the analysis JSON and markdown report (default: "output")
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: String,

    /// Post the result to X after the report is written
    #[arg(long)]
    pub publish: bool,

    /// OAuth 2.0 user-context token for posting
    #[arg(long, env = "X_USER_ACCESS_TOKEN", hide_env_values = true)]
    pub x_access_token: Option<String>,

    #[arg(long, env = "X_API_BASE", default_value = DEFAULT_X_API_BASE)]
    pub x_api_base: String,

    /// Reply to the post with engineer/business impact
    #[arg(long)]
    pub thread: bool,

    /// Public link to the report, included in the post
    #[arg(long, env = "REPORT_URL")]
    pub report_url: Option<String>,

    #[arg(long, env = "NITTER_BASE_URL", default_value = "https://nitter.net")]
    pub nitter_base_url: String,

    #[arg(long, env = "RSSHUB_BASE_URL", default_value = "https://rsshub.app")]
    pub rsshub_base_url: String,

    /// Cap on social search results
    #[arg(long, default_value_t = 50)]
    pub max_posts: usize,

    /// Sources fetched at once
    #[arg(long, default_value_t = 4)]
    pub fetch_concurrency: usize,

    #[arg(long, default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// How social search timestamps are resolved
    #[arg(long, value_enum, default_value_t = SocialDatePolicy::Parse)]
    pub social_date_policy: SocialDatePolicy,

    /// Skip X search and account feeds
    #[arg(long)]
    pub no_social: bool,

    /// JSON file overriding keyword tables, sources or social accounts
    #[arg(long, env = "KEYWORDS_FILE")]
    pub keywords_file: Option<PathBuf>,

    #[arg(long, env = "RANKER_BASE_URL", default_value = DEFAULT_RANKER_BASE_URL)]
    pub ranker_base_url: String,

    #[arg(long, env = "RANKER_MODEL", default_value = DEFAULT_RANKER_MODEL)]
    pub ranker_model: String,

    /// Upper bound on the ranking call before falling back to keyword scores
    #[arg(long, default_value_t = 60)]
    pub ranker_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

const EXIT_INTERRUPTED: u8 = 130;

/// Resolves once Ctrl-C arrives. If the handler cannot be installed the run
/// carries on uninterruptible instead of being abandoned.
async fn interrupted<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Ctrl-C handler unavailable, continuing without it - error={}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_filter)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting surprise_news");

    match real_main(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn real_main(args: &Args) -> Result<ExitCode> {
    let settings = Settings::from_args(args)?;
    debug!(
        "Settings resolved - timezone={}, lookback={}h, max_candidates={}, output_dir={}, sources={}, social={}",
        settings.timezone,
        settings.hours_lookback,
        settings.max_candidates,
        settings.output_dir.display(),
        settings.collection.sources.len(),
        settings.collection.include_social
    );

    let client = ChatCompletionsClient::new(&settings.ranker)?;
    let publisher = settings.publish.as_ref().map(XPublisher::new).transpose()?;

    let outcome = tokio::select! {
        res = run(&settings, &client, publisher.as_ref().map(|p| p as &dyn Publisher)) => res?,
        _ = interrupted(tokio::signal::ctrl_c()) => {
            warn!("Interrupted, abandoning run");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    match outcome {
        RunOutcome::Completed(done) => {
            info!(
                "Selected: {} - {} (fallback={})",
                done.decision.analysis.title_localized,
                done.decision.selected_article.article.link,
                done.decision.is_fallback
            );
            info!("Analysis: {}", done.artifact_path.display());
            info!("Report: {}", done.report_path.display());
            if let Some(p) = done.published {
                match p.post_id {
                    Some(id) if p.success => info!("Posted to X - id={}", id),
                    _ => warn!("Post to X did not complete - error={}", p.error.unwrap_or_default()),
                }
            }
        }
        RunOutcome::NoArticles => info!("Nothing to report - no recent articles"),
        RunOutcome::NoRelevantArticles => info!("Nothing to report - no AI-related articles"),
        RunOutcome::NoCandidates => info!("Nothing to report - no candidates"),
    }
    Ok(ExitCode::SUCCESS)
}
