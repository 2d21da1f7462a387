use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::models::SourceDescriptor;
use crate::sources;
use crate::Args;

pub const DEFAULT_RANKER_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_RANKER_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_X_API_BASE: &str = "https://api.x.com";
/// One hundred years of hours.
pub const MAX_HOURS_LOOKBACK: i64 = 24 * 365 * 100;

/// How timestamps on social-search posts are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SocialDatePolicy {
    /// Parse the post's own timestamp; unparseable posts are skipped.
    #[default]
    Parse,
    /// Stamp every post with the current time. Posts then always pass the time window.
    AssumeNow,
}

/// Everything one run needs, resolved once up front.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: Tz,
    pub hours_lookback: i64,
    pub max_candidates: usize,
    pub output_dir: PathBuf,
    pub ranker: RankerSettings,
    pub collection: CollectionSettings,
    pub keywords: KeywordTables,
    pub publish: Option<PublishSettings>,
}

#[derive(Debug, Clone)]
pub struct RankerSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub sources: Vec<SourceDescriptor>,
    pub social_search_keywords: Vec<String>,
    pub social_accounts: Vec<String>,
    pub nitter_base_url: String,
    pub rsshub_base_url: String,
    pub max_posts: usize,
    pub fetch_concurrency: usize,
    pub fetch_timeout: Duration,
    pub social_date_policy: SocialDatePolicy,
    pub include_social: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTables {
    pub relevance: Vec<String>,
    pub surprise: Vec<(String, i64)>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            relevance: sources::default_relevance_keywords(),
            surprise: sources::default_surprise_keywords(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub access_token: String,
    pub api_base: String,
    pub thread: bool,
    pub report_url: Option<String>,
}

/// Optional JSON overrides. Absent keys keep the built-in tables.
#[derive(Debug, Default, Deserialize)]
struct KeywordFile {
    relevance_keywords: Option<Vec<String>>,
    surprise_keywords: Option<serde_json::Map<String, serde_json::Value>>,
    sources: Option<Vec<SourceDescriptor>>,
    social_search_keywords: Option<Vec<String>>,
    social_accounts: Option<Vec<String>>,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var("RANKER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        let Some(api_key) = api_key else {
            bail!("Missing required environment variable: GROQ_API_KEY (or pass --api-key)");
        };

        let timezone: Tz = args
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {}", args.timezone, e))?;

        if args.hours_lookback <= 0 || args.hours_lookback > MAX_HOURS_LOOKBACK {
            bail!(
                "--hours-lookback must be between 1 and {}, got {}",
                MAX_HOURS_LOOKBACK,
                args.hours_lookback
            );
        }
        if args.max_candidates == 0 {
            bail!("--max-candidates must be at least 1");
        }

        let publish = if args.publish {
            let Some(token) = args.x_access_token.as_deref().filter(|t| !t.trim().is_empty()) else {
                bail!("--publish requires X_USER_ACCESS_TOKEN");
            };
            Some(PublishSettings {
                access_token: token.to_string(),
                api_base: args.x_api_base.clone(),
                thread: args.thread,
                report_url: args.report_url.clone(),
            })
        } else {
            None
        };

        let mut keywords = KeywordTables::default();
        let mut collection = CollectionSettings {
            sources: sources::default_sources(),
            social_search_keywords: sources::default_social_search_keywords(),
            social_accounts: sources::default_social_accounts(),
            nitter_base_url: args.nitter_base_url.trim_end_matches('/').to_string(),
            rsshub_base_url: args.rsshub_base_url.trim_end_matches('/').to_string(),
            max_posts: args.max_posts,
            fetch_concurrency: args.fetch_concurrency.max(1),
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            social_date_policy: args.social_date_policy,
            include_social: !args.no_social,
        };

        if let Some(path) = &args.keywords_file {
            apply_keyword_file(path, &mut keywords, &mut collection)?;
        }

        Ok(Self {
            timezone,
            hours_lookback: args.hours_lookback,
            max_candidates: args.max_candidates,
            output_dir: PathBuf::from(&args.output_dir),
            ranker: RankerSettings {
                base_url: args.ranker_base_url.trim_end_matches('/').to_string(),
                api_key,
                model: args.ranker_model.clone(),
                timeout: Duration::from_secs(args.ranker_timeout_secs),
                max_tokens: 2000,
                temperature: 0.3,
            },
            collection,
            keywords,
            publish,
        })
    }
}

fn apply_keyword_file(
    path: &Path,
    keywords: &mut KeywordTables,
    collection: &mut CollectionSettings,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading keywords file {}", path.display()))?;
    let file: KeywordFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing keywords file {}", path.display()))?;

    if let Some(rel) = file.relevance_keywords {
        debug!("Keyword file overrides relevance keywords - count={}", rel.len());
        keywords.relevance = rel;
    }
    if let Some(map) = file.surprise_keywords {
        let mut table = Vec::with_capacity(map.len());
        for (k, v) in map {
            let Some(w) = v.as_i64() else {
                bail!("surprise keyword {:?} has non-integer weight {}", k, v);
            };
            table.push((k, w));
        }
        debug!("Keyword file overrides surprise keywords - count={}", table.len());
        keywords.surprise = table;
    }
    if let Some(s) = file.sources {
        collection.sources = s;
    }
    if let Some(k) = file.social_search_keywords {
        collection.social_search_keywords = k;
    }
    if let Some(a) = file.social_accounts {
        collection.social_accounts = a;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_settings(output_dir: &Path) -> Settings {
    Settings {
        timezone: chrono_tz::Asia::Tokyo,
        hours_lookback: 24,
        max_candidates: 5,
        output_dir: output_dir.to_path_buf(),
        ranker: RankerSettings {
            base_url: "http://localhost".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
            max_tokens: 2000,
            temperature: 0.3,
        },
        collection: CollectionSettings {
            sources: Vec::new(),
            social_search_keywords: Vec::new(),
            social_accounts: Vec::new(),
            nitter_base_url: "http://localhost".to_string(),
            rsshub_base_url: "http://localhost".to_string(),
            max_posts: 50,
            fetch_concurrency: 4,
            fetch_timeout: Duration::from_secs(5),
            social_date_policy: SocialDatePolicy::Parse,
            include_social: false,
        },
        keywords: KeywordTables::default(),
        publish: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["surprise_news"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut a = args(&[]);
        a.api_key = None;
        let err = Settings::from_args(&a).unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn bad_timezone_is_fatal() {
        let a = args(&["--api-key", "k", "--timezone", "Mars/Olympus"]);
        assert!(Settings::from_args(&a).is_err());
    }

    #[test]
    fn lookback_out_of_range_is_fatal() {
        for bad in ["0", "-5", "1000000000000"] {
            let flag = format!("--hours-lookback={}", bad);
            let a = args(&["--api-key", "k", &flag]);
            let err = Settings::from_args(&a).unwrap_err();
            assert!(err.to_string().contains("--hours-lookback"), "input {bad}");
        }
        let a = args(&["--api-key", "k", "--hours-lookback", &MAX_HOURS_LOOKBACK.to_string()]);
        assert_eq!(Settings::from_args(&a).unwrap().hours_lookback, MAX_HOURS_LOOKBACK);
    }

    #[test]
    fn publish_without_token_is_fatal() {
        let mut a = args(&["--api-key", "k", "--publish"]);
        a.x_access_token = None;
        assert!(Settings::from_args(&a).is_err());
    }

    #[test]
    fn keyword_file_overrides_only_given_tables() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"surprise_keywords": {{"breakthrough": 3, "launches": 2}}}}"#).unwrap();
        let path = f.path().to_str().unwrap().to_string();

        let s = Settings::from_args(&args(&["--api-key", "k", "--keywords-file", &path])).unwrap();
        assert_eq!(s.keywords.surprise.len(), 2);
        assert!(s.keywords.surprise.contains(&("launches".to_string(), 2)));
        assert_eq!(s.keywords.relevance, sources::default_relevance_keywords());
        assert_eq!(s.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(s.max_candidates, 5);
    }
}
