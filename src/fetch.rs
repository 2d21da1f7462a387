use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::api_types::{RawEntry, RawPost};
use crate::config::CollectionSettings;
use crate::models::{Article, Language, SourceDescriptor, SourceKind};
use crate::normalize::Normalizer;

const USER_AGENT: &str = "surprise_news/0.1";

/// Feed and social collaborators. Every failure degrades to an empty list
/// for that source; nothing here aborts the run.
pub struct Collector<'a> {
    client: Client,
    settings: &'a CollectionSettings,
    normalizer: Normalizer,
}

/// Source kinds that produced at least one article, for the report footer.
#[derive(Debug, Default)]
pub struct Collected {
    pub articles: Vec<Article>,
    pub kinds: Vec<&'static str>,
}

impl<'a> Collector<'a> {
    pub fn new(settings: &'a CollectionSettings, normalizer: Normalizer) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.fetch_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            settings,
            normalizer,
        })
    }

    /// Feeds first (configuration order), then social search, then account feeds.
    pub async fn collect_all(&self) -> Collected {
        let mut out = Collected::default();

        let feeds = self.collect_feeds(&self.settings.sources).await;
        info!("RSS articles collected: {}", feeds.len());
        if !feeds.is_empty() {
            out.kinds.push("RSS");
        }
        out.articles.extend(feeds);

        if self.settings.include_social {
            let search = self.collect_from_search().await;
            info!("X search articles collected: {}", search.len());
            if !search.is_empty() {
                out.kinds.push("X (search)");
            }
            out.articles.extend(search);

            let accounts = self.account_sources();
            let from_accounts = self.collect_feeds(&accounts).await;
            info!("X account articles collected: {}", from_accounts.len());
            if !from_accounts.is_empty() {
                out.kinds.push("X (accounts)");
            }
            out.articles.extend(from_accounts);
        }

        info!("Total articles collected: {}", out.articles.len());
        out
    }

    /// Bounded concurrency; `buffered` yields in input order so the merge is deterministic.
    async fn collect_feeds(&self, sources: &[SourceDescriptor]) -> Vec<Article> {
        let per_source: Vec<Vec<Article>> = stream::iter(sources)
            .map(|source| self.collect_source(source))
            .buffered(self.settings.fetch_concurrency)
            .collect()
            .await;
        per_source.into_iter().flatten().collect()
    }

    async fn collect_source(&self, source: &SourceDescriptor) -> Vec<Article> {
        let start = std::time::Instant::now();
        let entries = match self.fetch_entries(&source.url).await {
            Ok(e) => e,
            Err(e) => {
                warn!("Error collecting from {}: {:#}", source.name, e);
                return Vec::new();
            }
        };
        let total = entries.len();
        let articles: Vec<Article> = entries
            .into_iter()
            .filter_map(|entry| self.normalizer.feed_entry(source, entry))
            .collect();
        info!(
            "Collected {} articles from {} - entries={}, duration={:.2}s",
            articles.len(),
            source.name,
            total,
            start.elapsed().as_secs_f32()
        );
        articles
    }

    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        if !resp.status().is_success() {
            bail!("HTTP {} for {}", resp.status(), url);
        }
        let bytes = resp.bytes().await.context("Failed to read feed body")?;
        parse_feed(&bytes)
    }

    async fn collect_from_search(&self) -> Vec<Article> {
        let keywords = &self.settings.social_search_keywords;
        if keywords.is_empty() {
            debug!("No social search keywords configured, skipping X search");
            return Vec::new();
        }
        let query = keywords.join(" OR ");
        info!("Searching X for: {}", query);

        let url = match search_url(&self.settings.nitter_base_url, &query) {
            Ok(u) => u,
            Err(e) => {
                warn!("Invalid social search URL: {:#}", e);
                return Vec::new();
            }
        };
        let entries = match self.fetch_entries(url.as_str()).await {
            Ok(e) => e,
            Err(e) => {
                warn!("Error collecting from X search: {:#}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .take(self.settings.max_posts)
            .filter_map(entry_to_post)
            .filter_map(|post| self.normalizer.social_post(post))
            .collect()
    }

    fn account_sources(&self) -> Vec<SourceDescriptor> {
        self.settings
            .social_accounts
            .iter()
            .map(|account| SourceDescriptor {
                name: format!("X (@{})", account),
                url: format!("{}/twitter/user/{}", self.settings.rsshub_base_url, account),
                language: Language::En,
                kind: SourceKind::AccountFeed,
            })
            .collect()
    }
}

pub fn search_url(base: &str, query: &str) -> Result<Url> {
    let url = Url::parse_with_params(
        &format!("{}/search/rss", base.trim_end_matches('/')),
        &[("f", "tweets"), ("q", query)],
    )?;
    Ok(url)
}

/// RSS / Atom / JSON Feed into raw entries. Body falls back from summary to content.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawEntry>> {
    let feed = feed_rs::parser::parse(bytes).context("Failed to parse RSS/Atom feed")?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));
            let summary_html = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            RawEntry {
                title: entry.title.map(|t| t.content),
                link,
                published: entry.published,
                updated: entry.updated,
                summary_html,
            }
        })
        .collect())
}

/// Search results arrive as feed items; the post text is the item body.
fn entry_to_post(entry: RawEntry) -> Option<RawPost> {
    let link = entry.link?;
    let text = entry.summary_html.or(entry.title).unwrap_or_default();
    let author_name = author_from_link(&link).unwrap_or_else(|| "unknown".to_string());
    Some(RawPost {
        text,
        link,
        author_name,
        timestamp: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
    })
}

/// `https://nitter.example/<user>/status/<id>` → `<user>`.
fn author_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let mut segments = url.path_segments()?;
    let user = segments.next().filter(|s| !s.is_empty())?;
    (segments.next() == Some("status")).then(|| user.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocialDatePolicy;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Feed</title>
<item><title>OpenAI launches a model</title><link>https://example.com/1</link>
<pubDate>Mon, 10 Mar 2025 08:00:00 GMT</pubDate>
<description>&lt;p&gt;A &lt;b&gt;breakthrough&lt;/b&gt; model&lt;/p&gt;</description></item>
<item><link>https://example.com/untitled</link><description>no title</description></item>
</channel></rss>"#;

    const SEARCH: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>search</title>
<item><title>post</title><link>https://nitter.example/someone/status/42</link>
<pubDate>Mon, 10 Mar 2025 09:00:00 GMT</pubDate>
<description>Claude just got faster</description></item>
</channel></rss>"#;

    fn settings(base: &str) -> CollectionSettings {
        CollectionSettings {
            sources: vec![
                SourceDescriptor::feed("Good", &format!("{}/good.xml", base), Language::En),
                SourceDescriptor::feed("Down", &format!("{}/down.xml", base), Language::En),
            ],
            social_search_keywords: vec!["Claude".to_string(), "OpenAI".to_string()],
            social_accounts: vec!["OpenAI".to_string()],
            nitter_base_url: base.to_string(),
            rsshub_base_url: base.to_string(),
            max_posts: 50,
            fetch_concurrency: 2,
            fetch_timeout: Duration::from_secs(5),
            social_date_policy: SocialDatePolicy::Parse,
            include_social: true,
        }
    }

    fn normalizer() -> Normalizer {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        Normalizer::new(chrono_tz::Asia::Tokyo, now, SocialDatePolicy::Parse)
    }

    #[test]
    fn parses_rss_items() {
        let entries = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("OpenAI launches a model"));
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(entries[0].published, Some(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()));
        assert!(entries[0].summary_html.as_deref().unwrap().contains("<b>breakthrough</b>"));
        assert_eq!(entries[1].title, None);
    }

    #[test]
    fn malformed_feed_is_an_error() {
        assert!(parse_feed(b"not a feed").is_err());
    }

    #[test]
    fn search_url_encodes_query() {
        let u = search_url("https://nitter.example/", "Claude OR 生成AI").unwrap();
        assert!(u.as_str().starts_with("https://nitter.example/search/rss?f=tweets&q=Claude+OR+"));
    }

    #[test]
    fn author_comes_from_status_link() {
        assert_eq!(author_from_link("https://nitter.example/someone/status/42").as_deref(), Some("someone"));
        assert_eq!(author_from_link("https://nitter.example/search"), None);
    }

    #[tokio::test]
    async fn failing_sources_degrade_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down.xml"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/rss"))
            .and(query_param("q", "Claude OR OpenAI"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/twitter/user/OpenAI"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let s = settings(&server.uri());
        let collector = Collector::new(&s, normalizer()).unwrap();
        let collected = collector.collect_all().await;

        let links: Vec<_> = collected.articles.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(links, vec!["https://example.com/1", "https://nitter.example/someone/status/42"]);
        assert_eq!(collected.articles[0].summary, "A breakthrough model");
        assert_eq!(collected.articles[1].source_name, "X (@someone)");
        assert_eq!(collected.kinds, vec!["RSS", "X (search)"]);
    }
}
