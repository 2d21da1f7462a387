use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_64;

use crate::api_types::{RawEntry, RawPost};
use crate::config::SocialDatePolicy;
use crate::models::{Article, Language, SourceDescriptor, SourceKind};

pub const SUMMARY_MAX_CHARS: usize = 500;
pub const DERIVED_TITLE_CHARS: usize = 100;

/// Turns collaborator output into canonical `Article`s for one run.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    timezone: Tz,
    now: DateTime<Utc>,
    social_dates: SocialDatePolicy,
}

impl Normalizer {
    pub fn new(timezone: Tz, now: DateTime<Utc>, social_dates: SocialDatePolicy) -> Self {
        Self {
            timezone,
            now,
            social_dates,
        }
    }

    pub fn to_working(&self, dt: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = dt.with_timezone(&self.timezone);
        local.with_timezone(&local.offset().fix())
    }

    /// Normalizes one feed entry. `None` means "skip this entry", never a batch failure.
    pub fn feed_entry(&self, source: &SourceDescriptor, entry: RawEntry) -> Option<Article> {
        let summary = entry
            .summary_html
            .as_deref()
            .map(clean_html)
            .unwrap_or_default();

        let title = match (entry.title.map(|t| t.trim().to_string()), source.kind) {
            (Some(t), _) if !t.is_empty() => t,
            (_, SourceKind::AccountFeed) if !summary.is_empty() => truncate_chars(&summary, DERIVED_TITLE_CHARS),
            _ => {
                debug!("Skipping entry without title - source={}", source.name);
                return None;
            }
        };

        let link = match (entry.link.map(|l| l.trim().to_string()), source.kind) {
            (Some(l), _) if !l.is_empty() => l,
            (_, SourceKind::AccountFeed) => synthetic_link(&source.name, &title, &summary),
            _ => {
                debug!("Skipping entry without link - source={}, title={}", source.name, title);
                return None;
            }
        };

        let published = entry.published.or(entry.updated).unwrap_or(self.now);

        let language = match source.kind {
            SourceKind::Feed => source.language,
            SourceKind::AccountFeed | SourceKind::Search => Language::detect(&summary),
        };

        Some(Article {
            title,
            link,
            published_at: self.to_working(published),
            summary,
            source_name: source.name.clone(),
            language,
        })
    }

    pub fn social_post(&self, post: RawPost) -> Option<Article> {
        let link = post.link.trim().to_string();
        if link.is_empty() {
            debug!("Skipping post without link - author={}", post.author_name);
            return None;
        }

        let published = match self.social_dates {
            SocialDatePolicy::AssumeNow => self.now,
            SocialDatePolicy::Parse => match post.timestamp.as_deref().and_then(parse_post_timestamp) {
                Some(dt) => dt,
                None => {
                    warn!(
                        "Skipping post with unparseable timestamp - link={}, timestamp={:?}",
                        link, post.timestamp
                    );
                    return None;
                }
            },
        };

        let summary = clean_html(&post.text);
        let author = if post.author_name.trim().is_empty() {
            "unknown"
        } else {
            post.author_name.trim()
        };

        Some(Article {
            title: truncate_chars(&summary, DERIVED_TITLE_CHARS),
            link,
            published_at: self.to_working(published),
            language: Language::detect(&summary),
            summary,
            source_name: format!("X (@{})", author),
        })
    }
}

/// RFC 3339, RFC 2822, or Nitter's display form ("Jan 1, 2025 · 12:00 PM UTC").
pub fn parse_post_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let bare = s.strip_suffix("UTC").unwrap_or(s).trim();
    NaiveDateTime::parse_from_str(bare, "%b %d, %Y · %I:%M %p")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn synthetic_link(source: &str, title: &str, summary: &str) -> String {
    let h = xxh3_64(format!("{}|{}|{}", source, title, summary).as_bytes());
    format!("urn:surprise-news:{:016x}", h)
}

fn re_script() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").expect("Invalid script regex"))
}

fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"))
}

fn re_numeric_entity() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("Invalid entity regex"))
}

/// Strips markup, decodes common entities, collapses whitespace and caps at 500 chars.
pub fn clean_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let no_script = re_script().replace_all(html, " ");
    let no_tags = re_tag().replace_all(&no_script, " ");
    let decoded = decode_entities(&no_tags);
    let text: String = decoded.nfc().collect();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, SUMMARY_MAX_CHARS)
}

fn decode_entities(s: &str) -> String {
    let numeric = re_numeric_entity().replace_all(s, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
