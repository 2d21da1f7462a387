use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::api_types::{CreatePostRequest, CreatePostResponse, ReplyTo};
use crate::config::PublishSettings;
use crate::error::PublishError;
use crate::models::Decision;
use crate::normalize::truncate_chars;
use crate::rank::NOT_AVAILABLE;

pub const MAX_POST_CHARS: usize = 280;
const HEADER: &str = "🚀 Today's most surprising AI news";

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub success: bool,
    pub post_id: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, decision: &Decision, report_url: Option<&str>) -> PublishOutcome;
}

fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max.saturating_sub(3)))
    } else {
        s.to_string()
    }
}

fn post_title(d: &Decision, fallback_chars: usize) -> String {
    let t = d.analysis.title_localized.trim();
    if t.is_empty() {
        truncate_chars(&d.selected_article.article.title, fallback_chars)
    } else {
        t.to_string()
    }
}

/// Builds the post text, stepping down to shorter layouts until it fits in 280 chars.
pub fn format_post(d: &Decision, report_url: Option<&str>) -> String {
    let link = &d.selected_article.article.link;
    let reasons = &d.analysis.surprise_reasons;

    let mut parts = vec![HEADER.to_string(), String::new(), format!("【{}】", post_title(d, 50)), String::new()];
    if !reasons.is_empty() {
        parts.push("Why it's surprising:".to_string());
        for r in reasons.iter().take(3) {
            parts.push(format!("✨ {}", shorten(r, 60)));
        }
        parts.push(String::new());
    }
    parts.push(format!("🔗 {}", link));
    if let Some(url) = report_url {
        parts.push(format!("📊 Details: {}", url));
    }
    parts.push(String::new());
    parts.push("#AI #MachineLearning #GenerativeAI".to_string());

    let text = parts.join("\n");
    if text.chars().count() <= MAX_POST_CHARS {
        return text;
    }

    let mut parts = vec![HEADER.to_string(), String::new(), post_title(d, 40), String::new()];
    if let Some(first) = reasons.first() {
        parts.push(format!("✨ {}", shorten(first, 50)));
        parts.push(String::new());
    }
    parts.push(format!("🔗 {}", link));
    if let Some(url) = report_url {
        parts.push(format!("📊 {}", url));
    }
    parts.push(String::new());
    parts.push("#AI #MachineLearning".to_string());

    let text = parts.join("\n");
    if text.chars().count() <= MAX_POST_CHARS {
        return text;
    }

    let mut parts = vec![HEADER.to_string(), String::new(), post_title(d, 60), String::new(), format!("🔗 {}", link)];
    if let Some(url) = report_url {
        parts.push(format!("📊 {}", url));
    }
    parts.push(String::new());
    parts.push("#AI".to_string());

    truncate_chars(&parts.join("\n"), MAX_POST_CHARS)
}

/// Follow-up replies for thread mode; impacts marked N/A are left out.
pub fn thread_replies(d: &Decision) -> Vec<String> {
    [
        ("💻 Engineer perspective", &d.analysis.engineer_impact),
        ("💼 Business perspective", &d.analysis.business_impact),
    ]
    .iter()
    .filter(|(_, body)| !body.trim().is_empty() && body.trim() != NOT_AVAILABLE)
    .map(|(label, body)| format!("{}:\n{}", label, truncate_chars(body.trim(), 250)))
    .collect()
}

/// Posts to the X API v2 with a user-context bearer token.
pub struct XPublisher {
    http: Client,
    api_base: String,
    access_token: String,
    thread: bool,
}

impl XPublisher {
    pub fn new(settings: &PublishSettings) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            access_token: settings.access_token.clone(),
            thread: settings.thread,
        })
    }

    async fn create_post(&self, text: String, reply_to: Option<&str>) -> Result<String, PublishError> {
        let request = CreatePostRequest {
            text,
            reply: reply_to.map(|id| ReplyTo {
                in_reply_to_tweet_id: id.to_string(),
            }),
        };
        let response = self
            .http
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api { status, body });
        }

        let created: CreatePostResponse = response.json().await?;
        created
            .data
            .map(|p| p.id)
            .ok_or(PublishError::MissingPostId)
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, decision: &Decision, report_url: Option<&str>) -> PublishOutcome {
        let text = format_post(decision, report_url);
        let id = match self.create_post(text, None).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Post failed - error={}", e);
                return PublishOutcome {
                    success: false,
                    post_id: None,
                    error: Some(e.to_string()),
                };
            }
        };
        info!("Post published - id={}", id);

        if self.thread {
            for reply in thread_replies(decision) {
                match self.create_post(reply, Some(&id)).await {
                    Ok(reply_id) => info!("Thread reply published - id={}", reply_id),
                    Err(e) => {
                        warn!("Thread reply failed - parent={}, error={}", id, e);
                        return PublishOutcome {
                            success: false,
                            post_id: Some(id),
                            error: Some(e.to_string()),
                        };
                    }
                }
            }
        }

        PublishOutcome {
            success: true,
            post_id: Some(id),
            error: None,
        }
    }
}
