use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info};

use crate::api_types::{ChatMessage, ChatRequest, ChatResponse};
use crate::config::RankerSettings;
use crate::error::RankError;

/// Text-generation backend used by the ranker: one prompt in, free text out.
#[async_trait]
pub trait RankingClient: Send + Sync {
    /// Identity shown in reports.
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, RankError>;
}

/// OpenAI-compatible `/chat/completions` client (Groq by default).
pub struct ChatCompletionsClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(settings: &RankerSettings) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    fn headers(&self) -> Result<HeaderMap, RankError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RankError::Transport(format!("invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl RankingClient for ChatCompletionsClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, RankError> {
        let start = std::time::Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        debug!("LLM call starting - model={}, prompt_length={} chars", self.model, prompt.len());

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RankError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        let answer = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or(RankError::EmptyResponse)?;

        info!(
            "LLM API call completed - duration={:.2}s, response_length={} chars",
            start.elapsed().as_secs_f32(),
            answer.len()
        );
        Ok(answer)
    }
}
