use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One feed entry as handed over by the feed collaborator. Dates are UTC.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub summary_html: Option<String>,
}

/// One post from the social-search collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPost {
    pub text: String,
    pub link: String,
    pub author_name: String,
    pub timestamp: Option<String>, // RFC 3339, RFC 2822 or Nitter display form
}

/* Chat completions (OpenAI-compatible) */

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/* X API v2 */

#[derive(Debug, Clone, Serialize)]
pub struct CreatePostRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyTo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyTo {
    pub in_reply_to_tweet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostResponse {
    pub data: Option<CreatedPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: String,
}

/* Ranking response: every field decodes on its own; a bad field reads as missing */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingResponse {
    #[serde(default, deserialize_with = "lenient_number")]
    pub selected_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub title_localized: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title_ja: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_reasons")]
    pub surprise_reasons: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub engineer_impact: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub business_impact: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub surprise_score: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub other_candidates_comparison: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub comparison: Option<String>,
}

impl RankingResponse {
    /// `title_localized`, or the older `title_ja` key.
    pub fn title(&self) -> Option<String> {
        prefer(&self.title_localized, &self.title_ja)
    }

    /// `other_candidates_comparison`, or the shorter `comparison` key.
    pub fn comparison_narrative(&self) -> Option<String> {
        prefer(&self.other_candidates_comparison, &self.comparison)
    }
}

fn prefer(primary: &Option<String>, legacy: &Option<String>) -> Option<String> {
    primary
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .or(legacy.as_ref())
        .cloned()
}

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_number<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn lenient_reasons<'de, D>(d: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|i| match i {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(vec![s]),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_typed_fields_read_as_missing() {
        let r: RankingResponse = serde_json::from_str(
            r#"{"selected_index":"2","title_ja":"タイトル","summary":42,
                "surprise_reasons":"only one","surprise_score":87.6,"engineer_impact":null}"#,
        )
        .unwrap();
        assert_eq!(r.selected_index, Some(2));
        assert_eq!(r.title().as_deref(), Some("タイトル"));
        assert_eq!(r.summary, None);
        assert_eq!(r.surprise_reasons, Some(vec!["only one".to_string()]));
        assert_eq!(r.surprise_score, Some(88));
        assert_eq!(r.engineer_impact, None);
        assert_eq!(r.business_impact, None);
    }

    #[test]
    fn canonical_and_legacy_keys_coexist() {
        let r: RankingResponse = serde_json::from_str(
            r#"{"title_ja":"x","title_localized":"y","comparison":"c","other_candidates_comparison":null}"#,
        )
        .unwrap();
        assert_eq!(r.title().as_deref(), Some("y"));
        assert_eq!(r.comparison_narrative().as_deref(), Some("c"));

        let blank: RankingResponse = serde_json::from_str(r#"{"title_localized":" ","title_ja":"x"}"#).unwrap();
        assert_eq!(blank.title().as_deref(), Some("x"));
    }

    #[test]
    fn non_numeric_index_is_missing() {
        let r: RankingResponse = serde_json::from_str(r#"{"selected_index":"first"}"#).unwrap();
        assert_eq!(r.selected_index, None);
    }
}
