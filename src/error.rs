use std::time::Duration;

use thiserror::Error;

/// Why a ranking attempt did not produce a usable analysis. Every variant
/// routes the run onto the keyword-score fallback.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("ranking request failed: {0}")]
    Transport(String),
    #[error("ranking request timed out after {0:?}")]
    Timeout(Duration),
    #[error("ranking API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("ranking response had no content")]
    EmptyResponse,
    #[error("no JSON object found in ranking response")]
    NoJsonObject,
    #[error("ranking response JSON did not decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RankError {
    fn from(e: reqwest::Error) -> Self {
        RankError::Transport(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("publish API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("publish response carried no post id")]
    MissingPostId,
}
