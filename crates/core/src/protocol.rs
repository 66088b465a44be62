//! Defines the JSON messages exchanged with the chat and audio endpoints.

use crate::session::SessionId;
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use tracing::warn;

/// Body of a POST to the chat endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_message: String,
    pub session_id: SessionId,
}

/// Body of a POST to the audio endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    /// Full data URL, e.g. `data:audio/wav;base64,...`.
    pub audio_data: String,
    pub session_id: SessionId,
    pub audio_format: String,
}

/// Reply shape shared by both endpoints.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// HTML fragment to display. Missing or empty means there is nothing to show.
    #[serde(default)]
    pub response: Option<String>,
    /// Conversation progress, 0 to 100. Numeric strings are accepted; any
    /// other shape is dropped without failing the reply.
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_progress<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let progress = match Option::<RawProgress>::deserialize(deserializer)? {
        None => None,
        Some(RawProgress::Number(n)) => Some(n),
        Some(RawProgress::Text(text)) => match text.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(progress = %text, "Ignoring non-numeric progress");
                None
            }
        },
        Some(RawProgress::Other(_)) => {
            warn!("Ignoring progress of unexpected type");
            None
        }
    };
    Ok(progress)
}

impl ChatResponse {
    /// The response markup, if the backend sent any.
    pub fn content(&self) -> Option<&str> {
        self.response.as_deref().filter(|r| !r.is_empty())
    }
}
