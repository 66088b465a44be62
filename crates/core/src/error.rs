//! Error types for the chat client.

/// Failures that can occur while talking to the backend or the audio devices.
///
/// None of these ever reach the user verbatim: the client turns each one into
/// a generic "System" message and logs the detail.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("microphone access denied or unavailable: {0}")]
    DeviceAccessDenied(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("server responded with status: {0}")]
    Server(u16),
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
    #[error("recording failed: {0}")]
    Recording(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

impl From<hound::Error> for ChatError {
    fn from(err: hound::Error) -> Self {
        ChatError::Recording(err.to_string())
    }
}
