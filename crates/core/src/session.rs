use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const SESSION_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of characters in a generated session id.
pub const SESSION_ID_LEN: usize = 5;

/// Short random token identifying one conversation to the backend.
///
/// It is generated once per client and never changes afterwards; the backend
/// only ever sees it passed through on each request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Draws a fresh id of [`SESSION_ID_LEN`] Latin letters.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| {
                let idx = rng.random_range(0..SESSION_ID_ALPHABET.len());
                SESSION_ID_ALPHABET[idx] as char
            })
            .collect();
        Self(id)
    }

    /// Text shown in the session label of the page.
    pub fn label(&self) -> String {
        format!("Session ID: {}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        for _ in 0..200 {
            let id = SessionId::generate();
            let text = id.to_string();
            assert_eq!(text.len(), SESSION_ID_LEN);
            assert!(text.chars().all(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn test_ids_vary() {
        let ids: std::collections::HashSet<_> = (0..50).map(|_| SessionId::generate()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_label_and_display() {
        let id = SessionId("AbCdE".to_string());
        assert_eq!(id.label(), "Session ID: AbCdE");
        assert_eq!(format!("{}", id), "AbCdE");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = SessionId("xYzWq".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"xYzWq\"");
    }
}
