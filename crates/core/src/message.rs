//! Message Models
//!
//! The values that make up a rendered conversation: who wrote a bubble, how
//! its body is interpreted, and the audio clips attached to voice messages.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decorative bars drawn for an audio bubble.
pub const WAVEFORM_BAR_COUNT: usize = 20;
/// Bar heights fall in `WAVEFORM_MIN_HEIGHT..WAVEFORM_MIN_HEIGHT + WAVEFORM_HEIGHT_SPREAD`.
pub const WAVEFORM_MIN_HEIGHT: u8 = 5;
pub const WAVEFORM_HEIGHT_SPREAD: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    You,
    AidWin,
    System,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::You => write!(f, "You"),
            Author::AidWin => write!(f, "AID Win"),
            Author::System => write!(f, "System"),
        }
    }
}

/// Visual side of a bubble. Everything not typed by the user sits on the
/// `AidWin` side, including system notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    You,
    AidWin,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::You => write!(f, "you"),
            MessageKind::AidWin => write!(f, "aidwin"),
        }
    }
}

/// A playable voice message plus the bar heights of its waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub data_url: String,
    pub waveform: Vec<u8>,
}

impl AudioClip {
    pub fn new(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
            waveform: waveform_bars(WAVEFORM_BAR_COUNT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    /// Rendered literally.
    Text(String),
    /// Trusted markup from the backend, kept verbatim.
    Html(String),
    Audio(AudioClip),
    /// The three-dot typing indicator of a pending exchange.
    Typing,
}

impl Body {
    /// Text bodies for the user's side, markup for everything else.
    pub fn for_kind(kind: MessageKind, content: impl Into<String>) -> Self {
        match kind {
            MessageKind::You => Body::Text(content.into()),
            MessageKind::AidWin => Body::Html(content.into()),
        }
    }
}

/// Local wall-clock time formatted the way bubbles display it.
pub fn current_timestamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Random heights for a decorative waveform.
pub fn waveform_bars(count: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| WAVEFORM_MIN_HEIGHT + rng.random_range(0..WAVEFORM_HEIGHT_SPREAD))
        .collect()
}
