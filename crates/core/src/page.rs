//! Page State
//!
//! Everything the user can see besides the history itself: input buffer,
//! send control, progress bar, spinner, recording and connectivity
//! indicators. Each change is also described by a [`PageUpdate`] so a front
//! end can redraw incrementally.

use crate::conversation::{Bubble, Conversation};
use crate::session::SessionId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    /// Text of the connection status label.
    pub fn label(self) -> &'static str {
        match self {
            Connectivity::Online => "Connected",
            Connectivity::Offline => "Disconnected",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// A single change to the page, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageUpdate {
    SessionAssigned { label: String },
    BubbleAppended { bubble: Bubble },
    /// A typing placeholder was filled in place.
    BubbleReplaced { bubble: Bubble },
    InputCleared,
    SendEnabled { enabled: bool },
    FocusInput,
    Loading { visible: bool },
    Progress { percent: f64 },
    Recording { active: bool },
    /// A voice message started playing.
    PlaybackStarted { seconds: f64 },
    Connectivity { state: Connectivity, label: String },
}

#[derive(Debug, Clone)]
pub struct ChatPage {
    pub conversation: Conversation,
    pub input: String,
    pub send_enabled: bool,
    pub loading: bool,
    pub progress: f64,
    pub recording: bool,
    pub connectivity: Connectivity,
    pub session_label: String,
}

impl ChatPage {
    pub fn new(session_id: &SessionId) -> Self {
        Self {
            conversation: Conversation::new(),
            input: String::new(),
            send_enabled: false,
            loading: false,
            progress: 0.0,
            recording: false,
            connectivity: Connectivity::Online,
            session_label: session_id.label(),
        }
    }

    /// Accepts only percentages within `0..=100`.
    pub fn set_progress(&mut self, percent: f64) -> bool {
        if (0.0..=100.0).contains(&percent) {
            self.progress = percent;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_labels() {
        assert_eq!(Connectivity::from_online(true), Connectivity::Online);
        assert_eq!(Connectivity::from_online(false), Connectivity::Offline);
        assert_eq!(Connectivity::Online.label(), "Connected");
        assert_eq!(Connectivity::Offline.label(), "Disconnected");
        assert_eq!(Connectivity::Offline.to_string(), "offline");
    }

    #[test]
    fn test_progress_bounds() {
        let mut page = ChatPage::new(&SessionId::generate());
        assert!(page.set_progress(42.0));
        assert_eq!(page.progress, 42.0);
        assert!(!page.set_progress(101.0));
        assert!(!page.set_progress(-1.0));
        assert!(!page.set_progress(f64::NAN));
        assert_eq!(page.progress, 42.0);
        assert!(page.set_progress(0.0));
        assert!(page.set_progress(100.0));
    }

    #[test]
    fn test_new_page_defaults() {
        let id = SessionId::generate();
        let page = ChatPage::new(&id);
        assert!(page.conversation.is_empty());
        assert!(!page.send_enabled);
        assert_eq!(page.connectivity, Connectivity::Online);
        assert_eq!(page.session_label, format!("Session ID: {}", id));
    }

    #[test]
    fn test_update_serialization() {
        let update = PageUpdate::Connectivity {
            state: Connectivity::Offline,
            label: "Disconnected".to_string(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "connectivity", "state": "offline", "label": "Disconnected"})
        );
    }
}
