//! The ordered chat history shown on the page.

use crate::message::{AudioClip, Author, Body, MessageKind};
use serde::Serialize;

/// Stable handle to one bubble, valid for as long as the bubble exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BubbleId(u64);

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bubble {
    pub id: BubbleId,
    pub author: Author,
    pub kind: MessageKind,
    pub body: Body,
    pub timestamp: Option<String>,
}

impl Bubble {
    pub fn is_typing(&self) -> bool {
        matches!(self.body, Body::Typing)
    }
}

/// Whether a pending placeholder was filled in place or, because it had
/// already gone, the content was appended as a fresh bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Replaced(BubbleId),
    Appended(BubbleId),
}

#[derive(Debug, Default, Clone)]
pub struct Conversation {
    bubbles: Vec<Bubble>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        author: Author,
        kind: MessageKind,
        body: Body,
        timestamp: Option<String>,
    ) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;
        self.bubbles.push(Bubble {
            id,
            author,
            kind,
            body,
            timestamp,
        });
        id
    }

    /// Appends a text or markup bubble, depending on `kind`.
    pub fn append_message(
        &mut self,
        author: Author,
        content: &str,
        kind: MessageKind,
        timestamp: Option<String>,
    ) -> BubbleId {
        self.push(author, kind, Body::for_kind(kind, content), timestamp)
    }

    pub fn append_audio(
        &mut self,
        author: Author,
        clip: AudioClip,
        kind: MessageKind,
        timestamp: Option<String>,
    ) -> BubbleId {
        self.push(author, kind, Body::Audio(clip), timestamp)
    }

    /// Inserts the "AID Win is typing" placeholder for a new exchange.
    pub fn add_typing_indicator(&mut self) -> BubbleId {
        self.push(Author::AidWin, MessageKind::AidWin, Body::Typing, None)
    }

    /// Fills the placeholder `id` with the backend's markup. Falls back to
    /// appending an AID Win bubble when the placeholder is gone.
    pub fn resolve_typing(&mut self, id: BubbleId, html: &str, timestamp: String) -> Placement {
        match self.typing_mut(id) {
            Some(bubble) => {
                bubble.body = Body::Html(html.to_string());
                bubble.timestamp = Some(timestamp);
                Placement::Replaced(id)
            }
            None => Placement::Appended(self.append_message(
                Author::AidWin,
                html,
                MessageKind::AidWin,
                Some(timestamp),
            )),
        }
    }

    /// Turns the placeholder `id` into a System notice, or appends one.
    pub fn fail_typing(&mut self, id: BubbleId, notice: &str, timestamp: String) -> Placement {
        match self.typing_mut(id) {
            Some(bubble) => {
                bubble.author = Author::System;
                bubble.body = Body::Text(notice.to_string());
                bubble.timestamp = Some(timestamp);
                Placement::Replaced(id)
            }
            None => Placement::Appended(self.append_message(
                Author::System,
                notice,
                MessageKind::AidWin,
                Some(timestamp),
            )),
        }
    }

    fn typing_mut(&mut self, id: BubbleId) -> Option<&mut Bubble> {
        self.bubbles
            .iter_mut()
            .find(|b| b.id == id && b.is_typing())
    }

    pub fn remove(&mut self, id: BubbleId) -> Option<Bubble> {
        let idx = self.bubbles.iter().position(|b| b.id == id)?;
        Some(self.bubbles.remove(idx))
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn latest(&self) -> Option<&Bubble> {
        self.bubbles.last()
    }

    /// The most recent voice message, however far back it is.
    pub fn latest_audio(&self) -> Option<&AudioClip> {
        self.bubbles.iter().rev().find_map(|b| match &b.body {
            Body::Audio(clip) => Some(clip),
            _ => None,
        })
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn typing_count(&self) -> usize {
        self.bubbles.iter().filter(|b| b.is_typing()).count()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_and_body_kind() {
        let mut conv = Conversation::new();
        let a = conv.append_message(
            Author::You,
            "<i>hi</i>",
            MessageKind::You,
            Some("10:00".into()),
        );
        let b = conv.append_message(Author::AidWin, "<i>hey</i>", MessageKind::AidWin, None);

        assert!(a < b);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.bubbles()[0].body, Body::Text("<i>hi</i>".into()));
        assert_eq!(conv.bubbles()[1].body, Body::Html("<i>hey</i>".into()));
        assert_eq!(conv.bubbles()[0].timestamp.as_deref(), Some("10:00"));
    }

    #[test]
    fn test_resolve_replaces_placeholder_in_place() {
        let mut conv = Conversation::new();
        conv.append_message(Author::You, "question", MessageKind::You, None);
        let typing = conv.add_typing_indicator();
        // Something else lands after the placeholder before the reply arrives.
        conv.append_message(Author::System, "notice", MessageKind::AidWin, None);

        let placement = conv.resolve_typing(typing, "<b>answer</b>", "10:01".into());

        assert_eq!(placement, Placement::Replaced(typing));
        assert_eq!(conv.len(), 3);
        let bubble = &conv.bubbles()[1];
        assert_eq!(bubble.author, Author::AidWin);
        assert_eq!(bubble.body, Body::Html("<b>answer</b>".into()));
        assert_eq!(bubble.timestamp.as_deref(), Some("10:01"));
        assert_eq!(conv.typing_count(), 0);
    }

    #[test]
    fn test_resolve_appends_when_placeholder_removed() {
        let mut conv = Conversation::new();
        let typing = conv.add_typing_indicator();
        assert!(conv.remove(typing).is_some());

        let placement = conv.resolve_typing(typing, "late", "10:02".into());

        match placement {
            Placement::Appended(id) => assert_ne!(id, typing),
            other => panic!("expected append, got {:?}", other),
        }
        let latest = conv.latest().unwrap();
        assert_eq!(latest.author, Author::AidWin);
        assert_eq!(latest.body, Body::Html("late".into()));
    }

    #[test]
    fn test_resolve_does_not_touch_settled_bubble() {
        let mut conv = Conversation::new();
        let typing = conv.add_typing_indicator();
        conv.resolve_typing(typing, "first", "10:00".into());

        let placement = conv.resolve_typing(typing, "second", "10:01".into());

        assert!(matches!(placement, Placement::Appended(_)));
        assert_eq!(conv.get(typing).unwrap().body, Body::Html("first".into()));
    }

    #[test]
    fn test_fail_turns_placeholder_into_system_notice() {
        let mut conv = Conversation::new();
        let typing = conv.add_typing_indicator();

        let placement = conv.fail_typing(typing, "<oops>", "10:03".into());

        assert_eq!(placement, Placement::Replaced(typing));
        let bubble = conv.get(typing).unwrap();
        assert_eq!(bubble.author, Author::System);
        assert_eq!(bubble.kind, MessageKind::AidWin);
        assert_eq!(bubble.body, Body::Text("<oops>".into()));
    }

    #[test]
    fn test_fail_appends_when_placeholder_missing() {
        let mut conv = Conversation::new();
        let typing = conv.add_typing_indicator();
        conv.remove(typing);

        conv.fail_typing(typing, "error", "10:04".into());

        let latest = conv.latest().unwrap();
        assert_eq!(latest.author, Author::System);
        assert_eq!(latest.body, Body::Html("error".into()));
    }

    #[test]
    fn test_latest_audio_skips_later_text() {
        let mut conv = Conversation::new();
        assert!(conv.latest_audio().is_none());
        conv.append_message(Author::You, "hello", MessageKind::You, None);
        assert!(conv.latest_audio().is_none());

        for payload in ["data:audio/wav;base64,AA==", "data:audio/wav;base64,BB=="] {
            conv.append_audio(Author::You, AudioClip::new(payload), MessageKind::You, None);
        }
        conv.append_message(Author::AidWin, "<p>reply</p>", MessageKind::AidWin, None);

        let clip = conv.latest_audio().unwrap();
        assert_eq!(clip.data_url, "data:audio/wav;base64,BB==");
    }

    #[test]
    fn test_typing_count() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());
        let a = conv.add_typing_indicator();
        conv.add_typing_indicator();
        assert_eq!(conv.typing_count(), 2);
        conv.fail_typing(a, "x", "10:00".into());
        assert_eq!(conv.typing_count(), 1);
    }
}
