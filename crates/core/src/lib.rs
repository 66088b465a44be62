//! AID Win Chat Core
//!
//! Front-end agnostic pieces of the chat client: session identity, the page
//! and conversation model, the JSON wire protocol, the HTTP backend, audio
//! helpers, the microphone and speaker seams and the `ChatClient` controller
//! tying them together.

pub mod audio;
pub mod backend;
pub mod client;
pub mod conversation;
pub mod error;
pub mod message;
pub mod page;
pub mod player;
pub mod protocol;
pub mod recorder;
pub mod session;

pub use backend::{ChatBackend, ChatEndpoints, HttpChatBackend};
pub use client::{ChatClient, ExchangeState, RecordingState};
pub use error::ChatError;
pub use page::{ChatPage, Connectivity, PageUpdate};
pub use player::{AudioPlayer, UnavailablePlayer};
pub use recorder::{AudioRecorder, RecordedAudio, UnavailableRecorder};
pub use session::SessionId;
