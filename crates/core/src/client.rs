//! Chat Client Controller
//!
//! `ChatClient` mediates between user actions and the two backend endpoints.
//! It owns the session id and the page model, drives the typing placeholder
//! of each exchange through `AwaitingResponse` to `Resolved` or `Failed`, and
//! runs the recording state machine on top of an [`AudioRecorder`].
//!
//! Every operation takes `&mut self`, so exchanges issued from one front end
//! are naturally serialized, matching a send control that stays disabled
//! while a request is pending.

use crate::{
    audio::{decode_clip, detect_audio_format},
    backend::ChatBackend,
    conversation::{BubbleId, Placement},
    error::ChatError,
    message::{AudioClip, Author, MessageKind, current_timestamp},
    page::{ChatPage, Connectivity, PageUpdate},
    player::{AudioPlayer, UnavailablePlayer},
    protocol::{AudioRequest, ChatRequest, ChatResponse},
    recorder::AudioRecorder,
    session::SessionId,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

pub const TEXT_FAILURE_NOTICE: &str = "Sorry, there was an error communicating with the server.";
pub const AUDIO_FAILURE_NOTICE: &str = "Sorry, there was an error processing your audio message.";
pub const MICROPHONE_DENIED_NOTICE: &str = "Microphone access denied or not available.";
pub const OFFLINE_NOTICE: &str =
    "You appear to be offline. Messages will be sent when connection is restored.";
pub const NO_VOICE_MESSAGE_NOTICE: &str = "There is no voice message to play yet.";
pub const PLAYBACK_UNAVAILABLE_NOTICE: &str = "Audio playback is not available.";
pub const PLAYBACK_FAILURE_NOTICE: &str = "Sorry, this voice message could not be played.";

/// Lifecycle of the most recent request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingResponse,
    Resolved,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Capturing,
    Finalizing,
}

pub struct ChatClient {
    session_id: SessionId,
    backend: Arc<dyn ChatBackend>,
    recorder: Box<dyn AudioRecorder>,
    player: Box<dyn AudioPlayer>,
    page: ChatPage,
    exchange: ExchangeState,
    recording: RecordingState,
    updates: Option<mpsc::UnboundedSender<PageUpdate>>,
}

impl ChatClient {
    /// Creates a client with a freshly generated session id.
    pub fn new(backend: Arc<dyn ChatBackend>, recorder: Box<dyn AudioRecorder>) -> Self {
        let session_id = SessionId::generate();
        let page = ChatPage::new(&session_id);
        Self {
            session_id,
            backend,
            recorder,
            player: Box::new(UnavailablePlayer),
            page,
            exchange: ExchangeState::Idle,
            recording: RecordingState::Idle,
            updates: None,
        }
    }

    /// Publishes every page change on `tx`.
    pub fn with_updates(mut self, tx: mpsc::UnboundedSender<PageUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// Plays voice messages through `player` instead of refusing them.
    pub fn with_player(mut self, player: Box<dyn AudioPlayer>) -> Self {
        self.player = player;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn page(&self) -> &ChatPage {
        &self.page
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording
    }

    /// Shows the session label, disables sending, probes the backend and
    /// hands focus to the input.
    #[instrument(name = "chat_init", skip_all, fields(session_id = %self.session_id))]
    pub async fn initialize(&mut self) {
        info!("Initializing chat client");
        self.emit(PageUpdate::SessionAssigned {
            label: self.page.session_label.clone(),
        });
        self.page.send_enabled = false;
        self.emit(PageUpdate::SendEnabled { enabled: false });
        self.check_connectivity().await;
        self.emit(PageUpdate::FocusInput);
    }

    /// Replaces the input buffer. Sending is enabled only for non-blank input.
    pub fn set_input(&mut self, text: &str) {
        self.page.input = text.to_string();
        self.set_send_enabled(!text.trim().is_empty());
    }

    /// Sends whatever is in the input buffer.
    pub async fn submit(&mut self) {
        let input = self.page.input.clone();
        self.send_text(&input).await;
    }

    /// Posts a text message and settles its typing placeholder with the reply.
    ///
    /// Blank input is ignored: no bubble is added and no request leaves.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn send_text(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            debug!("Ignoring blank message");
            return;
        }
        let message = message.to_string();

        self.append_message(
            Author::You,
            &message,
            MessageKind::You,
            Some(current_timestamp()),
        );
        self.page.input.clear();
        self.emit(PageUpdate::InputCleared);
        self.set_send_enabled(false);

        let placeholder = self.begin_exchange();
        let request = ChatRequest {
            user_message: message,
            session_id: self.session_id.clone(),
        };
        info!(chars = request.user_message.len(), "Sending text message");
        let result = self.backend.send_text(&request).await;

        let state = self.finish_exchange(placeholder, result, TEXT_FAILURE_NOTICE);
        if state == ExchangeState::Resolved {
            self.emit(PageUpdate::FocusInput);
        }
    }

    /// Starts capturing when idle, or stops and uploads the recording.
    pub async fn toggle_recording(&mut self) {
        match self.recording {
            RecordingState::Idle => self.start_recording(),
            RecordingState::Capturing => self.stop_recording().await,
            RecordingState::Finalizing => debug!("Recording is already being finalized"),
        }
    }

    fn start_recording(&mut self) {
        match self.recorder.start() {
            Ok(()) => {
                self.recording = RecordingState::Capturing;
                self.page.recording = true;
                self.emit(PageUpdate::Recording { active: true });
                info!("Recording started");
            }
            Err(e) => {
                error!(error = %e, "Error accessing microphone");
                self.append_message(
                    Author::System,
                    MICROPHONE_DENIED_NOTICE,
                    MessageKind::AidWin,
                    None,
                );
            }
        }
    }

    async fn stop_recording(&mut self) {
        self.recording = RecordingState::Finalizing;
        let finished = self.recorder.stop();

        self.recording = RecordingState::Idle;
        self.page.recording = false;
        self.emit(PageUpdate::Recording { active: false });

        match finished {
            Ok(recorded) => {
                info!(
                    bytes = recorded.bytes.len(),
                    mime = %recorded.mime_type,
                    "Recording finalized"
                );
                self.send_audio(recorded.to_data_url()).await;
            }
            Err(e) => {
                error!(error = %e, "Failed to finalize recording");
                self.append_message(
                    Author::System,
                    AUDIO_FAILURE_NOTICE,
                    MessageKind::AidWin,
                    Some(current_timestamp()),
                );
            }
        }
    }

    /// Posts a base64 data-URL recording and settles its placeholder.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub async fn send_audio(&mut self, payload: String) {
        let clip = AudioClip::new(payload.clone());
        let id = self.page.conversation.append_audio(
            Author::You,
            clip,
            MessageKind::You,
            Some(current_timestamp()),
        );
        self.publish_appended(id);

        let placeholder = self.begin_exchange();
        let audio_format = detect_audio_format(&payload);
        info!(%audio_format, bytes = payload.len(), "Sending audio message");
        let request = AudioRequest {
            audio_data: payload,
            session_id: self.session_id.clone(),
            audio_format,
        };
        let result = self.backend.send_audio(&request).await;

        self.finish_exchange(placeholder, result, AUDIO_FAILURE_NOTICE);
    }

    /// Probes the chat endpoint and records the outcome.
    pub async fn check_connectivity(&mut self) {
        match self.backend.probe().await {
            Ok(()) => self.update_connection_status(true),
            Err(e) => {
                warn!(error = %e, "Connectivity probe failed");
                self.update_connection_status(false);
            }
        }
    }

    /// Probes like [`Self::check_connectivity`] but always publishes the
    /// resulting status, changed or not.
    pub async fn report_connectivity(&mut self) {
        let before = self.page.connectivity;
        self.check_connectivity().await;
        let state = self.page.connectivity;
        if state == before {
            self.emit(PageUpdate::Connectivity {
                state,
                label: state.label().to_string(),
            });
        }
    }

    /// Plays the most recent voice message of the conversation.
    pub fn play_latest_audio(&mut self) {
        let Some(clip) = self.page.conversation.latest_audio() else {
            debug!("No voice message to play");
            let notice = NO_VOICE_MESSAGE_NOTICE;
            self.append_message(Author::System, notice, MessageKind::AidWin, None);
            return;
        };
        let decoded = match decode_clip(&clip.data_url) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "Voice message cannot be decoded");
                let notice = PLAYBACK_FAILURE_NOTICE;
                self.append_message(Author::System, notice, MessageKind::AidWin, None);
                return;
            }
        };
        let seconds = decoded.duration_secs();
        match self.player.play(decoded) {
            Ok(()) => {
                info!(seconds, "Playing voice message");
                self.emit(PageUpdate::PlaybackStarted { seconds });
            }
            Err(ChatError::DeviceAccessDenied(reason)) => {
                warn!(%reason, "No audio output available");
                let notice = PLAYBACK_UNAVAILABLE_NOTICE;
                self.append_message(Author::System, notice, MessageKind::AidWin, None);
            }
            Err(e) => {
                error!(error = %e, "Playback failed");
                let notice = PLAYBACK_FAILURE_NOTICE;
                self.append_message(Author::System, notice, MessageKind::AidWin, None);
            }
        }
    }

    /// Applies a connectivity change; going offline posts the advisory notice.
    pub fn update_connection_status(&mut self, online: bool) {
        let state = Connectivity::from_online(online);
        if self.page.connectivity == state {
            return;
        }
        info!(%state, "Connectivity changed");
        self.page.connectivity = state;
        self.emit(PageUpdate::Connectivity {
            state,
            label: state.label().to_string(),
        });
        if !online {
            self.append_message(Author::System, OFFLINE_NOTICE, MessageKind::AidWin, None);
        }
    }

    fn begin_exchange(&mut self) -> BubbleId {
        let placeholder = self.page.conversation.add_typing_indicator();
        self.publish_appended(placeholder);
        self.set_loading(true);
        self.exchange = ExchangeState::AwaitingResponse;
        placeholder
    }

    fn finish_exchange(
        &mut self,
        placeholder: BubbleId,
        result: Result<ChatResponse, ChatError>,
        failure_notice: &str,
    ) -> ExchangeState {
        self.set_loading(false);

        let state = match result {
            Ok(response) => {
                if let Some(percent) = response.progress {
                    self.update_progress(percent);
                }
                match response.content() {
                    Some(html) => {
                        let placement = self.page.conversation.resolve_typing(
                            placeholder,
                            html,
                            current_timestamp(),
                        );
                        self.publish_placement(placement);
                        ExchangeState::Resolved
                    }
                    None => {
                        warn!("Backend reply carried no response content");
                        self.fail_placeholder(placeholder, failure_notice);
                        ExchangeState::Failed
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Exchange failed");
                self.fail_placeholder(placeholder, failure_notice);
                ExchangeState::Failed
            }
        };
        self.exchange = state;
        state
    }

    fn fail_placeholder(&mut self, placeholder: BubbleId, notice: &str) {
        let placement = self
            .page
            .conversation
            .fail_typing(placeholder, notice, current_timestamp());
        self.publish_placement(placement);
    }

    fn update_progress(&mut self, percent: f64) {
        if self.page.set_progress(percent) {
            self.emit(PageUpdate::Progress { percent });
        } else {
            debug!(percent, "Ignoring out-of-range progress");
        }
    }

    fn append_message(
        &mut self,
        author: Author,
        content: &str,
        kind: MessageKind,
        timestamp: Option<String>,
    ) {
        let id = self
            .page
            .conversation
            .append_message(author, content, kind, timestamp);
        self.publish_appended(id);
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        if self.page.send_enabled != enabled {
            self.page.send_enabled = enabled;
            self.emit(PageUpdate::SendEnabled { enabled });
        }
    }

    fn set_loading(&mut self, visible: bool) {
        self.page.loading = visible;
        self.emit(PageUpdate::Loading { visible });
    }

    fn publish_appended(&self, id: BubbleId) {
        if let Some(bubble) = self.page.conversation.get(id) {
            self.emit(PageUpdate::BubbleAppended {
                bubble: bubble.clone(),
            });
        }
    }

    fn publish_placement(&self, placement: Placement) {
        match placement {
            Placement::Replaced(id) => {
                if let Some(bubble) = self.page.conversation.get(id) {
                    self.emit(PageUpdate::BubbleReplaced {
                        bubble: bubble.clone(),
                    });
                }
            }
            Placement::Appended(id) => self.publish_appended(id),
        }
    }

    fn emit(&self, update: PageUpdate) {
        if let Some(tx) = &self.updates {
            if tx.send(update).is_err() {
                warn!("Failed to publish page update: receiver dropped.");
            }
        }
    }
}
