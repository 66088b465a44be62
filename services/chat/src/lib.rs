//! AID Win Terminal Chat
//!
//! Front end for the chat core: environment configuration, stdin commands,
//! terminal rendering of page updates and, with the `microphone` feature,
//! audio capture and playback on local devices. The `aidwin-chat` binary is
//! a thin wrapper around [`app::run`].

pub mod app;
pub mod commands;
pub mod config;
pub mod microphone;
pub mod speaker;
pub mod terminal;

use aidwin_core::{AudioPlayer, AudioRecorder};
use config::Config;

/// Picks the recorder for this build.
#[cfg(feature = "microphone")]
pub fn default_recorder(config: &Config) -> Box<dyn AudioRecorder> {
    tracing::info!(device = %config.audio_device, "Microphone capture enabled");
    Box::new(microphone::CpalRecorder::new(config.audio_device.clone()))
}

/// Picks the recorder for this build.
#[cfg(not(feature = "microphone"))]
pub fn default_recorder(config: &Config) -> Box<dyn AudioRecorder> {
    tracing::info!(
        device = %config.audio_device,
        "Built without the `microphone` feature; voice messages are unavailable"
    );
    Box::new(aidwin_core::UnavailableRecorder)
}

/// Picks the voice message player for this build.
#[cfg(feature = "microphone")]
pub fn default_player() -> Box<dyn AudioPlayer> {
    Box::new(speaker::CpalPlayer::new())
}

/// Picks the voice message player for this build.
#[cfg(not(feature = "microphone"))]
pub fn default_player() -> Box<dyn AudioPlayer> {
    Box::new(aidwin_core::UnavailablePlayer)
}
