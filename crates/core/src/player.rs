//! Speaker Seam
//!
//! Playback of a voice message goes through an [`AudioPlayer`], mirroring the
//! recorder seam on the capture side.

use crate::{audio::DecodedAudio, error::ChatError};

/// Defines the contract for an output device.
///
/// `play` starts the clip and returns without waiting for it to finish.
/// Starting a new clip stops whatever was playing before.
#[cfg_attr(test, mockall::automock)]
pub trait AudioPlayer {
    fn play(&mut self, audio: DecodedAudio) -> Result<(), ChatError>;
}

/// A player for hosts without an output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePlayer;

impl AudioPlayer for UnavailablePlayer {
    fn play(&mut self, _audio: DecodedAudio) -> Result<(), ChatError> {
        Err(ChatError::DeviceAccessDenied(
            "audio playback is not available in this build".to_string(),
        ))
    }
}
