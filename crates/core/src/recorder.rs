//! Microphone Seam
//!
//! The client never talks to an audio device directly. It drives an
//! [`AudioRecorder`], which lets the binary plug in real capture while tests
//! and headless builds substitute their own.

use crate::{audio, error::ChatError};

/// A finished recording, ready to be wrapped into a data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RecordedAudio {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn to_data_url(&self) -> String {
        audio::to_data_url(&self.mime_type, &self.bytes)
    }
}

/// Defines the contract for a capture device.
///
/// `start` acquires the device and begins buffering chunks; a refusal maps to
/// [`ChatError::DeviceAccessDenied`]. `stop` releases the device and joins
/// everything captured so far into a single recording.
#[cfg_attr(test, mockall::automock)]
pub trait AudioRecorder {
    fn start(&mut self) -> Result<(), ChatError>;
    fn stop(&mut self) -> Result<RecordedAudio, ChatError>;
}

/// A recorder for hosts without an input device. Every start is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecorder;

impl AudioRecorder for UnavailableRecorder {
    fn start(&mut self) -> Result<(), ChatError> {
        Err(ChatError::DeviceAccessDenied(
            "audio capture is not available in this build".to_string(),
        ))
    }

    fn stop(&mut self) -> Result<RecordedAudio, ChatError> {
        Err(ChatError::Recording("no recording in progress".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_recorder_refuses() {
        let mut recorder = UnavailableRecorder;
        assert!(matches!(
            recorder.start(),
            Err(ChatError::DeviceAccessDenied(_))
        ));
        assert!(matches!(recorder.stop(), Err(ChatError::Recording(_))));
    }

    #[test]
    fn test_recorded_audio_data_url() {
        let clip = RecordedAudio::new("audio/wav", b"RIFF".to_vec());
        assert_eq!(clip.to_data_url(), "data:audio/wav;base64,UklGRg==");
    }
}
