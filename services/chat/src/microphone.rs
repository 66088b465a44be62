//! Microphone Capture
//!
//! Buffers raw device chunks while recording and turns them into a 16 kHz
//! mono WAV on stop. Device access needs the `microphone` feature; the
//! chunk finalization below is always built.

use aidwin_core::{
    ChatError, RecordedAudio,
    audio::{UPLOAD_SAMPLE_RATE, convert_f32_to_i16, downmix_to_mono, encode_wav, resample_mono},
};

pub const RECORDING_MIME_TYPE: &str = "audio/wav";

/// Joins the captured chunks into a single upload-ready recording.
pub fn finalize_chunks(
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
) -> Result<RecordedAudio, ChatError> {
    let interleaved: Vec<f32> = chunks.into_iter().flatten().collect();
    if interleaved.is_empty() {
        return Err(ChatError::Recording("no audio was captured".to_string()));
    }
    let mono = downmix_to_mono(&interleaved, channels);
    let resampled = resample_mono(&mono, sample_rate, UPLOAD_SAMPLE_RATE)?;
    let pcm16 = convert_f32_to_i16(&resampled);
    let wav = encode_wav(&pcm16, UPLOAD_SAMPLE_RATE)?;
    tracing::debug!(
        input_samples = interleaved.len(),
        output_samples = pcm16.len(),
        "Finalized recording"
    );
    Ok(RecordedAudio::new(RECORDING_MIME_TYPE, wav))
}

#[cfg(feature = "microphone")]
pub use device::CpalRecorder;

#[cfg(feature = "microphone")]
mod device {
    use super::finalize_chunks;
    use aidwin_core::{AudioRecorder, ChatError, RecordedAudio};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SizedSample};
    use std::sync::{Arc, Mutex};
    use tracing::{debug, error, info};

    /// Captures from a cpal input device. The stream lives only between
    /// `start` and `stop`, so the device is released as soon as recording ends.
    pub struct CpalRecorder {
        device_name: String,
        chunks: Arc<Mutex<Vec<Vec<f32>>>>,
        stream: Option<cpal::Stream>,
        sample_rate: u32,
        channels: u16,
    }

    impl CpalRecorder {
        pub fn new(device_name: impl Into<String>) -> Self {
            Self {
                device_name: device_name.into(),
                chunks: Arc::new(Mutex::new(Vec::new())),
                stream: None,
                sample_rate: 0,
                channels: 0,
            }
        }

        fn select_device(&self) -> Result<cpal::Device, ChatError> {
            let host = cpal::default_host();
            if self.device_name == "default" {
                return host.default_input_device().ok_or_else(|| {
                    ChatError::DeviceAccessDenied("no default input device found".to_string())
                });
            }
            let wanted = self.device_name.to_lowercase();
            host.input_devices()
                .map_err(|e| {
                    ChatError::DeviceAccessDenied(format!("failed to enumerate devices: {}", e))
                })?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&wanted))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    ChatError::DeviceAccessDenied(format!(
                        "audio device '{}' not found",
                        self.device_name
                    ))
                })
        }

        fn build_stream<T>(
            &self,
            device: &cpal::Device,
            config: &cpal::StreamConfig,
        ) -> Result<cpal::Stream, ChatError>
        where
            T: SizedSample,
            f32: FromSample<T>,
        {
            let chunks = Arc::clone(&self.chunks);
            device
                .build_input_stream(
                    config,
                    move |data: &[T], _: &cpal::InputCallbackInfo| {
                        let chunk: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                        if let Ok(mut guard) = chunks.lock() {
                            guard.push(chunk);
                        }
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                )
                .map_err(|e| {
                    ChatError::DeviceAccessDenied(format!("failed to build audio stream: {}", e))
                })
        }
    }

    impl AudioRecorder for CpalRecorder {
        fn start(&mut self) -> Result<(), ChatError> {
            if self.stream.is_some() {
                return Err(ChatError::Recording("capture already active".to_string()));
            }
            let device = self.select_device()?;
            let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
            let supported = device.default_input_config().map_err(|e| {
                ChatError::DeviceAccessDenied(format!("failed to query input config: {}", e))
            })?;
            let config: cpal::StreamConfig = supported.config();

            if let Ok(mut guard) = self.chunks.lock() {
                guard.clear();
            }
            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config)?,
                cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config)?,
                cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config)?,
                other => {
                    return Err(ChatError::DeviceAccessDenied(format!(
                        "unsupported sample format {:?}",
                        other
                    )));
                }
            };
            stream.play().map_err(|e| {
                ChatError::DeviceAccessDenied(format!("failed to start audio stream: {}", e))
            })?;

            self.sample_rate = config.sample_rate.0;
            self.channels = config.channels;
            self.stream = Some(stream);
            info!(
                device = %device_name,
                sample_rate = self.sample_rate,
                channels = self.channels,
                "Audio capture started"
            );
            Ok(())
        }

        fn stop(&mut self) -> Result<RecordedAudio, ChatError> {
            // Dropping the stream releases the device.
            if self.stream.take().is_none() {
                return Err(ChatError::Recording("no recording in progress".to_string()));
            }
            let chunks = {
                let mut guard = self
                    .chunks
                    .lock()
                    .map_err(|_| ChatError::Recording("capture buffer poisoned".to_string()))?;
                std::mem::take(&mut *guard)
            };
            debug!(chunks = chunks.len(), "Audio capture stopped");
            finalize_chunks(chunks, self.sample_rate, self.channels)
        }
    }
}
