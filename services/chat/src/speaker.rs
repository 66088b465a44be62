//! Speaker Playback
//!
//! Voice messages are converted to the output device's rate and channel
//! layout up front, then streamed from memory. Device access needs the
//! `microphone` feature; the conversion below is always built.

use aidwin_core::{
    ChatError,
    audio::{DecodedAudio, downmix_to_mono, resample_mono},
};

/// Interleaves `audio` for a device running at `rate` with `channels` outputs.
pub fn prepare_for_device(
    audio: DecodedAudio,
    rate: u32,
    channels: u16,
) -> Result<Vec<f32>, ChatError> {
    let mono = downmix_to_mono(&audio.samples, audio.channels);
    let resampled = resample_mono(&mono, audio.sample_rate, rate)?;
    let width = channels.max(1) as usize;
    Ok(resampled
        .into_iter()
        .flat_map(|s| std::iter::repeat_n(s, width))
        .collect())
}

#[cfg(feature = "microphone")]
pub use device::CpalPlayer;

#[cfg(feature = "microphone")]
mod device {
    use super::prepare_for_device;
    use aidwin_core::{AudioPlayer, ChatError, audio::DecodedAudio};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};
    use tracing::{error, info};

    /// Plays through the default cpal output device. The stream idles on
    /// silence once a clip ends and is released by the next `play`.
    #[derive(Default)]
    pub struct CpalPlayer {
        stream: Option<cpal::Stream>,
    }

    impl CpalPlayer {
        pub fn new() -> Self {
            Self::default()
        }

        fn build_stream<T>(
            device: &cpal::Device,
            config: &cpal::StreamConfig,
            samples: Vec<f32>,
        ) -> Result<cpal::Stream, ChatError>
        where
            T: SizedSample + FromSample<f32>,
        {
            let mut source = samples.into_iter();
            device
                .build_output_stream(
                    config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        for slot in data.iter_mut() {
                            *slot = T::from_sample(source.next().unwrap_or(0.0));
                        }
                    },
                    |err| error!("Audio output stream error: {}", err),
                    None,
                )
                .map_err(|e| {
                    ChatError::DeviceAccessDenied(format!("failed to build output stream: {}", e))
                })
        }
    }

    impl AudioPlayer for CpalPlayer {
        fn play(&mut self, audio: DecodedAudio) -> Result<(), ChatError> {
            // Stop whatever is still playing.
            self.stream = None;

            let device = cpal::default_host().default_output_device().ok_or_else(|| {
                ChatError::DeviceAccessDenied("no default output device found".to_string())
            })?;
            let supported = device.default_output_config().map_err(|e| {
                ChatError::DeviceAccessDenied(format!("failed to query output config: {}", e))
            })?;
            let config: cpal::StreamConfig = supported.config();
            let samples = prepare_for_device(audio, config.sample_rate.0, config.channels)?;

            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, samples)?,
                cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, samples)?,
                cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, samples)?,
                other => {
                    return Err(ChatError::DeviceAccessDenied(format!(
                        "unsupported sample format {:?}",
                        other
                    )));
                }
            };
            stream
                .play()
                .map_err(|e| ChatError::Playback(format!("failed to start playback: {}", e)))?;
            info!(
                sample_rate = config.sample_rate.0,
                channels = config.channels,
                "Audio playback started"
            );
            self.stream = Some(stream);
            Ok(())
        }
    }
}
