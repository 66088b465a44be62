use crate::error::ChatError;
use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;

/// Format reported to the audio endpoint when the payload does not declare one.
pub const DEFAULT_AUDIO_FORMAT: &str = "webm";
/// Rate recordings are resampled to before upload.
pub const UPLOAD_SAMPLE_RATE: u32 = 16000;

const DATA_URL_AUDIO_PREFIX: &str = "data:audio/";
const PLAYABLE_MIME_TYPES: [&str; 3] = ["audio/wav", "audio/x-wav", "audio/wave"];
const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Extracts the subtype from a `data:audio/<format>;...` payload.
///
/// Falls back to [`DEFAULT_AUDIO_FORMAT`] when the payload carries no
/// recognizable audio MIME type.
pub fn detect_audio_format(payload: &str) -> String {
    payload
        .find(DATA_URL_AUDIO_PREFIX)
        .map(|start| &payload[start + DATA_URL_AUDIO_PREFIX.len()..])
        .and_then(|rest| rest.split_once(';'))
        .map(|(format, _)| format)
        .filter(|format| !format.is_empty())
        .unwrap_or(DEFAULT_AUDIO_FORMAT)
        .to_string()
}

/// Builds a base64 data URL for the given MIME type and bytes.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Averages interleaved frames down to a single channel.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> Result<FastFixedIn<f32>, ChatError> {
    FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )
    .map_err(|e| ChatError::Recording(e.to_string()))
}

/// Resamples a mono buffer in one pass, flushing the tail with a partial chunk.
pub fn resample_mono(samples: &[f32], in_rate: u32, out_rate: u32) -> Result<Vec<f32>, ChatError> {
    if samples.is_empty() || in_rate == out_rate {
        return Ok(samples.to_vec());
    }
    let mut resampler = create_resampler(in_rate as f64, out_rate as f64, RESAMPLE_CHUNK_SIZE)?;
    let expected = (samples.len() as f64 * out_rate as f64 / in_rate as f64).ceil() as usize;
    let mut out = Vec::with_capacity(expected);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let take = resampler.input_frames_next();
        let chunk = vec![samples[pos..pos + take].to_vec()];
        let frames = resampler
            .process(&chunk[..], None)
            .map_err(|e| ChatError::Recording(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += take;
    }
    if pos < samples.len() {
        let tail = vec![samples[pos..].to_vec()];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| ChatError::Recording(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }
    Ok(out)
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Encodes mono 16-bit PCM as an in-memory WAV file.
pub fn encode_wav(pcm16: &[i16], sample_rate: u32) -> Result<Vec<u8>, ChatError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in pcm16 {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// PCM ready for an output device.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in `-1.0..=1.0`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.channels as f64 / self.sample_rate as f64
    }
}

/// Splits a `data:<mime>;base64,<payload>` URL into its MIME type and bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), ChatError> {
    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| ChatError::Playback("not a data URL".to_string()))?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().to_lowercase();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(ChatError::Playback("data URL is not base64 encoded".to_string()));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ChatError::Playback(e.to_string()))?;
    Ok((mime, bytes))
}

/// Reads a WAV file of 8 to 32-bit integer or 32-bit float samples.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, ChatError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| ChatError::Playback(e.to_string()))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ChatError::Playback(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChatError::Playback(e.to_string()))?
        }
    };
    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Decodes a voice message clip. Only WAV payloads can be played back.
pub fn decode_clip(data_url: &str) -> Result<DecodedAudio, ChatError> {
    let (mime, bytes) = decode_data_url(data_url)?;
    if !PLAYABLE_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ChatError::Playback(format!("cannot play {}", mime)));
    }
    decode_wav(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_declared_format() {
        assert_eq!(detect_audio_format("data:audio/ogg;base64,T2dnUw=="), "ogg");
        assert_eq!(detect_audio_format("data:audio/wav;base64,UklGRg=="), "wav");
        assert_eq!(
            detect_audio_format("data:audio/webm;codecs=opus;base64,GkXf"),
            "webm"
        );
    }

    #[test]
    fn test_detect_falls_back() {
        assert_eq!(detect_audio_format("T2dnUw=="), DEFAULT_AUDIO_FORMAT);
        assert_eq!(detect_audio_format(""), DEFAULT_AUDIO_FORMAT);
        assert_eq!(
            detect_audio_format("data:video/mp4;base64,AAAA"),
            DEFAULT_AUDIO_FORMAT
        );
        // Prefix present but no parameter separator.
        assert_eq!(detect_audio_format("data:audio/mpeg"), DEFAULT_AUDIO_FORMAT);
        assert_eq!(detect_audio_format("data:audio/;base64,"), DEFAULT_AUDIO_FORMAT);
    }

    #[test]
    fn test_to_data_url() {
        let url = to_data_url("audio/wav", b"RIFF");
        assert_eq!(url, "data:audio/wav;base64,UklGRg==");
        assert_eq!(detect_audio_format(&url), "wav");
    }

    #[test]
    fn test_downmix() {
        let stereo = [0.5, -0.5, 1.0, 0.0, 0.25];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.0, 0.5]);
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_convert_f32_to_i16() {
        let result = convert_f32_to_i16(&[1.0, -1.0, 0.0, 2.0, -2.0]);
        assert_eq!(result, vec![i16::MAX, -32767, 0, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_resample_length() {
        let input = vec![0.0f32; 48000];
        let output = resample_mono(&input, 48000, UPLOAD_SAMPLE_RATE).unwrap();
        let expected = 16000.0;
        let ratio = output.len() as f64 / expected;
        assert!((0.95..=1.1).contains(&ratio), "got {} samples", output.len());
    }

    #[test]
    fn test_resample_passthrough() {
        let input = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample_mono(&input, 16000, 16000).unwrap(), input);
        assert!(resample_mono(&[], 48000, 16000).unwrap().is_empty());
    }

    #[test]
    fn test_encode_wav_header_and_size() {
        let wav = encode_wav(&[0, 1000, -1000, i16::MAX], 16000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[test]
    fn test_decode_clip_reads_recorded_wav() {
        let wav = encode_wav(&[0, 16384, -16384, i16::MAX], UPLOAD_SAMPLE_RATE).unwrap();
        let clip = decode_clip(&to_data_url("audio/wav", &wav)).unwrap();

        assert_eq!(clip.sample_rate, UPLOAD_SAMPLE_RATE);
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.samples.len(), 4);
        assert!((clip.samples[1] - 0.5).abs() < 1e-4);
        assert!((clip.samples[2] + 0.5).abs() < 1e-4);
        assert!((clip.duration_secs() - 4.0 / 16000.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_clip_rejects_unplayable_payloads() {
        assert!(matches!(
            decode_clip("data:audio/webm;base64,GkXfow=="),
            Err(ChatError::Playback(_))
        ));
        assert!(matches!(decode_clip("T2dnUw=="), Err(ChatError::Playback(_))));
        assert!(matches!(
            decode_clip("data:audio/wav,plain"),
            Err(ChatError::Playback(_))
        ));
        assert!(matches!(
            decode_clip("data:audio/wav;base64,%%%"),
            Err(ChatError::Playback(_))
        ));
        // Valid base64 but not a RIFF file.
        assert!(matches!(
            decode_clip("data:audio/wav;base64,AAAAAAAA"),
            Err(ChatError::Playback(_))
        ));
    }

    #[test]
    fn test_decode_data_url_keeps_mime() {
        let (mime, bytes) = decode_data_url("data:Audio/WAV;base64,UklGRg==").unwrap();
        assert_eq!(mime, "audio/wav");
        assert_eq!(bytes, b"RIFF");
    }
}
