//! Audio payload decoding and validation.
//!
//! Uploaded audio arrives base64-encoded (optionally as a `data:audio/...` URL). WAV payloads
//! are inspected with `hound`; anything else is treated as 16 kHz mono 16-bit PCM and wrapped
//! in a WAV container before it is sent to the speech service.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use thiserror::Error;

/// Payloads smaller than this are rejected without inspection.
pub const MIN_AUDIO_BYTES: usize = 1000;
/// Shortest clip worth sending to the speech service.
pub const MIN_AUDIO_SECONDS: f32 = 1.0;
/// Sample rate assumed for raw PCM payloads and live dictation frames.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio_data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Audio file is too short ({0} bytes). Please record at least 1-2 seconds of audio.")]
    TooFewBytes(usize),

    #[error("Audio is {actual:.2}s long; at least {required:.1}s of speech is required")]
    TooShort { actual: f32, required: f32 },

    #[error("Unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),

    #[error("Unsupported channels: {0}")]
    UnsupportedChannels(u16),

    #[error("Unreadable WAV file: {0}")]
    Wav(#[from] hound::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub const PCM16_MONO: AudioFormat = AudioFormat {
        sample_rate: DEFAULT_SAMPLE_RATE,
        channels: 1,
        bits_per_sample: 16,
    };
}

/// A validated clip, always carried as a complete WAV file.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub wav: Vec<u8>,
    pub format: AudioFormat,
    pub duration_secs: f32,
}

impl AudioClip {
    /// Wraps raw little-endian 16-bit mono PCM in a WAV container. A trailing odd byte is dropped.
    pub fn from_pcm16_mono(pcm: &[u8], sample_rate: u32) -> Result<Self, AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in pcm.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
            }
            writer.finalize()?;
        }

        let samples = pcm.len() / 2;
        Ok(Self {
            wav: cursor.into_inner(),
            format: AudioFormat {
                sample_rate,
                ..AudioFormat::PCM16_MONO
            },
            duration_secs: samples as f32 / sample_rate as f32,
        })
    }
}

/// Decodes base64 audio, stripping a `data:audio/...;base64,` prefix when present.
pub fn decode_audio_base64(encoded: &str) -> Result<Vec<u8>, AudioError> {
    let encoded = encoded.trim();
    let payload = if encoded.starts_with("data:audio") {
        encoded.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        encoded
    };
    Ok(STANDARD.decode(payload)?)
}

/// Validates decoded audio and normalizes it to a WAV clip.
///
/// Runs before any speech-service call so short or malformed uploads are rejected locally.
pub fn validate_audio(bytes: Vec<u8>) -> Result<AudioClip, AudioError> {
    if bytes.len() < MIN_AUDIO_BYTES {
        return Err(AudioError::TooFewBytes(bytes.len()));
    }

    let clip = if is_wav(&bytes) {
        let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))?;
        let spec = reader.spec();
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&spec.sample_rate) {
            return Err(AudioError::UnsupportedSampleRate(spec.sample_rate));
        }
        if !(1..=2).contains(&spec.channels) {
            return Err(AudioError::UnsupportedChannels(spec.channels));
        }
        let duration_secs = reader.duration() as f32 / spec.sample_rate as f32;
        drop(reader);
        AudioClip {
            wav: bytes,
            format: AudioFormat {
                sample_rate: spec.sample_rate,
                channels: spec.channels,
                bits_per_sample: spec.bits_per_sample,
            },
            duration_secs,
        }
    } else {
        AudioClip::from_pcm16_mono(&bytes, DEFAULT_SAMPLE_RATE)?
    };

    if clip.duration_secs < MIN_AUDIO_SECONDS {
        return Err(AudioError::TooShort {
            actual: clip.duration_secs,
            required: MIN_AUDIO_SECONDS,
        });
    }

    Ok(clip)
}

fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a WAV file of silence with the given shape.
    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let frames = (sample_rate as f32 * seconds) as usize;
            for _ in 0..frames * channels as usize {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_strips_data_url_prefix() {
        let encoded = format!("data:audio/wav;base64,{}", STANDARD.encode(b"hello"));
        assert_eq!(decode_audio_base64(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(matches!(
            decode_audio_base64("!!not base64!!"),
            Err(AudioError::Base64(_))
        ));
    }

    #[test]
    fn test_tiny_payload_rejected() {
        assert!(matches!(
            validate_audio(vec![0u8; 200]),
            Err(AudioError::TooFewBytes(200))
        ));
    }

    #[test]
    fn test_valid_wav_accepted() {
        let clip = validate_audio(wav_bytes(16_000, 1, 2.0)).unwrap();
        assert_eq!(clip.format.sample_rate, 16_000);
        assert_eq!(clip.format.channels, 1);
        assert!((clip.duration_secs - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_short_wav_rejected() {
        let result = validate_audio(wav_bytes(16_000, 1, 0.3));
        assert!(matches!(result, Err(AudioError::TooShort { .. })));
    }

    #[test]
    fn test_unsupported_sample_rate_rejected() {
        let result = validate_audio(wav_bytes(96_000, 1, 1.5));
        assert!(matches!(result, Err(AudioError::UnsupportedSampleRate(96_000))));
    }

    #[test]
    fn test_raw_pcm_is_wrapped_as_wav() {
        let clip = validate_audio(vec![0u8; 64_000]).unwrap();
        assert!(is_wav(&clip.wav));
        assert_eq!(clip.format, AudioFormat::PCM16_MONO);
        assert!((clip.duration_secs - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_short_raw_pcm_rejected() {
        assert!(matches!(
            validate_audio(vec![0u8; 8_000]),
            Err(AudioError::TooShort { .. })
        ));
    }

    #[test]
    fn test_corrupt_riff_header_is_wav_error() {
        let mut bytes = vec![0u8; 2_000];
        bytes[..4].copy_from_slice(b"RIFF");
        bytes[8..12].copy_from_slice(b"WAVE");
        assert!(matches!(validate_audio(bytes), Err(AudioError::Wav(_))));
    }
}
