//! Streaming recognition for live dictation.
//!
//! Incoming PCM frames are cut into fixed-length segments. Every segment is recognized once
//! when it closes (a `Final` event); while it is still open, a snapshot is recognized at a
//! shorter cadence to produce `Interim` events.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::audio::AudioClip;
use super::{SpeechError, SpeechToText};

/// Segment boundaries for a 16-bit mono PCM stream.
#[derive(Debug, Clone, Copy)]
pub struct SegmentPolicy {
    pub sample_rate: u32,
    pub interim_every: Duration,
    pub segment_length: Duration,
    /// Trailing audio shorter than this is discarded when the stream ends.
    pub min_final: Duration,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self {
            sample_rate: super::audio::DEFAULT_SAMPLE_RATE,
            interim_every: Duration::from_secs(2),
            segment_length: Duration::from_secs(8),
            min_final: Duration::from_millis(500),
        }
    }
}

impl SegmentPolicy {
    fn bytes_for(&self, duration: Duration) -> usize {
        let samples = (self.sample_rate as f64 * duration.as_secs_f64()) as usize;
        samples.max(1) * 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentCut {
    Interim(Vec<u8>),
    Final(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Interim(String),
    Final(String),
}

/// Accumulates PCM bytes and decides when a segment is recognized.
#[derive(Debug)]
pub struct PcmSegmenter {
    segment: Vec<u8>,
    since_interim: usize,
    interim_bytes: usize,
    segment_bytes: usize,
    min_final_bytes: usize,
}

impl PcmSegmenter {
    pub fn new(policy: &SegmentPolicy) -> Self {
        let segment_bytes = policy.bytes_for(policy.segment_length);
        Self {
            segment: Vec::with_capacity(segment_bytes),
            since_interim: 0,
            interim_bytes: policy.bytes_for(policy.interim_every),
            segment_bytes,
            min_final_bytes: policy.bytes_for(policy.min_final),
        }
    }

    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<SegmentCut> {
        let mut cuts = Vec::new();
        while !chunk.is_empty() {
            let take = (self.segment_bytes - self.segment.len()).min(chunk.len());
            self.segment.extend_from_slice(&chunk[..take]);
            self.since_interim += take;
            chunk = &chunk[take..];

            if self.segment.len() >= self.segment_bytes {
                cuts.push(SegmentCut::Final(std::mem::take(&mut self.segment)));
                self.since_interim = 0;
            } else if self.since_interim >= self.interim_bytes {
                cuts.push(SegmentCut::Interim(self.segment.clone()));
                self.since_interim = 0;
            }
        }
        cuts
    }

    /// Closes the open segment, returning it when it is long enough to recognize.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.segment);
        self.since_interim = 0;
        (rest.len() >= self.min_final_bytes).then_some(rest)
    }
}

/// Recognizes audio from `audio` until the sender is dropped, then flushes the open segment.
///
/// Silence (`NoMatch`) is skipped quietly; other failures are logged and the stream continues.
pub async fn run_recognition(
    stt: Arc<dyn SpeechToText>,
    language: String,
    policy: SegmentPolicy,
    mut audio: mpsc::Receiver<Bytes>,
    events: mpsc::Sender<RecognitionEvent>,
) {
    let mut segmenter = PcmSegmenter::new(&policy);

    while let Some(chunk) = audio.recv().await {
        for cut in segmenter.push(&chunk) {
            let (pcm, is_final) = match cut {
                SegmentCut::Interim(pcm) => (pcm, false),
                SegmentCut::Final(pcm) => (pcm, true),
            };
            if let Some(text) = recognize_pcm(stt.as_ref(), &language, &policy, &pcm).await {
                let event = if is_final {
                    RecognitionEvent::Final(text)
                } else {
                    RecognitionEvent::Interim(text)
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
        }
    }

    if let Some(pcm) = segmenter.finish() {
        if let Some(text) = recognize_pcm(stt.as_ref(), &language, &policy, &pcm).await {
            let _ = events.send(RecognitionEvent::Final(text)).await;
        }
    }
    debug!("Recognition stream drained");
}

async fn recognize_pcm(
    stt: &dyn SpeechToText,
    language: &str,
    policy: &SegmentPolicy,
    pcm: &[u8],
) -> Option<String> {
    let clip = match AudioClip::from_pcm16_mono(pcm, policy.sample_rate) {
        Ok(clip) => clip,
        Err(e) => {
            warn!("Could not wrap live audio segment: {e}");
            return None;
        }
    };
    match stt.recognize(&clip, language).await {
        Ok(text) => Some(text),
        Err(SpeechError::NoMatch(_)) | Err(SpeechError::EmptyText) => None,
        Err(e) => {
            warn!("Live segment recognition failed: {e}");
            None
        }
    }
}
