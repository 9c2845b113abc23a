//! Voice-activated recording on top of a raw [`AudioInput`].
//!
//! Buffers are discarded until one reaches the RMS threshold. From then on
//! everything is kept, and the recording ends once the input has stayed
//! below the threshold for the configured silence duration. Silence is
//! measured in captured audio time, so a slow consumer does not cut an
//! utterance short.

use super::rms;
use crate::error::Result;
use crate::ports::{AudioInput, RecordedAudio, RecordingAbort, RecordingParams, RecordingPort};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Progress of one recording.
#[derive(Debug, Default)]
struct Capture {
    samples: Vec<f32>,
    started: bool,
    silent_for: Duration,
}

impl Capture {
    /// Feed one buffer; returns `true` when the utterance is complete.
    fn push(&mut self, chunk: &[f32], chunk_duration: Duration, params: &RecordingParams) -> bool {
        let loud = rms(chunk) >= params.threshold;
        if !self.started {
            if loud {
                self.started = true;
                self.samples.extend_from_slice(chunk);
            }
            return false;
        }
        self.samples.extend_from_slice(chunk);
        if loud {
            self.silent_for = Duration::ZERO;
            false
        } else {
            self.silent_for += chunk_duration;
            self.silent_for >= params.silence_duration
        }
    }
}

/// [`RecordingPort`] that gates an [`AudioInput`] on loudness.
pub struct VoiceActivatedRecorder<I> {
    input: I,
}

impl<I: AudioInput> VoiceActivatedRecorder<I> {
    pub fn new(input: I) -> Self {
        Self { input }
    }
}

#[async_trait]
impl<I: AudioInput> RecordingPort for VoiceActivatedRecorder<I> {
    async fn record_until_silence(
        &self,
        params: RecordingParams,
        abort: &RecordingAbort,
    ) -> Result<Option<RecordedAudio>> {
        let sample_rate = self.input.sample_rate();
        let mut capture = Capture::default();
        debug!(threshold = params.threshold, "listening");

        loop {
            if abort.should_abort() {
                debug!("recording aborted");
                return Ok(None);
            }
            let Some(chunk) = self.input.read_chunk().await? else {
                break;
            };
            let chunk_duration = if sample_rate == 0 {
                Duration::ZERO
            } else {
                Duration::from_secs_f64(chunk.len() as f64 / f64::from(sample_rate))
            };
            if capture.push(&chunk, chunk_duration, &params) {
                break;
            }
        }

        if capture.samples.is_empty() {
            return Ok(None);
        }
        let audio = RecordedAudio {
            samples: capture.samples,
            sample_rate,
        };
        info!(secs = audio.duration_secs(), "recorded utterance");
        Ok(Some(audio))
    }
}
