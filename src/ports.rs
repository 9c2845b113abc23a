//! Hardware and remote-service boundaries.
//!
//! Everything the controller touches outside its own memory goes through one
//! of these traits: the servo driver and LED strips ([`ActuatorPort`]), the
//! arm switch ([`InputPort`]), the microphone ([`RecordingPort`] /
//! [`AudioInput`]), the speaker ([`AudioOutput`]) and the remote speech and
//! chat services. Real hardware backends live outside this crate; the
//! [`sim`](crate::sim) module provides in-memory implementations.

use crate::error::Result;
use crate::motion::joint::JointId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An RGB colour for the mouth strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

/// Servo driver, mouth strip and status LED.
///
/// Implementations are shared between tasks behind an `Arc` and must be
/// internally synchronised. Calls are expected to be quick register writes.
pub trait ActuatorPort: Send + Sync {
    /// Write a raw 16-bit duty value to the servo channel of `joint`.
    fn set_servo(&self, joint: JointId, duty: u16) -> Result<()>;

    /// Stop driving `joint` (duty 0) so the servo goes limp.
    fn relax_servo(&self, joint: JointId) -> Result<()>;

    /// Show one frame on the mouth strip. `pixels.len()` equals the strip length.
    fn render_mouth(&self, pixels: &[Rgb]) -> Result<()>;

    /// Turn every mouth pixel off.
    fn clear_mouth(&self) -> Result<()>;

    /// Switch the status LED.
    fn set_status_led(&self, on: bool) -> Result<()>;
}

/// The physical arm/disarm switch. Debouncing is the implementor's job.
pub trait InputPort: Send + Sync {
    fn button_is_armed(&self) -> bool;
}

/// A mono recording captured from the microphone.
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    /// Samples in \[-1, 1\].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl RecordedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Synthesized speech ready for playback.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    /// Mono samples in \[-1, 1\].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Parameters for a voice-activated recording.
#[derive(Debug, Clone, Copy)]
pub struct RecordingParams {
    /// RMS level that starts and sustains the recording.
    pub threshold: f32,
    /// Continuous silence that ends the recording.
    pub silence_duration: std::time::Duration,
}

/// Abort condition checked by recorders on every buffer read.
///
/// Fires when the arm switch is turned off or shutdown is requested.
#[derive(Clone)]
pub struct RecordingAbort {
    input: Arc<dyn InputPort>,
    cancel: CancellationToken,
}

impl RecordingAbort {
    pub fn new(input: Arc<dyn InputPort>, cancel: CancellationToken) -> Self {
        Self { input, cancel }
    }

    pub fn should_abort(&self) -> bool {
        self.cancel.is_cancelled() || !self.input.button_is_armed()
    }
}

/// Voice-activated recorder.
#[async_trait]
pub trait RecordingPort: Send + Sync {
    /// Record one utterance.
    ///
    /// Returns `Ok(None)` when the recording was aborted or captured nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HeadError::NoDevice`](crate::HeadError::NoDevice) when no
    /// microphone is available.
    async fn record_until_silence(
        &self,
        params: RecordingParams,
        abort: &RecordingAbort,
    ) -> Result<Option<RecordedAudio>>;
}

/// Raw microphone buffers, consumed by the voice-activated recorder.
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Capture sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Read the next buffer. `Ok(None)` means the stream ended.
    async fn read_chunk(&self) -> Result<Option<Vec<f32>>>;
}

/// Speaker output.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Write one chunk of mono samples for immediate playback.
    async fn write_chunk(&self, samples: &[f32], sample_rate: u32) -> Result<()>;
}

/// Remote speech-to-text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio: &RecordedAudio) -> Result<String>;
}

/// Remote chat completion.
///
/// Replies carry a trailing `[emotion: <label>]` tag.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, user_text: &str) -> Result<String>;
}

/// Remote text-to-speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech>;
}
