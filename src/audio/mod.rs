//! Microphone capture, WAV decoding and signal helpers.

pub mod recorder;
pub mod wav;

pub use recorder::VoiceActivatedRecorder;

/// Root-mean-square amplitude of `samples`; 0 for an empty buffer.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
