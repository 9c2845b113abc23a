//! Lip sync on the mouth LED strip.
//!
//! Speech is played back in fixed-size chunks. For every chunk the loudness
//! is compressed, smoothed, and shown as a bar that grows outward from the
//! middle of the strip. Chunks are released against deadlines derived from
//! their index so pacing never drifts, however long the utterance.

use crate::audio::rms;
use crate::config::MouthConfig;
use crate::error::Result;
use crate::ports::{ActuatorPort, AudioOutput, Rgb, SynthesizedSpeech};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Compressed loudness in \[0, 1\]: `log10(1 + gain * rms)`, clamped.
pub fn loudness(rms: f32, gain: f32) -> f32 {
    (1.0 + gain * rms.max(0.0)).log10().clamp(0.0, 1.0)
}

/// Exponential smoother for mouth levels.
#[derive(Debug, Clone)]
pub struct LevelSmoother {
    alpha: f32,
    value: f32,
}

impl LevelSmoother {
    /// `alpha` is the weight of the previous value; it starts from closed.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: 0.0,
        }
    }

    pub fn next(&mut self, level: f32) -> f32 {
        self.value = self.alpha * self.value + (1.0 - self.alpha) * level;
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// Pixels for a mouth opened to `level`.
///
/// `round(level * n)` pixels are lit in symmetric pairs spreading from the
/// two centre pixels; an odd count lights one pair fewer.
pub fn mouth_pattern(level: f32, num_pixels: usize, color: Rgb) -> Vec<Rgb> {
    let mut pixels = vec![Rgb::OFF; num_pixels];
    if num_pixels < 2 {
        return pixels;
    }
    let lit = (level.clamp(0.0, 1.0) * num_pixels as f32).round_ties_even() as usize;
    let center_left = num_pixels / 2 - 1;
    let center_right = num_pixels / 2;
    for i in 0..(lit / 2).min(num_pixels / 2) {
        pixels[center_left - i] = color;
        pixels[center_right + i] = color;
    }
    pixels
}

/// What a finished playback looked like.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStats {
    pub chunks: usize,
    pub peak_level: f32,
}

/// Plays speech while animating the mouth strip.
pub struct MouthAnimator {
    config: MouthConfig,
    actuators: Arc<dyn ActuatorPort>,
    output: Arc<dyn AudioOutput>,
}

impl MouthAnimator {
    pub fn new(
        config: MouthConfig,
        actuators: Arc<dyn ActuatorPort>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            config,
            actuators,
            output,
        }
    }

    /// Play `speech` with the mouth lit in `color`.
    ///
    /// The mouth is cleared when playback ends, successfully or not.
    ///
    /// # Errors
    ///
    /// Returns the first audio or actuator error.
    pub async fn play(&self, speech: &SynthesizedSpeech, color: Rgb) -> Result<PlaybackStats> {
        let played = self.play_chunks(speech, color).await;
        let cleared = self.actuators.clear_mouth();
        let stats = played?;
        cleared?;
        debug!(chunks = stats.chunks, peak = stats.peak_level, "playback done");
        Ok(stats)
    }

    async fn play_chunks(&self, speech: &SynthesizedSpeech, color: Rgb) -> Result<PlaybackStats> {
        let chunk_size = self.config.chunk_size.max(1);
        let chunk_secs = if speech.sample_rate == 0 {
            0.0
        } else {
            chunk_size as f64 / f64::from(speech.sample_rate)
        };
        let lead = Duration::from_millis(self.config.lip_sync_lead_ms);
        let start = Instant::now();
        let mut smoother = LevelSmoother::new(self.config.smoothing);
        let mut stats = PlaybackStats::default();

        for (index, chunk) in speech.samples.chunks(chunk_size).enumerate() {
            let level = loudness(rms(chunk), self.config.compression_gain);
            let smoothed = smoother.next(level);
            stats.peak_level = stats.peak_level.max(smoothed);
            self.actuators
                .render_mouth(&mouth_pattern(smoothed, self.config.num_pixels, color))?;

            let deadline = start + lead + Duration::from_secs_f64(index as f64 * chunk_secs);
            tokio::time::sleep_until(deadline).await;
            self.output.write_chunk(chunk, speech.sample_rate).await?;
            stats.chunks += 1;
        }
        Ok(stats)
    }
}
