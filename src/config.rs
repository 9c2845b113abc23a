//! Configuration types for the animatronic head.

use crate::error::{HeadError, Result};
use crate::motion::joint::Direction;
use crate::ports::Rgb;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the head.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadConfig {
    /// Servo geometry: travel limits, trims, directions, pulse widths.
    pub servo: ServoConfig,
    /// Interpolation and blink timing.
    pub motion: MotionConfig,
    /// Eye behaviour task timing and fidget amplitudes.
    pub eyes: EyeBehaviorConfig,
    /// Status LED cadence.
    pub status: StatusConfig,
    /// Filler utterances after long silences.
    pub idle_speech: IdleSpeechConfig,
    /// Mouth LED strip and lip-sync settings.
    pub mouth: MouthConfig,
    /// Voice-activated recording.
    pub recording: RecordingConfig,
    /// Conversation loop settings.
    pub conversation: ConversationConfig,
}

/// Inclusive angle range in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: i32,
    pub max: i32,
}

impl AngleRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Integer midpoint (floor division, matching the servo trims).
    pub fn mid(&self) -> i32 {
        (self.min + self.max).div_euclid(2)
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }
}

/// Inclusive range of milliseconds, sampled uniformly for randomized pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MillisRange {
    pub min: u64,
    pub max: u64,
}

impl MillisRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

/// Per-joint direction multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointDirections {
    pub left_x: Direction,
    pub left_y: Direction,
    pub left_blink: Direction,
    pub right_x: Direction,
    pub right_y: Direction,
    pub right_blink: Direction,
}

impl Default for JointDirections {
    fn default() -> Self {
        // The right eye assembly is mounted mirrored on the vertical and lid axes.
        Self {
            left_x: Direction::Normal,
            left_y: Direction::Normal,
            left_blink: Direction::Normal,
            right_x: Direction::Normal,
            right_y: Direction::Inverted,
            right_blink: Direction::Inverted,
        }
    }
}

/// Servo geometry and pulse-width mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Horizontal eye travel.
    pub eye_x: AngleRange,
    /// Vertical eye travel.
    pub eye_y: AngleRange,
    /// Eyelid travel: `min` is the nominal open position, `max` fully closed.
    pub blink: AngleRange,
    /// Open trim of the left eyelid (may be negative).
    pub blink_open_left: i32,
    /// Open trim of the right eyelid.
    pub blink_open_right: i32,
    /// Direction multiplier of every joint.
    pub directions: JointDirections,
    /// Pulse width at 0 degrees, in milliseconds.
    pub min_pulse_ms: f64,
    /// Pulse width at full actuation range, in milliseconds.
    pub max_pulse_ms: f64,
    /// PWM period in milliseconds (20 ms = 50 Hz).
    pub period_ms: f64,
    /// Angle mapped onto `max_pulse_ms`.
    pub actuation_range_deg: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            eye_x: AngleRange::new(70, 110),
            eye_y: AngleRange::new(70, 110),
            blink: AngleRange::new(0, 40),
            blink_open_left: -12,
            blink_open_right: 0,
            directions: JointDirections::default(),
            min_pulse_ms: 0.5,
            max_pulse_ms: 2.5,
            period_ms: 20.0,
            actuation_range_deg: 180.0,
        }
    }
}

/// Interpolation and blink choreography timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Degrees advanced per interpolation frame.
    pub move_step: u32,
    /// Delay after every interpolation frame, in ms.
    pub move_delay_ms: u64,
    /// Delay after every blink frame, in ms.
    pub blink_step_ms: f64,
    /// Time the lids stay shut between closing and opening, in ms.
    pub blink_hold_ms: u64,
    /// Lag of the right eyelid behind the left, in ms.
    pub blink_side_delay_ms: f64,
    /// Pause between the two blinks of a double blink, in ms.
    pub double_blink_pause_ms: u64,
    /// Time given to the lids to reach the closed position before relaxing them.
    pub eyelid_settle_ms: u64,
    /// Optional RNG seed for reproducible motion (simulation and tests).
    pub seed: Option<u64>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_step: 1,
            move_delay_ms: 10,
            blink_step_ms: 3.0,
            blink_hold_ms: 100,
            blink_side_delay_ms: 30.0,
            double_blink_pause_ms: 300,
            eyelid_settle_ms: 300,
            seed: None,
        }
    }
}

impl MotionConfig {
    /// Config with every delay set to zero, for tests and fast simulation.
    pub fn instant() -> Self {
        Self {
            move_delay_ms: 0,
            blink_step_ms: 0.0,
            blink_hold_ms: 0,
            double_blink_pause_ms: 0,
            eyelid_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }

    pub fn blink_step(&self) -> Duration {
        Duration::from_secs_f64(self.blink_step_ms.max(0.0) / 1000.0)
    }

    pub fn blink_hold(&self) -> Duration {
        Duration::from_millis(self.blink_hold_ms)
    }

    /// Number of frames the right eyelid lags the left one.
    ///
    /// Derived from the side delay divided by the per-frame duration. The
    /// ratio is computed on the nominal step even when the step delay is zero
    /// so that the stagger shape does not depend on playback speed.
    pub fn blink_side_offset_steps(&self) -> i32 {
        let step = if self.blink_step_ms > 0.0 {
            self.blink_step_ms
        } else {
            MotionConfig::default().blink_step_ms
        };
        (self.blink_side_delay_ms / step).round().max(0.0) as i32
    }
}

/// Eye behaviour task settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeBehaviorConfig {
    /// Poll interval while offline or disarmed.
    pub poll_ms: u64,
    /// Sampling radius (fraction of half travel) while thinking.
    pub thinking_scale: f64,
    /// Blink probability per thinking glance.
    pub thinking_blink_chance: f64,
    /// Pause after each thinking glance.
    pub thinking_pause_ms: u64,
    /// Sampling radius while speaking.
    pub speaking_scale: f64,
    /// Blink probability per speaking fidget.
    pub speaking_blink_chance: f64,
    /// Pause after each speaking fidget.
    pub speaking_pause_ms: MillisRange,
    /// Sampling radius while idle.
    pub idle_scale: f64,
    /// Pause after each idle glance.
    pub idle_pause_ms: MillisRange,
    /// Interval between scheduled idle blinks.
    pub blink_interval_ms: MillisRange,
    /// Minimum time since the last blink before a fidget blink is allowed.
    pub min_blink_gap_ms: u64,
}

impl Default for EyeBehaviorConfig {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            thinking_scale: 0.5,
            thinking_blink_chance: 0.3,
            thinking_pause_ms: 1000,
            speaking_scale: 0.3,
            speaking_blink_chance: 0.2,
            speaking_pause_ms: MillisRange::new(800, 1800),
            idle_scale: 1.0,
            idle_pause_ms: MillisRange::new(1000, 3000),
            blink_interval_ms: MillisRange::new(7000, 12_000),
            min_blink_gap_ms: 200,
        }
    }
}

/// Status LED cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Poll interval for the off and solid states.
    pub poll_ms: u64,
    /// On time while blinking.
    pub blink_on_ms: u64,
    /// Off time while blinking.
    pub blink_off_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            blink_on_ms: 300,
            blink_off_ms: 300,
        }
    }
}

/// Filler utterances spoken after a long silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleSpeechConfig {
    /// Whether the idle speech task runs at all.
    pub enabled: bool,
    /// Tick interval of the idle timer.
    pub tick_ms: u64,
    /// Silence after which a filler phrase is spoken.
    pub idle_after_ms: u64,
    /// Candidate phrases, one picked uniformly per utterance.
    pub phrases: Vec<String>,
    /// Mouth colour for filler phrases.
    pub color: Rgb,
}

impl Default for IdleSpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_ms: 1000,
            idle_after_ms: 90_000,
            phrases: [
                "Ready when you are.",
                "Anything I can help with?",
                "I'm here whenever you need me.",
                "Just say the word.",
                "How can I help?",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            color: Rgb::GREEN,
        }
    }
}

/// Mouth LED strip and lip-sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthConfig {
    /// Number of pixels on the mouth strip (must be even).
    pub num_pixels: usize,
    /// Exponential smoothing factor: 0 = jumpy, towards 1 = smooth and slow.
    pub smoothing: f32,
    /// Gain `k` of the `log10(1 + k * rms)` loudness compression.
    pub compression_gain: f32,
    /// Samples per playback chunk.
    pub chunk_size: usize,
    /// Delay before the first chunk so light and sound onset line up.
    pub lip_sync_lead_ms: u64,
}

impl Default for MouthConfig {
    fn default() -> Self {
        Self {
            num_pixels: 8,
            smoothing: 0.6,
            compression_gain: 55.0,
            chunk_size: 512,
            lip_sync_lead_ms: 70,
        }
    }
}

/// Voice-activated recording settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// RMS (f32 samples in \[-1, 1\]) that starts and sustains a recording.
    ///
    /// The default is 2400 on the 16-bit scale.
    pub threshold: f32,
    /// Continuous silence that ends a recording.
    pub silence_duration_ms: u64,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per capture buffer.
    pub chunk_size: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            threshold: 2400.0 / 32768.0,
            silence_duration_ms: 600,
            sample_rate: 44_100,
            chunk_size: 1024,
        }
    }
}

impl RecordingConfig {
    pub fn silence_duration(&self) -> Duration {
        Duration::from_millis(self.silence_duration_ms)
    }
}

/// Conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Switch poll interval while disarmed.
    pub disarmed_poll_ms: u64,
    /// Pause after a turn that produced no transcript.
    pub empty_transcript_pause_ms: u64,
    /// Line spoken once at startup (empty = silent start).
    pub startup_phrase: String,
    /// Mouth colour of the startup line.
    pub startup_color: Rgb,
    /// Transcripts that end the program.
    pub exit_phrases: Vec<String>,
    /// Red mouth flashes in the offline pose.
    pub offline_flashes: u32,
    /// On and off duration of each offline flash.
    pub offline_flash_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            disarmed_poll_ms: 50,
            empty_transcript_pause_ms: 500,
            startup_phrase: "I'm ready. Press the button and ask me a question.".to_owned(),
            startup_color: Rgb::GREEN,
            exit_phrases: vec!["quit".to_owned(), "exit".to_owned(), "stop".to_owned()],
            offline_flashes: 3,
            offline_flash_ms: 250,
        }
    }
}

impl HeadConfig {
    /// Config with all motion, pacing and polling delays collapsed to near
    /// zero. Used by tests and by fast simulation runs.
    pub fn instant() -> Self {
        let mut config = Self {
            motion: MotionConfig::instant(),
            ..Self::default()
        };
        config.motion.seed = Some(7);
        config.eyes.poll_ms = 1;
        config.eyes.thinking_pause_ms = 1;
        config.eyes.speaking_pause_ms = MillisRange::new(1, 1);
        config.eyes.idle_pause_ms = MillisRange::new(1, 1);
        config.status.poll_ms = 1;
        config.status.blink_on_ms = 1;
        config.status.blink_off_ms = 1;
        config.idle_speech.tick_ms = 1;
        config.mouth.lip_sync_lead_ms = 0;
        config.conversation.disarmed_poll_ms = 1;
        config.conversation.empty_transcript_pause_ms = 0;
        config.conversation.offline_flash_ms = 0;
        config
    }

    /// Check cross-field constraints that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`HeadError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let servo = &self.servo;
        for (name, range) in [
            ("servo.eye_x", servo.eye_x),
            ("servo.eye_y", servo.eye_y),
            ("servo.blink", servo.blink),
        ] {
            if range.min >= range.max {
                return Err(HeadError::Config(format!(
                    "{name}: min ({}) must be below max ({})",
                    range.min, range.max
                )));
            }
        }
        if servo.blink_open_left > servo.blink.max || servo.blink_open_right > servo.blink.max {
            return Err(HeadError::Config(
                "servo: eyelid open trims must not exceed the closed position".into(),
            ));
        }
        if servo.period_ms <= 0.0 || servo.actuation_range_deg <= 0.0 {
            return Err(HeadError::Config(
                "servo: period and actuation range must be positive".into(),
            ));
        }
        if servo.min_pulse_ms >= servo.max_pulse_ms {
            return Err(HeadError::Config(
                "servo: min_pulse_ms must be below max_pulse_ms".into(),
            ));
        }
        if self.motion.move_step == 0 {
            return Err(HeadError::Config("motion.move_step must be at least 1".into()));
        }

        let eyes = &self.eyes;
        for (name, p) in [
            ("eyes.thinking_blink_chance", eyes.thinking_blink_chance),
            ("eyes.speaking_blink_chance", eyes.speaking_blink_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(HeadError::Config(format!("{name} must be within [0, 1]")));
            }
        }
        for (name, scale) in [
            ("eyes.thinking_scale", eyes.thinking_scale),
            ("eyes.speaking_scale", eyes.speaking_scale),
            ("eyes.idle_scale", eyes.idle_scale),
        ] {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(HeadError::Config(format!("{name} must be within (0, 1]")));
            }
        }
        for (name, range) in [
            ("eyes.speaking_pause_ms", eyes.speaking_pause_ms),
            ("eyes.idle_pause_ms", eyes.idle_pause_ms),
            ("eyes.blink_interval_ms", eyes.blink_interval_ms),
        ] {
            if !range.is_valid() {
                return Err(HeadError::Config(format!("{name}: min must not exceed max")));
            }
        }

        let mouth = &self.mouth;
        if mouth.num_pixels == 0 || mouth.num_pixels % 2 != 0 {
            return Err(HeadError::Config(format!(
                "mouth.num_pixels must be a positive even number, got {}",
                mouth.num_pixels
            )));
        }
        if !(0.0..1.0).contains(&mouth.smoothing) {
            return Err(HeadError::Config("mouth.smoothing must be within [0, 1)".into()));
        }
        if mouth.chunk_size == 0 || self.recording.chunk_size == 0 {
            return Err(HeadError::Config("chunk sizes must be positive".into()));
        }
        if self.recording.sample_rate == 0 {
            return Err(HeadError::Config("recording.sample_rate must be positive".into()));
        }
        if self.idle_speech.enabled && self.idle_speech.phrases.is_empty() {
            return Err(HeadError::Config(
                "idle_speech.phrases must not be empty while idle speech is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| HeadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serialize to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HeadError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/animatron/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::env::temp_dir().join("animatron-config"))
            .join("animatron")
            .join("config.toml")
    }
}
