//! Speaking: claim the speech permit, synthesize, play with lip sync.

use crate::error::Result;
use crate::mouth::{MouthAnimator, PlaybackStats};
use crate::ports::{Rgb, SpeechSynthesizer};
use crate::state::RuntimeState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Result of a speech request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeechOutcome {
    Spoken(PlaybackStats),
    /// Someone else holds the speech permit; nothing was said.
    Busy,
}

/// Shared by the conversation controller and the idle speech task.
///
/// Only one utterance plays at a time: `speaking` is set by claiming the
/// permit before synthesis starts and cleared when playback ends.
pub struct Speaker {
    state: Arc<RuntimeState>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    animator: MouthAnimator,
}

impl Speaker {
    pub fn new(
        state: Arc<RuntimeState>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        animator: MouthAnimator,
    ) -> Self {
        Self {
            state,
            synthesizer,
            animator,
        }
    }

    /// Say `text` with the mouth lit in `color`, unless someone is already
    /// speaking.
    ///
    /// # Errors
    ///
    /// Returns synthesis errors ([`HeadError::Connectivity`](crate::HeadError::Connectivity)
    /// when the service is unreachable) and playback errors.
    pub async fn speak(&self, text: &str, color: Rgb) -> Result<SpeechOutcome> {
        let Some(_permit) = self.state.try_begin_speaking() else {
            debug!("speech permit taken, not speaking");
            return Ok(SpeechOutcome::Busy);
        };
        info!(text, "speaking");
        let speech = self.synthesizer.synthesize(text).await?;
        let stats = self.animator.play(&speech, color).await?;
        Ok(SpeechOutcome::Spoken(stats))
    }

    /// Like [`speak`](Self::speak) but waits for the permit instead of
    /// giving up.
    ///
    /// # Errors
    ///
    /// Same as [`speak`](Self::speak).
    pub async fn speak_when_free(&self, text: &str, color: Rgb, poll: Duration) -> Result<PlaybackStats> {
        loop {
            match self.speak(text, color).await? {
                SpeechOutcome::Spoken(stats) => return Ok(stats),
                SpeechOutcome::Busy => crate::motion::pace(poll).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::{HeadConfig, MouthConfig};
    use crate::sim::{NullAudioOutput, SimulatedActuators, ToneSynthesizer};
    use crate::state::ModeWriter;

    fn speaker() -> (Speaker, Arc<ToneSynthesizer>, Arc<SimulatedActuators>, ModeWriter) {
        let config = HeadConfig::instant();
        let (state, writer) = RuntimeState::new(&config.servo);
        let actuators = Arc::new(SimulatedActuators::new(8));
        let tts = Arc::new(ToneSynthesizer::new(16_000, 0.02));
        let animator = MouthAnimator::new(
            MouthConfig {
                lip_sync_lead_ms: 0,
                ..MouthConfig::default()
            },
            actuators.clone(),
            Arc::new(NullAudioOutput::new()),
        );
        (Speaker::new(state, tts.clone(), animator), tts, actuators, writer)
    }

    #[tokio::test]
    async fn speaking_clears_the_flag_afterwards() {
        let (speaker, tts, actuators, writer) = speaker();
        let outcome = speaker.speak("hello there", Rgb::GREEN).await.unwrap();
        assert!(matches!(outcome, SpeechOutcome::Spoken(s) if s.chunks > 0));
        assert!(!writer.state().speaking());
        assert_eq!(tts.spoken(), vec!["hello there".to_owned()]);
        assert!(actuators.mouth_frames().iter().flatten().any(|p| *p == Rgb::GREEN));
    }

    #[tokio::test]
    async fn second_speaker_backs_off() {
        let (speaker, tts, _actuators, writer) = speaker();
        let permit = writer.state().try_begin_speaking().unwrap();
        let outcome = speaker.speak("filler", Rgb::GREEN).await.unwrap();
        assert_eq!(outcome, SpeechOutcome::Busy);
        assert!(tts.spoken().is_empty());
        drop(permit);
    }

    #[tokio::test]
    async fn synthesis_failure_releases_the_permit() {
        let (speaker, tts, _actuators, writer) = speaker();
        tts.offline_for("hello");
        let err = speaker.speak("hello", Rgb::GREEN).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(!writer.state().speaking());
    }

    #[tokio::test]
    async fn speak_when_free_waits_for_the_permit() {
        let (speaker, tts, _actuators, writer) = speaker();
        let permit = writer.state().try_begin_speaking().unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(permit);
        });
        speaker
            .speak_when_free("reply", Rgb::GREEN, Duration::from_millis(1))
            .await
            .unwrap();
        release.await.unwrap();
        assert_eq!(tts.spoken(), vec!["reply".to_owned()]);
    }
}
