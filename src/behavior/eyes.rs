//! Eye behaviour: idle wandering, fidgets while thinking or speaking, and
//! scheduled blinks.

use super::{sample_pause, sleep_or_cancel};
use crate::config::EyeBehaviorConfig;
use crate::error::Result;
use crate::motion::{MotionEngine, seeded_rng};
use crate::state::RuntimeState;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Glances per thinking cycle.
const THINKING_GLANCES: usize = 2;

/// What the eyes should be doing, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeMode {
    /// Holding the offline pose.
    Offline,
    Disarmed,
    Thinking,
    Speaking,
    Idle,
}

impl EyeMode {
    pub fn select(state: &RuntimeState) -> Self {
        if state.offline() {
            Self::Offline
        } else if !state.armed() {
            Self::Disarmed
        } else if state.thinking() {
            Self::Thinking
        } else if state.speaking() {
            Self::Speaking
        } else {
            Self::Idle
        }
    }
}

/// Drives the [`MotionEngine`] according to the current [`EyeMode`].
pub struct EyeBehaviorTask {
    engine: Arc<MotionEngine>,
    config: EyeBehaviorConfig,
    rng: StdRng,
    next_blink: Instant,
}

impl EyeBehaviorTask {
    pub fn new(engine: Arc<MotionEngine>, config: EyeBehaviorConfig, seed: Option<u64>) -> Self {
        let mut rng = seeded_rng(seed, 1);
        let next_blink = Instant::now() + sample_pause(&mut rng, config.blink_interval_ms);
        Self {
            engine,
            config,
            rng,
            next_blink,
        }
    }

    fn state(&self) -> &RuntimeState {
        self.engine.state()
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("eye behaviour started");
        let poll = Duration::from_millis(self.config.poll_ms);
        while !cancel.is_cancelled() {
            let mode = EyeMode::select(self.state());
            let result = match mode {
                EyeMode::Offline | EyeMode::Disarmed => Ok(sleep_or_cancel(poll, &cancel).await),
                EyeMode::Thinking => self.think(&cancel).await,
                EyeMode::Speaking => self.fidget_while_speaking(&cancel).await,
                EyeMode::Idle => self.wander(&cancel).await,
            };
            match result {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    warn!("eye motion failed: {e}");
                    if sleep_or_cancel(poll, &cancel).await {
                        break;
                    }
                }
            }
        }
        info!("eye behaviour stopped");
    }

    /// Blink with `probability` if the last blink is far enough back.
    async fn fidget_blink(&self, probability: f64) -> Result<()> {
        let gap = Duration::from_millis(self.config.min_blink_gap_ms);
        if self.state().since_last_blink(Instant::now()) > gap {
            self.engine.blink(probability).await?;
        }
        Ok(())
    }

    async fn think(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let pause = Duration::from_millis(self.config.thinking_pause_ms);
        for _ in 0..THINKING_GLANCES {
            let (x, y) = self.engine.random_target(self.config.thinking_scale);
            self.engine.look_at(x, y).await?;
            self.fidget_blink(self.config.thinking_blink_chance).await?;
            if sleep_or_cancel(pause, cancel).await {
                return Ok(true);
            }
            if EyeMode::select(self.state()) != EyeMode::Thinking {
                break;
            }
        }
        Ok(false)
    }

    async fn fidget_while_speaking(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let (x, y) = self.engine.random_target(self.config.speaking_scale);
        self.engine.look_at(x, y).await?;
        self.fidget_blink(self.config.speaking_blink_chance).await?;
        let pause = sample_pause(&mut self.rng, self.config.speaking_pause_ms);
        Ok(sleep_or_cancel(pause, cancel).await)
    }

    async fn wander(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let (x, y) = self.engine.random_target(self.config.idle_scale);
        self.engine.look_at(x, y).await?;
        let now = Instant::now();
        if now >= self.next_blink {
            self.engine.blink(1.0).await?;
            self.next_blink = now + sample_pause(&mut self.rng, self.config.blink_interval_ms);
            debug!("scheduled blink");
        }
        let pause = sample_pause(&mut self.rng, self.config.idle_pause_ms);
        Ok(sleep_or_cancel(pause, cancel).await)
    }

    /// Set when the next idle blink is due.
    #[cfg(test)]
    fn schedule_blink_at(&mut self, at: Instant) {
        self.next_blink = at;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::{HeadConfig, ServoConfig};
    use crate::motion::joint::JointId;
    use crate::sim::SimulatedActuators;
    use crate::state::ModeWriter;

    #[test]
    fn mode_priority() {
        let (state, writer) = RuntimeState::new(&ServoConfig::default());
        assert_eq!(EyeMode::select(&state), EyeMode::Disarmed);

        writer.set_armed(true);
        assert_eq!(EyeMode::select(&state), EyeMode::Idle);

        let permit = state.try_begin_speaking().unwrap();
        assert_eq!(EyeMode::select(&state), EyeMode::Speaking);

        writer.set_thinking(true);
        assert_eq!(EyeMode::select(&state), EyeMode::Thinking);

        writer.set_offline(true);
        assert_eq!(EyeMode::select(&state), EyeMode::Offline);

        writer.set_armed(false);
        assert_eq!(EyeMode::select(&state), EyeMode::Offline);
        drop(permit);
    }

    fn setup() -> (Arc<MotionEngine>, Arc<SimulatedActuators>, ModeWriter, HeadConfig) {
        let config = HeadConfig::instant();
        let actuators = Arc::new(SimulatedActuators::new(config.mouth.num_pixels));
        let (state, writer) = RuntimeState::new(&config.servo);
        let engine = Arc::new(MotionEngine::new(&config, actuators.clone(), state));
        (engine, actuators, writer, config)
    }

    #[tokio::test]
    async fn idle_eyes_wander_within_travel() {
        let (engine, actuators, writer, config) = setup();
        writer.set_armed(true);
        let cancel = CancellationToken::new();
        let task = EyeBehaviorTask::new(engine.clone(), config.eyes.clone(), Some(3));
        let handle = tokio::spawn(task.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(actuators.servo_writes() > 0);
        let x = engine.state().joint_angle(JointId::LeftX);
        assert!((70..=110).contains(&x));
    }

    #[tokio::test]
    async fn disarmed_eyes_stay_still() {
        let (engine, actuators, _writer, config) = setup();
        let cancel = CancellationToken::new();
        let task = EyeBehaviorTask::new(engine, config.eyes.clone(), Some(3));
        let handle = tokio::spawn(task.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(actuators.servo_writes(), 0);
    }

    #[tokio::test]
    async fn offline_eyes_hold_the_pose() {
        let (engine, actuators, writer, config) = setup();
        writer.set_armed(true);
        writer.set_offline(true);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(EyeBehaviorTask::new(engine, config.eyes.clone(), None).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(actuators.servo_writes(), 0);
    }

    #[tokio::test]
    async fn thinking_fidget_stays_near_centre() {
        let (engine, _actuators, writer, config) = setup();
        writer.set_armed(true);
        writer.set_thinking(true);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            EyeBehaviorTask::new(engine.clone(), config.eyes.clone(), Some(11)).run(cancel.clone()),
        );

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            let x = engine.state().joint_angle(JointId::LeftX);
            // Half travel is 20 degrees, thinking scale 0.5.
            assert!((80..=100).contains(&x), "x = {x}");
        }
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn due_blink_fires_while_idle() {
        let (engine, _actuators, writer, config) = setup();
        writer.set_armed(true);
        let cancel = CancellationToken::new();
        let mut task = EyeBehaviorTask::new(engine.clone(), config.eyes.clone(), Some(5));
        task.schedule_blink_at(Instant::now());
        let handle = tokio::spawn(task.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(engine.state().last_blink_at().is_some());
    }
}
