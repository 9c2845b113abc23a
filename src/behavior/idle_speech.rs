//! Filler phrases after a long quiet spell.
//!
//! The idle timer runs only while the head is armed and neither thinking nor
//! speaking. Any other state resets it. When it expires a random phrase is
//! spoken and the timer starts again.

use super::sleep_or_cancel;
use crate::config::IdleSpeechConfig;
use crate::motion::seeded_rng;
use crate::runtime::{ControlEvent, Stage};
use crate::speech::{SpeechOutcome, Speaker};
use crate::state::RuntimeState;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tracks how long the head has been idle.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    last_activity: Instant,
    threshold: Duration,
}

impl IdleTimer {
    pub fn new(now: Instant, threshold: Duration) -> Self {
        Self {
            last_activity: now,
            threshold,
        }
    }

    /// Feed one tick. Returns `true` when idle time has exceeded the
    /// threshold; the caller speaks and then calls [`reset`](Self::reset).
    pub fn observe(&mut self, now: Instant, armed: bool, busy: bool) -> bool {
        if !armed || busy {
            self.last_activity = now;
            return false;
        }
        now.saturating_duration_since(self.last_activity) > self.threshold
    }

    pub fn reset(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}

/// Speaks a filler phrase whenever the [`IdleTimer`] expires.
pub struct IdleSpeechTask {
    speaker: Arc<Speaker>,
    state: Arc<RuntimeState>,
    config: IdleSpeechConfig,
    events: mpsc::UnboundedSender<ControlEvent>,
    rng: StdRng,
}

impl IdleSpeechTask {
    pub fn new(
        speaker: Arc<Speaker>,
        state: Arc<RuntimeState>,
        config: IdleSpeechConfig,
        events: mpsc::UnboundedSender<ControlEvent>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            speaker,
            state,
            config,
            events,
            rng: seeded_rng(seed, 2),
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("idle speech started");
        let tick = Duration::from_millis(self.config.tick_ms);
        let mut timer = IdleTimer::new(Instant::now(), Duration::from_millis(self.config.idle_after_ms));
        loop {
            if sleep_or_cancel(tick, &cancel).await {
                break;
            }
            if !timer.observe(Instant::now(), self.state.armed(), self.state.busy()) {
                continue;
            }
            debug!(idle = ?timer.idle_for(Instant::now()), "idle threshold reached");
            self.speak_filler().await;
            timer.reset(Instant::now());
        }
        info!("idle speech stopped");
    }

    async fn speak_filler(&mut self) {
        let Some(phrase) = self.config.phrases.choose(&mut self.rng).cloned() else {
            return;
        };
        let event = match self.speaker.speak(&phrase, self.config.color).await {
            Ok(SpeechOutcome::Spoken(_)) => Some(ControlEvent::ConnectivityRestored),
            Ok(SpeechOutcome::Busy) => None,
            Err(e) if e.is_connectivity() => {
                warn!("idle speech: {e}");
                Some(ControlEvent::ConnectivityLost {
                    stage: Stage::Speech,
                })
            }
            Err(e) => {
                warn!("idle speech failed: {e}");
                None
            }
        };
        if let Some(event) = event
            && self.events.send(event).is_err()
        {
            debug!("controller gone, dropping {event:?}");
        }
    }
}
