//! Status LED: off while disarmed, blinking while busy, solid while listening.

use super::sleep_or_cancel;
use crate::config::StatusConfig;
use crate::error::Result;
use crate::ports::ActuatorPort;
use crate::state::RuntimeState;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the status LED should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPattern {
    Off,
    Blinking,
    Solid,
}

impl StatusPattern {
    pub fn decide(armed: bool, busy: bool) -> Self {
        match (armed, busy) {
            (false, _) => Self::Off,
            (true, true) => Self::Blinking,
            (true, false) => Self::Solid,
        }
    }

    pub fn from_state(state: &RuntimeState) -> Self {
        Self::decide(state.armed(), state.busy())
    }

    /// Apply a steady pattern right away. `Blinking` is left to the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the LED write fails.
    pub fn apply_steady(self, actuators: &dyn ActuatorPort) -> Result<()> {
        match self {
            Self::Off => actuators.set_status_led(false),
            Self::Solid => actuators.set_status_led(true),
            Self::Blinking => Ok(()),
        }
    }
}

/// Keeps the status LED in step with [`RuntimeState`].
pub struct StatusIndicatorTask {
    actuators: Arc<dyn ActuatorPort>,
    state: Arc<RuntimeState>,
    config: StatusConfig,
}

impl StatusIndicatorTask {
    pub fn new(
        actuators: Arc<dyn ActuatorPort>,
        state: Arc<RuntimeState>,
        config: StatusConfig,
    ) -> Self {
        Self {
            actuators,
            state,
            config,
        }
    }

    /// Run until `cancel` fires, then switch the LED off.
    pub async fn run(self, cancel: CancellationToken) {
        info!("status indicator started");
        let poll = Duration::from_millis(self.config.poll_ms);
        let on = Duration::from_millis(self.config.blink_on_ms);
        let off = Duration::from_millis(self.config.blink_off_ms);
        loop {
            let pattern = StatusPattern::from_state(&self.state);
            let stopped = match pattern {
                StatusPattern::Off | StatusPattern::Solid => {
                    self.write(pattern == StatusPattern::Solid);
                    sleep_or_cancel(poll, &cancel).await
                }
                StatusPattern::Blinking => {
                    self.write(true);
                    if sleep_or_cancel(on, &cancel).await {
                        true
                    } else {
                        self.write(false);
                        sleep_or_cancel(off, &cancel).await
                    }
                }
            };
            if stopped {
                break;
            }
        }
        self.write(false);
        info!("status indicator stopped");
    }

    fn write(&self, on: bool) {
        if let Err(e) = self.actuators.set_status_led(on) {
            warn!("status LED write failed: {e}");
        }
    }
}
