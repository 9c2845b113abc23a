//! Servo motion: joint interpolation, blink choreography and idle targets.
//!
//! [`MotionEngine`] is shared (`Arc`) between the eye behaviour task and the
//! conversation controller. It owns no timers of its own; every delay is a
//! per-frame pause inside a motion primitive.
//!
//! Writes are serialised per joint group: one lock for the four gaze joints,
//! one for the two eyelids. A blink holds the lid lock for its whole
//! duration and checks `armed` between frames, so the controller's
//! open/close at an arm edge waits for the blink to bail out instead of
//! interleaving with it.

pub mod blink;
pub mod joint;
pub mod servo;

use crate::config::{HeadConfig, MotionConfig, ServoConfig};
use crate::error::Result;
use crate::ports::ActuatorPort;
use crate::state::RuntimeState;
use blink::{BlinkPlan, wink_frames};
use joint::{EyeSide, JointId, MotionTarget, gaze_targets_split};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Create a task-local RNG, reproducible when `seed` is set.
///
/// `stream` separates the sequences of different consumers sharing one seed.
pub fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

/// Sleep for `delay`, or just yield when it is zero.
pub(crate) async fn pace(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

/// How a lid motion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidMotion {
    /// The full close-hold-open cycle ran.
    Completed,
    /// The random draw decided against blinking.
    Skipped,
    /// Not armed, nothing moved.
    Disarmed,
    /// Disarmed mid-motion; the lids were left where they were.
    Aborted,
}

/// Interpolation and choreography on top of an [`ActuatorPort`].
pub struct MotionEngine {
    servo: ServoConfig,
    motion: MotionConfig,
    actuators: Arc<dyn ActuatorPort>,
    state: Arc<RuntimeState>,
    rng: Mutex<StdRng>,
    gaze_lock: tokio::sync::Mutex<()>,
    lid_lock: tokio::sync::Mutex<()>,
}

impl MotionEngine {
    pub fn new(
        config: &HeadConfig,
        actuators: Arc<dyn ActuatorPort>,
        state: Arc<RuntimeState>,
    ) -> Self {
        Self {
            servo: config.servo.clone(),
            motion: config.motion.clone(),
            actuators,
            state,
            rng: Mutex::new(seeded_rng(config.motion.seed, 0)),
            gaze_lock: tokio::sync::Mutex::new(()),
            lid_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    /// Drive `joint` to `angle` using its configured direction.
    ///
    /// Does not record the angle in [`RuntimeState`].
    ///
    /// # Errors
    ///
    /// Returns an error if the actuator write fails.
    pub fn set_joint(&self, joint: JointId, angle: i32) -> Result<()> {
        self.drive(joint, self.servo.directions.get(joint), angle)
    }

    fn drive(&self, joint: JointId, direction: joint::Direction, angle: i32) -> Result<()> {
        let duty = servo::duty_for_angle(&self.servo, direction, f64::from(angle));
        trace!(%joint, angle, duty, "servo");
        self.actuators.set_servo(joint, duty)
    }

    /// Move every target joint together so they all arrive on the same frame.
    ///
    /// No-op while disarmed or offline, and when every joint is already at
    /// its target. Disarming or going offline mid-move stops the joints
    /// where they are.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn move_together(&self, targets: &[MotionTarget]) -> Result<()> {
        if !self.behavior_allowed() {
            return Ok(());
        }
        self.interpolate(targets, true).await
    }

    /// Interpolation shared by `move_together` and the controller poses.
    ///
    /// With `gated` set, `armed` and `offline` are checked before every frame.
    async fn interpolate(&self, targets: &[MotionTarget], gated: bool) -> Result<()> {
        let touches_gaze = targets.iter().any(|t| !t.joint.is_eyelid());
        let touches_lids = targets.iter().any(|t| t.joint.is_eyelid());
        // Lock order: gaze before lids.
        let _gaze = if touches_gaze {
            Some(self.gaze_lock.lock().await)
        } else {
            None
        };
        let _lids = if touches_lids {
            Some(self.lid_lock.lock().await)
        } else {
            None
        };

        let starts: Vec<i32> = targets
            .iter()
            .map(|t| self.state.joint_angle(t.joint))
            .collect();
        let max_steps = targets
            .iter()
            .zip(&starts)
            .map(|(t, start)| (t.angle - start).abs())
            .max()
            .unwrap_or(0);
        if max_steps == 0 {
            return Ok(());
        }

        let step_size = self.motion.move_step.max(1) as i32;
        let mut written = starts.clone();
        let mut step = 0;
        while step <= max_steps {
            if gated && !self.behavior_allowed() {
                for (target, &angle) in targets.iter().zip(&written) {
                    self.state.record_angle(target.joint, angle);
                }
                debug!("move stopped: disarmed or offline");
                return Ok(());
            }
            let t = (f64::from(step) / f64::from(max_steps)).min(1.0);
            for ((target, &start), last) in targets.iter().zip(&starts).zip(written.iter_mut()) {
                if start == target.angle {
                    continue;
                }
                let angle = (f64::from(start) + f64::from(target.angle - start) * t) as i32;
                self.drive(target.joint, target.direction, angle)?;
                *last = angle;
            }
            pace(self.motion.move_delay()).await;
            step += step_size;
        }

        for target in targets {
            self.state.record_angle(target.joint, target.angle);
        }
        Ok(())
    }

    fn behavior_allowed(&self) -> bool {
        self.state.armed() && !self.state.offline()
    }

    /// Point both eyes at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn look_at(&self, x: i32, y: i32) -> Result<()> {
        let targets = joint::gaze_targets(&self.servo.directions, x, y);
        self.move_together(&targets).await
    }

    /// A random gaze point within `scale` of the half travel around centre.
    pub fn random_target(&self, scale: f64) -> (i32, i32) {
        let scale = scale.clamp(0.0, 1.0);
        let mut rng = self.rng();
        let sample = |rng: &mut StdRng, range: crate::config::AngleRange| {
            let mid = range.mid();
            let radius = (f64::from(range.span()) / 2.0 * scale) as i32;
            rng.gen_range(mid - radius..=mid + radius)
        };
        let x = sample(&mut *rng, self.servo.eye_x);
        let y = sample(&mut *rng, self.servo.eye_y);
        (x, y)
    }

    fn rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blink both eyes with probability `probability`.
    ///
    /// The right lid trails the left by the configured side delay. Updates
    /// the last-blink timestamp when the blink completes.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn blink(&self, probability: f64) -> Result<LidMotion> {
        if !self.state.armed() {
            return Ok(LidMotion::Disarmed);
        }
        let draw: f64 = self.rng().gen_range(0.0..1.0);
        if draw >= probability {
            return Ok(LidMotion::Skipped);
        }
        let Some(plan) = BlinkPlan::new(&self.servo, self.motion.blink_side_offset_steps()) else {
            return Ok(LidMotion::Skipped);
        };

        let _lids = self.lid_lock.lock().await;
        let mut last = None;
        for (left, right) in plan.closing() {
            if !self.state.armed() {
                self.record_lids(last);
                debug!("blink aborted while closing");
                return Ok(LidMotion::Aborted);
            }
            self.drive_lids(left, right)?;
            last = Some((left, right));
            pace(self.motion.blink_step()).await;
        }
        pace(self.motion.blink_hold()).await;
        for (left, right) in plan.opening() {
            if !self.state.armed() {
                self.record_lids(last);
                debug!("blink aborted while opening");
                return Ok(LidMotion::Aborted);
            }
            self.drive_lids(left, right)?;
            last = Some((left, right));
            pace(self.motion.blink_step()).await;
        }
        self.record_lids(last);
        self.state.record_blink(Instant::now());
        debug!("blink");
        Ok(LidMotion::Completed)
    }

    fn drive_lids(&self, left: i32, right: i32) -> Result<()> {
        self.set_joint(JointId::LeftBlink, left)?;
        self.set_joint(JointId::RightBlink, right)
    }

    fn record_lids(&self, last: Option<(i32, i32)>) {
        if let Some((left, right)) = last {
            self.state.record_angle(JointId::LeftBlink, left);
            self.state.record_angle(JointId::RightBlink, right);
        }
    }

    /// Close and reopen a single eyelid. `None` picks a side at random.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn wink(&self, side: Option<EyeSide>) -> Result<LidMotion> {
        if !self.state.armed() {
            return Ok(LidMotion::Disarmed);
        }
        let side = side.unwrap_or_else(|| {
            if self.rng().gen_range(0..2) == 0 {
                EyeSide::Left
            } else {
                EyeSide::Right
            }
        });
        let lid = side.eyelid();
        let (closing, opening) = wink_frames(&self.servo, side);
        if closing.is_empty() {
            return Ok(LidMotion::Skipped);
        }

        let _lids = self.lid_lock.lock().await;
        let mut last = None;
        for (phase, frames) in [("closing", &closing), ("opening", &opening)] {
            for &angle in frames {
                if !self.state.armed() {
                    if let Some(angle) = last {
                        self.state.record_angle(lid, angle);
                    }
                    debug!(?side, phase, "wink aborted");
                    return Ok(LidMotion::Aborted);
                }
                self.set_joint(lid, angle)?;
                last = Some(angle);
                pace(self.motion.blink_step()).await;
            }
            if phase == "closing" {
                pace(self.motion.blink_hold()).await;
            }
        }
        if let Some(angle) = last {
            self.state.record_angle(lid, angle);
        }
        self.state.record_blink(Instant::now());
        debug!(?side, "wink");
        Ok(LidMotion::Completed)
    }

    /// Two full blinks with a short pause after each.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn blink_twice(&self) -> Result<()> {
        for _ in 0..2 {
            if self.blink(1.0).await? != LidMotion::Completed {
                break;
            }
            pace(Duration::from_millis(self.motion.double_blink_pause_ms)).await;
        }
        Ok(())
    }

    // ── Controller poses (not gated on `armed`) ─────────────────────────

    /// Snap every joint to centre with lids open, without interpolation.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn center(&self) -> Result<()> {
        let _gaze = self.gaze_lock.lock().await;
        let _lids = self.lid_lock.lock().await;
        for joint in JointId::ALL {
            let angle = match joint {
                JointId::LeftX | JointId::RightX => self.servo.eye_x.mid(),
                JointId::LeftY | JointId::RightY => self.servo.eye_y.mid(),
                JointId::LeftBlink | JointId::RightBlink => joint.side().eyelid_open(&self.servo),
            };
            self.set_joint(joint, angle)?;
            self.state.record_angle(joint, angle);
        }
        Ok(())
    }

    /// Snap both lids to their open trims (waking up).
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn open_eyelids(&self) -> Result<()> {
        let _lids = self.lid_lock.lock().await;
        self.open_eyelids_locked()
    }

    fn open_eyelids_locked(&self) -> Result<()> {
        for side in [EyeSide::Left, EyeSide::Right] {
            let angle = side.eyelid_open(&self.servo);
            self.set_joint(side.eyelid(), angle)?;
            self.state.record_angle(side.eyelid(), angle);
        }
        Ok(())
    }

    /// Close both lids, give them time to get there, then relax the lid
    /// servos (going to sleep).
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn close_eyelids(&self) -> Result<()> {
        let _lids = self.lid_lock.lock().await;
        let closed = self.servo.blink.max;
        for lid in [JointId::LeftBlink, JointId::RightBlink] {
            self.set_joint(lid, closed)?;
            self.state.record_angle(lid, closed);
        }
        pace(Duration::from_millis(self.motion.eyelid_settle_ms)).await;
        self.actuators.relax_servo(JointId::LeftBlink)?;
        self.actuators.relax_servo(JointId::RightBlink)
    }

    /// Cross-eyed look with open lids, shown when the remote service is
    /// unreachable.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn show_offline_pose(&self) -> Result<()> {
        let y = self.servo.eye_y.mid();
        // Left eye looks right, right eye looks left.
        let targets = gaze_targets_split(
            &self.servo.directions,
            (self.servo.eye_x.max, y),
            (self.servo.eye_x.min, y),
        );
        self.interpolate(&targets, false).await?;
        self.open_eyelids().await
    }

    /// Stop driving every servo.
    ///
    /// # Errors
    ///
    /// Returns the first actuator error; later joints are still attempted.
    pub fn relax_all(&self) -> Result<()> {
        let mut first_err = None;
        for joint in JointId::ALL {
            if let Err(e) = self.actuators.relax_servo(joint) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
