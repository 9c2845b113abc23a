//! Shared runtime state read by every behaviour task.
//!
//! All fields are lock-free atomics so tasks never block each other on a
//! read. Each field has exactly one writer, enforced through the API:
//!
//! | Field | Writer |
//! |-------|--------|
//! | `armed`, `thinking`, `offline` | [`ModeWriter`] (held by the conversation controller) |
//! | `speaking` | [`SpeakingGuard`] (the speech permit) |
//! | joint angles, last blink | [`MotionEngine`](crate::motion::MotionEngine) |
//!
//! Readers may observe stale values; nothing requires a consistent
//! multi-field snapshot.

use crate::config::ServoConfig;
use crate::motion::joint::{EyeSide, JointId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sentinel for "no blink recorded yet".
const NEVER: u64 = u64::MAX;

/// Behaviour flags, joint positions and blink bookkeeping.
#[derive(Debug)]
pub struct RuntimeState {
    epoch: Instant,
    armed: AtomicBool,
    thinking: AtomicBool,
    speaking: AtomicBool,
    offline: AtomicBool,
    joint_angles: [AtomicI32; 6],
    /// Microseconds since `epoch` of the last completed blink.
    last_blink_us: AtomicU64,
}

impl RuntimeState {
    /// Create the state with every eye centred and both lids at their open
    /// trims, and hand out the sole writer for the behaviour flags.
    pub fn new(servo: &ServoConfig) -> (Arc<Self>, ModeWriter) {
        let angle = |joint: JointId| match joint {
            JointId::LeftX | JointId::RightX => servo.eye_x.mid(),
            JointId::LeftY | JointId::RightY => servo.eye_y.mid(),
            JointId::LeftBlink => EyeSide::Left.eyelid_open(servo),
            JointId::RightBlink => EyeSide::Right.eyelid_open(servo),
        };
        let state = Arc::new(Self {
            epoch: Instant::now(),
            armed: AtomicBool::new(false),
            thinking: AtomicBool::new(false),
            speaking: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            joint_angles: JointId::ALL.map(|j| AtomicI32::new(angle(j))),
            last_blink_us: AtomicU64::new(NEVER),
        });
        let writer = ModeWriter {
            state: Arc::clone(&state),
        };
        (state, writer)
    }

    pub fn armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn thinking(&self) -> bool {
        self.thinking.load(Ordering::SeqCst)
    }

    pub fn speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Thinking or speaking: the head cannot take new input.
    pub fn busy(&self) -> bool {
        self.thinking() || self.speaking()
    }

    /// Last commanded angle of `joint`.
    pub fn joint_angle(&self, joint: JointId) -> i32 {
        self.joint_angles[joint.channel()].load(Ordering::Relaxed)
    }

    /// Angles of all joints, indexed by [`JointId::channel`].
    pub fn joint_angles(&self) -> [i32; 6] {
        JointId::ALL.map(|j| self.joint_angle(j))
    }

    /// When the last blink finished, if any.
    pub fn last_blink_at(&self) -> Option<Instant> {
        match self.last_blink_us.load(Ordering::Relaxed) {
            NEVER => None,
            us => Some(self.epoch + Duration::from_micros(us)),
        }
    }

    /// Time since the last blink; `Duration::MAX` if there has been none.
    pub fn since_last_blink(&self, now: Instant) -> Duration {
        self.last_blink_at()
            .map_or(Duration::MAX, |at| now.saturating_duration_since(at))
    }

    /// Claim the speech permit.
    ///
    /// Returns `None` if someone else is already speaking. The flag stays set
    /// until the returned guard is dropped.
    pub fn try_begin_speaking(self: &Arc<Self>) -> Option<SpeakingGuard> {
        self.speaking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SpeakingGuard {
                state: Arc::clone(self),
            })
    }

    pub(crate) fn record_angle(&self, joint: JointId, angle: i32) {
        self.joint_angles[joint.channel()].store(angle, Ordering::Relaxed);
    }

    pub(crate) fn record_blink(&self, at: Instant) {
        let us = at.saturating_duration_since(self.epoch).as_micros();
        let us = u64::try_from(us).unwrap_or(NEVER - 1).min(NEVER - 1);
        self.last_blink_us.store(us, Ordering::Relaxed);
    }
}

/// Exclusive writer of `armed`, `thinking` and `offline`.
///
/// Exactly one exists per [`RuntimeState`]; it is deliberately not `Clone`.
#[derive(Debug)]
pub struct ModeWriter {
    state: Arc<RuntimeState>,
}

impl ModeWriter {
    pub fn state(&self) -> &Arc<RuntimeState> {
        &self.state
    }

    pub fn set_armed(&self, armed: bool) {
        self.state.armed.store(armed, Ordering::SeqCst);
    }

    pub fn set_thinking(&self, thinking: bool) {
        self.state.thinking.store(thinking, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }
}

/// The speech permit. `speaking` is true for exactly as long as one exists.
#[derive(Debug)]
pub struct SpeakingGuard {
    state: Arc<RuntimeState>,
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        self.state.speaking.store(false, Ordering::SeqCst);
    }
}
