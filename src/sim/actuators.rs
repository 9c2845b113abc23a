//! In-memory actuators and arm switch.

use crate::error::{HeadError, Result};
use crate::motion::joint::JointId;
use crate::ports::{ActuatorPort, InputPort, Rgb};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// One call made on [`SimulatedActuators`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorEvent {
    Servo { joint: JointId, duty: u16 },
    Relax(JointId),
    Mouth(Vec<Rgb>),
    MouthClear,
    StatusLed(bool),
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<ActuatorEvent>,
    servo_writes: usize,
    last_duty: [Option<u16>; 6],
    mouth: Vec<Rgb>,
    status_led: bool,
}

/// Actuators that remember every call.
///
/// History can be switched off for long simulation runs; the counters and
/// current outputs are always kept.
#[derive(Debug)]
pub struct SimulatedActuators {
    num_pixels: usize,
    keep_history: bool,
    inner: Mutex<Inner>,
}

impl SimulatedActuators {
    /// Actuators with full call history.
    pub fn new(num_pixels: usize) -> Self {
        Self {
            num_pixels,
            keep_history: true,
            inner: Mutex::new(Inner {
                mouth: vec![Rgb::OFF; num_pixels],
                ..Inner::default()
            }),
        }
    }

    /// Actuators that only track counters and current outputs.
    pub fn without_history(num_pixels: usize) -> Self {
        Self {
            keep_history: false,
            ..Self::new(num_pixels)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, inner: &mut Inner, event: ActuatorEvent) {
        if self.keep_history {
            inner.events.push(event);
        }
    }

    pub fn events(&self) -> Vec<ActuatorEvent> {
        self.lock().events.clone()
    }

    /// Forget the call history and reset the write counter. Current outputs
    /// are kept.
    pub fn clear_events(&self) {
        let mut inner = self.lock();
        inner.events.clear();
        inner.servo_writes = 0;
    }

    /// Total servo writes (excluding relax calls).
    pub fn servo_writes(&self) -> usize {
        self.lock().servo_writes
    }

    /// Every duty written to `joint`, oldest first.
    pub fn duties(&self, joint: JointId) -> Vec<u16> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                ActuatorEvent::Servo { joint: j, duty } if *j == joint => Some(*duty),
                _ => None,
            })
            .collect()
    }

    /// Last duty written to `joint`; `None` if never driven or relaxed since.
    pub fn last_duty(&self, joint: JointId) -> Option<u16> {
        self.lock().last_duty[joint.channel()]
    }

    /// Number of relax calls on `joint`.
    pub fn relax_count(&self, joint: JointId) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| **e == ActuatorEvent::Relax(joint))
            .count()
    }

    /// Every rendered mouth frame, oldest first.
    pub fn mouth_frames(&self) -> Vec<Vec<Rgb>> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                ActuatorEvent::Mouth(pixels) => Some(pixels.clone()),
                _ => None,
            })
            .collect()
    }

    /// What the mouth strip shows right now.
    pub fn mouth(&self) -> Vec<Rgb> {
        self.lock().mouth.clone()
    }

    pub fn status_led(&self) -> bool {
        self.lock().status_led
    }
}

impl ActuatorPort for SimulatedActuators {
    fn set_servo(&self, joint: JointId, duty: u16) -> Result<()> {
        let mut inner = self.lock();
        inner.servo_writes += 1;
        inner.last_duty[joint.channel()] = Some(duty);
        self.push(&mut inner, ActuatorEvent::Servo { joint, duty });
        Ok(())
    }

    fn relax_servo(&self, joint: JointId) -> Result<()> {
        let mut inner = self.lock();
        inner.last_duty[joint.channel()] = None;
        self.push(&mut inner, ActuatorEvent::Relax(joint));
        trace!(%joint, "relax");
        Ok(())
    }

    fn render_mouth(&self, pixels: &[Rgb]) -> Result<()> {
        if pixels.len() != self.num_pixels {
            return Err(HeadError::Actuator(format!(
                "mouth frame has {} pixels, strip has {}",
                pixels.len(),
                self.num_pixels
            )));
        }
        let mut inner = self.lock();
        inner.mouth = pixels.to_vec();
        self.push(&mut inner, ActuatorEvent::Mouth(pixels.to_vec()));
        Ok(())
    }

    fn clear_mouth(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.mouth = vec![Rgb::OFF; self.num_pixels];
        self.push(&mut inner, ActuatorEvent::MouthClear);
        Ok(())
    }

    fn set_status_led(&self, on: bool) -> Result<()> {
        let mut inner = self.lock();
        if inner.status_led != on {
            trace!(on, "status led");
        }
        inner.status_led = on;
        self.push(&mut inner, ActuatorEvent::StatusLed(on));
        Ok(())
    }
}

/// Arm switch flipped from code.
#[derive(Debug, Default)]
pub struct SimulatedButton {
    armed: AtomicBool,
}

impl SimulatedButton {
    pub fn new(armed: bool) -> Self {
        Self {
            armed: AtomicBool::new(armed),
        }
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }
}

impl InputPort for SimulatedButton {
    fn button_is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}
