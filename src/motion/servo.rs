//! Angle → pulse width → 16-bit duty conversion.

use super::joint::Direction;
use crate::config::ServoConfig;

/// Full-scale duty value of the servo driver.
pub const DUTY_FULL_SCALE: f64 = 65_535.0;

/// Pulse width in milliseconds for a direction-corrected angle.
pub fn pulse_width_ms(servo: &ServoConfig, direction: Direction, angle: f64) -> f64 {
    let effective = direction.apply(angle, servo.actuation_range_deg);
    let pulse_range = servo.max_pulse_ms - servo.min_pulse_ms;
    servo.min_pulse_ms + pulse_range * effective / servo.actuation_range_deg
}

/// Duty value for `angle` on a joint with the given direction.
///
/// No travel-limit check happens here; callers clamp to the joint's range.
/// Values outside the representable duty range saturate.
pub fn duty_for_angle(servo: &ServoConfig, direction: Direction, angle: f64) -> u16 {
    let pulse = pulse_width_ms(servo, direction, angle);
    let duty = (pulse / servo.period_ms * DUTY_FULL_SCALE).trunc();
    duty.clamp(0.0, DUTY_FULL_SCALE) as u16
}
