//! Integration test binary: whole-head scenarios against the simulated
//! actuators and scripted services, consolidated into one binary.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod helpers;

mod config_roundtrip;
mod disarm;
mod head_lifecycle;
mod idle_speech;
mod offline;
