//! Animatron: real-time motion and state coordination for a talking
//! animatronic head.
//!
//! The head has two eyes on pan/tilt servos with a servo-driven eyelid each,
//! an LED strip for a mouth, a status LED, and an arm switch. A conversation
//! loop listens while armed, sends speech to remote services, and speaks the
//! reply with lip sync:
//! Switch → Recorder → Speech-to-text → Chat → Text-to-speech → Speaker + Mouth
//!
//! # Architecture
//!
//! Cooperative tokio tasks share one [`RuntimeState`] of atomic flags:
//! - **ConversationController**: the turn loop and sole writer of the mode flags
//! - **EyeBehaviorTask**: idle wandering, fidgets and scheduled blinks
//! - **StatusIndicatorTask**: off / blinking / solid status LED
//! - **IdleSpeechTask**: a filler phrase after a long quiet spell
//!
//! Hardware and remote services sit behind the traits in [`ports`]; the
//! [`sim`] module implements them in memory for the simulator and tests.

pub mod audio;
pub mod behavior;
pub mod config;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod head;
pub mod motion;
pub mod mouth;
pub mod ports;
pub mod runtime;
pub mod sim;
pub mod speech;
pub mod state;
pub mod voice_command;

pub use config::HeadConfig;
pub use conversation::{ConversationController, ConversationPorts, TurnOutcome};
pub use error::{HeadError, Result};
pub use head::{Head, HeadPorts};
pub use motion::MotionEngine;
pub use runtime::{ControlEvent, Stage};
pub use state::RuntimeState;
