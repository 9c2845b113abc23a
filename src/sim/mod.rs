//! In-memory backends for running the head without hardware or network.
//!
//! Used by the `head-sim` binary and by the test suites.

mod actuators;
mod scripted;

pub use actuators::{ActuatorEvent, SimulatedActuators, SimulatedButton};
pub use scripted::{
    ChunkedAudioInput, ConversationScript, NullAudioOutput, Scripted,
    ScriptedChat, ScriptedRecognizer, ScriptedRecorder, ScriptedTurn, ToneSynthesizer,
};
