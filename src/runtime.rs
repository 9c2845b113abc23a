//! Events sent to the conversation controller by the background tasks.
//!
//! Only the controller writes the behaviour flags, so a task that learns
//! something the flags should reflect reports it here instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote call of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcription,
    Chat,
    Speech,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transcription => "transcription",
            Self::Chat => "chat",
            Self::Speech => "speech",
        })
    }
}

/// Reports from background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// A remote call failed with a connectivity error.
    ConnectivityLost { stage: Stage },
    /// A remote call succeeded.
    ConnectivityRestored,
}
