//! Voice commands handled locally instead of being sent to the chat service.
//!
//! | Phrase | Command |
//! |--------|---------|
//! | "wink for me", "can you wink", or anything starting with "wink" | `Wink` |
//! | contains both "blink twice" and "understand" | `BlinkTwice` |
//! | exactly one of the exit phrases ("quit", "exit", "stop") | `Exit` |

/// A command recognised in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Close and reopen one eyelid.
    Wink,
    /// Two full blinks, as in "blink twice if you understand".
    BlinkTwice,
    /// End the program.
    Exit,
}

/// Parse `transcript` into a command, if it is one.
///
/// Matching is case-insensitive. Exit phrases must make up the whole
/// transcript; trailing punctuation from the recognizer is ignored.
pub fn parse_voice_command(transcript: &str, exit_phrases: &[String]) -> Option<VoiceCommand> {
    let norm = transcript.trim().to_lowercase();
    if norm.is_empty() {
        return None;
    }

    let bare = norm.trim_end_matches(['.', '!', '?', ',']).trim_end();
    if exit_phrases
        .iter()
        .any(|p| p.trim().eq_ignore_ascii_case(bare))
    {
        return Some(VoiceCommand::Exit);
    }

    if norm.contains("wink for me") || norm.starts_with("wink") || norm.contains("can you wink") {
        return Some(VoiceCommand::Wink);
    }

    if norm.contains("blink twice") && norm.contains("understand") {
        return Some(VoiceCommand::BlinkTwice);
    }

    None
}
