//! Emotion tags on chat replies and their mouth colours.
//!
//! The chat service is asked to end each reply with `[emotion: <label>]`.
//! The tag picks the mouth colour and is stripped before the text is spoken.

use crate::ports::Rgb;
use std::fmt;

/// Emotion labels the head can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    #[default]
    Neutral,
}

impl Emotion {
    /// Parse a tag label, case-insensitively. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Self::Happy),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "surprised" => Some(Self::Surprised),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Surprised => "surprised",
            Self::Neutral => "neutral",
        }
    }

    /// Mouth colour, in the strip's native channel order.
    pub fn color(&self) -> Rgb {
        match self {
            Self::Happy => Rgb(0, 255, 255),
            Self::Sad => Rgb(255, 0, 0),
            Self::Angry => Rgb(0, 255, 0),
            Self::Surprised => Rgb(255, 255, 0),
            Self::Neutral => Rgb(0, 255, 0),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TAG_OPEN: &str = "[emotion:";

/// A chat reply split into speakable text and its emotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedReply {
    pub text: String,
    pub emotion: Emotion,
}

impl TaggedReply {
    /// Split off the `[emotion: X]` tag.
    ///
    /// The label is the first word after the colon. Everything from the tag
    /// opener to the last `]` is removed from the text. Missing or unknown
    /// labels give [`Emotion::Neutral`].
    pub fn parse(reply: &str) -> Self {
        let lower = reply.to_ascii_lowercase();
        let Some(open) = lower.find(TAG_OPEN) else {
            return Self::untagged(reply);
        };
        let after_open = open + TAG_OPEN.len();
        let Some(close) = lower[after_open..].find(']').map(|i| after_open + i) else {
            return Self::untagged(reply);
        };
        let label: String = reply[after_open..close]
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let emotion = Emotion::from_label(&label).unwrap_or_default();

        let last_close = lower.rfind(']').unwrap_or(close);
        let mut text = String::with_capacity(reply.len());
        text.push_str(&reply[..open]);
        text.push_str(&reply[last_close + 1..]);
        Self {
            text: text.trim().to_owned(),
            emotion,
        }
    }

    fn untagged(reply: &str) -> Self {
        Self {
            text: reply.trim().to_owned(),
            emotion: Emotion::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_tag_is_stripped() {
        let r = TaggedReply::parse("Great to see you! [emotion: happy]");
        assert_eq!(r.text, "Great to see you!");
        assert_eq!(r.emotion, Emotion::Happy);
        assert_eq!(r.emotion.color(), Rgb(0, 255, 255));
    }

    #[test]
    fn tag_is_case_insensitive() {
        let r = TaggedReply::parse("Oh no. [Emotion: SAD]");
        assert_eq!(r.emotion, Emotion::Sad);
        assert_eq!(r.text, "Oh no.");
    }

    #[test]
    fn missing_tag_defaults_to_neutral() {
        let r = TaggedReply::parse("  Just text.  ");
        assert_eq!(r.emotion, Emotion::Neutral);
        assert_eq!(r.text, "Just text.");
    }

    #[test]
    fn unknown_label_is_neutral_but_still_stripped() {
        let r = TaggedReply::parse("Hmm. [emotion: confused]");
        assert_eq!(r.emotion, Emotion::Neutral);
        assert_eq!(r.text, "Hmm.");
    }

    #[test]
    fn tag_without_space_after_colon() {
        let r = TaggedReply::parse("Wow![emotion:surprised]");
        assert_eq!(r.emotion, Emotion::Surprised);
        assert_eq!(r.text, "Wow!");
    }

    #[test]
    fn unterminated_tag_is_left_alone() {
        let r = TaggedReply::parse("Hello [emotion: happy");
        assert_eq!(r.emotion, Emotion::Neutral);
        assert_eq!(r.text, "Hello [emotion: happy");
    }

    #[test]
    fn everything_up_to_the_last_bracket_goes() {
        let r = TaggedReply::parse("Sure [emotion: angry] [note]");
        assert_eq!(r.emotion, Emotion::Angry);
        assert_eq!(r.text, "Sure");
    }

    #[test]
    fn colours_match_the_palette() {
        assert_eq!(Emotion::Sad.color(), Rgb(255, 0, 0));
        assert_eq!(Emotion::Angry.color(), Rgb(0, 255, 0));
        assert_eq!(Emotion::Surprised.color(), Rgb(255, 255, 0));
        assert_eq!(Emotion::Neutral.color(), Rgb(0, 255, 0));
    }
}
