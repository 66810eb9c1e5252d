//! Data models for moodlog
//!
//! Defines the single journal record, `Feeling`, and the closed set of
//! mood emoticons a feeling can carry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A journal entry
///
/// Serializes to `{ id, emoticon, message, isEditing }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feeling {
    /// Primary key; doubles as the creation time in epoch milliseconds
    pub id: i64,
    /// Mood identifier, one of [`Emoticon::ALL`] for entries created here
    pub emoticon: String,
    /// Free text
    pub message: String,
    /// Whether the entry is currently being edited inline
    #[serde(default)]
    pub is_editing: bool,
}

impl Feeling {
    /// Create a feeling that is not being edited
    pub fn new(id: i64, emoticon: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            emoticon: emoticon.into(),
            message: message.into(),
            is_editing: false,
        }
    }

    /// Creation time derived from the key
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.id).single()
    }

    /// The emoticon as a member of the known set, if it is one
    pub fn emoticon_kind(&self) -> Option<Emoticon> {
        self.emoticon.parse().ok()
    }
}

/// The fixed set of moods an entry can be tagged with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Emoticon {
    HappyOutline,
    SadOutline,
    HeartOutline,
    SkullOutline,
}

impl Emoticon {
    /// Every emoticon, in the order the entry screen offers them
    pub const ALL: [Emoticon; 4] = [
        Emoticon::HappyOutline,
        Emoticon::SadOutline,
        Emoticon::HeartOutline,
        Emoticon::SkullOutline,
    ];

    /// Stored identifier
    pub fn as_str(self) -> &'static str {
        match self {
            Emoticon::HappyOutline => "happy-outline",
            Emoticon::SadOutline => "sad-outline",
            Emoticon::HeartOutline => "heart-outline",
            Emoticon::SkullOutline => "skull-outline",
        }
    }

    /// Single-character rendering for terminals
    pub fn glyph(self) -> &'static str {
        match self {
            Emoticon::HappyOutline => "☺",
            Emoticon::SadOutline => "☹",
            Emoticon::HeartOutline => "♥",
            Emoticon::SkullOutline => "☠",
        }
    }

    /// Short human label
    pub fn label(self) -> &'static str {
        match self {
            Emoticon::HappyOutline => "happy",
            Emoticon::SadOutline => "sad",
            Emoticon::HeartOutline => "love",
            Emoticon::SkullOutline => "dead",
        }
    }

    /// Position within [`Emoticon::ALL`]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|e| *e == self).unwrap_or(0)
    }
}

impl fmt::Display for Emoticon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known emoticon
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown emoticon '{0}'. Expected one of: happy-outline, sad-outline, heart-outline, skull-outline")]
pub struct UnknownEmoticon(pub String);

impl FromStr for Emoticon {
    type Err = UnknownEmoticon;

    /// Accepts the stored identifier or the short label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == wanted || e.label() == wanted)
            .ok_or_else(|| UnknownEmoticon(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feeling_is_not_editing() {
        let feeling = Feeling::new(1000, "happy-outline", "great day");
        assert_eq!(feeling.id, 1000);
        assert!(!feeling.is_editing);
        assert_eq!(feeling.emoticon_kind(), Some(Emoticon::HappyOutline));
    }

    #[test]
    fn test_created_at_from_key() {
        let feeling = Feeling::new(1_700_000_000_000, "sad-outline", "meh");
        let created = feeling.created_at().unwrap();
        assert_eq!(created.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_wire_shape() {
        let feeling = Feeling::new(1, "x", "y");
        let json = serde_json::to_value(&feeling).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "emoticon": "x", "message": "y", "isEditing": false})
        );
    }

    #[test]
    fn test_emoticon_parse() {
        assert_eq!("heart-outline".parse::<Emoticon>(), Ok(Emoticon::HeartOutline));
        assert_eq!("dead".parse::<Emoticon>(), Ok(Emoticon::SkullOutline));
        assert!("grumpy".parse::<Emoticon>().is_err());
    }

    #[test]
    fn test_emoticon_order() {
        for (i, emoticon) in Emoticon::ALL.into_iter().enumerate() {
            assert_eq!(emoticon.index(), i);
            assert_eq!(emoticon.as_str().parse::<Emoticon>(), Ok(emoticon));
        }
    }
}
