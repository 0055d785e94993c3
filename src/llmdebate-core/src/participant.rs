//! Debate participant definitions.
//!
//! A role binds a display name to a stance and to the speaker that
//! produces its utterances.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::speaker::Speaker;

/// The position a role argues from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    /// Arguing in favor of the topic.
    Pro,
    /// Arguing against the topic.
    Con,
    /// Moderating; takes no side.
    Neutral,
}

impl Stance {
    pub fn display_name(&self) -> &str {
        match self {
            Stance::Pro => "PRO",
            Stance::Con => "CON",
            Stance::Neutral => "MODERATOR",
        }
    }

    /// Pro and Con are opinionated, Neutral is not.
    pub fn is_opinionated(&self) -> bool {
        !matches!(self, Stance::Neutral)
    }

    /// The stance that must answer this one. Neutral has no opponent.
    pub fn opposing(&self) -> Option<Stance> {
        match self {
            Stance::Pro => Some(Stance::Con),
            Stance::Con => Some(Stance::Pro),
            Stance::Neutral => None,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stance::Pro => "pro",
            Stance::Con => "con",
            Stance::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

/// A named participant bound to one stance and one speaker.
#[derive(Clone)]
pub struct Role {
    /// Display name for this participant.
    pub name: String,
    /// The stance this participant argues.
    pub stance: Stance,
    speaker: Arc<dyn Speaker>,
}

impl Role {
    pub fn new(name: impl Into<String>, stance: Stance, speaker: Arc<dyn Speaker>) -> Self {
        Self {
            name: name.into(),
            stance,
            speaker,
        }
    }

    pub fn speaker(&self) -> &Arc<dyn Speaker> {
        &self.speaker
    }

    /// Get the full display name with stance.
    pub fn display_name_with_stance(&self) -> String {
        format!("{} ({})", self.name, self.stance.display_name())
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.name)
            .field("stance", &self.stance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposing_stances() {
        assert_eq!(Stance::Pro.opposing(), Some(Stance::Con));
        assert_eq!(Stance::Con.opposing(), Some(Stance::Pro));
        assert_eq!(Stance::Neutral.opposing(), None);
        assert!(!Stance::Neutral.is_opinionated());
    }

    #[test]
    fn test_stance_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Stance::Pro).unwrap(), "\"pro\"");
        let stance: Stance = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(stance, Stance::Neutral);
    }
}
