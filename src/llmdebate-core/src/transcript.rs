//! Debate transcript types.

use serde::{Deserialize, Serialize};

use crate::participant::Stance;

/// One recorded utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Position in the transcript, starting at 0.
    pub index: usize,
    /// Name of the role that spoke.
    pub speaker: String,
    /// Stance of the role that spoke.
    pub stance: Stance,
    /// What was said.
    pub content: String,
}

/// The ordered turns of one debate run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub topic: String,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            turns: Vec::new(),
        }
    }

    /// Append a turn; its index is assigned from the current length.
    pub(crate) fn record(
        &mut self,
        speaker: impl Into<String>,
        stance: Stance,
        content: impl Into<String>,
    ) -> &Turn {
        let index = self.turns.len();
        self.turns.push(Turn {
            index,
            speaker: speaker.into(),
            stance,
            content: content.into(),
        });
        &self.turns[index]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Stances in speaking order.
    pub fn stances(&self) -> Vec<Stance> {
        self.turns.iter().map(|t| t.stance).collect()
    }

    /// Speaker names in speaking order.
    pub fn speakers(&self) -> Vec<&str> {
        self.turns.iter().map(|t| t.speaker.as_str()).collect()
    }

    /// True when no opinionated turn is directly followed by another turn
    /// of the same stance.
    pub fn respects_alternation(&self) -> bool {
        self.turns
            .windows(2)
            .all(|pair| !pair[0].stance.is_opinionated() || pair[0].stance != pair[1].stance)
    }
}
