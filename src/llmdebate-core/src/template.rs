//! Template-based speakers.
//!
//! Cheap, offline and fully reproducible: every phrase is drawn from a
//! fixed list with the turn's random generator. Useful for exercising the
//! debate flow and as a fallback when no chat backend is reachable.

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::GenerationError;
use crate::participant::Stance;
use crate::speaker::Speaker;
use crate::transcript::Turn;

const OPENINGS: &[&str] = &[
    "I believe",
    "It's clear to me",
    "From my point of view",
    "Consider that",
];

const CLOSINGS: &[&str] = &[
    "That's why I'm convinced.",
    "This is the heart of the matter.",
    "In short, the evidence points there.",
    "Ultimately, the conclusion follows.",
];

const PRO_MODIFIERS: &[&str] = &["Moreover,", "Importantly,", "Significantly,"];
const CON_MODIFIERS: &[&str] = &["However,", "On the other hand,", "Yet,"];

const MODERATOR_REASONS: &[&str] = &[
    "The pros and cons deserve clear comparison.",
    "Key trade-offs need to be weighed transparently.",
    "We should ask who benefits and who bears the cost.",
];

const MODERATOR_SUGGESTIONS: &[&str] = &[
    "A pilot program might help.",
    "Clear metrics could guide decisions.",
    "Stakeholder input is essential.",
];

/// Longest slice of the previous turn the moderator quotes back.
const SUMMARY_CHARS: usize = 140;

/// Speaks from canned phrases for whatever stance it is asked to argue.
#[derive(Debug, Clone)]
pub struct TemplateSpeaker {
    persuasion: f64,
}

impl TemplateSpeaker {
    /// `persuasion` is clamped to `[0, 1]` and picks how forcefully
    /// opinionated turns close their reasoning.
    pub fn new(persuasion: f64) -> Self {
        Self {
            persuasion: persuasion.clamp(0.0, 1.0),
        }
    }

    pub fn persuasion(&self) -> f64 {
        self.persuasion
    }

    fn stance_phrase(&self, topic: &str, stance: Stance, history: &[Turn]) -> String {
        match stance {
            Stance::Pro => format!("we should support {}", topic),
            Stance::Con => format!("we should be cautious about {}", topic),
            Stance::Neutral => match history.last() {
                Some(previous) => {
                    let summary: String = previous.content.chars().take(SUMMARY_CHARS).collect();
                    format!("I'll summarize: {}", summary.trim_end_matches('.'))
                }
                None => format!("let's examine {} from several angles", topic),
            },
        }
    }

    fn reasons<R: Rng + ?Sized>(&self, topic: &str, stance: Stance, rng: &mut R) -> String {
        match stance {
            Stance::Pro => {
                let reasons = [
                    format!("{} would unlock new opportunities and drive innovation.", topic),
                    format!("{} addresses urgent challenges and creates long-term value.", topic),
                    format!("{} empowers people and expands our options.", topic),
                ];
                let reason = reasons.choose(rng).cloned().unwrap_or_default();
                let modifier = pick(PRO_MODIFIERS, rng);
                format!("{} {} {}", modifier, reason, self.confidence())
            }
            Stance::Con => {
                let reasons = [
                    format!("{} carries risks that could be overlooked.", topic),
                    format!("{} might create unintended negative consequences.", topic),
                    format!("{} could be costly and favor the wrong actors.", topic),
                ];
                let reason = reasons.choose(rng).cloned().unwrap_or_default();
                let modifier = pick(CON_MODIFIERS, rng);
                format!("{} {} {}", modifier, reason, self.caution())
            }
            Stance::Neutral => {
                let reason = pick(MODERATOR_REASONS, rng);
                let suggestion = pick(MODERATOR_SUGGESTIONS, rng);
                format!("{} {}", reason, suggestion)
            }
        }
    }

    fn confidence(&self) -> &'static str {
        if self.persuasion > 0.75 {
            "This is undeniable."
        } else if self.persuasion > 0.4 {
            "This is convincing."
        } else {
            "This seems plausible."
        }
    }

    fn caution(&self) -> &'static str {
        if self.persuasion > 0.75 {
            "We must not rush in."
        } else if self.persuasion > 0.4 {
            "We should investigate further."
        } else {
            "We should proceed carefully."
        }
    }
}

fn pick<R: Rng + ?Sized>(options: &[&'static str], rng: &mut R) -> &'static str {
    options.choose(rng).copied().unwrap_or_default()
}

#[async_trait]
impl Speaker for TemplateSpeaker {
    async fn generate(
        &self,
        topic: &str,
        stance: Stance,
        history: &[Turn],
        rng: &mut StdRng,
    ) -> Result<String, GenerationError> {
        let opening = pick(OPENINGS, rng);
        let stance_phrase = self.stance_phrase(topic, stance, history);
        let reasons = self.reasons(topic, stance, rng);
        let closing = pick(CLOSINGS, rng);
        Ok(format!("{} {} {} {}", opening, stance_phrase, reasons, closing))
    }
}
