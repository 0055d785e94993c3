//! Error types for the debate system.

use thiserror::Error;

use crate::participant::Stance;

/// Errors that abort a debate run.
#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Speaker registry is empty")]
    EmptyRegistry,

    #[error("Duplicate role name: {0}")]
    DuplicateRole(String),

    #[error("No registered role has the {0} stance")]
    MissingStance(Stance),

    #[error("Invalid turn count: {0} (must be at least 1)")]
    InvalidTurnCount(usize),

    #[error("Invalid moderator policy: {0}")]
    InvalidPolicy(String),

    #[error("No eligible speaker for turn {turn} (wanted {wanted})")]
    SelectionImpossible { turn: usize, wanted: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{speaker} failed to produce turn {turn}: {source}")]
    Generation {
        speaker: String,
        turn: usize,
        #[source]
        source: GenerationError,
    },
}

impl DebateError {
    /// True for errors caused by a bad role set, policy or turn count
    /// rather than by a speaker failing at run time.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DebateError::Generation { .. })
    }
}

/// Errors raised by a speaker while producing an utterance.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{speaker} returned an empty response after {attempts} attempts")]
    EmptyResponse { speaker: String, attempts: u32 },

    #[error("Generation backend unavailable: {0}")]
    Unavailable(String),
}
