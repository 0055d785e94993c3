//! The content-generation seam.
//!
//! The orchestrator only ever talks to `dyn Speaker`; which backend sits
//! behind a role is decided when the registry is built.

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use tracing::warn;

use crate::error::GenerationError;
use crate::participant::Stance;
use crate::transcript::Turn;

/// Produces one utterance for a role.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Generate the next utterance on `topic` from `stance`, given every
    /// turn spoken so far. `rng` is seeded per turn by the orchestrator and
    /// is the only randomness a speaker should use.
    async fn generate(
        &self,
        topic: &str,
        stance: Stance,
        history: &[Turn],
        rng: &mut StdRng,
    ) -> Result<String, GenerationError>;
}

/// Uses `fallback` for any turn the `primary` speaker fails.
pub struct FallbackSpeaker {
    name: String,
    primary: Arc<dyn Speaker>,
    fallback: Arc<dyn Speaker>,
}

impl FallbackSpeaker {
    pub fn new(
        name: impl Into<String>,
        primary: Arc<dyn Speaker>,
        fallback: Arc<dyn Speaker>,
    ) -> Self {
        Self {
            name: name.into(),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl Speaker for FallbackSpeaker {
    async fn generate(
        &self,
        topic: &str,
        stance: Stance,
        history: &[Turn],
        rng: &mut StdRng,
    ) -> Result<String, GenerationError> {
        match self.primary.generate(topic, stance, history, rng).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(speaker = %self.name, error = %e, "primary speaker failed, using fallback");
                self.fallback.generate(topic, stance, history, rng).await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    use std::sync::Mutex;

    /// Returns `"<prefix> #<n>"` for its n-th call and records every
    /// history length it was shown.
    pub struct ScriptedSpeaker {
        prefix: String,
        pub seen_history: Mutex<Vec<usize>>,
    }

    impl ScriptedSpeaker {
        pub fn new(prefix: &str) -> Arc<Self> {
            Arc::new(Self {
                prefix: prefix.to_string(),
                seen_history: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Speaker for ScriptedSpeaker {
        async fn generate(
            &self,
            _topic: &str,
            _stance: Stance,
            history: &[Turn],
            _rng: &mut StdRng,
        ) -> Result<String, GenerationError> {
            let mut seen = self.seen_history.lock().unwrap();
            seen.push(history.len());
            Ok(format!("{} #{}", self.prefix, seen.len()))
        }
    }

    /// Always fails.
    pub struct BrokenSpeaker;

    #[async_trait]
    impl Speaker for BrokenSpeaker {
        async fn generate(
            &self,
            _topic: &str,
            _stance: Stance,
            _history: &[Turn],
            _rng: &mut StdRng,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("backend offline".to_string()))
        }
    }
}
