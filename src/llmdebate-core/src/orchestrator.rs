//! Debate orchestration logic.
//!
//! Drives the turn scheduler, asks each selected role's speaker for an
//! utterance and records the transcript.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use crate::error::DebateError;
use crate::participant::Stance;
use crate::registry::SpeakerRegistry;
use crate::scheduler::{SchedulingPolicy, TurnScheduler};
use crate::transcript::Transcript;

/// A request to run one debate.
#[derive(Debug, Clone)]
pub struct DebateRequest {
    /// The topic being debated.
    pub topic: String,
    /// How many turns to speak.
    pub turns: usize,
    /// Seed for a reproducible run; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl DebateRequest {
    pub fn new(topic: impl Into<String>, turns: usize) -> Self {
        Self {
            topic: topic.into(),
            turns,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted during a debate.
#[derive(Debug, Clone, PartialEq)]
pub enum DebateEvent {
    /// The run passed validation and is about to start.
    DebateStart { topic: String, turns: usize },
    /// A participant is about to speak. `turn` is 1-based.
    SpeakerStart {
        turn: usize,
        name: String,
        stance: Stance,
    },
    /// A participant has finished speaking.
    SpeakerMessage {
        turn: usize,
        name: String,
        content: String,
    },
    /// The debate has concluded.
    DebateEnd,
}

/// Runs debates over a fixed registry.
pub struct DebateOrchestrator {
    registry: SpeakerRegistry,
    policy: SchedulingPolicy,
    /// Transcript of the current or most recent run.
    transcript: Transcript,
    /// Event callback.
    callback: Option<DebateCallback>,
}

impl DebateOrchestrator {
    pub fn new(registry: SpeakerRegistry, policy: SchedulingPolicy) -> Self {
        Self {
            registry,
            policy,
            transcript: Transcript::default(),
            callback: None,
        }
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run a debate, seeding the scheduler from the request.
    pub async fn run(&mut self, request: &DebateRequest) -> Result<Transcript, DebateError> {
        let rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(&request.topic, request.turns, rng).await
    }

    /// Run a debate with an injected random source.
    ///
    /// Every turn consumes the scheduler's draws plus exactly one `u64`,
    /// which seeds the speaker's own generator. Speakers can therefore be
    /// as random as they like without shifting who speaks next.
    pub async fn run_with_rng<R: RngCore + Send>(
        &mut self,
        topic: &str,
        turns: usize,
        rng: R,
    ) -> Result<Transcript, DebateError> {
        self.transcript = Transcript::new(topic);
        let mut scheduler = TurnScheduler::new(&self.registry, self.policy, turns, rng)?;

        info!(topic, turns, policy = ?self.policy, "starting debate");
        self.emit_event(DebateEvent::DebateStart {
            topic: topic.to_string(),
            turns,
        });

        while let Some(role) = scheduler.next_speaker()? {
            let turn = scheduler.selected();
            self.emit_event(DebateEvent::SpeakerStart {
                turn,
                name: role.name.clone(),
                stance: role.stance,
            });

            let mut turn_rng = StdRng::seed_from_u64(scheduler.rng_mut().next_u64());
            let content = role
                .speaker()
                .generate(topic, role.stance, self.transcript.turns(), &mut turn_rng)
                .await
                .map_err(|source| DebateError::Generation {
                    speaker: role.name.clone(),
                    turn,
                    source,
                })?;

            debug!(turn, speaker = %role.name, chars = content.len(), "recorded turn");
            self.transcript.record(&role.name, role.stance, content.clone());

            self.emit_event(DebateEvent::SpeakerMessage {
                turn,
                name: role.name.clone(),
                content,
            });
        }

        self.emit_event(DebateEvent::DebateEnd);
        info!(turns = self.transcript.len(), "debate finished");
        Ok(self.transcript.clone())
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    /// Turns recorded by the current or most recent run, including the
    /// partial transcript of a run that failed.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Role;
    use crate::speaker::Speaker;
    use crate::speaker::fixtures::{BrokenSpeaker, ScriptedSpeaker};
    use crate::template::TemplateSpeaker;

    use std::sync::{Arc, Mutex};

    fn scripted_registry(roles: &[(&str, Stance)]) -> SpeakerRegistry {
        SpeakerRegistry::new(
            roles
                .iter()
                .map(|(name, stance)| Role::new(*name, *stance, ScriptedSpeaker::new(name)))
                .collect(),
        )
        .unwrap()
    }

    fn template_registry() -> SpeakerRegistry {
        let role = |name: &str, stance: Stance, persuasion: f64| {
            let speaker: Arc<dyn Speaker> = Arc::new(TemplateSpeaker::new(persuasion));
            Role::new(name, stance, speaker)
        };
        SpeakerRegistry::new(vec![
            role("Argus", Stance::Pro, 0.8),
            role("Boreas", Stance::Con, 0.7),
            role("Clio", Stance::Neutral, 0.5),
        ])
        .unwrap()
    }

    fn reference() -> SpeakerRegistry {
        scripted_registry(&[
            ("Argus", Stance::Pro),
            ("Boreas", Stance::Con),
            ("Clio", Stance::Neutral),
        ])
    }

    #[tokio::test]
    async fn test_seeded_run_alternates() {
        let mut orchestrator = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let request = DebateRequest::new("Should we colonize Mars?", 4).with_seed(42);

        let first = orchestrator.run(&request).await.unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first.topic, "Should we colonize Mars?");
        assert!(first.respects_alternation());

        let mut again = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let second = again.run(&request).await.unwrap();
        assert_eq!(first.speakers()[0], second.speakers()[0]);
    }

    #[tokio::test]
    async fn test_single_turn() {
        let registry = reference();
        let names: Vec<String> = registry.all_roles().iter().map(|r| r.name.clone()).collect();
        let mut orchestrator = DebateOrchestrator::new(registry, SchedulingPolicy::default());

        let transcript = orchestrator
            .run(&DebateRequest::new("AI regulation", 1))
            .await
            .unwrap();
        assert_eq!(transcript.len(), 1);
        assert!(names.contains(&transcript.turns()[0].speaker));
    }

    #[tokio::test]
    async fn test_missing_pro_fails_before_any_turn() {
        let con = ScriptedSpeaker::new("con");
        let moderator = ScriptedSpeaker::new("moderator");
        let registry = SpeakerRegistry::new(vec![
            Role::new("Boreas", Stance::Con, con.clone()),
            Role::new("Clio", Stance::Neutral, moderator.clone()),
        ])
        .unwrap();
        let mut orchestrator = DebateOrchestrator::new(registry, SchedulingPolicy::default());

        let err = orchestrator
            .run(&DebateRequest::new("topic", 3).with_seed(5))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, DebateError::MissingStance(Stance::Pro)));
        assert!(orchestrator.transcript().is_empty());
        assert!(con.seen_history.lock().unwrap().is_empty());
        assert!(moderator.seen_history.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_turns_rejected() {
        let mut orchestrator = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let err = orchestrator
            .run(&DebateRequest::new("topic", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::InvalidTurnCount(0)));
    }

    #[tokio::test]
    async fn test_same_seed_same_stances() {
        let request = DebateRequest::new("Universal basic income", 6).with_seed(2024);
        let mut a = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let mut b = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let first = a.run(&request).await.unwrap();
        let second = b.run(&request).await.unwrap();
        assert_eq!(first.stances(), second.stances());
        assert_eq!(first.speakers(), second.speakers());
    }

    #[tokio::test]
    async fn test_template_runs_reproduce_text() {
        let request = DebateRequest::new("renewable energy", 6).with_seed(42);
        let mut a = DebateOrchestrator::new(template_registry(), SchedulingPolicy::default());
        let mut b = DebateOrchestrator::new(template_registry(), SchedulingPolicy::default());
        assert_eq!(a.run(&request).await.unwrap(), b.run(&request).await.unwrap());
    }

    #[tokio::test]
    async fn test_speaker_randomness_does_not_shift_order() {
        let request = DebateRequest::new("renewable energy", 8).with_seed(99);
        let mut scripted = DebateOrchestrator::new(reference(), SchedulingPolicy::default());
        let mut templated =
            DebateOrchestrator::new(template_registry(), SchedulingPolicy::default());
        assert_eq!(
            scripted.run(&request).await.unwrap().speakers(),
            templated.run(&request).await.unwrap().speakers()
        );
    }

    #[tokio::test]
    async fn test_speakers_see_growing_history() {
        let speaker = ScriptedSpeaker::new("any");
        let registry = SpeakerRegistry::new(vec![
            Role::new("Argus", Stance::Pro, speaker.clone()),
            Role::new("Boreas", Stance::Con, speaker.clone()),
        ])
        .unwrap();
        let mut orchestrator = DebateOrchestrator::new(registry, SchedulingPolicy::default());
        orchestrator
            .run(&DebateRequest::new("topic", 5).with_seed(1))
            .await
            .unwrap();
        assert_eq!(*speaker.seen_history.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_generation_error_aborts_run() {
        let registry = SpeakerRegistry::new(vec![
            Role::new("Argus", Stance::Pro, Arc::new(BrokenSpeaker)),
            Role::new("Boreas", Stance::Con, ScriptedSpeaker::new("con")),
        ])
        .unwrap();
        let mut orchestrator = DebateOrchestrator::new(registry, SchedulingPolicy::default());

        let err = orchestrator
            .run(&DebateRequest::new("topic", 6).with_seed(3))
            .await
            .unwrap_err();
        assert!(!err.is_configuration());
        match err {
            DebateError::Generation { speaker, turn, .. } => {
                assert_eq!(speaker, "Argus");
                // Argus speaks first or second, never later.
                assert!(turn <= 2);
                assert_eq!(orchestrator.transcript().len(), turn - 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let mut orchestrator = DebateOrchestrator::new(reference(), SchedulingPolicy::default())
            .with_callback(Box::new(move |event| sink.lock().unwrap().push(event)));

        let transcript = orchestrator
            .run(&DebateRequest::new("topic", 2).with_seed(11))
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0],
            DebateEvent::DebateStart {
                topic: "topic".to_string(),
                turns: 2
            }
        );
        assert_eq!(
            events[1],
            DebateEvent::SpeakerStart {
                turn: 1,
                name: transcript.turns()[0].speaker.clone(),
                stance: transcript.turns()[0].stance,
            }
        );
        assert_eq!(
            events[4],
            DebateEvent::SpeakerMessage {
                turn: 2,
                name: transcript.turns()[1].speaker.clone(),
                content: transcript.turns()[1].content.clone(),
            }
        );
        assert_eq!(events[5], DebateEvent::DebateEnd);
    }
}
