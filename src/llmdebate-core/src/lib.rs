//! LLMDebate Core Library
//!
//! Provides adversarial turn scheduling, debate orchestration, and the
//! speakers that voice each role.

pub mod chat;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod participant;
pub mod registry;
pub mod scheduler;
pub mod speaker;
pub mod template;
pub mod transcript;

pub use chat::{ChatSettings, ChatSpeaker};
pub use config::{Config, default_config};
pub use error::{DebateError, GenerationError};
pub use orchestrator::{DebateEvent, DebateOrchestrator, DebateRequest};
pub use participant::{Role, Stance};
pub use registry::SpeakerRegistry;
pub use scheduler::{
    ModeratorPolicy, NeutralFollowUp, SchedulerState, SchedulingPolicy, TurnScheduler,
};
pub use speaker::{FallbackSpeaker, Speaker};
pub use template::TemplateSpeaker;
pub use transcript::{Transcript, Turn};
