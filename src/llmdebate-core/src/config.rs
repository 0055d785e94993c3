//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::chat::{ChatSettings, ChatSpeaker};
use crate::error::DebateError;
use crate::participant::{Role, Stance};
use crate::registry::SpeakerRegistry;
use crate::scheduler::{ModeratorPolicy, NeutralFollowUp, SchedulingPolicy};
use crate::speaker::{FallbackSpeaker, Speaker};
use crate::template::TemplateSpeaker;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub moderator: ModeratorConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default = "default_roles")]
    pub roles: Vec<RoleConfig>,
}

/// Run defaults, overridable from the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct DebateSettings {
    #[serde(default = "default_turns")]
    pub turns: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            turns: default_turns(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeratorKind {
    #[default]
    StartOnly,
    Interval,
    Probability,
}

/// `[moderator]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeratorConfig {
    #[serde(default)]
    pub policy: ModeratorKind,
    /// Turn interval for the `interval` policy.
    pub every: Option<usize>,
    /// Per-turn chance for the `probability` policy.
    pub chance: Option<f64>,
    #[serde(default)]
    pub follow_up: NeutralFollowUp,
}

impl ModeratorConfig {
    pub fn scheduling_policy(&self) -> Result<SchedulingPolicy, DebateError> {
        let moderator = match self.policy {
            ModeratorKind::StartOnly => ModeratorPolicy::StartOnly,
            ModeratorKind::Interval => ModeratorPolicy::Interval {
                every: self.every.ok_or_else(|| {
                    DebateError::ConfigError(
                        "moderator.every is required for the interval policy".to_string(),
                    )
                })?,
            },
            ModeratorKind::Probability => ModeratorPolicy::Probability {
                chance: self.chance.ok_or_else(|| {
                    DebateError::ConfigError(
                        "moderator.chance is required for the probability policy".to_string(),
                    )
                })?,
            },
        };

        Ok(SchedulingPolicy {
            moderator,
            follow_up: self.follow_up,
        })
    }
}

/// Chat backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// One `[[roles]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    pub stance: Stance,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_persuasion")]
    pub persuasion: f64,
    /// Chat model voicing this role when running against a backend.
    pub model: String,
}

impl RoleConfig {
    fn new(name: &str, stance: Stance, tone: &str, persuasion: f64, model: &str) -> Self {
        Self {
            name: name.to_string(),
            stance,
            tone: tone.to_string(),
            persuasion,
            model: model.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml_str(content: &str) -> Result<Self, DebateError> {
        toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Backend settings with `api_base` optionally overridden (e.g. from
    /// the environment).
    pub fn chat_settings(
        &self,
        api_base: Option<String>,
        api_key: impl Into<String>,
    ) -> ChatSettings {
        let mut settings = ChatSettings::new(
            api_base.unwrap_or_else(|| self.backend.api_base.clone()),
            api_key,
        );
        settings.max_tokens = self.backend.max_tokens;
        settings.temperature = self.backend.temperature;
        settings.top_p = self.backend.top_p;
        settings
    }

    /// Distinct chat models named by the roles, in role order.
    pub fn required_models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::new();
        for role in &self.roles {
            if !models.contains(&role.model.as_str()) {
                models.push(&role.model);
            }
        }
        models
    }

    /// Registry where every role speaks from templates.
    pub fn template_registry(&self) -> Result<SpeakerRegistry, DebateError> {
        SpeakerRegistry::new(
            self.roles
                .iter()
                .map(|r| Role::new(&r.name, r.stance, Arc::new(TemplateSpeaker::new(r.persuasion))))
                .collect(),
        )
    }

    /// Registry where every role speaks through the chat backend, falling
    /// back to its template voice on failure when `fallback` is set.
    pub fn chat_registry(
        &self,
        settings: &ChatSettings,
        fallback: bool,
    ) -> Result<SpeakerRegistry, DebateError> {
        let mut roles = Vec::with_capacity(self.roles.len());
        for r in &self.roles {
            let chat = ChatSpeaker::new(&r.name, &r.model, &r.tone, settings.clone()).map_err(|e| {
                DebateError::ConfigError(format!("Failed to set up {}: {}", r.name, e))
            })?;

            let speaker: Arc<dyn Speaker> = if fallback {
                Arc::new(FallbackSpeaker::new(
                    &r.name,
                    Arc::new(chat),
                    Arc::new(TemplateSpeaker::new(r.persuasion)),
                ))
            } else {
                Arc::new(chat)
            };
            roles.push(Role::new(&r.name, r.stance, speaker));
        }
        SpeakerRegistry::new(roles)
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        debate: DebateSettings::default(),
        moderator: ModeratorConfig::default(),
        backend: BackendConfig::default(),
        roles: default_roles(),
    }
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig::new("Argus", Stance::Pro, "passionate", 0.8, "llama3"),
        RoleConfig::new("Boreas", Stance::Con, "skeptical", 0.7, "mistral"),
        RoleConfig::new("Clio", Stance::Neutral, "measured", 0.5, "phi3"),
    ]
}

fn default_turns() -> usize {
    6
}

fn default_api_base() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_tone() -> String {
    "measured".to_string()
}

fn default_persuasion() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_reference_setup() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.debate.turns, 6);
        assert_eq!(config.debate.seed, None);
        assert_eq!(config.roles.len(), 3);
        assert_eq!(config.required_models(), vec!["llama3", "mistral", "phi3"]);
        assert_eq!(
            config.moderator.scheduling_policy().unwrap(),
            SchedulingPolicy::default()
        );
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml_str(
            r#"
            [debate]
            turns = 8
            seed = 42

            [moderator]
            policy = "interval"
            every = 4
            follow_up = "oppose-last"

            [backend]
            api_base = "https://api.openai.com/v1"
            temperature = 0.2

            [[roles]]
            name = "Ada"
            stance = "pro"
            model = "gpt-4o-mini"

            [[roles]]
            name = "Byron"
            stance = "con"
            tone = "dry"
            persuasion = 0.3
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(config.debate.turns, 8);
        assert_eq!(config.debate.seed, Some(42));
        assert_eq!(
            config.moderator.scheduling_policy().unwrap(),
            SchedulingPolicy {
                moderator: ModeratorPolicy::Interval { every: 4 },
                follow_up: NeutralFollowUp::OpposeLast,
            }
        );
        assert_eq!(config.backend.max_tokens, 200);
        assert_eq!(config.roles[0].tone, "measured");
        assert_eq!(config.roles[1].stance, Stance::Con);
        assert_eq!(config.required_models(), vec!["gpt-4o-mini"]);

        let settings = config.chat_settings(None, "sk-test");
        assert_eq!(settings.api_base, "https://api.openai.com/v1");
        assert_eq!(settings.temperature, 0.2);
        let settings = config.chat_settings(Some("http://localhost:8080/v1".to_string()), "");
        assert_eq!(settings.api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn test_policy_without_parameter_rejected() {
        let config = Config::from_toml_str("[moderator]\npolicy = \"probability\"\n").unwrap();
        assert!(matches!(
            config.moderator.scheduling_policy(),
            Err(DebateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_stance_rejected() {
        let result = Config::from_toml_str(
            "[[roles]]\nname = \"X\"\nstance = \"maybe\"\nmodel = \"m\"\n",
        );
        assert!(matches!(result, Err(DebateError::ConfigError(_))));
    }

    #[test]
    fn test_registries_follow_roles() {
        let config = default_config();
        let templates = config.template_registry().unwrap();
        assert_eq!(templates.all_roles().len(), 3);
        let boreas = templates.all_roles().iter().find(|r| r.name == "Boreas");
        assert_eq!(boreas.map(|r| r.stance), Some(Stance::Con));

        let settings = config.chat_settings(None, "");
        let chat = config.chat_registry(&settings, true).unwrap();
        assert_eq!(chat.all_roles().len(), 3);
        assert_eq!(chat.roles_for_stance(Stance::Neutral).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/llmdebate.toml"),
            Err(DebateError::ConfigError(_))
        ));
    }
}
