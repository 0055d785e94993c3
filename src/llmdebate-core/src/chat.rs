//! Speakers backed by an OpenAI-compatible chat completion API.
//!
//! Works against OpenAI itself or any local server exposing the same
//! surface, such as Ollama's `/v1` endpoint.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::participant::Stance;
use crate::speaker::Speaker;
use crate::transcript::Turn;

/// How much of the previous turn is quoted back in the prompt.
const CONTEXT_CHARS: usize = 200;

/// Filler openings stripped from replies.
const FILLER_PREFIXES: &[&str] = &[
    "As an AI",
    "I believe",
    "In my opinion",
    "I think",
    "Response:",
    "Answer:",
    "Here's my perspective:",
];

/// Connection and sampling settings shared by every chat speaker.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl ChatSettings {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// A role voiced by a chat model.
pub struct ChatSpeaker {
    name: String,
    model: String,
    tone: String,
    settings: ChatSettings,
    client: Client<OpenAIConfig>,
}

impl ChatSpeaker {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        tone: impl Into<String>,
        settings: ChatSettings,
    ) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            name: name.into(),
            model: model.into(),
            tone: tone.into(),
            settings,
            client: Client::with_config(config).with_http_client(http_client),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_messages(
        &self,
        topic: &str,
        stance: Stance,
        history: &[Turn],
    ) -> Vec<ChatCompletionRequestMessage> {
        let mut messages = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: persona_prompt(&self.name, &self.tone, stance, topic).into(),
                name: None,
            },
        )];

        for turn in history {
            if turn.speaker == self.name {
                messages.push(ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage {
                        content: Some(turn.content.clone().into()),
                        name: None,
                        tool_calls: None,
                        refusal: None,
                        audio: None,
                        function_call: None,
                    },
                ));
            } else {
                messages.push(ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: format!("[{} said]: {}", turn.speaker, turn.content).into(),
                        name: None,
                    },
                ));
            }
        }

        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: turn_prompt(stance, history).into(),
                name: None,
            },
        ));

        messages
    }

    fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        seed: i64,
    ) -> Result<CreateChatCompletionRequest, GenerationError> {
        Ok(CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p)
            .seed(seed)
            .messages(messages)
            .build()?)
    }

    /// One completion with exponential backoff on API errors.
    async fn complete(
        &self,
        request: &CreateChatCompletionRequest,
    ) -> Result<String, GenerationError> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                // 2s, 4s
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    return Ok(response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default());
                }
                Err(e) => {
                    warn!(
                        speaker = %self.name,
                        attempt = attempt + 1,
                        error = %e,
                        "chat completion failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(GenerationError::from).unwrap_or_else(|| {
            GenerationError::Unavailable("unknown API error after retries".to_string())
        }))
    }
}

#[async_trait]
impl Speaker for ChatSpeaker {
    async fn generate(
        &self,
        topic: &str,
        stance: Stance,
        history: &[Turn],
        rng: &mut StdRng,
    ) -> Result<String, GenerationError> {
        let messages = self.build_messages(topic, stance, history);

        let max_empty_retries = 3;
        for attempt in 0..max_empty_retries {
            // A backend that honours the seed would repeat an empty reply.
            let request = self.build_request(messages.clone(), rng.next_u64() as i64)?;
            let raw = self.complete(&request).await?;
            let text = clean_response(&sanitize_response(&raw));
            if !text.is_empty() {
                return Ok(text);
            }
            debug!(speaker = %self.name, attempt = attempt + 1, "empty response, retrying");
        }

        Err(GenerationError::EmptyResponse {
            speaker: self.name.clone(),
            attempts: max_empty_retries,
        })
    }
}

/// System prompt giving the model its persona and task.
fn persona_prompt(name: &str, tone: &str, stance: Stance, topic: &str) -> String {
    let (persona, instruction) = match stance {
        Stance::Pro => (
            format!(
                "You are {}, a {} advocate who supports ideas and looks for benefits and \
                 opportunities.",
                name, tone
            ),
            format!(
                "Argue in favor of: {}. Explain why this is beneficial and should be supported. \
                 Be persuasive but respectful.",
                topic
            ),
        ),
        Stance::Con => (
            format!(
                "You are {}, a {} critic who questions ideas and points out potential risks and \
                 downsides.",
                name, tone
            ),
            format!(
                "Argue against: {}. Explain the potential problems, risks, or downsides. \
                 Be skeptical but constructive.",
                topic
            ),
        ),
        Stance::Neutral => (
            format!(
                "You are {}, a {} moderator who summarizes different viewpoints and seeks \
                 balanced analysis.",
                name, tone
            ),
            format!(
                "Provide a balanced perspective on: {}. Summarize key considerations without \
                 taking a strong position.",
                topic
            ),
        ),
    };

    format!(
        "{}\n\n{} Limit your response to 2-3 sentences. Do not use markdown.",
        persona, instruction
    )
}

/// The final user message asking for this turn.
fn turn_prompt(stance: Stance, history: &[Turn]) -> String {
    match history.last() {
        Some(previous) => {
            let quoted: String = previous.content.chars().take(CONTEXT_CHARS).collect();
            let ask = if stance == Stance::Neutral {
                "Provide a brief, balanced summary of their point."
            } else {
                "Respond with your perspective."
            };
            format!(
                "Previous speaker said: \"{}...\"\n{}\n\nResponse (2-3 sentences max):",
                quoted, ask
            )
        }
        None => "Response (2-3 sentences max):".to_string(),
    }
}

/// Sanitize AI response by stripping reasoning tokens and XML-like tags.
///
/// Removes patterns like <thinking>...</thinking>, <reflection>...</reflection>, etc.
fn sanitize_response(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "reflect",
        "internal",
        "reasoning",
        "thought",
        "scratch",
        "scratchpad",
        "plan",
        "analysis",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Orphaned opening/closing tags
    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result = result.replace('*', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}

/// Drop filler openings and stray leading punctuation, then capitalize.
fn clean_response(text: &str) -> String {
    let mut text = text.trim();

    for prefix in FILLER_PREFIXES {
        let matches = text
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            text = text[prefix.len()..].trim_start();
            break;
        }
    }

    let text = text
        .strip_prefix([',', '.', '!', '?', ';', ':'])
        .unwrap_or(text)
        .trim_start();

    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// List the model ids served at `{api_base}/models`.
pub async fn list_models(api_base: &str, api_key: &str) -> Result<Vec<String>, GenerationError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let url = format!("{}/models", api_base.trim_end_matches('/'));
    let mut request = client.get(&url);
    if !api_key.is_empty() {
        request = request.bearer_auth(api_key);
    }

    let list: ModelList = request.send().await?.error_for_status()?.json().await?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}

/// Required models with no available model containing their name
/// (`llama3` is satisfied by `llama3:8b`).
pub fn missing_models<'a>(required: &[&'a str], available: &[String]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|model| !available.iter().any(|a| a.contains(model)))
        .collect()
}
