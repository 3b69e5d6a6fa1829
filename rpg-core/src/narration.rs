//! Narration oracle: request context, reply schema, and fallbacks.
//!
//! The engine resolves every action mechanically first. A [`Narrator`] is
//! then asked to describe the result. Whatever it answers is parsed
//! leniently; when it fails or answers nonsense, a canned line for the
//! kind of action is used instead.

use crate::extract::extract_json;
use crate::world::{Character, ChatMessage, GameState, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from narration.
#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("LLM error: {0}")]
    Llm(#[from] llm::Error),

    #[error("Narrator returned an empty reply")]
    EmptyReply,

    #[error("Narrator echoed the action instead of narrating it")]
    EchoReply,

    #[error("Narrator unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Reply schema
// ============================================================================

/// A check the narrator thinks the player should roll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedRoll {
    pub description: String,
    pub attribute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    pub dc: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

fn default_true() -> bool {
    true
}

/// What the narrator may answer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrationReply {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub current_detailed_location: Option<String>,
    #[serde(default)]
    pub scene_description_update: Option<String>,
    #[serde(default)]
    pub interpreted_action_type: Option<String>,
    #[serde(default)]
    pub interpreted_action_details: Option<String>,
    #[serde(default)]
    pub suggested_roll: Option<SuggestedRoll>,
    #[serde(default)]
    pub interactable_elements: Option<Vec<String>>,
    #[serde(default)]
    pub new_facts: BTreeMap<String, serde_json::Value>,
}

impl NarrationReply {
    /// A plain-text reply.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Interpret raw narrator output.
    ///
    /// JSON objects (bare, fenced, or embedded) are read field by field;
    /// anything else becomes the message. Empty output and replies that
    /// merely restate the action are rejected.
    pub fn parse(raw: &str) -> Result<Self, NarrationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(NarrationError::EmptyReply);
        }

        let reply = match extract_json(raw) {
            Some(map) => {
                let fallback_message = map
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string);
                match serde_json::from_value::<NarrationReply>(serde_json::Value::Object(map)) {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::debug!(error = %e, "narration reply did not match schema");
                        Self::text(fallback_message.unwrap_or_else(|| raw.to_string()))
                    }
                }
            }
            None => Self::text(raw),
        };

        if reply.message.trim().is_empty() {
            return Err(NarrationError::EmptyReply);
        }
        if is_echo(&reply.message) {
            return Err(NarrationError::EchoReply);
        }
        Ok(reply)
    }
}

/// "You performed the move action: north" and similar non-narration.
fn is_echo(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    lower.starts_with("you performed the ") && lower.contains(" action")
}

// ============================================================================
// Prompt types and fallbacks
// ============================================================================

/// Broad kind of request, used to pick a fallback line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Move,
    Combat,
    Talk,
    Search,
    UseItem,
    Default,
}

const PROMPT_KEYWORDS: &[(PromptType, &[&str])] = &[
    (PromptType::Move, &["move", "go to", "travel", "walk", "enter"]),
    (PromptType::Combat, &["combat", "attack", "fight", "battle", "enemy", "flee"]),
    (PromptType::Talk, &["talk", "speak", "conversation", "dialogue"]),
    (PromptType::Search, &["search", "look", "examine", "investigate"]),
    (PromptType::UseItem, &["use", "item", "potion", "scroll", "equip"]),
];

impl PromptType {
    /// First prompt type with a keyword in `text`.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        PROMPT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(kind, _)| *kind)
            .unwrap_or(PromptType::Default)
    }

    pub fn fallback(&self) -> &'static str {
        match self {
            PromptType::Move => "You walk along a winding path through a dense forest.",
            PromptType::Combat => "Steel flashes as the fight goes on!",
            PromptType::Talk => "Hello, traveler! Sorry, I can't talk right now.",
            PromptType::Search => "You examine the area, but find nothing special at the moment.",
            PromptType::UseItem => "You fumble with your pack for a moment.",
            PromptType::Default => "The world seems to hold its breath for a moment.",
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

pub const SYSTEM_PROMPT: &str = "You are the narrator of a text role-playing game. \
The game engine has already resolved the player's action; describe its outcome vividly \
in two to four sentences without changing the mechanical result. \
Answer with a JSON object with the fields: success (bool), message (string), \
current_detailed_location (string, optional), scene_description_update (string, optional), \
interactable_elements (array of strings, optional), new_facts (object, optional), \
suggested_roll ({description, attribute, skill, dc, reasoning}, optional).";

/// Snapshot of the situation handed to the narrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrationContext {
    pub location: String,
    pub detailed_location: Option<String>,
    pub scene_description: String,
    pub npcs: Vec<String>,
    pub events: Vec<String>,
    pub combat: Option<String>,
    pub character: String,
    pub action: String,
    pub details: String,
    /// Mechanical outcome as the engine reported it.
    pub result: String,
}

impl NarrationContext {
    pub fn from_state(
        character: &Character,
        state: &GameState,
        action: &str,
        details: &str,
        result: &str,
    ) -> Self {
        Self {
            location: state.current_location.clone(),
            detailed_location: state.detailed_location.clone(),
            scene_description: state.scene_description.clone(),
            npcs: state.npcs_present.clone(),
            events: state.events.clone(),
            combat: state.combat.as_ref().map(|c| c.summary()),
            character: character.status_line(),
            action: action.to_string(),
            details: details.to_string(),
            result: result.to_string(),
        }
    }

    pub fn to_prompt(&self) -> String {
        let mut lines = vec![format!("Location: {}", self.location)];
        if let Some(detail) = &self.detailed_location {
            lines.push(format!("Exact spot: {detail}"));
        }
        if !self.scene_description.is_empty() {
            lines.push(format!("Scene: {}", self.scene_description));
        }
        if !self.npcs.is_empty() {
            lines.push(format!("People here: {}", self.npcs.join(", ")));
        }
        if !self.events.is_empty() {
            lines.push(format!("Happening: {}", self.events.join("; ")));
        }
        if let Some(combat) = &self.combat {
            lines.push(format!("Combat: {combat}"));
        }
        lines.push(format!("Character: {}", self.character));
        lines.push(format!("Action: {} {}", self.action, self.details).trim_end().to_string());
        lines.push(format!("Result: {}", self.result));
        lines.join("\n")
    }

    /// Kind of request, from the action and its details.
    pub fn prompt_type(&self) -> PromptType {
        PromptType::classify(&format!("{} {}", self.action, self.details))
    }
}

/// A complete narration request. History is owned by the caller.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub system: String,
    pub history: Vec<ChatMessage>,
    pub prompt: String,
    pub prompt_type: PromptType,
}

impl NarrationRequest {
    pub fn new(context: &NarrationContext, history: &[ChatMessage]) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            history: history.to_vec(),
            prompt: context.to_prompt(),
            prompt_type: context.prompt_type(),
        }
    }
}

/// Something that turns a request into raw narrator output.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

// ============================================================================
// LLM-backed narrator
// ============================================================================

/// Narrator backed by an OpenAI-compatible chat completion endpoint.
pub struct LlmNarrator {
    client: llm::ChatClient,
    temperature: f32,
    max_tokens: usize,
}

impl LlmNarrator {
    pub fn new(client: llm::ChatClient) -> Self {
        Self {
            client,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn to_llm_message(message: &ChatMessage) -> llm::Message {
    match message.role {
        MessageRole::System => llm::Message::system(message.content.clone()),
        MessageRole::User => llm::Message::user(message.content.clone()),
        MessageRole::Assistant => llm::Message::assistant(message.content.clone()),
    }
}

#[async_trait]
impl Narrator for LlmNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        let mut messages: Vec<llm::Message> = request.history.iter().map(to_llm_message).collect();
        messages.push(llm::Message::user(request.prompt.clone()));

        let chat = llm::ChatRequest::new(messages)
            .with_system(request.system.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_json_mode(true);

        let response = self.client.complete(chat).await?;
        tracing::debug!(
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            "narration received"
        );
        Ok(response.content)
    }
}
