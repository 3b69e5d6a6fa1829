//! GameSession - the primary public API for gameplay.
//!
//! Wraps the turn engine, the player's character and game state, and the
//! save directory into one object. Every action is saved before it returns.

use crate::actions::ActionOutcome;
use crate::engine::{EngineConfig, TurnEngine};
use crate::narration::{LlmNarrator, Narrator};
use crate::persist::{PersistError, SaveStore};
use crate::world::{Character, GameState};
use llm::{ChatClient, Provider};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("LLM error: {0}")]
    Llm(#[from] llm::Error),

    #[error("Unknown provider '{0}' (expected groq, openrouter or none)")]
    UnknownProvider(String),
}

/// Configuration for starting a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Key for the save files.
    pub user_id: String,

    /// Name given to a newly created character.
    pub character_name: String,

    pub save_dir: PathBuf,

    /// Narration provider; `None` plays without narration.
    pub provider: Option<Provider>,

    /// Model override for the provider.
    pub model: Option<String>,

    pub temperature: f32,
    pub max_tokens: usize,

    /// Fixed rng seed for reproducible play.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            character_name: "Adventurer".to_string(),
            save_dir: PathBuf::from("saves"),
            provider: Some(Provider::Groq),
            model: None,
            temperature: 0.7,
            max_tokens: 1024,
            seed: None,
        }
    }

    /// Read `RPG_USER`, `RPG_SAVE_DIR`, `RPG_PROVIDER` and `RPG_MODEL`.
    ///
    /// `RPG_PROVIDER=none` disables narration.
    pub fn from_env() -> Result<Self, SessionError> {
        let user = std::env::var("RPG_USER").unwrap_or_else(|_| "player".to_string());
        let mut config = Self::new(user);
        if let Ok(dir) = std::env::var("RPG_SAVE_DIR") {
            config = config.with_save_dir(dir);
        }
        if let Ok(provider) = std::env::var("RPG_PROVIDER") {
            config.provider = parse_provider(&provider)?;
        }
        if let Ok(model) = std::env::var("RPG_MODEL") {
            config = config.with_model(model);
        }
        Ok(config)
    }

    pub fn with_character_name(mut self, name: impl Into<String>) -> Self {
        self.character_name = name.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_provider(mut self, provider: Option<Provider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Parse a provider name, where "none" (or "off") means no narration.
pub fn parse_provider(name: &str) -> Result<Option<Provider>, SessionError> {
    match name.trim().to_lowercase().as_str() {
        "none" | "off" | "" => Ok(None),
        other => Provider::from_name(other)
            .map(Some)
            .ok_or_else(|| SessionError::UnknownProvider(name.to_string())),
    }
}

/// Response from a player action.
#[derive(Debug, Clone)]
pub struct Response {
    pub outcome: ActionOutcome,
    /// Whether the character and state were written back.
    pub saved: bool,
}

impl Response {
    /// The text to show the player.
    pub fn text(&self) -> &str {
        self.outcome.text()
    }
}

/// A single player's game.
pub struct GameSession {
    config: SessionConfig,
    store: SaveStore,
    engine: TurnEngine,
    character: Character,
    state: GameState,
}

impl GameSession {
    /// Resume the user's saved game, or start a new one.
    ///
    /// A configured provider without an API key logs a warning and plays
    /// without narration.
    pub async fn start(config: SessionConfig) -> Result<Self, SessionError> {
        let store = SaveStore::new(&config.save_dir);

        let character = match store.load_character(&config.user_id).await? {
            Some(character) => {
                tracing::info!(user = %config.user_id, character = %character.name, "resumed character");
                character
            }
            None => new_character(&config),
        };
        let state = store
            .load_game_state(&config.user_id)
            .await?
            .unwrap_or_default();

        let mut engine = TurnEngine::new(EngineConfig::default());
        if let Some(seed) = config.seed {
            engine = engine.with_seed(seed);
        }
        engine.set_narrator(build_narrator(&config));

        Ok(Self {
            config,
            store,
            engine,
            character,
            state,
        })
    }

    /// Replace the narrator.
    pub fn with_narrator(mut self, narrator: impl Narrator + 'static) -> Self {
        self.engine.set_narrator(Some(Box::new(narrator)));
        self
    }

    /// Play without narration.
    pub fn without_narrator(mut self) -> Self {
        self.engine.set_narrator(None);
        self
    }

    /// Resolve one action and save the result.
    ///
    /// A failed save is logged and reported through [`Response::saved`];
    /// the outcome is returned either way.
    pub async fn player_action(&mut self, action: &str, details: &str) -> Response {
        let outcome = self
            .engine
            .process_action(action, details, &mut self.character, &mut self.state)
            .await;

        let saved = match self.save().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user = %self.config.user_id, error = %e, "failed to save game");
                false
            }
        };
        Response { outcome, saved }
    }

    pub async fn save(&self) -> Result<(), SessionError> {
        self.store
            .save_character(&self.config.user_id, &self.character)
            .await?;
        self.store
            .save_game_state(&self.config.user_id, &self.state)
            .await?;
        Ok(())
    }

    /// Delete the saves and start over with a new character.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.store.delete(&self.config.user_id).await?;
        self.character = new_character(&self.config);
        self.state = GameState::default();
        tracing::info!(user = %self.config.user_id, "session reset");
        self.save().await
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn has_narrator(&self) -> bool {
        self.engine.has_narrator()
    }

    pub fn in_combat(&self) -> bool {
        self.state.in_combat()
    }

    pub fn current_location(&self) -> &str {
        &self.state.current_location
    }

    /// Multi-line status report for the player.
    pub fn status(&self) -> String {
        let c = &self.character;
        let mut lines = vec![
            c.status_line(),
            format!("Location: {} {}", self.state.current_location, self.state.coordinates),
            format!("Hunger: {}/100  Thirst: {}/100", c.hunger, c.thirst),
        ];
        if !c.inventory.is_empty() {
            let items: Vec<&str> = c.inventory.iter().map(|i| i.name()).collect();
            lines.push(format!("Inventory: {}", items.join(", ")));
        }
        if !c.equipment.is_empty() {
            let worn: Vec<String> = c
                .equipment
                .iter()
                .map(|(slot, item)| format!("{slot}: {item}"))
                .collect();
            lines.push(format!("Equipped: {}", worn.join(", ")));
        }
        if let Some(combat) = &self.state.combat {
            lines.push(format!("Combat: {}", combat.summary()));
        }
        let quests: Vec<String> = self
            .state
            .active_quests()
            .map(|q| format!("{} ({}%)", q.name, q.progress))
            .collect();
        if !quests.is_empty() {
            lines.push(format!("Quests: {}", quests.join(", ")));
        }
        lines.join("\n")
    }
}

fn new_character(config: &SessionConfig) -> Character {
    let mut character = Character::new(config.character_name.clone());
    character.session_id = Some(config.user_id.clone());
    tracing::info!(user = %config.user_id, character = %character.name, "created character");
    character
}

fn build_narrator(config: &SessionConfig) -> Option<Box<dyn Narrator>> {
    let provider = config.provider?;
    let client = match ChatClient::from_env(provider) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(%provider, error = %e, "narration disabled");
            return None;
        }
    };
    let client = match &config.model {
        Some(model) => client.with_model(model.clone()),
        None => client,
    };
    let narrator = LlmNarrator::new(client)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);
    Some(Box::new(narrator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config() {
        let config = SessionConfig::new("user-1")
            .with_character_name("Thorin")
            .with_save_dir("/tmp/saves")
            .with_provider(None)
            .with_max_tokens(2048)
            .with_seed(9);

        assert_eq!(config.user_id, "user-1");
        assert_eq!(config.character_name, "Thorin");
        assert_eq!(config.save_dir, PathBuf::from("/tmp/saves"));
        assert_eq!(config.provider, None);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("none").unwrap(), None);
        assert_eq!(parse_provider("Groq").unwrap(), Some(Provider::Groq));
        assert_eq!(parse_provider("openrouter").unwrap(), Some(Provider::OpenRouter));
        assert!(matches!(
            parse_provider("anthropic"),
            Err(SessionError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_start_creates_and_saves() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let config = SessionConfig::new("alice")
            .with_character_name("Alice")
            .with_save_dir(temp_dir.path())
            .with_provider(None)
            .with_seed(3);

        let mut session = GameSession::start(config.clone()).await.unwrap();
        assert!(!session.has_narrator());
        assert_eq!(session.character().name, "Alice");
        assert_eq!(session.character().session_id.as_deref(), Some("alice"));

        let response = session.player_action("rest", "").await;
        assert!(response.outcome.success);
        assert!(response.saved);

        let resumed = GameSession::start(config).await.unwrap();
        assert_eq!(resumed.character().id, session.character().id);
        assert_eq!(resumed.state().summary, session.state().summary);
    }

    #[tokio::test]
    async fn test_reset_starts_over() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let config = SessionConfig::new("bob")
            .with_save_dir(temp_dir.path())
            .with_provider(None);

        let mut session = GameSession::start(config).await.unwrap();
        let old_id = session.character().id;
        session.player_action("rest", "").await;

        session.reset().await.unwrap();
        assert_ne!(session.character().id, old_id);
        assert!(session.state().summary.is_empty());
        assert!(session.status().contains("Village Square"));
    }
}
