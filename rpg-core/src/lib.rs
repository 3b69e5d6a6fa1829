//! Turn-resolution and combat engine for an AI-narrated text RPG.
//!
//! This crate provides:
//! - Dice, attack resolution and a round-based combat engine
//! - A turn engine that gates, resolves and narrates player actions
//! - Procedural locations, NPCs, enemies and quests
//! - LLM narration with fallback responses when the model is unavailable
//! - Flat JSON-file persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use rpg_core::{GameSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("player-1")
//!         .with_character_name("Thorin");
//!
//!     let mut session = GameSession::start(config).await?;
//!
//!     let response = session.player_action("move", "north").await;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod combat;
pub mod dice;
pub mod engine;
pub mod extract;
pub mod items;
pub mod narration;
pub mod persist;
pub mod session;
pub mod survival;
pub mod testing;
pub mod world;
pub mod worldgen;

// Primary public API
pub use actions::{Action, ActionOutcome, Effect};
pub use combat::{CombatAction, CombatEngine, CombatOutcome, RoundResult};
pub use engine::{EngineConfig, TurnEngine};
pub use narration::{LlmNarrator, NarrationError, Narrator};
pub use persist::{PersistError, SaveStore};
pub use session::{GameSession, Response, SessionConfig, SessionError};
pub use testing::{MockNarrator, MockReply, TestHarness};
pub use world::{Character, Enemy, GameState};
