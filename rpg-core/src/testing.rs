//! Testing utilities for the turn engine.
//!
//! - `MockNarrator` for deterministic narration without API calls
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying outcomes and state

use crate::actions::ActionOutcome;
use crate::combat::CombatEngine;
use crate::engine::{EngineConfig, TurnEngine};
use crate::narration::{NarrationError, NarrationRequest, Narrator};
use crate::world::{Character, Enemy, GameState};
use async_trait::async_trait;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// One scripted narrator answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw text handed back as if the model wrote it.
    Text(String),
    /// The narrator fails with this reason.
    Failure(String),
}

impl MockReply {
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text(raw.into())
    }

    /// A reply serialized from a JSON value.
    pub fn json(value: serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }
}

/// A narrator that returns scripted replies in order and records every
/// request it receives.
///
/// Clones share the same script and request log, so a test can keep one
/// handle after giving another to the engine. An exhausted script fails
/// like an unreachable service.
#[derive(Debug, Clone, Default)]
pub struct MockNarrator {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<NarrationRequest>>>,
}

impl MockNarrator {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    /// Add a reply to the end of the script.
    pub fn queue(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match reply {
            Some(MockReply::Text(raw)) => Ok(raw),
            Some(MockReply::Failure(reason)) => Err(NarrationError::Unavailable(reason)),
            None => Err(NarrationError::Unavailable("no scripted replies left".to_string())),
        }
    }
}

/// Test harness for running game scenarios.
pub struct TestHarness<R = StdRng> {
    pub engine: TurnEngine<R>,
    /// Shared handle to the narrator given to the engine.
    pub narrator: MockNarrator,
    pub character: Character,
    pub state: GameState,
}

impl TestHarness<StdRng> {
    /// A fresh character in the default village, with a fixed seed.
    pub fn new() -> Self {
        Self::with_character(Character::new("Test Hero"))
    }

    pub fn with_character(character: Character) -> Self {
        Self::with_rng(character, StdRng::seed_from_u64(7))
    }
}

impl Default for TestHarness<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness<StepRng> {
    /// Every d20 is a natural 1, every chance succeeds, every range yields
    /// its minimum.
    pub fn low_rolls() -> Self {
        Self::with_rng(Character::new("Test Hero"), StepRng::new(0, 0))
    }
}

impl<R: Rng> TestHarness<R> {
    pub fn with_rng(character: Character, rng: R) -> Self {
        let narrator = MockNarrator::default();
        let engine = TurnEngine::with_rng(EngineConfig::default(), rng).with_narrator(narrator.clone());
        Self {
            engine,
            narrator,
            character,
            state: GameState::default(),
        }
    }

    /// Queue a plain-text narration.
    pub fn expect_narration(&mut self, text: impl Into<String>) -> &mut Self {
        self.narrator.queue(MockReply::text(text));
        self
    }

    /// Queue a raw narrator reply.
    pub fn expect_reply(&mut self, reply: MockReply) -> &mut Self {
        self.narrator.queue(reply);
        self
    }

    /// Put the character in a fight with `enemies`.
    pub fn start_combat(&mut self, enemies: Vec<Enemy>) -> &mut Self {
        let session = CombatEngine::new(StdRng::seed_from_u64(1)).initiate(&self.character, enemies);
        self.state.combat = Some(session);
        self
    }

    /// Send one action through the engine.
    pub async fn act(&mut self, action: &str, details: &str) -> ActionOutcome {
        self.engine
            .process_action(action, details, &mut self.character, &mut self.state)
            .await
    }

    /// Current player health as (current, max).
    pub fn player_hp(&self) -> (i32, i32) {
        (self.character.current_hp, self.character.max_hp)
    }

    pub fn in_combat(&self) -> bool {
        self.state.in_combat()
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.character.find_item(name).is_some()
    }

    /// The last entry of the conversation history.
    pub fn last_message(&self) -> Option<&str> {
        self.state.messages.last().map(|m| m.content.as_str())
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

#[track_caller]
pub fn assert_success(outcome: &ActionOutcome) {
    assert!(
        outcome.success,
        "Expected success, got failure: {}",
        outcome.message
    );
}

/// Assert the outcome failed with a message containing `needle`.
#[track_caller]
pub fn assert_failure(outcome: &ActionOutcome, needle: &str) {
    assert!(!outcome.success, "Expected failure, got success: {}", outcome.message);
    assert!(
        outcome.message.contains(needle),
        "Expected failure message containing '{needle}', got '{}'",
        outcome.message
    );
}

#[track_caller]
pub fn assert_hp<R>(harness: &TestHarness<R>, current: i32, max: i32) {
    let actual = (harness.character.current_hp, harness.character.max_hp);
    assert_eq!(
        actual,
        (current, max),
        "Expected HP {current}/{max}, got {}/{}",
        actual.0,
        actual.1
    );
}

#[track_caller]
pub fn assert_in_combat<R>(harness: &TestHarness<R>) {
    assert!(harness.state.in_combat(), "Expected to be in combat");
}

#[track_caller]
pub fn assert_not_in_combat<R>(harness: &TestHarness<R>) {
    assert!(!harness.state.in_combat(), "Expected to NOT be in combat");
}

#[track_caller]
pub fn assert_has_item<R>(harness: &TestHarness<R>, name: &str) {
    assert!(
        harness.character.find_item(name).is_some(),
        "Expected '{name}' in inventory, have {:?}",
        harness.character.inventory
    );
}
