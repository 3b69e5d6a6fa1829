//! Integration tests for saving and resuming play.
//!
//! Run with: `cargo test -p rpg-core --test persistence`

use rpg_core::persist::{character_save_path, game_state_save_path, legacy_game_state_path};
use rpg_core::testing::{MockReply, TestHarness};
use rpg_core::world::Enemy;
use rpg_core::{GameSession, MockNarrator, SaveStore, SessionConfig};
use tempfile::TempDir;

fn setup() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn offline_config(user: &str, dir: &TempDir) -> SessionConfig {
    SessionConfig::new(user)
        .with_character_name("Wren")
        .with_save_dir(dir.path())
        .with_provider(None)
        .with_seed(21)
}

// =============================================================================
// Session round trips
// =============================================================================

#[tokio::test]
async fn test_every_action_is_written_back() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut session = GameSession::start(offline_config("wren", &temp_dir))
        .await
        .expect("session should start");

    let response = session.player_action("move", "east").await;
    assert!(response.outcome.success);
    assert!(response.saved);

    assert!(character_save_path(temp_dir.path(), "wren").exists());
    assert!(game_state_save_path(temp_dir.path(), "wren").exists());

    let store = SaveStore::new(temp_dir.path());
    let state = store.load_game_state("wren").await.unwrap().expect("saved state");
    assert_eq!(state.current_location, session.current_location());
    assert_eq!(state.world_map.len(), 2);

    let character = store.load_character("wren").await.unwrap().expect("saved character");
    assert_eq!(character.current_stamina, session.character().current_stamina);
    assert_eq!(character.hunger, session.character().hunger);
}

#[tokio::test]
async fn test_resume_mid_combat() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = offline_config("fighter", &temp_dir);

    {
        let mut session = GameSession::start(config.clone()).await.unwrap();
        let response = session.player_action("attack", "a wandering bandit").await;
        assert!(response.outcome.success);
        assert!(session.in_combat());
    }

    let mut resumed = GameSession::start(config).await.unwrap();
    assert!(resumed.in_combat());
    let combat = resumed.state().combat.as_ref().expect("combat persisted");
    assert_eq!(combat.enemies.len(), 1);

    let response = resumed.player_action("rest", "").await;
    assert!(!response.outcome.success);
    assert!(response.outcome.in_combat);
}

#[tokio::test]
async fn test_narrated_history_survives_restart() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = offline_config("bard", &temp_dir);
    let narrator = MockNarrator::new(vec![MockReply::text("The wind carries distant music.")]);

    {
        let mut session = GameSession::start(config.clone())
            .await
            .unwrap()
            .with_narrator(narrator.clone());
        let response = session.player_action("look", "").await;
        assert_eq!(response.text(), "The wind carries distant music.");
    }

    let resumed = GameSession::start(config).await.unwrap();
    let contents: Vec<&str> = resumed
        .state()
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["look", "The wind carries distant music."]);
    assert_eq!(narrator.request_count(), 1);
}

#[tokio::test]
async fn test_unwritable_save_dir_still_returns_outcome() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_dir = temp_dir.path().join("saves");
    let config = SessionConfig::new("ghost")
        .with_save_dir(&save_dir)
        .with_provider(None);
    let mut session = GameSession::start(config).await.unwrap();

    // A plain file where the save directory should go.
    std::fs::write(&save_dir, "occupied").unwrap();

    let response = session.player_action("rest", "").await;
    assert!(response.outcome.success);
    assert!(!response.saved);
}

// =============================================================================
// File formats
// =============================================================================

#[tokio::test]
async fn test_legacy_state_is_picked_up_by_session() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut harness = TestHarness::new();
    harness.act("move", "north").await;
    let json = serde_json::to_string_pretty(&harness.state).unwrap();
    std::fs::write(legacy_game_state_path(temp_dir.path(), "veteran"), json).unwrap();

    let session = GameSession::start(offline_config("veteran", &temp_dir)).await.unwrap();

    assert_eq!(session.state().location_id, harness.state.location_id);
    assert_eq!(session.current_location(), harness.state.current_location);
}

#[tokio::test]
async fn test_sparse_json_defaults_missing_fields() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(
        character_save_path(temp_dir.path(), "sparse"),
        r#"{"name": "Sparse", "gold": 3, "inventory": ["Rope", {"name": "Odd Trinket", "type": "misc"}]}"#,
    )
    .unwrap();

    let store = SaveStore::new(temp_dir.path());
    let character = store.load_character("sparse").await.unwrap().expect("character");

    assert_eq!(character.name, "Sparse");
    assert_eq!(character.gold, 3);
    assert_eq!(character.level, 1);
    assert_eq!(character.inventory.len(), 2);
    assert_eq!(character.inventory[1].name(), "Odd Trinket");
    assert!(character.max_hp > 0);
}

#[tokio::test]
async fn test_combat_session_round_trips() {
    setup();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SaveStore::new(temp_dir.path());
    let mut harness = TestHarness::new();
    harness.start_combat(vec![Enemy::new("Rat", 1), Enemy::new("Bat", 2)]);

    store.save_game_state("pair", &harness.state).await.unwrap();
    let loaded = store.load_game_state("pair").await.unwrap().expect("state");

    let combat = loaded.combat.expect("combat");
    let original = harness.state.combat.as_ref().expect("combat");
    assert_eq!(combat.enemy_names(), original.enemy_names());
    assert_eq!(combat.turn_order.len(), 3);
    assert_eq!(combat.round, 1);
    assert!(!combat.rewards_paid);
}
