//! Integration tests for the turn engine: gating, narration and write-back.
//!
//! Run with: `cargo test -p rpg-core --test turn_engine`

use rpg_core::actions::Effect;
use rpg_core::narration::PromptType;
use rpg_core::testing::{
    assert_failure, assert_has_item, assert_in_combat, assert_not_in_combat, assert_success,
    MockReply, TestHarness,
};
use rpg_core::world::{Attributes, Character, Enemy, MessageRole};
use rand::rngs::mock::StepRng;
use serde_json::json;

/// Load environment variables and route logs to the test writer.
fn setup() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Stamina gate
// =============================================================================

#[tokio::test]
async fn test_action_with_enough_stamina_proceeds() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.start_combat(vec![Enemy::new("Goblin", 1)]);
    harness.character.current_stamina = 5;

    let outcome = harness.act("attack", "goblin").await;

    assert_success(&outcome);
    assert_eq!(harness.character.current_stamina, 2);
    assert!(matches!(
        outcome.effects.first(),
        Some(Effect::StaminaSpent { amount: 3, remaining: 2 })
    ));
    assert_in_combat(&harness);
}

#[tokio::test]
async fn test_action_without_enough_stamina_changes_nothing() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.start_combat(vec![Enemy::new("Goblin", 1)]);
    harness.character.current_stamina = 2;
    harness.expect_narration("unused");
    let before = harness.state.clone();
    let hp = harness.player_hp();

    let outcome = harness.act("attack", "goblin").await;

    assert_failure(
        &outcome,
        "Not enough stamina to attack. You need 3 stamina (you have 2).",
    );
    assert_eq!(harness.character.current_stamina, 2);
    assert_eq!(harness.player_hp(), hp);
    assert!(outcome.narration.is_none());
    assert_eq!(harness.narrator.request_count(), 0);

    let session = harness.state.combat.as_ref().expect("still in combat");
    let old = before.combat.as_ref().expect("was in combat");
    assert_eq!(session.round, old.round);
    assert_eq!(session.enemies[0].current_hp, old.enemies[0].current_hp);
    assert_eq!(session.log, old.log);
    assert_eq!(harness.state.summary, before.summary);
    assert_eq!(harness.state.messages, before.messages);
}

fn striker() -> TestHarness<StepRng> {
    let mut harness = TestHarness::with_rng(
        Character::new("Striker").with_skill("power_strike"),
        StepRng::new(0, 0),
    );
    harness.start_combat(vec![Enemy::new("Goblin", 1)]);
    harness
}

#[tokio::test]
async fn test_refused_skill_spends_nothing() {
    setup();
    let mut harness = striker();
    harness.character.current_stamina = 3;

    let outcome = harness.act("attack", "power strike goblin").await;

    assert!(!outcome.success);
    assert_eq!(harness.character.current_stamina, 3);
    assert_in_combat(&harness);
}

#[tokio::test]
async fn test_skill_costs_only_its_own_stamina() {
    setup();
    let mut harness = striker();
    harness.character.current_stamina = 7;

    let outcome = harness.act("attack", "power strike goblin").await;

    assert_success(&outcome);
    assert_eq!(harness.character.current_stamina, 3);
    assert!(matches!(
        outcome.effects.first(),
        Some(Effect::StaminaSpent { amount: 4, remaining: 3 })
    ));
}

#[tokio::test]
async fn test_free_actions_need_no_stamina() {
    setup();
    let mut harness = TestHarness::new();
    harness.character.current_stamina = 0;

    assert_success(&harness.act("look", "").await);
    assert_failure(&harness.act("move", "north").await, "Not enough stamina to move");
    assert_success(&harness.act("rest", "").await);
    assert_success(&harness.act("move", "north").await);
}

// =============================================================================
// Combat gate and flight
// =============================================================================

#[tokio::test]
async fn test_combat_gate_allows_only_fight_or_flight() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.start_combat(vec![Enemy::new("Wolf", 1)]);

    for action in ["move", "look", "talk", "search", "rest", "dance"] {
        let outcome = harness.act(action, "around").await;
        assert_failure(&outcome, "You are in combat! You must fight or flee.");
        assert!(outcome.in_combat);
    }
    assert_eq!(harness.character.current_stamina, harness.character.max_stamina);

    let outcome = harness.act("use_item", "health potion").await;
    assert_success(&outcome);
    assert_in_combat(&harness);
}

#[tokio::test]
async fn test_successful_flee_clears_combat() {
    setup();
    let nimble = Attributes {
        dexterity: 30,
        ..Default::default()
    };
    let character = rpg_core::Character::new("Runner").with_attributes(nimble);
    let mut harness = TestHarness::with_rng(character, rand::rngs::mock::StepRng::new(0, 0));
    harness.start_combat(vec![Enemy::new("Rat", 1)]);
    let hp = harness.player_hp();

    let outcome = harness.act("flee", "").await;

    assert_success(&outcome);
    assert_not_in_combat(&harness);
    assert!(harness.state.combat.is_none());
    assert_eq!(harness.player_hp(), hp);
    assert!(!outcome.message.contains("hits you"));
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::CombatEnded { .. })));
}

#[tokio::test]
async fn test_flee_outside_combat_fails() {
    setup();
    let mut harness = TestHarness::new();
    let outcome = harness.act("flee", "").await;
    assert_failure(&outcome, "You are not in combat.");
}

#[tokio::test]
async fn test_attack_named_npc_turns_them_hostile() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.state.npcs_present = vec!["Mara".to_string()];

    let outcome = harness.act("attack", "mara").await;

    assert_success(&outcome);
    assert_in_combat(&harness);
    let session = harness.state.combat.as_ref().expect("combat started");
    assert_eq!(session.enemies[0].name, "Mara");
    assert!(harness.state.npcs_present.is_empty());
    assert_eq!(harness.state.known_npcs["Mara"].relationship, -50);
}

#[tokio::test]
async fn test_poisoned_character_defeat_recovers() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.start_combat(vec![Enemy::new("Spider", 1)]);
    harness.character.current_hp = 1;
    harness
        .character
        .status_effects
        .push(rpg_core::world::StatusEffect::poison(3, 5));

    let outcome = harness.act("attack", "spider").await;

    assert_success(&outcome);
    assert!(outcome.message.contains("You were defeated!"));
    assert_not_in_combat(&harness);
    assert_eq!(harness.character.current_hp, 1);
    assert!(harness.character.status_effects.is_empty());
}

// =============================================================================
// Narration
// =============================================================================

#[tokio::test]
async fn test_narrator_failure_uses_fallback() {
    setup();
    let mut harness = TestHarness::new();
    harness.expect_reply(MockReply::failure("connection refused"));

    let outcome = harness.act("move", "north").await;

    assert_success(&outcome);
    assert!(outcome.fallback_used);
    assert_eq!(outcome.narration.as_deref(), Some(PromptType::Move.fallback()));
    assert!(outcome.message.starts_with("You travel north"));
}

#[tokio::test]
async fn test_echo_reply_is_rejected() {
    setup();
    let mut harness = TestHarness::new();
    harness.expect_narration("You performed the search action: the well");

    let outcome = harness.act("search", "the well").await;

    assert!(outcome.fallback_used);
    assert_eq!(outcome.narration.as_deref(), Some(PromptType::Search.fallback()));
}

#[tokio::test]
async fn test_json_reply_is_merged_into_state() {
    setup();
    let mut harness = TestHarness::new();
    harness.expect_reply(MockReply::text(format!(
        "Here you go:\n```json\n{}\n```",
        json!({
            "message": "Lanterns sway over the cobbles.",
            "current_detailed_location": "beside the old well",
            "scene_description_update": "Evening settles over the square.",
            "interactable_elements": ["well", "notice board"],
            "new_facts": {"well_is_dry": true},
            "suggested_roll": {"description": "Peer into the well", "attribute": "wisdom", "dc": 12}
        })
    )));

    let outcome = harness.act("look", "").await;

    assert_success(&outcome);
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.text(), "Lanterns sway over the cobbles.");
    assert_eq!(harness.state.detailed_location.as_deref(), Some("beside the old well"));
    assert_eq!(harness.state.scene_description, "Evening settles over the square.");
    assert_eq!(harness.state.interactable_elements, vec!["well", "notice board"]);
    assert_eq!(harness.state.facts["well_is_dry"], json!(true));
    let roll = outcome.suggested_roll.expect("suggested roll");
    assert_eq!(roll.dc, 12);
    assert_eq!(roll.attribute, "wisdom");
}

#[tokio::test]
async fn test_history_is_owned_by_state() {
    setup();
    let mut harness = TestHarness::new();
    harness
        .expect_narration("The square is quiet.")
        .expect_narration("A cat watches you.");

    harness.act("look", "around").await;
    harness.act("look", "at the cat").await;

    let requests = harness.narrator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[0].content, "look around");
    assert_eq!(requests[1].history[1].content, "The square is quiet.");

    let last = harness.state.messages.last().expect("history");
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, "A cat watches you.");
}

#[tokio::test]
async fn test_history_is_capped() {
    setup();
    let mut harness = TestHarness::new();
    for _ in 0..15 {
        harness.act("look", "").await;
    }
    assert_eq!(harness.state.messages.len(), rpg_core::world::MAX_MESSAGES);
}

// =============================================================================
// Exploration
// =============================================================================

#[tokio::test]
async fn test_walk_a_loop_and_return() {
    setup();
    let mut harness = TestHarness::new();
    let start = harness.state.location_id;

    for direction in ["north", "east", "south", "west"] {
        let outcome = harness.act("move", direction).await;
        assert_success(&outcome);
    }

    assert_eq!(harness.state.location_id, start);
    assert_eq!(harness.state.world_map.len(), 4);
    assert_eq!(harness.state.visited_locations[&start].visits, 2);
    assert!(harness
        .state
        .messages
        .iter()
        .any(|m| m.role == MessageRole::System && m.content.starts_with("Discovered")));
}

#[tokio::test]
async fn test_move_by_name_to_known_place() {
    setup();
    let mut harness = TestHarness::new();
    harness.act("move", "north").await;

    let outcome = harness.act("go", "village square").await;

    assert_success(&outcome);
    assert_eq!(harness.state.current_location, "Village Square");
}

#[tokio::test]
async fn test_move_by_name_only_follows_connections() {
    setup();
    let mut harness = TestHarness::new();
    harness.act("move", "north").await;
    let middle = harness.state.location_id;
    harness
        .state
        .world_map
        .get_mut(&middle)
        .expect("middle location")
        .name = "Old Mill".to_string();
    harness.act("move", "north").await;
    let far = harness.state.location_id;
    assert_ne!(far, middle);

    let outcome = harness.act("move", "village square").await;
    assert!(!outcome.success);
    assert_eq!(harness.state.location_id, far);

    assert_failure(&harness.act("move", "a").await, "don't know the way");
    assert_eq!(harness.state.location_id, far);

    assert_success(&harness.act("move", "old mill").await);
    assert_eq!(harness.state.location_id, middle);
}

#[tokio::test]
async fn test_search_for_quest() {
    setup();
    let mut harness = TestHarness::low_rolls();
    harness.state.npcs_present = vec!["Old Tom".to_string()];

    let outcome = harness.act("search", "for a quest").await;

    assert_success(&outcome);
    assert_eq!(harness.state.quests.len(), 1);
    assert_eq!(harness.state.quests[0].giver, "Old Tom");
    assert!(outcome
        .effects
        .iter()
        .any(|e| matches!(e, Effect::QuestAdded { .. })));

    harness.state.npcs_present.clear();
    assert_failure(&harness.act("search", "quest").await, "no one here");
}

#[tokio::test]
async fn test_search_finds_and_records() {
    setup();
    let mut harness = TestHarness::low_rolls();
    let items = harness.character.inventory.len();

    let outcome = harness.act("search", "the hay bales").await;

    assert_success(&outcome);
    assert_eq!(harness.character.inventory.len(), items + 1);
    let record = &harness.state.visited_locations[&harness.state.location_id];
    assert_eq!(record.search_results.last().map(|r| r.query.as_str()), Some("the hay bales"));
}

#[tokio::test]
async fn test_talk_builds_familiarity() {
    setup();
    let mut harness = TestHarness::new();
    harness.state.npcs_present = vec!["Mara".to_string()];

    let first = harness.act("talk", "Mara").await;
    assert!(first.message.contains("You introduce yourself to Mara"));
    let second = harness.act("talk", "mara").await;
    assert!(second.message.contains("recognizes you"));

    assert_eq!(harness.state.known_npcs["Mara"].interactions, 2);
    assert_failure(&harness.act("talk", "the king").await, "Who do you want to talk to?");
}

#[tokio::test]
async fn test_equip_and_drink() {
    setup();
    let mut harness = TestHarness::new();
    harness.character.current_hp = 5;

    assert_success(&harness.act("use", "basic sword").await);
    assert!(harness.character.equipped(rpg_core::items::EquipmentSlot::Weapon).is_some());

    let potions = harness
        .character
        .inventory
        .iter()
        .filter(|i| i.name() == "Health Potion")
        .count();
    assert_success(&harness.act("use_item", "health potion").await);
    assert!(harness.character.current_hp > 5);
    let left = harness
        .character
        .inventory
        .iter()
        .filter(|i| i.name() == "Health Potion")
        .count();
    assert_eq!(left, potions - 1);
}

#[tokio::test]
async fn test_custom_pickup_from_scene() {
    setup();
    let mut harness = TestHarness::new();
    harness.state.interactable_elements = vec!["a coil of rope".to_string()];

    let outcome = harness.act("grab", "it").await;

    assert_success(&outcome);
    assert_has_item(&harness, "rope");
}
