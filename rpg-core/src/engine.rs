//! The turn engine: one player action in, one outcome out.
//!
//! [`TurnEngine::process_action`] gates the action (combat, then stamina),
//! charges stamina, dispatches to the handler for the action kind, applies
//! survival costs, and finally asks the narrator (if any) to describe the
//! result. State is written back in place; persisting it is the caller's job.

use crate::actions::{self, Action, ActionOutcome, Effect};
use crate::combat::{skill_in_text, CombatAction, CombatEngine, CombatOutcome, RoundResult};
use crate::dice::{chance_with_rng, AttackProfile};
use crate::items::{self, COMMON_PICKUPS, MAP_ITEMS};
use crate::narration::{NarrationContext, NarrationReply, NarrationRequest, Narrator};
use crate::survival;
use crate::world::{
    Character, Direction, GameState, Location, LocationId, MessageRole, NpcRecord, SearchRecord,
    VisitedLocation,
};
use crate::worldgen;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Message for any non-combat action attempted mid-fight.
pub const COMBAT_GATE_MESSAGE: &str = "You are in combat! You must fight or flee.";

const PICKUP_WORDS: &[&str] = &["pick up", "pickup", "grab", "take", "collect", "gather", "loot"];
const FIGHT_WORDS: &[&str] = &["fight", "ambush", "challenge", "duel", "provoke", "hunt"];
const MAP_WORDS: &[&str] = &["map", "where am i", "coordinates", "navigate", "orient"];

/// Internal failures while resolving an action. Never returned to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Location {0} is missing from the world map")]
    UnknownLocation(LocationId),

    #[error("No active combat session")]
    NotInCombat,
}

/// Tunables for the turn engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ask the narrator to describe outcomes when one is configured.
    pub narration_enabled: bool,
    /// Chance that a revisited location shows new events.
    pub revisit_event_chance: f64,
    /// Chance that searching turns up an item.
    pub search_find_chance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            narration_enabled: true,
            revisit_event_chance: 0.3,
            search_find_chance: 0.3,
        }
    }
}

/// Resolves player actions against a character and game state.
pub struct TurnEngine<R = StdRng> {
    config: EngineConfig,
    narrator: Option<Box<dyn Narrator>>,
    rng: R,
}

impl TurnEngine<StdRng> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reseed for reproducible play.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Default for TurnEngine<StdRng> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<R: Rng> TurnEngine<R> {
    pub fn with_rng(config: EngineConfig, rng: R) -> Self {
        Self {
            config,
            narrator: None,
            rng,
        }
    }

    pub fn with_narrator(mut self, narrator: impl Narrator + 'static) -> Self {
        self.narrator = Some(Box::new(narrator));
        self
    }

    pub fn with_boxed_narrator(mut self, narrator: Box<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn set_narrator(&mut self, narrator: Option<Box<dyn Narrator>>) {
        self.narrator = narrator;
    }

    pub fn has_narrator(&self) -> bool {
        self.narrator.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve one action. Rejections and handler errors come back as
    /// unsuccessful outcomes; this never fails.
    pub async fn process_action(
        &mut self,
        action: &str,
        details: &str,
        character: &mut Character,
        state: &mut GameState,
    ) -> ActionOutcome {
        let action = Action::parse(action);
        let details = details.trim();
        tracing::debug!(action = %action, details, in_combat = state.in_combat(), "processing action");

        if state.in_combat() && !action.allowed_in_combat() {
            let mut outcome = ActionOutcome::failure(COMBAT_GATE_MESSAGE);
            outcome.in_combat = true;
            return outcome;
        }

        let cost = gate_cost(&action, details, state);
        let stamina_before = character.current_stamina;
        if character.current_stamina < cost {
            let mut outcome = ActionOutcome::failure(stamina_message(action.name(), cost, character.current_stamina));
            outcome.in_combat = state.in_combat();
            return outcome;
        }
        character.spend_stamina(cost);

        let mut outcome = match self.dispatch(&action, details, character, state) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(action = %action, error = %e, "action handler failed");
                ActionOutcome::failure("Something went wrong while resolving that action.")
            }
        };
        let spent = (stamina_before - character.current_stamina).max(cost);
        if spent > 0 {
            outcome.effects.insert(
                0,
                Effect::StaminaSpent {
                    amount: spent,
                    remaining: character.current_stamina,
                },
            );
        }

        if outcome.success && !state.in_combat() {
            self.apply_survival(&action, character, &mut outcome);
        }

        state.add_to_summary(action.name(), summary_line(details, &outcome.message));
        outcome.in_combat = state.in_combat();

        if self.config.narration_enabled {
            self.narrate(&action, details, character, state, &mut outcome).await;
        }
        outcome
    }

    fn dispatch(
        &mut self,
        action: &Action,
        details: &str,
        character: &mut Character,
        state: &mut GameState,
    ) -> Result<ActionOutcome, EngineError> {
        match action {
            Action::Move => self.handle_move(details, state),
            Action::Look => Ok(self.handle_look(details, character, state)),
            Action::Talk => Ok(self.handle_talk(details, character, state)),
            Action::Search => Ok(self.handle_search(details, character, state)),
            Action::Attack => self.handle_attack(details, character, state),
            Action::Flee => self.handle_flee(character, state),
            Action::UseItem => self.handle_use_item(details, character, state),
            Action::Rest => Ok(handle_rest(character)),
            Action::Custom(name) => self.handle_custom(name, details, character, state),
        }
    }

    fn apply_survival(&mut self, action: &Action, character: &mut Character, outcome: &mut ActionOutcome) {
        let report = survival::apply(character, survival::cost_of(action));
        for warning in report.warnings {
            outcome.append(&warning);
            outcome.effects.push(Effect::SurvivalWarning { message: warning });
        }
        if report.damage > 0 {
            outcome.effects.push(Effect::HealthChanged {
                amount: -report.damage,
                current: character.current_hp,
                max: character.max_hp,
            });
        }
    }

    // ========================================================================
    // Narration
    // ========================================================================

    async fn narrate(
        &mut self,
        action: &Action,
        details: &str,
        character: &Character,
        state: &mut GameState,
        outcome: &mut ActionOutcome,
    ) {
        let Some(narrator) = self.narrator.as_ref() else {
            return;
        };

        let context = NarrationContext::from_state(character, state, action.name(), details, &outcome.message);
        let request = NarrationRequest::new(&context, &state.messages);

        let reply = match narrator.narrate(&request).await {
            Ok(raw) => NarrationReply::parse(&raw),
            Err(e) => Err(e),
        };

        match reply {
            Ok(reply) => {
                if let Some(detail) = reply.current_detailed_location.filter(|d| !d.trim().is_empty()) {
                    state.detailed_location = Some(detail);
                }
                if let Some(scene) = reply.scene_description_update.filter(|s| !s.trim().is_empty()) {
                    state.scene_description = scene;
                }
                if let Some(elements) = reply.interactable_elements {
                    state.interactable_elements = elements;
                }
                state.facts.extend(reply.new_facts);
                outcome.suggested_roll = reply.suggested_roll;
                outcome.narration = Some(reply.message);
            }
            Err(e) => {
                tracing::warn!(error = %e, prompt_type = ?request.prompt_type, "narration failed, using fallback");
                outcome.narration = Some(request.prompt_type.fallback().to_string());
                outcome.fallback_used = true;
            }
        }

        let said = format!("{} {}", action.name(), details);
        state.add_message(MessageRole::User, said.trim());
        state.add_message(MessageRole::Assistant, outcome.text().to_string());
    }

    // ========================================================================
    // Movement
    // ========================================================================

    fn handle_move(&mut self, details: &str, state: &mut GameState) -> Result<ActionOutcome, EngineError> {
        if details.is_empty() {
            return Ok(ActionOutcome::failure(
                "Where do you want to go? Name a direction or a place you know.",
            ));
        }

        let current = ensure_current_location(state);
        let (target, direction, discovered) = match Direction::from_text(details) {
            Some(direction) => {
                if let Some(id) = current.connections.get(&direction) {
                    (*id, Some(direction), false)
                } else if let Some(id) = state.location_at(current.coordinates.offset(direction)).map(|l| l.id) {
                    state.connect(current.id, direction, id);
                    (id, Some(direction), false)
                } else {
                    let location = worldgen::generate_adjacent(&current, direction, &mut self.rng);
                    let id = location.id;
                    state.discover_location(location);
                    state.connect(current.id, direction, id);
                    (id, Some(direction), true)
                }
            }
            None => match find_named_location(state, &current, details) {
                Some(id) => {
                    let direction = state
                        .world_map
                        .get(&id)
                        .and_then(|l| Direction::between(&current.coordinates, &l.coordinates));
                    (id, direction, false)
                }
                None => {
                    return Ok(ActionOutcome::failure(format!(
                        "You don't know the way to '{details}'. Try a direction such as north or east."
                    )))
                }
            },
        };

        let first_visit = self.enter_location(state, target)?;

        let mut outcome = match direction {
            Some(direction) => ActionOutcome::success(format!(
                "You travel {direction} to {}.",
                state.current_location
            )),
            None => ActionOutcome::success(format!("You travel to {}.", state.current_location)),
        };
        outcome.append(&state.scene_description);
        if !state.npcs_present.is_empty() {
            outcome.append(format!("You see {} here.", state.npcs_present.join(" and ")));
        }
        if !first_visit {
            outcome.append("You have been here before.");
        }

        Ok(outcome.with_effect(Effect::Moved {
            from: current.name,
            to: state.current_location.clone(),
            direction,
            discovered,
        }))
    }

    /// Arrive at `id`, refreshing the scene. Returns whether this is the
    /// first visit.
    fn enter_location(&mut self, state: &mut GameState, id: LocationId) -> Result<bool, EngineError> {
        let first_visit = !state.visited_locations.contains_key(&id);
        let refresh_events = !first_visit && chance_with_rng(self.config.revisit_event_chance, &mut self.rng);

        let location = state
            .world_map
            .get_mut(&id)
            .ok_or(EngineError::UnknownLocation(id))?;
        if refresh_events {
            location.events = worldgen::generate_events(&location.kind, &mut self.rng);
        }
        location.visited = true;
        let location = location.clone();

        let record = state
            .visited_locations
            .entry(id)
            .or_insert_with(|| VisitedLocation {
                name: location.name.clone(),
                description: location.description.clone(),
                ..Default::default()
            });
        record.visits += 1;
        record.npcs_seen = location.npcs.clone();
        record.events_seen = location.events.clone();
        let description = if record.description.is_empty() {
            location.description.clone()
        } else {
            record.description.clone()
        };

        state.location_id = id;
        state.current_location = location.name;
        state.coordinates = location.coordinates;
        state.scene_description = description;
        state.npcs_present = location.npcs;
        state.events = location.events;
        state.detailed_location = None;
        state.interactable_elements.clear();
        Ok(first_visit)
    }

    // ========================================================================
    // Observation and talk
    // ========================================================================

    fn handle_look(&mut self, details: &str, character: &Character, state: &mut GameState) -> ActionOutcome {
        if let Some(npc) = state.present_npc(details).map(str::to_string) {
            let profile = self.npc_profile(&npc, character.level, state);
            let mut outcome = ActionOutcome::success(describe_npc(&profile));
            outcome.append(disposition(profile.relationship));
            return outcome;
        }

        let mut outcome = ActionOutcome::success(format!("{}.", state.current_location));
        if let Some(detail) = &state.detailed_location {
            outcome.append(format!("You stand at {detail}."));
        }
        outcome.append(&state.scene_description);
        if !state.npcs_present.is_empty() {
            outcome.append(format!("People here: {}.", state.npcs_present.join(", ")));
        }
        if !state.events.is_empty() {
            outcome.append(format!("{}.", state.events.join(". ")));
        }
        if !state.interactable_elements.is_empty() {
            outcome.append(format!("You notice: {}.", state.interactable_elements.join(", ")));
        }
        if let Some(location) = state.current_location_data() {
            let exits: Vec<String> = location
                .connections
                .iter()
                .filter_map(|(direction, id)| {
                    state
                        .world_map
                        .get(id)
                        .map(|l| format!("{direction} ({})", l.name))
                })
                .collect();
            if !exits.is_empty() {
                outcome.append(format!("Exits: {}.", exits.join(", ")));
            }
        }
        outcome
    }

    /// The remembered profile for `npc`, generating one on first need.
    fn npc_profile(&mut self, npc: &str, level: u32, state: &mut GameState) -> NpcRecord {
        let kind = state
            .current_location_data()
            .map(|l| l.kind.clone())
            .unwrap_or_default();
        let rng = &mut self.rng;
        let record = state
            .known_npcs
            .entry(npc.to_string())
            .or_insert_with(|| NpcRecord {
                name: npc.to_string(),
                ..Default::default()
            });
        if record.profession.is_empty() {
            let generated = worldgen::generate_npc_profile(npc, &kind, level, rng);
            *record = NpcRecord {
                interactions: record.interactions,
                relationship: record.relationship,
                ..generated
            };
        }
        record.clone()
    }

    fn handle_talk(&mut self, details: &str, character: &Character, state: &mut GameState) -> ActionOutcome {
        let Some(npc) = state.present_npc(details).map(str::to_string) else {
            return if state.npcs_present.is_empty() {
                ActionOutcome::failure("There is no one here to talk to.")
            } else {
                ActionOutcome::failure(format!(
                    "Who do you want to talk to? You see {}.",
                    state.npcs_present.join(", ")
                ))
            };
        };

        self.npc_profile(&npc, character.level, state);
        state.update_npc_relationship(&npc, 1);
        let Some(record) = state.known_npcs.get_mut(&npc) else {
            return ActionOutcome::failure(format!("{npc} doesn't seem to hear you."));
        };
        record.interactions += 1;

        let mut outcome = match record.interactions {
            1 => ActionOutcome::success(format!(
                "You introduce yourself to {npc}, the {}. They seem {}.",
                record.profession.to_lowercase(),
                record.personality
            )),
            2..=3 => ActionOutcome::success(format!("{npc} recognizes you and nods in greeting.")),
            _ => ActionOutcome::success(format!("{npc} greets you like an old friend.")),
        };
        if record.interactions > 1 {
            if let Some(hook) = record.quest_hooks.first() {
                outcome.append(format!("They lower their voice: {hook}."));
            }
        }
        outcome
    }

    // ========================================================================
    // Searching
    // ========================================================================

    fn handle_search(&mut self, details: &str, character: &mut Character, state: &mut GameState) -> ActionOutcome {
        if details.to_lowercase().contains("quest") {
            let Some(giver) = state.npcs_present.choose(&mut self.rng).cloned() else {
                return ActionOutcome::failure("There is no one here who might need your help.");
            };
            let quest = worldgen::generate_quest(&giver, &state.current_location, character.level, &mut self.rng);
            let mut outcome = ActionOutcome::success(format!(
                "{giver} asks for your help: {}. {}",
                quest.name, quest.description
            ));
            outcome.append(format!("Reward: {} gold.", quest.reward));
            let outcome = outcome.with_effect(Effect::QuestAdded {
                name: quest.name.clone(),
                giver: giver.clone(),
            });
            tracing::info!(quest = %quest.name, giver = %giver, "quest added");
            state.quests.push(quest);
            return outcome;
        }

        let target = if details.is_empty() { "the area" } else { details };
        let outcome = if chance_with_rng(self.config.search_find_chance, &mut self.rng) {
            let item = worldgen::random_found_item(&mut self.rng);
            character.add_item(item.clone());
            ActionOutcome::success(format!("You search {target} and find a {item}!"))
                .with_effect(Effect::ItemAdded { item })
        } else {
            ActionOutcome::success(format!("You search {target} but find nothing of interest."))
        };

        let location_id = state.location_id;
        let name = state.current_location.clone();
        state
            .visited_locations
            .entry(location_id)
            .or_insert_with(|| VisitedLocation {
                name,
                visits: 1,
                ..Default::default()
            })
            .search_results
            .push(SearchRecord {
                query: target.to_string(),
                result: outcome.message.clone(),
            });
        outcome
    }

    // ========================================================================
    // Combat
    // ========================================================================

    fn handle_attack(
        &mut self,
        details: &str,
        character: &mut Character,
        state: &mut GameState,
    ) -> Result<ActionOutcome, EngineError> {
        if state.in_combat() {
            let action = self.combat_action(details, state)?;
            return self.combat_round(character, state, action);
        }
        if details.is_empty() {
            return Ok(ActionOutcome::failure("There is nothing to attack."));
        }
        Ok(self.start_combat(details, character, state))
    }

    /// Interpret attack details as a combat action.
    fn combat_action(&self, details: &str, state: &GameState) -> Result<CombatAction, EngineError> {
        let session = state.combat.as_ref().ok_or(EngineError::NotInCombat)?;
        let first_living = || {
            session
                .first_living()
                .map(|i| session.enemies[i].name.clone())
                .unwrap_or_default()
        };

        if let Some(skill) = skill_in_text(details) {
            let rest = details
                .to_lowercase()
                .replace(skill.id, "")
                .replace(&skill.name.to_lowercase(), "");
            let rest = rest.trim();
            return Ok(CombatAction::Skill {
                skill: skill.id.to_string(),
                target: (!rest.is_empty()).then(|| rest.to_string()),
            });
        }

        let profile = AttackProfile::from_text(details);
        let stripped: Vec<&str> = details
            .split_whitespace()
            .filter(|w| !["heavy", "power", "light", "quick", "attack", "the", "a", "at"].contains(&w.to_lowercase().as_str()))
            .collect();
        let target = if stripped.is_empty() {
            first_living()
        } else {
            details.to_string()
        };
        Ok(CombatAction::Attack { target, profile })
    }

    fn start_combat(&mut self, details: &str, character: &Character, state: &mut GameState) -> ActionOutcome {
        let enemy = match state.present_npc(details).map(str::to_string) {
            Some(npc) => {
                let profile = self.npc_profile(&npc, character.level, state);
                state.update_npc_relationship(&npc, -50);
                state.npcs_present.retain(|n| n != &npc);
                let location_id = state.location_id;
                if let Some(location) = state.world_map.get_mut(&location_id) {
                    location.npcs.retain(|n| n != &npc);
                }
                worldgen::enemy_from_npc(&profile, character.level)
            }
            None => {
                let kind = state
                    .current_location_data()
                    .map(|l| l.kind.clone())
                    .unwrap_or_default();
                worldgen::random_enemy(&kind, character.level, &mut self.rng)
            }
        };

        let names = vec![enemy.name.clone()];
        let description = enemy.description.clone();
        let session = CombatEngine::new(&mut self.rng).initiate(character, vec![enemy]);
        let mut outcome = ActionOutcome::success(session.log.join(" "));
        outcome.append(&description);
        state.combat = Some(session);
        outcome.with_effect(Effect::CombatStarted { enemies: names })
    }

    fn combat_round(
        &mut self,
        character: &mut Character,
        state: &mut GameState,
        action: CombatAction,
    ) -> Result<ActionOutcome, EngineError> {
        let session = state.combat.as_mut().ok_or(EngineError::NotInCombat)?;
        let result = CombatEngine::new(&mut self.rng).resolve_round(character, session, action);
        Ok(conclude_round(result, character, state))
    }

    fn handle_flee(&mut self, character: &mut Character, state: &mut GameState) -> Result<ActionOutcome, EngineError> {
        let Some(session) = state.combat.as_mut() else {
            return Ok(ActionOutcome::failure("You are not in combat."));
        };
        let result = CombatEngine::new(&mut self.rng).flee(character, session);
        Ok(conclude_round(result, character, state))
    }

    fn handle_use_item(
        &mut self,
        details: &str,
        character: &mut Character,
        state: &mut GameState,
    ) -> Result<ActionOutcome, EngineError> {
        if state.in_combat() {
            return self.combat_round(
                character,
                state,
                CombatAction::Item {
                    item: details.to_string(),
                },
            );
        }
        Ok(actions::use_item(character, details))
    }

    // ========================================================================
    // Custom actions
    // ========================================================================

    fn handle_custom(
        &mut self,
        name: &str,
        details: &str,
        character: &mut Character,
        state: &mut GameState,
    ) -> Result<ActionOutcome, EngineError> {
        let text = format!("{name} {details}").to_lowercase();

        if PICKUP_WORDS.iter().any(|w| text.contains(w)) {
            return Ok(pick_up(details, character, state));
        }

        if FIGHT_WORDS.iter().any(|w| text.contains(w)) {
            let cost = Action::Attack.stamina_cost();
            if !character.spend_stamina(cost) {
                return Ok(ActionOutcome::failure(stamina_message(
                    "attack",
                    cost,
                    character.current_stamina,
                )));
            }
            let target = if details.is_empty() { name } else { details };
            return Ok(self.start_combat(target, character, state));
        }

        if MAP_WORDS.iter().any(|w| text.contains(w)) {
            return Ok(read_map(character, state));
        }

        let line = format!("You {} {}", name, details);
        Ok(ActionOutcome::success(format!("{}.", line.trim_end())))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn stamina_message(action: &str, cost: i32, current: i32) -> String {
    format!("Not enough stamina to {action}. You need {cost} stamina (you have {current}).")
}

fn summary_line(details: &str, message: &str) -> String {
    if details.is_empty() {
        message.to_string()
    } else {
        format!("{details}: {message}")
    }
}

/// Stamina taken at the gate. A combat skill is paid for by the skill
/// itself, so naming one skips the attack charge.
fn gate_cost(action: &Action, details: &str, state: &GameState) -> i32 {
    if *action == Action::Attack && state.in_combat() && skill_in_text(details).is_some() {
        return 0;
    }
    action.stamina_cost()
}

fn handle_rest(character: &mut Character) -> ActionOutcome {
    let stamina = character.restore_stamina(character.max_stamina);
    let healed = character.heal((character.max_hp / 4).max(1));
    ActionOutcome::success(format!(
        "You rest for a while, recovering {healed} health and {stamina} stamina."
    ))
    .with_effect(Effect::StaminaRestored {
        amount: stamina,
        current: character.current_stamina,
    })
    .with_effect(Effect::HealthChanged {
        amount: healed,
        current: character.current_hp,
        max: character.max_hp,
    })
}

/// The current location, recreated from the state's own fields if the map
/// lost it.
fn ensure_current_location(state: &mut GameState) -> Location {
    if let Some(location) = state.current_location_data() {
        return location.clone();
    }
    tracing::warn!(location = %state.current_location, "current location missing from map, rebuilding");
    let mut location = Location::new(state.current_location.clone(), "wilderness", state.coordinates)
        .with_description(state.scene_description.clone())
        .with_npcs(state.npcs_present.clone());
    location.id = state.location_id;
    location.visited = true;
    state.world_map.insert(location.id, location.clone());
    location
}

/// A neighbouring location answering to `query`. Exact names win over
/// partial ones.
fn find_named_location(state: &GameState, current: &Location, query: &str) -> Option<LocationId> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    let neighbours: Vec<&Location> = current
        .connections
        .values()
        .filter_map(|id| state.world_map.get(id))
        .filter(|l| l.id != current.id)
        .collect();

    let exact = neighbours.iter().find(|l| l.name.to_lowercase() == query);
    let partial = || {
        neighbours.iter().find(|l| {
            let name = l.name.to_lowercase();
            query.contains(&name) || (query.len() >= 3 && name.contains(&query))
        })
    };
    exact.or_else(partial).map(|l| l.id)
}

fn describe_npc(profile: &NpcRecord) -> String {
    format!(
        "{} is a {} {}, {}.",
        profile.name,
        profile.race.to_lowercase(),
        profile.profession.to_lowercase(),
        profile.personality
    )
}

fn disposition(relationship: i32) -> &'static str {
    match relationship {
        i32::MIN..=-50 => "They glare at you with open hostility.",
        -49..=-1 => "They eye you warily.",
        0..=19 => "They pay you little attention.",
        20..=59 => "They seem glad to see you.",
        _ => "They regard you as a trusted friend.",
    }
}

/// Apply a finished round to the state: clear the session when the fight
/// is over and pick the character back up after a defeat.
fn conclude_round(result: RoundResult, character: &mut Character, state: &mut GameState) -> ActionOutcome {
    let mut outcome = if result.success {
        ActionOutcome::success(result.message())
    } else {
        ActionOutcome::failure(result.message())
    }
    .with_effects(result.effects);

    match result.outcome {
        CombatOutcome::Ongoing => {
            if let Some(session) = &state.combat {
                let standing: Vec<String> = session
                    .living_enemies()
                    .map(|(_, e)| format!("{} {}/{}", e.name, e.current_hp, e.max_hp))
                    .collect();
                if result.success {
                    outcome.append(format!(
                        "Round {}. You have {}/{} health. Enemies: {}.",
                        session.round,
                        character.current_hp,
                        character.max_hp,
                        standing.join(", ")
                    ));
                }
            }
        }
        CombatOutcome::Victory | CombatOutcome::Fled => {
            state.combat = None;
        }
        CombatOutcome::Defeat => {
            state.combat = None;
            character.current_hp = 1;
            character.status_effects.clear();
            outcome.append("You were defeated!");
            outcome.append("You come to some time later, battered but alive, with 1 health.");
        }
    }
    outcome
}

fn pick_up(details: &str, character: &mut Character, state: &GameState) -> ActionOutcome {
    let find_word = |text: &str| {
        let lower = text.to_lowercase();
        COMMON_PICKUPS.iter().find(|w| lower.contains(*w)).copied()
    };

    let word = find_word(details).or_else(|| {
        let scene = format!("{} {}", state.scene_description, state.interactable_elements.join(" "));
        find_word(&scene)
    });
    let Some(word) = word else {
        return ActionOutcome::failure("There is nothing here you can pick up.");
    };

    let name = items::CATALOG
        .iter()
        .find(|item| item.name.to_lowercase().contains(word))
        .map(|item| item.name.clone())
        .unwrap_or_else(|| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect())
                .unwrap_or_default()
        });

    character.add_item(name.clone());
    ActionOutcome::success(format!("You pick up the {name}.")).with_effect(Effect::ItemAdded { item: name })
}

fn read_map(character: &Character, state: &GameState) -> ActionOutcome {
    if !character.has_any_item(MAP_ITEMS) {
        return ActionOutcome::failure("You have nothing to get your bearings with.");
    }
    let mut outcome = ActionOutcome::success(format!(
        "You are at {} {}.",
        state.current_location, state.coordinates
    ));
    let mut nearby: Vec<(f64, String)> = state
        .world_map
        .values()
        .filter(|l| l.id != state.location_id)
        .map(|l| (state.coordinates.distance(&l.coordinates), l))
        .filter(|(distance, _)| *distance <= 3.0)
        .map(|(distance, l)| {
            let direction = Direction::between(&state.coordinates, &l.coordinates)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "here".to_string());
            (distance, format!("{} ({direction}, {distance:.1} away)", l.name))
        })
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
    if nearby.is_empty() {
        outcome.append("No other known places are nearby.");
    } else {
        let names: Vec<String> = nearby.into_iter().map(|(_, line)| line).collect();
        outcome.append(format!("Nearby: {}.", names.join(", ")));
    }
    outcome
}
