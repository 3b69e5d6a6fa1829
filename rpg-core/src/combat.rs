//! Turn-based combat between the character and a group of enemies.
//!
//! An encounter runs Start -> (player action -> enemy actions)* and ends in
//! victory, defeat or a successful flight. [`CombatEngine`] performs the
//! transitions; the state between them lives in a [`CombatSession`] stored on
//! the game state.
//!
//! Basic attacks are a d20 plus the attacker's accuracy against the
//! defender's evasion. A natural 1 always misses and a natural 20 always hits
//! for double base damage.

use crate::actions::Effect;
use crate::dice::{
    chance_with_rng, d20_with_rng, damage_after_defense, resolve_attack_with_rng, roll_with_rng,
    AttackProfile, CombatStats,
};
use crate::world::{
    Character, CombatSession, CombatantRef, Enemy, InitiativeEntry, StatusEffect, StatusKind,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const FLEE_BASE_CHANCE: f64 = 0.45;
const FLEE_STEP: f64 = 0.05;
const FLEE_MIN: f64 = 0.1;
const FLEE_MAX: f64 = 0.9;

// ============================================================================
// Skills
// ============================================================================

/// What a combat skill does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillEffect {
    /// A basic attack with extra base damage.
    BonusDamage(i32),
    /// Automatic hit for fixed damage.
    FlatDamage(i32),
    /// A basic attack that poisons on hit.
    Poison { duration: u32, strength: i32 },
    /// Heal the user.
    Heal(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skill {
    pub id: &'static str,
    pub name: &'static str,
    pub stamina_cost: i32,
    pub effect: SkillEffect,
}

pub const SKILLS: &[Skill] = &[
    Skill {
        id: "power_strike",
        name: "Power Strike",
        stamina_cost: 4,
        effect: SkillEffect::BonusDamage(5),
    },
    Skill {
        id: "bash",
        name: "Bash",
        stamina_cost: 3,
        effect: SkillEffect::FlatDamage(10),
    },
    Skill {
        id: "poison_strike",
        name: "Poison Strike",
        stamina_cost: 3,
        effect: SkillEffect::Poison {
            duration: 3,
            strength: 2,
        },
    },
    Skill {
        id: "second_wind",
        name: "Second Wind",
        stamina_cost: 4,
        effect: SkillEffect::Heal(10),
    },
];

/// Look up a skill by id ("power_strike") or name ("power strike").
pub fn find_skill(query: &str) -> Option<&'static Skill> {
    let normalized = query.trim().to_lowercase().replace(' ', "_");
    SKILLS.iter().find(|s| s.id == normalized)
}

/// Find a skill mentioned anywhere in free text.
pub fn skill_in_text(text: &str) -> Option<&'static Skill> {
    let normalized = text.to_lowercase().replace(' ', "_");
    SKILLS.iter().find(|s| normalized.contains(s.id))
}

// ============================================================================
// Actions and results
// ============================================================================

/// The player's move in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatAction {
    Attack { target: String, profile: AttackProfile },
    Skill { skill: String, target: Option<String> },
    Item { item: String },
}

/// Where the encounter stands after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatOutcome {
    Ongoing,
    Victory,
    Defeat,
    Fled,
}

impl CombatOutcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, CombatOutcome::Ongoing)
    }
}

/// What the character earned from a won encounter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub experience: u32,
    pub gold: u32,
    pub loot: Vec<String>,
    pub levels_gained: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct RoundResult {
    /// False when the player's action was rejected; nothing changed then.
    pub success: bool,
    pub outcome: CombatOutcome,
    /// Lines produced this round, also appended to the session log.
    pub log: Vec<String>,
    pub rewards: Option<Rewards>,
    pub effects: Vec<Effect>,
}

impl RoundResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome: CombatOutcome::Ongoing,
            log: vec![message.into()],
            rewards: None,
            effects: Vec::new(),
        }
    }

    pub fn message(&self) -> String {
        self.log.join(" ")
    }
}

/// One basic attack, before defense is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub hit: bool,
    pub critical: bool,
    pub natural: i32,
    /// d20 plus accuracy.
    pub total: i32,
    /// Base damage after any critical doubling; 0 on a miss.
    pub raw: i32,
}

// ============================================================================
// Engine
// ============================================================================

/// Runs encounters with an injected random source.
pub struct CombatEngine<R: Rng> {
    rng: R,
}

impl<R: Rng> CombatEngine<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Start an encounter: roll initiative and open the log.
    pub fn initiate(&mut self, character: &Character, enemies: Vec<Enemy>) -> CombatSession {
        let mut turn_order = Vec::with_capacity(enemies.len() + 1);
        turn_order.push(InitiativeEntry {
            combatant: CombatantRef::Player,
            name: character.name.clone(),
            roll: d20_with_rng(&mut self.rng).total + character.initiative_modifier(),
        });
        for (i, enemy) in enemies.iter().enumerate() {
            turn_order.push(InitiativeEntry {
                combatant: CombatantRef::Enemy(i),
                name: enemy.name.clone(),
                roll: d20_with_rng(&mut self.rng).total + enemy.initiative_modifier(),
            });
        }
        // Stable, so ties keep insertion order with the player first.
        turn_order.sort_by(|a, b| b.roll.cmp(&a.roll));

        let opening = match enemies.as_slice() {
            [single] => format!("Combat begins! You face a {}.", single.name),
            many => format!(
                "Combat begins! You face {}.",
                many.iter().map(|e| e.name.as_str()).collect::<Vec<_>>().join(", ")
            ),
        };

        tracing::info!(
            character = %character.name,
            enemies = ?enemies.iter().map(|e| &e.name).collect::<Vec<_>>(),
            "combat started"
        );

        CombatSession {
            enemies,
            round: 1,
            log: vec![opening],
            turn_order,
            rewards_paid: false,
        }
    }

    /// Basic d20 attack against `defender`'s evasion with `base_damage` on a hit.
    pub fn strike(&mut self, attacker: &CombatStats, defender: &CombatStats, base_damage: i32) -> Strike {
        let roll = d20_with_rng(&mut self.rng);
        let natural = roll.total;
        let total = natural + attacker.accuracy;
        let critical = roll.is_natural_20();
        let hit = !roll.is_natural_1() && (critical || total >= defender.evasion);
        let raw = match (hit, critical) {
            (false, _) => 0,
            (true, true) => base_damage * 2,
            (true, false) => base_damage,
        };
        tracing::debug!(natural, total, evasion = defender.evasion, hit, critical, raw, "strike");
        Strike {
            hit,
            critical,
            natural,
            total,
            raw,
        }
    }

    /// Character base damage: d6 plus power.
    fn character_base_damage(&mut self, stats: &CombatStats) -> i32 {
        roll_with_rng(1, 6, stats.power, &mut self.rng).total.max(1)
    }

    fn enemy_base_damage(&mut self, enemy: &Enemy) -> i32 {
        let (low, high) = enemy.attack_damage;
        self.rng.gen_range(low..=high.max(low)).max(1)
    }

    /// Resolve one full round: the player's action, enemy responses, status
    /// ticks and the terminal check.
    pub fn resolve_round(
        &mut self,
        character: &mut Character,
        session: &mut CombatSession,
        action: CombatAction,
    ) -> RoundResult {
        if session.all_enemies_defeated() {
            return self.finish_victory(character, session, Vec::new(), Vec::new());
        }

        let mut log = Vec::new();
        let mut effects = Vec::new();

        let accepted = match action {
            CombatAction::Attack { target, profile } => {
                self.player_attack(character, session, &target, profile, &mut log)
            }
            CombatAction::Skill { skill, target } => {
                self.player_skill(character, session, &skill, target.as_deref(), &mut log)
            }
            CombatAction::Item { item } => {
                let used = crate::actions::use_item(character, &item);
                log.push(used.message.clone());
                effects.extend(used.effects);
                used.success
            }
        };
        if !accepted {
            return RoundResult::rejected(log.join(" "));
        }

        self.enemy_turns(character, session, &mut log, &mut effects);
        tick_character(character, &mut log);
        for enemy in session.enemies.iter_mut().filter(|e| !e.is_defeated()) {
            tick_enemy(enemy, &mut log);
        }

        if character.is_defeated() {
            return self.finish(session, CombatOutcome::Defeat, log, effects);
        }
        if session.all_enemies_defeated() {
            return self.finish_victory(character, session, log, effects);
        }
        session.round += 1;
        self.finish(session, CombatOutcome::Ongoing, log, effects)
    }

    /// Try to escape. On failure every living enemy gets a free attack.
    pub fn flee(&mut self, character: &mut Character, session: &mut CombatSession) -> RoundResult {
        let chance = flee_chance(character, session);
        let mut log = Vec::new();
        let mut effects = Vec::new();

        if chance_with_rng(chance, &mut self.rng) {
            log.push("You escape from combat!".to_string());
            tracing::info!(character = %character.name, "fled combat");
            return self.finish(session, CombatOutcome::Fled, log, effects);
        }

        log.push("You try to flee but fail!".to_string());
        self.enemy_turns(character, session, &mut log, &mut effects);
        if character.is_defeated() {
            return self.finish(session, CombatOutcome::Defeat, log, effects);
        }
        session.round += 1;
        self.finish(session, CombatOutcome::Ongoing, log, effects)
    }

    fn player_attack(
        &mut self,
        character: &Character,
        session: &mut CombatSession,
        target: &str,
        profile: AttackProfile,
        log: &mut Vec<String>,
    ) -> bool {
        let Some(index) = session.find_target(target) else {
            log.push(invalid_target(target));
            return false;
        };
        let stats = character.combat_stats();
        let enemy = &mut session.enemies[index];

        match profile {
            AttackProfile::Basic => {
                let base = self.character_base_damage(&stats);
                let strike = self.strike(&stats, &enemy.combat_stats(), base);
                log.push(describe_player_strike(&strike, enemy));
            }
            AttackProfile::Light | AttackProfile::Heavy => {
                let roll = resolve_attack_with_rng(&stats, &enemy.combat_stats(), profile, &mut self.rng);
                if roll.hit {
                    enemy.lose_health(roll.damage);
                    log.push(format!(
                        "Your {} attack hits the {} for {} damage.",
                        profile.name(),
                        enemy.name,
                        roll.damage
                    ));
                } else {
                    log.push(format!("Your {} attack misses the {}.", profile.name(), enemy.name));
                }
            }
        }
        if enemy.is_defeated() {
            log.push(format!("The {} is defeated!", enemy.name));
        }
        true
    }

    fn player_skill(
        &mut self,
        character: &mut Character,
        session: &mut CombatSession,
        skill: &str,
        target: Option<&str>,
        log: &mut Vec<String>,
    ) -> bool {
        let Some(skill) = find_skill(skill) else {
            log.push(format!("You don't know how to '{skill}'."));
            return false;
        };
        if !character.knows_skill(skill.id) {
            log.push(format!("You haven't learned {}.", skill.name));
            return false;
        }
        if character.current_stamina < skill.stamina_cost {
            log.push(format!(
                "Not enough stamina for {}. You need {} stamina (you have {}).",
                skill.name, skill.stamina_cost, character.current_stamina
            ));
            return false;
        }

        if let SkillEffect::Heal(amount) = skill.effect {
            character.spend_stamina(skill.stamina_cost);
            let healed = character.heal(amount);
            log.push(format!("You use {} and recover {healed} health.", skill.name));
            return true;
        }

        let index = match target {
            Some(t) if !t.trim().is_empty() => session.find_target(t),
            _ => session.first_living(),
        };
        let Some(index) = index else {
            log.push(invalid_target(target.unwrap_or_default()));
            return false;
        };
        character.spend_stamina(skill.stamina_cost);

        let stats = character.combat_stats();
        let enemy = &mut session.enemies[index];
        match skill.effect {
            SkillEffect::BonusDamage(bonus) => {
                let base = self.character_base_damage(&stats) + bonus;
                let strike = self.strike(&stats, &enemy.combat_stats(), base);
                log.push(format!("You use {}.", skill.name));
                log.push(describe_player_strike(&strike, enemy));
            }
            SkillEffect::FlatDamage(amount) => {
                let dealt = enemy.take_damage(amount);
                log.push(format!("You {} the {} for {dealt} damage.", skill.name.to_lowercase(), enemy.name));
            }
            SkillEffect::Poison { duration, strength } => {
                let base = self.character_base_damage(&stats);
                let strike = self.strike(&stats, &enemy.combat_stats(), base);
                log.push(format!("You use {}.", skill.name));
                log.push(describe_player_strike(&strike, enemy));
                if strike.hit && !enemy.is_defeated() {
                    enemy.status_effects.push(StatusEffect::poison(duration, strength));
                    log.push(format!("The {} is poisoned!", enemy.name));
                }
            }
            SkillEffect::Heal(_) => {}
        }
        if enemy.is_defeated() {
            log.push(format!("The {} is defeated!", enemy.name));
        }
        true
    }

    /// Every living, unstunned enemy attacks in initiative order.
    fn enemy_turns(
        &mut self,
        character: &mut Character,
        session: &mut CombatSession,
        log: &mut Vec<String>,
        effects: &mut Vec<Effect>,
    ) {
        let defense = character.combat_stats();
        for index in session.enemy_order() {
            if character.is_defeated() {
                break;
            }
            let enemy = &session.enemies[index];
            if enemy.is_defeated() {
                continue;
            }
            if enemy.status_effects.iter().any(|s| s.kind == StatusKind::Stunned) {
                log.push(format!("The {} is stunned and cannot attack.", enemy.name));
                continue;
            }

            let base = self.enemy_base_damage(enemy);
            let strike = self.strike(&enemy.combat_stats(), &defense, base);
            let enemy = &session.enemies[index];
            if !strike.hit {
                log.push(format!("You dodge the {}'s attack.", enemy.name));
                continue;
            }
            let lost = character.lose_health(damage_after_defense(strike.raw, defense.defense));
            let tag = if strike.critical { " (critical)" } else { "" };
            log.push(format!("The {} hits you for {lost} damage{tag}.", enemy.name));
            effects.push(Effect::HealthChanged {
                amount: -lost,
                current: character.current_hp,
                max: character.max_hp,
            });
        }
    }

    fn finish(
        &mut self,
        session: &mut CombatSession,
        outcome: CombatOutcome,
        log: Vec<String>,
        mut effects: Vec<Effect>,
    ) -> RoundResult {
        session.log.extend(log.iter().cloned());
        if outcome.is_over() {
            effects.push(Effect::CombatEnded { outcome });
            tracing::info!(?outcome, rounds = session.round, "combat ended");
        }
        RoundResult {
            success: true,
            outcome,
            log,
            rewards: None,
            effects,
        }
    }

    fn finish_victory(
        &mut self,
        character: &mut Character,
        session: &mut CombatSession,
        mut log: Vec<String>,
        mut effects: Vec<Effect>,
    ) -> RoundResult {
        log.push("Victory! All enemies have been defeated.".to_string());
        let rewards = if session.rewards_paid {
            None
        } else {
            let rewards = self.pay_rewards(character, session);
            log.push(describe_rewards(&rewards));
            effects.extend(reward_effects(character, &rewards));
            Some(rewards)
        };
        let mut result = self.finish(session, CombatOutcome::Victory, log, effects);
        result.rewards = rewards;
        result
    }

    /// Pay experience, gold and loot for every defeated enemy. Idempotent.
    pub fn pay_rewards(&mut self, character: &mut Character, session: &mut CombatSession) -> Rewards {
        let mut rewards = Rewards::default();
        if session.rewards_paid {
            return rewards;
        }
        for enemy in session.enemies.iter().filter(|e| e.is_defeated()) {
            rewards.experience += enemy.experience_reward;
            let (low, high) = enemy.gold_reward;
            rewards.gold += self.rng.gen_range(low..=high.max(low));

            let loot_chance = (0.3 + 0.1 * enemy.level as f64).min(0.8);
            if !enemy.loot_table.is_empty() && chance_with_rng(loot_chance, &mut self.rng) {
                if let Some(item) = enemy.loot_table.choose(&mut self.rng) {
                    rewards.loot.push(item.clone());
                }
            }
        }

        character.gold = character.gold.saturating_add(rewards.gold);
        for item in &rewards.loot {
            character.add_item(item.clone());
        }
        rewards.levels_gained = character.gain_experience(rewards.experience);
        session.rewards_paid = true;

        tracing::info!(
            experience = rewards.experience,
            gold = rewards.gold,
            loot = ?rewards.loot,
            "combat rewards paid"
        );
        rewards
    }
}

/// Escape probability for the current encounter.
pub fn flee_chance(character: &Character, session: &CombatSession) -> f64 {
    let dex = character.modifier(crate::world::Attribute::Dexterity) as f64;
    let strongest = session.highest_enemy_level() as f64;
    (FLEE_BASE_CHANCE + FLEE_STEP * (dex - strongest)).clamp(FLEE_MIN, FLEE_MAX)
}

fn invalid_target(target: &str) -> String {
    if target.trim().is_empty() {
        "You need to choose a target.".to_string()
    } else {
        format!("There is no '{}' to attack.", target.trim())
    }
}

fn describe_player_strike(strike: &Strike, enemy: &mut Enemy) -> String {
    if !strike.hit {
        return if strike.natural == 1 {
            format!("The {} dodges your attack.", enemy.name)
        } else {
            format!("You miss the {}.", enemy.name)
        };
    }
    let dealt = enemy.take_damage(strike.raw);
    let tag = if strike.critical { " (critical)" } else { "" };
    format!("You hit the {} for {dealt} damage{tag}.", enemy.name)
}

fn describe_rewards(rewards: &Rewards) -> String {
    let mut line = format!("You gain {} experience and {} gold.", rewards.experience, rewards.gold);
    if !rewards.loot.is_empty() {
        line.push_str(&format!(" You find: {}.", rewards.loot.join(", ")));
    }
    for level in &rewards.levels_gained {
        line.push_str(&format!(" You reached level {level}!"));
    }
    line
}

fn reward_effects(character: &Character, rewards: &Rewards) -> Vec<Effect> {
    let mut effects = vec![
        Effect::ExperienceGained {
            amount: rewards.experience,
            total: character.experience,
        },
        Effect::GoldChanged {
            amount: rewards.gold as i32,
            total: character.gold,
        },
    ];
    effects.extend(rewards.loot.iter().map(|item| Effect::ItemAdded { item: item.clone() }));
    effects.extend(
        rewards
            .levels_gained
            .iter()
            .map(|&new_level| Effect::LevelUp { new_level }),
    );
    effects
}

/// Apply one tick of status effects, dropping expired ones.
fn tick_statuses(effects: &mut Vec<StatusEffect>, mut apply: impl FnMut(&StatusEffect)) {
    for effect in effects.iter_mut() {
        apply(effect);
        effect.duration = effect.duration.saturating_sub(1);
    }
    effects.retain(|e| e.duration > 0);
}

fn tick_character(character: &mut Character, log: &mut Vec<String>) {
    let mut statuses = std::mem::take(&mut character.status_effects);
    tick_statuses(&mut statuses, |status| match status.kind {
        StatusKind::Poison => {
            let lost = character.lose_health(status.strength);
            log.push(format!("Poison deals {lost} damage to you."));
        }
        StatusKind::Regeneration => {
            let healed = character.heal(status.strength);
            log.push(format!("You regenerate {healed} health."));
        }
        StatusKind::Stunned => {}
    });
    character.status_effects = statuses;
}

fn tick_enemy(enemy: &mut Enemy, log: &mut Vec<String>) {
    let mut statuses = std::mem::take(&mut enemy.status_effects);
    tick_statuses(&mut statuses, |status| match status.kind {
        StatusKind::Poison => {
            let lost = enemy.lose_health(status.strength);
            log.push(format!("Poison deals {lost} damage to the {}.", enemy.name));
        }
        StatusKind::Regeneration => {
            enemy.heal(status.strength);
        }
        StatusKind::Stunned => {}
    });
    enemy.status_effects = statuses;
    if enemy.is_defeated() {
        log.push(format!("The {} succumbs!", enemy.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Attributes;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn low_rng() -> CombatEngine<StepRng> {
        CombatEngine::new(StepRng::new(0, 0))
    }

    #[test]
    fn test_initiative_ties_keep_player_first() {
        let mut engine = low_rng();
        let c = Character::new("Hero");
        let session = engine.initiate(&c, vec![Enemy::new("Goblin", 1), Enemy::new("Wolf", 1)]);
        let order: Vec<CombatantRef> = session.turn_order.iter().map(|e| e.combatant).collect();
        assert_eq!(
            order,
            vec![CombatantRef::Player, CombatantRef::Enemy(0), CombatantRef::Enemy(1)]
        );
        assert_eq!(session.round, 1);
        assert_eq!(session.log[0], "Combat begins! You face Goblin, Wolf.");
    }

    #[test]
    fn test_initiative_is_sorted_descending() {
        let mut engine = CombatEngine::new(StdRng::seed_from_u64(4));
        let c = Character::new("Hero");
        let enemies = (0..5).map(|i| Enemy::new(format!("Rat {i}"), 1)).collect();
        let session = engine.initiate(&c, enemies);
        assert!(session.turn_order.windows(2).all(|w| w[0].roll >= w[1].roll));
        assert_eq!(session.turn_order.len(), 6);
    }

    #[test]
    fn test_single_enemy_opening_line() {
        let mut engine = low_rng();
        let session = engine.initiate(&Character::new("Hero"), vec![Enemy::new("Goblin", 1)]);
        assert_eq!(session.log[0], "Combat begins! You face a Goblin.");
    }

    #[test]
    fn test_natural_one_always_misses() {
        let mut engine = low_rng();
        let attacker = CombatStats {
            accuracy: 100,
            ..Default::default()
        };
        let strike = engine.strike(&attacker, &CombatStats::default(), 6);
        assert_eq!(strike.natural, 1);
        assert!(!strike.hit);
        assert_eq!(strike.raw, 0);
    }

    #[test]
    fn test_strike_hits_at_least_evasion() {
        let mut engine = CombatEngine::new(StdRng::seed_from_u64(21));
        let defender = CombatStats {
            evasion: 12,
            ..Default::default()
        };
        for _ in 0..500 {
            let strike = engine.strike(&CombatStats::default(), &defender, 4);
            match strike.natural {
                1 => assert!(!strike.hit),
                20 => assert!(strike.hit && strike.critical && strike.raw == 8),
                n => assert_eq!(strike.hit, n >= 12),
            }
        }
    }

    #[test]
    fn test_round_against_defeated_enemies_is_victory_without_damage() {
        let mut engine = low_rng();
        let mut c = Character::new("Hero");
        let mut session = engine.initiate(&c, vec![Enemy::new("Goblin", 1).with_health(5)]);
        session.enemies[0].current_hp = 0;
        let hp = c.current_hp;

        let result = engine.resolve_round(
            &mut c,
            &mut session,
            CombatAction::Attack {
                target: "goblin".into(),
                profile: AttackProfile::Basic,
            },
        );
        assert_eq!(result.outcome, CombatOutcome::Victory);
        assert_eq!(c.current_hp, hp);
        assert_eq!(c.experience, 25);

        let again = engine.resolve_round(
            &mut c,
            &mut session,
            CombatAction::Attack {
                target: "goblin".into(),
                profile: AttackProfile::Basic,
            },
        );
        assert_eq!(again.outcome, CombatOutcome::Victory);
        assert!(again.rewards.is_none());
        assert_eq!(c.experience, 25);
    }

    #[test]
    fn test_invalid_target_changes_nothing() {
        let mut engine = CombatEngine::new(StdRng::seed_from_u64(1));
        let mut c = Character::new("Hero");
        let mut session = engine.initiate(&c, vec![Enemy::new("Goblin", 1)]);
        let hp = c.current_hp;
        let log_len = session.log.len();

        let result = engine.resolve_round(
            &mut c,
            &mut session,
            CombatAction::Attack {
                target: "dragon".into(),
                profile: AttackProfile::Basic,
            },
        );
        assert!(!result.success);
        assert_eq!(result.outcome, CombatOutcome::Ongoing);
        assert_eq!(c.current_hp, hp);
        assert_eq!(session.round, 1);
        assert_eq!(session.log.len(), log_len);
        assert_eq!(session.enemies[0].current_hp, session.enemies[0].max_hp);
    }

    #[test]
    fn test_killing_blow_pays_rewards_once() {
        let mut engine = CombatEngine::new(StdRng::seed_from_u64(9));
        let mut c = Character::new("Hero");
        let enemy = Enemy::new("Ogre", 1)
            .with_health(10)
            .with_defense(2)
            .with_rewards(40, (10, 10));
        let mut session = engine.initiate(&c, vec![enemy]);

        assert_eq!(session.enemies[0].take_damage(15), 13);
        assert_eq!(session.enemies[0].current_hp, 0);

        let first = engine.pay_rewards(&mut c, &mut session);
        let second = engine.pay_rewards(&mut c, &mut session);
        assert_eq!(first.experience, 40);
        assert_eq!(first.gold, 10);
        assert_eq!(second, Rewards::default());
        assert_eq!(c.gold, 60);
        assert_eq!(c.experience, 40);
    }

    #[test]
    fn test_unlearned_skill_is_rejected_without_cost() {
        let mut engine = low_rng();
        let mut c = Character::new("Hero");
        let mut session = engine.initiate(&c, vec![Enemy::new("Goblin", 1)]);
        let stamina = c.current_stamina;

        let result = engine.resolve_round(
            &mut c,
            &mut session,
            CombatAction::Skill {
                skill: "bash".into(),
                target: None,
            },
        );
        assert!(!result.success);
        assert_eq!(c.current_stamina, stamina);
    }

    #[test]
    fn test_bash_deals_flat_damage() {
        let mut engine = low_rng();
        let mut c = Character::new("Hero").with_skill("bash");
        let mut session = engine.initiate(&c, vec![Enemy::new("Goblin", 1).with_health(30).with_defense(2)]);

        let result = engine.resolve_round(
            &mut c,
            &mut session,
            CombatAction::Skill {
                skill: "Bash".into(),
                target: None,
            },
        );
        assert!(result.success);
        assert_eq!(session.enemies[0].current_hp, 22);
        assert_eq!(c.current_stamina, c.max_stamina - 3);
        assert_eq!(session.round, 2);
    }

    #[test]
    fn test_poison_ticks_and_expires() {
        let mut enemy = Enemy::new("Slime", 1).with_health(20);
        enemy.status_effects.push(StatusEffect::poison(2, 3));
        let mut log = Vec::new();
        tick_enemy(&mut enemy, &mut log);
        tick_enemy(&mut enemy, &mut log);
        tick_enemy(&mut enemy, &mut log);
        assert_eq!(enemy.current_hp, 14);
        assert!(enemy.status_effects.is_empty());
    }

    #[test]
    fn test_flee_chance_is_clamped() {
        let nimble = Character::new("Nimble").with_attributes(Attributes {
            dexterity: 30,
            ..Default::default()
        });
        let clumsy = Character::new("Clumsy").with_attributes(Attributes {
            dexterity: 3,
            ..Default::default()
        });
        let average = Character::new("Average");
        let dragon = CombatSession {
            enemies: vec![Enemy::new("Dragon", 20)],
            ..Default::default()
        };
        let rat = CombatSession {
            enemies: vec![Enemy::new("Rat", 1)],
            ..Default::default()
        };

        assert_eq!(flee_chance(&clumsy, &dragon), 0.1);
        assert_eq!(flee_chance(&nimble, &dragon), 0.1);
        assert_eq!(flee_chance(&nimble, &rat), 0.9);
        assert!((flee_chance(&average, &rat) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_successful_flee_skips_enemy_attacks() {
        let mut engine = low_rng();
        let mut c = Character::new("Runner");
        let mut session = engine.initiate(&c, vec![Enemy::new("Goblin", 1)]);
        let hp = c.current_hp;
        let result = engine.flee(&mut c, &mut session);
        assert_eq!(result.outcome, CombatOutcome::Fled);
        assert_eq!(c.current_hp, hp);
    }
}
