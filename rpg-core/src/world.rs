//! Entity model: the player character, enemies, and the session's game state.

use crate::dice::{attribute_modifier, CombatStats};
use crate::items::{EquipmentSlot, InventoryItem, ItemKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Messages kept in the rolling conversation history.
pub const MAX_MESSAGES: usize = 20;

/// Entries kept in the interaction summary.
pub const MAX_SUMMARY_ENTRIES: usize = 50;

/// Base health at level 1 with an average constitution.
const BASE_HEALTH: i32 = 20;

/// Average of the per-level hit die.
const HIT_DIE_AVERAGE: i32 = 5;

const BASE_STAMINA: i32 = 10;
const STAMINA_PER_LEVEL: i32 = 2;

/// Upper bound of hunger and thirst (fully sated).
pub const SURVIVAL_MAX: i32 = 100;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for locations on the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub Uuid);

impl LocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// The six primary attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Dexterity => "Dexterity",
            Attribute::Constitution => "Constitution",
            Attribute::Intelligence => "Intelligence",
            Attribute::Wisdom => "Wisdom",
            Attribute::Charisma => "Charisma",
        }
    }

    /// Parse a full name or three-letter abbreviation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "strength" | "str" => Some(Attribute::Strength),
            "dexterity" | "dex" | "agility" => Some(Attribute::Dexterity),
            "constitution" | "con" => Some(Attribute::Constitution),
            "intelligence" | "int" => Some(Attribute::Intelligence),
            "wisdom" | "wis" => Some(Attribute::Wisdom),
            "charisma" | "cha" => Some(Attribute::Charisma),
            _ => None,
        }
    }
}

/// Attribute scores, nominally 3-20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl Attributes {
    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, attribute: Attribute) -> i32 {
        attribute_modifier(self.get(attribute))
    }
}

// ============================================================================
// Status effects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Deals `strength` damage per tick.
    Poison,
    /// Heals `strength` per tick.
    Regeneration,
    /// Skips the affected side's attacks.
    Stunned,
}

/// A timed effect on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Remaining ticks.
    pub duration: u32,
    pub strength: i32,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration: u32, strength: i32) -> Self {
        Self {
            kind,
            duration,
            strength,
        }
    }

    pub fn poison(duration: u32, strength: i32) -> Self {
        Self::new(StatusKind::Poison, duration, strength)
    }
}

// ============================================================================
// Character
// ============================================================================

/// The player's avatar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// Session that owns this character, if any.
    pub session_id: Option<String>,

    pub attributes: Attributes,

    pub current_hp: i32,
    pub max_hp: i32,
    pub current_stamina: i32,
    pub max_stamina: i32,

    pub hunger: i32,
    pub thirst: i32,

    pub level: u32,
    pub experience: u32,
    pub gold: u32,

    pub inventory: Vec<InventoryItem>,
    pub equipment: BTreeMap<EquipmentSlot, String>,
    pub skills: BTreeSet<String>,
    pub status_effects: Vec<StatusEffect>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new("Adventurer")
    }
}

impl Character {
    /// Create a level 1 character with average attributes and starting kit.
    pub fn new(name: impl Into<String>) -> Self {
        let mut character = Self {
            id: CharacterId::new(),
            name: name.into(),
            session_id: None,
            attributes: Attributes::default(),
            current_hp: 0,
            max_hp: 0,
            current_stamina: 0,
            max_stamina: 0,
            hunger: SURVIVAL_MAX,
            thirst: SURVIVAL_MAX,
            level: 1,
            experience: 0,
            gold: 50,
            inventory: vec!["Basic Sword".into(), "Health Potion".into()],
            equipment: BTreeMap::new(),
            skills: BTreeSet::new(),
            status_effects: Vec::new(),
        };
        character.recalculate_resources();
        character.restore_fully();
        character
    }

    /// Replace the attribute scores and recompute derived pools.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self.recalculate_resources();
        self.restore_fully();
        self
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn modifier(&self, attribute: Attribute) -> i32 {
        self.attributes.modifier(attribute)
    }

    /// Recompute max health and stamina from level and attributes.
    ///
    /// Current values are clamped into the new bounds.
    pub fn recalculate_resources(&mut self) {
        let con = self.modifier(Attribute::Constitution);
        let dex = self.modifier(Attribute::Dexterity);
        let levels_past_first = self.level.saturating_sub(1) as i32;

        self.max_hp =
            (BASE_HEALTH + con + levels_past_first * (HIT_DIE_AVERAGE + con).max(1)).max(1);
        self.max_stamina =
            (BASE_STAMINA + STAMINA_PER_LEVEL * levels_past_first + (dex + con).div_euclid(2)).max(1);

        self.current_hp = self.current_hp.clamp(0, self.max_hp);
        self.current_stamina = self.current_stamina.clamp(0, self.max_stamina);
    }

    pub fn restore_fully(&mut self) {
        self.current_hp = self.max_hp;
        self.current_stamina = self.max_stamina;
    }

    /// Total experience needed to advance past the current level.
    pub fn experience_threshold(&self) -> u32 {
        100 * self.level
    }

    /// Add experience, levelling up as many times as it allows.
    ///
    /// Returns the levels reached, in order.
    pub fn gain_experience(&mut self, amount: u32) -> Vec<u32> {
        self.experience = self.experience.saturating_add(amount);
        let mut reached = Vec::new();
        while self.experience >= self.experience_threshold() {
            self.level += 1;
            self.recalculate_resources();
            self.restore_fully();
            reached.push(self.level);
            tracing::info!(character = %self.name, level = self.level, "level up");
        }
        reached
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0
    }

    /// Lose health directly (no defense). Returns health actually lost.
    pub fn lose_health(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount.max(0)).max(0);
        before - self.current_hp
    }

    /// Heal up to max health. Returns health actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount.max(0)).min(self.max_hp);
        self.current_hp - before
    }

    /// Spend stamina if enough is available.
    pub fn spend_stamina(&mut self, cost: i32) -> bool {
        if self.current_stamina < cost {
            return false;
        }
        self.current_stamina -= cost;
        true
    }

    pub fn restore_stamina(&mut self, amount: i32) -> i32 {
        let before = self.current_stamina;
        self.current_stamina = (self.current_stamina + amount.max(0)).min(self.max_stamina);
        self.current_stamina - before
    }

    /// Adjust hunger, clamped to `[0, 100]`. Positive values feed.
    pub fn adjust_hunger(&mut self, delta: i32) {
        self.hunger = (self.hunger + delta).clamp(0, SURVIVAL_MAX);
    }

    /// Adjust thirst, clamped to `[0, 100]`. Positive values quench.
    pub fn adjust_thirst(&mut self, delta: i32) {
        self.thirst = (self.thirst + delta).clamp(0, SURVIVAL_MAX);
    }

    pub fn initiative_modifier(&self) -> i32 {
        self.modifier(Attribute::Dexterity)
    }

    pub fn equipped(&self, slot: EquipmentSlot) -> Option<&str> {
        self.equipment.get(&slot).map(|s| s.as_str())
    }

    /// Put an item in a slot, returning whatever was there.
    pub fn equip(&mut self, slot: EquipmentSlot, item: impl Into<String>) -> Option<String> {
        self.equipment.insert(slot, item.into())
    }

    /// Fighting numbers derived from attributes and equipment.
    pub fn combat_stats(&self) -> CombatStats {
        let weapon_bonus = self
            .equipped(EquipmentSlot::Weapon)
            .map(|name| crate::items::lookup(name).damage_bonus.unwrap_or(0))
            .unwrap_or(0);
        let defense: i32 = self
            .equipment
            .iter()
            .filter(|(slot, _)| **slot != EquipmentSlot::Weapon)
            .map(|(_, name)| crate::items::lookup(name).defense.unwrap_or(0))
            .sum();
        let dex = self.modifier(Attribute::Dexterity);

        CombatStats {
            power: self.modifier(Attribute::Strength) + weapon_bonus,
            accuracy: dex,
            evasion: 10 + dex,
            defense,
        }
    }

    pub fn add_item(&mut self, item: impl Into<InventoryItem>) {
        self.inventory.push(item.into());
    }

    /// Index of the inventory entry answering to `query`: the first exact
    /// name match, else the first partial one.
    pub fn find_item(&self, query: &str) -> Option<usize> {
        let wanted = query.trim().to_lowercase();
        self.inventory
            .iter()
            .position(|item| item.name().trim().to_lowercase() == wanted)
            .or_else(|| self.inventory.iter().position(|item| item.matches(query)))
    }

    /// Whether any entry is exactly one of `names` (case-insensitive).
    pub fn has_any_item(&self, names: &[&str]) -> bool {
        self.inventory
            .iter()
            .any(|item| names.iter().any(|n| item.name().eq_ignore_ascii_case(n)))
    }

    /// Whether the inventory holds anything of the given kind.
    pub fn has_item_kind(&self, kind: ItemKind) -> bool {
        self.inventory.iter().any(|item| item.details().kind == kind)
    }

    pub fn knows_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    /// One-line status for prompts and the CLI.
    pub fn status_line(&self) -> String {
        format!(
            "{} (level {}) HP {}/{}, Stamina {}/{}, Hunger {}, Thirst {}, Gold {}",
            self.name,
            self.level,
            self.current_hp,
            self.max_hp,
            self.current_stamina,
            self.max_stamina,
            self.hunger,
            self.thirst,
            self.gold
        )
    }
}

// ============================================================================
// Enemy
// ============================================================================

/// A combat opponent. Created per encounter and discarded when it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Enemy {
    pub name: String,
    pub description: String,
    pub level: u32,
    pub current_hp: i32,
    pub max_hp: i32,
    pub defense: i32,
    pub attack_damage: (i32, i32),
    pub evasion: i32,
    /// Initiative source, read like an attribute score.
    pub agility: i32,
    pub experience_reward: u32,
    pub gold_reward: (u32, u32),
    pub loot_table: Vec<String>,
    pub status_effects: Vec<StatusEffect>,
}

impl Default for Enemy {
    fn default() -> Self {
        Self::new("Enemy", 1)
    }
}

impl Enemy {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            level: level.max(1),
            current_hp: 20,
            max_hp: 20,
            defense: 0,
            attack_damage: (1, 6),
            evasion: 10,
            agility: 10,
            experience_reward: 25,
            gold_reward: (5, 15),
            loot_table: Vec::new(),
            status_effects: Vec::new(),
        }
    }

    pub fn with_health(mut self, hp: i32) -> Self {
        self.max_hp = hp.max(1);
        self.current_hp = self.max_hp;
        self
    }

    pub fn with_defense(mut self, defense: i32) -> Self {
        self.defense = defense.max(0);
        self
    }

    pub fn with_attack_damage(mut self, min: i32, max: i32) -> Self {
        self.attack_damage = (min.min(max), max.max(min));
        self
    }

    pub fn with_evasion(mut self, evasion: i32) -> Self {
        self.evasion = evasion;
        self
    }

    pub fn with_agility(mut self, agility: i32) -> Self {
        self.agility = agility;
        self
    }

    pub fn with_rewards(mut self, experience: u32, gold: (u32, u32)) -> Self {
        self.experience_reward = experience;
        self.gold_reward = (gold.0.min(gold.1), gold.0.max(gold.1));
        self
    }

    pub fn with_loot(mut self, loot: Vec<String>) -> Self {
        self.loot_table = loot;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Apply damage after defense (at least 1 lands). Returns damage dealt.
    pub fn take_damage(&mut self, raw: i32) -> i32 {
        let effective = crate::dice::damage_after_defense(raw, self.defense);
        self.current_hp = (self.current_hp - effective).max(0);
        effective
    }

    /// Lose health directly, bypassing defense.
    pub fn lose_health(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount.max(0)).max(0);
        before - self.current_hp
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount.max(0)).min(self.max_hp);
        self.current_hp - before
    }

    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0
    }

    pub fn initiative_modifier(&self) -> i32 {
        attribute_modifier(self.agility)
    }

    pub fn combat_stats(&self) -> CombatStats {
        CombatStats {
            power: 0,
            accuracy: self.level as i32,
            evasion: self.evasion,
            defense: self.defense,
        }
    }
}

// ============================================================================
// Combat session
// ============================================================================

/// Who holds a place in the initiative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatantRef {
    Player,
    Enemy(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub combatant: CombatantRef,
    pub name: String,
    pub roll: i32,
}

/// Transient state of an encounter. Its presence on [`GameState`] is what
/// "in combat" means.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSession {
    pub enemies: Vec<Enemy>,
    pub round: u32,
    pub log: Vec<String>,
    pub turn_order: Vec<InitiativeEntry>,
    pub rewards_paid: bool,
}

impl Default for CombatSession {
    fn default() -> Self {
        Self {
            enemies: Vec::new(),
            round: 1,
            log: Vec::new(),
            turn_order: Vec::new(),
            rewards_paid: false,
        }
    }
}

impl CombatSession {
    pub fn all_enemies_defeated(&self) -> bool {
        self.enemies.iter().all(|e| e.is_defeated())
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = (usize, &Enemy)> {
        self.enemies.iter().enumerate().filter(|(_, e)| !e.is_defeated())
    }

    /// Index of the first living enemy, in encounter order.
    pub fn first_living(&self) -> Option<usize> {
        self.living_enemies().map(|(i, _)| i).next()
    }

    /// Resolve a living enemy by name (case-insensitive, either direction
    /// substring) or by 1-based position.
    pub fn find_target(&self, query: &str) -> Option<usize> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        if let Ok(position) = query.parse::<usize>() {
            return position
                .checked_sub(1)
                .filter(|i| self.enemies.get(*i).is_some_and(|e| !e.is_defeated()));
        }
        let by_name = self
            .living_enemies()
            .find(|(_, e)| {
                let name = e.name.to_lowercase();
                name == query || query.contains(&name) || name.contains(&query)
            })
            .map(|(i, _)| i);
        by_name.or_else(|| {
            let words: Vec<&str> = query.split_whitespace().filter(|w| w.len() > 2).collect();
            self.living_enemies()
                .find(|(_, e)| {
                    e.name
                        .to_lowercase()
                        .split_whitespace()
                        .any(|part| words.contains(&part))
                })
                .map(|(i, _)| i)
        })
    }

    /// Enemy indices in initiative order.
    pub fn enemy_order(&self) -> Vec<usize> {
        let ordered: Vec<usize> = self
            .turn_order
            .iter()
            .filter_map(|entry| match entry.combatant {
                CombatantRef::Enemy(i) if i < self.enemies.len() => Some(i),
                _ => None,
            })
            .collect();
        if ordered.len() == self.enemies.len() {
            ordered
        } else {
            (0..self.enemies.len()).collect()
        }
    }

    pub fn highest_enemy_level(&self) -> u32 {
        self.living_enemies().map(|(_, e)| e.level).max().unwrap_or(1)
    }

    pub fn enemy_names(&self) -> Vec<&str> {
        self.enemies.iter().map(|e| e.name.as_str()).collect()
    }

    /// Short description used in narration prompts.
    pub fn summary(&self) -> String {
        let enemies: Vec<String> = self
            .enemies
            .iter()
            .map(|e| format!("{} (level {}, HP {}/{})", e.name, e.level, e.current_hp, e.max_hp))
            .collect();
        format!("Round {} against {}", self.round, enemies.join(", "))
    }
}

// ============================================================================
// World map
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.delta();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Planar distance, ignoring height.
    pub fn distance(&self, other: &Coordinates) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn delta(&self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 1, 0),
            Direction::South => (0, -1, 0),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 0, 1),
            Direction::Down => (0, 0, -1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Find a direction word in free text ("head north", "n", "go up").
    pub fn from_text(text: &str) -> Option<Direction> {
        let lower = text.trim().to_lowercase();
        let single = match lower.as_str() {
            "n" => Some(Direction::North),
            "s" => Some(Direction::South),
            "e" => Some(Direction::East),
            "w" => Some(Direction::West),
            "u" => Some(Direction::Up),
            "d" => Some(Direction::Down),
            _ => None,
        };
        if single.is_some() {
            return single;
        }
        lower
            .split(|c: char| !c.is_alphanumeric())
            .find_map(|word| Direction::ALL.into_iter().find(|d| d.name() == word))
    }

    /// Dominant compass direction from one point to another.
    pub fn between(from: &Coordinates, to: &Coordinates) -> Option<Direction> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let dz = to.z - from.z;
        if dx == 0 && dy == 0 {
            return match dz.signum() {
                1 => Some(Direction::Up),
                -1 => Some(Direction::Down),
                _ => None,
            };
        }
        if dx.abs() > dy.abs() {
            Some(if dx > 0 { Direction::East } else { Direction::West })
        } else {
            Some(if dy > 0 { Direction::North } else { Direction::South })
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A place on the world map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Location type, e.g. "forest" or "village".
    pub kind: String,
    pub description: String,
    pub coordinates: Coordinates,
    pub connections: BTreeMap<Direction, LocationId>,
    pub discovered: bool,
    pub visited: bool,
    pub resources: Vec<String>,
    pub npcs: Vec<String>,
    pub events: Vec<String>,
    pub danger_level: u8,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("Unknown Place", "wilderness", Coordinates::default())
    }
}

impl Location {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: LocationId::new(),
            name: name.into(),
            kind: kind.into(),
            description: String::new(),
            coordinates,
            connections: BTreeMap::new(),
            discovered: true,
            visited: false,
            resources: Vec::new(),
            npcs: Vec::new(),
            events: Vec::new(),
            danger_level: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_npcs(mut self, npcs: Vec<String>) -> Self {
        self.npcs = npcs;
        self
    }

    pub fn with_events(mut self, events: Vec<String>) -> Self {
        self.events = events;
        self
    }
}

/// Something the player searched for at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub query: String,
    pub result: String,
}

/// What the player saw the last time they were somewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitedLocation {
    pub name: String,
    pub visits: u32,
    pub description: String,
    pub npcs_seen: Vec<String>,
    pub events_seen: Vec<String>,
    pub search_results: Vec<SearchRecord>,
}

/// A remembered non-player character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcRecord {
    pub name: String,
    pub race: String,
    pub profession: String,
    pub personality: String,
    pub level: u32,
    pub knowledge: Vec<String>,
    pub quest_hooks: Vec<String>,
    pub interactions: u32,
    /// Disposition toward the player, -100 to 100.
    pub relationship: i32,
}

// ============================================================================
// Quests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTask {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quest {
    pub name: String,
    pub description: String,
    pub giver: String,
    pub location: String,
    /// Gold paid on completion.
    pub reward: u32,
    /// Percentage of tasks completed.
    pub progress: u32,
    pub tasks: Vec<QuestTask>,
    pub status: QuestStatus,
}

impl Quest {
    /// Mark a task complete and refresh progress. Returns whether the quest
    /// became complete.
    pub fn complete_task(&mut self, index: usize) -> bool {
        if let Some(task) = self.tasks.get_mut(index) {
            task.completed = true;
        }
        let done = self.tasks.iter().filter(|t| t.completed).count();
        self.progress = if self.tasks.is_empty() {
            0
        } else {
            (done * 100 / self.tasks.len()) as u32
        };
        if !self.tasks.is_empty() && done == self.tasks.len() && self.status == QuestStatus::Active {
            self.status = QuestStatus::Completed;
            return true;
        }
        false
    }
}

// ============================================================================
// Game state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One entry of the rolling conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// The mutable, session-scoped world snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub location_id: LocationId,
    pub current_location: String,
    pub detailed_location: Option<String>,
    pub scene_description: String,
    pub coordinates: Coordinates,

    pub npcs_present: Vec<String>,
    pub events: Vec<String>,
    pub interactable_elements: Vec<String>,

    pub messages: Vec<ChatMessage>,
    pub combat: Option<CombatSession>,
    pub quests: Vec<Quest>,

    pub world_map: BTreeMap<LocationId, Location>,
    pub visited_locations: BTreeMap<LocationId, VisitedLocation>,
    pub known_npcs: BTreeMap<String, NpcRecord>,
    pub facts: BTreeMap<String, serde_json::Value>,
    pub summary: Vec<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(
            Location::new("Village Square", "village", Coordinates::default())
                .with_description("A quiet square surrounded by timber houses."),
        )
    }
}

impl GameState {
    /// Create a state standing at `start`, which is added to the map.
    pub fn new(mut start: Location) -> Self {
        start.visited = true;
        let mut state = Self {
            location_id: start.id,
            current_location: start.name.clone(),
            detailed_location: None,
            scene_description: start.description.clone(),
            coordinates: start.coordinates,
            npcs_present: start.npcs.clone(),
            events: start.events.clone(),
            interactable_elements: Vec::new(),
            messages: Vec::new(),
            combat: None,
            quests: Vec::new(),
            world_map: BTreeMap::new(),
            visited_locations: BTreeMap::new(),
            known_npcs: BTreeMap::new(),
            facts: BTreeMap::new(),
            summary: Vec::new(),
        };
        state.visited_locations.insert(
            start.id,
            VisitedLocation {
                name: start.name.clone(),
                visits: 1,
                description: start.description.clone(),
                npcs_seen: start.npcs.clone(),
                events_seen: start.events.clone(),
                search_results: Vec::new(),
            },
        );
        state.world_map.insert(start.id, start);
        state
    }

    pub fn in_combat(&self) -> bool {
        self.combat.is_some()
    }

    /// Append to the conversation history, dropping the oldest entries
    /// beyond [`MAX_MESSAGES`].
    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
        if self.messages.len() > MAX_MESSAGES {
            let excess = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..excess);
        }
    }

    /// Record an interaction as `"[kind] details"`.
    pub fn add_to_summary(&mut self, kind: &str, details: impl AsRef<str>) {
        self.summary.push(format!("[{kind}] {}", details.as_ref()));
        if self.summary.len() > MAX_SUMMARY_ENTRIES {
            let excess = self.summary.len() - MAX_SUMMARY_ENTRIES;
            self.summary.drain(..excess);
        }
    }

    /// Most recent summary entries, oldest first.
    pub fn recent_summary(&self, count: usize) -> &[String] {
        let start = self.summary.len().saturating_sub(count);
        &self.summary[start..]
    }

    pub fn current_location_data(&self) -> Option<&Location> {
        self.world_map.get(&self.location_id)
    }

    pub fn location_at(&self, coordinates: Coordinates) -> Option<&Location> {
        self.world_map.values().find(|l| l.coordinates == coordinates)
    }

    /// Add a newly found location to the map and note it in the history.
    pub fn discover_location(&mut self, location: Location) {
        tracing::info!(location = %location.name, coordinates = %location.coordinates, "location discovered");
        self.add_message(
            MessageRole::System,
            format!("Discovered {} at {}.", location.name, location.coordinates),
        );
        self.world_map.insert(location.id, location);
    }

    /// Link two locations in both directions.
    pub fn connect(&mut self, from: LocationId, direction: Direction, to: LocationId) {
        if let Some(location) = self.world_map.get_mut(&from) {
            location.connections.insert(direction, to);
        }
        if let Some(location) = self.world_map.get_mut(&to) {
            location.connections.insert(direction.opposite(), from);
        }
    }

    /// Shift an NPC's disposition, clamped to `[-100, 100]`.
    pub fn update_npc_relationship(&mut self, npc: &str, delta: i32) -> i32 {
        let record = self
            .known_npcs
            .entry(npc.to_string())
            .or_insert_with(|| NpcRecord {
                name: npc.to_string(),
                ..Default::default()
            });
        record.relationship = (record.relationship + delta).clamp(-100, 100);
        record.relationship
    }

    /// Case-preserving name of a present NPC matching `query`.
    pub fn present_npc(&self, query: &str) -> Option<&str> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.npcs_present
            .iter()
            .find(|npc| npc.eq_ignore_ascii_case(query))
            .or_else(|| {
                let lower = query.to_lowercase();
                self.npcs_present
                    .iter()
                    .find(|npc| lower.contains(&npc.to_lowercase()))
            })
            .map(|s| s.as_str())
    }

    pub fn active_quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.iter().filter(|q| q.status == QuestStatus::Active)
    }
}
