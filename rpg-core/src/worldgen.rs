//! Procedural content: locations, NPCs, enemies, quests and found items.
//!
//! Every generator takes the random source as a parameter so the engine can
//! run from a seeded generator in tests.

use crate::world::{Coordinates, Direction, Enemy, Location, NpcRecord, Quest, QuestTask};
use rand::seq::SliceRandom;
use rand::Rng;

// ============================================================================
// Tables
// ============================================================================

pub const LOCATION_KINDS: &[&str] = &[
    "forest", "village", "mountain", "cave", "ruins", "swamp", "plains", "river",
];

const NAME_PREFIXES: &[&str] = &[
    "Whispering", "Old", "Broken", "Silent", "Misty", "Golden", "Shadowed", "Windy", "Hollow",
    "Ashen",
];

const NPC_FIRST_NAMES: &[&str] = &[
    "Thorne", "Elara", "Garrick", "Lyra", "Kael", "Seraphina", "Brom", "Isolde", "Darian", "Freya",
];

const NPC_LAST_NAMES: &[&str] = &[
    "Ironheart", "Nightshade", "Stormborn", "Silverwood", "Blackthorn", "Frostbeard", "Sunseeker",
    "Moonshadow",
];

const RACES: &[&str] = &["Human", "Elf", "Dwarf", "Halfling", "Half-Orc", "Gnome"];

const PERSONALITIES: &[&str] = &[
    "gruff but fair", "cheerful and talkative", "quiet and watchful", "nervous", "proud",
    "kind-hearted", "suspicious of strangers",
];

const COMMON_EVENTS: &[&str] = &[
    "A gentle breeze stirs the leaves",
    "Distant thunder rumbles",
    "A bird cries somewhere overhead",
    "You hear footsteps in the distance",
    "The smell of smoke drifts past",
];

const FOUND_ITEMS: &[&str] = &[
    "Health Potion", "Bread", "Water Flask", "Torch", "Rope", "Rusty Dagger", "Stamina Tonic",
    "Old Map", "Dried Meat", "Antidote",
];

const QUEST_OBJECTIVES: &[(&str, &str)] = &[
    ("Lost Heirloom", "Recover a family heirloom lost"),
    ("Wolf Trouble", "Drive off the wolves prowling"),
    ("Missing Courier", "Find the courier who vanished"),
    ("Herbal Remedy", "Gather rare herbs growing"),
    ("Bandit Camp", "Break up the bandit camp hidden"),
];

fn kind_npcs(kind: &str) -> &'static [&'static str] {
    match kind {
        "village" => &["Farmer", "Blacksmith", "Innkeeper", "Hunter", "Elder"],
        "forest" => &["Hunter", "Druid", "Ranger", "Hermit"],
        "mountain" => &["Miner", "Goatherd", "Monk", "Hermit"],
        "cave" => &["Miner", "Refugee", "Monster Hunter"],
        "ruins" => &["Archaeologist", "Treasure Hunter", "Historian"],
        "swamp" => &["Fisherman", "Alchemist", "Hermit"],
        _ => &["Traveler", "Merchant", "Pilgrim"],
    }
}

fn kind_events(kind: &str) -> &'static [&'static str] {
    match kind {
        "village" => &["Villagers haggle at a market stall", "A dog barks at passers-by"],
        "forest" => &["Something rustles in the undergrowth", "Sunlight flickers through the canopy"],
        "mountain" => &["Loose stones skitter down the slope", "An eagle circles high above"],
        "cave" => &["Water drips somewhere in the dark", "A cold draft blows from deeper inside"],
        "ruins" => &["Crumbling stones shift underfoot", "Faded carvings catch the light"],
        "swamp" => &["Bubbles rise from the murky water", "Insects drone in the heavy air"],
        _ => &[],
    }
}

fn kind_description(kind: &str) -> &'static str {
    match kind {
        "forest" => "Tall trees crowd together and the light turns green beneath their branches.",
        "village" => "A cluster of timber houses gathers around a worn well.",
        "mountain" => "A rocky slope climbs toward wind-scoured peaks.",
        "cave" => "A dark opening yawns in the rock, cool air spilling out.",
        "ruins" => "Broken walls and toppled pillars hint at a forgotten past.",
        "swamp" => "Stagnant pools and twisted roots make every step uncertain.",
        "river" => "A wide river runs fast and cold over smooth stones.",
        _ => "Open grassland stretches toward the horizon.",
    }
}

fn kind_enemies(kind: &str) -> &'static [&'static str] {
    match kind {
        "forest" => &["Wolf", "Bandit", "Giant Spider", "Goblin"],
        "mountain" => &["Mountain Lion", "Troll", "Rock Elemental"],
        "cave" => &["Bat Swarm", "Skeleton", "Slime", "Goblin"],
        "ruins" => &["Skeleton", "Ghost", "Cultist"],
        "swamp" => &["Crocodile", "Slime", "Zombie"],
        "village" => &["Thief", "Mercenary"],
        _ => &["Bandit", "Wolf", "Goblin"],
    }
}

/// Base numbers for an enemy type at level 1.
struct EnemyTemplate {
    health: i32,
    defense: i32,
    damage: (i32, i32),
    agility: i32,
    loot: &'static [&'static str],
}

fn enemy_template(name: &str) -> EnemyTemplate {
    match name {
        "Wolf" | "Mountain Lion" => EnemyTemplate {
            health: 14,
            defense: 0,
            damage: (2, 5),
            agility: 14,
            loot: &["Dried Meat"],
        },
        "Troll" | "Rock Elemental" => EnemyTemplate {
            health: 30,
            defense: 2,
            damage: (3, 8),
            agility: 8,
            loot: &["Iron Gauntlets"],
        },
        "Skeleton" | "Zombie" | "Ghost" => EnemyTemplate {
            health: 16,
            defense: 1,
            damage: (1, 6),
            agility: 9,
            loot: &["Rusty Dagger", "Old Map"],
        },
        "Slime" | "Bat Swarm" | "Giant Spider" | "Crocodile" => EnemyTemplate {
            health: 12,
            defense: 0,
            damage: (1, 4),
            agility: 12,
            loot: &["Antidote"],
        },
        _ => EnemyTemplate {
            health: 18,
            defense: 1,
            damage: (1, 6),
            agility: 11,
            loot: &["Health Potion", "Bread", "Leather Boots"],
        },
    }
}

// ============================================================================
// Locations
// ============================================================================

fn pick<'a, R: Rng + ?Sized>(items: &[&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Random name for a location of the given kind ("Misty Forest").
pub fn location_name<R: Rng + ?Sized>(kind: &str, rng: &mut R) -> String {
    format!("{} {}", pick(NAME_PREFIXES, rng), capitalize(kind))
}

/// Zero to two ambient events for a location kind.
pub fn generate_events<R: Rng + ?Sized>(kind: &str, rng: &mut R) -> Vec<String> {
    let mut pool: Vec<&str> = kind_events(kind).to_vec();
    pool.extend_from_slice(COMMON_EVENTS);
    let count = rng.gen_range(0..=2);
    pool.choose_multiple(rng, count).map(|s| s.to_string()).collect()
}

pub fn npc_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(NPC_FIRST_NAMES, rng), pick(NPC_LAST_NAMES, rng))
}

/// Zero to two NPCs; settlements get at least one.
pub fn generate_npcs<R: Rng + ?Sized>(kind: &str, rng: &mut R) -> Vec<String> {
    let min = if kind == "village" { 1 } else { 0 };
    let count = rng.gen_range(min..=2);
    let mut names: Vec<String> = Vec::with_capacity(count);
    for _ in 0..count * 4 {
        if names.len() == count {
            break;
        }
        let name = npc_name(rng);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// A fresh location at `coordinates`.
pub fn generate_location<R: Rng + ?Sized>(kind: &str, coordinates: Coordinates, rng: &mut R) -> Location {
    let distance = coordinates.distance(&Coordinates::default());
    let danger = (1 + (distance / 3.0) as u8).min(10);
    let mut location = Location::new(location_name(kind, rng), kind, coordinates)
        .with_description(kind_description(kind))
        .with_npcs(generate_npcs(kind, rng))
        .with_events(generate_events(kind, rng));
    location.danger_level = danger;
    location.resources = match kind {
        "forest" => vec!["wood".to_string(), "herbs".to_string()],
        "mountain" | "cave" => vec!["stone".to_string(), "ore".to_string()],
        "river" => vec!["water".to_string(), "fish".to_string()],
        _ => Vec::new(),
    };
    location
}

/// A new location one step from `from`, usually of a similar kind.
pub fn generate_adjacent<R: Rng + ?Sized>(from: &Location, direction: Direction, rng: &mut R) -> Location {
    let kind = if rng.gen_bool(0.5) && LOCATION_KINDS.contains(&from.kind.as_str()) {
        from.kind.clone()
    } else {
        pick(LOCATION_KINDS, rng).to_string()
    };
    let location = generate_location(&kind, from.coordinates.offset(direction), rng);
    tracing::debug!(from = %from.name, %direction, to = %location.name, "generated adjacent location");
    location
}

// ============================================================================
// NPCs
// ============================================================================

/// Flesh out a named NPC encountered at a location of the given kind.
pub fn generate_npc_profile<R: Rng + ?Sized>(name: &str, location_kind: &str, level: u32, rng: &mut R) -> NpcRecord {
    let profession = pick(kind_npcs(location_kind), rng).to_string();
    NpcRecord {
        name: name.to_string(),
        race: pick(RACES, rng).to_string(),
        knowledge: vec![format!("the lands around the {location_kind}")],
        quest_hooks: vec![format!("{name} mentioned trouble nearby")],
        personality: pick(PERSONALITIES, rng).to_string(),
        profession,
        level: level.max(1),
        interactions: 0,
        relationship: 0,
    }
}

// ============================================================================
// Enemies
// ============================================================================

/// Build an enemy of a known type, scaled to `level`.
pub fn enemy_of_type(name: &str, level: u32) -> Enemy {
    let level = level.max(1);
    let template = enemy_template(name);
    let scale = level as i32 - 1;
    Enemy::new(name, level)
        .with_health(template.health + 5 * scale)
        .with_defense(template.defense + scale / 3)
        .with_attack_damage(template.damage.0 + scale / 2, template.damage.1 + scale)
        .with_rewards(25 * level, (5 * level, 15 * level))
        .with_loot(template.loot.iter().map(|s| s.to_string()).collect())
        .with_agility(template.agility)
}

/// A random enemy for a location kind, within a level of the character.
pub fn random_enemy<R: Rng + ?Sized>(location_kind: &str, character_level: u32, rng: &mut R) -> Enemy {
    let name = pick(kind_enemies(location_kind), rng);
    let level = (character_level as i32 + rng.gen_range(-1..=1)).max(1) as u32;
    enemy_of_type(name, level).with_description(format!("A hostile {} blocks your way.", name.to_lowercase()))
}

/// Turn an NPC the player attacked into an enemy.
pub fn enemy_from_npc(npc: &NpcRecord, character_level: u32) -> Enemy {
    let level = npc.level.max(character_level).max(1);
    enemy_of_type(&npc.name, level).with_description(format!(
        "{} the {} turns on you.",
        npc.name,
        if npc.profession.is_empty() { "stranger" } else { &npc.profession }
    ))
}

// ============================================================================
// Quests and items
// ============================================================================

/// A quest offered by `giver` at `location`.
pub fn generate_quest<R: Rng + ?Sized>(giver: &str, location: &str, level: u32, rng: &mut R) -> Quest {
    let (title, objective) = QUEST_OBJECTIVES
        .choose(rng)
        .copied()
        .unwrap_or(("Errand", "Help out"));
    Quest {
        name: title.to_string(),
        description: format!("{objective} near {location}."),
        giver: giver.to_string(),
        location: location.to_string(),
        reward: 20 * level.max(1) + rng.gen_range(0..=20),
        progress: 0,
        tasks: vec![
            QuestTask {
                description: format!("{objective} near {location}"),
                completed: false,
            },
            QuestTask {
                description: format!("Return to {giver}"),
                completed: false,
            },
        ],
        status: Default::default(),
    }
}

/// Something lying around to be found by searching.
pub fn random_found_item<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(FOUND_ITEMS, rng).to_string()
}
