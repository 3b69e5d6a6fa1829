//! Dice rolling and attack resolution.
//!
//! Everything here is a pure function of its inputs plus a random source.
//! Each function that draws has a `*_with_rng` twin so callers (and tests)
//! can supply a seeded or mocked generator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of rolling `n` dice of the same size plus a flat modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Individual die results, in roll order.
    pub dice: Vec<i32>,
    pub modifier: i32,
    pub total: i32,
    /// Canonical notation, e.g. `2d6+3`.
    pub formula: String,
    /// Human readable breakdown, e.g. `2d6+3 = 10 (4+3+3)`.
    pub display: String,
}

impl DiceRoll {
    /// Whether a single d20 came up 20.
    pub fn is_natural_20(&self) -> bool {
        self.dice.len() == 1 && self.dice[0] == 20
    }

    /// Whether a single d20 came up 1.
    pub fn is_natural_1(&self) -> bool {
        self.dice.len() == 1 && self.dice[0] == 1
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

fn formula(n: u32, sides: u32, modifier: i32) -> String {
    match modifier {
        0 => format!("{n}d{sides}"),
        m if m > 0 => format!("{n}d{sides}+{m}"),
        m => format!("{n}d{sides}{m}"),
    }
}

/// Roll `n` dice with `sides` faces and add `modifier`.
///
/// Never fails: `n == 0` (or `sides == 0`) yields just the modifier.
pub fn roll(n: u32, sides: u32, modifier: i32) -> DiceRoll {
    roll_with_rng(n, sides, modifier, &mut rand::thread_rng())
}

/// Roll with a caller-supplied random source.
pub fn roll_with_rng<R: Rng + ?Sized>(n: u32, sides: u32, modifier: i32, rng: &mut R) -> DiceRoll {
    let dice: Vec<i32> = if sides == 0 {
        Vec::new()
    } else {
        let faces = i32::try_from(sides).unwrap_or(i32::MAX);
        (0..n).map(|_| rng.gen_range(1..=faces)).collect()
    };
    let total = dice.iter().fold(modifier, |acc, d| acc.saturating_add(*d));
    let formula = formula(n, sides, modifier);

    let mut parts: Vec<String> = dice.iter().map(|d| d.to_string()).collect();
    if modifier != 0 || parts.is_empty() {
        parts.push(modifier.to_string());
    }
    let display = format!("{formula} = {total} ({})", parts.join("+").replace("+-", "-"));

    DiceRoll {
        dice,
        modifier,
        total,
        formula,
        display,
    }
}

/// Roll a single d20 with no modifier.
pub fn d20() -> DiceRoll {
    d20_with_rng(&mut rand::thread_rng())
}

pub fn d20_with_rng<R: Rng + ?Sized>(rng: &mut R) -> DiceRoll {
    roll_with_rng(1, 20, 0, rng)
}

/// Modifier granted by an attribute score: `(score - 10)` halved, rounded down.
pub fn attribute_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Succeed with probability `p` (clamped to `[0, 1]`).
pub fn chance(p: f64) -> bool {
    chance_with_rng(p, &mut rand::thread_rng())
}

pub fn chance_with_rng<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < p.clamp(0.0, 1.0)
}

// ============================================================================
// Attack resolution
// ============================================================================

/// Fighting numbers for one side of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatStats {
    /// Flat bonus added to damage rolls.
    pub power: i32,
    /// Bonus added to d20 hit rolls.
    pub accuracy: i32,
    /// Threshold a d20 hit roll must reach.
    pub evasion: i32,
    /// Flat damage reduction (at least 1 damage always lands).
    pub defense: i32,
}

/// Attack style: trades damage band against hit chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackProfile {
    Light,
    #[default]
    Basic,
    Heavy,
}

impl AttackProfile {
    /// Damage band before the attacker's power is added.
    pub fn damage_band(&self) -> (i32, i32) {
        match self {
            AttackProfile::Light => (1, 4),
            AttackProfile::Basic => (1, 6),
            AttackProfile::Heavy => (2, 10),
        }
    }

    pub fn hit_chance(&self) -> f64 {
        match self {
            AttackProfile::Light => 0.9,
            AttackProfile::Basic => 0.8,
            AttackProfile::Heavy => 0.7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttackProfile::Light => "light",
            AttackProfile::Basic => "basic",
            AttackProfile::Heavy => "heavy",
        }
    }

    /// Pick a profile from free text ("a heavy swing at the wolf").
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("heavy") || lower.contains("power") {
            AttackProfile::Heavy
        } else if lower.contains("light") || lower.contains("quick") {
            AttackProfile::Light
        } else {
            AttackProfile::Basic
        }
    }
}

/// Result of [`resolve_attack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub hit: bool,
    /// Damage before defense.
    pub raw: i32,
    /// Damage after defense; 0 on a miss, otherwise at least 1.
    pub damage: i32,
}

/// Reduce raw damage by a flat defense, always keeping at least 1.
pub fn damage_after_defense(raw: i32, defense: i32) -> i32 {
    (raw - defense).max(1)
}

/// Resolve a profiled attack: one draw against the profile's hit chance,
/// then a uniform damage draw from the band shifted by the attacker's power.
pub fn resolve_attack(attacker: &CombatStats, defender: &CombatStats, profile: AttackProfile) -> AttackRoll {
    resolve_attack_with_rng(attacker, defender, profile, &mut rand::thread_rng())
}

pub fn resolve_attack_with_rng<R: Rng + ?Sized>(
    attacker: &CombatStats,
    defender: &CombatStats,
    profile: AttackProfile,
    rng: &mut R,
) -> AttackRoll {
    if !chance_with_rng(profile.hit_chance(), rng) {
        return AttackRoll {
            hit: false,
            raw: 0,
            damage: 0,
        };
    }

    let (low, high) = profile.damage_band();
    let raw = rng.gen_range(low..=high) + attacker.power;
    let damage = damage_after_defense(raw, defender.defense);

    tracing::debug!(profile = profile.name(), raw, damage, "attack resolved");

    AttackRoll {
        hit: true,
        raw,
        damage,
    }
}
