//! Player actions, their costs, and what resolving one produced.

use crate::combat::CombatOutcome;
use crate::items::{EquipmentSlot, ItemEffect, ItemKind};
use crate::narration::SuggestedRoll;
use crate::world::{Character, Direction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A player action kind. Unknown names are kept verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move,
    Look,
    Talk,
    Search,
    Attack,
    Flee,
    UseItem,
    Rest,
    Custom(String),
}

impl Action {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "move" | "go" => Action::Move,
            "look" => Action::Look,
            "talk" => Action::Talk,
            "search" => Action::Search,
            "attack" => Action::Attack,
            "flee" => Action::Flee,
            "use_item" | "use" => Action::UseItem,
            "rest" => Action::Rest,
            _ => Action::Custom(name.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Move => "move",
            Action::Look => "look",
            Action::Talk => "talk",
            Action::Search => "search",
            Action::Attack => "attack",
            Action::Flee => "flee",
            Action::UseItem => "use_item",
            Action::Rest => "rest",
            Action::Custom(name) => name,
        }
    }

    /// Stamina charged before the action runs.
    pub fn stamina_cost(&self) -> i32 {
        match self {
            Action::Move => 1,
            Action::Search => 2,
            Action::Attack => 3,
            Action::Flee => 2,
            _ => 0,
        }
    }

    /// Whether the action may be taken while a combat session is active.
    pub fn allowed_in_combat(&self) -> bool {
        matches!(self, Action::Attack | Action::UseItem | Action::Flee)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Effects
// ============================================================================

/// A concrete change an action made, reported alongside its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    StaminaSpent {
        amount: i32,
        remaining: i32,
    },

    /// Positive for healing, negative for damage.
    HealthChanged {
        amount: i32,
        current: i32,
        max: i32,
    },

    StaminaRestored {
        amount: i32,
        current: i32,
    },

    ItemAdded {
        item: String,
    },

    ItemRemoved {
        item: String,
    },

    ItemEquipped {
        item: String,
        slot: EquipmentSlot,
        replaced: Option<String>,
    },

    GoldChanged {
        amount: i32,
        total: u32,
    },

    ExperienceGained {
        amount: u32,
        total: u32,
    },

    LevelUp {
        new_level: u32,
    },

    Moved {
        from: String,
        to: String,
        direction: Option<Direction>,
        discovered: bool,
    },

    CombatStarted {
        enemies: Vec<String>,
    },

    CombatEnded {
        outcome: CombatOutcome,
    },

    QuestAdded {
        name: String,
        giver: String,
    },

    SurvivalWarning {
        message: String,
    },
}

// ============================================================================
// Outcome
// ============================================================================

/// Everything the caller learns from one processed action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    /// Deterministic description of what happened.
    pub message: String,
    /// Narrated text, when a narrator is configured.
    pub narration: Option<String>,
    pub effects: Vec<Effect>,
    pub suggested_roll: Option<SuggestedRoll>,
    /// Narration came from the fallback table rather than the narrator.
    pub fallback_used: bool,
    /// Whether a combat session is active after the action.
    pub in_combat: bool,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Append a sentence to the message.
    pub fn append(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            return;
        }
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        self.message.push_str(line);
    }

    /// The text to show the player: narration if present, else the message.
    pub fn text(&self) -> &str {
        self.narration.as_deref().unwrap_or(&self.message)
    }
}

// ============================================================================
// Item use
// ============================================================================

/// Use the first inventory entry answering to `query`.
///
/// Weapons and armor swap into their slot, consumables apply and are
/// removed, quest items are only examined.
pub fn use_item(character: &mut Character, query: &str) -> ActionOutcome {
    if query.trim().is_empty() {
        return ActionOutcome::failure("Use what? Name an item from your inventory.");
    }
    let Some(index) = character.find_item(query) else {
        return ActionOutcome::failure(format!("You don't have any '{}'.", query.trim()));
    };

    let details = character.inventory[index].details();
    let name = details.name.clone();

    match details.kind {
        ItemKind::Weapon | ItemKind::Armor => {
            let slot = details.slot().unwrap_or(EquipmentSlot::Accessory);
            character.inventory.remove(index);
            let replaced = character.equip(slot, name.clone());
            let mut outcome = ActionOutcome::success(format!("You equip the {name} ({slot})."));
            if let Some(previous) = &replaced {
                character.add_item(previous.clone());
                outcome.append(format!("You stow the {previous} in your pack."));
            }
            outcome.with_effect(Effect::ItemEquipped {
                item: name,
                slot,
                replaced,
            })
        }
        ItemKind::Consumable => {
            character.inventory.remove(index);
            let mut outcome = ActionOutcome::success(format!("You use the {name}."))
                .with_effect(Effect::ItemRemoved { item: name.clone() });
            match details.effect {
                Some(ItemEffect::Health(amount)) => {
                    let healed = character.heal(amount);
                    outcome.append(format!("You recover {healed} health."));
                    outcome = outcome.with_effect(Effect::HealthChanged {
                        amount: healed,
                        current: character.current_hp,
                        max: character.max_hp,
                    });
                }
                Some(ItemEffect::Stamina(amount)) => {
                    let restored = character.restore_stamina(amount);
                    outcome.append(format!("You recover {restored} stamina."));
                    outcome = outcome.with_effect(Effect::StaminaRestored {
                        amount: restored,
                        current: character.current_stamina,
                    });
                }
                Some(ItemEffect::Hunger(amount)) => {
                    character.adjust_hunger(amount);
                    outcome.append("Your hunger eases.");
                }
                Some(ItemEffect::Thirst(amount)) => {
                    character.adjust_thirst(amount);
                    outcome.append("Your thirst is quenched.");
                }
                Some(ItemEffect::Nourish(amount)) => {
                    character.adjust_hunger(amount);
                    character.adjust_thirst(amount);
                    outcome.append("You feel refreshed.");
                }
                None => outcome.append("Nothing seems to happen."),
            }
            outcome
        }
        ItemKind::Quest => {
            let mut outcome = ActionOutcome::success(format!("You examine the {name}."));
            outcome.append(&details.description);
            if let Some(content) = &details.content {
                outcome.append(content);
            }
            outcome
        }
        ItemKind::Misc => {
            let mut outcome = ActionOutcome::success(format!("You turn the {name} over in your hands."));
            outcome.append(&details.description);
            outcome
        }
    }
}
