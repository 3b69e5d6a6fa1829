//! Hunger and thirst bookkeeping.

use crate::actions::Action;
use crate::world::Character;

/// Hunger at or below this triggers a warning.
pub const HUNGER_WARNING: i32 = 20;
/// Thirst at or below this triggers a warning.
pub const THIRST_WARNING: i32 = 15;

const STARVATION_DAMAGE: i32 = 5;
const DEHYDRATION_DAMAGE: i32 = 10;

/// Hunger and thirst drained by one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurvivalCost {
    pub hunger: i32,
    pub thirst: i32,
}

impl SurvivalCost {
    pub const fn new(hunger: i32, thirst: i32) -> Self {
        Self { hunger, thirst }
    }

    pub fn is_free(&self) -> bool {
        self.hunger == 0 && self.thirst == 0
    }
}

/// Cost table for non-combat actions.
pub fn cost_of(action: &Action) -> SurvivalCost {
    match action {
        Action::Move => SurvivalCost::new(2, 3),
        Action::Search => SurvivalCost::new(1, 1),
        Action::Talk => SurvivalCost::new(0, 1),
        Action::Rest => SurvivalCost::new(5, 0),
        Action::Custom(_) => SurvivalCost::new(1, 1),
        Action::Look | Action::Attack | Action::Flee | Action::UseItem => SurvivalCost::default(),
    }
}

/// What applying a survival cost did to the character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivalReport {
    pub warnings: Vec<String>,
    /// Health lost to starvation or dehydration.
    pub damage: i32,
}

/// Drain hunger and thirst, then apply warnings and deprivation damage.
pub fn apply(character: &mut Character, cost: SurvivalCost) -> SurvivalReport {
    let mut report = SurvivalReport::default();
    if cost.is_free() {
        return report;
    }

    character.adjust_hunger(-cost.hunger);
    character.adjust_thirst(-cost.thirst);

    if character.hunger <= HUNGER_WARNING {
        report
            .warnings
            .push("Your stomach aches with hunger. You need to eat something soon!".to_string());
    }
    if character.thirst <= THIRST_WARNING {
        report
            .warnings
            .push("Your throat is parched. You need to find water quickly!".to_string());
    }

    if character.hunger == 0 {
        report.damage += character.lose_health(STARVATION_DAMAGE);
        report.warnings.push("You are starving!".to_string());
    }
    if character.thirst == 0 {
        report.damage += character.lose_health(DEHYDRATION_DAMAGE);
        report.warnings.push("You are severely dehydrated!".to_string());
    }

    if !report.warnings.is_empty() {
        tracing::debug!(
            hunger = character.hunger,
            thirst = character.thirst,
            damage = report.damage,
            "survival warning"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_drains_both() {
        let mut c = Character::new("Walker");
        let report = apply(&mut c, cost_of(&Action::Move));
        assert_eq!(c.hunger, 98);
        assert_eq!(c.thirst, 97);
        assert!(report.warnings.is_empty());
        assert_eq!(report.damage, 0);
    }

    #[test]
    fn test_free_actions_do_nothing() {
        let mut c = Character::new("Looker");
        c.hunger = 0;
        let report = apply(&mut c, cost_of(&Action::Look));
        assert_eq!(report, SurvivalReport::default());
        assert_eq!(c.current_hp, c.max_hp);
    }

    #[test]
    fn test_warnings_at_thresholds() {
        let mut c = Character::new("Parched");
        c.hunger = 22;
        c.thirst = 18;
        let report = apply(&mut c, cost_of(&Action::Move));
        assert_eq!(c.hunger, 20);
        assert_eq!(c.thirst, 15);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_deprivation_damage() {
        let mut c = Character::new("Starving");
        c.hunger = 1;
        c.thirst = 2;
        let report = apply(&mut c, cost_of(&Action::Move));
        assert_eq!(report.damage, 15);
        assert_eq!(c.current_hp, c.max_hp - 15);
    }
}
