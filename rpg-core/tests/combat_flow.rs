//! Integration tests for whole encounters driven through the combat engine.
//!
//! Run with: `cargo test -p rpg-core --test combat_flow`

use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rpg_core::combat::{flee_chance, CombatAction, CombatEngine, CombatOutcome};
use rpg_core::dice::{damage_after_defense, resolve_attack_with_rng, roll_with_rng, AttackProfile};
use rpg_core::world::{Attributes, Character, Enemy};
use rpg_core::worldgen;

fn setup() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn strong_hero() -> Character {
    Character::new("Brute").with_attributes(Attributes {
        strength: 14,
        ..Default::default()
    })
}

fn basic_attack(target: &str) -> CombatAction {
    CombatAction::Attack {
        target: target.to_string(),
        profile: AttackProfile::Basic,
    }
}

// =============================================================================
// Damage bands
// =============================================================================

#[test]
fn test_basic_hit_damage_band_against_light_armor() {
    setup();
    let hero = strong_hero();
    let stats = hero.combat_stats();
    assert_eq!(stats.power, 2);

    let target = Enemy::new("Bandit", 1).with_defense(1).with_evasion(0);
    let mut rng = StdRng::seed_from_u64(11);
    let mut engine = CombatEngine::new(StdRng::seed_from_u64(12));
    let mut hits = 0;

    for _ in 0..500 {
        let base = roll_with_rng(1, 6, stats.power, &mut rng).total;
        assert!((3..=8).contains(&base));
        let strike = engine.strike(&stats, &target.combat_stats(), base);
        if strike.hit && !strike.critical {
            hits += 1;
            let dealt = damage_after_defense(strike.raw, target.defense);
            assert!((2..=7).contains(&dealt), "dealt {dealt}");
        }
    }
    assert!(hits > 300);
}

#[test]
fn test_profile_hits_never_deal_zero() {
    setup();
    let hero = strong_hero();
    let fortress = Enemy::new("Golem", 5).with_defense(50);
    let mut rng = StdRng::seed_from_u64(5);

    for profile in [AttackProfile::Light, AttackProfile::Heavy] {
        for _ in 0..200 {
            let roll = resolve_attack_with_rng(&hero.combat_stats(), &fortress.combat_stats(), profile, &mut rng);
            if roll.hit {
                assert_eq!(roll.damage, 1);
            }
        }
    }
}

// =============================================================================
// Full encounters
// =============================================================================

#[test]
fn test_encounters_always_terminate_cleanly() {
    setup();
    for seed in 0..20 {
        let mut engine = CombatEngine::new(StdRng::seed_from_u64(seed));
        let mut hero = strong_hero();
        let enemies = vec![
            worldgen::enemy_of_type("Goblin", 1),
            worldgen::enemy_of_type("Wolf", 1),
        ];
        let mut session = engine.initiate(&hero, enemies);
        let gold = hero.gold;

        let mut outcome = CombatOutcome::Ongoing;
        let mut victories = 0;
        for _ in 0..200 {
            let target = session
                .first_living()
                .map(|i| session.enemies[i].name.clone())
                .unwrap_or_default();
            let result = engine.resolve_round(&mut hero, &mut session, basic_attack(&target));
            assert!(result.success);
            assert!(hero.current_hp >= 0);
            assert!(session.enemies.iter().all(|e| e.current_hp >= 0));
            outcome = result.outcome;
            if outcome == CombatOutcome::Victory {
                victories += 1;
                assert!(result.rewards.is_some());
            }
            if outcome.is_over() {
                break;
            }
        }

        assert!(outcome.is_over(), "seed {seed} never finished");
        match outcome {
            CombatOutcome::Victory => {
                assert_eq!(victories, 1);
                assert!(session.all_enemies_defeated());
                assert!(hero.experience > 0 || hero.level > 1);
                assert!(hero.gold >= gold);

                let again = engine.resolve_round(&mut hero, &mut session, basic_attack("Goblin"));
                assert_eq!(again.outcome, CombatOutcome::Victory);
                assert!(again.rewards.is_none());
            }
            CombatOutcome::Defeat => assert!(hero.is_defeated()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[test]
fn test_killing_blow_pays_once() {
    setup();
    let mut engine = CombatEngine::new(StepRng::new(0, 0));
    let mut hero = Character::new("Finisher");
    let foe = Enemy::new("Brigand", 1)
        .with_health(10)
        .with_defense(2)
        .with_rewards(40, (7, 7));
    let mut session = engine.initiate(&hero, vec![foe]);

    assert_eq!(session.enemies[0].take_damage(15), 13);
    assert_eq!(session.enemies[0].current_hp, 0);

    let result = engine.resolve_round(&mut hero, &mut session, basic_attack("Brigand"));
    assert_eq!(result.outcome, CombatOutcome::Victory);
    let rewards = result.rewards.expect("rewards on first victory");
    assert_eq!(rewards.experience, 40);
    assert_eq!(rewards.gold, 7);
    assert_eq!(hero.gold, 57);
    assert_eq!(hero.experience, 40);

    let again = engine.resolve_round(&mut hero, &mut session, basic_attack("Brigand"));
    assert!(again.rewards.is_none());
    assert_eq!(hero.gold, 57);
    assert_eq!(hero.experience, 40);
}

#[test]
fn test_skills_target_the_named_enemy() {
    setup();
    let mut engine = CombatEngine::new(StepRng::new(0, 0));
    let mut hero = Character::new("Bruiser").with_skill("bash");
    let mut session = engine.initiate(&hero, vec![Enemy::new("Rat", 1), Enemy::new("Wolf", 2)]);
    let stamina = hero.current_stamina;

    let result = engine.resolve_round(
        &mut hero,
        &mut session,
        CombatAction::Skill {
            skill: "bash".to_string(),
            target: Some("wolf".to_string()),
        },
    );

    assert!(result.success);
    assert_eq!(session.enemies[0].current_hp, 20);
    assert_eq!(session.enemies[1].current_hp, 10);
    assert_eq!(hero.current_stamina, stamina - 3);
    assert_eq!(session.round, 2);
}

#[test]
fn test_invalid_target_changes_nothing() {
    setup();
    let mut engine = CombatEngine::new(StepRng::new(0, 0));
    let mut hero = Character::new("Confused");
    let mut session = engine.initiate(&hero, vec![Enemy::new("Rat", 1)]);
    let log_len = session.log.len();

    let result = engine.resolve_round(&mut hero, &mut session, basic_attack("dragon"));

    assert!(!result.success);
    assert_eq!(result.outcome, CombatOutcome::Ongoing);
    assert_eq!(session.round, 1);
    assert_eq!(session.log.len(), log_len);
    assert_eq!(hero.current_hp, hero.max_hp);
}

#[test]
fn test_flee_chance_bounds() {
    setup();
    let mut engine = CombatEngine::new(StepRng::new(0, 0));
    let hero = Character::new("Average");
    let easy = engine.initiate(&hero, vec![Enemy::new("Rat", 1)]);
    let hard = engine.initiate(&hero, vec![Enemy::new("Dragon", 30)]);

    assert!((flee_chance(&hero, &easy) - 0.4).abs() < 1e-9);
    assert!((flee_chance(&hero, &hard) - 0.1).abs() < 1e-9);
}
