use conquer_core::{EnemyKind, Event, WaveArchetype};
use conquer_session::{Session, SessionConfig};
use conquer_system_difficulty::{DifficultyDirector, PlayerSnapshot};
use conquer_system_opponent::{AdaptiveOpponent, OpponentTuning};

const FRAME: f32 = 0.05;

fn seeded_config(seed: u64) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.reseed(seed);
    config
}

fn replay(seed: u64, waves: u32) -> Vec<Event> {
    let config = seeded_config(seed);
    let opponent = AdaptiveOpponent::new(OpponentTuning {
        exploration_rate: 0.5,
        ..config.opponent.clone()
    });
    let mut session = Session::new(config).with_opponent(opponent);
    let mut recorded = Vec::new();

    for _ in 0..waves {
        if session.start_wave().is_none() {
            break;
        }
        for _ in 0..6_000 {
            recorded.extend_from_slice(session.update(FRAME));
            if session.active_wave().is_none() {
                break;
            }
        }
    }
    recorded
}

#[test]
fn identical_seeds_replay_identically() {
    let first = replay(0x00c0_ffee, 3);
    let second = replay(0x00c0_ffee, 3);

    assert!(!first.is_empty());
    assert_eq!(first, second, "replay diverged between runs");

    let completed = first
        .iter()
        .filter(|event| matches!(event, Event::WaveCompleted { .. }))
        .count();
    let lost = first
        .iter()
        .any(|event| matches!(event, Event::GameOver { won: false }));
    assert!(completed == 3 || lost, "waves neither completed nor lost");
}

#[test]
fn tenth_wave_on_a_fresh_director_is_a_mega_boss() {
    for seed in [1, 7, 0xdead_beef] {
        let config = seeded_config(seed);
        let mut director = DifficultyDirector::new(config.difficulty);
        let plan = director.plan_wave(10, &PlayerSnapshot::default());

        assert_eq!(plan.archetype(), WaveArchetype::MegaBoss);
        assert_eq!(plan.archetype().to_string(), "megaBoss");
        assert!(plan
            .groups()
            .iter()
            .any(|group| group.kind == EnemyKind::Boss && group.count == 2));
    }
}

#[test]
fn every_planned_enemy_is_spawned_or_reported_blocked() {
    let mut session = Session::new(seeded_config(42));
    let plan = session.start_wave().expect("first wave starts");
    let mut spawned = 0;

    for _ in 0..6_000 {
        spawned += session
            .update(FRAME)
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::EnemySpawned { .. } | Event::EnemySpawnBlocked { .. }
                )
            })
            .count();
        if session.active_wave().is_none() {
            break;
        }
    }

    assert_eq!(spawned as u32, plan.total_enemies());
}
