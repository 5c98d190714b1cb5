use std::time::Duration;

use conquer_core::{
    AttackProfile, CellCoord, ChainEffect, Delivery, EnemyId, EnemyKind, EnemyProfile, Event,
    StatusKind, TowerId, TowerKind, TowerProfile, TowerTarget, Vec2,
};
use conquer_system_tower_combat::{CombatTuning, TowerCombat};
use conquer_world::{
    enemies::EnemyRoster, spatial::SpatialIndex, towers::TowerRegistry, CombatScene,
};

struct Arena {
    towers: TowerRegistry,
    enemies: EnemyRoster,
    index: SpatialIndex<EnemyId>,
    now: Duration,
}

impl Arena {
    fn new() -> Self {
        Self {
            towers: TowerRegistry::new(),
            enemies: EnemyRoster::new(),
            index: SpatialIndex::new(2.0),
            now: Duration::from_secs(10),
        }
    }

    fn tower(&mut self, profile: TowerProfile, position: Vec2) -> TowerId {
        self.towers
            .insert_with_profile(TowerKind::Bullet, profile, CellCoord::new(0, 0), position)
    }

    fn enemy(&mut self, position: Vec2, profile: EnemyProfile) -> EnemyId {
        let id = self
            .enemies
            .spawn_with_profile(EnemyKind::Basic, profile, CellCoord::new(0, 0), position);
        self.index.insert(id, position);
        id
    }

    fn scene(&mut self) -> CombatScene<'_> {
        CombatScene {
            now: self.now,
            towers: &mut self.towers,
            enemies: &mut self.enemies,
            index: &self.index,
        }
    }

    fn health(&self, id: EnemyId) -> f32 {
        self.enemies.get(id).map_or(f32::NAN, |enemy| enemy.health())
    }
}

fn sturdy() -> EnemyProfile {
    EnemyProfile {
        max_health: 1_000.0,
        armor: 0.0,
        shield: 0.0,
        ..EnemyKind::Basic.profile()
    }
}

fn instant(damage: f32) -> TowerProfile {
    TowerProfile {
        cost: 0,
        range: 10.0,
        damage,
        fire_rate: 1.0,
        attack: AttackProfile {
            delivery: Delivery::Instant,
            splash_radius: 0.0,
            slow: None,
            burn: None,
            chain: None,
            stun: None,
        },
    }
}

#[test]
fn chain_damage_falls_off_multiplicatively() {
    let mut arena = Arena::new();
    let mut profile = instant(100.0);
    profile.attack.chain = Some(ChainEffect {
        jumps: 3,
        range: 4.0,
        falloff: 0.2,
    });
    let tower = arena.tower(profile, Vec2::ZERO);
    let first = arena.enemy(Vec2::new(1.0, 0.0), sturdy());
    let second = arena.enemy(Vec2::new(3.0, 0.0), sturdy());
    let third = arena.enemy(Vec2::new(5.0, 0.0), sturdy());

    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();
    combat.fire(
        &mut arena.scene(),
        &[TowerTarget {
            tower,
            enemy: first,
        }],
        &mut events,
    );

    let jumps: Vec<(EnemyId, f32)> = events
        .iter()
        .filter_map(|event| match event {
            Event::ChainJump { enemy, damage, .. } => Some((*enemy, *damage)),
            _ => None,
        })
        .collect();
    let expected = [(first, 100.0), (second, 80.0), (third, 64.0)];
    assert_eq!(jumps.len(), expected.len());
    for ((enemy, damage), (expected_enemy, expected_damage)) in jumps.iter().zip(expected) {
        assert_eq!(*enemy, expected_enemy);
        assert!((damage - expected_damage).abs() < 1e-3, "{damage} vs {expected_damage}");
    }
    assert!((arena.health(third) - 936.0).abs() < 1e-3);
}

#[test]
fn chain_prefers_nearest_unstruck_enemy() {
    let mut arena = Arena::new();
    let mut profile = instant(10.0);
    profile.attack.chain = Some(ChainEffect {
        jumps: 1,
        range: 4.0,
        falloff: 0.2,
    });
    let tower = arena.tower(profile, Vec2::ZERO);
    let primary = arena.enemy(Vec2::new(2.0, 0.0), sturdy());
    let far = arena.enemy(Vec2::new(5.5, 0.0), sturdy());
    let near = arena.enemy(Vec2::new(2.0, 1.0), sturdy());

    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();
    combat.fire(
        &mut arena.scene(),
        &[TowerTarget {
            tower,
            enemy: primary,
        }],
        &mut events,
    );

    assert!(arena.health(near) < 1_000.0);
    assert_eq!(arena.health(far), 1_000.0);
}

#[test]
fn splash_is_half_at_the_edge_and_full_at_the_centre() {
    let mut arena = Arena::new();
    let mut profile = instant(40.0);
    profile.attack.splash_radius = 3.0;
    let tower = arena.tower(profile, Vec2::ZERO);
    let primary = arena.enemy(Vec2::new(4.0, 0.0), sturdy());
    let stacked = arena.enemy(Vec2::new(4.0, 0.0), sturdy());
    let edge = arena.enemy(Vec2::new(7.0, 0.0), sturdy());
    let outside = arena.enemy(Vec2::new(7.5, 0.0), sturdy());

    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();
    combat.fire(
        &mut arena.scene(),
        &[TowerTarget {
            tower,
            enemy: primary,
        }],
        &mut events,
    );

    assert!((arena.health(primary) - 960.0).abs() < 1e-4);
    assert!((arena.health(stacked) - 960.0).abs() < 1e-4);
    assert!((arena.health(edge) - 980.0).abs() < 1e-4);
    assert_eq!(arena.health(outside), 1_000.0);
}

#[test]
fn towers_respect_their_fire_interval() {
    let mut arena = Arena::new();
    let tower = arena.tower(instant(5.0), Vec2::ZERO);
    let enemy = arena.enemy(Vec2::new(1.0, 0.0), sturdy());
    let targets = [TowerTarget { tower, enemy }];
    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();

    combat.fire(&mut arena.scene(), &targets, &mut events);
    combat.fire(&mut arena.scene(), &targets, &mut events);
    arena.now += Duration::from_millis(999);
    combat.fire(&mut arena.scene(), &targets, &mut events);
    arena.now += Duration::from_millis(1);
    combat.fire(&mut arena.scene(), &targets, &mut events);

    let shots = events
        .iter()
        .filter(|event| matches!(event, Event::ProjectileFired { .. }))
        .count();
    assert_eq!(shots, 2);
    assert!((arena.health(enemy) - 990.0).abs() < 1e-4);
}

#[test]
fn ballistic_shot_hits_once_and_applies_slow() {
    let mut arena = Arena::new();
    let tower = arena.tower(TowerKind::Frost.profile(), Vec2::ZERO);
    let enemy = arena.enemy(Vec2::new(4.0, 0.0), sturdy());
    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();

    combat.fire(&mut arena.scene(), &[TowerTarget { tower, enemy }], &mut events);
    assert_eq!(combat.projectiles().len(), 1);

    for _ in 0..20 {
        combat.advance(&mut arena.scene(), 0.05, &mut events);
    }

    let hits = events
        .iter()
        .filter(|event| matches!(event, Event::ProjectileHit { .. }))
        .count();
    assert_eq!(hits, 1);
    assert!(combat.projectiles().is_empty());
    assert!(events.iter().any(|event| matches!(
        event,
        Event::StatusApplied {
            status: StatusKind::Slow,
            ..
        }
    )));
    assert!(arena.enemies.get(enemy).is_some_and(|enemy| enemy.is_slowed()));
}

#[test]
fn fast_projectiles_do_not_tunnel_through_targets() {
    let mut arena = Arena::new();
    let tower = arena.tower(TowerKind::Bullet.profile(), Vec2::ZERO);
    let enemy = arena.enemy(Vec2::new(3.0, 0.0), sturdy());
    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();

    combat.fire(&mut arena.scene(), &[TowerTarget { tower, enemy }], &mut events);
    combat.advance(&mut arena.scene(), 0.4, &mut events);

    assert!((arena.health(enemy) - 990.0).abs() < 1e-4);
}

#[test]
fn piercing_rounds_strike_each_enemy_once() {
    let mut arena = Arena::new();
    let tower = arena.tower(TowerKind::Sniper.profile(), Vec2::ZERO);
    let first = arena.enemy(Vec2::new(4.0, 0.0), sturdy());
    let second = arena.enemy(Vec2::new(8.0, 0.0), sturdy());
    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();

    combat.fire(
        &mut arena.scene(),
        &[TowerTarget {
            tower,
            enemy: first,
        }],
        &mut events,
    );
    for _ in 0..60 {
        combat.advance(&mut arena.scene(), 0.02, &mut events);
    }

    assert!((arena.health(first) - 940.0).abs() < 1e-3);
    assert!((arena.health(second) - 940.0).abs() < 1e-3);
}

#[test]
fn losing_the_target_is_reported_as_a_miss() {
    let mut arena = Arena::new();
    let tower = arena.tower(TowerKind::Bullet.profile(), Vec2::ZERO);
    let enemy = arena.enemy(Vec2::new(5.0, 0.0), sturdy());
    let mut combat = TowerCombat::new(CombatTuning::default());
    let mut events = Vec::new();

    combat.fire(&mut arena.scene(), &[TowerTarget { tower, enemy }], &mut events);
    let _ = arena
        .enemies
        .get_mut(enemy)
        .map(|target| target.apply_damage(5_000.0));
    combat.advance(&mut arena.scene(), 0.05, &mut events);

    assert!(combat.projectiles().is_empty());
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ProjectileMissed { .. })));
}
