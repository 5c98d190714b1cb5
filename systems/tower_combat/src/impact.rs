//! Damage and status resolution for hits, splashes and chains.

use std::time::Duration;

use conquer_core::{ChainEffect, EnemyId, Event, StatusKind, Vec2};
use conquer_world::{
    enemies::{DamageOutcome, Enemy, EnemyRoster},
    spatial::SpatialIndex,
};

use crate::{projectile::Shot, splash_damage};

/// Shared scratch space for impact resolution.
#[derive(Debug, Default)]
pub(crate) struct ImpactScratch {
    pub(crate) nearby: Vec<(EnemyId, f32)>,
    pub(crate) struck: Vec<EnemyId>,
}

/// Applies a direct hit on `primary`, then splash around `impact_at`, then status effects.
pub(crate) fn resolve_impact(
    shot: &Shot,
    primary: EnemyId,
    impact_at: Vec2,
    enemies: &mut EnemyRoster,
    index: &SpatialIndex<EnemyId>,
    now: Duration,
    scratch: &mut ImpactScratch,
    out: &mut Vec<Event>,
) {
    if let Some(enemy) = enemies.get_mut(primary) {
        let outcome = enemy.apply_damage(shot.damage);
        if outcome.dealt > 0.0 {
            out.push(Event::ProjectileHit {
                tower: shot.tower,
                enemy: primary,
                position: impact_at,
                damage: outcome.dealt,
            });
        }
        report_kill(enemy, outcome, out);
    }

    let radius = shot.attack.splash_radius;
    if radius > 0.0 {
        index.query_radius_into(impact_at, radius, &mut scratch.nearby);
        for &(id, distance) in &scratch.nearby {
            if id == primary {
                continue;
            }
            let Some(enemy) = enemies.get_mut(id) else {
                continue;
            };
            let outcome = enemy.apply_damage(splash_damage(shot.damage, distance, radius));
            if outcome.dealt > 0.0 {
                out.push(Event::SplashDamage {
                    tower: shot.tower,
                    enemy: id,
                    position: enemy.position(),
                    damage: outcome.dealt,
                });
            }
            report_kill(enemy, outcome, out);
        }
    }

    if let Some(enemy) = enemies.get_mut(primary) {
        apply_statuses(shot, enemy, now, out);
    }
}

/// Resolves an instant chain starting at `primary`.
///
/// Each hop strikes the nearest enemy within the chain range of the previous
/// target that has not been struck yet; equal distances resolve to the lower
/// identifier. Every hop multiplies the running damage by `1 - falloff`.
pub(crate) fn resolve_chain(
    shot: &Shot,
    chain: ChainEffect,
    primary: EnemyId,
    enemies: &mut EnemyRoster,
    index: &SpatialIndex<EnemyId>,
    now: Duration,
    scratch: &mut ImpactScratch,
    out: &mut Vec<Event>,
) {
    scratch.struck.clear();
    let retained = (1.0 - chain.falloff).clamp(0.0, 1.0);
    let mut damage = shot.damage;
    let mut current = primary;

    for jump in 0..=chain.jumps {
        let Some(enemy) = enemies.get_mut(current) else {
            break;
        };
        let position = enemy.position();
        let outcome = enemy.apply_damage(damage);
        out.push(Event::ChainJump {
            tower: shot.tower,
            enemy: current,
            jump,
            position,
            damage: outcome.dealt,
        });
        report_kill(enemy, outcome, out);
        apply_statuses(shot, enemy, now, out);
        scratch.struck.push(current);

        if jump == chain.jumps {
            break;
        }

        index.query_radius_into(position, chain.range, &mut scratch.nearby);
        let mut next: Option<(EnemyId, f32)> = None;
        for &(id, distance) in &scratch.nearby {
            if scratch.struck.contains(&id) || !enemies.get(id).is_some_and(Enemy::is_active) {
                continue;
            }
            if next.map_or(true, |(_, best)| distance < best) {
                next = Some((id, distance));
            }
        }

        let Some((next_id, _)) = next else {
            break;
        };
        current = next_id;
        damage *= retained;
    }
}

fn apply_statuses(shot: &Shot, enemy: &mut Enemy, now: Duration, out: &mut Vec<Event>) {
    if !enemy.is_active() {
        return;
    }

    let attack = &shot.attack;
    if let Some(slow) = attack.slow {
        let magnitude = enemy.apply_slow(slow, now);
        out.push(Event::StatusApplied {
            enemy: enemy.id(),
            status: StatusKind::Slow,
            magnitude,
            position: enemy.position(),
        });
    }

    if let Some(burn) = attack.burn {
        let magnitude = enemy.apply_burn(burn, now);
        out.push(Event::StatusApplied {
            enemy: enemy.id(),
            status: StatusKind::Burn,
            magnitude,
            position: enemy.position(),
        });
    }

    if let Some(stun) = attack.stun {
        enemy.apply_stun(stun, now);
        out.push(Event::StatusApplied {
            enemy: enemy.id(),
            status: StatusKind::Stun,
            magnitude: stun.as_secs_f32(),
            position: enemy.position(),
        });
    }
}

fn report_kill(enemy: &Enemy, outcome: DamageOutcome, out: &mut Vec<Event>) {
    if outcome.killed {
        out.push(Event::EnemyKilled {
            enemy: enemy.id(),
            kind: enemy.kind(),
            position: enemy.position(),
            bounty: enemy.profile().bounty,
        });
    }
}
