#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Projectile simulation: turns tower targets into shots and resolves their hits.
//!
//! Ballistic shots become [`Projectile`] values that fly a little further
//! every frame. Instant shots (beams and chains) resolve on the frame they are
//! fired. Every damage application and status change is reported as an
//! [`Event`] so presentation can play effects without reaching into the world.

mod impact;
pub mod projectile;

use conquer_core::{Delivery, EnemyId, Event, ProjectileId, TowerTarget, Vec2};
use conquer_world::CombatScene;
use log::trace;
use serde::Deserialize;

use crate::{
    impact::ImpactScratch,
    projectile::{distance_to_segment, lead_target, Shot},
};

pub use projectile::Projectile;

/// Tunables for projectile flight.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// How strongly homing projectiles turn toward their target, per second.
    pub homing_strength: f32,
    /// Maximum flight distance as a multiple of the firing tower's range.
    pub max_travel_factor: f32,
    /// Whether non-homing projectiles aim at the predicted target position.
    pub lead_targets: bool,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            homing_strength: 6.0,
            max_travel_factor: 1.5,
            lead_targets: true,
        }
    }
}

/// Splash damage at `distance` from the impact of a blast with the given radius.
///
/// Falls off linearly from full damage at the centre to half damage at the
/// edge; enemies beyond the radius take nothing.
#[must_use]
pub fn splash_damage(damage: f32, distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || !(0.0..=radius).contains(&distance) {
        return 0.0;
    }
    damage * (1.0 - distance / radius * 0.5)
}

/// Tower combat system that fires ready towers and advances their projectiles.
#[derive(Debug, Default)]
pub struct TowerCombat {
    tuning: CombatTuning,
    projectiles: Vec<Projectile>,
    next_projectile: u32,
    scratch: ImpactScratch,
}

impl TowerCombat {
    /// Creates a combat system with the provided tuning.
    #[must_use]
    pub fn new(tuning: CombatTuning) -> Self {
        Self {
            tuning,
            ..Self::default()
        }
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Drops every projectile in flight.
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }

    /// Fires every assigned tower whose cooldown has elapsed.
    ///
    /// A tower fires at most once per call and only if its target is still
    /// active. Ballistic shots spawn projectiles; instant shots resolve
    /// immediately.
    pub fn fire(
        &mut self,
        scene: &mut CombatScene<'_>,
        targets: &[TowerTarget],
        out: &mut Vec<Event>,
    ) {
        let now = scene.now;

        for assignment in targets {
            let Some(tower) = scene.towers.get_mut(assignment.tower) else {
                continue;
            };
            if !tower.ready_to_fire(now) {
                continue;
            }
            let Some((target_position, target_velocity)) = scene
                .enemies
                .get(assignment.enemy)
                .filter(|enemy| enemy.is_active())
                .map(|enemy| (enemy.position(), enemy.velocity()))
            else {
                continue;
            };

            tower.mark_fired(now);
            let shot = Shot {
                tower: tower.id(),
                origin: tower.position(),
                range: tower.range(),
                damage: tower.profile().damage,
                attack: tower.profile().attack,
            };

            match shot.attack.delivery {
                Delivery::Ballistic {
                    speed,
                    homing,
                    piercing,
                } => {
                    let id = ProjectileId::new(self.next_projectile);
                    self.next_projectile = self.next_projectile.wrapping_add(1);
                    let aim = if homing || !self.tuning.lead_targets {
                        target_position
                    } else {
                        lead_target(shot.origin, target_position, target_velocity, speed)
                    };
                    self.projectiles.push(Projectile::launch(
                        id,
                        shot,
                        assignment.enemy,
                        aim,
                        speed,
                        homing,
                        piercing,
                        shot.range * self.tuning.max_travel_factor,
                    ));
                    out.push(Event::ProjectileFired {
                        projectile: Some(id),
                        tower: shot.tower,
                        target: assignment.enemy,
                        position: shot.origin,
                    });
                }
                Delivery::Instant => {
                    out.push(Event::ProjectileFired {
                        projectile: None,
                        tower: shot.tower,
                        target: assignment.enemy,
                        position: shot.origin,
                    });
                    match shot.attack.chain {
                        Some(chain) => impact::resolve_chain(
                            &shot,
                            chain,
                            assignment.enemy,
                            scene.enemies,
                            scene.index,
                            now,
                            &mut self.scratch,
                            out,
                        ),
                        None => impact::resolve_impact(
                            &shot,
                            assignment.enemy,
                            target_position,
                            scene.enemies,
                            scene.index,
                            now,
                            &mut self.scratch,
                            out,
                        ),
                    }
                }
            }
        }
    }

    /// Advances every projectile by `dt` seconds and resolves hits and misses.
    ///
    /// Non-piercing projectiles deactivate after their first hit or when their
    /// target disappears. Piercing projectiles remember whom they struck and
    /// pick the nearest unstruck enemy inside the firing tower's range as
    /// their next target. Projectiles that exceed their maximum travel
    /// distance deactivate.
    pub fn advance(&mut self, scene: &mut CombatScene<'_>, dt: f32, out: &mut Vec<Event>) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let mut projectiles = std::mem::take(&mut self.projectiles);
        for projectile in &mut projectiles {
            self.step(projectile, scene, dt, out);
        }
        projectiles.retain(Projectile::is_active);
        self.projectiles = projectiles;
    }

    fn step(
        &mut self,
        projectile: &mut Projectile,
        scene: &mut CombatScene<'_>,
        dt: f32,
        out: &mut Vec<Event>,
    ) {
        let tracked = projectile
            .target()
            .and_then(|id| scene.enemies.get(id))
            .filter(|enemy| enemy.is_active())
            .map(|enemy| (enemy.id(), enemy.position(), enemy.hit_radius()));
        let tracked = match tracked {
            Some(found) => Some(found),
            None if projectile.is_piercing() => self.reacquire(projectile, scene),
            None => None,
        };

        let Some((target, target_position, hit_radius)) = tracked else {
            Self::retire(projectile, out);
            return;
        };
        projectile.retarget(Some(target));

        if projectile.is_homing() {
            projectile.steer(target_position, self.tuning.homing_strength * dt);
        }
        let (start, end) = projectile.travel(dt);

        if distance_to_segment(target_position, start, end) <= hit_radius {
            trace!("projectile {} struck enemy {}", projectile.id().get(), target.get());
            impact::resolve_impact(
                projectile.shot(),
                target,
                target_position,
                scene.enemies,
                scene.index,
                scene.now,
                &mut self.scratch,
                out,
            );
            projectile.record_hit(target);

            if !projectile.is_piercing() {
                projectile.expire();
                return;
            }
            projectile.retarget(None);
        }

        if projectile.exceeded_range() {
            Self::retire(projectile, out);
        }
    }

    fn reacquire(
        &mut self,
        projectile: &Projectile,
        scene: &CombatScene<'_>,
    ) -> Option<(EnemyId, Vec2, f32)> {
        let shot = projectile.shot();
        scene
            .index
            .query_radius_into(shot.origin, shot.range, &mut self.scratch.nearby);

        let mut best: Option<(EnemyId, Vec2, f32, f32)> = None;
        for &(id, _) in &self.scratch.nearby {
            if projectile.struck().contains(&id) {
                continue;
            }
            let Some(enemy) = scene.enemies.get(id).filter(|enemy| enemy.is_active()) else {
                continue;
            };
            let distance = enemy.position().distance(projectile.position());
            if best.map_or(true, |(_, _, _, closest)| distance < closest) {
                best = Some((id, enemy.position(), enemy.hit_radius(), distance));
            }
        }

        best.map(|(id, position, radius, _)| (id, position, radius))
    }

    fn retire(projectile: &mut Projectile, out: &mut Vec<Event>) {
        projectile.expire();
        if projectile.struck().is_empty() {
            out.push(Event::ProjectileMissed {
                projectile: projectile.id(),
                position: projectile.position(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splash_is_full_at_centre_and_half_at_edge() {
        assert_eq!(splash_damage(40.0, 0.0, 3.0), 40.0);
        assert_eq!(splash_damage(40.0, 3.0, 3.0), 20.0);
        assert!((splash_damage(40.0, 1.5, 3.0) - 30.0).abs() < 1e-5);
        assert_eq!(splash_damage(40.0, 3.01, 3.0), 0.0);
        assert_eq!(splash_damage(40.0, 1.0, 0.0), 0.0);
    }
}
