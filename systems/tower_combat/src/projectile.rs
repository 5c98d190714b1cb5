//! In-flight projectile state and kinematics.

use conquer_core::{AttackProfile, EnemyId, ProjectileId, TowerId, Vec2};

/// Firing tower's payload captured at the moment of the shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    /// Tower credited with the shot.
    pub tower: TowerId,
    /// World-space position of the tower.
    pub origin: Vec2,
    /// Targeting radius of the tower.
    pub range: f32,
    /// Base damage of the shot.
    pub damage: f32,
    /// Delivery and on-hit payload.
    pub attack: AttackProfile,
}

/// Ballistic projectile travelling toward an enemy.
#[derive(Clone, Debug)]
pub struct Projectile {
    id: ProjectileId,
    shot: Shot,
    position: Vec2,
    velocity: Vec2,
    speed: f32,
    homing: bool,
    piercing: bool,
    target: Option<EnemyId>,
    struck: Vec<EnemyId>,
    travelled: f32,
    max_travel: f32,
    active: bool,
}

impl Projectile {
    /// Launches a projectile from the shot origin toward `aim`.
    #[must_use]
    pub fn launch(
        id: ProjectileId,
        shot: Shot,
        target: EnemyId,
        aim: Vec2,
        speed: f32,
        homing: bool,
        piercing: bool,
        max_travel: f32,
    ) -> Self {
        let speed = speed.max(0.0);
        Self {
            id,
            shot,
            position: shot.origin,
            velocity: (aim - shot.origin).normalize_or_zero() * speed,
            speed,
            homing,
            piercing,
            target: Some(target),
            struck: Vec::new(),
            travelled: 0.0,
            max_travel: max_travel.max(0.0),
            active: true,
        }
    }

    /// Identifier of the projectile.
    #[must_use]
    pub fn id(&self) -> ProjectileId {
        self.id
    }

    /// Payload of the shot.
    #[must_use]
    pub fn shot(&self) -> &Shot {
        &self.shot
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Current velocity in world units per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Enemy the projectile is tracking, if any.
    #[must_use]
    pub fn target(&self) -> Option<EnemyId> {
        self.target
    }

    /// Whether the projectile keeps flying after a hit.
    #[must_use]
    pub fn is_piercing(&self) -> bool {
        self.piercing
    }

    /// Whether the projectile steers toward its target.
    #[must_use]
    pub fn is_homing(&self) -> bool {
        self.homing
    }

    /// Distance flown since launch.
    #[must_use]
    pub fn travelled(&self) -> f32 {
        self.travelled
    }

    /// Whether the projectile is still in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enemies this projectile already struck.
    #[must_use]
    pub fn struck(&self) -> &[EnemyId] {
        &self.struck
    }

    pub(crate) fn retarget(&mut self, target: Option<EnemyId>) {
        self.target = target;
    }

    pub(crate) fn record_hit(&mut self, enemy: EnemyId) {
        self.struck.push(enemy);
    }

    pub(crate) fn expire(&mut self) {
        self.active = false;
    }

    pub(crate) fn exceeded_range(&self) -> bool {
        self.travelled >= self.max_travel
    }

    /// Blends the velocity toward the target and restores the configured speed.
    pub(crate) fn steer(&mut self, toward: Vec2, blend: f32) {
        let desired = (toward - self.position).normalize_or_zero() * self.speed;
        if desired == Vec2::ZERO {
            return;
        }

        let blended = self.velocity.lerp(desired, blend.clamp(0.0, 1.0));
        let direction = blended.normalize_or_zero();
        self.velocity = if direction == Vec2::ZERO {
            desired
        } else {
            direction * self.speed
        };
    }

    /// Moves the projectile and returns the segment it swept.
    pub(crate) fn travel(&mut self, dt: f32) -> (Vec2, Vec2) {
        let start = self.position;
        let step = self.velocity * dt;
        self.position += step;
        self.travelled += step.length();
        (start, self.position)
    }
}

/// Shortest distance between `point` and the segment `start..end`.
pub(crate) fn distance_to_segment(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f32::EPSILON {
        return point.distance(start);
    }

    let t = ((point - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Predicts where a moving target will be when a projectile fired now reaches it.
pub(crate) fn lead_target(origin: Vec2, target: Vec2, target_velocity: Vec2, speed: f32) -> Vec2 {
    if speed <= 0.0 {
        return target;
    }

    let mut aim = target;
    for _ in 0..2 {
        let flight_time = origin.distance(aim) / speed;
        aim = target + target_velocity * flight_time;
    }
    aim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steering_never_changes_speed() {
        let shot = Shot {
            tower: TowerId::new(0),
            origin: Vec2::ZERO,
            range: 10.0,
            damage: 1.0,
            attack: conquer_core::TowerKind::Missile.profile().attack,
        };
        let mut projectile = Projectile::launch(
            ProjectileId::new(0),
            shot,
            EnemyId::new(0),
            Vec2::X,
            12.0,
            true,
            false,
            10.0,
        );

        for blend in [0.1, 0.5, 1.0, 3.0] {
            projectile.steer(Vec2::new(-3.0, 4.0), blend);
            assert!((projectile.velocity().length() - 12.0).abs() < 1e-4);
        }
    }

    #[test]
    fn segment_distance_catches_overshoot() {
        let distance = distance_to_segment(Vec2::new(5.0, 0.3), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((distance - 0.3).abs() < 1e-6);
        assert!((distance_to_segment(Vec2::new(-2.0, 0.0), Vec2::ZERO, Vec2::X) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn stationary_targets_are_aimed_at_directly() {
        let aim = lead_target(Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::ZERO, 20.0);
        assert_eq!(aim, Vec2::new(4.0, 0.0));

        let led = lead_target(Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::new(0.0, 2.0), 20.0);
        assert!(led.y > 0.0);
    }
}
