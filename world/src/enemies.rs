//! Enemy state, status effects and route following.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use conquer_core::{BurnEffect, CellCoord, EnemyId, EnemyKind, EnemyProfile, SlowEffect, Vec2};

const BURN_PERIOD: Duration = Duration::from_secs(1);

/// Single step of an enemy route expressed in both grid and world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    /// Full-grid cell of the waypoint.
    pub cell: CellCoord,
    /// World-space centre of the cell.
    pub position: Vec2,
}

/// Lifecycle stage of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyState {
    /// Walking and targetable.
    Active,
    /// Health reached zero; awaiting culling.
    Dead,
    /// Reached the destination; awaiting culling.
    Escaped,
}

/// Result of applying damage to an enemy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DamageOutcome {
    /// Damage that landed after armor, split across shield and health.
    pub dealt: f32,
    /// Whether this application killed the enemy.
    pub killed: bool,
}

#[derive(Clone, Copy, Debug)]
struct ActiveSlow {
    amount: f32,
    expires_at: Duration,
}

#[derive(Clone, Copy, Debug)]
struct ActiveBurn {
    damage_per_second: f32,
    next_tick: Duration,
    expires_at: Duration,
}

/// Authoritative state of a single enemy.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    profile: EnemyProfile,
    health: f32,
    shield: f32,
    position: Vec2,
    cell: CellCoord,
    route: VecDeque<Waypoint>,
    remaining_distance: f32,
    travelled: f32,
    slow: Option<ActiveSlow>,
    burn: Option<ActiveBurn>,
    stunned_until: Option<Duration>,
    state: EnemyState,
    stuck: bool,
}

impl Enemy {
    /// Creates an enemy using the stock profile of its kind.
    #[must_use]
    pub fn new(id: EnemyId, kind: EnemyKind, cell: CellCoord, position: Vec2) -> Self {
        Self::from_profile(id, kind, kind.profile(), cell, position)
    }

    /// Creates an enemy with an explicit stat block.
    #[must_use]
    pub fn from_profile(
        id: EnemyId,
        kind: EnemyKind,
        profile: EnemyProfile,
        cell: CellCoord,
        position: Vec2,
    ) -> Self {
        let max_health = profile.max_health.max(0.0);
        Self {
            id,
            kind,
            profile: EnemyProfile {
                max_health,
                ..profile
            },
            health: max_health,
            shield: profile.shield.max(0.0),
            position,
            cell,
            route: VecDeque::new(),
            remaining_distance: 0.0,
            travelled: 0.0,
            slow: None,
            burn: None,
            stunned_until: None,
            state: EnemyState::Active,
            stuck: false,
        }
    }

    /// Identifier of the enemy.
    #[must_use]
    pub fn id(&self) -> EnemyId {
        self.id
    }

    /// Kind of the enemy.
    #[must_use]
    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Stat block the enemy was created with.
    #[must_use]
    pub fn profile(&self) -> &EnemyProfile {
        &self.profile
    }

    /// Current health; never exceeds [`Enemy::max_health`].
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Health at spawn.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.profile.max_health
    }

    /// Remaining shield pool.
    #[must_use]
    pub fn shield(&self) -> f32 {
        self.shield
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Full-grid cell most recently reached.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Whether boss targeting should prefer this enemy.
    #[must_use]
    pub fn is_boss(&self) -> bool {
        self.profile.is_boss
    }

    /// Radius within which a projectile counts as a hit.
    #[must_use]
    pub fn hit_radius(&self) -> f32 {
        self.profile.scale.max(0.1) * 0.5
    }

    /// Lifecycle stage of the enemy.
    #[must_use]
    pub fn state(&self) -> EnemyState {
        self.state
    }

    /// Whether the enemy can still be targeted and moved.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == EnemyState::Active
    }

    /// Whether the enemy died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    /// Whether the enemy is waiting for a route to reopen.
    #[must_use]
    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// Distance left to walk along the current route.
    #[must_use]
    pub fn remaining_distance(&self) -> f32 {
        self.remaining_distance
    }

    /// Distance walked since spawning.
    #[must_use]
    pub fn distance_travelled(&self) -> f32 {
        self.travelled
    }

    /// Waypoints still ahead of the enemy.
    pub fn route(&self) -> impl Iterator<Item = &Waypoint> {
        self.route.iter()
    }

    /// Reports whether the remaining route passes through a full-grid cell.
    #[must_use]
    pub fn route_contains(&self, cell: CellCoord) -> bool {
        self.route.iter().any(|waypoint| waypoint.cell == cell)
    }

    /// Movement speed after slows and stuns.
    #[must_use]
    pub fn current_speed(&self) -> f32 {
        if self.stunned_until.is_some() {
            return 0.0;
        }
        let slow = self.slow.map_or(0.0, |slow| slow.amount);
        self.profile.speed * (1.0 - slow)
    }

    /// Instantaneous velocity toward the next waypoint.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        if !self.is_active() {
            return Vec2::ZERO;
        }
        self.route.front().map_or(Vec2::ZERO, |next| {
            (next.position - self.position).normalize_or_zero() * self.current_speed()
        })
    }

    /// Whether a slow is currently applied.
    #[must_use]
    pub fn is_slowed(&self) -> bool {
        self.slow.is_some()
    }

    /// Whether a burn is currently applied.
    #[must_use]
    pub fn is_burning(&self) -> bool {
        self.burn.is_some()
    }

    /// Replaces the remaining route and clears the stuck flag.
    pub fn set_route<I>(&mut self, waypoints: I)
    where
        I: IntoIterator<Item = Waypoint>,
    {
        self.route = waypoints.into_iter().collect();
        self.stuck = false;
        self.recompute_remaining();
    }

    /// Drops the route and flags the enemy as waiting for one.
    ///
    /// The last known remaining distance is kept so progress-based targeting
    /// still orders stuck enemies sensibly.
    pub fn mark_stuck(&mut self) {
        self.route.clear();
        self.stuck = true;
    }

    /// Applies combat damage: armor first, then shield, then health.
    ///
    /// Returns the damage that landed and whether this application was the
    /// killing blow. Inactive enemies ignore damage.
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_active() || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome::default();
        }

        let mitigated = amount * (1.0 - self.profile.armor.clamp(0.0, 1.0));
        let absorbed = mitigated.min(self.shield);
        self.shield -= absorbed;
        self.apply_health_loss(mitigated - absorbed);

        DamageOutcome {
            dealt: mitigated,
            killed: self.is_dead(),
        }
    }

    /// Applies damage that bypasses armor and shields.
    pub fn apply_true_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_active() || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome::default();
        }

        self.apply_health_loss(amount);
        DamageOutcome {
            dealt: amount,
            killed: self.is_dead(),
        }
    }

    fn apply_health_loss(&mut self, amount: f32) {
        self.health = (self.health - amount).clamp(0.0, self.profile.max_health);
        if self.health <= 0.0 {
            self.state = EnemyState::Dead;
            self.route.clear();
        }
    }

    /// Applies a slow, keeping the stronger of the existing and new amount and refreshing its expiry.
    ///
    /// Returns the slow amount now in effect.
    pub fn apply_slow(&mut self, effect: SlowEffect, now: Duration) -> f32 {
        let incoming = effect.amount.clamp(0.0, 1.0);
        let amount = self
            .slow
            .map_or(incoming, |existing| existing.amount.max(incoming));
        self.slow = Some(ActiveSlow {
            amount,
            expires_at: now.saturating_add(effect.duration),
        });
        amount
    }

    /// Applies a burn, keeping the stronger damage rate and refreshing its expiry.
    ///
    /// The first tick lands one second after application. Returns the burn rate now in effect.
    pub fn apply_burn(&mut self, effect: BurnEffect, now: Duration) -> f32 {
        let incoming = effect.damage_per_second.max(0.0);
        let (damage_per_second, next_tick) = match self.burn {
            Some(existing) => (existing.damage_per_second.max(incoming), existing.next_tick),
            None => (incoming, now.saturating_add(BURN_PERIOD)),
        };
        self.burn = Some(ActiveBurn {
            damage_per_second,
            next_tick,
            expires_at: now.saturating_add(effect.duration),
        });
        damage_per_second
    }

    /// Halts movement until the provided duration has elapsed.
    pub fn apply_stun(&mut self, duration: Duration, now: Duration) {
        let expires_at = now.saturating_add(duration);
        self.stunned_until = Some(
            self.stunned_until
                .map_or(expires_at, |existing| existing.max(expires_at)),
        );
    }

    /// Resolves burn ticks that are due and clears expired effects.
    ///
    /// Burn damage lands once per whole second while the effect is active.
    /// Returns the burn damage dealt during this call.
    pub fn tick_status(&mut self, now: Duration) -> DamageOutcome {
        let mut total = DamageOutcome::default();

        if let Some(mut burn) = self.burn {
            while burn.next_tick <= now && burn.next_tick <= burn.expires_at && self.is_active() {
                let outcome = self.apply_true_damage(burn.damage_per_second);
                total.dealt += outcome.dealt;
                total.killed |= outcome.killed;
                burn.next_tick = burn.next_tick.saturating_add(BURN_PERIOD);
            }
            self.burn = (now < burn.expires_at && self.is_active()).then_some(burn);
        }

        if self.slow.is_some_and(|slow| now >= slow.expires_at) {
            self.slow = None;
        }

        if self.stunned_until.is_some_and(|until| now >= until) {
            self.stunned_until = None;
        }

        total
    }

    /// Walks along the route for `dt` seconds at the current speed.
    ///
    /// Returns the distance covered.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if !self.is_active() || !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }

        let mut budget = self.current_speed() * dt;
        let mut moved = 0.0;

        while budget > 0.0 {
            let Some(next) = self.route.front().copied() else {
                break;
            };

            let to_next = next.position - self.position;
            let distance = to_next.length();
            if distance <= budget {
                self.position = next.position;
                self.cell = next.cell;
                let _ = self.route.pop_front();
                budget -= distance;
                moved += distance;
            } else {
                self.position += to_next / distance * budget;
                moved += budget;
                budget = 0.0;
            }
        }

        self.travelled += moved;
        self.recompute_remaining();
        moved
    }

    /// Whether the enemy has consumed its route and stands on the provided cell.
    #[must_use]
    pub fn has_arrived(&self, destination: CellCoord) -> bool {
        self.route.is_empty() && self.cell == destination
    }

    /// Flags the enemy as having escaped through the destination.
    pub fn mark_escaped(&mut self) {
        if self.is_active() {
            self.state = EnemyState::Escaped;
            self.route.clear();
        }
    }

    fn recompute_remaining(&mut self) {
        if self.stuck {
            return;
        }

        let mut total = 0.0;
        let mut cursor = self.position;
        for waypoint in &self.route {
            total += cursor.distance(waypoint.position);
            cursor = waypoint.position;
        }
        self.remaining_distance = total;
    }
}

/// Collection of enemies keyed by identifier in spawn order.
#[derive(Clone, Debug, Default)]
pub struct EnemyRoster {
    entries: BTreeMap<EnemyId, Enemy>,
    next_id: u32,
}

impl EnemyRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns an enemy with the stock profile of its kind.
    pub fn spawn(&mut self, kind: EnemyKind, cell: CellCoord, position: Vec2) -> EnemyId {
        self.spawn_with_profile(kind, kind.profile(), cell, position)
    }

    /// Spawns an enemy with an explicit stat block.
    pub fn spawn_with_profile(
        &mut self,
        kind: EnemyKind,
        profile: EnemyProfile,
        cell: CellCoord,
        position: Vec2,
    ) -> EnemyId {
        let id = EnemyId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self
            .entries
            .insert(id, Enemy::from_profile(id, kind, profile, cell, position));
        id
    }

    /// Looks up an enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.entries.get(&id)
    }

    /// Looks up an enemy mutably.
    pub fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.entries.get_mut(&id)
    }

    /// Iterates over enemies in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.entries.values()
    }

    /// Iterates mutably over enemies in ascending identifier order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.entries.values_mut()
    }

    /// Number of enemies, culled ones excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of enemies that are still walking.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|enemy| enemy.is_active()).count()
    }

    /// Removes every enemy that is no longer active and returns their identifiers.
    pub fn remove_inactive(&mut self) -> Vec<EnemyId> {
        let removed: Vec<EnemyId> = self
            .entries
            .values()
            .filter(|enemy| !enemy.is_active())
            .map(Enemy::id)
            .collect();
        for id in &removed {
            let _ = self.entries.remove(id);
        }
        removed
    }
}
