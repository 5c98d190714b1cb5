#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Code & Conquer simulation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the frame systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that a
//! presentation layer (or another system) consumes. Nothing in here renders,
//! plays sounds, or talks to a backend.

use std::{fmt, time::Duration};

pub use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a tower on a buildable cell.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell of the buildable sub-grid that should hold the tower.
        cell: CellCoord,
    },
    /// Requests removal of an existing tower from the world.
    RemoveTower {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
    },
    /// Requests that a new enemy enter the arena through the spawn corridor.
    SpawnEnemy {
        /// Kind of enemy to create.
        kind: EnemyKind,
    },
    /// Changes the targeting policy used by a tower.
    SetTargeting {
        /// Tower whose policy should change.
        tower: TowerId,
        /// Policy the tower should use from now on.
        mode: TargetingMode,
    },
    /// Credits gold to the player treasury.
    AwardGold {
        /// Amount of gold to credit.
        amount: u32,
    },
}

/// Events broadcast after commands or frame systems change the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy entered the arena.
    EnemySpawned {
        /// Identifier assigned to the new enemy.
        enemy: EnemyId,
        /// Kind of the new enemy.
        kind: EnemyKind,
        /// Full-grid cell the enemy spawned on.
        cell: CellCoord,
    },
    /// Reports that a spawn request could not be honoured because no route exists.
    EnemySpawnBlocked {
        /// Kind of enemy that could not be spawned.
        kind: EnemyKind,
    },
    /// Reports that an enemy received a fresh route after the layout changed.
    EnemyRerouted {
        /// Identifier of the rerouted enemy.
        enemy: EnemyId,
        /// Number of waypoints in the new route.
        waypoints: usize,
    },
    /// Reports that an enemy currently has no route to the destination.
    EnemyStuck {
        /// Identifier of the stuck enemy.
        enemy: EnemyId,
    },
    /// Reports that an enemy reached the destination corridor.
    EnemyEscaped {
        /// Identifier of the escaped enemy.
        enemy: EnemyId,
        /// Lives deducted from the player.
        lives_lost: u32,
    },
    /// Reports that an enemy's health dropped to zero.
    EnemyKilled {
        /// Identifier of the defeated enemy.
        enemy: EnemyId,
        /// Kind of the defeated enemy.
        kind: EnemyKind,
        /// World-space position where the enemy died.
        position: Vec2,
        /// Gold bounty the kill is worth.
        bounty: u32,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Buildable cell occupied by the tower.
        cell: CellCoord,
    },
    /// Confirms that a tower was removed from the world.
    TowerRemoved {
        /// Identifier of the tower that was removed.
        tower: TowerId,
        /// Buildable cell previously occupied by the tower.
        cell: CellCoord,
        /// Gold refunded to the player.
        refund: u32,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a tower switched targeting policy.
    TargetingChanged {
        /// Tower whose policy changed.
        tower: TowerId,
        /// Newly active policy.
        mode: TargetingMode,
    },
    /// Reports the treasury balance after it changed.
    GoldChanged {
        /// Gold available after the change.
        gold: u32,
    },
    /// Reports that a tower fired.
    ProjectileFired {
        /// Identifier of the projectile, absent for instant attacks.
        projectile: Option<ProjectileId>,
        /// Tower that fired.
        tower: TowerId,
        /// Enemy the shot was aimed at.
        target: EnemyId,
        /// World-space muzzle position.
        position: Vec2,
    },
    /// Reports direct damage landing on an enemy.
    ProjectileHit {
        /// Tower credited with the hit.
        tower: TowerId,
        /// Enemy that was hit.
        enemy: EnemyId,
        /// World-space impact position.
        position: Vec2,
        /// Damage dealt after armor and shields.
        damage: f32,
    },
    /// Reports that a projectile expired without hitting anything.
    ProjectileMissed {
        /// Identifier of the expired projectile.
        projectile: ProjectileId,
        /// World-space position where the projectile expired.
        position: Vec2,
    },
    /// Reports area damage applied around an impact point.
    SplashDamage {
        /// Tower credited with the splash.
        tower: TowerId,
        /// Enemy caught in the blast.
        enemy: EnemyId,
        /// World-space position of the affected enemy.
        position: Vec2,
        /// Damage dealt after falloff, armor and shields.
        damage: f32,
    },
    /// Reports one hop of a chain attack.
    ChainJump {
        /// Tower credited with the chain.
        tower: TowerId,
        /// Enemy struck by this hop.
        enemy: EnemyId,
        /// Zero-based hop index; zero is the primary target.
        jump: u32,
        /// World-space position of the struck enemy.
        position: Vec2,
        /// Damage dealt after armor and shields.
        damage: f32,
    },
    /// Reports a status effect applied to an enemy.
    StatusApplied {
        /// Enemy that received the effect.
        enemy: EnemyId,
        /// Kind of effect applied.
        status: StatusKind,
        /// Effect strength (slow fraction, burn damage per second, or stun seconds).
        magnitude: f32,
        /// World-space position of the affected enemy.
        position: Vec2,
    },
    /// Reports damage dealt by a burn effect tick.
    BurnDamage {
        /// Enemy that burned.
        enemy: EnemyId,
        /// Damage dealt by the tick.
        damage: f32,
    },
    /// Announces the composition of an upcoming wave.
    WavePlanned {
        /// Plan the spawner is about to realise.
        plan: WavePlan,
    },
    /// Announces that every enemy of a wave has been resolved.
    WaveCompleted {
        /// Summary of how the wave went for the player.
        outcome: WaveOutcome,
        /// Wave number that completed.
        wave: u32,
    },
    /// Announces the end of the game.
    GameOver {
        /// Whether the player survived every wave.
        won: bool,
    },
}

/// Target assignment produced by tower targeting for a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TowerTarget {
    /// Tower that should fire.
    pub tower: TowerId,
    /// Enemy the tower should fire at.
    pub enemy: EnemyId,
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the projectile identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

/// Rule a tower uses to pick one enemy among those in range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingMode {
    /// Enemy closest to the destination.
    #[default]
    First,
    /// Enemy furthest from the destination.
    Last,
    /// Enemy nearest to the tower.
    Closest,
    /// Enemy with the most current health.
    Strongest,
    /// Enemy with the least current health.
    Weakest,
    /// Enemy with the highest current speed.
    Fastest,
    /// First boss in range, otherwise behaves like [`TargetingMode::First`].
    Boss,
}

impl TargetingMode {
    /// Every policy in declaration order.
    pub const ALL: [TargetingMode; 7] = [
        Self::First,
        Self::Last,
        Self::Closest,
        Self::Strongest,
        Self::Weakest,
        Self::Fastest,
        Self::Boss,
    ];

    /// Lower-case name used by adapters and persisted settings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Closest => "closest",
            Self::Strongest => "strongest",
            Self::Weakest => "weakest",
            Self::Fastest => "fastest",
            Self::Boss => "boss",
        }
    }

    /// Parses a policy name case-insensitively.
    ///
    /// Unknown or malformed names resolve to [`TargetingMode::First`] rather
    /// than failing, so a corrupted setting never disables a tower.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(trimmed))
            .unwrap_or_default()
    }

    /// Resolves a policy from its position in [`TargetingMode::ALL`], falling back to `First`.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }
}

impl fmt::Display for TargetingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Types of towers that can be constructed in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Cheap, fast-firing single-target tower.
    Bullet,
    /// Slow homing missile with splash damage.
    Missile,
    /// Homing shard that slows its target.
    Frost,
    /// Incendiary round that sets its target on fire.
    Fire,
    /// Long-range piercing round.
    Sniper,
    /// Instant beam with no travel time.
    Laser,
    /// Instant arc that chains between nearby enemies.
    Tesla,
}

impl TowerKind {
    /// Every tower kind ordered from cheapest to most expensive tier.
    pub const ALL: [TowerKind; 7] = [
        Self::Bullet,
        Self::Frost,
        Self::Fire,
        Self::Missile,
        Self::Laser,
        Self::Sniper,
        Self::Tesla,
    ];

    /// Lower-case name used in persisted keys and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Missile => "missile",
            Self::Frost => "frost",
            Self::Fire => "fire",
            Self::Sniper => "sniper",
            Self::Laser => "laser",
            Self::Tesla => "tesla",
        }
    }

    /// Parses a tower kind from its [`TowerKind::name`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == value)
    }

    /// Static combat profile for the tower kind.
    #[must_use]
    pub fn profile(self) -> TowerProfile {
        let plain = AttackProfile {
            delivery: Delivery::Instant,
            splash_radius: 0.0,
            slow: None,
            burn: None,
            chain: None,
            stun: None,
        };

        match self {
            Self::Bullet => TowerProfile {
                cost: 50,
                range: 6.0,
                damage: 10.0,
                fire_rate: 2.0,
                attack: AttackProfile {
                    delivery: Delivery::ballistic(20.0, false, false),
                    ..plain
                },
            },
            Self::Missile => TowerProfile {
                cost: 120,
                range: 8.0,
                damage: 30.0,
                fire_rate: 0.5,
                attack: AttackProfile {
                    delivery: Delivery::ballistic(12.0, true, false),
                    splash_radius: 3.0,
                    ..plain
                },
            },
            Self::Frost => TowerProfile {
                cost: 80,
                range: 5.0,
                damage: 5.0,
                fire_rate: 1.0,
                attack: AttackProfile {
                    delivery: Delivery::ballistic(15.0, true, false),
                    slow: Some(SlowEffect {
                        amount: 0.5,
                        duration: Duration::from_secs(2),
                    }),
                    ..plain
                },
            },
            Self::Fire => TowerProfile {
                cost: 90,
                range: 5.0,
                damage: 6.0,
                fire_rate: 1.5,
                attack: AttackProfile {
                    delivery: Delivery::ballistic(15.0, false, false),
                    burn: Some(BurnEffect {
                        damage_per_second: 5.0,
                        duration: Duration::from_secs(3),
                    }),
                    ..plain
                },
            },
            Self::Sniper => TowerProfile {
                cost: 150,
                range: 14.0,
                damage: 60.0,
                fire_rate: 0.4,
                attack: AttackProfile {
                    delivery: Delivery::ballistic(40.0, true, true),
                    ..plain
                },
            },
            Self::Laser => TowerProfile {
                cost: 140,
                range: 7.0,
                damage: 25.0,
                fire_rate: 1.2,
                attack: plain,
            },
            Self::Tesla => TowerProfile {
                cost: 160,
                range: 6.0,
                damage: 40.0,
                fire_rate: 0.8,
                attack: AttackProfile {
                    chain: Some(ChainEffect {
                        jumps: 3,
                        range: 4.0,
                        falloff: 0.2,
                    }),
                    stun: Some(Duration::from_millis(200)),
                    ..plain
                },
            },
        }
    }
}

impl fmt::Display for TowerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static stats describing how a tower kind behaves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerProfile {
    /// Gold required to build the tower.
    pub cost: u32,
    /// Targeting radius in world units.
    pub range: f32,
    /// Base damage of a single shot.
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Delivery and on-hit payload.
    pub attack: AttackProfile,
}

impl TowerProfile {
    /// Minimum time between two shots, i.e. `1 / fire_rate` seconds.
    ///
    /// A non-positive fire rate yields `Duration::MAX`, which never becomes ready.
    #[must_use]
    pub fn fire_interval(&self) -> Duration {
        if self.fire_rate <= 0.0 || !self.fire_rate.is_finite() {
            return Duration::MAX;
        }
        Duration::from_secs_f32(1.0 / self.fire_rate)
    }

    /// Nominal single-target damage per second.
    #[must_use]
    pub fn dps(&self) -> f32 {
        self.damage * self.fire_rate.max(0.0)
    }
}

/// How a shot travels from the tower to its target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delivery {
    /// A projectile that flies through the world at a fixed speed.
    Ballistic {
        /// Travel speed in world units per second.
        speed: f32,
        /// Whether the projectile steers toward the target's current position.
        homing: bool,
        /// Whether the projectile keeps flying after a hit.
        piercing: bool,
    },
    /// Resolves on the same frame it is fired.
    Instant,
}

impl Delivery {
    /// Shorthand constructor for a ballistic delivery.
    #[must_use]
    pub const fn ballistic(speed: f32, homing: bool, piercing: bool) -> Self {
        Self::Ballistic {
            speed,
            homing,
            piercing,
        }
    }
}

/// Delivery and on-hit payload of a tower's attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackProfile {
    /// How the attack reaches its target.
    pub delivery: Delivery,
    /// Radius of area damage around the impact point, zero for none.
    pub splash_radius: f32,
    /// Slow applied to the primary target on hit.
    pub slow: Option<SlowEffect>,
    /// Burn applied to the primary target on hit.
    pub burn: Option<BurnEffect>,
    /// Chain behaviour for instant attacks.
    pub chain: Option<ChainEffect>,
    /// Stun applied to every enemy the attack strikes directly.
    pub stun: Option<Duration>,
}

/// Temporary speed reduction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlowEffect {
    /// Fraction of speed removed, in `0.0..=1.0`.
    pub amount: f32,
    /// How long the slow lasts after application.
    pub duration: Duration,
}

/// Recurring damage over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurnEffect {
    /// Damage applied once per elapsed second.
    pub damage_per_second: f32,
    /// How long the burn lasts after application.
    pub duration: Duration,
}

/// Chain lightning parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainEffect {
    /// Number of hops after the primary target.
    pub jumps: u32,
    /// Maximum distance between two consecutive targets.
    pub range: f32,
    /// Fraction of damage lost per hop, applied multiplicatively.
    pub falloff: f32,
}

/// Kinds of status effects an enemy can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// Speed multiplier below one.
    Slow,
    /// Damage over time.
    Burn,
    /// Movement halted.
    Stun,
}

/// Types of enemies that can walk the route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Baseline walker.
    Basic,
    /// Quick and fragile.
    Fast,
    /// Slow, armored and durable.
    Tank,
    /// Weak enemy that arrives in large numbers.
    Swarm,
    /// Shielded veteran.
    Elite,
    /// Wave boss.
    Boss,
}

impl EnemyKind {
    /// Every enemy kind in declaration order.
    pub const ALL: [EnemyKind; 6] = [
        Self::Basic,
        Self::Fast,
        Self::Tank,
        Self::Swarm,
        Self::Elite,
        Self::Boss,
    ];

    /// Lower-case name used in wave descriptors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Fast => "fast",
            Self::Tank => "tank",
            Self::Swarm => "swarm",
            Self::Elite => "elite",
            Self::Boss => "boss",
        }
    }

    /// Static stat block for the enemy kind.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        match self {
            Self::Basic => EnemyProfile::regular(50.0, 2.0, 0.0, 0.0, 5, 1.0, 1),
            Self::Fast => EnemyProfile::regular(30.0, 3.5, 0.0, 0.0, 6, 0.8, 1),
            Self::Tank => EnemyProfile::regular(200.0, 1.2, 0.3, 0.0, 15, 1.4, 2),
            Self::Swarm => EnemyProfile::regular(15.0, 2.8, 0.0, 0.0, 2, 0.6, 1),
            Self::Elite => EnemyProfile::regular(120.0, 2.2, 0.2, 40.0, 20, 1.2, 2),
            Self::Boss => EnemyProfile {
                is_boss: true,
                ..EnemyProfile::regular(800.0, 1.0, 0.35, 200.0, 100, 2.0, 5)
            },
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static stats describing an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProfile {
    /// Health at spawn.
    pub max_health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Fraction of incoming damage ignored, in `0.0..1.0`.
    pub armor: f32,
    /// Damage pool absorbed before health.
    pub shield: f32,
    /// Gold awarded on kill.
    pub bounty: u32,
    /// Visual scale; drives the hit radius.
    pub scale: f32,
    /// Lives deducted when the enemy reaches the destination.
    pub lives_cost: u32,
    /// Whether boss targeting should prefer this enemy.
    pub is_boss: bool,
}

impl EnemyProfile {
    const fn regular(
        max_health: f32,
        speed: f32,
        armor: f32,
        shield: f32,
        bounty: u32,
        scale: f32,
        lives_cost: u32,
    ) -> Self {
        Self {
            max_health,
            speed,
            armor,
            shield,
            bounty,
            scale,
            lives_cost,
            is_boss: false,
        }
    }
}

/// Named wave-composition template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WaveArchetype {
    /// Balanced mix of basic and fast enemies.
    Standard,
    /// Many weak enemies.
    Swarm,
    /// Shielded veterans.
    Elite,
    /// Armored heavies.
    Tank,
    /// Fast enemies only.
    Rush,
    /// A single boss with escorts.
    Boss,
    /// Twin bosses with a heavy escort.
    MegaBoss,
}

impl WaveArchetype {
    /// Every archetype in declaration order.
    pub const ALL: [WaveArchetype; 7] = [
        Self::Standard,
        Self::Swarm,
        Self::Elite,
        Self::Tank,
        Self::Rush,
        Self::Boss,
        Self::MegaBoss,
    ];

    /// Tag used by wave descriptors and UI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Swarm => "swarm",
            Self::Elite => "elite",
            Self::Tank => "tank",
            Self::Rush => "rush",
            Self::Boss => "boss",
            Self::MegaBoss => "megaBoss",
        }
    }
}

impl fmt::Display for WaveArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A number of enemies of one kind inside a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyGroup {
    /// Kind of enemy in the group.
    pub kind: EnemyKind,
    /// Number of enemies in the group.
    pub count: u32,
}

/// Concrete enemy composition of a wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    wave: u32,
    archetype: WaveArchetype,
    groups: Vec<EnemyGroup>,
    total: u32,
}

impl WavePlan {
    /// Creates a plan, computing the total enemy count from the groups.
    #[must_use]
    pub fn new(wave: u32, archetype: WaveArchetype, groups: Vec<EnemyGroup>) -> Self {
        let total = groups
            .iter()
            .fold(0u32, |sum, group| sum.saturating_add(group.count));
        Self {
            wave,
            archetype,
            groups,
            total,
        }
    }

    /// One-based wave number.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Archetype the plan was composed from.
    #[must_use]
    pub const fn archetype(&self) -> WaveArchetype {
        self.archetype
    }

    /// Enemy groups in spawn priority order.
    #[must_use]
    pub fn groups(&self) -> &[EnemyGroup] {
        &self.groups
    }

    /// Total number of enemies across all groups.
    #[must_use]
    pub const fn total_enemies(&self) -> u32 {
        self.total
    }
}

/// Summary of a finished wave, fed back into the difficulty director.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaveOutcome {
    /// Lives the player lost during the wave.
    pub lives_lost: u32,
    /// Time between the wave start and its last enemy resolving.
    pub completion_time: Duration,
    /// Total damage dealt by towers during the wave.
    pub damage_dealt: f32,
    /// Towers lost during the wave.
    pub towers_lost: u32,
}

impl WaveOutcome {
    /// Whether the player lost no lives.
    #[must_use]
    pub const fn is_perfect(&self) -> bool {
        self.lives_lost == 0
    }
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell lies outside the buildable grid.
    #[error("cell lies outside the buildable area")]
    OutOfBounds,
    /// The requested cell already holds a structure.
    #[error("cell is already occupied")]
    Occupied,
    /// A structure on the cell would cut the route from spawn to destination.
    #[error("placement would block the enemy route")]
    BlocksPath,
    /// The treasury cannot cover the tower's cost.
    #[error("not enough gold")]
    InsufficientGold,
}

/// Reasons a tower removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RemovalError {
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, EnemyGroup, EnemyKind, PlacementError, RemovalError, TargetingMode, TowerId,
        TowerKind, WaveArchetype, WavePlan,
    };
    use serde::{de::DeserializeOwned, Serialize};
    use std::time::Duration;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_and_errors_round_trip_through_bincode() {
        assert_round_trip(&TowerId::new(42));
        assert_round_trip(&TowerKind::Tesla);
        assert_round_trip(&PlacementError::BlocksPath);
        assert_round_trip(&RemovalError::MissingTower);
        assert_round_trip(&WavePlan::new(
            3,
            WaveArchetype::Swarm,
            vec![EnemyGroup {
                kind: EnemyKind::Swarm,
                count: 12,
            }],
        ));
    }

    #[test]
    fn malformed_targeting_names_fall_back_to_first() {
        assert_eq!(TargetingMode::parse("STRONGEST"), TargetingMode::Strongest);
        assert_eq!(TargetingMode::parse(" boss "), TargetingMode::Boss);
        assert_eq!(TargetingMode::parse("sideways"), TargetingMode::First);
        assert_eq!(TargetingMode::parse(""), TargetingMode::First);
        assert_eq!(TargetingMode::from_index(99), TargetingMode::First);
        assert_eq!(TargetingMode::from_index(2), TargetingMode::Closest);
    }

    #[test]
    fn tower_names_parse_back() {
        for kind in TowerKind::ALL {
            assert_eq!(TowerKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(TowerKind::parse("catapult"), None);
    }

    #[test]
    fn fire_interval_is_reciprocal_of_rate() {
        let profile = TowerKind::Bullet.profile();
        assert_eq!(profile.fire_interval(), Duration::from_millis(500));

        let mut stalled = profile;
        stalled.fire_rate = 0.0;
        assert_eq!(stalled.fire_interval(), Duration::MAX);
    }

    #[test]
    fn wave_plan_totals_groups() {
        let plan = WavePlan::new(
            10,
            WaveArchetype::MegaBoss,
            vec![
                EnemyGroup {
                    kind: EnemyKind::Boss,
                    count: 2,
                },
                EnemyGroup {
                    kind: EnemyKind::Elite,
                    count: 5,
                },
            ],
        );
        assert_eq!(plan.total_enemies(), 7);
        assert_eq!(plan.archetype().name(), "megaBoss");
    }

    #[test]
    fn only_bosses_carry_the_boss_flag() {
        for kind in EnemyKind::ALL {
            assert_eq!(kind.profile().is_boss, kind == EnemyKind::Boss);
        }
    }
}
