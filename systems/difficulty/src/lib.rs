#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adaptive difficulty director that composes waves from player performance.
//!
//! Every call to [`DifficultyDirector::plan_wave`] is a pure function of the
//! current [`DifficultyState`], the player snapshot and a per-wave random
//! stream derived from the global seed. Outcomes reported through
//! [`DifficultyDirector::record_wave_outcome`] move the bounded scalars that
//! shape the next plans.

mod state;

use conquer_core::{EnemyGroup, EnemyKind, WaveArchetype, WaveOutcome, WavePlan};
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

pub use state::DifficultyState;

/// Relative weights of the random archetype table.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchetypeWeights {
    /// Weight of the standard archetype.
    pub standard: u32,
    /// Weight of the swarm archetype.
    pub swarm: u32,
    /// Weight of the elite archetype.
    pub elite: u32,
    /// Weight of the tank archetype.
    pub tank: u32,
    /// Weight of the rush archetype.
    pub rush: u32,
}

impl ArchetypeWeights {
    fn entries(&self) -> [(WaveArchetype, u32); 5] {
        [
            (WaveArchetype::Standard, self.standard),
            (WaveArchetype::Swarm, self.swarm),
            (WaveArchetype::Elite, self.elite),
            (WaveArchetype::Tank, self.tank),
            (WaveArchetype::Rush, self.rush),
        ]
    }
}

impl Default for ArchetypeWeights {
    fn default() -> Self {
        Self {
            standard: 40,
            swarm: 20,
            elite: 15,
            tank: 15,
            rush: 10,
        }
    }
}

/// Tunables for the difficulty director.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Global seed mixed into every per-wave random stream.
    pub seed: u64,
    /// Lower bound of the difficulty factor.
    pub min_factor: f32,
    /// Upper bound of the difficulty factor.
    pub max_factor: f32,
    /// Difficulty factor of a fresh director.
    pub initial_factor: f32,
    /// Lower bound of the aggressiveness.
    pub min_aggressiveness: f32,
    /// Upper bound of the aggressiveness.
    pub max_aggressiveness: f32,
    /// Aggressiveness of a fresh director.
    pub initial_aggressiveness: f32,
    /// Multiplicative growth of the base group scale per wave.
    pub growth_per_wave: f32,
    /// Number of recent waves kept in the rolling windows.
    pub history_window: usize,
    /// Weight of the health ratio in the strength score.
    pub health_weight: f32,
    /// Weight of the economic strength in the strength score.
    pub economy_weight: f32,
    /// Weight of the defensive strength in the strength score.
    pub defense_weight: f32,
    /// Gold amount considered a full economy.
    pub gold_reference: f32,
    /// Tower DPS per wave number considered a full defense.
    pub dps_reference_per_wave: f32,
    /// Strength above which the player is considered dominant.
    pub high_strength: f32,
    /// Strength below which the player is considered struggling.
    pub low_strength: f32,
    /// Momentum above which the player is considered on a roll.
    pub positive_momentum: f32,
    /// Momentum below which the player is considered collapsing.
    pub collapse_momentum: f32,
    /// Momentum gained for a wave without lost lives.
    pub perfect_wave_bonus: f32,
    /// Momentum lost for a wave with heavy losses.
    pub heavy_loss_penalty: f32,
    /// Lives lost at which a wave counts as a heavy loss.
    pub heavy_loss_lives: u32,
    /// Multiplicative momentum decay for ordinary waves.
    pub momentum_decay: f32,
    /// Difficulty factor change per unit of momentum.
    pub factor_step: f32,
    /// Difficulty factor reduction per tower lost.
    pub tower_loss_penalty: f32,
    /// Absolute momentum beyond which aggressiveness changes.
    pub aggression_threshold: f32,
    /// Aggressiveness change per wave past the threshold.
    pub aggression_step: f32,
    /// Waves without a swarm after which a swarm is forced.
    pub swarm_cooldown: u32,
    /// Waves without an elite wave after which one is forced.
    pub elite_cooldown: u32,
    /// Weighted table for ordinary waves.
    pub weights: ArchetypeWeights,
    /// Weighted table used while the player dominates.
    pub hard_weights: ArchetypeWeights,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            seed: 0x5eed_0f_c0a1,
            min_factor: 0.7,
            max_factor: 1.8,
            initial_factor: 1.0,
            min_aggressiveness: 0.2,
            max_aggressiveness: 0.9,
            initial_aggressiveness: 0.5,
            growth_per_wave: 1.12,
            history_window: 5,
            health_weight: 0.3,
            economy_weight: 0.2,
            defense_weight: 0.5,
            gold_reference: 500.0,
            dps_reference_per_wave: 40.0,
            high_strength: 0.7,
            low_strength: 0.3,
            positive_momentum: 0.2,
            collapse_momentum: -0.5,
            perfect_wave_bonus: 0.15,
            heavy_loss_penalty: 0.25,
            heavy_loss_lives: 3,
            momentum_decay: 0.8,
            factor_step: 0.1,
            tower_loss_penalty: 0.02,
            aggression_threshold: 0.5,
            aggression_step: 0.05,
            swarm_cooldown: 4,
            elite_cooldown: 6,
            weights: ArchetypeWeights::default(),
            hard_weights: ArchetypeWeights {
                standard: 0,
                swarm: 0,
                elite: 40,
                tank: 35,
                rush: 25,
            },
        }
    }
}

/// Player state observed when a wave is planned. Missing fields count as neutral.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerSnapshot {
    /// Remaining lives divided by starting lives.
    pub health_ratio: Option<f32>,
    /// Gold in the treasury.
    pub gold: Option<u32>,
    /// Aggregate damage per second of every placed tower.
    pub tower_dps: Option<f32>,
}

/// Read-only view of the director for UI display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyStats {
    /// Scalar applied to every scaled enemy group.
    pub difficulty_factor: f32,
    /// Bias toward larger waves.
    pub aggressiveness: f32,
    /// Rolling summary of recent player performance.
    pub momentum: f32,
    /// Strength score computed for the last plan.
    pub last_strength: f32,
    /// Archetype of the last plan, if any wave was planned.
    pub last_archetype: Option<WaveArchetype>,
}

/// Part of an archetype recipe before scaling.
#[derive(Clone, Copy, Debug)]
struct RecipeGroup {
    kind: EnemyKind,
    base: u32,
    scaled: bool,
}

const fn scaled(kind: EnemyKind, base: u32) -> RecipeGroup {
    RecipeGroup {
        kind,
        base,
        scaled: true,
    }
}

const fn fixed(kind: EnemyKind, base: u32) -> RecipeGroup {
    RecipeGroup {
        kind,
        base,
        scaled: false,
    }
}

fn recipe(archetype: WaveArchetype) -> &'static [RecipeGroup] {
    match archetype {
        WaveArchetype::Standard => &const { [scaled(EnemyKind::Basic, 6), scaled(EnemyKind::Fast, 2)] },
        WaveArchetype::Swarm => &const { [scaled(EnemyKind::Swarm, 12), scaled(EnemyKind::Basic, 2)] },
        WaveArchetype::Elite => &const { [scaled(EnemyKind::Elite, 3), scaled(EnemyKind::Basic, 3)] },
        WaveArchetype::Tank => &const { [scaled(EnemyKind::Tank, 3), scaled(EnemyKind::Basic, 3)] },
        WaveArchetype::Rush => &const { [scaled(EnemyKind::Fast, 8)] },
        WaveArchetype::Boss => &const { [
            fixed(EnemyKind::Boss, 1),
            scaled(EnemyKind::Basic, 4),
            scaled(EnemyKind::Fast, 2),
        ] },
        WaveArchetype::MegaBoss => &const { [
            fixed(EnemyKind::Boss, 2),
            scaled(EnemyKind::Elite, 2),
            scaled(EnemyKind::Tank, 2),
        ] },
    }
}

/// Difficulty director composing waves and adapting to outcomes.
#[derive(Clone, Debug)]
pub struct DifficultyDirector {
    tuning: DifficultyTuning,
    state: DifficultyState,
    last_strength: f32,
    last_archetype: Option<WaveArchetype>,
}

impl DifficultyDirector {
    /// Creates a director in the neutral state.
    #[must_use]
    pub fn new(tuning: DifficultyTuning) -> Self {
        let state = DifficultyState::new(&tuning);
        Self {
            tuning,
            state,
            last_strength: 0.5,
            last_archetype: None,
        }
    }

    /// Current bounded state.
    #[must_use]
    pub fn state(&self) -> &DifficultyState {
        &self.state
    }

    /// Tuning the director was built with.
    #[must_use]
    pub fn tuning(&self) -> &DifficultyTuning {
        &self.tuning
    }

    /// Snapshot of the adaptive scalars.
    #[must_use]
    pub fn stats(&self) -> DifficultyStats {
        DifficultyStats {
            difficulty_factor: self.state.difficulty_factor(),
            aggressiveness: self.state.aggressiveness(),
            momentum: self.state.momentum(),
            last_strength: self.last_strength,
            last_archetype: self.last_archetype,
        }
    }

    /// Aggregate player strength in `[0, 1]`.
    ///
    /// Each missing component contributes a neutral 0.5.
    #[must_use]
    pub fn player_strength(&self, wave: u32, snapshot: &PlayerSnapshot) -> f32 {
        let tuning = &self.tuning;
        let health = snapshot.health_ratio.map_or(0.5, unit);
        let economy = snapshot.gold.map_or(0.5, |gold| {
            ratio(gold as f32, tuning.gold_reference)
        });
        let defense = snapshot.tower_dps.map_or(0.5, |dps| {
            ratio(dps, tuning.dps_reference_per_wave * wave.max(1) as f32)
        });

        let weights = tuning.health_weight + tuning.economy_weight + tuning.defense_weight;
        if weights <= 0.0 {
            return 0.5;
        }
        let score = health * tuning.health_weight
            + economy * tuning.economy_weight
            + defense * tuning.defense_weight;
        unit(score / weights)
    }

    /// Composes the plan for `wave`.
    pub fn plan_wave(&mut self, wave: u32, snapshot: &PlayerSnapshot) -> WavePlan {
        let wave = wave.max(1);
        let strength = self.player_strength(wave, snapshot);
        let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(self.tuning.seed, wave));
        let archetype = self.choose_archetype(wave, strength, &mut rng);

        let multiplier = self.group_multiplier(wave);
        let groups = recipe(archetype)
            .iter()
            .map(|group| EnemyGroup {
                kind: group.kind,
                count: if group.scaled {
                    scale_count(group.base, multiplier)
                } else {
                    group.base
                },
            })
            .collect();

        self.state.mark_planned(archetype, wave);
        self.last_strength = strength;
        self.last_archetype = Some(archetype);

        let plan = WavePlan::new(wave, archetype, groups);
        info!(
            "wave {} planned as {} with {} enemies (strength {:.2}, factor {:.2})",
            wave,
            archetype,
            plan.total_enemies(),
            strength,
            self.state.difficulty_factor()
        );
        plan
    }

    /// Feeds a finished wave back into momentum, factor and aggressiveness.
    pub fn record_wave_outcome(&mut self, outcome: &WaveOutcome) {
        let tuning = &self.tuning;
        self.state
            .push_outcome(outcome.lives_lost, outcome.completion_time);

        let momentum = self.state.momentum();
        let momentum = if outcome.is_perfect() {
            momentum + tuning.perfect_wave_bonus
        } else if outcome.lives_lost >= tuning.heavy_loss_lives {
            momentum - tuning.heavy_loss_penalty
        } else {
            momentum * tuning.momentum_decay
        };
        self.state.set_momentum(momentum);
        let momentum = self.state.momentum();

        let factor = self.state.difficulty_factor() + momentum * tuning.factor_step
            - tuning.tower_loss_penalty * outcome.towers_lost as f32;
        self.state.set_difficulty_factor(factor);

        if momentum > tuning.aggression_threshold {
            self.state
                .set_aggressiveness(self.state.aggressiveness() + tuning.aggression_step);
        } else if momentum < -tuning.aggression_threshold {
            self.state
                .set_aggressiveness(self.state.aggressiveness() - tuning.aggression_step);
        }

        info!(
            "wave outcome: {} lives lost in {:.1}s, momentum {:.2}, factor {:.2}, aggressiveness {:.2}",
            outcome.lives_lost,
            outcome.completion_time.as_secs_f32(),
            self.state.momentum(),
            self.state.difficulty_factor(),
            self.state.aggressiveness()
        );
    }

    fn choose_archetype(&self, wave: u32, strength: f32, rng: &mut ChaCha8Rng) -> WaveArchetype {
        if wave % 10 == 0 {
            return WaveArchetype::MegaBoss;
        }
        if wave % 5 == 0 {
            return WaveArchetype::Boss;
        }

        let tuning = &self.tuning;
        let momentum = self.state.momentum();
        if strength > tuning.high_strength && momentum > tuning.positive_momentum {
            debug!("player dominating, biasing wave {wave} toward hard archetypes");
            return pick_weighted(&tuning.hard_weights, rng);
        }
        if strength < tuning.low_strength || momentum < tuning.collapse_momentum {
            debug!("player struggling, easing wave {wave}");
            return WaveArchetype::Standard;
        }

        if self.state.waves_since(WaveArchetype::Swarm, wave) >= tuning.swarm_cooldown {
            return WaveArchetype::Swarm;
        }
        if self.state.waves_since(WaveArchetype::Elite, wave) >= tuning.elite_cooldown {
            return WaveArchetype::Elite;
        }
        pick_weighted(&tuning.weights, rng)
    }

    fn group_multiplier(&self, wave: u32) -> f32 {
        let exponent = i32::try_from(wave.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_scale = self.tuning.growth_per_wave.max(0.0).powi(exponent);
        let aggression = 0.8 + self.state.aggressiveness() * 0.4;
        base_scale * self.state.difficulty_factor() * aggression
    }
}

impl Default for DifficultyDirector {
    fn default() -> Self {
        Self::new(DifficultyTuning::default())
    }
}

fn pick_weighted(weights: &ArchetypeWeights, rng: &mut ChaCha8Rng) -> WaveArchetype {
    let entries = weights.entries();
    let total: u32 = entries.iter().map(|(_, weight)| weight).sum();
    if total == 0 {
        return WaveArchetype::Standard;
    }

    let mut roll = rng.gen_range(0..total);
    for (archetype, weight) in entries {
        if roll < weight {
            return archetype;
        }
        roll -= weight;
    }
    WaveArchetype::Standard
}

fn scale_count(base: u32, multiplier: f32) -> u32 {
    let scaled = (base as f32 * multiplier).ceil();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled.min(u32::MAX as f32) as u32
    } else {
        1
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn ratio(value: f32, reference: f32) -> f32 {
    if reference <= 0.0 {
        return 0.5;
    }
    unit(value / reference)
}

fn derive_wave_seed(global_seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn perfect() -> WaveOutcome {
        WaveOutcome {
            lives_lost: 0,
            completion_time: Duration::from_secs(40),
            damage_dealt: 2_000.0,
            towers_lost: 0,
        }
    }

    fn disaster() -> WaveOutcome {
        WaveOutcome {
            lives_lost: 8,
            completion_time: Duration::from_secs(90),
            damage_dealt: 300.0,
            towers_lost: 2,
        }
    }

    fn count_of(plan: &WavePlan, kind: EnemyKind) -> u32 {
        plan.groups()
            .iter()
            .filter(|group| group.kind == kind)
            .map(|group| group.count)
            .sum()
    }

    #[test]
    fn tenth_wave_is_a_mega_boss_with_two_bosses() {
        let mut director = DifficultyDirector::default();
        let plan = director.plan_wave(10, &PlayerSnapshot::default());

        assert_eq!(plan.archetype(), WaveArchetype::MegaBoss);
        assert_eq!(plan.archetype().name(), "megaBoss");
        assert!(plan
            .groups()
            .iter()
            .any(|group| group.kind == EnemyKind::Boss && group.count == 2));
    }

    #[test]
    fn fifth_wave_is_a_boss_wave() {
        let mut director = DifficultyDirector::default();
        let plan = director.plan_wave(5, &PlayerSnapshot::default());

        assert_eq!(plan.archetype(), WaveArchetype::Boss);
        assert_eq!(count_of(&plan, EnemyKind::Boss), 1);
        assert_eq!(director.state().waves_since_boss(), 0);
    }

    #[test]
    fn factor_stays_within_bounds_after_long_streaks() {
        let mut director = DifficultyDirector::default();
        for _ in 0..50 {
            director.record_wave_outcome(&perfect());
            assert!(director.stats().difficulty_factor <= 1.8);
        }
        assert_eq!(director.stats().momentum, 1.0);
        assert!(director.stats().aggressiveness <= 0.9);

        for _ in 0..50 {
            director.record_wave_outcome(&disaster());
            assert!(director.stats().difficulty_factor >= 0.7);
        }
        assert_eq!(director.stats().momentum, -1.0);
        assert!(director.stats().aggressiveness >= 0.2);
    }

    #[test]
    fn missing_inputs_count_as_neutral() {
        let director = DifficultyDirector::default();
        let strength = director.player_strength(3, &PlayerSnapshot::default());
        assert!((strength - 0.5).abs() < 1e-6);
    }

    #[test]
    fn plans_replay_for_the_same_seed() {
        let snapshot = PlayerSnapshot {
            health_ratio: Some(0.9),
            gold: Some(200),
            tower_dps: Some(60.0),
        };
        let mut first = DifficultyDirector::default();
        let mut second = DifficultyDirector::default();

        for wave in 1..=12 {
            assert_eq!(first.plan_wave(wave, &snapshot), second.plan_wave(wave, &snapshot));
        }
    }

    #[test]
    fn dominant_players_face_hard_archetypes() {
        let mut director = DifficultyDirector::default();
        director.record_wave_outcome(&perfect());
        director.record_wave_outcome(&perfect());
        let snapshot = PlayerSnapshot {
            health_ratio: Some(1.0),
            gold: Some(1_000),
            tower_dps: Some(500.0),
        };

        for wave in [1, 2, 3, 4, 6, 7, 8, 9] {
            let archetype = director.plan_wave(wave, &snapshot).archetype();
            assert!(
                matches!(
                    archetype,
                    WaveArchetype::Elite | WaveArchetype::Tank | WaveArchetype::Rush
                ),
                "wave {wave} planned as {archetype}"
            );
        }
    }

    #[test]
    fn struggling_players_get_standard_waves() {
        let mut director = DifficultyDirector::default();
        let snapshot = PlayerSnapshot {
            health_ratio: Some(0.1),
            gold: Some(0),
            tower_dps: Some(0.0),
        };

        for wave in [1, 2, 3, 4, 6, 7] {
            assert_eq!(
                director.plan_wave(wave, &snapshot).archetype(),
                WaveArchetype::Standard
            );
        }
    }

    #[test]
    fn swarm_is_forced_after_its_cooldown() {
        let mut director = DifficultyDirector::default();
        let neutral = PlayerSnapshot::default();
        let mut saw_swarm = false;
        for wave in 1..=4 {
            saw_swarm |= director.plan_wave(wave, &neutral).archetype() == WaveArchetype::Swarm;
        }
        assert!(saw_swarm);
    }

    #[test]
    fn counts_grow_with_wave_number_and_never_drop_to_zero() {
        let mut tuning = DifficultyTuning::default();
        tuning.initial_factor = 0.7;
        tuning.initial_aggressiveness = 0.2;
        let director = DifficultyDirector::new(tuning);

        assert_eq!(scale_count(1, 0.01), 1);
        assert!(director.group_multiplier(9) > director.group_multiplier(1));
        assert_eq!(scale_count(6, 1.0), 6);
        assert_eq!(scale_count(6, 1.12), 7);
    }
}
