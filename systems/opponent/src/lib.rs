#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adaptive opponent that learns which towers to build.
//!
//! The opponent keeps a tabular value estimate per discretized battlefield
//! state and build action, picks actions epsilon-greedily, and learns from
//! per-decision rewards plus wave and game outcomes. The learned table is
//! offered for persistence on a probabilistic throttle through
//! [`AdaptiveOpponent::take_save_request`].

mod store;
mod strategy;
mod table;

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

pub use store::{JsonFileStore, MemoryStore, QTableStore, StoreError};
pub use strategy::Strategy;
pub use table::{Action, MalformedKey, QTable, StateKey};

/// Tunables for the learning loop and its reward shaping.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpponentTuning {
    /// Seed of the exploration and save-throttle random stream.
    pub seed: u64,
    /// Step size of every value update.
    pub learning_rate: f32,
    /// Weight of the best next-state value.
    pub discount: f32,
    /// Initial probability of picking a random action.
    pub exploration_rate: f32,
    /// Multiplicative exploration decay after each survived wave.
    pub exploration_decay: f32,
    /// Floor of the exploration rate.
    pub min_exploration: f32,
    /// Probability that an update queues a save request.
    pub save_probability: f32,
    /// Reward for a successful build.
    pub build_reward: f32,
    /// Reward for a build that matches the inferred strategy.
    pub strategy_reward: f32,
    /// Health ratio below which the low-health penalty applies.
    pub low_health_threshold: f32,
    /// Reward added while health is low (negative).
    pub low_health_reward: f32,
    /// Health ratio above which the high-health bonus applies.
    pub high_health_threshold: f32,
    /// Reward added while health is high.
    pub high_health_reward: f32,
    /// Reward per enemy killed since the previous decision.
    pub kill_reward: f32,
    /// Bonus applied to the last decision when a wave completes.
    pub wave_reward: f32,
    /// Terminal reward for winning.
    pub win_reward: f32,
    /// Terminal reward for losing (negative).
    pub loss_reward: f32,
}

impl Default for OpponentTuning {
    fn default() -> Self {
        Self {
            seed: 0x00a1_1ce5,
            learning_rate: 0.1,
            discount: 0.9,
            exploration_rate: 0.3,
            exploration_decay: 0.95,
            min_exploration: 0.05,
            save_probability: 0.1,
            build_reward: 1.0,
            strategy_reward: 2.0,
            low_health_threshold: 0.3,
            low_health_reward: -5.0,
            high_health_threshold: 0.8,
            high_health_reward: 1.0,
            kill_reward: 0.5,
            wave_reward: 10.0,
            win_reward: 100.0,
            loss_reward: -50.0,
        }
    }
}

/// Battlefield as seen by the opponent when it decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Remaining lives.
    pub lives: u32,
    /// Lives at the start of the game.
    pub max_lives: u32,
    /// Gold in the treasury.
    pub gold: u32,
    /// Towers currently standing.
    pub towers: u32,
    /// Enemies alive on the field.
    pub live_enemies: u32,
    /// Current wave number.
    pub wave: u32,
    /// Enemies killed since the game started.
    pub kills: u32,
}

impl Observation {
    /// Remaining lives as a fraction of the starting lives.
    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        if self.max_lives == 0 {
            return 1.0;
        }
        (self.lives as f32 / self.max_lives as f32).clamp(0.0, 1.0)
    }

    /// Discretized signature of the observation.
    #[must_use]
    pub fn state_key(&self) -> StateKey {
        StateKey {
            health: (self.health_ratio() * 4.0).floor() as u8,
            gold: (self.gold / 50).min(10) as u8,
            towers: self.towers.min(10) as u8,
            enemies: self.live_enemies.min(10) as u8,
            wave: self.wave,
        }
    }
}

/// Outcome of one decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Chosen action.
    pub action: Action,
    /// Strategy inferred for the decision.
    pub strategy: Strategy,
    /// Whether the action was picked at random.
    pub explored: bool,
}

#[derive(Clone, Copy, Debug)]
struct Step {
    state: StateKey,
    action: Action,
    strategy: Strategy,
}

/// Epsilon-greedy tabular learner choosing build actions.
#[derive(Debug)]
pub struct AdaptiveOpponent {
    tuning: OpponentTuning,
    table: QTable,
    rng: ChaCha8Rng,
    exploration: f32,
    last: Option<Step>,
    last_build_succeeded: Option<bool>,
    last_kills: u32,
    last_strategy: Option<Strategy>,
    pending_save: Option<String>,
}

impl AdaptiveOpponent {
    /// Creates an opponent with an empty table.
    #[must_use]
    pub fn new(tuning: OpponentTuning) -> Self {
        Self::with_table(tuning, QTable::new())
    }

    /// Creates an opponent that continues from a learned table.
    #[must_use]
    pub fn with_table(tuning: OpponentTuning, table: QTable) -> Self {
        let exploration = tuning
            .exploration_rate
            .clamp(tuning.min_exploration.clamp(0.0, 1.0), 1.0);
        Self {
            rng: ChaCha8Rng::seed_from_u64(tuning.seed),
            tuning,
            table,
            exploration,
            last: None,
            last_build_succeeded: None,
            last_kills: 0,
            last_strategy: None,
            pending_save: None,
        }
    }

    /// Creates an opponent from whatever `store` holds; failures yield an empty table.
    #[must_use]
    pub fn load(tuning: OpponentTuning, store: &dyn QTableStore) -> Self {
        Self::with_table(tuning, QTable::load_or_default(store))
    }

    /// Current probability of exploring.
    #[must_use]
    pub fn exploration_rate(&self) -> f32 {
        self.exploration
    }

    /// Learned values.
    #[must_use]
    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Strategy inferred for the most recent decision.
    #[must_use]
    pub fn last_strategy(&self) -> Option<Strategy> {
        self.last_strategy
    }

    /// Learns from the previous decision and picks the next action.
    pub fn decide(&mut self, observation: &Observation) -> Decision {
        let state = observation.state_key();
        let strategy = Strategy::infer(observation);

        if let Some(previous) = self.last {
            let reward = self.reward(previous, observation);
            let _ = self.update_value(previous.state, previous.action, reward, Some(state));
        }
        self.last_kills = observation.kills;

        let actions: Vec<Action> = Action::affordable(observation.gold).collect();
        let explored = self.rng.gen::<f32>() < self.exploration;
        let action = if explored {
            actions[self.rng.gen_range(0..actions.len())]
        } else {
            self.table
                .best_action(state, &actions)
                .unwrap_or(Action::Wait)
        };

        self.last = Some(Step {
            state,
            action,
            strategy,
        });
        self.last_build_succeeded = None;
        self.last_strategy = Some(strategy);
        debug!("opponent chose {action} in {state} ({strategy}, explored: {explored})");

        Decision {
            action,
            strategy,
            explored,
        }
    }

    /// Reports whether the last build action was accepted by the world.
    pub fn record_build_result(&mut self, succeeded: bool) {
        self.last_build_succeeded = Some(succeeded);
    }

    /// Applies the wave bonus to the last decision and decays exploration if the wave was survived.
    pub fn on_wave_complete(&mut self, survived: bool) {
        if let Some(previous) = self.last {
            let _ = self.update_value(previous.state, previous.action, self.tuning.wave_reward, None);
        }
        if survived {
            self.exploration = (self.exploration * self.tuning.exploration_decay)
                .max(self.tuning.min_exploration);
        }
        info!(
            "opponent finished a wave, exploration now {:.3} over {} learned values",
            self.exploration,
            self.table.len()
        );
    }

    /// Applies the terminal reward and always queues a save.
    pub fn on_game_end(&mut self, won: bool) {
        if let Some(previous) = self.last.take() {
            let reward = if won {
                self.tuning.win_reward
            } else {
                self.tuning.loss_reward
            };
            let _ = self.update_value(previous.state, previous.action, reward, None);
        }
        self.last_build_succeeded = None;
        self.queue_save();
    }

    /// Moves the value of `(state, action)` toward `reward` plus the discounted best next value.
    ///
    /// `next` of `None` marks a terminal transition with no lookahead.
    /// Returns the new value.
    pub fn update_value(
        &mut self,
        state: StateKey,
        action: Action,
        reward: f32,
        next: Option<StateKey>,
    ) -> f32 {
        let current = self.table.value(state, action);
        let lookahead = next.map_or(0.0, |next| self.table.max_value(next));
        let updated = current
            + self.tuning.learning_rate * (reward + self.tuning.discount * lookahead - current);
        self.table.set(state, action, updated);

        if self.rng.gen::<f32>() < self.tuning.save_probability {
            self.queue_save();
        }
        updated
    }

    /// Takes the pending serialized table, if a save was requested.
    pub fn take_save_request(&mut self) -> Option<String> {
        self.pending_save.take()
    }

    fn reward(&self, previous: Step, observation: &Observation) -> f32 {
        let tuning = &self.tuning;
        let mut reward = 0.0;

        if let (Action::Build(kind), Some(true)) = (previous.action, self.last_build_succeeded) {
            reward += tuning.build_reward;
            if previous.strategy.favours(kind) {
                reward += tuning.strategy_reward;
            }
        }

        let health = observation.health_ratio();
        if health < tuning.low_health_threshold {
            reward += tuning.low_health_reward;
        } else if health > tuning.high_health_threshold {
            reward += tuning.high_health_reward;
        }

        let kills = observation.kills.saturating_sub(self.last_kills);
        reward + kills as f32 * tuning.kill_reward
    }

    fn queue_save(&mut self) {
        match self.table.to_blob() {
            Ok(blob) => self.pending_save = Some(blob),
            Err(error) => warn!("could not serialize q-table: {error}"),
        }
    }
}

impl Default for AdaptiveOpponent {
    fn default() -> Self {
        Self::new(OpponentTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use conquer_core::TowerKind;

    use super::*;

    fn observation(gold: u32, kills: u32) -> Observation {
        Observation {
            lives: 20,
            max_lives: 20,
            gold,
            towers: 4,
            live_enemies: 2,
            wave: 2,
            kills,
        }
    }

    fn greedy() -> OpponentTuning {
        OpponentTuning {
            exploration_rate: 0.0,
            min_exploration: 0.0,
            save_probability: 0.0,
            ..OpponentTuning::default()
        }
    }

    #[test]
    fn first_update_from_zero_moves_a_tenth_of_the_reward() {
        let mut opponent = AdaptiveOpponent::new(greedy());
        let state = observation(100, 0).state_key();
        let next = observation(50, 0).state_key();

        let value = opponent.update_value(state, Action::Wait, 5.0, Some(next));

        assert!((value - 0.5).abs() < 1e-6);
        assert!((opponent.table().value(state, Action::Wait) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn greedy_choice_follows_learned_values() {
        let mut opponent = AdaptiveOpponent::new(greedy());
        let seen = observation(200, 0);
        opponent
            .table
            .set(seen.state_key(), Action::Build(TowerKind::Missile), 3.0);

        let decision = opponent.decide(&seen);

        assert_eq!(decision.action, Action::Build(TowerKind::Missile));
        assert!(!decision.explored);
    }

    #[test]
    fn unaffordable_builds_are_never_chosen() {
        let mut opponent = AdaptiveOpponent::new(OpponentTuning {
            exploration_rate: 1.0,
            ..OpponentTuning::default()
        });
        for _ in 0..50 {
            let decision = opponent.decide(&observation(60, 0));
            assert!(matches!(
                decision.action,
                Action::Wait | Action::Build(TowerKind::Bullet)
            ));
        }
    }

    #[test]
    fn successful_aligned_builds_and_kills_are_rewarded() {
        let mut opponent = AdaptiveOpponent::new(greedy());
        let start = observation(100, 0);
        opponent
            .table
            .set(start.state_key(), Action::Build(TowerKind::Bullet), 0.1);
        let decision = opponent.decide(&start);
        assert_eq!(decision.action, Action::Build(TowerKind::Bullet));
        assert_eq!(decision.strategy, Strategy::Balanced);
        opponent.record_build_result(true);

        let _ = opponent.decide(&observation(50, 4));

        // build 1 + strategy 2 + high health 1 + four kills 2 = 6
        let learned = opponent
            .table()
            .value(start.state_key(), Action::Build(TowerKind::Bullet));
        assert!((learned - (0.1 + 0.1 * (6.0 - 0.1))).abs() < 1e-5, "{learned}");
    }

    #[test]
    fn exploration_decays_to_its_floor() {
        let mut opponent = AdaptiveOpponent::default();
        for _ in 0..200 {
            opponent.on_wave_complete(true);
        }
        assert!((opponent.exploration_rate() - 0.05).abs() < 1e-6);

        let before = opponent.exploration_rate();
        opponent.on_wave_complete(false);
        assert_eq!(opponent.exploration_rate(), before);
    }

    #[test]
    fn game_end_is_terminal_and_requests_a_save() {
        let mut opponent = AdaptiveOpponent::new(greedy());
        let seen = observation(0, 0);
        let _ = opponent.decide(&seen);
        opponent.on_game_end(false);

        assert!((opponent.table().value(seen.state_key(), Action::Wait) + 5.0).abs() < 1e-5);
        let blob = opponent.take_save_request().expect("save requested");
        assert!(blob.contains("h4_g0_t4_e2_w2:wait"));
        assert!(opponent.take_save_request().is_none());
    }

    #[test]
    fn health_buckets_cover_the_full_range() {
        let mut seen = observation(700, 0);
        assert_eq!(seen.state_key().health, 4);
        assert_eq!(seen.state_key().gold, 10);
        seen.lives = 0;
        assert_eq!(seen.state_key().health, 0);
    }
}
