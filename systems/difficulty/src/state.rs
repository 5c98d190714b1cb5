//! Bounded difficulty scalars and rolling performance windows.

use std::{collections::VecDeque, time::Duration};

use conquer_core::WaveArchetype;

use crate::DifficultyTuning;

/// Mutable difficulty state. Every scalar is clamped at the point of mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyState {
    difficulty_factor: f32,
    aggressiveness: f32,
    momentum: f32,
    factor_bounds: (f32, f32),
    aggressiveness_bounds: (f32, f32),
    window: usize,
    recent_lives_lost: VecDeque<u32>,
    recent_completion: VecDeque<Duration>,
    last_seen: [u32; WaveArchetype::ALL.len()],
    waves_since_boss: u32,
}

impl DifficultyState {
    /// Creates a neutral state bounded by the provided tuning.
    #[must_use]
    pub fn new(tuning: &DifficultyTuning) -> Self {
        let factor_bounds = ordered(tuning.min_factor, tuning.max_factor);
        let aggressiveness_bounds = ordered(tuning.min_aggressiveness, tuning.max_aggressiveness);
        let mut state = Self {
            difficulty_factor: factor_bounds.0,
            aggressiveness: aggressiveness_bounds.0,
            momentum: 0.0,
            factor_bounds,
            aggressiveness_bounds,
            window: tuning.history_window.max(1),
            recent_lives_lost: VecDeque::new(),
            recent_completion: VecDeque::new(),
            last_seen: [0; WaveArchetype::ALL.len()],
            waves_since_boss: 0,
        };
        state.set_difficulty_factor(tuning.initial_factor);
        state.set_aggressiveness(tuning.initial_aggressiveness);
        state
    }

    /// Scalar applied to every scaled enemy group.
    #[must_use]
    pub fn difficulty_factor(&self) -> f32 {
        self.difficulty_factor
    }

    /// Bias toward larger waves, in the configured bounds.
    #[must_use]
    pub fn aggressiveness(&self) -> f32 {
        self.aggressiveness
    }

    /// Rolling summary of recent player performance in `[-1, 1]`.
    #[must_use]
    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    /// Sets the difficulty factor, clamped to its bounds.
    pub fn set_difficulty_factor(&mut self, value: f32) {
        self.difficulty_factor = clamp_finite(value, self.factor_bounds, self.difficulty_factor);
    }

    /// Sets the aggressiveness, clamped to its bounds.
    pub fn set_aggressiveness(&mut self, value: f32) {
        self.aggressiveness = clamp_finite(value, self.aggressiveness_bounds, self.aggressiveness);
    }

    /// Sets the momentum, clamped to `[-1, 1]`.
    pub fn set_momentum(&mut self, value: f32) {
        self.momentum = clamp_finite(value, (-1.0, 1.0), self.momentum);
    }

    /// Records a finished wave in the rolling windows.
    pub fn push_outcome(&mut self, lives_lost: u32, completion_time: Duration) {
        self.recent_lives_lost.push_back(lives_lost);
        self.recent_completion.push_back(completion_time);
        while self.recent_lives_lost.len() > self.window {
            let _ = self.recent_lives_lost.pop_front();
        }
        while self.recent_completion.len() > self.window {
            let _ = self.recent_completion.pop_front();
        }
    }

    /// Mean lives lost over the rolling window, zero when empty.
    #[must_use]
    pub fn average_lives_lost(&self) -> f32 {
        if self.recent_lives_lost.is_empty() {
            return 0.0;
        }
        self.recent_lives_lost.iter().sum::<u32>() as f32 / self.recent_lives_lost.len() as f32
    }

    /// Mean completion time over the rolling window, zero when empty.
    #[must_use]
    pub fn average_completion_time(&self) -> Duration {
        if self.recent_completion.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.recent_completion.iter().sum();
        total / self.recent_completion.len() as u32
    }

    /// Number of waves since the archetype last appeared, counting from wave zero.
    #[must_use]
    pub fn waves_since(&self, archetype: WaveArchetype, wave: u32) -> u32 {
        wave.saturating_sub(self.last_seen[slot(archetype)])
    }

    /// Number of waves planned since the last boss or mega-boss wave.
    #[must_use]
    pub fn waves_since_boss(&self) -> u32 {
        self.waves_since_boss
    }

    pub(crate) fn mark_planned(&mut self, archetype: WaveArchetype, wave: u32) {
        self.last_seen[slot(archetype)] = wave;
        if matches!(archetype, WaveArchetype::Boss | WaveArchetype::MegaBoss) {
            self.waves_since_boss = 0;
        } else {
            self.waves_since_boss = self.waves_since_boss.saturating_add(1);
        }
    }
}

fn slot(archetype: WaveArchetype) -> usize {
    WaveArchetype::ALL
        .iter()
        .position(|candidate| *candidate == archetype)
        .unwrap_or(0)
}

fn ordered(low: f32, high: f32) -> (f32, f32) {
    if low <= high {
        (low, high)
    } else {
        (high, low)
    }
}

fn clamp_finite(value: f32, (low, high): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(low, high)
    } else {
        fallback.clamp(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_clamped() {
        let mut state = DifficultyState::new(&DifficultyTuning::default());

        state.set_difficulty_factor(5.0);
        assert_eq!(state.difficulty_factor(), 1.8);
        state.set_difficulty_factor(-5.0);
        assert_eq!(state.difficulty_factor(), 0.7);
        state.set_aggressiveness(2.0);
        assert_eq!(state.aggressiveness(), 0.9);
        state.set_momentum(-3.0);
        assert_eq!(state.momentum(), -1.0);
        state.set_momentum(f32::NAN);
        assert_eq!(state.momentum(), -1.0);
    }

    #[test]
    fn rolling_windows_keep_the_most_recent_waves() {
        let mut state = DifficultyState::new(&DifficultyTuning::default());
        for lives in 0..8 {
            state.push_outcome(lives, Duration::from_secs(u64::from(lives) * 10));
        }

        assert_eq!(state.average_lives_lost(), 5.0);
        assert_eq!(state.average_completion_time(), Duration::from_secs(50));
    }

    #[test]
    fn boss_waves_reset_the_boss_counter() {
        let mut state = DifficultyState::new(&DifficultyTuning::default());
        state.mark_planned(WaveArchetype::Standard, 1);
        state.mark_planned(WaveArchetype::Swarm, 2);
        assert_eq!(state.waves_since_boss(), 2);
        assert_eq!(state.waves_since(WaveArchetype::Swarm, 5), 3);

        state.mark_planned(WaveArchetype::Boss, 5);
        assert_eq!(state.waves_since_boss(), 0);
    }
}
