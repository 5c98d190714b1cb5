#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawning system that realizes wave plans as timed spawn commands.

use std::{collections::VecDeque, time::Duration};

use conquer_core::{Command, EnemyGroup, EnemyKind, Event, WavePlan};
use log::debug;
use serde::Deserialize;

/// Spawn cadence configuration.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Seconds between spawns on the first wave.
    pub base_interval_secs: f32,
    /// Seconds removed from the interval per wave after the first.
    pub interval_step_secs: f32,
    /// Shortest interval regardless of wave number.
    pub min_interval_secs: f32,
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 1.0,
            interval_step_secs: 0.05,
            min_interval_secs: 0.3,
        }
    }
}

impl SpawningConfig {
    /// Spawn interval used for `wave`.
    #[must_use]
    pub fn interval_for(&self, wave: u32) -> Duration {
        let shrink = self.interval_step_secs.max(0.0) * wave.saturating_sub(1) as f32;
        let floor = self.min_interval_secs.max(0.0);
        let seconds = (self.base_interval_secs - shrink).max(floor);
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
    }
}

/// Pure system that emits [`Command::SpawnEnemy`] for the queued wave.
#[derive(Debug, Default)]
pub struct Spawning {
    config: SpawningConfig,
    queue: VecDeque<EnemyKind>,
    spawn_interval: Duration,
    accumulator: Duration,
}

impl Spawning {
    /// Creates an idle spawning system.
    #[must_use]
    pub fn new(config: SpawningConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replaces the queue with the enemies of `plan`.
    ///
    /// Regular groups are interleaved one enemy at a time so mixed waves
    /// arrive mixed; bosses are queued after everything else. The first
    /// enemy spawns on the next time advance.
    pub fn begin_wave(&mut self, plan: &WavePlan) {
        self.queue.clear();
        let (bosses, regulars): (Vec<&EnemyGroup>, Vec<&EnemyGroup>) = plan
            .groups()
            .iter()
            .partition(|group| group.kind.profile().is_boss);

        let mut remaining: Vec<_> = regulars
            .iter()
            .map(|group| (group.kind, group.count))
            .collect();
        while remaining.iter().any(|(_, count)| *count > 0) {
            for (kind, count) in &mut remaining {
                if *count > 0 {
                    *count -= 1;
                    self.queue.push_back(*kind);
                }
            }
        }
        for group in bosses {
            self.queue
                .extend(std::iter::repeat(group.kind).take(group.count as usize));
        }

        self.spawn_interval = self.config.interval_for(plan.wave());
        self.accumulator = self.spawn_interval;
        debug!(
            "queued {} enemies for wave {} at {:?} intervals",
            self.queue.len(),
            plan.wave(),
            self.spawn_interval
        );
    }

    /// Enemies still waiting to spawn.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether every queued enemy has been emitted.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Consumes time events and emits one spawn command per elapsed interval.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        if self.queue.is_empty() {
            self.accumulator = Duration::ZERO;
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        while self.accumulator >= self.spawn_interval {
            let Some(kind) = self.queue.pop_front() else {
                self.accumulator = Duration::ZERO;
                break;
            };
            out.push(Command::SpawnEnemy { kind });
            if self.spawn_interval.is_zero() {
                continue;
            }
            self.accumulator -= self.spawn_interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_shrinks_to_its_floor() {
        let config = SpawningConfig::default();
        assert_eq!(config.interval_for(1), Duration::from_secs(1));
        assert!(config.interval_for(5) < config.interval_for(4));
        assert_eq!(config.interval_for(40), config.interval_for(100));
        assert!((config.interval_for(100).as_secs_f32() - 0.3).abs() < 1e-4);
    }

    #[test]
    fn idle_system_drops_accumulated_time() {
        let mut spawning = Spawning::new(SpawningConfig::default());
        spawning.accumulator = Duration::from_secs(10);
        let mut out = Vec::new();
        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(1),
            }],
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(spawning.accumulator, Duration::ZERO);
    }
}
