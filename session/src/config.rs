//! Aggregated tunables for a session, loadable from TOML.

use conquer_system_difficulty::DifficultyTuning;
use conquer_system_opponent::OpponentTuning;
use conquer_system_spawning::SpawningConfig;
use conquer_system_tower_combat::CombatTuning;
use conquer_world::GridConfig;
use serde::Deserialize;
use thiserror::Error;

/// Failure to read a session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or has mistyped keys.
    #[error("invalid session configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Frame driver parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Longest simulated step per update, in seconds.
    pub max_frame_dt: f32,
    /// Seconds between opponent decisions.
    pub decision_interval_secs: f32,
    /// Completed waves after which the game is won.
    pub waves_to_win: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.1,
            decision_interval_secs: 2.0,
            waves_to_win: 20,
        }
    }
}

/// Every tunable of a session. Missing TOML tables and keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frame driver parameters.
    pub frame: FrameConfig,
    /// Arena layout and economy.
    pub grid: GridConfig,
    /// Projectile flight.
    pub combat: CombatTuning,
    /// Difficulty director.
    pub difficulty: DifficultyTuning,
    /// Adaptive opponent.
    pub opponent: OpponentTuning,
    /// Spawn cadence.
    pub spawning: SpawningConfig,
}

impl SessionConfig {
    /// Parses a TOML document, overriding only the keys it names.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Replaces every seed with values derived from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.difficulty.seed = seed;
        self.opponent.seed = seed.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_override_only_named_keys() {
        let config = SessionConfig::from_toml_str(
            r#"
            [frame]
            max_frame_dt = 0.05

            [grid]
            columns = 16

            [difficulty]
            max_factor = 2.5
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.frame.max_frame_dt, 0.05);
        assert_eq!(config.frame.decision_interval_secs, 2.0);
        assert_eq!(config.grid.columns, 16);
        assert_eq!(config.grid.rows, 8);
        assert_eq!(config.difficulty.max_factor, 2.5);
        assert_eq!(config.opponent, OpponentTuning::default());
    }

    #[test]
    fn mistyped_values_are_reported() {
        let error = SessionConfig::from_toml_str("[grid]\ncolumns = \"wide\"\n")
            .expect_err("columns must be a number");
        assert!(error.to_string().starts_with("invalid session configuration"));
    }

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(
            SessionConfig::from_toml_str("").expect("empty is valid"),
            SessionConfig::default()
        );
    }
}
