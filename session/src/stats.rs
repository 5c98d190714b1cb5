//! Human-readable summary of the adaptive systems.

use std::fmt;

use conquer_core::WaveArchetype;

/// Snapshot of the director and opponent for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AiStats {
    /// Scalar applied to every scaled enemy group.
    pub difficulty_factor: f32,
    /// Bias toward larger waves.
    pub aggressiveness: f32,
    /// Rolling summary of recent player performance.
    pub momentum: f32,
    /// Opponent exploration rate, if an opponent plays.
    pub exploration_rate: Option<f32>,
    /// Number of learned values, if an opponent plays.
    pub q_table_size: Option<usize>,
    /// Archetype of the most recently planned wave.
    pub last_archetype: Option<WaveArchetype>,
}

impl fmt::Display for AiStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "difficulty {:.2} | aggressiveness {:.2} | momentum {:+.2}",
            self.difficulty_factor, self.aggressiveness, self.momentum
        )?;
        if let (Some(exploration), Some(size)) = (self.exploration_rate, self.q_table_size) {
            write!(f, " | exploration {:.1}% | q-table {size}", exploration * 100.0)?;
        }
        if let Some(archetype) = self.last_archetype {
            write!(f, " | last wave {archetype}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_known_value() {
        let stats = AiStats {
            difficulty_factor: 1.2,
            aggressiveness: 0.55,
            momentum: -0.25,
            exploration_rate: Some(0.3),
            q_table_size: Some(42),
            last_archetype: Some(WaveArchetype::MegaBoss),
        };

        assert_eq!(
            stats.to_string(),
            "difficulty 1.20 | aggressiveness 0.55 | momentum -0.25 | exploration 30.0% | q-table 42 | last wave megaBoss"
        );
    }

    #[test]
    fn display_omits_missing_opponent() {
        let stats = AiStats {
            difficulty_factor: 1.0,
            aggressiveness: 0.5,
            momentum: 0.0,
            exploration_rate: None,
            q_table_size: None,
            last_archetype: None,
        };

        assert_eq!(
            stats.to_string(),
            "difficulty 1.00 | aggressiveness 0.50 | momentum +0.00"
        );
    }
}
