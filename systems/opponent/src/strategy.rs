//! Coarse build strategies inferred from the battlefield.

use std::fmt;

use conquer_core::TowerKind;

use crate::Observation;

/// Build strategy the opponent currently favours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Lives are running out; hold the line.
    Defensive,
    /// Many enemies on the field; prefer area damage.
    AreaControl,
    /// Few towers; invest in cheap coverage.
    Economy,
    /// Nothing stands out.
    Balanced,
}

impl Strategy {
    /// Infers the strategy for the observation.
    #[must_use]
    pub fn infer(observation: &Observation) -> Self {
        if observation.health_ratio() < 0.5 {
            Self::Defensive
        } else if observation.live_enemies >= 6 {
            Self::AreaControl
        } else if observation.towers < 3 {
            Self::Economy
        } else {
            Self::Balanced
        }
    }

    /// Tower kinds that serve the strategy.
    #[must_use]
    pub const fn aligned_kinds(self) -> &'static [TowerKind] {
        match self {
            Self::Defensive => &[TowerKind::Frost, TowerKind::Sniper, TowerKind::Laser],
            Self::AreaControl => &[TowerKind::Missile, TowerKind::Tesla, TowerKind::Fire],
            Self::Economy => &[TowerKind::Bullet, TowerKind::Frost],
            Self::Balanced => &[TowerKind::Bullet, TowerKind::Laser, TowerKind::Missile],
        }
    }

    /// Whether building `kind` serves the strategy.
    #[must_use]
    pub fn favours(self, kind: TowerKind) -> bool {
        self.aligned_kinds().contains(&kind)
    }

    /// Lower-case name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Defensive => "defensive",
            Self::AreaControl => "area-control",
            Self::Economy => "economy",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
