#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tower targeting: a pure selection policy plus the frame system that feeds it.

use conquer_core::{EnemyId, TargetingMode, TowerTarget, Vec2};
use conquer_world::{enemies::Enemy, enemies::EnemyRoster, spatial::SpatialIndex, towers::TowerRegistry};

/// Read-only facts about an enemy that targeting policies compare.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// World-space position of the enemy.
    pub position: Vec2,
    /// Distance left to the destination along the enemy's route.
    pub remaining_distance: f32,
    /// Current health.
    pub health: f32,
    /// Current movement speed.
    pub speed: f32,
    /// Whether the enemy is a boss.
    pub is_boss: bool,
    /// Whether the enemy died or escaped.
    pub dead: bool,
}

impl Candidate {
    /// Captures the targeting-relevant state of an enemy.
    #[must_use]
    pub fn from_enemy(enemy: &Enemy) -> Self {
        Self {
            id: enemy.id(),
            position: enemy.position(),
            remaining_distance: enemy.remaining_distance(),
            health: enemy.health(),
            speed: enemy.current_speed(),
            is_boss: enemy.is_boss(),
            dead: !enemy.is_active(),
        }
    }
}

/// Position and reach of the tower a target is being chosen for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emplacement {
    /// World-space position of the tower.
    pub position: Vec2,
    /// Targeting radius in world units, boundary inclusive.
    pub range: f32,
}

/// Picks a single target among `candidates` according to `mode`.
///
/// Candidates outside the range or flagged dead are ignored. Remaining
/// candidates are evaluated in slice order and only a strictly better score
/// replaces the incumbent, so ties resolve to the first candidate found.
/// [`TargetingMode::Boss`] picks the first boss and otherwise behaves like
/// [`TargetingMode::First`]. Returns `None` when nothing is in range.
#[must_use]
pub fn select_target(
    emplacement: &Emplacement,
    candidates: &[Candidate],
    mode: TargetingMode,
) -> Option<EnemyId> {
    let in_range = |candidate: &&Candidate| {
        !candidate.dead && candidate.position.distance(emplacement.position) <= emplacement.range
    };

    if mode == TargetingMode::Boss {
        if let Some(boss) = candidates
            .iter()
            .filter(in_range)
            .find(|candidate| candidate.is_boss)
        {
            return Some(boss.id);
        }
        return select_target(emplacement, candidates, TargetingMode::First);
    }

    let mut best: Option<&Candidate> = None;
    for candidate in candidates.iter().filter(in_range) {
        let replace = match best {
            None => true,
            Some(incumbent) => outranks(emplacement, candidate, incumbent, mode),
        };
        if replace {
            best = Some(candidate);
        }
    }

    best.map(|candidate| candidate.id)
}

fn outranks(
    emplacement: &Emplacement,
    challenger: &Candidate,
    incumbent: &Candidate,
    mode: TargetingMode,
) -> bool {
    match mode {
        TargetingMode::First | TargetingMode::Boss => {
            challenger.remaining_distance < incumbent.remaining_distance
        }
        TargetingMode::Last => challenger.remaining_distance > incumbent.remaining_distance,
        TargetingMode::Closest => {
            challenger.position.distance(emplacement.position)
                < incumbent.position.distance(emplacement.position)
        }
        TargetingMode::Strongest => challenger.health > incumbent.health,
        TargetingMode::Weakest => challenger.health < incumbent.health,
        TargetingMode::Fastest => challenger.speed > incumbent.speed,
    }
}

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    nearby: Vec<(EnemyId, f32)>,
    candidates: Vec<Candidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes one target per tower that has an enemy in range.
    ///
    /// Candidate enemies come from a radius query against the spatial index,
    /// so only enemies near each tower are considered. The output buffer is
    /// cleared before populating it with the latest assignments.
    pub fn handle(
        &mut self,
        towers: &TowerRegistry,
        enemies: &EnemyRoster,
        index: &SpatialIndex<EnemyId>,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if towers.is_empty() || index.is_empty() {
            return;
        }

        for tower in towers.iter() {
            let emplacement = Emplacement {
                position: tower.position(),
                range: tower.range(),
            };

            index.query_radius_into(emplacement.position, emplacement.range, &mut self.nearby);
            self.candidates.clear();
            self.candidates.extend(
                self.nearby
                    .iter()
                    .filter_map(|(id, _)| enemies.get(*id))
                    .filter(|enemy| enemy.is_active())
                    .map(Candidate::from_enemy),
            );

            if let Some(enemy) = select_target(&emplacement, &self.candidates, tower.targeting()) {
                out.push(TowerTarget {
                    tower: tower.id(),
                    enemy,
                });
            }
        }
    }
}
