//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use conquer_core::{CellCoord, TargetingMode, TowerId, TowerKind, TowerProfile, Vec2};

/// Tower stored inside the world.
#[derive(Clone, Debug)]
pub struct Tower {
    id: TowerId,
    kind: TowerKind,
    profile: TowerProfile,
    cell: CellCoord,
    position: Vec2,
    mode: TargetingMode,
    last_fired: Option<Duration>,
}

impl Tower {
    /// Identifier allocated by the registry.
    #[must_use]
    pub fn id(&self) -> TowerId {
        self.id
    }

    /// Kind of tower that was constructed.
    #[must_use]
    pub fn kind(&self) -> TowerKind {
        self.kind
    }

    /// Combat profile of the tower.
    #[must_use]
    pub fn profile(&self) -> &TowerProfile {
        &self.profile
    }

    /// Buildable cell the tower occupies.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    /// World-space position of the tower.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Targeting radius in world units.
    #[must_use]
    pub fn range(&self) -> f32 {
        self.profile.range
    }

    /// Active targeting policy.
    #[must_use]
    pub fn targeting(&self) -> TargetingMode {
        self.mode
    }

    /// Switches the targeting policy.
    pub fn set_targeting(&mut self, mode: TargetingMode) {
        self.mode = mode;
    }

    /// Simulation time of the most recent shot.
    #[must_use]
    pub fn last_fired(&self) -> Option<Duration> {
        self.last_fired
    }

    /// Whether at least one fire interval has elapsed since the last shot.
    #[must_use]
    pub fn ready_to_fire(&self, now: Duration) -> bool {
        self.last_fired.map_or(true, |last| {
            now.saturating_sub(last) >= self.profile.fire_interval()
        })
    }

    /// Records a shot at the provided simulation time.
    pub fn mark_fired(&mut self, now: Duration) {
        self.last_fired = Some(now);
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Clone, Debug, Default)]
pub struct TowerRegistry {
    entries: BTreeMap<TowerId, Tower>,
    next_tower_id: u32,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tower with the stock profile of its kind.
    pub fn insert(&mut self, kind: TowerKind, cell: CellCoord, position: Vec2) -> TowerId {
        self.insert_with_profile(kind, kind.profile(), cell, position)
    }

    /// Registers a tower with an explicit profile.
    pub fn insert_with_profile(
        &mut self,
        kind: TowerKind,
        profile: TowerProfile,
        cell: CellCoord,
        position: Vec2,
    ) -> TowerId {
        let id = TowerId::new(self.next_tower_id);
        self.next_tower_id = self.next_tower_id.wrapping_add(1);
        let _ = self.entries.insert(
            id,
            Tower {
                id,
                kind,
                profile,
                cell,
                position,
                mode: TargetingMode::default(),
                last_fired: None,
            },
        );
        id
    }

    /// Identifier the next registered tower will receive.
    #[must_use]
    pub fn peek_next_id(&self) -> TowerId {
        TowerId::new(self.next_tower_id)
    }

    /// Removes a tower.
    pub fn remove(&mut self, id: TowerId) -> Option<Tower> {
        self.entries.remove(&id)
    }

    /// Looks up a tower.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&Tower> {
        self.entries.get(&id)
    }

    /// Looks up a tower mutably.
    pub fn get_mut(&mut self, id: TowerId) -> Option<&mut Tower> {
        self.entries.get_mut(&id)
    }

    /// Iterates over towers in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Tower> {
        self.entries.values()
    }

    /// Number of registered towers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no towers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the nominal damage per second of every tower.
    #[must_use]
    pub fn total_dps(&self) -> f32 {
        self.entries.values().map(|tower| tower.profile.dps()).sum()
    }
}
