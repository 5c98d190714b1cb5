#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Code & Conquer simulation.
//!
//! The world owns the occupancy grid, the route planner, towers, enemies and
//! the enemy spatial index. It only changes through [`apply`], which executes a
//! [`Command`] and reports what happened as [`Event`] values. Frame systems
//! that need to mutate combat state borrow it through [`World::combat_scene`].

pub mod enemies;
pub mod grid;
pub mod navigation;
pub mod spatial;
pub mod towers;

use std::time::Duration;

use conquer_core::{
    CellCoord, Command, EnemyId, EnemyKind, Event, PlacementError, RemovalError, TargetingMode,
    TowerId, TowerKind,
};
use log::{debug, warn};
use serde::Deserialize;

use crate::{
    enemies::{EnemyRoster, Waypoint},
    grid::GridMap,
    navigation::{Path, PathPlanner},
    spatial::SpatialIndex,
    towers::TowerRegistry,
};

/// Static layout and economy parameters of a world.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of buildable columns.
    pub columns: u32,
    /// Number of buildable rows.
    pub rows: u32,
    /// Side length of a grid cell in world units.
    pub cell_size: f32,
    /// Lives the player starts with.
    pub starting_lives: u32,
    /// Gold the player starts with.
    pub starting_gold: u32,
    /// Bucket size of the enemy spatial index in world units.
    pub index_cell_size: f32,
    /// Fraction of a tower's cost refunded on removal.
    pub refund_ratio: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 8,
            cell_size: 2.0,
            starting_lives: 20,
            starting_gold: 250,
            index_cell_size: 4.0,
            refund_ratio: 0.5,
        }
    }
}

/// Represents the authoritative simulation state.
#[derive(Debug)]
pub struct World {
    config: GridConfig,
    grid: GridMap,
    planner: PathPlanner,
    route: Option<Path>,
    towers: TowerRegistry,
    enemies: EnemyRoster,
    enemy_index: SpatialIndex<EnemyId>,
    clock: Duration,
    lives: u32,
    gold: u32,
}

/// Mutable view of the state combat systems operate on.
#[derive(Debug)]
pub struct CombatScene<'a> {
    /// Current simulation time.
    pub now: Duration,
    /// Towers that may fire.
    pub towers: &'a mut TowerRegistry,
    /// Enemies that may be targeted and damaged.
    pub enemies: &'a mut EnemyRoster,
    /// Spatial index over enemy positions.
    pub index: &'a SpatialIndex<EnemyId>,
}

impl World {
    /// Creates a world from the provided layout configuration.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let grid = GridMap::new(config.columns, config.rows, config.cell_size);
        let mut planner = PathPlanner::new();
        let route = planner.find_path(&grid, grid.spawn(), grid.goal());
        Self {
            enemy_index: SpatialIndex::new(config.index_cell_size),
            lives: config.starting_lives,
            gold: config.starting_gold,
            config,
            grid,
            planner,
            route,
            towers: TowerRegistry::new(),
            enemies: EnemyRoster::new(),
            clock: Duration::ZERO,
        }
    }

    /// Lends the combat-relevant state to targeting and combat systems.
    pub fn combat_scene(&mut self) -> CombatScene<'_> {
        CombatScene {
            now: self.clock,
            towers: &mut self.towers,
            enemies: &mut self.enemies,
            index: &self.enemy_index,
        }
    }

    /// Removes dead and escaped enemies from the roster and the spatial index.
    pub fn cull(&mut self) -> Vec<EnemyId> {
        let removed = self.enemies.remove_inactive();
        for id in &removed {
            let _ = self.enemy_index.remove(*id);
        }
        removed
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let now = self.clock;
        let dt_seconds = dt.as_secs_f32();
        let Self {
            grid,
            planner,
            enemies,
            enemy_index,
            lives,
            ..
        } = self;
        let goal = grid.goal();

        for enemy in enemies.iter_mut() {
            if !enemy.is_active() {
                continue;
            }

            let id = enemy.id();
            let burn = enemy.tick_status(now);
            if burn.dealt > 0.0 {
                out_events.push(Event::BurnDamage {
                    enemy: id,
                    damage: burn.dealt,
                });
            }
            if burn.killed {
                let _ = enemy_index.remove(id);
                out_events.push(Event::EnemyKilled {
                    enemy: id,
                    kind: enemy.kind(),
                    position: enemy.position(),
                    bounty: enemy.profile().bounty,
                });
                continue;
            }

            if enemy.is_stuck() {
                if let Some(path) = planner.find_path(grid, enemy.cell(), goal) {
                    out_events.push(Event::EnemyRerouted {
                        enemy: id,
                        waypoints: path.cells().len(),
                    });
                    enemy.set_route(waypoints(grid, &path));
                }
            }

            let _ = enemy.advance(dt_seconds);
            let _ = enemy_index.update(id, enemy.position());

            if enemy.has_arrived(goal) {
                let lives_lost = enemy.profile().lives_cost;
                enemy.mark_escaped();
                let _ = enemy_index.remove(id);
                *lives = lives.saturating_sub(lives_lost);
                out_events.push(Event::EnemyEscaped {
                    enemy: id,
                    lives_lost,
                });
            }
        }
    }

    fn place_tower(&mut self, kind: TowerKind, cell: CellCoord, out_events: &mut Vec<Event>) {
        let cost = kind.profile().cost;
        let rejection = if !self.grid.in_buildable_bounds(cell) {
            Some(PlacementError::OutOfBounds)
        } else if self.grid.structure_at(cell).is_some() {
            Some(PlacementError::Occupied)
        } else if self.planner.would_block(&mut self.grid, cell) {
            Some(PlacementError::BlocksPath)
        } else if self.gold < cost {
            Some(PlacementError::InsufficientGold)
        } else {
            None
        };

        if let Some(reason) = rejection {
            debug!("rejected {kind} tower at {cell:?}: {reason}");
            out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            return;
        }

        let full = self.grid.to_full(cell);
        let id = self
            .towers
            .insert(kind, cell, self.grid.cell_center(full));
        if !self.grid.place(cell, id) {
            let _ = self.towers.remove(id);
            out_events.push(Event::TowerPlacementRejected {
                kind,
                cell,
                reason: PlacementError::Occupied,
            });
            return;
        }

        self.gold -= cost;
        self.refresh_route();
        out_events.push(Event::TowerPlaced {
            tower: id,
            kind,
            cell,
        });
        out_events.push(Event::GoldChanged { gold: self.gold });
        self.reroute_through(full, out_events);
    }

    fn remove_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) {
        let Some(removed) = self.towers.remove(tower) else {
            debug!("rejected removal of unknown tower {}", tower.get());
            out_events.push(Event::TowerRemovalRejected {
                tower,
                reason: RemovalError::MissingTower,
            });
            return;
        };

        let cell = removed.cell();
        let _ = self.grid.remove(cell);
        let refund = (removed.profile().cost as f32 * self.config.refund_ratio.clamp(0.0, 1.0))
            .floor() as u32;
        self.gold = self.gold.saturating_add(refund);
        self.refresh_route();
        out_events.push(Event::TowerRemoved {
            tower,
            cell,
            refund,
        });
        out_events.push(Event::GoldChanged { gold: self.gold });
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, out_events: &mut Vec<Event>) {
        let Some(route) = self.route.as_ref() else {
            warn!("no route from spawn to goal; dropping {kind} spawn");
            out_events.push(Event::EnemySpawnBlocked { kind });
            return;
        };

        let spawn = self.grid.spawn();
        let position = self.grid.cell_center(spawn);
        let id = self.enemies.spawn(kind, spawn, position);
        let route_waypoints = waypoints(&self.grid, route);
        if let Some(enemy) = self.enemies.get_mut(id) {
            enemy.set_route(route_waypoints);
        }
        self.enemy_index.insert(id, position);
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind,
            cell: spawn,
        });
    }

    fn set_targeting(&mut self, tower: TowerId, mode: TargetingMode, out_events: &mut Vec<Event>) {
        match self.towers.get_mut(tower) {
            Some(entry) => {
                entry.set_targeting(mode);
                out_events.push(Event::TargetingChanged { tower, mode });
            }
            None => debug!("ignored targeting change for unknown tower {}", tower.get()),
        }
    }

    fn refresh_route(&mut self) {
        self.route = self
            .planner
            .find_path(&self.grid, self.grid.spawn(), self.grid.goal());
    }

    fn reroute_through(&mut self, blocked: CellCoord, out_events: &mut Vec<Event>) {
        let goal = self.grid.goal();
        for enemy in self.enemies.iter_mut() {
            if !enemy.is_active() || !enemy.route_contains(blocked) {
                continue;
            }

            match self.planner.find_path(&self.grid, enemy.cell(), goal) {
                Some(path) => {
                    out_events.push(Event::EnemyRerouted {
                        enemy: enemy.id(),
                        waypoints: path.cells().len(),
                    });
                    enemy.set_route(waypoints(&self.grid, &path));
                }
                None => {
                    enemy.mark_stuck();
                    out_events.push(Event::EnemyStuck { enemy: enemy.id() });
                }
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

fn waypoints<'a>(grid: &'a GridMap, path: &'a Path) -> impl Iterator<Item = Waypoint> + 'a {
    path.cells().iter().map(move |cell| Waypoint {
        cell: *cell,
        position: grid.cell_center(*cell),
    })
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PlaceTower { kind, cell } => world.place_tower(kind, cell, out_events),
        Command::RemoveTower { tower } => world.remove_tower(tower, out_events),
        Command::SpawnEnemy { kind } => world.spawn_enemy(kind, out_events),
        Command::SetTargeting { tower, mode } => world.set_targeting(tower, mode, out_events),
        Command::AwardGold { amount } => {
            world.gold = world.gold.saturating_add(amount);
            out_events.push(Event::GoldChanged { gold: world.gold });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use conquer_core::{EnemyId, TowerId};

    use super::{GridConfig, World};
    use crate::{
        enemies::{Enemy, EnemyRoster},
        grid::GridMap,
        navigation::Path,
        spatial::SpatialIndex,
        towers::{Tower, TowerRegistry},
    };

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &GridConfig {
        &world.config
    }

    /// Occupancy grid of the arena.
    #[must_use]
    pub fn grid(world: &World) -> &GridMap {
        &world.grid
    }

    /// Current spawn-to-goal route, if one exists.
    #[must_use]
    pub fn route(world: &World) -> Option<&Path> {
        world.route.as_ref()
    }

    /// Monotonic simulation clock.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Lives the player has left.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Gold available to the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Registered towers.
    #[must_use]
    pub fn towers(world: &World) -> &TowerRegistry {
        &world.towers
    }

    /// Looks up a single tower.
    #[must_use]
    pub fn tower(world: &World, id: TowerId) -> Option<&Tower> {
        world.towers.get(id)
    }

    /// Enemies that have not been culled yet.
    #[must_use]
    pub fn enemies(world: &World) -> &EnemyRoster {
        &world.enemies
    }

    /// Looks up a single enemy.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<&Enemy> {
        world.enemies.get(id)
    }

    /// Spatial index over active enemy positions.
    #[must_use]
    pub fn enemy_index(world: &World) -> &SpatialIndex<EnemyId> {
        &world.enemy_index
    }
}
