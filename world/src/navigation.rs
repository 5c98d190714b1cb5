//! A* route planning over the full occupancy grid.

use std::{cmp::Reverse, collections::BinaryHeap};

use conquer_core::CellCoord;

use crate::grid::GridMap;

const NO_PARENT: usize = usize::MAX;

/// Immutable waypoint sequence from a start cell to a destination cell.
///
/// Consecutive cells are four-connected neighbours, so the traversal cost of a
/// path equals its number of steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Waypoints in travel order, start and destination included.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of unit steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Reports whether the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First waypoint of the path.
    #[must_use]
    pub fn start(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Final waypoint of the path.
    #[must_use]
    pub fn destination(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Reports whether the path passes through the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Consumes the path, yielding its waypoints.
    #[must_use]
    pub fn into_cells(self) -> Vec<CellCoord> {
        self.cells
    }
}

/// A* planner that keeps its search buffers between queries.
///
/// Movement is four-connected with unit cost and the heuristic is the
/// Manhattan distance, which is admissible for that movement model. Frontier
/// entries are ordered by estimated total cost and then by insertion order so
/// equal-cost nodes expand first-in first-out and results are deterministic.
#[derive(Clone, Debug, Default)]
pub struct PathPlanner {
    costs: Vec<u32>,
    parents: Vec<usize>,
    closed: Vec<bool>,
    frontier: BinaryHeap<Reverse<(u32, u64, usize)>>,
}

impl PathPlanner {
    /// Creates a planner with empty search buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the shortest route between two full-grid cells.
    ///
    /// The start cell is always treated as passable so an entity standing on a
    /// freshly blocked cell can still walk off it. Returns `None` when the
    /// destination is blocked, outside the grid, or unreachable.
    pub fn find_path(
        &mut self,
        grid: &GridMap,
        start: CellCoord,
        destination: CellCoord,
    ) -> Option<Path> {
        let start_index = grid.index(start)?;
        let destination_index = grid.index(destination)?;
        if grid.is_blocked(destination) {
            return None;
        }

        if start == destination {
            return Some(Path { cells: vec![start] });
        }

        self.reset(grid.cell_count());
        let width = grid.full_columns();
        let mut sequence: u64 = 0;

        self.costs[start_index] = 0;
        self.frontier.push(Reverse((
            start.manhattan_distance(destination),
            sequence,
            start_index,
        )));

        while let Some(Reverse((_, _, current_index))) = self.frontier.pop() {
            if self.closed[current_index] {
                continue;
            }
            self.closed[current_index] = true;

            if current_index == destination_index {
                return Some(self.reconstruct(width, destination_index));
            }

            let current = cell_from_index(width, current_index);
            let next_cost = self.costs[current_index].saturating_add(1);

            for neighbor in grid.neighbors(current) {
                if grid.is_blocked(neighbor) {
                    continue;
                }

                let Some(neighbor_index) = grid.index(neighbor) else {
                    continue;
                };

                if self.closed[neighbor_index] || self.costs[neighbor_index] <= next_cost {
                    continue;
                }

                self.costs[neighbor_index] = next_cost;
                self.parents[neighbor_index] = current_index;
                sequence += 1;
                let estimate = next_cost.saturating_add(neighbor.manhattan_distance(destination));
                self.frontier
                    .push(Reverse((estimate, sequence, neighbor_index)));
            }
        }

        None
    }

    /// Reports whether placing an obstacle on a buildable cell would cut the spawn-to-goal route.
    ///
    /// The obstacle only exists for the duration of the query; the grid is
    /// restored before this returns regardless of how the search ends. Cells
    /// outside the buildable area are reported as blocking.
    pub fn would_block(&mut self, grid: &mut GridMap, buildable: CellCoord) -> bool {
        if !grid.in_buildable_bounds(buildable) {
            return true;
        }

        let full = grid.to_full(buildable);
        let spawn = grid.spawn();
        let goal = grid.goal();
        let speculative = SpeculativeObstacle::new(grid, full);
        let route = self.find_path(speculative.grid(), spawn, goal);
        drop(speculative);

        route.map_or(true, |path| path.is_empty())
    }

    fn reset(&mut self, cell_count: usize) {
        self.costs.clear();
        self.costs.resize(cell_count, u32::MAX);
        self.parents.clear();
        self.parents.resize(cell_count, NO_PARENT);
        self.closed.clear();
        self.closed.resize(cell_count, false);
        self.frontier.clear();
    }

    fn reconstruct(&self, width: u32, destination_index: usize) -> Path {
        let mut cells = Vec::new();
        let mut cursor = destination_index;
        while cursor != NO_PARENT {
            cells.push(cell_from_index(width, cursor));
            cursor = self.parents[cursor];
        }
        cells.reverse();
        Path { cells }
    }
}

/// Temporarily blocks a full-grid cell and restores its previous state on drop.
struct SpeculativeObstacle<'a> {
    grid: &'a mut GridMap,
    cell: CellCoord,
    previous: Option<bool>,
}

impl<'a> SpeculativeObstacle<'a> {
    fn new(grid: &'a mut GridMap, cell: CellCoord) -> Self {
        let previous = grid.set_blocked(cell, true);
        Self {
            grid,
            cell,
            previous,
        }
    }

    fn grid(&self) -> &GridMap {
        self.grid
    }
}

impl Drop for SpeculativeObstacle<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            let _ = self.grid.set_blocked(self.cell, previous);
        }
    }
}

fn cell_from_index(width: u32, index: usize) -> CellCoord {
    let width = width.max(1) as usize;
    CellCoord::new((index % width) as u32, (index / width) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquer_core::TowerId;

    #[test]
    fn open_grid_path_is_straight_corridor() {
        let grid = GridMap::new(6, 3, 1.0);
        let mut planner = PathPlanner::new();

        let path = planner
            .find_path(&grid, grid.spawn(), grid.goal())
            .expect("open grid has a route");

        assert_eq!(path.len(), 7);
        assert_eq!(path.start(), Some(grid.spawn()));
        assert_eq!(path.destination(), Some(grid.goal()));
        assert!(path.cells().iter().all(|cell| cell.row() == grid.spawn().row()));
    }

    #[test]
    fn identical_queries_return_identical_paths() {
        let mut grid = GridMap::new(6, 5, 1.0);
        assert!(grid.place(CellCoord::new(2, 2), TowerId::new(0)));
        let mut planner = PathPlanner::new();

        let first = planner.find_path(&grid, grid.spawn(), grid.goal());
        let second = planner.find_path(&grid, grid.spawn(), grid.goal());

        assert_eq!(first, second);
        assert_eq!(first.map(|path| path.len()), Some(9));
    }

    #[test]
    fn blocked_destination_has_no_path() {
        let grid = GridMap::new(3, 3, 1.0);
        let mut planner = PathPlanner::new();
        assert!(planner
            .find_path(&grid, grid.spawn(), CellCoord::new(0, 0))
            .is_none());
    }

    #[test]
    fn speculative_obstacle_is_rolled_back() {
        let mut grid = GridMap::new(1, 1, 1.0);
        let mut planner = PathPlanner::new();
        let cell = CellCoord::new(0, 0);

        assert!(planner.would_block(&mut grid, cell));
        assert!(!grid.is_blocked(grid.to_full(cell)));
        assert!(grid.can_build(cell));
    }
}
