//! Occupancy grid covering the arena and its bordered corridors.

use conquer_core::{CellCoord, TowerId, Vec2};

/// Classification of a cell in the full grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellClass {
    /// Cell inside the buildable sub-grid.
    Buildable,
    /// Blocked perimeter cell.
    Border,
    /// Perimeter gap enemies enter through.
    Spawn,
    /// Perimeter gap enemies leave through.
    Goal,
}

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    blocked: bool,
    structure: Option<TowerId>,
}

/// Dense occupancy grid consisting of a buildable area wrapped in a one-cell border.
///
/// Two coordinate spaces exist. Buildable coordinates address the inner
/// `columns x rows` area where towers may be placed. Full coordinates address
/// the bordered `(columns + 2) x (rows + 2)` grid the planner searches. The
/// border is blocked except for a spawn gap in the west column and a goal gap
/// in the east column, both on the middle row.
#[derive(Clone, Debug)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    cell_size: f32,
    cells: Vec<Cell>,
    spawn: CellCoord,
    goal: CellCoord,
}

impl GridMap {
    /// Creates a grid with the provided buildable dimensions and world-space cell size.
    ///
    /// Zero dimensions are raised to one and non-positive cell sizes fall back to `1.0`.
    #[must_use]
    pub fn new(columns: u32, rows: u32, cell_size: f32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };

        let full_columns = columns + 2;
        let full_rows = rows + 2;
        let gap_row = 1 + rows / 2;
        let spawn = CellCoord::new(0, gap_row);
        let goal = CellCoord::new(full_columns - 1, gap_row);

        let mut grid = Self {
            columns,
            rows,
            cell_size,
            cells: vec![Cell::default(); (full_columns * full_rows) as usize],
            spawn,
            goal,
        };

        for row in 0..full_rows {
            for column in 0..full_columns {
                let cell = CellCoord::new(column, row);
                if grid.classify(cell) == Some(CellClass::Border) {
                    if let Some(index) = grid.index(cell) {
                        grid.cells[index].blocked = true;
                    }
                }
            }
        }

        grid
    }

    /// Number of buildable columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of buildable rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Width of the full grid in cells, border included.
    #[must_use]
    pub const fn full_columns(&self) -> u32 {
        self.columns + 2
    }

    /// Height of the full grid in cells, border included.
    #[must_use]
    pub const fn full_rows(&self) -> u32 {
        self.rows + 2
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Full-grid cell enemies spawn on.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        self.spawn
    }

    /// Full-grid cell enemies are heading for.
    #[must_use]
    pub const fn goal(&self) -> CellCoord {
        self.goal
    }

    /// Maps a full-grid coordinate into the buildable sub-grid.
    ///
    /// Border and corridor cells, as well as anything outside the full grid,
    /// have no buildable counterpart and yield `None`.
    #[must_use]
    pub fn to_buildable(&self, full: CellCoord) -> Option<CellCoord> {
        let column = full.column().checked_sub(1)?;
        let row = full.row().checked_sub(1)?;
        (column < self.columns && row < self.rows).then(|| CellCoord::new(column, row))
    }

    /// Maps a buildable coordinate into the full grid.
    #[must_use]
    pub const fn to_full(&self, buildable: CellCoord) -> CellCoord {
        CellCoord::new(buildable.column() + 1, buildable.row() + 1)
    }

    /// Classifies a full-grid cell, or returns `None` when it lies outside the grid.
    #[must_use]
    pub fn classify(&self, full: CellCoord) -> Option<CellClass> {
        if full.column() >= self.full_columns() || full.row() >= self.full_rows() {
            return None;
        }

        if full == self.spawn {
            Some(CellClass::Spawn)
        } else if full == self.goal {
            Some(CellClass::Goal)
        } else if self.to_buildable(full).is_some() {
            Some(CellClass::Buildable)
        } else {
            Some(CellClass::Border)
        }
    }

    /// Reports whether the buildable coordinate is in bounds and unoccupied.
    #[must_use]
    pub fn can_build(&self, buildable: CellCoord) -> bool {
        self.in_buildable_bounds(buildable) && self.structure_at(buildable).is_none()
    }

    /// Reports whether the buildable coordinate lies inside the buildable area.
    #[must_use]
    pub const fn in_buildable_bounds(&self, buildable: CellCoord) -> bool {
        buildable.column() < self.columns && buildable.row() < self.rows
    }

    /// Places a structure on a buildable cell and mirrors the obstacle into the full grid.
    ///
    /// Returns `false` without changes when the cell cannot be built on.
    pub fn place(&mut self, buildable: CellCoord, structure: TowerId) -> bool {
        if !self.can_build(buildable) {
            return false;
        }

        let Some(index) = self.index(self.to_full(buildable)) else {
            return false;
        };
        self.cells[index] = Cell {
            blocked: true,
            structure: Some(structure),
        };
        true
    }

    /// Clears the structure on a buildable cell, returning whether one was present.
    pub fn remove(&mut self, buildable: CellCoord) -> bool {
        if !self.in_buildable_bounds(buildable) {
            return false;
        }

        let Some(index) = self.index(self.to_full(buildable)) else {
            return false;
        };
        let cell = &mut self.cells[index];
        if cell.structure.take().is_none() {
            return false;
        }
        cell.blocked = false;
        true
    }

    /// Structure occupying the buildable cell, if any.
    #[must_use]
    pub fn structure_at(&self, buildable: CellCoord) -> Option<TowerId> {
        if !self.in_buildable_bounds(buildable) {
            return None;
        }
        self.index(self.to_full(buildable))
            .and_then(|index| self.cells[index].structure)
    }

    /// Reports whether a full-grid cell is impassable. Cells outside the grid are impassable.
    #[must_use]
    pub fn is_blocked(&self, full: CellCoord) -> bool {
        self.index(full)
            .map_or(true, |index| self.cells[index].blocked)
    }

    /// Overrides the blocked flag of a full-grid cell, returning the previous value.
    pub(crate) fn set_blocked(&mut self, full: CellCoord, blocked: bool) -> Option<bool> {
        let index = self.index(full)?;
        Some(std::mem::replace(&mut self.cells[index].blocked, blocked))
    }

    /// World-space centre of a full-grid cell.
    #[must_use]
    pub fn cell_center(&self, full: CellCoord) -> Vec2 {
        Vec2::new(
            (full.column() as f32 + 0.5) * self.cell_size,
            (full.row() as f32 + 0.5) * self.cell_size,
        )
    }

    /// Full-grid cell containing a world-space position, if any.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if !position.is_finite() || position.x < 0.0 || position.y < 0.0 {
            return None;
        }

        let column = (position.x / self.cell_size).floor() as u32;
        let row = (position.y / self.cell_size).floor() as u32;
        (column < self.full_columns() && row < self.full_rows())
            .then(|| CellCoord::new(column, row))
    }

    /// Iterates over every buildable coordinate in row-major order.
    pub fn buildable_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| CellCoord::new(column, row))
        })
    }

    /// Four-connected neighbours of a full-grid cell in north, east, south, west order.
    pub(crate) fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> {
        let mut candidates = [None; 4];
        let mut count = 0;

        if let Some(row) = cell.row().checked_sub(1) {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }

        if cell.column() + 1 < self.full_columns() {
            candidates[count] = Some(CellCoord::new(cell.column() + 1, cell.row()));
            count += 1;
        }

        if cell.row() + 1 < self.full_rows() {
            candidates[count] = Some(CellCoord::new(cell.column(), cell.row() + 1));
            count += 1;
        }

        if let Some(column) = cell.column().checked_sub(1) {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }

        candidates.into_iter().take(count).flatten()
    }

    /// Row-major offset of a full-grid cell.
    pub(crate) fn index(&self, full: CellCoord) -> Option<usize> {
        if full.column() >= self.full_columns() || full.row() >= self.full_rows() {
            return None;
        }
        let width = usize::try_from(self.full_columns()).ok()?;
        let column = usize::try_from(full.column()).ok()?;
        let row = usize::try_from(full.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Total number of cells in the full grid.
    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
