use std::collections::VecDeque;

use conquer_core::{CellCoord, TowerId};
use conquer_world::{grid::GridMap, navigation::PathPlanner};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn breadth_first_length(grid: &GridMap, start: CellCoord, goal: CellCoord) -> Option<usize> {
    let width = grid.full_columns();
    let height = grid.full_rows();
    let mut distances = vec![usize::MAX; (width * height) as usize];
    let offset = |cell: CellCoord| (cell.row() * width + cell.column()) as usize;
    let mut queue = VecDeque::from([start]);
    distances[offset(start)] = 0;

    while let Some(cell) = queue.pop_front() {
        if cell == goal {
            return Some(distances[offset(cell)]);
        }
        let next = distances[offset(cell)] + 1;
        let candidates = [
            (cell.column(), cell.row().wrapping_sub(1)),
            (cell.column() + 1, cell.row()),
            (cell.column(), cell.row() + 1),
            (cell.column().wrapping_sub(1), cell.row()),
        ];
        for (column, row) in candidates {
            if column >= width || row >= height {
                continue;
            }
            let neighbor = CellCoord::new(column, row);
            if grid.is_blocked(neighbor) || distances[offset(neighbor)] != usize::MAX {
                continue;
            }
            distances[offset(neighbor)] = next;
            queue.push_back(neighbor);
        }
    }

    None
}

#[test]
fn serpentine_layout_yields_known_shortest_length() {
    let mut grid = GridMap::new(5, 5, 1.0);
    let mut next_id = 0;
    for row in 0..=3 {
        assert!(grid.place(CellCoord::new(1, row), TowerId::new(next_id)));
        next_id += 1;
    }
    for row in 1..=4 {
        assert!(grid.place(CellCoord::new(3, row), TowerId::new(next_id)));
        next_id += 1;
    }

    let mut planner = PathPlanner::new();
    let path = planner
        .find_path(&grid, grid.spawn(), grid.goal())
        .expect("serpentine keeps a route open");

    assert_eq!(path.len(), 14);
    for pair in path.cells().windows(2) {
        assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
    }
    assert!(path.cells().iter().all(|cell| !grid.is_blocked(*cell)));
}

#[test]
fn planner_matches_breadth_first_search_on_random_layouts() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_a57a);
    let mut planner = PathPlanner::new();

    for _ in 0..64 {
        let mut grid = GridMap::new(10, 7, 1.0);
        for (index, cell) in grid.buildable_cells().collect::<Vec<_>>().into_iter().enumerate() {
            if rng.gen_bool(0.3) {
                assert!(grid.place(cell, TowerId::new(index as u32)));
            }
        }

        let expected = breadth_first_length(&grid, grid.spawn(), grid.goal());
        let actual = planner
            .find_path(&grid, grid.spawn(), grid.goal())
            .map(|path| path.len());
        assert_eq!(actual, expected);
    }
}

#[test]
fn would_block_never_changes_the_committed_route() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut grid = GridMap::new(8, 6, 1.0);
    let mut planner = PathPlanner::new();
    let mut next_id = 0;

    for cell in grid.buildable_cells().collect::<Vec<_>>() {
        if rng.gen_bool(0.2) && !planner.would_block(&mut grid, cell) {
            assert!(grid.place(cell, TowerId::new(next_id)));
            next_id += 1;
        }
    }

    let before = planner.find_path(&grid, grid.spawn(), grid.goal());
    assert!(before.is_some());

    let cells: Vec<CellCoord> = grid.buildable_cells().collect();
    for _ in 0..3 {
        for cell in &cells {
            let _ = planner.would_block(&mut grid, *cell);
        }
    }

    let after = planner.find_path(&grid, grid.spawn(), grid.goal());
    assert_eq!(before, after);
}

#[test]
fn would_block_detects_single_cell_chokepoint() {
    let mut grid = GridMap::new(3, 3, 1.0);
    let mut planner = PathPlanner::new();
    assert!(grid.place(CellCoord::new(1, 0), TowerId::new(0)));
    assert!(grid.place(CellCoord::new(1, 2), TowerId::new(1)));

    assert!(planner.would_block(&mut grid, CellCoord::new(1, 1)));
    assert!(!planner.would_block(&mut grid, CellCoord::new(0, 0)));
    assert!(!grid.is_blocked(grid.to_full(CellCoord::new(1, 1))));
}
