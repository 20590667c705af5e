//! Single droplet descending through sand and rock.
//!
//! The droplet starts on the top row just left of centre and, at every
//! step, takes the first valid move from a fixed precedence list. A move is
//! valid when the target lies inside the grid and is still sand. The walk
//! ends when the droplet lands on the last row or has nowhere to go.

use crate::grid::{Cell, Grid, Position};
use crate::observer::SnapshotObserver;

/// Candidate moves as (row, column) deltas, highest precedence first:
/// down, down-left, down-right, right.
const MOVES: [(isize, isize); 4] = [(1, 0), (1, -1), (1, 1), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropletState {
    Descending,
    Stuck,
    ReachedBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropletOutcome {
    pub state: DropletState,
    /// Row the droplet ended on
    pub depth: usize,
}

impl DropletOutcome {
    pub fn reached_boundary(&self) -> bool {
        self.state == DropletState::ReachedBoundary
    }
}

/// Starting cell: top row, column `width / 2 - 1` (column 0 for width 1)
pub fn start_position(grid: &Grid) -> Position {
    Position::new(0, (grid.width / 2).saturating_sub(1))
}

/// Droplet walker over a borrowed grid. Path cells are marked `Active`.
pub struct Droplet<'a> {
    grid: &'a mut Grid,
    pos: Position,
    state: DropletState,
}

impl<'a> Droplet<'a> {
    /// Place the droplet on its starting cell, overwriting whatever was there
    pub fn new(grid: &'a mut Grid) -> Self {
        let pos = start_position(grid);
        grid.set(pos, Cell::Active);
        let state = if grid.is_last_row(pos) {
            DropletState::ReachedBoundary
        } else {
            DropletState::Descending
        };
        Self { grid, pos, state }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn state(&self) -> DropletState {
        self.state
    }

    pub fn grid(&self) -> &Grid {
        &*self.grid
    }

    /// First valid move from the current position, if any
    fn next_move(&self) -> Option<Position> {
        MOVES.iter().find_map(|&(drow, dcol)| {
            self.grid
                .offset(self.pos, drow, dcol)
                .filter(|&target| self.grid.is_empty_at(target))
        })
    }

    /// Advance one move. Returns the new state.
    pub fn step(&mut self) -> DropletState {
        if self.state != DropletState::Descending {
            return self.state;
        }

        match self.next_move() {
            Some(target) => {
                self.pos = target;
                self.grid.set(target, Cell::Active);
                if self.grid.is_last_row(target) {
                    self.state = DropletState::ReachedBoundary;
                }
            }
            None => self.state = DropletState::Stuck,
        }
        self.state
    }

    pub fn outcome(&self) -> DropletOutcome {
        DropletOutcome {
            state: self.state,
            depth: self.pos.row,
        }
    }
}

/// Run one droplet to a terminal state on `grid`
pub fn run_droplet(grid: &mut Grid, observer: &mut dyn SnapshotObserver) -> DropletOutcome {
    let mut droplet = Droplet::new(grid);
    observer.cell_changed(droplet.grid(), droplet.position());

    while droplet.state() == DropletState::Descending {
        let before = droplet.position();
        droplet.step();
        if droplet.position() != before {
            observer.cell_changed(droplet.grid(), droplet.position());
        }
    }

    droplet.outcome()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::NoopObserver;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grid_from_rows(rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows[0].len();
        let mut grid = Grid::filled(height, width, Cell::Empty);
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if ch == '#' {
                    grid.set(Position::new(r, c), Cell::Occupied);
                }
            }
        }
        grid
    }

    #[test]
    fn test_start_column_is_left_of_centre() {
        assert_eq!(start_position(&Grid::filled(5, 10, Cell::Empty)).col, 4);
        assert_eq!(start_position(&Grid::filled(5, 7, Cell::Empty)).col, 2);
        assert_eq!(start_position(&Grid::filled(5, 1, Cell::Empty)).col, 0);
    }

    #[test]
    fn test_empty_grid_falls_straight_down() {
        let mut grid = Grid::filled(20, 20, Cell::Empty);
        let outcome = run_droplet(&mut grid, &mut NoopObserver);
        assert_eq!(outcome.state, DropletState::ReachedBoundary);
        assert_eq!(outcome.depth, 19);
        for row in 0..20 {
            assert_eq!(grid.get(Position::new(row, 9)), Some(Cell::Active));
        }
    }

    #[test]
    fn test_full_grid_is_stuck_on_top_row() {
        let mut grid = Grid::filled(10, 10, Cell::Occupied);
        let outcome = run_droplet(&mut grid, &mut NoopObserver);
        assert_eq!(outcome.state, DropletState::Stuck);
        assert_eq!(outcome.depth, 0);
        assert!(!outcome.reached_boundary());
    }

    #[test]
    fn test_single_row_grid_starts_on_boundary() {
        let mut grid = Grid::filled(1, 6, Cell::Occupied);
        let outcome = run_droplet(&mut grid, &mut NoopObserver);
        assert!(outcome.reached_boundary());
        assert_eq!(outcome.depth, 0);
    }

    #[test]
    fn test_prefers_down_left_over_down_right() {
        // Start at column 1; straight down is blocked, both diagonals open.
        let mut grid = grid_from_rows(&["....", ".#..", "...."]);
        let mut droplet = Droplet::new(&mut grid);
        assert_eq!(droplet.position(), Position::new(0, 1));
        droplet.step();
        assert_eq!(droplet.position(), Position::new(1, 0));
    }

    #[test]
    fn test_down_right_when_left_blocked() {
        let mut grid = grid_from_rows(&["....", "##..", "...."]);
        let mut droplet = Droplet::new(&mut grid);
        droplet.step();
        assert_eq!(droplet.position(), Position::new(1, 2));
    }

    #[test]
    fn test_moves_right_along_row_when_below_blocked() {
        let mut grid = grid_from_rows(&["....", "###.", "...."]);
        let outcome = run_droplet(&mut grid, &mut NoopObserver);
        // right to (0,2), down-right to (1,3), then straight down
        assert_eq!(outcome.state, DropletState::ReachedBoundary);
        assert_eq!(grid.get(Position::new(0, 2)), Some(Cell::Active));
        assert_eq!(grid.get(Position::new(1, 3)), Some(Cell::Active));
    }

    #[test]
    fn test_right_edge_is_not_an_escape() {
        // Only a right move exists and it runs into the grid edge.
        let mut grid = grid_from_rows(&["....", "####", "...."]);
        let outcome = run_droplet(&mut grid, &mut NoopObserver);
        assert_eq!(outcome.state, DropletState::Stuck);
        assert_eq!(outcome.depth, 0);
        assert_eq!(grid.get(Position::new(0, 3)), Some(Cell::Active));
    }

    #[test]
    fn test_step_after_terminal_is_noop() {
        let mut grid = Grid::filled(3, 3, Cell::Occupied);
        let mut droplet = Droplet::new(&mut grid);
        assert_eq!(droplet.step(), DropletState::Stuck);
        assert_eq!(droplet.step(), DropletState::Stuck);
        assert_eq!(droplet.position(), Position::new(0, 0));
    }

    #[test]
    fn test_row_never_decreases() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut grid = Grid::generate(30, 30, 0.4, &mut rng);
            let mut observer = RecordingObserver::default();
            run_droplet(&mut grid, &mut observer);
            for pair in observer.changed.windows(2) {
                assert!(pair[1].row >= pair[0].row);
            }
        }
    }
}
