//! Fire spreading outward from the centre of a forest.
//!
//! Burning cells are kept in a frontier that only ever grows. Each member is
//! examined once, visiting its eight neighbours clockwise from the upper
//! right. Trees catch fire and join the frontier; mud and burning cells are
//! left alone. The first time fire lands on the last row or last column the
//! trial is marked as having reached the edge. That first edge cell burns but
//! does not spread, while the rest of the frontier keeps burning until it is
//! exhausted.

use crate::grid::{Cell, Grid, Position};
use crate::observer::SnapshotObserver;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Neighbour displacements as (row, column) deltas, clockwise from the
/// upper-right neighbour
pub const NEIGHBOURHOOD: [(isize, isize); 8] = [
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
];

/// How a burning cell lights its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FireRule {
    /// Chance that a tree next to the fire catches. `None` always ignites.
    pub ignition_probability: Option<f64>,
}

impl FireRule {
    pub fn deterministic() -> Self {
        Self::default()
    }

    pub fn stochastic(f: f64) -> Self {
        Self {
            ignition_probability: Some(f),
        }
    }

    /// Probability in effect, `None` when every draw would succeed anyway
    fn chance(&self) -> Option<f64> {
        self.ignition_probability
            .filter(|&f| f < 1.0)
            .map(|f| f.max(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireOutcome {
    pub reached_boundary: bool,
    /// Cells set on fire, not counting the seed
    pub ignitions: usize,
}

/// Seed cell at `(height / 2, width / 2)`
pub fn seed_position(grid: &Grid) -> Position {
    Position::new(grid.height / 2, grid.width / 2)
}

/// Frontier expansion state for one trial
pub struct FireSpread<'a> {
    grid: &'a mut Grid,
    rule: FireRule,
    frontier: Vec<Position>,
    cursor: usize,
    reached_boundary: bool,
    ignitions: usize,
}

impl<'a> FireSpread<'a> {
    /// Force the seed cell alight and make it the only frontier member
    pub fn new(grid: &'a mut Grid, rule: FireRule) -> Self {
        let seed = seed_position(grid);
        grid.set(seed, Cell::Active);
        Self {
            grid,
            rule,
            frontier: vec![seed],
            cursor: 0,
            reached_boundary: false,
            ignitions: 0,
        }
    }

    pub fn grid(&self) -> &Grid {
        &*self.grid
    }

    pub fn frontier(&self) -> &[Position] {
        &self.frontier
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.frontier.len()
    }

    /// Set `pos` alight and decide whether it keeps spreading
    fn ignite(&mut self, pos: Position, observer: &mut dyn SnapshotObserver) {
        self.grid.set(pos, Cell::Active);
        self.ignitions += 1;

        let on_edge = self.grid.is_last_row(pos) || self.grid.is_last_col(pos);
        if on_edge && !self.reached_boundary {
            self.reached_boundary = true;
        } else {
            self.frontier.push(pos);
        }
        observer.cell_changed(&*self.grid, pos);
    }

    /// Examine every neighbour of the next frontier member.
    /// Returns false once the frontier is drained.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R, observer: &mut dyn SnapshotObserver) -> bool {
        let Some(&current) = self.frontier.get(self.cursor) else {
            return false;
        };
        self.cursor += 1;

        let mut candidates = 0;
        let mut lit = 0;
        for &(drow, dcol) in NEIGHBOURHOOD.iter() {
            let Some(target) = self.grid.offset(current, drow, dcol) else {
                continue;
            };
            if !self.grid.is_empty_at(target) {
                continue;
            }
            candidates += 1;
            if let Some(f) = self.rule.chance() {
                if !rng.gen_bool(f) {
                    continue;
                }
            }
            self.ignite(target, observer);
            lit += 1;
        }

        if candidates > 0 && lit == 0 {
            self.fallback_ignition(rng, observer);
        }
        true
    }

    /// Keep drawing random trees from the whole grid until one catches, so
    /// an unlucky streak of failed draws does not starve the fire
    fn fallback_ignition<R: Rng + ?Sized>(&mut self, rng: &mut R, observer: &mut dyn SnapshotObserver) {
        let Some(f) = self.rule.chance().filter(|&f| f > 0.0) else {
            return;
        };
        let trees = self.grid.empty_positions();
        if trees.is_empty() {
            return;
        }
        loop {
            let pick = trees[rng.gen_range(0..trees.len())];
            if rng.gen_bool(f) {
                self.ignite(pick, observer);
                return;
            }
        }
    }

    pub fn outcome(&self) -> FireOutcome {
        FireOutcome {
            reached_boundary: self.reached_boundary,
            ignitions: self.ignitions,
        }
    }
}

/// Burn `grid` from its centre until the frontier is drained
pub fn run_fire<R: Rng + ?Sized>(
    grid: &mut Grid,
    rule: FireRule,
    rng: &mut R,
    observer: &mut dyn SnapshotObserver,
) -> FireOutcome {
    let mut fire = FireSpread::new(grid, rule);
    let seed = fire.frontier()[0];
    observer.cell_changed(fire.grid(), seed);

    while !fire.is_exhausted() {
        fire.step(&mut *rng, &mut *observer);
    }

    fire.outcome()
}
