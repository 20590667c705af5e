use crate::grid::{Grid, GridSize, Position};
use crate::runner::TrialOutcome;

/// Receives grid snapshots while a trial runs.
///
/// The models call `cell_changed` after every mutation. Implementations may
/// buffer, render or drop frames; simulation results never depend on what
/// they do.
pub trait SnapshotObserver {
    /// A sweep is about to run its density schedule for one
    /// (grid size, replication count) pair
    fn configuration_started(&mut self, _size: GridSize, _replications: u32) {}

    /// A fresh grid was generated and seeded
    fn trial_started(&mut self, _grid: &Grid, _density: f64, _trial: u32) {}

    /// `pos` was just set active
    fn cell_changed(&mut self, _grid: &Grid, _pos: Position) {}

    fn trial_finished(&mut self, _grid: &Grid, _outcome: &TrialOutcome) {}
}

/// Observer that discards every snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SnapshotObserver for NoopObserver {}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::grid::Cell;

    /// Keeps every snapshot so tests can inspect state transitions
    #[derive(Default)]
    pub struct RecordingObserver {
        pub frames: Vec<Vec<Cell>>,
        pub changed: Vec<Position>,
        pub trials_started: u32,
        pub outcomes: Vec<TrialOutcome>,
        pub configurations: Vec<(GridSize, u32)>,
    }

    impl SnapshotObserver for RecordingObserver {
        fn configuration_started(&mut self, size: GridSize, replications: u32) {
            self.configurations.push((size, replications));
        }

        fn trial_started(&mut self, grid: &Grid, _density: f64, _trial: u32) {
            self.trials_started += 1;
            self.frames.push(grid.cells().to_vec());
        }

        fn cell_changed(&mut self, grid: &Grid, pos: Position) {
            self.changed.push(pos);
            self.frames.push(grid.cells().to_vec());
        }

        fn trial_finished(&mut self, _grid: &Grid, outcome: &TrialOutcome) {
            self.outcomes.push(*outcome);
        }
    }
}
