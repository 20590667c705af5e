//! Repeated independent trials at a fixed density.
//!
//! Every trial draws a fresh grid from its own `ChaCha8Rng`, seeded from the
//! runner's base seed and the trial index. Results therefore depend only on
//! the seed, never on the order trials happen to run in.

use crate::droplet::{run_droplet, DropletOutcome};
use crate::fire::{run_fire, FireOutcome, FireRule};
use crate::grid::{Cell, Grid, GridSize};
use crate::observer::SnapshotObserver;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Which process a trial simulates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    Droplet,
    Fire(FireRule),
}

impl ModelKind {
    pub fn name(&self) -> &str {
        match self {
            ModelKind::Droplet => "Droplet",
            ModelKind::Fire(rule) if rule.ignition_probability.is_some() => "Fire (stochastic)",
            ModelKind::Fire(_) => "Fire",
        }
    }

    pub fn is_droplet(&self) -> bool {
        matches!(self, ModelKind::Droplet)
    }
}

/// Result of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub reached_boundary: bool,
    /// Final depth for the droplet model, ignition count for the fire model
    pub extent: usize,
}

impl From<DropletOutcome> for TrialOutcome {
    fn from(outcome: DropletOutcome) -> Self {
        Self {
            reached_boundary: outcome.reached_boundary(),
            extent: outcome.depth,
        }
    }
}

impl From<FireOutcome> for TrialOutcome {
    fn from(outcome: FireOutcome) -> Self {
        Self {
            reached_boundary: outcome.reached_boundary,
            extent: outcome.ignitions,
        }
    }
}

/// Aggregate counts over a batch of trials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialSummary {
    pub trials: u32,
    pub boundary_reach_count: u32,
    /// Sum of final depths (droplet model only)
    pub total_depth: u64,
    /// Sum of ignition counts (fire model only)
    pub total_ignitions: u64,
}

impl TrialSummary {
    pub fn record(&mut self, model: &ModelKind, outcome: &TrialOutcome) {
        self.trials += 1;
        if outcome.reached_boundary {
            self.boundary_reach_count += 1;
        }
        match model {
            ModelKind::Droplet => self.total_depth += outcome.extent as u64,
            ModelKind::Fire(_) => self.total_ignitions += outcome.extent as u64,
        }
    }

    /// Combine two partial summaries of the same model and density
    #[cfg(test)]
    pub fn merge(self, other: TrialSummary) -> TrialSummary {
        TrialSummary {
            trials: self.trials + other.trials,
            boundary_reach_count: self.boundary_reach_count + other.boundary_reach_count,
            total_depth: self.total_depth + other.total_depth,
            total_ignitions: self.total_ignitions + other.total_ignitions,
        }
    }

    pub fn reach_probability(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.boundary_reach_count as f64 / self.trials as f64
        }
    }
}

/// SplitMix64 finaliser, used to spread seeds for neighbouring indices
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive an independent seed from a base seed and an index
pub fn derive_seed(base: u64, index: u64) -> u64 {
    mix(base ^ mix(index))
}

/// Generate a grid and run one trial of `model` on it
pub fn run_trial(
    model: &ModelKind,
    size: GridSize,
    density: f64,
    seed: u64,
    trial: u32,
    observer: &mut dyn SnapshotObserver,
) -> TrialOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut grid = Grid::generate(size.height, size.width, density, &mut rng);
    observer.trial_started(&grid, density, trial);

    let outcome: TrialOutcome = match model {
        ModelKind::Droplet => run_droplet(&mut grid, observer).into(),
        ModelKind::Fire(rule) => run_fire(&mut grid, *rule, &mut rng, observer).into(),
    };

    log::trace!(
        "trial {} at p={:.2}: reached={} extent={} active={}",
        trial,
        density,
        outcome.reached_boundary,
        outcome.extent,
        grid.count(Cell::Active)
    );
    observer.trial_finished(&grid, &outcome);
    outcome
}

/// Run `nrep` independent trials at one density
pub fn run_trials(
    model: &ModelKind,
    size: GridSize,
    density: f64,
    nrep: u32,
    base_seed: u64,
    observer: &mut dyn SnapshotObserver,
) -> TrialSummary {
    let mut summary = TrialSummary::default();
    for trial in 0..nrep {
        let seed = derive_seed(base_seed, trial as u64);
        let outcome = run_trial(model, size, density, seed, trial, observer);
        summary.record(model, &outcome);
    }
    summary
}
