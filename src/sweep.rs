//! Density sweeps: trial batches over a falling density schedule, repeated
//! for every grid size and replication count, collected into one table per
//! configuration.

use crate::error::{Error, Result};
use crate::fire::FireRule;
use crate::grid::GridSize;
use crate::observer::{NoopObserver, SnapshotObserver};
use crate::runner::{derive_seed, run_trials, ModelKind, TrialSummary};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest step the two-decimal rounding can represent
pub const MIN_STEP: f64 = 0.01;

/// Round to two decimal places. Adding zero folds `-0.0` into `0.0`.
pub fn round_density(p: f64) -> f64 {
    (p * 100.0).round() / 100.0 + 0.0
}

/// Densities from `start` down to `stop` (inclusive) in steps of `step`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensitySchedule {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for DensitySchedule {
    fn default() -> Self {
        Self {
            start: 1.0,
            stop: 0.0,
            step: 0.1,
        }
    }
}

impl DensitySchedule {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// A schedule holding a single density
    pub fn single(p: f64) -> Self {
        Self::new(p, p, 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("start", self.start), ("stop", self.stop)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid(field, format!("density {value} is outside [0, 1]")));
            }
        }
        if self.start < self.stop {
            return Err(Error::invalid(
                "start",
                format!("start {} is below stop {}", self.start, self.stop),
            ));
        }
        if !(MIN_STEP..=1.0).contains(&self.step) {
            return Err(Error::invalid(
                "step",
                format!("step {} must lie in [{MIN_STEP}, 1]", self.step),
            ));
        }
        Ok(())
    }

    /// Strictly decreasing densities, each rounded to two decimals.
    ///
    /// Every value is produced by subtracting `step` from the previous
    /// rounded value and rounding again, so no drift accumulates.
    pub fn values(&self) -> Vec<f64> {
        let stop = round_density(self.stop);
        let mut values = Vec::new();
        let mut p = round_density(self.start);
        while p >= stop {
            values.push(p);
            p = round_density(p - self.step);
        }
        values
    }
}

/// Everything a sweep needs to run
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub model: ModelKind,
    pub sizes: Vec<GridSize>,
    pub replications: Vec<u32>,
    pub schedule: DensitySchedule,
    /// Seed for the whole sweep; drawn at random when absent
    pub seed: Option<u64>,
    /// Forward grid snapshots to the observer
    pub animate: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Droplet,
            sizes: vec![GridSize::square(100)],
            replications: vec![100],
            schedule: DensitySchedule::default(),
            seed: None,
            animate: false,
        }
    }
}

impl SweepConfig {
    /// Reject configurations the models cannot run, before any trial starts
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;

        if self.sizes.is_empty() {
            return Err(Error::invalid("sizes", "at least one grid size is required"));
        }
        if let Some(size) = self.sizes.iter().find(|s| s.height == 0 || s.width == 0) {
            return Err(Error::invalid(
                "sizes",
                format!("grid {size} has a zero dimension"),
            ));
        }

        if self.replications.is_empty() {
            return Err(Error::invalid(
                "replications",
                "at least one replication count is required",
            ));
        }
        if self.replications.contains(&0) {
            return Err(Error::invalid("replications", "replication counts must be positive"));
        }

        if let ModelKind::Fire(FireRule {
            ignition_probability: Some(f),
        }) = self.model
        {
            if !(f > 0.0 && f <= 1.0) {
                return Err(Error::invalid(
                    "ignition_probability",
                    format!("{f} must lie in (0, 1]"),
                ));
            }
        }
        Ok(())
    }
}

/// Aggregated statistics for one density value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRow {
    pub density: f64,
    pub trial_count: u32,
    pub boundary_reach_count: u32,
    pub reach_probability: f64,
    /// Droplet model only
    pub total_depth: Option<u64>,
    /// Droplet model only
    pub average_depth: Option<f64>,
    /// Fire model only
    pub average_ignitions: Option<f64>,
}

impl DensityRow {
    pub fn from_summary(density: f64, model: &ModelKind, summary: &TrialSummary) -> Self {
        let trials = summary.trials.max(1) as f64;
        let (total_depth, average_depth, average_ignitions) = match model {
            ModelKind::Droplet => (
                Some(summary.total_depth),
                Some(summary.total_depth as f64 / trials),
                None,
            ),
            ModelKind::Fire(_) => (None, None, Some(summary.total_ignitions as f64 / trials)),
        };
        Self {
            density,
            trial_count: summary.trials,
            boundary_reach_count: summary.boundary_reach_count,
            reach_probability: summary.reach_probability(),
            total_depth,
            average_depth,
            average_ignitions,
        }
    }
}

/// One (grid size, replication count) configuration of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTable {
    pub size: GridSize,
    pub replications: u32,
    /// Rows in schedule order, densities strictly decreasing
    pub rows: Vec<DensityRow>,
    /// First density, scanning down from the top, where any trial reached
    /// the boundary
    pub critical_density: Option<f64>,
}

impl SweepTable {
    pub fn new(size: GridSize, replications: u32, rows: Vec<DensityRow>) -> Self {
        let critical_density = rows
            .iter()
            .find(|row| row.boundary_reach_count >= 1)
            .map(|row| row.density);
        Self {
            size,
            replications,
            rows,
            critical_density,
        }
    }
}

/// Full output of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub model: ModelKind,
    /// Seed actually used, so unseeded runs can be repeated
    pub seed: u64,
    pub tables: Vec<SweepTable>,
}

/// Receives each finished table as soon as its configuration completes
pub trait TableSink {
    fn table_ready(&mut self, model: &ModelKind, table: &SweepTable) -> Result<()>;
}

impl TableSink for Vec<SweepTable> {
    fn table_ready(&mut self, _model: &ModelKind, table: &SweepTable) -> Result<()> {
        self.push(table.clone());
        Ok(())
    }
}

/// Run a full sweep, handing each table to `sink` as it completes.
///
/// Every density row gets its own base seed derived from the sweep seed and
/// the (size, replication, density) indices.
pub fn run_sweep(
    config: &SweepConfig,
    observer: &mut dyn SnapshotObserver,
    sink: &mut dyn TableSink,
) -> Result<SweepReport> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let densities = config.schedule.values();
    let mut noop = NoopObserver;
    let mut tables = Vec::with_capacity(config.sizes.len() * config.replications.len());

    log::info!(
        "{} sweep: {} sizes x {} replication counts x {} densities (seed {})",
        config.model.name(),
        config.sizes.len(),
        config.replications.len(),
        densities.len(),
        seed
    );

    for (size_idx, &size) in config.sizes.iter().enumerate() {
        let size_seed = derive_seed(seed, size_idx as u64);
        for (rep_idx, &nrep) in config.replications.iter().enumerate() {
            let rep_seed = derive_seed(size_seed, rep_idx as u64);
            log::info!("Grid {size}, {nrep} realisations");
            if config.animate {
                observer.configuration_started(size, nrep);
            }

            let mut rows = Vec::with_capacity(densities.len());
            for (density_idx, &p) in densities.iter().enumerate() {
                let observer: &mut dyn SnapshotObserver = if config.animate {
                    &mut *observer
                } else {
                    &mut noop
                };
                let base_seed = derive_seed(rep_seed, density_idx as u64);
                let summary = run_trials(&config.model, size, p, nrep, base_seed, observer);
                let row = DensityRow::from_summary(p, &config.model, &summary);
                log::debug!(
                    "p={:.2}: {}/{} reached boundary ({:.3})",
                    p,
                    row.boundary_reach_count,
                    row.trial_count,
                    row.reach_probability
                );
                rows.push(row);
            }

            let table = SweepTable::new(size, nrep, rows);
            match table.critical_density {
                Some(pc) => log::info!("Grid {size}, {nrep} realisations: critical density {pc:.2}"),
                None => log::info!("Grid {size}, {nrep} realisations: boundary never reached"),
            }
            sink.table_ready(&config.model, &table)?;
            tables.push(table);
        }
    }

    Ok(SweepReport {
        model: config.model,
        seed,
        tables,
    })
}
