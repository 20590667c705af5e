use crate::fire::FireRule;
use crate::grid::GridSize;
use crate::runner::ModelKind;
use crate::sweep::{DensitySchedule, SweepConfig};
use serde::{Deserialize, Serialize};

/// Which simulation a sweep runs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ModelChoice {
    /// Droplet descending through sand and rock
    #[default]
    Droplet,
    /// Fire spreading through trees and mud
    Fire,
}

impl ModelChoice {
    pub fn name(&self) -> &str {
        match self {
            ModelChoice::Droplet => "Droplet",
            ModelChoice::Fire => "Fire",
        }
    }

    /// Labels for the empty, occupied and active cell states
    pub fn cell_labels(&self) -> [&'static str; 3] {
        match self {
            ModelChoice::Droplet => ["sand", "rock", "water"],
            ModelChoice::Fire => ["tree", "mud", "fire"],
        }
    }
}

/// All sweep settings consolidated into one struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    // === Model ===
    pub model: ModelChoice,
    /// Chance a tree next to the fire ignites (fire model, None = always)
    pub ignition_probability: Option<f64>,

    // === Grid ===
    /// Grid sizes to compare
    pub sizes: Vec<GridSize>,

    // === Sweep ===
    /// Replication counts to compare
    pub replications: Vec<u32>,
    /// First (highest) density
    pub density_start: f64,
    /// Last (lowest) density, inclusive
    pub density_stop: f64,
    /// Decrement between densities (0.01-1.0)
    pub density_step: f64,
    /// RNG seed for reproducible sweeps (None = random)
    pub seed: Option<u64>,

    // === Animation ===
    /// Record grid snapshots while trials run
    pub animate: bool,
    /// Start a new animation file at every density
    pub separate_animations: bool,
    /// Delay between frames in milliseconds
    pub frame_delay_ms: u32,
    /// Frames kept before recording stops
    pub max_frames: usize,
    /// Pixels per cell in the animation
    pub cell_scale: u32,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            ignition_probability: None,

            sizes: vec![GridSize::square(100)],

            replications: vec![100],
            density_start: 1.0,
            density_stop: 0.0,
            density_step: 0.1,
            seed: None,

            animate: false,
            separate_animations: true,
            frame_delay_ms: 250,
            max_frames: 2000,
            cell_scale: 8,
        }
    }
}

impl SweepSettings {
    pub fn model_kind(&self) -> ModelKind {
        match self.model {
            ModelChoice::Droplet => ModelKind::Droplet,
            ModelChoice::Fire => ModelKind::Fire(FireRule {
                ignition_probability: self.ignition_probability,
            }),
        }
    }

    /// Replace the density range with `schedule`
    pub fn with_schedule(self, schedule: DensitySchedule) -> Self {
        Self {
            density_start: schedule.start,
            density_stop: schedule.stop,
            density_step: schedule.step,
            ..self
        }
    }

    pub fn schedule(&self) -> DensitySchedule {
        DensitySchedule::new(self.density_start, self.density_stop, self.density_step)
    }

    pub fn to_sweep_config(&self) -> SweepConfig {
        SweepConfig {
            model: self.model_kind(),
            sizes: self.sizes.clone(),
            replications: self.replications.clone(),
            schedule: self.schedule(),
            seed: self.seed,
            animate: self.animate,
        }
    }

    /// GIF frame delay in hundredths of a second
    pub fn frame_delay_centis(&self) -> u16 {
        (self.frame_delay_ms / 10).clamp(1, u16::MAX as u32) as u16
    }
}
