use crate::error::{Error, Result};
use crate::grid::GridSize;
use crate::settings::{ModelChoice, SweepSettings};
use crate::sweep::DensitySchedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// One line shown by `--list-presets`
    pub description: String,
    pub settings: SweepSettings,
}

impl Preset {
    pub fn new(name: &str, description: &str, settings: SweepSettings) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            settings,
        }
    }
}

/// Grid sizes compared by the size studies
const STUDY_SIZES: [usize; 5] = [10, 50, 100, 200, 400];

/// Turn a preset name into a safe file stem
fn file_stem_for(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

fn read_preset(path: &Path) -> Result<Preset> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Sweep presets: the fixed studies plus any the user saved as JSON
pub struct PresetManager {
    pub built_in: Vec<Preset>,
    pub saved: Vec<Preset>,
    dir: Option<PathBuf>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    pub fn new() -> Self {
        let dir = dirs::config_dir().map(|p| p.join("percolation-sim").join("presets"));
        Self::with_dir(dir)
    }

    /// Manager reading saved presets from `dir` instead of the config directory
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        let saved = dir.as_deref().map(Self::scan).unwrap_or_default();
        Self {
            built_in: built_in_presets(),
            saved,
            dir,
        }
    }

    /// Every readable preset file in `dir`. Unreadable files are logged and skipped.
    fn scan(dir: &Path) -> Vec<Preset> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for path in entries.flatten().map(|e| e.path()) {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_preset(&path) {
                Ok(preset) => found.push(preset),
                Err(e) => log::warn!("Skipping preset {}: {}", path.display(), e),
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.join(format!("{}.json", file_stem_for(name)))),
            None => Err(Error::Preset("no config directory for saved presets".into())),
        }
    }

    /// Write `preset` to disk, replacing a saved preset of the same name
    pub fn save_preset(&mut self, preset: Preset) -> Result<()> {
        if self.built_in.iter().any(|p| p.name.eq_ignore_ascii_case(&preset.name)) {
            return Err(Error::Preset(format!(
                "'{}' is a built-in preset name",
                preset.name
            )));
        }

        let path = self.path_for(&preset.name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serde_json::to_string_pretty(&preset)?)?;

        self.saved.retain(|p| p.name != preset.name);
        self.saved.push(preset);
        Ok(())
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        let before = self.saved.len();
        self.saved.retain(|p| p.name != name);
        if path.exists() {
            fs::remove_file(&path)?;
        } else if before == self.saved.len() {
            return Err(Error::Preset(format!("no saved preset named '{name}'")));
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.built_in.iter().chain(&self.saved)
    }

    /// Case-insensitive lookup, built-in presets first
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|p| p.name.as_str()).collect()
    }
}

fn built_in_presets() -> Vec<Preset> {
    let study_sizes: Vec<GridSize> = STUDY_SIZES.iter().map(|&n| GridSize::square(n)).collect();

    vec![
        // Single density, many realisations on a small grid
        Preset::new(
            "droplet-single",
            "1000 droplets on a 12x12 grid at rock density 0.40",
            SweepSettings {
                sizes: vec![GridSize::square(12)],
                replications: vec![1000],
                ..SweepSettings::default()
            }
            .with_schedule(DensitySchedule::single(0.4)),
        ),
        Preset::new(
            "droplet-graphing",
            "Droplet reach counts on 100x100 for 10 to 10000 realisations",
            SweepSettings {
                sizes: vec![GridSize::square(100)],
                replications: vec![10, 100, 1000, 10000],
                density_step: 0.01,
                ..SweepSettings::default()
            },
        ),
        Preset::new(
            "droplet-sizes",
            "Droplet reach probability across grid sizes",
            SweepSettings {
                sizes: study_sizes.clone(),
                replications: vec![100],
                density_step: 0.01,
                ..SweepSettings::default()
            },
        ),
        // Fire sweeps start one step below full mud coverage
        Preset::new(
            "fire-graphing",
            "Animated fire spread on 10x10 at every tenth of mud density",
            SweepSettings {
                model: ModelChoice::Fire,
                sizes: vec![GridSize::square(10)],
                replications: vec![10, 100],
                density_start: 0.9,
                density_step: 0.1,
                animate: true,
                frame_delay_ms: 80,
                ..SweepSettings::default()
            },
        ),
        Preset::new(
            "fire-sizes",
            "Fire edge-reach probability across grid sizes",
            SweepSettings {
                model: ModelChoice::Fire,
                sizes: study_sizes,
                replications: vec![100],
                density_start: 0.99,
                density_step: 0.01,
                ..SweepSettings::default()
            },
        ),
        Preset::new(
            "forest-fire",
            "Stochastic ignition on a 10x10 forest with 20% mud",
            SweepSettings {
                model: ModelChoice::Fire,
                ignition_probability: Some(0.1),
                sizes: vec![GridSize::square(10)],
                replications: vec![15],
                animate: true,
                ..SweepSettings::default()
            }
            .with_schedule(DensitySchedule::single(0.2)),
        ),
    ]
}
