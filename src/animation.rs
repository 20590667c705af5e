//! GIF recording of trial snapshots.
//!
//! Cells are stored as palette indices (empty, occupied, active) and scaled
//! up with nearest-neighbour sampling so each cell becomes a solid block.

use crate::error::Result;
use crate::grid::{Cell, Grid, GridSize, Position};
use crate::observer::SnapshotObserver;
use crate::runner::{ModelKind, TrialOutcome};
use crate::settings::SweepSettings;
use image::imageops::{self, FilterType};
use image::GrayImage;
use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// The last frame of each trial stays on screen this many times longer
const FINAL_FRAME_HOLD: u16 = 5;

/// Four RGB colours: empty, occupied, active, background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub colors: [[u8; 3]; 4],
}

impl Palette {
    /// Sand, rock and water
    pub const DROPLET: Palette = Palette {
        colors: [[218, 165, 32], [128, 128, 128], [30, 144, 255], [0, 0, 0]],
    };

    /// Tree, mud and fire
    pub const FIRE: Palette = Palette {
        colors: [[34, 139, 34], [101, 67, 33], [255, 140, 0], [0, 0, 0]],
    };

    pub fn for_model(model: &ModelKind) -> Self {
        if model.is_droplet() {
            Self::DROPLET
        } else {
            Self::FIRE
        }
    }

    fn as_bytes(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }
}

fn palette_index(cell: Cell) -> u8 {
    match cell {
        Cell::Empty => 0,
        Cell::Occupied => 1,
        Cell::Active => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecorderOptions {
    /// Pixels per cell along each axis
    pub scale: u32,
    /// Delay between frames in hundredths of a second
    pub delay: u16,
    /// Total frames kept across all files
    pub max_frames: usize,
    /// One file per (grid size, replication count, density) instead of a
    /// single file
    pub separate: bool,
}

impl RecorderOptions {
    pub fn from_settings(settings: &SweepSettings) -> Self {
        Self {
            scale: settings.cell_scale.max(1),
            delay: settings.frame_delay_centis(),
            max_frames: settings.max_frames,
            separate: settings.separate_animations,
        }
    }
}

struct RecordedFrame {
    width: u16,
    height: u16,
    delay: u16,
    pixels: Vec<u8>,
}

struct Segment {
    size: GridSize,
    replications: u32,
    density: f64,
    frames: Vec<RecordedFrame>,
}

/// Buffers snapshots as GIF frames and writes them out in `finish`
pub struct GifRecorder {
    path: PathBuf,
    palette: Palette,
    options: RecorderOptions,
    segments: Vec<Segment>,
    /// Replication count of the configuration being recorded
    replications: u32,
    /// Set when a configuration starts, so its first trial opens a new file
    configuration_changed: bool,
    frames_kept: usize,
    frames_in_trial: usize,
    cap_warned: bool,
    oversize_warned: bool,
}

impl GifRecorder {
    pub fn new(path: impl Into<PathBuf>, palette: Palette, options: RecorderOptions) -> Self {
        Self {
            path: path.into(),
            palette,
            options,
            segments: Vec::new(),
            replications: 0,
            configuration_changed: false,
            frames_kept: 0,
            frames_in_trial: 0,
            cap_warned: false,
            oversize_warned: false,
        }
    }

    pub fn frames_kept(&self) -> usize {
        self.frames_kept
    }

    /// Frame dimensions in pixels, or None if they do not fit a GIF
    fn frame_dims(&self, size: GridSize) -> Option<(u16, u16)> {
        let width = u16::try_from(size.width.checked_mul(self.options.scale as usize)?).ok()?;
        let height = u16::try_from(size.height.checked_mul(self.options.scale as usize)?).ok()?;
        Some((width, height))
    }

    fn capture(&mut self, grid: &Grid) {
        if self.frames_kept >= self.options.max_frames {
            if !self.cap_warned {
                log::warn!(
                    "Animation frame limit of {} reached, later frames are dropped",
                    self.options.max_frames
                );
                self.cap_warned = true;
            }
            return;
        }

        let Some((width, height)) = self.frame_dims(grid.size()) else {
            if !self.oversize_warned {
                log::warn!("Grid {} is too large to animate at scale {}", grid.size(), self.options.scale);
                self.oversize_warned = true;
            }
            return;
        };

        let indices: Vec<u8> = grid.cells().iter().map(|&c| palette_index(c)).collect();
        let pixels = if self.options.scale == 1 {
            indices
        } else {
            match GrayImage::from_raw(grid.width as u32, grid.height as u32, indices) {
                Some(image) => {
                    imageops::resize(&image, width as u32, height as u32, FilterType::Nearest)
                        .into_raw()
                }
                None => return,
            }
        };

        if let Some(segment) = self.segments.last_mut() {
            segment.frames.push(RecordedFrame {
                width,
                height,
                delay: self.options.delay,
                pixels,
            });
            self.frames_kept += 1;
            self.frames_in_trial += 1;
        }
    }

    fn output_path(&self, segment: &Segment) -> PathBuf {
        if !self.options.separate {
            return self.path.clone();
        }
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "animation".to_string());
        let file_name = format!(
            "{}_{}_n{}_p{:.2}.gif",
            stem, segment.size, segment.replications, segment.density
        );
        match self.path.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    fn write_segment(&self, path: &Path, segment: &Segment) -> Result<()> {
        let screen_width = segment.frames.iter().map(|f| f.width).max().unwrap_or(1);
        let screen_height = segment.frames.iter().map(|f| f.height).max().unwrap_or(1);

        let writer = BufWriter::new(File::create(path)?);
        let mut encoder =
            gif::Encoder::new(writer, screen_width, screen_height, &self.palette.as_bytes())?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        for recorded in &segment.frames {
            let frame = gif::Frame {
                width: recorded.width,
                height: recorded.height,
                delay: recorded.delay,
                buffer: Cow::Borrowed(recorded.pixels.as_slice()),
                ..Default::default()
            };
            encoder.write_frame(&frame)?;
        }
        Ok(())
    }

    /// Encode every buffered segment and return the files written
    pub fn finish(self) -> Result<Vec<PathBuf>> {
        let mut written: Vec<PathBuf> = Vec::new();
        for segment in self.segments.iter().filter(|s| !s.frames.is_empty()) {
            let base = self.output_path(segment);
            let base_stem = base
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            // Repeated replication counts in one sweep would share a name
            let mut path = base.clone();
            let mut copy = 1;
            while written.contains(&path) {
                copy += 1;
                path = base.with_file_name(format!("{base_stem}_{copy}.gif"));
            }
            self.write_segment(&path, segment)?;
            log::info!(
                "Wrote {} frames to {}",
                segment.frames.len(),
                path.display()
            );
            written.push(path);
        }
        Ok(written)
    }
}

impl SnapshotObserver for GifRecorder {
    fn configuration_started(&mut self, _size: GridSize, replications: u32) {
        self.replications = replications;
        self.configuration_changed = true;
    }

    fn trial_started(&mut self, grid: &Grid, density: f64, _trial: u32) {
        let size = grid.size();
        let needs_segment = match self.segments.last() {
            None => true,
            Some(last) => {
                self.options.separate
                    && (self.configuration_changed || last.size != size || last.density != density)
            }
        };
        if needs_segment {
            self.segments.push(Segment {
                size,
                replications: self.replications,
                density,
                frames: Vec::new(),
            });
        }
        self.configuration_changed = false;
        self.frames_in_trial = 0;
        self.capture(grid);
    }

    fn cell_changed(&mut self, grid: &Grid, _pos: Position) {
        self.capture(grid);
    }

    fn trial_finished(&mut self, _grid: &Grid, _outcome: &TrialOutcome) {
        if self.frames_in_trial == 0 {
            return;
        }
        if let Some(frame) = self.segments.last_mut().and_then(|s| s.frames.last_mut()) {
            frame.delay = frame.delay.saturating_mul(FINAL_FRAME_HOLD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_trial;
    use crate::sweep::{run_sweep, DensitySchedule, SweepConfig, SweepTable};
    use tempfile::tempdir;

    fn options(separate: bool) -> RecorderOptions {
        RecorderOptions {
            scale: 3,
            delay: 10,
            max_frames: 2000,
            separate,
        }
    }

    fn animated_sweep(recorder: &mut GifRecorder) {
        let config = SweepConfig {
            model: ModelKind::Droplet,
            sizes: vec![GridSize::square(6)],
            replications: vec![2],
            schedule: DensitySchedule::new(0.5, 0.3, 0.1),
            seed: Some(9),
            animate: true,
        };
        let mut sink: Vec<SweepTable> = Vec::new();
        run_sweep(&config, recorder, &mut sink).unwrap();
    }

    #[test]
    fn test_separate_files_per_density() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(dir.path().join("drops.gif"), Palette::DROPLET, options(true));
        animated_sweep(&mut recorder);
        let files = recorder.finish().unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files[0], dir.path().join("drops_6x6_n2_p0.50.gif"));
        for file in &files {
            let bytes = std::fs::read(file).unwrap();
            assert!(bytes.starts_with(b"GIF89a"));
        }
    }

    fn sweep_replications(recorder: &mut GifRecorder, replications: Vec<u32>, schedule: DensitySchedule) {
        let config = SweepConfig {
            model: ModelKind::Fire(crate::fire::FireRule::deterministic()),
            sizes: vec![GridSize::square(6)],
            replications,
            schedule,
            seed: Some(21),
            animate: true,
        };
        let mut sink: Vec<SweepTable> = Vec::new();
        run_sweep(&config, recorder, &mut sink).unwrap();
    }

    fn assert_unique_gifs(files: &[PathBuf]) {
        let unique: std::collections::HashSet<&PathBuf> = files.iter().collect();
        assert_eq!(unique.len(), files.len(), "{files:?}");
        for file in files {
            assert!(std::fs::read(file).unwrap().starts_with(b"GIF89a"));
        }
    }

    #[test]
    fn test_each_replication_count_gets_its_own_files() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(dir.path().join("fire.gif"), Palette::FIRE, options(true));
        sweep_replications(&mut recorder, vec![1, 2], DensitySchedule::new(0.5, 0.4, 0.1));
        let files = recorder.finish().unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("fire_6x6_n1_p0.50.gif"),
                dir.path().join("fire_6x6_n1_p0.40.gif"),
                dir.path().join("fire_6x6_n2_p0.50.gif"),
                dir.path().join("fire_6x6_n2_p0.40.gif"),
            ]
        );
        assert_unique_gifs(&files);
    }

    #[test]
    fn test_single_density_split_by_replication_count() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(dir.path().join("fire.gif"), Palette::FIRE, options(true));
        sweep_replications(&mut recorder, vec![3, 5], DensitySchedule::single(0.4));
        assert_eq!(recorder.segments.len(), 2);
        let files = recorder.finish().unwrap();
        assert_eq!(files.len(), 2);
        assert_unique_gifs(&files);
    }

    #[test]
    fn test_repeated_replication_count_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(dir.path().join("fire.gif"), Palette::FIRE, options(true));
        sweep_replications(&mut recorder, vec![2, 2], DensitySchedule::single(0.3));
        let files = recorder.finish().unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("fire_6x6_n2_p0.30.gif"),
                dir.path().join("fire_6x6_n2_p0.30_2.gif"),
            ]
        );
        assert_unique_gifs(&files);
    }

    #[test]
    fn test_single_file_when_not_separate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all.gif");
        let mut recorder = GifRecorder::new(&path, Palette::FIRE, options(false));
        animated_sweep(&mut recorder);
        assert!(recorder.frames_kept() >= 6);
        assert_eq!(recorder.finish().unwrap(), vec![path.clone()]);
        assert!(std::fs::read(&path).unwrap().starts_with(b"GIF89a"));
    }

    #[test]
    fn test_frame_cap_is_respected() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(
            dir.path().join("capped.gif"),
            Palette::DROPLET,
            RecorderOptions {
                max_frames: 4,
                ..options(false)
            },
        );
        animated_sweep(&mut recorder);
        assert_eq!(recorder.frames_kept(), 4);
    }

    #[test]
    fn test_final_frame_is_held() {
        let dir = tempdir().unwrap();
        let mut recorder = GifRecorder::new(dir.path().join("one.gif"), Palette::DROPLET, options(false));
        // Empty 5x5 grid: fresh grid, droplet placed, then four moves down.
        run_trial(&ModelKind::Droplet, GridSize::square(5), 0.0, 1, 0, &mut recorder);

        let frames = &recorder.segments[0].frames;
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[0].delay, 10);
        assert_eq!(frames[5].delay, 50);
        assert_eq!((frames[0].width, frames[0].height), (15, 15));
        assert_eq!(frames[0].pixels.len(), 15 * 15);
    }

    #[test]
    fn test_oversized_grid_is_skipped() {
        let recorder = GifRecorder::new(
            "unused.gif",
            Palette::FIRE,
            RecorderOptions {
                scale: 1000,
                ..options(true)
            },
        );
        assert_eq!(recorder.frame_dims(GridSize::square(100)), None);
        assert_eq!(recorder.frame_dims(GridSize::square(10)), Some((10000, 10000)));
    }

    #[test]
    fn test_palette_matches_model() {
        assert_eq!(Palette::for_model(&ModelKind::Droplet), Palette::DROPLET);
        assert_eq!(
            Palette::for_model(&ModelKind::Fire(crate::fire::FireRule::deterministic())),
            Palette::FIRE
        );
        assert_eq!(Palette::DROPLET.as_bytes().len(), 12);
    }
}
