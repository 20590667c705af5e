use crate::error::Result;
use crate::runner::ModelKind;
use crate::sweep::{SweepReport, SweepTable, TableSink};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const CSV_HEADER: &str = "grid_height,grid_width,replications,density,trial_count,\
boundary_reach_count,reach_probability,total_depth,average_depth,average_ignitions";

/// Writes every table row as CSV. Columns a model does not produce are left blank.
pub struct CsvTableWriter<W: Write> {
    out: W,
}

impl CsvTableWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CsvTableWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{CSV_HEADER}")?;
        Ok(Self { out })
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl<W: Write> TableSink for CsvTableWriter<W> {
    fn table_ready(&mut self, _model: &ModelKind, table: &SweepTable) -> Result<()> {
        for row in &table.rows {
            writeln!(
                self.out,
                "{},{},{},{:.2},{},{},{:.6},{},{},{}",
                table.size.height,
                table.size.width,
                table.replications,
                row.density,
                row.trial_count,
                row.boundary_reach_count,
                row.reach_probability,
                optional(row.total_depth),
                optional(row.average_depth.map(|d| format!("{d:.4}"))),
                optional(row.average_ignitions.map(|i| format!("{i:.4}"))),
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Save the whole report as pretty JSON
pub fn write_json_report(path: &Path, report: &SweepReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Console rendering of one table
pub fn format_table(model: &ModelKind, table: &SweepTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} | grid {} | {} realisations",
        model.name(),
        table.size,
        table.replications
    );

    let extent_header = if model.is_droplet() { "avg depth" } else { "avg ignitions" };
    let _ = writeln!(
        out,
        "{:>8} {:>8} {:>12} {:>14}",
        "density", "reached", "probability", extent_header
    );

    for row in &table.rows {
        let extent = if model.is_droplet() {
            row.average_depth
        } else {
            row.average_ignitions
        };
        let _ = writeln!(
            out,
            "{:>8.2} {:>8} {:>12.4} {:>14.2}",
            row.density,
            row.boundary_reach_count,
            row.reach_probability,
            extent.unwrap_or(0.0)
        );
    }

    match table.critical_density {
        Some(pc) => {
            let _ = writeln!(out, "critical density: {pc:.2}");
        }
        None => {
            let _ = writeln!(out, "critical density: none (boundary never reached)");
        }
    }
    out
}
