//! Flat tabular export.
//!
//! One CSV row per measurement (undefined values become empty cells) and a
//! JSON document with the aggregated comparison views. Files are written to a
//! temporary sibling first and moved into place, so a destination held open
//! by another program leaves the previous file intact.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{LabError, Result};
use crate::pipeline::{ComparisonView, ProcessedRow};
use crate::types::{Estimate, ReducedValue};

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    experiment: &'a str,
    material: &'a str,
    configuration: &'a str,
    voltage_v: u32,
    area_cm2: f64,
    reading: &'a str,
    mass_g_center: Option<f64>,
    mass_g_half_width: Option<f64>,
    force_n_center: Option<f64>,
    force_n_half_width: Option<f64>,
    normal_force_n_center: Option<f64>,
    normal_force_n_half_width: Option<f64>,
    mu_center: Option<f64>,
    mu_half_width: Option<f64>,
    undefined: Option<String>,
}

fn split(value: Estimate<ReducedValue>) -> (Option<f64>, Option<f64>) {
    value
        .known()
        .map_or((None, None), |v| (Some(v.center), Some(v.half_width)))
}

impl<'a> From<&'a ProcessedRow> for CsvRecord<'a> {
    fn from(row: &'a ProcessedRow) -> Self {
        let m = &row.measurement;
        let (mass_g_center, mass_g_half_width) = split(row.mass);
        let (force_n_center, force_n_half_width) = split(row.force);
        let (normal_force_n_center, normal_force_n_half_width) = split(row.normal_force);
        let (mu_center, mu_half_width) = split(row.mu);

        Self {
            experiment: m.experiment.id(),
            material: m.material.code(),
            configuration: &m.configuration,
            voltage_v: m.voltage,
            area_cm2: m.area_cm2,
            reading: &m.reading,
            mass_g_center,
            mass_g_half_width,
            force_n_center,
            force_n_half_width,
            normal_force_n_center,
            normal_force_n_half_width,
            mu_center,
            mu_half_width,
            undefined: row.undefined_reason().map(|r| r.to_string()),
        }
    }
}

/// Writes the per-measurement table as CSV.
pub fn write_csv<W: Write>(rows: &[ProcessedRow], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(CsvRecord::from(row))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes the per-measurement table to `path`.
pub fn export_csv(rows: &[ProcessedRow], path: &Path) -> Result<()> {
    write_atomically(path, |file| write_csv(rows, file))
}

/// Writes the comparison views as pretty JSON to `path`.
pub fn export_views_json(views: &[ComparisonView], path: &Path) -> Result<()> {
    write_atomically(path, |file| {
        serde_json::to_writer_pretty(&mut *file, views)?;
        file.write_all(b"\n").map_err(|source| LabError::Io {
            path: path.to_path_buf(),
            source,
        })
    })
}

fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut NamedTempFile) -> Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| LabError::Io {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_err)?;
    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    write(&mut temp)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| LabError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::pipeline::process;
    use crate::types::{Experiment, Material, Measurement};
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<ProcessedRow> {
        let base = Measurement {
            experiment: Experiment::WeightVariation,
            material: Material::Steel,
            configuration: "B".to_string(),
            voltage: 5,
            area_cm2: 39.0,
            reading: "1.65-1.9".to_string(),
        };
        let broken = Measurement {
            reading: "?".to_string(),
            ..base.clone()
        };
        process(&[base, broken], &LabConfig::default())
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buffer = Vec::new();
        write_csv(&rows(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("experiment,material,configuration,voltage_v,area_cm2,reading,"));
        assert!(lines[0].ends_with("mu_center,mu_half_width,undefined"));
        assert!(lines[1].starts_with("Weight_Var,Stahl,B,5,39.0,1.65-1.9,616.0,0.1,1.775,0.125,"));
    }

    #[test]
    fn undefined_values_are_empty_cells() {
        let mut buffer = Vec::new();
        write_csv(&rows(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let broken = text.lines().nth(2).unwrap();
        assert!(broken.contains(",?,616.0,0.1,,,"), "{broken}");
        assert!(broken.ends_with(",,,malformed reading"), "{broken}");
    }

    #[test]
    fn export_into_file_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let err = export_csv(&rows(), &blocker.join("out.csv")).unwrap_err();
        assert!(
            matches!(err, LabError::Io { .. } | LabError::Persist { .. }),
            "{err}"
        );
    }

    #[test]
    fn export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        export_csv(&rows(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
