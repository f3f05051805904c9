//! Output stage.
//!
//! Writes the CSV table, the JSON view summary and every chart. A failing
//! output is logged and recorded; the remaining outputs are still written.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::chart::render_view;
use crate::config::OutputConfig;
use crate::error::LabError;
use crate::export::{export_csv, export_views_json};
use crate::pipeline::{ComparisonView, ProcessedRow};

/// What the output stage produced.
#[derive(Debug, Default)]
pub struct OutputSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<LabError>,
}

impl OutputSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, result: Result<PathBuf, LabError>, what: &str) {
        match result {
            Ok(path) => {
                debug!(path = %path.display(), "{what} written");
                self.written.push(path);
            }
            Err(e) => {
                warn!(error = %e, "could not write {what}, continuing");
                self.failed.push(e);
            }
        }
    }
}

/// Writes every configured output.
pub fn write_outputs(
    rows: &[ProcessedRow],
    views: &[ComparisonView],
    output: &OutputConfig,
) -> OutputSummary {
    let mut summary = OutputSummary::default();

    info!(path = %output.csv.display(), "writing CSV");
    summary.record(
        export_csv(rows, &output.csv).map(|()| output.csv.clone()),
        "CSV",
    );

    info!(path = %output.json.display(), "writing view summary");
    summary.record(
        export_views_json(views, &output.json).map(|()| output.json.clone()),
        "view summary",
    );

    info!(dir = %output.plots.display(), "rendering charts");
    for view in views {
        for &format in &output.formats {
            summary.record(render_view(view, &output.plots, format), "chart");
        }
    }

    summary
}
