//! End-to-end run over the built-in session: process, export, render.

use std::fs;

use friction_lab::chart::render_view;
use friction_lab::config::{ChartFormat, LabConfig, NormalForceSource};
use friction_lab::dataset;
use friction_lab::export::{export_csv, export_views_json};
use friction_lab::pipeline::{comparison_views, process, ViewKind};
use friction_lab::stats::{AggregationPolicy, Spread};
use friction_lab::ReducedValue;
use pretty_assertions::assert_eq;

#[test]
fn full_session_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = LabConfig::default();

    let rows = process(&dataset::measurements(), &config);
    assert_eq!(rows.len(), 81);
    assert!(rows.iter().all(|r| r.undefined_reason().is_none()));

    let csv_path = dir.path().join("data").join("processed_data.csv");
    export_csv(&rows, &csv_path).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 82);

    let views = comparison_views(&rows, &config.statistics);
    let json_path = dir.path().join("data").join("comparison_views.json");
    export_views_json(&views, &json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(3));
    assert_eq!(json[0]["kind"], "normal_force");

    let plots = dir.path().join("plots");
    for view in &views {
        for format in [ChartFormat::Png, ChartFormat::Svg] {
            let path = render_view(view, &plots, format).unwrap();
            assert!(fs::metadata(&path).unwrap().len() > 0, "{}", path.display());
        }
    }
    assert!(plots.join("mu_vs_normal_force.png").exists());
    assert!(plots.join("mu_vs_voltage.svg").exists());
    assert!(plots.join("mu_vs_area.svg").exists());
}

#[test]
fn pooled_policy_reports_statistics() {
    let yaml = "statistics:\n  policy: pooled-endpoints\n  confidence: 0.95\n";
    let config = LabConfig::from_yaml(yaml).unwrap();
    let rows = process(&dataset::measurements(), &config);
    let views = comparison_views(&rows, &config.statistics);

    let normal = views.iter().find(|v| v.kind == ViewKind::NormalForce).unwrap();
    for series in &normal.series {
        for point in &series.points {
            let force = point.force.known().unwrap();
            assert_eq!(force.policy, AggregationPolicy::PooledEndpoints);
            assert!(matches!(force.spread, Spread::Statistical { .. }));
            assert!(point.mu.is_known());
        }
    }
}

#[test]
fn placeholder_changes_only_its_experiment() {
    let mut config = LabConfig::default();
    config.normal_force.voltage = NormalForceSource::Placeholder(ReducedValue::new(10.0, 0.5));
    let rows = process(&dataset::measurements(), &config);

    for row in &rows {
        let fn_ = row.normal_force.known().unwrap();
        let placeholder = fn_ == ReducedValue::new(10.0, 0.5);
        let is_voltage_series = row.measurement.experiment == friction_lab::types::Experiment::VoltageVariation;
        assert_eq!(placeholder, is_voltage_series, "{:?}", row.measurement);
    }
}
