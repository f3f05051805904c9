//! Processing pipeline.
//!
//! Reduces every measurement, attaches mass, normal force and friction
//! coefficient, then groups rows into the comparison views that feed the
//! charts and the JSON summary.

#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use tracing::debug;

use crate::config::{LabConfig, NormalForceSource, StatisticsConfig};
use crate::dataset::{BASE_VOLTAGE, CONFIGURATIONS};
use crate::interval::{parse_reading, Reading};
use crate::propagation::{friction_coefficient, normal_force};
use crate::stats::{aggregate, Aggregate};
use crate::types::{Estimate, Experiment, Material, Measurement, ReducedValue, Undefined};

/// Contact areas above this many cm² count as the large face.
pub const LARGE_AREA_THRESHOLD: f64 = 30.0;

/// A measurement with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedRow {
    pub measurement: Measurement,
    #[serde(skip)]
    pub reading: Estimate<Reading>,
    /// Friction force Fr, N.
    pub force: Estimate<ReducedValue>,
    /// Stacked mass, g.
    pub mass: Estimate<ReducedValue>,
    /// Normal force Fn, N.
    pub normal_force: Estimate<ReducedValue>,
    /// Friction coefficient μ.
    pub mu: Estimate<ReducedValue>,
}

impl ProcessedRow {
    /// First undefined reason among the derived columns, if any.
    pub fn undefined_reason(&self) -> Option<Undefined> {
        self.force
            .reason()
            .or_else(|| self.mass.reason())
            .or_else(|| self.normal_force.reason())
            .or_else(|| self.mu.reason())
    }
}

/// Derives mass, normal force and μ for one measurement.
pub fn process_measurement(measurement: &Measurement, config: &LabConfig) -> ProcessedRow {
    let reading = parse_reading(&measurement.reading);
    let force = reading.map(Reading::reduce);
    let mass = config
        .mass
        .mass_of(&measurement.configuration, measurement.material);

    let normal_force = match config.normal_force.source_for(measurement.experiment) {
        NormalForceSource::Measured => normal_force(mass, config.gravity),
        NormalForceSource::Placeholder(value) => Estimate::Known(value),
    };
    let mu = friction_coefficient(force, normal_force);

    ProcessedRow {
        measurement: measurement.clone(),
        reading,
        force,
        mass,
        normal_force,
        mu,
    }
}

/// Processes every measurement, in input order.
pub fn process(measurements: &[Measurement], config: &LabConfig) -> Vec<ProcessedRow> {
    let rows: Vec<ProcessedRow> = measurements
        .iter()
        .map(|m| process_measurement(m, config))
        .collect();

    for row in rows.iter().filter(|r| r.undefined_reason().is_some()) {
        debug!(
            experiment = %row.measurement.experiment,
            material = %row.measurement.material,
            configuration = %row.measurement.configuration,
            reading = %row.measurement.reading,
            reason = ?row.undefined_reason(),
            "row has undefined values"
        );
    }
    rows
}

/// The three comparison charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// μ against stacked mass, one series per material.
    NormalForce,
    /// μ against drive voltage, one series per material.
    Voltage,
    /// μ per material, one series per contact face.
    ContactArea,
}

impl ViewKind {
    pub const ALL: [Self; 3] = [Self::NormalForce, Self::Voltage, Self::ContactArea];

    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::NormalForce => "mu_vs_normal_force",
            Self::Voltage => "mu_vs_voltage",
            Self::ContactArea => "mu_vs_area",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::NormalForce => "Friction Coefficient vs Normal Force (5V, Large Area)",
            Self::Voltage => "Friction Coefficient vs Voltage (Large Area, Block B)",
            Self::ContactArea => "Friction Coefficient vs Contact Area (5V, Block B)",
        }
    }

    pub const fn x_description(self) -> &'static str {
        match self {
            Self::NormalForce => "Block Configuration (Mass Increase)",
            Self::Voltage => "Voltage (V)",
            Self::ContactArea => "Material",
        }
    }
}

/// Horizontal axis of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XAxis {
    /// Point `x` is an index into `labels`.
    Categorical { labels: Vec<String> },
    /// Point `x` is the value itself.
    Numeric { ticks: Vec<f64> },
}

/// One aggregated condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPoint {
    pub x: f64,
    pub label: String,
    /// Aggregated friction force Fr.
    pub force: Estimate<Aggregate>,
    pub normal_force: Estimate<ReducedValue>,
    /// μ derived from the aggregated force.
    pub mu: Estimate<ReducedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSeries {
    pub label: String,
    /// Material the series belongs to, when series are split by material.
    pub material: Option<Material>,
    pub points: Vec<ViewPoint>,
}

/// Grouped data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub kind: ViewKind,
    pub title: String,
    pub x_axis: XAxis,
    pub series: Vec<ViewSeries>,
}

/// Face class of a contact area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaClass {
    Small,
    Large,
}

impl AreaClass {
    pub fn of(area_cm2: f64) -> Self {
        if area_cm2 > LARGE_AREA_THRESHOLD {
            Self::Large
        } else {
            Self::Small
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Large => "Large",
        }
    }
}

/// Aggregates one group of rows under the configured policy.
///
/// All rows of a group share the same normal force, so the first one is used.
pub fn group_point(rows: &[&ProcessedRow], x: f64, label: String, stats: &StatisticsConfig) -> ViewPoint {
    let readings: Vec<Estimate<Reading>> = rows.iter().map(|r| r.reading).collect();
    let force = aggregate(&readings, stats.policy, stats.confidence);
    let normal_force = rows
        .first()
        .map_or(Estimate::Undefined(Undefined::InsufficientSamples), |r| {
            r.normal_force
        });
    let mu = friction_coefficient(force.map(|a| a.value), normal_force);

    ViewPoint {
        x,
        label,
        force,
        normal_force,
        mu,
    }
}

/// μ against block configuration for the weight series.
pub fn normal_force_view(rows: &[ProcessedRow], stats: &StatisticsConfig) -> ComparisonView {
    let series = Material::ALL
        .iter()
        .map(|&material| {
            let points = CONFIGURATIONS
                .iter()
                .enumerate()
                .filter_map(|(index, configuration)| {
                    let group: Vec<&ProcessedRow> = rows
                        .iter()
                        .filter(|r| {
                            r.measurement.experiment == Experiment::WeightVariation
                                && r.measurement.material == material
                                && r.measurement.configuration == *configuration
                        })
                        .collect();
                    (!group.is_empty())
                        .then(|| group_point(&group, index as f64, (*configuration).to_string(), stats))
                })
                .collect();
            ViewSeries {
                label: material.label().to_string(),
                material: Some(material),
                points,
            }
        })
        .collect();

    ComparisonView {
        kind: ViewKind::NormalForce,
        title: ViewKind::NormalForce.title().to_string(),
        x_axis: XAxis::Categorical {
            labels: CONFIGURATIONS.iter().map(ToString::to_string).collect(),
        },
        series,
    }
}

/// μ against voltage: base block on the large face, 5 V from the weight
/// series plus the voltage series.
pub fn voltage_view(rows: &[ProcessedRow], stats: &StatisticsConfig) -> ComparisonView {
    let selected: Vec<&ProcessedRow> = rows
        .iter()
        .filter(|r| {
            let m = &r.measurement;
            m.configuration == "B"
                && (m.experiment == Experiment::VoltageVariation
                    || (m.experiment == Experiment::WeightVariation && m.voltage == BASE_VOLTAGE))
        })
        .collect();

    let mut voltages: Vec<u32> = selected.iter().map(|r| r.measurement.voltage).collect();
    voltages.sort_unstable();
    voltages.dedup();

    let series = Material::ALL
        .iter()
        .map(|&material| {
            let points = voltages
                .iter()
                .filter_map(|&voltage| {
                    let group: Vec<&ProcessedRow> = selected
                        .iter()
                        .copied()
                        .filter(|r| r.measurement.material == material && r.measurement.voltage == voltage)
                        .collect();
                    (!group.is_empty())
                        .then(|| group_point(&group, f64::from(voltage), format!("{voltage}V"), stats))
                })
                .collect();
            ViewSeries {
                label: material.label().to_string(),
                material: Some(material),
                points,
            }
        })
        .collect();

    ComparisonView {
        kind: ViewKind::Voltage,
        title: ViewKind::Voltage.title().to_string(),
        x_axis: XAxis::Numeric {
            ticks: voltages.into_iter().map(f64::from).collect(),
        },
        series,
    }
}

/// μ per material on the narrow and the large face (base block, 5 V).
pub fn contact_area_view(rows: &[ProcessedRow], stats: &StatisticsConfig) -> ComparisonView {
    let selected: Vec<&ProcessedRow> = rows
        .iter()
        .filter(|r| r.measurement.configuration == "B" && r.measurement.voltage == BASE_VOLTAGE)
        .collect();

    let series = [AreaClass::Small, AreaClass::Large]
        .iter()
        .map(|&class| {
            let in_class: Vec<&ProcessedRow> = selected
                .iter()
                .copied()
                .filter(|r| AreaClass::of(r.measurement.area_cm2) == class)
                .collect();
            let mean_area = if in_class.is_empty() {
                0.0
            } else {
                in_class.iter().map(|r| r.measurement.area_cm2).sum::<f64>() / in_class.len() as f64
            };

            let points = Material::ALL
                .iter()
                .enumerate()
                .filter_map(|(index, &material)| {
                    let group: Vec<&ProcessedRow> = in_class
                        .iter()
                        .copied()
                        .filter(|r| r.measurement.material == material)
                        .collect();
                    (!group.is_empty()).then(|| {
                        let label = format!("{} ({:.1} cm²)", material.label(), group[0].measurement.area_cm2);
                        group_point(&group, index as f64, label, stats)
                    })
                })
                .collect();

            ViewSeries {
                label: format!("{} Area (~{mean_area:.0} cm²)", class.name()),
                material: None,
                points,
            }
        })
        .collect();

    ComparisonView {
        kind: ViewKind::ContactArea,
        title: ViewKind::ContactArea.title().to_string(),
        x_axis: XAxis::Categorical {
            labels: Material::ALL.iter().map(|m| m.label().to_string()).collect(),
        },
        series,
    }
}

/// All comparison views, in chart order.
pub fn comparison_views(rows: &[ProcessedRow], stats: &StatisticsConfig) -> Vec<ComparisonView> {
    ViewKind::ALL
        .iter()
        .map(|kind| match kind {
            ViewKind::NormalForce => normal_force_view(rows, stats),
            ViewKind::Voltage => voltage_view(rows, stats),
            ViewKind::ContactArea => contact_area_view(rows, stats),
        })
        .collect()
}
