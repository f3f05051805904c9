//! Error-budget worksheets.
//!
//! For a single condition, the budget uses the larger of meter resolution and
//! reading fluctuation as ΔF and lists the two propagation terms of Δμ. The
//! load trend reads the normal-force view and reports how F, Fn and μ change
//! from the lightest to the heaviest configuration.

use serde::Serialize;

use crate::config::ReportCase;
use crate::interval::Reading;
use crate::pipeline::{ComparisonView, ProcessedRow};
use crate::propagation::{friction_coefficient, ratio_terms};
use crate::stats::{aggregate, AggregationPolicy, DEFAULT_CONFIDENCE};
use crate::types::{Estimate, Experiment, Material, ReducedValue, Undefined};

/// Worked uncertainty calculation for one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBudget {
    pub material: Material,
    pub configuration: String,
    pub experiment: Experiment,
    pub voltage: u32,
    /// Stacked mass, kg.
    pub mass_kg: ReducedValue,
    pub area_cm2: f64,
    /// Reduced centers of the individual readings, N.
    pub readings: Vec<f64>,
    pub mean_force: f64,
    pub resolution: f64,
    /// Half-width of the widest reading, N.
    pub fluctuation: f64,
    /// max(fluctuation, resolution), N.
    pub delta_force: f64,
    pub normal_force: ReducedValue,
    pub mu: ReducedValue,
    /// (ΔF / Fn)²
    pub force_term: f64,
    /// (F·ΔFn / Fn²)²
    pub normal_term: f64,
}

impl ErrorBudget {
    /// Final result rounded to two decimals, as written on the lab sheet.
    pub fn rounded(&self) -> String {
        format!("μ = {:.2} ± {:.2}", self.mu.center, self.mu.half_width)
    }
}

/// Builds the budget for `case` from the processed rows.
///
/// Undefined readings are skipped. No usable reading yields
/// [`Undefined::InsufficientSamples`].
pub fn error_budget(rows: &[ProcessedRow], case: &ReportCase, resolution: f64) -> Estimate<ErrorBudget> {
    let selected: Vec<&ProcessedRow> = rows
        .iter()
        .filter(|r| {
            let m = &r.measurement;
            m.material == case.material
                && m.experiment == case.experiment
                && m.voltage == case.voltage
                && m.configuration == case.configuration
        })
        .collect();

    let Some(first) = selected.first() else {
        return Estimate::Undefined(Undefined::InsufficientSamples);
    };

    let readings: Vec<Estimate<Reading>> = selected.iter().map(|r| r.reading).collect();
    let centers: Vec<f64> = readings
        .iter()
        .filter_map(|r| r.known())
        .map(|r| r.reduce().center)
        .collect();

    let spread = aggregate(&readings, AggregationPolicy::WidestInterval, DEFAULT_CONFIDENCE);
    let budget = spread.zip(first.normal_force).zip(first.mass);

    budget.and_then(|((spread, normal_force), mass_g)| {
        let mean_force = spread.value.center;
        let fluctuation = spread.value.half_width;
        let delta_force = fluctuation.max(resolution);
        let force = ReducedValue::new(mean_force, delta_force);

        friction_coefficient(Estimate::Known(force), Estimate::Known(normal_force)).map(|mu| {
            let (force_term, normal_term) = ratio_terms(force, normal_force);
            ErrorBudget {
                material: case.material,
                configuration: case.configuration.clone(),
                experiment: case.experiment,
                voltage: case.voltage,
                mass_kg: mass_g.scale(1e-3),
                area_cm2: first.measurement.area_cm2,
                readings: centers,
                mean_force,
                resolution,
                fluctuation,
                delta_force,
                normal_force,
                mu,
                force_term: force_term.powi(2),
                normal_term: normal_term.powi(2),
            }
        })
    })
}

/// One configuration of the load trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStep {
    pub configuration: String,
    pub mean_force: Estimate<f64>,
    pub normal_force: Estimate<ReducedValue>,
    pub mu: Estimate<ReducedValue>,
}

/// How one material responds to increasing load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadTrend {
    pub material: Option<Material>,
    pub label: String,
    pub steps: Vec<LoadStep>,
    /// Growth of F from the first to the last defined step, percent.
    pub force_growth: Option<f64>,
    /// Growth of Fn over the same steps, percent.
    pub normal_force_growth: Option<f64>,
}

fn growth(values: impl Iterator<Item = Estimate<f64>>) -> Option<f64> {
    let defined: Vec<f64> = values.filter_map(Estimate::known).collect();
    match (defined.first(), defined.last()) {
        (Some(&first), Some(&last)) if defined.len() >= 2 && first != 0.0 => {
            Some((last / first - 1.0) * 100.0)
        }
        _ => None,
    }
}

/// Load trend per series of the normal-force view.
pub fn load_trend(view: &ComparisonView) -> Vec<LoadTrend> {
    view.series
        .iter()
        .map(|series| {
            let steps: Vec<LoadStep> = series
                .points
                .iter()
                .map(|p| LoadStep {
                    configuration: p.label.clone(),
                    mean_force: p.force.map(|a| a.value.center),
                    normal_force: p.normal_force,
                    mu: p.mu,
                })
                .collect();
            LoadTrend {
                material: series.material,
                label: series.label.clone(),
                force_growth: growth(steps.iter().map(|s| s.mean_force)),
                normal_force_growth: growth(steps.iter().map(|s| s.normal_force.map(|v| v.center))),
                steps,
            }
        })
        .collect()
}
