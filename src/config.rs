//! Run configuration.
//!
//! Loaded from an optional YAML file; every field has a default matching the
//! lab sheet, and CLI flags override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LabError, Result};
use crate::propagation::{MassModel, STANDARD_GRAVITY};
use crate::stats::{AggregationPolicy, DEFAULT_CONFIDENCE};
use crate::types::{Experiment, Material, ReducedValue};

/// Newton meter scale resolution, N.
pub const DEFAULT_METER_RESOLUTION: f64 = 0.05;

/// Where the normal force of an experiment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalForceSource {
    /// m·g from the mass model.
    #[default]
    Measured,
    /// Fixed stand-in value (e.g. 10.0 ± 0.5 N) used before the block was weighed.
    Placeholder(ReducedValue),
}

/// Normal-force source per experiment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalForceConfig {
    #[serde(with = "serde_yaml_ng::with::singleton_map")]
    pub weight: NormalForceSource,
    #[serde(with = "serde_yaml_ng::with::singleton_map")]
    pub area: NormalForceSource,
    #[serde(with = "serde_yaml_ng::with::singleton_map")]
    pub voltage: NormalForceSource,
}

impl NormalForceConfig {
    pub const fn source_for(&self, experiment: Experiment) -> NormalForceSource {
        match experiment {
            Experiment::WeightVariation => self.weight,
            Experiment::SmallArea => self.area,
            Experiment::VoltageVariation => self.voltage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatisticsConfig {
    pub policy: AggregationPolicy,
    /// Two-sided confidence level for the pooled policy.
    pub confidence: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            policy: AggregationPolicy::default(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Chart file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Per-measurement table.
    pub csv: PathBuf,
    /// Aggregated comparison views.
    pub json: PathBuf,
    /// Directory for chart images.
    pub plots: PathBuf,
    pub formats: Vec<ChartFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from("data/processed_data.csv"),
            json: PathBuf::from("data/comparison_views.json"),
            plots: PathBuf::from("plots"),
            formats: vec![ChartFormat::Png, ChartFormat::Svg],
        }
    }
}

/// One error-budget case printed by the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportCase {
    pub material: Material,
    pub configuration: String,
    #[serde(default = "default_case_experiment")]
    pub experiment: Experiment,
    #[serde(default = "default_case_voltage")]
    pub voltage: u32,
}

const fn default_case_experiment() -> Experiment {
    Experiment::WeightVariation
}

const fn default_case_voltage() -> u32 {
    crate::dataset::BASE_VOLTAGE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub cases: Vec<ReportCase>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let case = |material, configuration: &str| ReportCase {
            material,
            configuration: configuration.to_string(),
            experiment: default_case_experiment(),
            voltage: default_case_voltage(),
        };
        Self {
            cases: vec![
                case(Material::Steel, "B+1+2"),
                case(Material::Polyethylene, "B+1+2+3+4"),
                case(Material::Polyisoprene, "B"),
            ],
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Gravitational acceleration, m/s².
    pub gravity: f64,
    pub mass: MassModel,
    pub normal_force: NormalForceConfig,
    pub statistics: StatisticsConfig,
    /// Scale resolution of the newton meter, N.
    pub meter_resolution: f64,
    pub output: OutputConfig,
    pub report: ReportConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            mass: MassModel::default(),
            normal_force: NormalForceConfig::default(),
            statistics: StatisticsConfig::default(),
            meter_resolution: DEFAULT_METER_RESOLUTION,
            output: OutputConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl LabConfig {
    /// Parses YAML and validates the result.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| LabError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Rejects values the computation cannot use.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> Result<()> {
            Err(LabError::ConfigValue {
                field,
                reason: reason.to_string(),
            })
        };

        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return invalid("gravity", "must be a positive number");
        }
        let confidence = self.statistics.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return invalid("statistics.confidence", "must lie strictly between 0 and 1");
        }
        if !(self.meter_resolution.is_finite() && self.meter_resolution >= 0.0) {
            return invalid("meter_resolution", "must be zero or positive");
        }
        if !(self.mass.uncertainty.is_finite() && self.mass.uncertainty >= 0.0) {
            return invalid("mass.uncertainty", "must be zero or positive");
        }
        if self
            .mass
            .blocks
            .values()
            .chain(self.mass.weights.values())
            .any(|m| !m.is_finite() || *m < 0.0)
        {
            return invalid("mass", "masses must be non-negative numbers");
        }
        for (field, source) in [
            ("normal_force.weight", self.normal_force.weight),
            ("normal_force.area", self.normal_force.area),
            ("normal_force.voltage", self.normal_force.voltage),
        ] {
            if let NormalForceSource::Placeholder(value) = source {
                if !(value.center.is_finite() && value.half_width.is_finite())
                    || value.half_width < 0.0
                {
                    return invalid(field, "placeholder needs a finite center and half-width >= 0");
                }
            }
        }
        Ok(())
    }
}
