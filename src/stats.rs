//! Statistics over repeated readings.
//!
//! Population standard deviation, standard error of the mean, Student-t
//! confidence intervals, and the two aggregation policies for repeated
//! interval readings.

#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::interval::Reading;
use crate::types::{Estimate, ReducedValue, Undefined};

/// Default two-sided confidence level.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Mean, spread and standard error of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStatistics {
    /// Number of valid values used.
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (N in the denominator).
    pub std_dev: f64,
    /// Standard error of the mean, σ/√N.
    pub sem: f64,
}

/// Two-sided Student-t confidence interval around a mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    /// Critical value t((1+level)/2, N-1).
    pub t_critical: f64,
    pub half_width: f64,
}

/// How repeated interval readings are combined into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Every endpoint of every reading is an independent sample; the
    /// half-width is the t-based confidence interval of the pooled mean.
    PooledEndpoints,
    /// Each reading is one systematic observation; the half-width is half
    /// the widest single interval.
    #[default]
    WidestInterval,
}

impl AggregationPolicy {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PooledEndpoints => "pooled-endpoints",
            Self::WidestInterval => "widest-interval",
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pooled-endpoints" | "pooled" | "a" => Ok(Self::PooledEndpoints),
            "widest-interval" | "widest" | "b" => Ok(Self::WidestInterval),
            other => Err(format!("unknown aggregation policy: {other}")),
        }
    }
}

/// Spread information attached to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Spread {
    Statistical {
        statistics: SampleStatistics,
        interval: ConfidenceInterval,
    },
    /// The systematic policy does not compute σ, SEM or a confidence interval.
    NotConsidered,
}

/// Result of aggregating repeated readings under one policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub policy: AggregationPolicy,
    pub value: ReducedValue,
    /// Readings that contributed (undefined readings are skipped).
    pub readings: usize,
    pub spread: Spread,
}

/// Mean, population σ and SEM over the defined values.
///
/// Undefined entries are skipped; fewer than two defined values yields
/// [`Undefined::InsufficientSamples`].
pub fn sample_statistics(values: &[Estimate<f64>]) -> Estimate<SampleStatistics> {
    let defined: Vec<f64> = values
        .iter()
        .filter_map(|v| v.known())
        .filter(|v| v.is_finite())
        .collect();
    statistics_of(&defined)
}

fn statistics_of(sample: &[f64]) -> Estimate<SampleStatistics> {
    if sample.len() < 2 {
        return Estimate::Undefined(Undefined::InsufficientSamples);
    }

    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    Estimate::Known(SampleStatistics {
        count: sample.len(),
        mean,
        std_dev,
        sem: std_dev / n.sqrt(),
    })
}

/// Half-width t((1+level)/2, N-1)·SEM of a two-sided confidence interval.
pub fn confidence_interval(sem: f64, count: usize, level: f64) -> Estimate<ConfidenceInterval> {
    if count < 2 {
        return Estimate::Undefined(Undefined::InsufficientSamples);
    }
    if !(level > 0.0 && level < 1.0) {
        return Estimate::Undefined(Undefined::InvalidConfidenceLevel);
    }
    if !sem.is_finite() {
        return Estimate::Undefined(Undefined::Malformed);
    }

    let df = (count - 1) as f64;
    match t_critical(level, df) {
        Some(t_critical) => Estimate::Known(ConfidenceInterval {
            level,
            t_critical,
            half_width: t_critical * sem.abs(),
        }),
        None => Estimate::Undefined(Undefined::InvalidConfidenceLevel),
    }
}

/// Two-sided critical value t((1+level)/2, df) of Student's t.
pub fn t_critical(level: f64, df: f64) -> Option<f64> {
    if !(level > 0.0 && level < 1.0) {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let t = dist.inverse_cdf((1.0 + level) / 2.0);
    (t.is_finite() && t > 0.0).then_some(t)
}

/// Combines repeated readings of one condition under `policy`.
pub fn aggregate(
    readings: &[Estimate<Reading>],
    policy: AggregationPolicy,
    confidence: f64,
) -> Estimate<Aggregate> {
    let valid: Vec<Reading> = readings.iter().filter_map(|r| r.known()).collect();

    match policy {
        AggregationPolicy::PooledEndpoints => {
            let pooled: Vec<f64> = valid.iter().flat_map(|r| r.endpoints()).collect();
            statistics_of(&pooled).and_then(|statistics| {
                confidence_interval(statistics.sem, statistics.count, confidence).map(
                    |interval| Aggregate {
                        policy,
                        value: ReducedValue::new(statistics.mean, interval.half_width),
                        readings: valid.len(),
                        spread: Spread::Statistical {
                            statistics,
                            interval,
                        },
                    },
                )
            })
        }
        AggregationPolicy::WidestInterval => {
            if valid.is_empty() {
                return Estimate::Undefined(Undefined::InsufficientSamples);
            }
            let n = valid.len() as f64;
            let mean = valid.iter().map(|r| r.reduce().center).sum::<f64>() / n;
            let widest = valid.iter().map(|r| r.width()).fold(0.0, f64::max);
            Estimate::Known(Aggregate {
                policy,
                value: ReducedValue::new(mean, widest / 2.0),
                readings: valid.len(),
                spread: Spread::NotConsidered,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::parse_reading;
    use pretty_assertions::assert_eq;

    fn readings(texts: &[&str]) -> Vec<Estimate<Reading>> {
        texts.iter().map(|t| parse_reading(t)).collect()
    }

    #[test]
    fn population_std_dev_uses_n() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].map(Estimate::Known);
        let stats = sample_statistics(&values).known().unwrap();
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert!((stats.sem - 2.0 / 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn undefined_values_are_skipped() {
        let values = [
            Estimate::Known(1.0),
            Estimate::Undefined(Undefined::Malformed),
            Estimate::Known(3.0),
        ];
        let stats = sample_statistics(&values).known().unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fewer_than_two_values_is_undefined() {
        let values = [Estimate::Known(1.0), Estimate::Undefined(Undefined::Malformed)];
        assert_eq!(
            sample_statistics(&values).reason(),
            Some(Undefined::InsufficientSamples)
        );
        assert_eq!(
            confidence_interval(0.1, 1, 0.95).reason(),
            Some(Undefined::InsufficientSamples)
        );
    }

    #[test]
    fn confidence_level_must_be_open_unit_interval() {
        for level in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert_eq!(
                confidence_interval(0.1, 5, level).reason(),
                Some(Undefined::InvalidConfidenceLevel)
            );
        }
    }

    #[test]
    fn confidence_interval_uses_student_t() {
        let ci = confidence_interval(0.1, 6, 0.95).known().unwrap();
        assert!((ci.t_critical - 2.570_581_836).abs() < 1e-6);
        assert!((ci.half_width - 0.257_058_183_6).abs() < 1e-6);
    }

    #[test]
    fn t_critical_matches_tables() {
        let cases = [
            (1.0, 12.706_204_736),
            (2.0, 4.302_652_730),
            (5.0, 2.570_581_836),
            (10.0, 2.228_138_852),
            (30.0, 2.042_272_456),
        ];
        for (df, expected) in cases {
            let t = t_critical(0.95, df).unwrap();
            assert!(((t - expected) / expected).abs() < 1e-6, "df={df}: {t} vs {expected}");
        }
        let t99 = t_critical(0.99, 5.0).unwrap();
        assert!((t99 - 4.032_142_984).abs() < 1e-6);
    }

    #[test]
    fn t_critical_rejects_bad_input() {
        assert_eq!(t_critical(0.0, 5.0), None);
        assert_eq!(t_critical(1.0, 5.0), None);
        assert_eq!(t_critical(0.95, 0.0), None);
        assert_eq!(t_critical(f64::NAN, 3.0), None);
    }

    #[test]
    fn widest_interval_policy_takes_widest_half_span() {
        let set = readings(&["3.0-3.3", "2.95-3.4", "2.95-3.4"]);
        let agg = aggregate(&set, AggregationPolicy::WidestInterval, DEFAULT_CONFIDENCE)
            .known()
            .unwrap();
        assert!((agg.value.half_width - 0.225).abs() < 1e-12);
        assert!((agg.value.center - (3.15 + 3.175 + 3.175) / 3.0).abs() < 1e-12);
        assert_eq!(agg.spread, Spread::NotConsidered);
        assert_eq!(agg.readings, 3);
    }

    #[test]
    fn pooled_policy_uses_all_endpoints() {
        let set = readings(&["3.0-3.3", "2.95-3.4", "2.95-3.4"]);
        let agg = aggregate(&set, AggregationPolicy::PooledEndpoints, DEFAULT_CONFIDENCE)
            .known()
            .unwrap();
        let Spread::Statistical {
            statistics,
            interval,
        } = agg.spread
        else {
            panic!("pooled policy must report statistics");
        };
        assert_eq!(statistics.count, 6);
        assert!((statistics.mean - 19.0 / 6.0).abs() < 1e-12);
        assert!((statistics.std_dev - 0.203_442_6).abs() < 1e-6);
        assert!((agg.value.half_width - interval.half_width).abs() < f64::EPSILON);
    }

    #[test]
    fn policies_disagree_when_widths_differ() {
        let set = readings(&["3.0-3.3", "2.95-3.4", "2.95-3.4"]);
        let pooled = aggregate(&set, AggregationPolicy::PooledEndpoints, DEFAULT_CONFIDENCE)
            .known()
            .unwrap();
        let widest = aggregate(&set, AggregationPolicy::WidestInterval, DEFAULT_CONFIDENCE)
            .known()
            .unwrap();
        assert!(widest.value.half_width > pooled.value.half_width);
    }

    #[test]
    fn aggregate_skips_malformed_readings() {
        let set = readings(&["1.4-1.5", "oops", "1.4-1.6"]);
        let agg = aggregate(&set, AggregationPolicy::WidestInterval, DEFAULT_CONFIDENCE)
            .known()
            .unwrap();
        assert_eq!(agg.readings, 2);
        assert!((agg.value.half_width - 0.1).abs() < 1e-12);
    }

    #[test]
    fn aggregate_of_nothing_is_undefined() {
        let set = readings(&["", "x"]);
        for policy in [
            AggregationPolicy::PooledEndpoints,
            AggregationPolicy::WidestInterval,
        ] {
            assert_eq!(
                aggregate(&set, policy, DEFAULT_CONFIDENCE).reason(),
                Some(Undefined::InsufficientSamples)
            );
        }
    }

    #[test]
    fn policy_parses_from_cli_names() {
        assert_eq!(
            "pooled-endpoints".parse::<AggregationPolicy>(),
            Ok(AggregationPolicy::PooledEndpoints)
        );
        assert_eq!("B".parse::<AggregationPolicy>(), Ok(AggregationPolicy::WidestInterval));
        assert!("median".parse::<AggregationPolicy>().is_err());
    }
}
