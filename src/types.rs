//! Common types for friction-lab.
//!
//! Defines measurements, reduced values and the [`Estimate`] sum type that
//! carries undefined results through every computation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a quantity could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Undefined {
    /// Reading text was empty, non-numeric or otherwise unparseable.
    Malformed,
    /// Configuration label names a mass component that is not known.
    UnknownComponent,
    /// Normal force center is zero or negative.
    NonPositiveNormalForce,
    /// Fewer valid samples than the statistic needs.
    InsufficientSamples,
    /// Confidence level outside the open interval (0, 1).
    InvalidConfidenceLevel,
}

impl fmt::Display for Undefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Malformed => "malformed reading",
            Self::UnknownComponent => "unknown mass component",
            Self::NonPositiveNormalForce => "non-positive normal force",
            Self::InsufficientSamples => "insufficient samples",
            Self::InvalidConfidenceLevel => "invalid confidence level",
        };
        f.write_str(text)
    }
}

/// A computed value or the reason it is undefined.
///
/// Every operation that consumes an `Undefined` input returns that same
/// marker, so the first failure is what reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimate<T> {
    Known(T),
    Undefined(Undefined),
}

impl<T> Estimate<T> {
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Undefined(_) => None,
        }
    }

    pub const fn reason(&self) -> Option<Undefined> {
        match self {
            Self::Known(_) => None,
            Self::Undefined(reason) => Some(*reason),
        }
    }

    pub const fn as_ref(&self) -> Estimate<&T> {
        match self {
            Self::Known(value) => Estimate::Known(value),
            Self::Undefined(reason) => Estimate::Undefined(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Estimate<U> {
        match self {
            Self::Known(value) => Estimate::Known(f(value)),
            Self::Undefined(reason) => Estimate::Undefined(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Estimate<U>) -> Estimate<U> {
        match self {
            Self::Known(value) => f(value),
            Self::Undefined(reason) => Estimate::Undefined(reason),
        }
    }

    /// Combines two estimates; the left reason wins when both are undefined.
    pub fn zip<U>(self, other: Estimate<U>) -> Estimate<(T, U)> {
        match (self, other) {
            (Self::Known(a), Estimate::Known(b)) => Estimate::Known((a, b)),
            (Self::Undefined(reason), _) | (_, Estimate::Undefined(reason)) => {
                Estimate::Undefined(reason)
            }
        }
    }
}

/// A (center, half-width) pair. The half-width is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducedValue {
    pub center: f64,
    pub half_width: f64,
}

impl ReducedValue {
    /// Builds a value, folding the sign of `half_width` away.
    pub fn new(center: f64, half_width: f64) -> Self {
        Self {
            center,
            half_width: half_width.abs(),
        }
    }

    pub fn exact(center: f64) -> Self {
        Self::new(center, 0.0)
    }

    /// Wraps the pair, rejecting non-finite components as malformed.
    pub fn estimate(center: f64, half_width: f64) -> Estimate<Self> {
        if center.is_finite() && half_width.is_finite() {
            Estimate::Known(Self::new(center, half_width))
        } else {
            Estimate::Undefined(Undefined::Malformed)
        }
    }

    /// Scales center and half-width by the same factor.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.center * factor, self.half_width * factor)
    }

    pub fn low(self) -> f64 {
        self.center - self.half_width
    }

    pub fn high(self) -> f64 {
        self.center + self.half_width
    }
}

impl fmt::Display for ReducedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        write!(
            f,
            "{:.precision$} ± {:.precision$}",
            self.center, self.half_width
        )
    }
}

/// Sliding block material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    /// Steel block ("Stahl").
    Steel,
    /// White block ("Weiss").
    Polyethylene,
    /// Black block ("Schwarz").
    Polyisoprene,
}

impl Material {
    pub const ALL: [Self; 3] = [Self::Steel, Self::Polyethylene, Self::Polyisoprene];

    /// Code used in the lab notebook and the CSV export.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Steel => "Stahl",
            Self::Polyethylene => "Weiss",
            Self::Polyisoprene => "Schwarz",
        }
    }

    /// Label used on charts and in the report.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Steel => "Stahl",
            Self::Polyethylene => "Polyethylen",
            Self::Polyisoprene => "Polyisopren",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which series of the lab session a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Experiment {
    /// Stacked weights at 5 V on the large face.
    WeightVariation,
    /// Base block on the narrow face at 5 V.
    SmallArea,
    /// Base block on the large face at 7–11 V.
    VoltageVariation,
}

impl Experiment {
    /// Identifier used in the CSV export.
    pub const fn id(self) -> &'static str {
        match self {
            Self::WeightVariation => "Weight_Var",
            Self::SmallArea => "Small_Area",
            Self::VoltageVariation => "Voltage_Var",
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One transcribed meter reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub experiment: Experiment,
    pub material: Material,
    /// Stacked masses, e.g. `B+1+2`.
    pub configuration: String,
    /// Drive voltage in volts.
    pub voltage: u32,
    /// Contact area in cm².
    pub area_cm2: f64,
    /// Reading as written down, e.g. `3.0-3.3`.
    pub reading: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zip_keeps_first_undefined_reason() {
        let a: Estimate<f64> = Estimate::Undefined(Undefined::Malformed);
        let b: Estimate<f64> = Estimate::Undefined(Undefined::InsufficientSamples);
        assert_eq!(a.zip(b).reason(), Some(Undefined::Malformed));
        assert_eq!(
            Estimate::Known(1.0).zip(b).reason(),
            Some(Undefined::InsufficientSamples)
        );
    }

    #[test]
    fn and_then_short_circuits() {
        let undefined: Estimate<f64> = Estimate::Undefined(Undefined::Malformed);
        let out = undefined.and_then(|v| Estimate::Known(v * 2.0));
        assert_eq!(out, Estimate::Undefined(Undefined::Malformed));
    }

    #[test]
    fn reduced_value_half_width_is_non_negative() {
        let value = ReducedValue::new(1.0, -0.25);
        assert!((value.half_width - 0.25).abs() < f64::EPSILON);
        assert!((value.low() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn reduced_value_rejects_nan() {
        assert_eq!(
            ReducedValue::estimate(f64::NAN, 0.1),
            Estimate::Undefined(Undefined::Malformed)
        );
    }

    #[test]
    fn display_uses_requested_precision() {
        let value = ReducedValue::new(1.2345, 0.0671);
        assert_eq!(format!("{value:.2}"), "1.23 ± 0.07");
        assert_eq!(format!("{value}"), "1.2345 ± 0.0671");
    }
}
