//! Interval reducer.
//!
//! Turns meter readings written as `low-high` (or a single value) into a
//! [`ReducedValue`]. Malformed text yields [`Undefined::Malformed`].

use crate::types::{Estimate, ReducedValue, Undefined};

/// A parsed meter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Needle fluctuated between two marks.
    Range { low: f64, high: f64 },
    /// Needle stood still.
    Point(f64),
}

impl Reading {
    /// Center and half-width of the reading.
    pub fn reduce(self) -> ReducedValue {
        match self {
            Self::Range { low, high } => {
                let (min, max) = if low <= high { (low, high) } else { (high, low) };
                ReducedValue::new((low + high) / 2.0, (max - min) / 2.0)
            }
            Self::Point(value) => ReducedValue::exact(value),
        }
    }

    /// Endpoints as independent samples: two for a range, one for a point.
    pub fn endpoints(self) -> impl Iterator<Item = f64> {
        let (first, second) = match self {
            Self::Range { low, high } => (low, Some(high)),
            Self::Point(value) => (value, None),
        };
        std::iter::once(first).chain(second)
    }

    /// Full span of the reading (zero for a point).
    pub fn width(self) -> f64 {
        match self {
            Self::Range { low, high } => (high - low).abs(),
            Self::Point(_) => 0.0,
        }
    }
}

/// Parses `"3.0-3.3"` or `"1.45"` into a [`Reading`].
///
/// A leading minus belongs to the first number, so `"-0.5"` is a point and
/// `"-0.5-0.5"` a range. A minus right after an exponent marker is part of
/// the number (`"1e-3"`). More than two numbers, empty text or non-finite
/// values are malformed.
pub fn parse_reading(text: &str) -> Estimate<Reading> {
    let text = text.trim();
    if text.is_empty() {
        return Estimate::Undefined(Undefined::Malformed);
    }

    let bytes = text.as_bytes();
    let separator = (1..bytes.len()).find(|&i| bytes[i] == b'-' && !matches!(bytes[i - 1], b'e' | b'E'));

    let Some(split) = separator else {
        return parse_number(text).map(Reading::Point);
    };

    let (low, high) = (&text[..split], &text[split + 1..]);
    parse_number(low)
        .zip(parse_number(high))
        .map(|(low, high)| Reading::Range { low, high })
}

/// Reduces reading text straight to (center, half-width).
pub fn reduce(text: &str) -> Estimate<ReducedValue> {
    parse_reading(text).map(Reading::reduce)
}

fn parse_number(text: &str) -> Estimate<f64> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Estimate::Known(value),
        _ => Estimate::Undefined(Undefined::Malformed),
    }
}
