//! Lab notebook transcription.
//!
//! Every friction-force reading taken during the session, grouped by
//! experiment. Readings are kept as written so the reducer sees the raw text.

use crate::types::{Experiment, Material, Measurement};

/// Contact area of the large face, cm².
pub fn large_area(material: Material) -> f64 {
    match material {
        Material::Steel | Material::Polyisoprene => 10.0 * 3.9,
        Material::Polyethylene => 10.0 * 4.0,
    }
}

/// Contact area of the narrow face, cm².
pub fn small_area(material: Material) -> f64 {
    match material {
        Material::Steel | Material::Polyethylene => 2.0 * 10.0,
        Material::Polyisoprene => 2.0 * 10.2,
    }
}

/// Block configurations in ascending mass order.
pub const CONFIGURATIONS: [&str; 5] = ["B", "B+1", "B+1+2", "B+1+2+3", "B+1+2+3+4"];

/// Voltage used for the weight and area series.
pub const BASE_VOLTAGE: u32 = 5;

// Three repeated readings per configuration, heaviest first as recorded.
const WEIGHT_SERIES: [(Material, [(&str, [&str; 3]); 5]); 3] = [
    (
        Material::Steel,
        [
            ("B+1+2+3+4", ["3.0-3.3", "2.95-3.4", "2.95-3.4"]),
            ("B+1+2+3", ["2.6-3.1", "2.65-3.1", "2.65-3.1"]),
            ("B+1+2", ["2.35-2.75", "2.35-2.8", "2.45-2.8"]),
            ("B+1", ["2.0-2.4", "2.0-2.4", "2.0-2.4"]),
            ("B", ["1.65-1.9", "1.65-1.9", "1.65-1.85"]),
        ],
    ),
    (
        Material::Polyethylene,
        [
            ("B+1+2+3+4", ["1.8-2.05", "1.75-2.00", "1.75-2.05"]),
            ("B+1+2+3", ["1.65-1.85", "1.7-1.85", "1.75-1.85"]),
            ("B+1+2", ["1.6-1.75", "1.65-1.75", "1.65-1.8"]),
            ("B+1", ["1.45-1.55", "1.45-1.6", "1.45-1.6"]),
            ("B", ["1.25-1.35", "1.25-1.35", "1.2-1.35"]),
        ],
    ),
    (
        Material::Polyisoprene,
        [
            ("B+1+2+3+4", ["4.15-4.25", "3.9-4.05", "4.0-4.15"]),
            ("B+1+2+3", ["3.55-3.75", "3.6-3.8", "3.65-3.85"]),
            ("B+1+2", ["3.25-3.4", "3.25-3.45", "3.25-3.45"]),
            ("B+1", ["2.8-2.95", "2.8-2.95", "2.8-3.0"]),
            ("B", ["2.3-2.45", "2.3-2.45", "2.3-2.45"]),
        ],
    ),
];

const SMALL_AREA_SERIES: [(Material, [&str; 3]); 3] = [
    (Material::Steel, ["1.4-1.5", "1.4-1.5", "1.4-1.5"]),
    (Material::Polyethylene, ["0.95-1.0", "0.95-1.05", "0.95-1.05"]),
    (Material::Polyisoprene, ["1.85-1.95", "1.85-1.95", "1.9-2.0"]),
];

const VOLTAGE_SERIES: [(Material, [(u32, [&str; 3]); 3]); 3] = [
    (
        Material::Steel,
        [
            (7, ["1.5-1.9", "1.5-1.9", "1.5-1.9"]),
            (9, ["1.5-1.95", "1.5-2.0", "1.6-2.0"]),
            (11, ["1.45-2.5", "1.35-2.25", "1.35-2.15"]),
        ],
    ),
    (
        Material::Polyethylene,
        [
            (7, ["1.25-1.35", "1.25-1.35", "1.25-1.35"]),
            (9, ["1.35-1.45", "1.35-1.5", "1.35-1.45"]),
            (11, ["1.4-1.5", "1.4-1.55", "1.4-1.55"]),
        ],
    ),
    (
        Material::Polyisoprene,
        [
            (7, ["2.35-2.5", "2.35-2.55", "2.4-2.6"]),
            (9, ["2.4-2.55", "2.4-2.55", "2.45-2.6"]),
            (11, ["2.4-2.5", "2.45-2.55", "2.5-2.6"]),
        ],
    ),
];

/// All measurements of the session, in notebook order.
pub fn measurements() -> Vec<Measurement> {
    let mut rows = Vec::with_capacity(90);

    for (material, series) in WEIGHT_SERIES {
        for (configuration, readings) in series {
            rows.extend(readings.iter().map(|reading| Measurement {
                experiment: Experiment::WeightVariation,
                material,
                configuration: configuration.to_string(),
                voltage: BASE_VOLTAGE,
                area_cm2: large_area(material),
                reading: (*reading).to_string(),
            }));
        }
    }

    for (material, readings) in SMALL_AREA_SERIES {
        rows.extend(readings.iter().map(|reading| Measurement {
            experiment: Experiment::SmallArea,
            material,
            configuration: "B".to_string(),
            voltage: BASE_VOLTAGE,
            area_cm2: small_area(material),
            reading: (*reading).to_string(),
        }));
    }

    for (material, series) in VOLTAGE_SERIES {
        for (voltage, readings) in series {
            rows.extend(readings.iter().map(|reading| Measurement {
                experiment: Experiment::VoltageVariation,
                material,
                configuration: "B".to_string(),
                voltage,
                area_cm2: large_area(material),
                reading: (*reading).to_string(),
            }));
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::reduce;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_has_every_reading() {
        let rows = measurements();
        assert_eq!(rows.len(), 45 + 9 + 27);
        let count = |experiment: Experiment| rows.iter().filter(|m| m.experiment == experiment).count();
        assert_eq!(count(Experiment::WeightVariation), 45);
        assert_eq!(count(Experiment::SmallArea), 9);
        assert_eq!(count(Experiment::VoltageVariation), 27);
    }

    #[test]
    fn every_reading_reduces() {
        for m in measurements() {
            assert!(reduce(&m.reading).is_known(), "{m:?}");
        }
    }

    #[test]
    fn areas_match_block_faces() {
        assert!((large_area(Material::Polyethylene) - 40.0).abs() < 1e-12);
        assert!((small_area(Material::Polyisoprene) - 20.4).abs() < 1e-12);
        assert!(measurements()
            .iter()
            .filter(|m| m.experiment == Experiment::SmallArea)
            .all(|m| m.area_cm2 < 30.0));
    }
}
