//! First-order error propagation.
//!
//! Mass → normal force, force ratio → friction coefficient, and the mass of a
//! stacked block configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Estimate, Material, ReducedValue, Undefined};

/// Standard gravity used by the lab sheet, m/s².
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Normal force F = m·g, with the mass given in grams.
///
/// The half-width scales the same way as the center.
pub fn normal_force(mass_g: Estimate<ReducedValue>, gravity: f64) -> Estimate<ReducedValue> {
    mass_g.map(|mass| mass.scale(gravity / 1000.0))
}

/// Friction coefficient μ = Fr/Fn with independent uncertainties:
///
/// Δμ = √[(ΔFr/Fn)² + (Fr·ΔFn/Fn²)²]
///
/// Undefined when the normal force is not strictly positive.
pub fn friction_coefficient(
    friction: Estimate<ReducedValue>,
    normal: Estimate<ReducedValue>,
) -> Estimate<ReducedValue> {
    friction.zip(normal).and_then(|(fr, fn_)| {
        if fn_.center <= 0.0 {
            return Estimate::Undefined(Undefined::NonPositiveNormalForce);
        }
        let (force_term, normal_term) = ratio_terms(fr, fn_);
        ReducedValue::estimate(fr.center / fn_.center, force_term.hypot(normal_term))
    })
}

/// The two contributions ΔFr/Fn and Fr·ΔFn/Fn² to Δμ (unsquared).
pub fn ratio_terms(friction: ReducedValue, normal: ReducedValue) -> (f64, f64) {
    (
        friction.half_width / normal.center,
        friction.center * normal.half_width / (normal.center * normal.center),
    )
}

/// Masses of the base blocks and stacked weights, in grams.
///
/// Configured `blocks` and `weights` entries are merged over the defaults,
/// so overriding one mass keeps all others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MassModel {
    /// Base block `B` per material.
    #[serde(deserialize_with = "blocks_over_defaults")]
    pub blocks: BTreeMap<Material, f64>,
    /// Stacked weights by label (`1`..`4`).
    #[serde(deserialize_with = "weights_over_defaults")]
    pub weights: BTreeMap<String, f64>,
    /// Uncertainty of one weighing; components add in quadrature.
    pub uncertainty: f64,
}

impl Default for MassModel {
    fn default() -> Self {
        Self {
            blocks: BTreeMap::from([
                (Material::Steel, 616.0),
                (Material::Polyethylene, 678.0),
                (Material::Polyisoprene, 678.0),
            ]),
            weights: BTreeMap::from([
                ("1".to_string(), 160.8),
                ("2".to_string(), 153.9),
                ("3".to_string(), 154.1),
                ("4".to_string(), 156.4),
            ]),
            uncertainty: 0.1,
        }
    }
}

fn blocks_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Material, f64>, D::Error> {
    let mut blocks = MassModel::default().blocks;
    blocks.extend(BTreeMap::<Material, f64>::deserialize(deserializer)?);
    Ok(blocks)
}

fn weights_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, f64>, D::Error> {
    let mut weights = MassModel::default().weights;
    weights.extend(BTreeMap::<String, f64>::deserialize(deserializer)?);
    Ok(weights)
}

impl MassModel {
    /// Total mass of a configuration label such as `B+1+2`.
    ///
    /// Each component contributes its mass and one weighing uncertainty in
    /// quadrature. Unknown components make the result undefined.
    pub fn mass_of(&self, configuration: &str, material: Material) -> Estimate<ReducedValue> {
        let mut total = 0.0;
        let mut components = 0_u32;

        for part in configuration.split('+').map(str::trim) {
            let mass = if part == "B" {
                self.blocks.get(&material)
            } else {
                self.weights.get(part)
            };
            let Some(mass) = mass else {
                return Estimate::Undefined(Undefined::UnknownComponent);
            };
            total += mass;
            components += 1;
        }

        ReducedValue::estimate(total, self.uncertainty * f64::from(components).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn known(center: f64, half_width: f64) -> Estimate<ReducedValue> {
        Estimate::Known(ReducedValue::new(center, half_width))
    }

    #[test]
    fn normal_force_from_grams() {
        let fn_ = normal_force(known(616.0, 0.1), STANDARD_GRAVITY)
            .known()
            .unwrap();
        assert!((fn_.center - 6.042_96).abs() < 1e-9);
        assert!((fn_.half_width - 0.000_981).abs() < 1e-12);
    }

    #[test]
    fn friction_coefficient_end_to_end() {
        let fn_ = normal_force(known(616.0, 0.1), STANDARD_GRAVITY);
        let mu = friction_coefficient(known(1.775, 0.125), fn_)
            .known()
            .unwrap();
        assert!((mu.center - 0.293_730_2).abs() < 1e-6);
        assert!((mu.half_width - 0.020_685_3).abs() < 1e-6);
    }

    #[test]
    fn exact_inputs_give_exact_mu() {
        let mu = friction_coefficient(known(2.0, 0.0), known(8.0, 0.0))
            .known()
            .unwrap();
        assert!((mu.center - 0.25).abs() < 1e-12);
        assert!(mu.half_width.abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_normal_force_is_undefined() {
        for center in [0.0, -1.0] {
            assert_eq!(
                friction_coefficient(known(1.0, 0.1), known(center, 0.1)).reason(),
                Some(Undefined::NonPositiveNormalForce)
            );
        }
    }

    #[test]
    fn undefined_inputs_propagate() {
        let malformed = Estimate::Undefined(Undefined::Malformed);
        assert_eq!(
            friction_coefficient(malformed, known(5.0, 0.1)).reason(),
            Some(Undefined::Malformed)
        );
        assert_eq!(
            normal_force(Estimate::Undefined(Undefined::UnknownComponent), 9.81).reason(),
            Some(Undefined::UnknownComponent)
        );
    }

    #[test]
    fn mass_of_stacked_configuration() {
        let model = MassModel::default();
        let mass = model
            .mass_of("B+1+2+3+4", Material::Polyethylene)
            .known()
            .unwrap();
        assert!((mass.center - (678.0 + 160.8 + 153.9 + 154.1 + 156.4)).abs() < 1e-9);
        assert!((mass.half_width - 0.1 * 5.0_f64.sqrt()).abs() < 1e-12);

        let base = model.mass_of("B", Material::Steel).known().unwrap();
        assert!((base.center - 616.0).abs() < f64::EPSILON);
        assert!((base.half_width - 0.1).abs() < 1e-12);
    }

    #[test]
    fn unknown_component_is_undefined() {
        let model = MassModel::default();
        assert_eq!(
            model.mass_of("B+7", Material::Steel).reason(),
            Some(Undefined::UnknownComponent)
        );
        assert_eq!(
            model.mass_of("", Material::Steel).reason(),
            Some(Undefined::UnknownComponent)
        );
    }
}
