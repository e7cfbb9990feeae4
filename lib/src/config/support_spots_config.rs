//! Support spots configuration.
//!
//! Units are millimeters, grams and seconds throughout, so forces come out in g·mm/s²
//! and torques in g·mm²/s².

use super::material::{bed_adhesion_for_material, PLA_BED_ADHESION};
use super::{ConfigError, ConfigResult};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::warn;

const GRAVITY_CONSTANT: f64 = 9806.65;

/// Constants steering the support-spot analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportSpotsConfig {
    // === Local bridging ===
    /// Longest straight span tolerated over open air (mm).
    pub bridge_distance: CoordF,

    /// Maximum sub-segment length when subdividing paths (mm).
    pub bridge_sampling_distance: CoordF,

    /// How fast the tolerated span shrinks as the path curves.
    pub bridge_distance_decrease_by_curvature_factor: f64,

    /// Minimum spacing of local support points along a path (mm).
    pub min_distance_between_support_points: CoordF,

    // === Global stability ===
    /// Footprint radius of a global support point (mm).
    pub support_points_interface_radius: CoordF,

    /// Adhesion per mm² under an added support point.
    pub support_points_adhesion_strength: f64,

    /// mm/s².
    pub gravity_constant: f64,

    /// Bed acceleration the part must withstand (mm/s²).
    pub max_acceleration: f64,

    /// g/mm³.
    pub filament_density: f64,

    /// Force the nozzle can exert on an already printed part.
    pub standard_extruder_conflict_force: f64,

    /// Strength of bonds between printed layers.
    pub material_yield_strength: f64,

    // === Curling ===
    /// Lower bound of the overhang band in which filament curls, as a multiple of width.
    pub curling_min_distance_factor: f64,

    /// Upper bound of that band.
    pub curling_max_distance_factor: f64,

    /// Curled heights above this are reported (mm).
    pub min_curled_height: CoordF,

    // === Execution ===
    /// Fan out per-path sampling over a thread pool.
    pub parallel: bool,

    /// Per-material bed adhesion yield strength, overriding the built-in table.
    pub bed_adhesion_overrides: BTreeMap<String, f64>,
}

impl Default for SupportSpotsConfig {
    fn default() -> Self {
        Self {
            bridge_distance: 12.0,
            bridge_sampling_distance: 2.0,
            bridge_distance_decrease_by_curvature_factor: 5.0,
            min_distance_between_support_points: 3.0,

            support_points_interface_radius: 1.5,
            support_points_adhesion_strength: 0.018e6,
            gravity_constant: GRAVITY_CONSTANT,
            max_acceleration: 9000.0,
            filament_density: 1.25e-3,
            standard_extruder_conflict_force: 10.0 * GRAVITY_CONSTANT,
            material_yield_strength: 33e6,

            curling_min_distance_factor: 0.2,
            curling_max_distance_factor: 1.1,
            min_curled_height: 0.05,

            parallel: true,
            bed_adhesion_overrides: BTreeMap::new(),
        }
    }
}

impl SupportSpotsConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("bridge_distance", self.bridge_distance)?;
        positive("bridge_sampling_distance", self.bridge_sampling_distance)?;
        if self.bridge_sampling_distance > self.bridge_distance {
            return Err(ConfigError::Invalid(format!(
                "bridge_sampling_distance ({}) must not exceed bridge_distance ({})",
                self.bridge_sampling_distance, self.bridge_distance
            )));
        }
        non_negative(
            "bridge_distance_decrease_by_curvature_factor",
            self.bridge_distance_decrease_by_curvature_factor,
        )?;
        non_negative(
            "min_distance_between_support_points",
            self.min_distance_between_support_points,
        )?;

        positive("support_points_interface_radius", self.support_points_interface_radius)?;
        non_negative("support_points_adhesion_strength", self.support_points_adhesion_strength)?;
        positive("gravity_constant", self.gravity_constant)?;
        non_negative("max_acceleration", self.max_acceleration)?;
        positive("filament_density", self.filament_density)?;
        non_negative("standard_extruder_conflict_force", self.standard_extruder_conflict_force)?;
        positive("material_yield_strength", self.material_yield_strength)?;

        non_negative("curling_min_distance_factor", self.curling_min_distance_factor)?;
        if self.curling_max_distance_factor <= self.curling_min_distance_factor
            || !self.curling_max_distance_factor.is_finite()
        {
            return Err(ConfigError::Invalid(
                "curling_max_distance_factor must be greater than curling_min_distance_factor"
                    .to_string(),
            ));
        }
        non_negative("min_curled_height", self.min_curled_height)?;

        for (material, strength) in &self.bed_adhesion_overrides {
            positive(&format!("bed_adhesion_overrides[{material}]"), *strength)?;
        }
        Ok(())
    }

    /// Bed adhesion yield strength for an object printed with `filament_types`.
    ///
    /// Overrides win over the built-in table. Unknown, missing or mixed materials fall
    /// back to the PLA value, the weakest common adhesion.
    pub fn bed_adhesion_yield_strength(&self, filament_types: &[String]) -> f64 {
        let distinct: BTreeSet<String> = filament_types
            .iter()
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut iter = distinct.iter();
        let material = match (iter.next(), iter.next()) {
            (Some(material), None) => material,
            (None, _) => {
                warn!("no filament type given, using PLA bed adhesion");
                return PLA_BED_ADHESION;
            }
            (Some(_), Some(_)) => {
                warn!(types = ?distinct, "mixed filament types, using PLA bed adhesion");
                return PLA_BED_ADHESION;
            }
        };

        let overridden = self
            .bed_adhesion_overrides
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(material))
            .map(|(_, strength)| *strength);

        match overridden.or_else(|| bed_adhesion_for_material(material)) {
            Some(strength) => strength,
            None => {
                warn!(material = %material, "unknown filament type, using PLA bed adhesion");
                PLA_BED_ADHESION
            }
        }
    }
}

fn positive(name: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SupportSpotsConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.standard_extruder_conflict_force, 98066.5);
        assert!(config.parallel);
    }

    #[test]
    fn test_from_json_partial() {
        let config = SupportSpotsConfig::from_json(r#"{"bridge_distance": 8.0, "parallel": false}"#).unwrap();
        assert_relative_eq!(config.bridge_distance, 8.0);
        assert!(!config.parallel);
        assert_relative_eq!(config.min_distance_between_support_points, 3.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = SupportSpotsConfig::default();
        config.bed_adhesion_overrides.insert("PA".into(), 0.05e6);
        let json = config.to_json().unwrap();
        assert_eq!(SupportSpotsConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SupportSpotsConfig {
            bridge_distance: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SupportSpotsConfig {
            bridge_sampling_distance: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SupportSpotsConfig {
            filament_density: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(matches!(
            SupportSpotsConfig::from_json(r#"{"curling_max_distance_factor": 0.1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SupportSpotsConfig::from_json("[1, 2"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_bed_adhesion_lookup() {
        let config = SupportSpotsConfig::default();
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["PETG"])), 0.3e6);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["abs", "ABS"])), 0.1e6);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["PLA", "PETG"])), PLA_BED_ADHESION);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["Nylon"])), PLA_BED_ADHESION);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&[]), PLA_BED_ADHESION);
    }

    #[test]
    fn test_bed_adhesion_override() {
        let mut config = SupportSpotsConfig::default();
        config.bed_adhesion_overrides.insert("nylon".into(), 0.07e6);
        config.bed_adhesion_overrides.insert("PLA".into(), 0.02e6);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["NYLON"])), 0.07e6);
        assert_relative_eq!(config.bed_adhesion_yield_strength(&types(&["PLA"])), 0.02e6);
    }
}
