//! Tunables for the cutting workflow.
//!
//! Every field has a default, so a partial JSON document only needs to name the
//! values it overrides.

use crate::errors::ConfigError;
use crate::float_types::Real;
use serde::{Deserialize, Serialize};

/// Smallest accepted ratio between the plane brush side and the model diagonal.
pub const MIN_PLANE_SIZE_FACTOR: Real = 10.0;

/// Reference axis crossed with the drag vector to obtain the cutting normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneBasis {
    /// The camera's lateral axis, `(1, 0, 0)` rotated by the camera orientation.
    #[default]
    CameraRight,
    /// The camera's view direction. The plane then contains the drawn stroke.
    ViewDirection,
}

/// Configuration of the cutting subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Drags shorter than this (in viewport pixels) are ignored without a report.
    pub min_drag_pixels: Real,
    /// Side of the plane brush relative to the model's bounding diagonal.
    pub plane_size_factor: Real,
    /// Axis used by the cutting plane solver.
    pub plane_basis: PlaneBasis,
    /// Strokes whose angle to the reference axis has a sine below this are
    /// treated as giving a degenerate normal.
    pub degenerate_normal_epsilon: Real,
    /// Separation distance of each part, relative to the model diagonal.
    pub separation_ratio: Real,
    /// Lower bound for the separation distance, in world units.
    pub min_separation: Real,
    /// A part whose diagonal exceeds this multiple of the model's diagonal is
    /// scaled back down.
    pub oversize_ratio: Real,
    /// RGBA colour of the selection highlight material.
    pub highlight_color: [f32; 4],
    /// Number of leaf meshes split per [`tick`](crate::interaction::Interaction::tick).
    pub meshes_per_tick: usize,
    /// Base file name offered for exported parts.
    pub export_name: String,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            min_drag_pixels: 4.0,
            plane_size_factor: MIN_PLANE_SIZE_FACTOR,
            plane_basis: PlaneBasis::default(),
            degenerate_normal_epsilon: 1e-6,
            separation_ratio: 0.1,
            min_separation: 0.05,
            oversize_ratio: 1.5,
            highlight_color: [1.0, 0.78, 0.18, 1.0],
            meshes_per_tick: 1,
            export_name: "part".to_string(),
        }
    }
}

impl CutConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize this configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.min_drag_pixels >= 0.0) {
            return Err(invalid("min_drag_pixels", "must be zero or positive"));
        }
        if !(self.plane_size_factor >= MIN_PLANE_SIZE_FACTOR) {
            return Err(invalid(
                "plane_size_factor",
                format!("must be at least {MIN_PLANE_SIZE_FACTOR}"),
            ));
        }
        if !(self.degenerate_normal_epsilon > 0.0) {
            return Err(invalid("degenerate_normal_epsilon", "must be positive"));
        }
        if !(self.separation_ratio >= 0.0) {
            return Err(invalid("separation_ratio", "must be zero or positive"));
        }
        if !(self.min_separation >= 0.0) {
            return Err(invalid("min_separation", "must be zero or positive"));
        }
        if !(self.oversize_ratio >= 1.0) {
            return Err(invalid("oversize_ratio", "must be at least 1.0"));
        }
        if self.meshes_per_tick == 0 {
            return Err(invalid("meshes_per_tick", "must be at least 1"));
        }
        if self.highlight_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(invalid("highlight_color", "components must lie in [0, 1]"));
        }
        if self.export_name.trim().is_empty() {
            return Err(invalid("export_name", "must not be empty"));
        }
        Ok(())
    }

    /// Separation distance applied to each part for a model of the given diagonal.
    pub fn separation_distance(&self, model_diagonal: Real) -> Real {
        (self.separation_ratio * model_diagonal).max(self.min_separation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.plane_basis, PlaneBasis::CameraRight);
        assert_eq!(config.meshes_per_tick, 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CutConfig::from_json_str(
            r#"{ "min_separation": 0.5, "plane_basis": "view_direction" }"#,
        )
        .unwrap();
        assert_eq!(config.min_separation, 0.5);
        assert_eq!(config.plane_basis, PlaneBasis::ViewDirection);
        assert_eq!(config.oversize_ratio, CutConfig::default().oversize_ratio);
    }

    #[test]
    fn rejects_small_plane_brush() {
        let err = CutConfig::from_json_str(r#"{ "plane_size_factor": 2.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "plane_size_factor",
                ..
            }
        ));
    }

    #[test]
    fn separation_distance_has_floor() {
        let config = CutConfig::default();
        assert_eq!(config.separation_distance(0.0), config.min_separation);
        assert!((config.separation_distance(10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn json_round_trip() {
        let config = CutConfig {
            meshes_per_tick: 3,
            ..CutConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(CutConfig::from_json_str(&json).unwrap(), config);
    }
}
