//! Engine settings
//!
//! Fixed at `Physics::init`. Only gravity may change while the engine runs.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{PhysicsError, Result};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity acceleration applied to bodies with `use_gravity`
    pub gravity: Vec2,
    /// Fixed step length in seconds
    pub desired_delta_time: f32,
    /// Largest frame time simulated per call (seconds)
    pub max_timestep: f32,
    /// Impulse solver passes per step
    pub collision_iterations: u32,
    /// Penetration depth left uncorrected
    pub penetration_allowance: f32,
    /// Fraction of remaining penetration corrected per step (0..=1)
    pub penetration_correction: f32,
    /// Body pool capacity (at most `MAX_BODIES`)
    pub max_bodies: usize,
    /// Manifold pool capacity (at most `MAX_MANIFOLDS`)
    pub max_manifolds: usize,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            desired_delta_time: DESIRED_DELTA_TIME,
            max_timestep: MAX_TIMESTEP,
            collision_iterations: COLLISION_ITERATIONS,
            penetration_allowance: PENETRATION_ALLOWANCE,
            penetration_correction: PENETRATION_CORRECTION,
            max_bodies: MAX_BODIES,
            max_manifolds: MAX_MANIFOLDS,
        }
    }
}

impl PhysicsSettings {
    /// Default settings with a different gravity
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    /// Check every value is usable by the stepper
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PhysicsError::InvalidSettings(msg));

        if !self.gravity.is_finite() {
            return invalid(format!("gravity must be finite, got {}", self.gravity));
        }
        if !(self.desired_delta_time.is_finite() && self.desired_delta_time > 0.0) {
            return invalid(format!(
                "desired_delta_time must be positive, got {}",
                self.desired_delta_time
            ));
        }
        if !(self.max_timestep.is_finite() && self.max_timestep >= self.desired_delta_time) {
            return invalid(format!(
                "max_timestep ({}) must be at least desired_delta_time ({})",
                self.max_timestep, self.desired_delta_time
            ));
        }
        if self.collision_iterations == 0 {
            return invalid("collision_iterations must be at least 1".into());
        }
        if !(self.penetration_allowance.is_finite() && self.penetration_allowance >= 0.0) {
            return invalid(format!(
                "penetration_allowance must be non-negative, got {}",
                self.penetration_allowance
            ));
        }
        if !(0.0..=1.0).contains(&self.penetration_correction) {
            return invalid(format!(
                "penetration_correction must be in [0, 1], got {}",
                self.penetration_correction
            ));
        }
        if self.max_bodies == 0 || self.max_bodies > MAX_BODIES {
            return invalid(format!(
                "max_bodies must be in 1..={}, got {}",
                MAX_BODIES, self.max_bodies
            ));
        }
        if self.max_manifolds == 0 || self.max_manifolds > MAX_MANIFOLDS {
            return invalid(format!(
                "max_manifolds must be in 1..={}, got {}",
                MAX_MANIFOLDS, self.max_manifolds
            ));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON (missing fields use defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded physics settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Physics settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PhysicsSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_bodies, 64);
        assert_eq!(settings.max_manifolds, 4096);
        assert_eq!(settings.collision_iterations, 100);
        assert!((settings.desired_delta_time - 1.0 / 60.0).abs() < 1e-9);
        assert!((settings.max_timestep - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "gravity": [0.0, 0.0], "collision_iterations": 10 }"#;
        let settings = PhysicsSettings::from_json(json).unwrap();
        assert_eq!(settings.gravity, Vec2::ZERO);
        assert_eq!(settings.collision_iterations, 10);
        assert_eq!(settings.max_bodies, MAX_BODIES);
    }

    #[test]
    fn test_json_roundtrip_preserves_values() {
        let settings = PhysicsSettings {
            penetration_correction: 0.25,
            ..PhysicsSettings::with_gravity(Vec2::new(1.0, -2.0))
        };
        let json = settings.to_json().unwrap();
        assert_eq!(PhysicsSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let too_many = PhysicsSettings {
            max_bodies: MAX_BODIES + 1,
            ..Default::default()
        };
        assert!(matches!(too_many.validate(), Err(PhysicsError::InvalidSettings(_))));

        let bad_step = PhysicsSettings {
            max_timestep: 0.001,
            ..Default::default()
        };
        assert!(bad_step.validate().is_err());

        assert!(matches!(
            PhysicsSettings::from_json("not json"),
            Err(PhysicsError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path =
            std::env::temp_dir().join(format!("physac_settings_{}.json", std::process::id()));
        let settings = PhysicsSettings::with_gravity(Vec2::new(0.0, 3.0));
        settings.save(&path).unwrap();
        let loaded = PhysicsSettings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}
