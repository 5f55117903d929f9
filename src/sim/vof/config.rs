use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::{VofError, VofResult};

/// Setup-time options of the advection core and the prescribed-flow controller.
///
/// Missing keys in a JSON document take the values of [`VofConfig::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VofConfig {
    // Prescribed flow
    /// Velocity/flux are externally prescribed and may be reversed periodically.
    pub prescribed_velocity: bool,
    /// Reversal period in seconds. `0.0` disables periodic reversal.
    pub period: f64,
    /// Offset within the period at which the flow reverses.
    ///
    /// `None` (or a non-positive value) means half the period.
    pub reverse_time: Option<f64>,

    // Reconstruction
    /// Target accuracy of the enclosed volume, relative to the cell volume.
    pub reconstruction_tolerance: f64,
    /// Iteration budget of the offset root search per cell.
    pub max_reconstruction_iterations: usize,

    // Sub-cycling
    /// Upper bound on sub-steps per outer timestep.
    pub max_sub_cycles: usize,
    /// Largest allowed `sum(outflow) * dt / V` per sub-step (`0 < c <= 1`).
    pub courant_limit: f64,

    // Bounding
    /// Clamps larger than this are counted as stability-bound violations.
    pub bound_tolerance: f64,
    /// Fraction of cells allowed to violate the bound in one outer step before
    /// the step is rejected.
    pub max_violation_fraction: f64,
    /// Volume fraction carried by flow entering through boundary faces.
    pub boundary_inflow_fraction: f64,
}

impl VofConfig {
    pub fn new() -> Self {
        Self {
            prescribed_velocity: false,
            period: 0.0,
            reverse_time: None,
            reconstruction_tolerance: 1e-8,
            max_reconstruction_iterations: 100,
            max_sub_cycles: 100,
            courant_limit: 1.0,
            bound_tolerance: 1e-8,
            max_violation_fraction: 0.05,
            boundary_inflow_fraction: 0.0,
        }
    }

    /// Enables the prescribed-flow controller with the given period.
    pub fn with_prescribed_period(mut self, period: f64) -> Self {
        self.prescribed_velocity = true;
        self.period = period;
        self
    }

    pub fn with_reverse_time(mut self, reverse_time: f64) -> Self {
        self.reverse_time = Some(reverse_time);
        self
    }

    pub fn with_reconstruction_tolerance(mut self, tolerance: f64) -> Self {
        self.reconstruction_tolerance = tolerance;
        self
    }

    pub fn with_max_sub_cycles(mut self, max_sub_cycles: usize) -> Self {
        self.max_sub_cycles = max_sub_cycles;
        self
    }

    pub fn with_courant_limit(mut self, courant_limit: f64) -> Self {
        self.courant_limit = courant_limit;
        self
    }

    /// Reversal instant within a period.
    pub fn effective_reverse_time(&self) -> f64 {
        match self.reverse_time {
            Some(t) if t > 0.0 => t,
            _ => 0.5 * self.period,
        }
    }

    pub fn validate(&self) -> VofResult<()> {
        let invalid = |msg: String| Err(VofError::InvalidConfig(msg));

        if !(self.period.is_finite() && self.period >= 0.0) {
            return invalid(format!("period must be >= 0, got {}", self.period));
        }
        if self.period > 0.0 {
            let t = self.effective_reverse_time();
            if t >= self.period {
                return invalid(format!(
                    "reverseTime ({t}) must be smaller than the period ({})",
                    self.period
                ));
            }
        }
        if !(self.reconstruction_tolerance > 0.0 && self.reconstruction_tolerance < 1.0) {
            return invalid(format!(
                "reconstructionTolerance must be in (0, 1), got {}",
                self.reconstruction_tolerance
            ));
        }
        if self.max_reconstruction_iterations == 0 {
            return invalid("maxReconstructionIterations must be > 0".to_string());
        }
        if self.max_sub_cycles == 0 {
            return invalid("maxSubCycles must be > 0".to_string());
        }
        if !(self.courant_limit > 0.0 && self.courant_limit <= 1.0) {
            return invalid(format!(
                "courantLimit must be in (0, 1], got {}",
                self.courant_limit
            ));
        }
        if !(self.bound_tolerance >= 0.0 && self.bound_tolerance.is_finite()) {
            return invalid(format!(
                "boundTolerance must be >= 0, got {}",
                self.bound_tolerance
            ));
        }
        if !(0.0..=1.0).contains(&self.max_violation_fraction) {
            return invalid(format!(
                "maxViolationFraction must be in [0, 1], got {}",
                self.max_violation_fraction
            ));
        }
        if !(0.0..=1.0).contains(&self.boundary_inflow_fraction) {
            return invalid(format!(
                "boundaryInflowFraction must be in [0, 1], got {}",
                self.boundary_inflow_fraction
            ));
        }
        Ok(())
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to deserialize VOF configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to deserialize configuration from: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in: {}", path.display()))?;
        Ok(config)
    }
}

impl Default for VofConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = VofConfig::new();
        assert!(!config.prescribed_velocity);
        assert_eq!(config.period, 0.0);
        assert_eq!(config.max_sub_cycles, 100);
        assert!((config.reconstruction_tolerance - 1e-8).abs() < 1e-20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_reverse_time() {
        let config = VofConfig::new().with_prescribed_period(4.0);
        assert_eq!(config.effective_reverse_time(), 2.0);
        let config = config.with_reverse_time(1.0);
        assert_eq!(config.effective_reverse_time(), 1.0);
        let config = config.with_reverse_time(0.0);
        assert_eq!(config.effective_reverse_time(), 2.0);
    }

    #[test]
    fn test_validate_rejects() {
        assert!(VofConfig::new().with_courant_limit(1.5).validate().is_err());
        assert!(VofConfig::new().with_max_sub_cycles(0).validate().is_err());
        assert!(
            VofConfig::new()
                .with_prescribed_period(2.0)
                .with_reverse_time(3.0)
                .validate()
                .is_err()
        );
        let mut config = VofConfig::new();
        config.period = -1.0;
        assert!(matches!(config.validate(), Err(VofError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json_str_partial() {
        let json = r#"{ "prescribedVelocity": true, "period": 8.0, "maxSubCycles": 10 }"#;
        let config = VofConfig::from_json_str(json).unwrap();
        assert!(config.prescribed_velocity);
        assert_eq!(config.period, 8.0);
        assert_eq!(config.max_sub_cycles, 10);
        assert_eq!(config.effective_reverse_time(), 4.0);
        assert_eq!(config.courant_limit, 1.0);
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(VofConfig::from_json_str(r#"{ "courantLimit": 0.0 }"#).is_err());
        assert!(VofConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vof.json");
        let config = VofConfig::new()
            .with_prescribed_period(2.0)
            .with_reverse_time(0.5);
        let mut file = File::create(&path).unwrap();
        file.write_all(serde_json::to_string_pretty(&config).unwrap().as_bytes())
            .unwrap();
        drop(file);

        let loaded = VofConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);

        let missing = dir.path().join("missing.json");
        let err = VofConfig::from_json_file(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to open file"));
    }
}
