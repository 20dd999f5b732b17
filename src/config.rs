use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CoocError, Result};

/// Parameters of one attraction/repulsion analysis run.
///
/// Built once and passed by reference into every component; nothing reads
/// these values from process-wide state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Divide neighbor counts near the study-region boundary by the overlap ratio.
    pub edge_correction: bool,
    /// Fraction of simulations on each tail that forms the critical region.
    pub significance_range: f64,
    pub simulation_count: usize,
    /// Neighbor search distance on the ground, in kilometers.
    pub delta_distance_km: f64,
    /// Minimum number of documents a bigram must appear in to be tested.
    pub min_term_frequency: usize,
    /// Evaluate the simulated K values on the rayon pool.
    pub parallel: bool,
    pub max_runtime_secs: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            edge_correction: true,
            significance_range: 0.05,
            simulation_count: 500,
            delta_distance_km: 0.5,
            min_term_frequency: 5,
            parallel: true,
            max_runtime_secs: None,
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CoocError::io(path, e))?;
        let config: AnalysisConfig =
            serde_json::from_str(&text).map_err(|source| CoocError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Number of simulations on each tail of the envelope.
    pub fn envelope_size(&self) -> usize {
        (self.significance_range * self.simulation_count as f64).floor() as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation_count == 0 {
            return Err(CoocError::config("simulation_count must be at least 1"));
        }
        if !(self.significance_range > 0.0 && self.significance_range <= 0.5) {
            return Err(CoocError::config(format!(
                "significance_range must be in (0, 0.5], got {}",
                self.significance_range
            )));
        }
        if self.envelope_size() == 0 {
            return Err(CoocError::config(format!(
                "significance_range {} leaves no simulation in the envelope tails with {} simulations",
                self.significance_range, self.simulation_count
            )));
        }
        if !(self.delta_distance_km.is_finite() && self.delta_distance_km > 0.0) {
            return Err(CoocError::config(format!(
                "delta_distance_km must be a positive distance, got {}",
                self.delta_distance_km
            )));
        }
        if self.min_term_frequency == 0 {
            return Err(CoocError::config("min_term_frequency must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.envelope_size(), 25);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"simulation_count": 99, "edge_correction": false}"#).unwrap();
        assert_eq!(config.simulation_count, 99);
        assert!(!config.edge_correction);
        assert_eq!(config.min_term_frequency, 5);
        assert_eq!(config.delta_distance_km, 0.5);
    }

    #[test]
    fn rejects_empty_envelope() {
        let config = AnalysisConfig {
            simulation_count: 10,
            significance_range: 0.05,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoocError::Config(_))));
    }

    #[test]
    fn rejects_bad_distance() {
        let config = AnalysisConfig {
            delta_distance_km: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
