// src/config.rs - Detection parameters shared by the matcher and the gesture detectors
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("max_alternatives must be at least 1")]
    NoAlternatives,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParameters {
    /// Minimum confidence for the top match to be reported as primary.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Extension at or above which a finger counts as extended.
    #[serde(default = "default_extension_threshold")]
    pub extension_threshold: f64,
    /// Curl at or above which a finger counts as curled.
    #[serde(default = "default_curl_threshold")]
    pub curl_threshold: f64,
    /// Fingertip separation (meters) below which two tips are touching.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
    /// Matches at or below this confidence are dropped as noise.
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

fn default_confidence_threshold() -> f64 { 0.7 }
fn default_extension_threshold() -> f64 { 0.8 }
fn default_curl_threshold() -> f64 { 0.5 }
fn default_distance_threshold() -> f64 { 0.03 }
fn default_noise_floor() -> f64 { 0.1 }
fn default_max_alternatives() -> usize { 5 }

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            extension_threshold: default_extension_threshold(),
            curl_threshold: default_curl_threshold(),
            distance_threshold: default_distance_threshold(),
            noise_floor: default_noise_floor(),
            max_alternatives: default_max_alternatives(),
        }
    }
}

impl DetectionParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_fields = [
            ("confidence_threshold", self.confidence_threshold),
            ("extension_threshold", self.extension_threshold),
            ("curl_threshold", self.curl_threshold),
            ("distance_threshold", self.distance_threshold),
            ("noise_floor", self.noise_floor),
        ];

        for (name, value) in unit_fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        if self.max_alternatives == 0 {
            return Err(ConfigError::NoAlternatives);
        }

        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?;
        let params: DetectionParameters = serde_json::from_str(&content)
            .with_context(|| format!("Invalid parameter file {}", path.display()))?;
        params.validate()?;
        info!(?path, "Loaded detection parameters");
        Ok(params)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write parameters to {}", path.display()))?;
        Ok(())
    }
}
