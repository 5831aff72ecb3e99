//! Build and verify configuration.
//!
//! Every key has a default, so an absent or partial TOML file is fine.

use crate::core::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub verify: VerifyConfig,
}

/// Inclusive integer range as written in TOML: `{ min = 1, max = 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Span {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Branch receiving the crime scene reports.
    pub archive_branch: String,
    pub streets: Vec<String>,
    /// Houses per street, inclusive.
    pub street_capacity: Span,
    /// Reports committed before the main one, including the one in the report week.
    pub reports_before: usize,
    /// Reports committed after the main one, including the two in the report week.
    pub reports_after: usize,
    /// Filler access log entries between suspects; `max` is exclusive.
    pub access_chunk: Span,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            archive_branch: "gtpd-archive".to_string(),
            streets: [
                "Pull Request Road",
                "Merge Conflict Avenue",
                "Detached Head Lane",
                "Fast Forward Street",
                "Cherry Pick Court",
                "Upstream Boulevard",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            street_capacity: Span { min: 12, max: 30 },
            reports_before: 84,
            reports_after: 92,
            access_chunk: Span { min: 5, max: 20 },
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.streets.is_empty() {
            return Err(BuildError::Config("at least one street is required".into()));
        }
        let cap = self.street_capacity;
        if cap.min == 0 || cap.min > cap.max {
            return Err(BuildError::Config(format!(
                "street_capacity must satisfy 1 <= min <= max, got {}..={}",
                cap.min, cap.max
            )));
        }
        if self.reports_before < 1 {
            return Err(BuildError::Config("reports_before must be at least 1".into()));
        }
        if self.reports_after < 2 {
            return Err(BuildError::Config("reports_after must be at least 2".into()));
        }
        let chunk = self.access_chunk;
        if chunk.min >= chunk.max {
            return Err(BuildError::Config(format!(
                "access_chunk must satisfy min < max, got {}..{}",
                chunk.min, chunk.max
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for street in &self.streets {
            if !seen.insert(slugify(street)) {
                return Err(BuildError::Config(format!("duplicate street: {}", street)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Suffix identifying the archive branch, so clones' `origin/...` names match.
    pub archive_suffix: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            archive_suffix: "gtpd-archive".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, BuildError> {
        toml::from_str(text).map_err(|e| BuildError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        config.build.validate()?;
        Ok(config)
    }
}

/// Tag-friendly street name: lower-case, spaces replaced by underscores.
pub fn slugify(street: &str) -> String {
    street.to_lowercase().replace(' ', "_")
}
