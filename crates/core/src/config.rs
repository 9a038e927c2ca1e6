//! Build configuration (`config.json`).

use std::{collections::HashSet, fs::read_to_string, path::Path};

use hanttf_font_naming::Naming;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// File-name prefix shared by every source and output font.
    pub prefix: String,
    /// Style weights, in build order.
    pub weights: Vec<String>,
    /// Regions carried into the deliverables.
    pub regions: Vec<String>,
    /// Every region that may be embedded in a master collection.
    pub all_regions: Vec<String>,
    pub naming: Naming,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.is_empty() {
            return Err(ConfigError::Invalid("no weights configured".to_string()));
        }
        if self.regions.is_empty() {
            return Err(ConfigError::Invalid("no regions configured".to_string()));
        }
        check_unique("weights", &self.weights)?;
        check_unique("regions", &self.regions)?;
        check_unique("allRegions", &self.all_regions)?;

        let missing: Vec<&str> = self
            .regions
            .iter()
            .filter(|r| !self.all_regions.contains(r))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "regions not listed in allRegions: {}",
                missing.join(", ")
            )));
        }

        let missing_locales = self.naming.missing_locales();
        if !missing_locales.is_empty() {
            let codes: Vec<&str> = missing_locales.iter().map(|l| l.code()).collect();
            return Err(ConfigError::Invalid(format!(
                "naming.familyName lacks locales: {}",
                codes.join(", ")
            )));
        }
        Ok(())
    }

    /// File stem of one regional font: `<prefix><region>-<weight>`.
    pub fn font_stem(&self, region: &str, weight: &str) -> String {
        format!("{}{region}-{weight}", self.prefix)
    }

    /// File stem of one weight's collection: `<prefix>-<weight>`.
    pub fn collection_stem(&self, weight: &str) -> String {
        format!("{}-{weight}", self.prefix)
    }

    pub fn has_weight(&self, weight: &str) -> bool {
        self.weights.iter().any(|w| w == weight)
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }
}

fn check_unique(field: &str, values: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate entry '{value}' in {field}")));
        }
    }
    Ok(())
}
