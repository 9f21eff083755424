use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RestorationError;

/// Restoration targets a property is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorationTargets {
    /// Minimum native canopy cover, percent.
    pub canopy_cover_pct: f64,
    /// Regenerant density target for active restoration, ind/ha.
    pub density_active: f64,
    /// Regenerant density target for assisted restoration, ind/ha.
    pub density_assisted: f64,
    /// Richness target when the data carries no per-property target.
    pub default_richness: f64,
}

impl Default for RestorationTargets {
    fn default() -> Self {
        Self {
            canopy_cover_pct: 80.0,
            density_active: 1333.0,
            density_assisted: 1500.0,
            default_richness: 30.0,
        }
    }
}

impl RestorationTargets {
    pub fn from_json_str(json: &str) -> Result<Self, RestorationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RestorationError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
