//! Project-wide defaults, loadable from TOML.
//!
//! ```toml
//! [fit]
//! standoff = 0.8
//! density = { kind = "cells_on_short_side", value = 10 }
//!
//! [location]
//! latitude = 51.5
//! longitude = -0.12
//! utc_offset_hours = 0.0
//! ```
//!
//! Every section and field is optional; missing values take the
//! indoor-environment-quality defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{AnalysisSchedule, SiteLocation};
use crate::color::ColorConfig;
use crate::error::{PersistError, Result};
use crate::fitting::FitParams;

/// Defaults used when an operation is not given explicit parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fit: FitParams,
    pub schedule: AnalysisSchedule,
    pub color: ColorConfig,
    pub location: SiteLocation,
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::TomlDecode`] for malformed TOML, or the
    /// validation error of the first unusable section.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(PersistError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Renders the settings as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::TomlEncode`] if a value cannot be encoded.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self).map_err(PersistError::from)?)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be read, or any
    /// error of [`Settings::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Writes the settings to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_toml_string()?;
        fs::write(path, text).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self) -> Result<()> {
        self.fit.validate()?;
        self.schedule.validate()?;
        self.color.validate()
    }
}
