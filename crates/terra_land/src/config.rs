//! # Land Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! lod = 9
//! patch_size = 256
//! seed = 12345
//!
//! [fractal]
//! frequency = 2.0
//! gain = 0.55
//! base_octaves = 6
//! octaves_per_zoom = 1
//! lacunarity = 2.0
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LandError, LandResult};
use crate::noise::LandSeed;
use crate::quadkey::MAX_ZOOM;
use crate::topo::FractalParams;

/// Settings for one [`Land`](crate::Land).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LandConfig {
    /// Maximum zoom the land will generate.
    pub lod: u8,
    /// Tile grid width and height.
    pub patch_size: usize,
    /// Height field seed.
    pub seed: LandSeed,
    /// fBm shaping.
    pub fractal: FractalParams,
}

impl Default for LandConfig {
    fn default() -> Self {
        Self {
            lod: 8,
            patch_size: 256,
            seed: LandSeed::default(),
            fractal: FractalParams::default(),
        }
    }
}

impl LandConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns error on malformed TOML or out-of-range values.
    pub fn from_toml_str(text: &str) -> LandResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or fails validation.
    pub fn from_toml_file(path: &Path) -> LandResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> LandResult<()> {
        if self.lod > MAX_ZOOM {
            return Err(LandError::InvalidConfig(format!(
                "lod {} exceeds {MAX_ZOOM}",
                self.lod
            )));
        }
        if self.patch_size == 0 {
            return Err(LandError::InvalidConfig("patch_size must be positive".into()));
        }
        self.fractal.validate()
    }
}
