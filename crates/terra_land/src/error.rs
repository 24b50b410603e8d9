//! # Land Error Types
//!
//! All errors that can occur while addressing, generating or pooling tiles.

use thiserror::Error;

/// Errors from the quadkey codec and tile address validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuadKeyError {
    /// A key character outside `'0'..='3'`.
    #[error("invalid digit {digit:?} at position {position} in quadkey {key:?}")]
    InvalidDigit {
        /// The offending key.
        key: String,
        /// Index of the bad character, most significant level first.
        position: usize,
        /// The bad character.
        digit: char,
    },

    /// Key or zoom deeper than the codec can represent.
    #[error("zoom {zoom} is deeper than the maximum of {max}")]
    TooDeep {
        /// Requested depth.
        zoom: usize,
        /// Deepest supported zoom.
        max: u8,
    },

    /// Tile index does not exist at the given zoom.
    #[error("tile ({x}, {y}) is outside the 2^{zoom} grid")]
    OutOfRange {
        /// Zoom level.
        zoom: u8,
        /// Tile X.
        x: u64,
        /// Tile Y.
        y: u64,
    },
}

/// Errors raised by a noise source while sampling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoiseError {
    /// The sampler produced NaN or infinity.
    #[error("noise sample at ({x}, {y}) is not finite")]
    NonFinite {
        /// World X of the sample.
        x: f64,
        /// World Y of the sample.
        y: f64,
    },

    /// The sampler has no field of this dimension.
    #[error("noise source cannot sample in {dims}D")]
    Unsupported {
        /// Requested dimension.
        dims: u8,
    },

    /// The sampler failed for a source-specific reason.
    #[error("noise source failed: {0}")]
    Source(String),
}

/// Errors that can occur in the land system.
#[derive(Error, Debug)]
pub enum LandError {
    /// Tile requested beyond the land's level of detail.
    #[error("zoom {zoom} exceeds the level of detail {lod}")]
    ZoomExceedsLod {
        /// Requested zoom.
        zoom: u8,
        /// Maximum zoom of the land.
        lod: u8,
    },

    /// Bad tile address or quadkey.
    #[error(transparent)]
    Address(#[from] QuadKeyError),

    /// Noise sampling failed; the tile was left stale.
    #[error("generation failed: {0}")]
    Noise(#[from] NoiseError),

    /// Tile grid dimensions do not match the land's patch size.
    #[error("topo is {actual:?}, land expects {expected:?}")]
    TopoSizeMismatch {
        /// Dimensions the land generates.
        expected: (usize, usize),
        /// Dimensions of the tile's topo.
        actual: (usize, usize),
    },

    /// Every pool slot is in use.
    #[error("tile pool exhausted: capacity {capacity}")]
    PoolExhausted {
        /// Pool capacity.
        capacity: usize,
    },

    /// Handle does not refer to a live pool slot.
    #[error("invalid tile handle {0}")]
    InvalidHandle(usize),

    /// Tile heights are stale and cannot be shared.
    #[error("tile {0:?} has not been generated")]
    TileNotReady(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// File system failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Debug image could not be encoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for quadkey operations.
pub type QuadKeyResult<T> = Result<T, QuadKeyError>;

/// Result type for noise sampling.
pub type NoiseResult<T> = Result<T, NoiseError>;

/// Result type for land operations.
pub type LandResult<T> = Result<T, LandError>;
