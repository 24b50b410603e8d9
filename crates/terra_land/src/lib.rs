//! # TERRA Land
//!
//! Quadtree-addressed terrain tiles over one seeded procedural height field.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and address always produce the same heights
//! 2. **Seamless**: Neighbouring tiles at one zoom sample one continuous field
//! 3. **Level of detail**: Deeper zooms are smaller areas with more octaves
//! 4. **Reusable**: Tiles are repurposed in place without reallocating
//!
//! ## Core Components
//!
//! - `quadkey`: `(zoom, x, y)` to `"0123"` paths and back, plus `QuadCode`
//! - `Topo`: fixed-size height grid and the fBm that fills it, flat or on a
//!   cube face
//! - `Tile`: a topo with an address and a Stale/Ready state
//! - `Land`: LOD gate and tile factory for one seed
//! - `TilePool` / `TileCache`: slot reuse and shared ancestor fallback
//! - `Regions`: seeded region ids over a square map
//!
//! ## Example
//!
//! ```rust
//! use terra_land::Land;
//!
//! let land = Land::new(8, 64, 12345).unwrap();
//! let mut tile = land.new_tile(2, 1, 3).unwrap();
//! assert_eq!(tile.key(), "23");
//! assert!(tile.topo().is_some());
//!
//! // Repurpose the same allocation for a neighbour.
//! land.renew(&mut tile, 2, 2, 3).unwrap();
//! assert_eq!(tile.key(), "32");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod config;
pub mod error;
pub mod land;
pub mod noise;
pub mod pool;
pub mod quadkey;
pub mod regions;
pub mod tile;
pub mod topo;

pub use cache::TileCache;
pub use config::LandConfig;
pub use error::{LandError, LandResult, NoiseError, NoiseResult, QuadKeyError, QuadKeyResult};
pub use land::Land;
pub use noise::{LandSeed, NoiseSource, SimplexNoise};
pub use pool::{TileHandle, TilePool};
pub use quadkey::{decode, decode_lossy, encode, QuadCode, TileAddress, MAX_ZOOM};
pub use regions::Regions;
pub use tile::{Tile, TileState};
pub use topo::{CubeFace, FractalParams, Topo};
