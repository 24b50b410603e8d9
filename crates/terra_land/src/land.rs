//! # Land
//!
//! A [`Land`] is one seeded height field. It fixes:
//!
//! - `lod`: the deepest zoom it will generate, bounding per-tile cost
//!   (octaves grow with zoom)
//! - `patch_size`: every tile is a `patch_size × patch_size` grid
//! - the noise source all its tiles sample
//!
//! Overall land width grows with zoom (`patch_size * 2^zoom`):
//!
//! ```text
//!   zoom  0 :  256*2^0  = 256m
//!   zoom  2 :  256*2^2  = 1024     ~1km2
//!   zoom  5 :  256*2^5  = 8192     ~64km2 medium city
//!   zoom 12 :  256*2^12 = 1048576  ~1,000,000km2
//!   zoom 17 :  256*2^17 = 33554432 ~earth
//! ```
//!
//! A land can also fill the six faces of a cube map from its 3D field
//! ([`Land::fill_face`]); faces meet along shared cube edges.
//!
//! Lands are independent: a terrain field and a texture-blend field are
//! two lands with different seeds sampled at the same tile addresses.
//!
//! ## Threading
//!
//! `Land` is `Sync`. Distinct tiles can be filled from different threads
//! at once; [`Land::fill_batch`] does exactly that.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::LandConfig;
use crate::error::{LandError, LandResult};
use crate::noise::{LandSeed, NoiseSource, SimplexNoise};
use crate::quadkey::MAX_ZOOM;
use crate::tile::Tile;
use crate::topo::{CubeFace, FractalParams, Topo};

/// Factory and level-of-detail gate for the tiles of one height field.
pub struct Land<N: NoiseSource = SimplexNoise> {
    lod: u8,
    patch_size: usize,
    seed: LandSeed,
    params: FractalParams,
    noise: N,
}

impl Land<SimplexNoise> {
    /// Creates a land backed by [`SimplexNoise`] seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] if `lod > MAX_ZOOM` or
    /// `patch_size == 0`.
    pub fn new(lod: u8, patch_size: usize, seed: i64) -> LandResult<Self> {
        let seed = LandSeed::new(seed);
        Self::with_noise(lod, patch_size, seed, SimplexNoise::new(seed))
    }

    /// Creates a land from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn from_config(config: &LandConfig) -> LandResult<Self> {
        config.validate()?;
        Self::new(config.lod, config.patch_size, config.seed.value())?.with_params(config.fractal)
    }
}

impl<N: NoiseSource> Land<N> {
    /// Creates a land over an injected noise source.
    ///
    /// `seed` is the seed `noise` was built from; it is kept so callers can
    /// recreate the land elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] if `lod > MAX_ZOOM` or
    /// `patch_size == 0`.
    pub fn with_noise(lod: u8, patch_size: usize, seed: LandSeed, noise: N) -> LandResult<Self> {
        if lod > MAX_ZOOM {
            return Err(LandError::InvalidConfig(format!("lod {lod} exceeds {MAX_ZOOM}")));
        }
        if patch_size == 0 {
            return Err(LandError::InvalidConfig("patch_size must be positive".into()));
        }
        info!(lod, patch_size, seed = seed.value(), "land created");
        Ok(Self {
            lod,
            patch_size,
            seed,
            params: FractalParams::default(),
            noise,
        })
    }

    /// Replaces the fBm parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] if `params` fail
    /// [`FractalParams::validate`].
    pub fn with_params(mut self, params: FractalParams) -> LandResult<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    /// Deepest zoom this land generates.
    #[inline]
    #[must_use]
    pub const fn lod(&self) -> u8 {
        self.lod
    }

    /// Seed of this land's height field.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> LandSeed {
        self.seed
    }

    /// Tile width and height in grid cells.
    #[inline]
    #[must_use]
    pub const fn tile_size(&self) -> usize {
        self.patch_size
    }

    /// Land width and height in grid cells at `zoom`.
    #[inline]
    #[must_use]
    pub fn size(&self, zoom: u8) -> u128 {
        (self.patch_size as u128) << u32::from(zoom.min(MAX_ZOOM))
    }

    /// fBm parameters.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &FractalParams {
        &self.params
    }

    /// The injected noise source.
    #[inline]
    #[must_use]
    pub const fn noise(&self) -> &N {
        &self.noise
    }

    /// Rejects zooms deeper than the level of detail.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::ZoomExceedsLod`] if `zoom > lod`.
    #[inline]
    pub fn check_zoom(&self, zoom: u8) -> LandResult<()> {
        if zoom > self.lod {
            Err(LandError::ZoomExceedsLod { zoom, lod: self.lod })
        } else {
            Ok(())
        }
    }

    /// Allocates and generates the tile at `(zoom, x, y)`.
    ///
    /// # Errors
    ///
    /// Returns error if `zoom > lod`, the address does not exist, or noise
    /// sampling fails.
    pub fn new_tile(&self, zoom: u8, x: u64, y: u64) -> LandResult<Tile> {
        self.check_zoom(zoom)?;
        let mut tile = Tile::new(Topo::new(self.patch_size, self.patch_size), zoom, x, y)?;
        self.fill(&mut tile)?;
        Ok(tile)
    }

    /// (Re)generates a tile's heights for its current address.
    ///
    /// Used after [`Tile::set`] to complete a repurpose. On error the tile
    /// stays stale and its heights are not exposed.
    ///
    /// # Errors
    ///
    /// Returns error if the tile grid is not `patch_size` square, its zoom
    /// exceeds `lod`, or noise sampling fails.
    pub fn fill(&self, tile: &mut Tile) -> LandResult<()> {
        let expected = (self.patch_size, self.patch_size);
        if tile.size() != expected {
            return Err(LandError::TopoSizeMismatch {
                expected,
                actual: tile.size(),
            });
        }
        if let Err(err) = self.check_zoom(tile.zoom()) {
            warn!(key = tile.key(), lod = self.lod, "tile deeper than level of detail");
            return Err(err);
        }
        tile.regenerate(&self.noise, &self.params).map_err(|err| {
            warn!(key = tile.key(), %err, "tile generation failed");
            LandError::from(err)
        })?;
        debug!(key = tile.key(), zoom = tile.zoom(), "tile generated");
        Ok(())
    }

    /// Repurposes `tile` for `(zoom, x, y)` and regenerates it.
    ///
    /// # Errors
    ///
    /// Same as [`Tile::set`] followed by [`Land::fill`].
    pub fn renew(&self, tile: &mut Tile, zoom: u8, x: u64, y: u64) -> LandResult<()> {
        self.check_zoom(zoom)?;
        tile.set(zoom, x, y)?;
        self.fill(tile)
    }

    /// Allocates and generates tile `(zoom, x, y)` of one cube-map face.
    ///
    /// # Errors
    ///
    /// Same as [`Land::new_tile`], plus
    /// [`NoiseError::Unsupported`](crate::NoiseError::Unsupported) if the
    /// noise source has no 3D field.
    pub fn new_face_tile(&self, face: CubeFace, zoom: u8, x: u64, y: u64) -> LandResult<Tile> {
        self.check_zoom(zoom)?;
        let mut tile = Tile::new(Topo::new(self.patch_size, self.patch_size), zoom, x, y)?;
        self.fill_face(&mut tile, face)?;
        Ok(tile)
    }

    /// Points `tile` at cube-map `face` and regenerates it from the 3D
    /// field at its current address.
    ///
    /// # Errors
    ///
    /// Same as [`Land::fill`].
    pub fn fill_face(&self, tile: &mut Tile, face: CubeFace) -> LandResult<()> {
        tile.set_face(Some(face));
        self.fill(tile)
    }

    /// Fills many tiles in parallel.
    ///
    /// Results line up with `tiles`; a failure only affects its own tile.
    pub fn fill_batch(&self, tiles: &mut [Tile]) -> Vec<LandResult<()>> {
        tiles.par_iter_mut().map(|tile| self.fill(tile)).collect()
    }

    /// Number of noise evaluations needed to fill one tile at `zoom`,
    /// saturating at `u64::MAX`.
    ///
    /// Grows with zoom; the measure `lod` bounds.
    #[must_use]
    pub fn samples_per_tile(&self, zoom: u8) -> u64 {
        let cells = self.patch_size as u64;
        cells
            .saturating_mul(cells)
            .saturating_mul(u64::from(self.params.octaves(zoom)))
    }
}

impl<N: NoiseSource> std::fmt::Debug for Land<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Land")
            .field("lod", &self.lod)
            .field("patch_size", &self.patch_size)
            .field("seed", &self.seed)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NoiseError, NoiseResult};

    /// Fails for any sample right of `x_limit` in world space.
    struct Cliff {
        x_limit: f64,
    }

    impl NoiseSource for Cliff {
        fn try_sample(&self, x: f64, _y: f64) -> NoiseResult<f64> {
            if x > self.x_limit {
                Err(NoiseError::Source("off the edge".into()))
            } else {
                Ok(0.25)
            }
        }
    }

    #[test]
    fn test_zoom_limit() {
        let land = Land::new(9, 256, 12345).unwrap();
        assert_eq!(land.lod(), 9);
        assert_eq!(land.tile_size(), 256);
    }

    #[test]
    fn test_rejects_invalid_construction() {
        assert!(Land::new(65, 256, 1).is_err());
        assert!(Land::new(4, 0, 1).is_err());
    }

    #[test]
    fn test_new_tile_beyond_lod_is_rejected() {
        let land = Land::new(2, 8, 1).unwrap();
        assert!(matches!(
            land.new_tile(3, 0, 0),
            Err(LandError::ZoomExceedsLod { zoom: 3, lod: 2 })
        ));
        assert!(land.new_tile(2, 3, 3).is_ok());
    }

    #[test]
    fn test_new_tile_out_of_range() {
        let land = Land::new(4, 8, 1).unwrap();
        assert!(matches!(land.new_tile(1, 2, 0), Err(LandError::Address(_))));
    }

    #[test]
    fn test_land_size() {
        let land = Land::new(17, 256, 1).unwrap();
        assert_eq!(land.size(0), 256);
        assert_eq!(land.size(5), 8192);
        assert_eq!(land.size(17), 33_554_432);
    }

    #[test]
    fn test_fill_rejects_wrong_grid() {
        let land = Land::new(4, 8, 1).unwrap();
        let mut tile = Tile::new(Topo::new(4, 4), 1, 0, 0).unwrap();
        assert!(matches!(
            land.fill(&mut tile),
            Err(LandError::TopoSizeMismatch { expected: (8, 8), actual: (4, 4) })
        ));
        assert!(!tile.is_ready());
    }

    #[test]
    fn test_fill_rejects_tile_beyond_lod() {
        let land = Land::new(1, 4, 1).unwrap();
        let mut tile = Tile::blank(4, 4);
        tile.set(5, 0, 0).unwrap();
        assert!(land.fill(&mut tile).is_err());
        assert!(tile.topo().is_none());
    }

    #[test]
    fn test_noise_failure_is_per_tile() {
        // One octave: tile (0, 0) samples x in [0, 0.75], tile (1, 0) x in [1, 1.75].
        let land = Land::with_noise(1, 4, LandSeed::new(0), Cliff { x_limit: 0.9 })
            .unwrap()
            .with_params(FractalParams {
                base_octaves: 1,
                octaves_per_zoom: 0,
                ..FractalParams::default()
            })
            .unwrap();
        let mut tiles = vec![
            Tile::new(Topo::new(4, 4), 1, 0, 0).unwrap(),
            Tile::new(Topo::new(4, 4), 1, 1, 0).unwrap(),
        ];
        let results = land.fill_batch(&mut tiles);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(LandError::Noise(_))));
        assert!(tiles[0].is_ready());
        assert!(tiles[1].topo().is_none());
    }

    #[test]
    fn test_renew() {
        let land = Land::new(4, 8, 77).unwrap();
        let mut tile = land.new_tile(1, 0, 0).unwrap();
        land.renew(&mut tile, 3, 5, 6).unwrap();
        assert!(tile.is_ready());
        assert_eq!(tile.key(), land.new_tile(3, 5, 6).unwrap().key());
        assert!(land.renew(&mut tile, 5, 0, 0).is_err());
        assert!(tile.is_ready(), "rejected renew must not touch the tile");
    }

    #[test]
    fn test_samples_grow_with_zoom() {
        let land = Land::new(17, 256, 1).unwrap();
        let mut last = 0;
        for zoom in 0..=17 {
            let samples = land.samples_per_tile(zoom);
            assert!(samples > last);
            last = samples;
        }
    }

    #[test]
    fn test_with_params_validates() {
        let land = Land::new(4, 8, 1).unwrap();
        let nan = FractalParams {
            lacunarity: f64::NAN,
            ..FractalParams::default()
        };
        assert!(matches!(land.with_params(nan), Err(LandError::InvalidConfig(_))));

        let runaway = FractalParams {
            octaves_per_zoom: 100_000_000,
            ..FractalParams::default()
        };
        let land = Land::new(64, 1, 1).unwrap();
        assert!(land.with_params(runaway).is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_samples_per_tile_saturates() {
        let land = Land::new(2, 1 << 40, 1).unwrap();
        assert_eq!(land.samples_per_tile(0), u64::MAX);
        assert_eq!(land.samples_per_tile(2), u64::MAX);
    }

    #[test]
    fn test_face_tiles() {
        let land = Land::new(3, 8, 19).unwrap();
        let face = land.new_face_tile(CubeFace::YPos, 1, 1, 0).unwrap();
        assert_eq!(face.face(), Some(CubeFace::YPos));
        assert!(face.is_ready());
        let flat = land.new_tile(1, 1, 0).unwrap();
        assert_ne!(face.topo(), flat.topo());

        let mut tile = flat;
        land.fill_face(&mut tile, CubeFace::YPos).unwrap();
        assert_eq!(tile.topo(), face.topo());
        assert!(land.new_face_tile(CubeFace::XNeg, 4, 0, 0).is_err());
    }

    #[test]
    fn test_face_needs_3d_source() {
        let land = Land::with_noise(1, 4, LandSeed::new(0), Cliff { x_limit: f64::MAX }).unwrap();
        assert!(matches!(
            land.new_face_tile(CubeFace::XPos, 0, 0, 0),
            Err(LandError::Noise(NoiseError::Unsupported { dims: 3 }))
        ));
        assert!(land.new_tile(0, 0, 0).is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = LandConfig::from_toml_str("lod = 3\npatch_size = 16\nseed = 5").unwrap();
        let land = Land::from_config(&config).unwrap();
        assert_eq!(land.lod(), 3);
        assert_eq!(land.tile_size(), 16);
        assert_eq!(land.seed(), LandSeed::new(5));
    }
}
