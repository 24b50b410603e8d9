//! # Tiles
//!
//! A [`Tile`] binds one [`Topo`] to its quadtree address. Tiles are meant to
//! be reused: when a tile scrolls out of view, [`Tile::set`] points it at a
//! new address without touching the grid allocation, and the owning
//! [`Land`](crate::Land) regenerates the heights later.
//!
//! Until that regeneration finishes the tile is [`TileState::Stale`] and
//! [`Tile::topo`] returns `None`, so old or half-written heights are never
//! handed to a reader.
//!
//! A tile with a [`CubeFace`] holds one face of a cube map instead of a
//! flat patch; the address then indexes tiles within that face.

use image::RgbaImage;

use crate::error::{NoiseResult, QuadKeyResult};
use crate::noise::NoiseSource;
use crate::quadkey::{encode_into, QuadCode, TileAddress, MAX_ZOOM};
use crate::topo::{CubeFace, FractalParams, Topo};

/// Whether a tile's heights belong to its current address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Address changed (or never generated); heights are not valid.
    #[default]
    Stale,
    /// Heights were generated for the current address.
    Ready,
}

/// Height data for one quadtree address.
#[derive(Clone, Debug)]
pub struct Tile {
    topo: Topo,
    address: TileAddress,
    key: String,
    face: Option<CubeFace>,
    state: TileState,
}

impl Tile {
    /// Binds `topo` to `(zoom, x, y)` and computes the quadkey.
    ///
    /// The tile starts stale; hand it to
    /// [`Land::fill`](crate::Land::fill) to generate its heights.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist at `zoom`.
    pub fn new(topo: Topo, zoom: u8, x: u64, y: u64) -> QuadKeyResult<Self> {
        let address = TileAddress::new(zoom, x, y)?;
        Ok(Self {
            topo,
            key: address.key(),
            address,
            face: None,
            state: TileState::Stale,
        })
    }

    /// A stale root tile with a zeroed `width × height` grid.
    #[must_use]
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            topo: Topo::new(width, height),
            address: TileAddress::ROOT,
            key: String::with_capacity(usize::from(MAX_ZOOM)),
            face: None,
            state: TileState::Stale,
        }
    }

    /// Repurposes the tile for a new address.
    ///
    /// Overwrites zoom, x, y and the key, and marks the heights stale. The
    /// grid is not regenerated here. On error the tile is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist at `zoom`.
    pub fn set(&mut self, zoom: u8, x: u64, y: u64) -> QuadKeyResult<&mut Self> {
        self.address = TileAddress::new(zoom, x, y)?;
        encode_into(&mut self.key, zoom, x, y);
        self.state = TileState::Stale;
        Ok(self)
    }

    /// Switches between a flat patch (`None`) and a cube-map face.
    ///
    /// Keeps the address and marks the heights stale.
    pub fn set_face(&mut self, face: Option<CubeFace>) -> &mut Self {
        self.face = face;
        self.state = TileState::Stale;
        self
    }

    /// Cube-map face, `None` for a flat patch.
    #[inline]
    #[must_use]
    pub const fn face(&self) -> Option<CubeFace> {
        self.face
    }

    /// Height data, or `None` while the tile is stale.
    #[inline]
    #[must_use]
    pub fn topo(&self) -> Option<&Topo> {
        match self.state {
            TileState::Ready => Some(&self.topo),
            TileState::Stale => None,
        }
    }

    /// Grid dimensions, valid in either state.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (usize, usize) {
        self.topo.size()
    }

    /// Zoom (level of detail) for this tile.
    #[inline]
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.address.zoom
    }

    /// Tile X, Y index within the land at this zoom.
    #[inline]
    #[must_use]
    pub const fn xy(&self) -> (u64, u64) {
        (self.address.x, self.address.y)
    }

    /// Quadkey for the current address.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current address.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> TileAddress {
        self.address
    }

    /// Packed quadkey for the current address.
    #[inline]
    #[must_use]
    pub fn code(&self) -> QuadCode {
        self.address.code()
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> TileState {
        self.state
    }

    /// True once heights match the current address.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == TileState::Ready
    }

    /// Debug image of the heights, `None` while stale.
    #[must_use]
    pub fn image(&self, land_split: f64) -> Option<RgbaImage> {
        self.topo().map(|topo| topo.image(land_split))
    }

    /// Regenerates heights for the current address.
    ///
    /// The tile is stale for the whole call and only becomes ready once
    /// every cell is written.
    pub(crate) fn regenerate<N: NoiseSource + ?Sized>(
        &mut self,
        noise: &N,
        params: &FractalParams,
    ) -> NoiseResult<()> {
        self.state = TileState::Stale;
        let TileAddress { zoom, x, y } = self.address;
        match self.face {
            None => self.topo.generate(zoom, x, y, noise, params)?,
            Some(face) => self.topo.generate_face(face, zoom, x, y, noise, params)?,
        }
        self.state = TileState::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{LandSeed, SimplexNoise};

    #[test]
    fn test_new_tile_key() {
        let tile = Tile::new(Topo::new(4, 4), 8, 255, 15).unwrap();
        assert_eq!(tile.key(), "11113333");
        assert_eq!(tile.zoom(), 8);
        assert_eq!(tile.xy(), (255, 15));
        assert!(tile.topo().is_none(), "unfilled tile must not expose heights");
    }

    #[test]
    fn test_new_tile_rejects_bad_address() {
        assert!(Tile::new(Topo::new(4, 4), 1, 2, 0).is_err());
    }

    #[test]
    fn test_set_chains_and_marks_stale() {
        let noise = SimplexNoise::new(LandSeed::new(5));
        let params = FractalParams::default();
        let mut tile = Tile::new(Topo::new(8, 8), 1, 0, 0).unwrap();
        tile.regenerate(&noise, &params).unwrap();
        assert!(tile.is_ready());

        let key = tile.set(3, 7, 7).unwrap().key().to_owned();
        assert_eq!(key, "333");
        assert_eq!(tile.state(), TileState::Stale);
        assert!(tile.topo().is_none());
        assert_eq!(tile.size(), (8, 8));
    }

    #[test]
    fn test_failed_set_leaves_tile_unchanged() {
        let mut tile = Tile::new(Topo::new(2, 2), 2, 1, 3).unwrap();
        assert!(tile.set(2, 4, 0).is_err());
        assert_eq!(tile.key(), "23");
        assert_eq!(tile.address(), TileAddress::new(2, 1, 3).unwrap());
    }

    #[test]
    fn test_set_face_marks_stale() {
        let noise = SimplexNoise::new(LandSeed::new(5));
        let params = FractalParams::default();
        let mut tile = Tile::new(Topo::new(8, 8), 1, 1, 0).unwrap();
        tile.regenerate(&noise, &params).unwrap();
        let flat = tile.topo().unwrap().clone();

        tile.set_face(Some(CubeFace::ZPos));
        assert_eq!(tile.face(), Some(CubeFace::ZPos));
        assert!(tile.topo().is_none());
        assert_eq!(tile.key(), "1");

        tile.regenerate(&noise, &params).unwrap();
        assert_ne!(tile.topo().unwrap(), &flat);

        // Repurposing keeps the face.
        tile.set(1, 0, 0).unwrap();
        assert_eq!(tile.face(), Some(CubeFace::ZPos));
    }

    #[test]
    fn test_blank_tile() {
        let tile = Tile::blank(16, 16);
        assert_eq!(tile.key(), "");
        assert_eq!(tile.code(), QuadCode::ROOT);
        assert!(tile.image(0.0).is_none());
    }
}
