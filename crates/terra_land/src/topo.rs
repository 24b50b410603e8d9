//! # Topo Height Grids
//!
//! A [`Topo`] is the height data for one tile: a fixed `width × height`
//! grid of `f64` samples, conventionally in `[-1, 1]`.
//!
//! ## Generation
//!
//! Heights are fractional Brownian motion over simplex noise. Each extra
//! zoom level halves the tile footprint and adds octaves, so:
//!
//! ```text
//!   zoom 0 :     1 tile
//!   zoom 1 :     4 tiles indexed 0,0 to 1,1
//!   zoom 2 :    16 tiles indexed 0,0 to 3,3
//!   zoom 8 : 65536 tiles indexed 0,0 to 255,255
//! ```
//!
//! A tile at `(zoom, tx, ty)` samples world coordinates
//! `((x + tx·w) · f, (y + ty·h) · f) / 2^zoom` with `f = frequency / w`.
//! Neighbouring tiles therefore sample contiguous regions of one field and
//! stitch without seams.
//!
//! ## Cube Faces
//!
//! [`Topo::generate_face`] fills one face of a six-face cube map from 3D
//! noise instead. The cube is `w · 2^zoom` cells on a side and every face
//! samples points on its surface, so faces sharing a cube edge carry the
//! same heights along it.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{LandError, LandResult, NoiseResult};
use crate::quadkey::MAX_ZOOM;
use crate::noise::NoiseSource;

/// Fractal (fBm) shaping parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalParams {
    /// Overall feature size: root-tile widths per noise period.
    pub frequency: f64,
    /// Amplitude of the first octave, and decay per octave.
    pub gain: f64,
    /// Octaves at zoom 0.
    pub base_octaves: u32,
    /// Octaves added per zoom level.
    pub octaves_per_zoom: u32,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
}

impl FractalParams {
    /// Most octaves any tile may sum, reached at [`MAX_ZOOM`].
    pub const MAX_OCTAVES: u32 = 1024;

    /// Octaves summed for a tile at `zoom`, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn octaves(&self, zoom: u8) -> u32 {
        self.base_octaves
            .saturating_add(self.octaves_per_zoom.saturating_mul(zoom as u32))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> LandResult<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(LandError::InvalidConfig(format!(
                "fractal.frequency {} must be positive",
                self.frequency
            )));
        }
        if !(self.gain > 0.0 && self.gain < 1.0) {
            return Err(LandError::InvalidConfig(format!(
                "fractal.gain {} must be in (0, 1)",
                self.gain
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 1.0) {
            return Err(LandError::InvalidConfig(format!(
                "fractal.lacunarity {} must be greater than 1",
                self.lacunarity
            )));
        }
        if self.base_octaves == 0 {
            return Err(LandError::InvalidConfig("fractal.base_octaves must be positive".into()));
        }
        let deepest = self
            .octaves_per_zoom
            .checked_mul(u32::from(MAX_ZOOM))
            .and_then(|extra| extra.checked_add(self.base_octaves))
            .filter(|&total| total <= Self::MAX_OCTAVES);
        if deepest.is_none() {
            return Err(LandError::InvalidConfig(format!(
                "fractal octaves at zoom {MAX_ZOOM} exceed {}",
                Self::MAX_OCTAVES
            )));
        }
        Ok(())
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            gain: 0.55,
            base_octaves: 6,
            octaves_per_zoom: 1,
            lacunarity: 2.0,
        }
    }
}

/// One side of a cube map.
///
/// Grid axes per face, as `(column, row)`: X faces use `(y, z)`, Y faces
/// use `(x, z)` and Z faces use `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// Right side, `x` at its maximum.
    XPos,
    /// Left side, `x = 0`.
    XNeg,
    /// Top, `y` at its maximum.
    YPos,
    /// Bottom, `y = 0`.
    YNeg,
    /// Back, `z` at its maximum.
    ZPos,
    /// Front, `z = 0`.
    ZNeg,
}

impl CubeFace {
    /// Every face.
    pub const ALL: [Self; 6] = [
        Self::XPos,
        Self::XNeg,
        Self::YPos,
        Self::YNeg,
        Self::ZPos,
        Self::ZNeg,
    ];

    /// Cube point for face-grid position `(u, v)` on a cube whose last
    /// cell index is `far`.
    #[inline]
    fn point(self, u: f64, v: f64, far: f64) -> [f64; 3] {
        match self {
            Self::XPos => [far, u, v],
            Self::XNeg => [0.0, u, v],
            Self::YPos => [u, far, v],
            Self::YNeg => [u, 0.0, v],
            Self::ZPos => [u, v, far],
            Self::ZNeg => [u, v, 0.0],
        }
    }
}

/// Height data for one tile.
///
/// Stored row-major: cell `(x, y)` lives at `y * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct Topo {
    width: usize,
    height: usize,
    heights: Vec<f64>,
}

impl Topo {
    /// Allocates a zeroed grid. Dimensions never change afterwards.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            heights: vec![0.0; width * height],
        }
    }

    /// Width and height of the grid.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Height at `(x, y)`, or `None` outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.heights[y * self.width + x])
        } else {
            None
        }
    }

    /// One row of heights (fixed `y`).
    #[must_use]
    pub fn row(&self, y: usize) -> Option<&[f64]> {
        if y < self.height {
            let start = y * self.width;
            Some(&self.heights[start..start + self.width])
        } else {
            None
        }
    }

    /// All heights, row-major.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.heights
    }

    /// All heights as raw native-endian bytes, for hashing or export.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.heights)
    }

    /// Smallest and largest height, or `None` for an empty grid.
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.heights.iter().fold(None, |acc, &h| match acc {
            None => Some((h, h)),
            Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
        })
    }

    /// Fills every cell for the tile at `(zoom, tx, ty)`.
    ///
    /// Same inputs always produce bit-identical grids. On error the grid
    /// is zeroed so no partial tile is observable.
    ///
    /// # Errors
    ///
    /// Propagates the first noise sampling failure.
    pub fn generate<N: NoiseSource + ?Sized>(
        &mut self,
        zoom: u8,
        tx: u64,
        ty: u64,
        noise: &N,
        params: &FractalParams,
    ) -> NoiseResult<()> {
        if let Err(err) = self.fill(zoom, tx, ty, noise, params) {
            self.heights.fill(0.0);
            return Err(err);
        }
        trace!(zoom, tx, ty, width = self.width, height = self.height, "topo generated");
        Ok(())
    }

    /// Fills every cell for tile `(zoom, tx, ty)` of one cube-map face.
    ///
    /// Same zeroing-on-error behaviour as [`Topo::generate`].
    ///
    /// # Errors
    ///
    /// Propagates the first noise sampling failure, including
    /// [`NoiseError::Unsupported`](crate::NoiseError::Unsupported) from
    /// 2D-only sources.
    pub fn generate_face<N: NoiseSource + ?Sized>(
        &mut self,
        face: CubeFace,
        zoom: u8,
        tx: u64,
        ty: u64,
        noise: &N,
        params: &FractalParams,
    ) -> NoiseResult<()> {
        if let Err(err) = self.fill_face(face, zoom, tx, ty, noise, params) {
            self.heights.fill(0.0);
            return Err(err);
        }
        trace!(?face, zoom, tx, ty, "cube face generated");
        Ok(())
    }

    fn fill_face<N: NoiseSource + ?Sized>(
        &mut self,
        face: CubeFace,
        zoom: u8,
        tx: u64,
        ty: u64,
        noise: &N,
        params: &FractalParams,
    ) -> NoiseResult<()> {
        if self.width == 0 {
            return Ok(());
        }
        let octaves = params.octaves(zoom);
        let zexp = 0.5f64.powi(i32::from(zoom) + 1);
        let size = self.width as f64;
        let far = 2.0f64.powi(i32::from(zoom)) * size - 1.0;
        let ou = tx as f64 * size;
        let ov = ty as f64 * self.height as f64;

        for v in 0..self.height {
            let row = &mut self.heights[v * self.width..(v + 1) * self.width];
            for (u, cell) in row.iter_mut().enumerate() {
                let [px, py, pz] = face.point(u as f64 + ou, v as f64 + ov, far);
                let mut total = 0.0;
                let mut nfreq = params.frequency / size;
                let mut amplitude = params.gain;
                for _ in 0..octaves {
                    let scale = nfreq * zexp;
                    total += noise.try_sample_3d(px * scale, py * scale, pz * scale)? * amplitude;
                    nfreq *= params.lacunarity;
                    amplitude *= params.gain;
                }
                *cell = total;
            }
        }
        Ok(())
    }

    fn fill<N: NoiseSource + ?Sized>(
        &mut self,
        zoom: u8,
        tx: u64,
        ty: u64,
        noise: &N,
        params: &FractalParams,
    ) -> NoiseResult<()> {
        if self.width == 0 {
            return Ok(());
        }
        let octaves = params.octaves(zoom);
        let zexp = 0.5f64.powi(i32::from(zoom));
        let size = self.width as f64;
        let ox = tx as f64 * size;
        let oy = ty as f64 * self.height as f64;

        for y in 0..self.height {
            let row = &mut self.heights[y * self.width..(y + 1) * self.width];
            for (x, cell) in row.iter_mut().enumerate() {
                let mut total = 0.0;
                let mut nfreq = params.frequency / size;
                let mut amplitude = params.gain;
                for _ in 0..octaves {
                    let xval = (x as f64 + ox) * nfreq;
                    let yval = (y as f64 + oy) * nfreq;
                    total += noise.try_sample(xval * zexp, yval * zexp)? * amplitude;
                    nfreq *= params.lacunarity;
                    amplitude *= params.gain;
                }
                *cell = total;
            }
        }
        Ok(())
    }

    /// Debug colour for a height: green land above `land_split`, blue
    /// water below that lightens towards the shore, white exactly at it.
    #[must_use]
    pub fn paint(height: f64, land_split: f64) -> Rgba<u8> {
        if height > land_split {
            Rgba([0, 255, 0, 255])
        } else if height < land_split {
            let h = 255.0 + height * 255.0;
            let f = height.exp();
            Rgba([(h * f * 0.5) as u8, (h * f) as u8, 255, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    }

    /// Renders the grid with [`Topo::paint`]; `(0, 0)` is the top-left pixel.
    #[must_use]
    pub fn image(&self, land_split: f64) -> RgbaImage {
        let mut img = RgbaImage::new(self.width as u32, self.height as u32);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Self::paint(self.heights[y as usize * self.width + x as usize], land_split);
        }
        img
    }

    /// Writes [`Topo::image`] as a PNG.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_png(&self, path: &Path, land_split: f64) -> LandResult<()> {
        self.image(land_split).save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoiseError;
    use crate::noise::{LandSeed, SimplexNoise};

    struct Failing;

    impl NoiseSource for Failing {
        fn try_sample(&self, _x: f64, _y: f64) -> NoiseResult<f64> {
            Err(NoiseError::Source("offline".to_owned()))
        }
    }

    #[test]
    fn test_topo_size() {
        for (w, h) in [(1, 1), (256, 128), (1, 64), (64, 1), (3, 17), (256, 256)] {
            let topo = Topo::new(w, h);
            assert_eq!(topo.size(), (w, h));
            assert_eq!(topo.as_slice().len(), w * h);
            assert!(topo.as_slice().iter().all(|&v| v == 0.0));
            assert!(topo.get(w - 1, h - 1).is_some());
            assert!(topo.get(w, 0).is_none());
            assert!(topo.get(0, h).is_none());
            assert_eq!(topo.row(h - 1).map(<[f64]>::len), Some(w));
        }
    }

    #[test]
    fn test_generated_shapes_keep_size() {
        let noise = SimplexNoise::new(LandSeed::new(8));
        for (w, h) in [(1, 1), (1, 9), (9, 1), (5, 3)] {
            let mut topo = Topo::new(w, h);
            topo.generate(2, 1, 1, &noise, &FractalParams::default()).unwrap();
            assert_eq!(topo.size(), (w, h));
            assert!(topo.as_slice().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_octaves_saturate() {
        let params = FractalParams {
            base_octaves: u32::MAX - 1,
            octaves_per_zoom: u32::MAX,
            ..FractalParams::default()
        };
        assert_eq!(params.octaves(0), u32::MAX - 1);
        assert_eq!(params.octaves(64), u32::MAX);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_octave_ceiling() {
        let at_limit = FractalParams {
            base_octaves: 64,
            octaves_per_zoom: 15,
            ..FractalParams::default()
        };
        assert_eq!(at_limit.octaves(MAX_ZOOM), FractalParams::MAX_OCTAVES);
        assert!(at_limit.validate().is_ok());

        let over = FractalParams {
            base_octaves: 65,
            ..at_limit
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_face_generation_fails_on_2d_source() {
        let mut topo = Topo::new(4, 4);
        let err = topo
            .generate_face(CubeFace::XPos, 0, 0, 0, &Failing, &FractalParams::default())
            .unwrap_err();
        assert_eq!(err, NoiseError::Unsupported { dims: 3 });
        assert!(topo.as_slice().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_face_edges_match() {
        let noise = SimplexNoise::new(LandSeed::new(61));
        let params = FractalParams::default();
        let n = 16;
        let face = |f: CubeFace| {
            let mut topo = Topo::new(n, n);
            topo.generate_face(f, 0, 0, 0, &noise, &params).unwrap();
            topo
        };
        let (xneg, xpos) = (face(CubeFace::XNeg), face(CubeFace::XPos));
        let (yneg, ypos) = (face(CubeFace::YNeg), face(CubeFace::YPos));
        let (zneg, zpos) = (face(CubeFace::ZNeg), face(CubeFace::ZPos));
        let same = |a: Option<f64>, b: Option<f64>| a.map(f64::to_bits) == b.map(f64::to_bits);

        for k in 0..n {
            // x = 0, y = 0 edge
            assert!(same(xneg.get(0, k), yneg.get(0, k)));
            // x = max, y = max edge
            assert!(same(xpos.get(n - 1, k), ypos.get(n - 1, k)));
            // y = 0, z = 0 edge
            assert!(same(yneg.get(k, 0), zneg.get(k, 0)));
            // x = 0, z = 0 edge, axes swap between faces
            assert!(same(xneg.get(k, 0), zneg.get(0, k)));
            // y = max, z = max edge
            assert!(same(ypos.get(k, n - 1), zpos.get(k, n - 1)));
        }
        assert_ne!(xneg, xpos);
    }

    #[test]
    fn test_get_and_row_bounds() {
        let topo = Topo::new(4, 3);
        assert_eq!(topo.get(3, 2), Some(0.0));
        assert_eq!(topo.get(4, 0), None);
        assert_eq!(topo.row(2).map(<[f64]>::len), Some(4));
        assert!(topo.row(3).is_none());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let params = FractalParams::default();
        let mut a = Topo::new(32, 32);
        let mut b = Topo::new(32, 32);
        a.generate(3, 5, 2, &SimplexNoise::new(LandSeed::new(123)), &params)
            .unwrap();
        b.generate(3, 5, 2, &SimplexNoise::new(LandSeed::new(123)), &params)
            .unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert!(a.min_max().is_some_and(|(lo, hi)| lo < hi));
    }

    #[test]
    fn test_failed_generation_is_zeroed() {
        let params = FractalParams::default();
        let noise = SimplexNoise::new(LandSeed::new(1));
        let mut topo = Topo::new(8, 8);
        topo.generate(0, 0, 0, &noise, &params).unwrap();

        let err = topo.generate(0, 0, 0, &Failing, &params).unwrap_err();
        assert_eq!(err, NoiseError::Source("offline".to_owned()));
        assert!(topo.as_slice().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_octaves_grow_with_zoom() {
        let params = FractalParams::default();
        assert_eq!(params.octaves(0), 6);
        assert_eq!(params.octaves(8), 14);
    }

    #[test]
    fn test_paint() {
        assert_eq!(Topo::paint(0.5, 0.25), Rgba([0, 255, 0, 255]));
        assert_eq!(Topo::paint(0.25, 0.25), Rgba([255, 255, 255, 255]));
        let deep = Topo::paint(-1.0, 0.25);
        let shallow = Topo::paint(-0.1, 0.25);
        assert_eq!(deep, Rgba([0, 0, 255, 255]));
        assert!(shallow[1] > deep[1], "shallow water should be lighter");
    }

    #[test]
    fn test_image_dimensions() {
        let mut topo = Topo::new(16, 8);
        topo.generate(1, 0, 0, &SimplexNoise::new(LandSeed::new(124)), &FractalParams::default())
            .unwrap();
        let img = topo.image(-0.25);
        assert_eq!(img.dimensions(), (16, 8));
    }
}
