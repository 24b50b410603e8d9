//! # Simplex Noise
//!
//! The height field is sampled from a continuous 2D coherent noise. The
//! sampler is injected into [`Land`](crate::Land) through the
//! [`NoiseSource`] trait; [`SimplexNoise`] is the default.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`LandSeed`], [`SimplexNoise`] produces **exactly** the
//! same values on any platform, any time. Only IEEE-754 `+ - *` and
//! `floor` are used on the sample path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{NoiseError, NoiseResult};

/// Seed for one height field.
///
/// Lands built from the same seed produce the same heights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandSeed(i64);

impl LandSeed {
    /// Creates a new seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: i64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Derives an independent sub-seed, e.g. for a blend-index field that
    /// must not correlate with the height field.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0 as u64;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash as i64)
    }
}

impl Default for LandSeed {
    fn default() -> Self {
        Self(0x0DEA_DBEE_FCAF_EBAB)
    }
}

impl From<i64> for LandSeed {
    fn from(seed: i64) -> Self {
        Self(seed)
    }
}

/// A seedable, deterministic 2D coherent-noise sampler.
///
/// Implementations are shared by every tile of a land and sampled from
/// many threads at once, so they must be `Send + Sync` and must not rely
/// on interior mutability for their output.
pub trait NoiseSource: Send + Sync {
    /// Samples the field at a world coordinate, nominally in `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Fails if the source cannot produce a value; the tile being
    /// generated is then left stale.
    fn try_sample(&self, x: f64, y: f64) -> NoiseResult<f64>;

    /// Samples a 3D field, used to build aligned cube-map faces.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`NoiseError::Unsupported`];
    /// 2D-only sources need not override it.
    fn try_sample_3d(&self, _x: f64, _y: f64, _z: f64) -> NoiseResult<f64> {
        Err(NoiseError::Unsupported { dims: 3 })
    }
}

impl<N: NoiseSource + ?Sized> NoiseSource for Arc<N> {
    #[inline]
    fn try_sample(&self, x: f64, y: f64) -> NoiseResult<f64> {
        (**self).try_sample(x, y)
    }

    #[inline]
    fn try_sample_3d(&self, x: f64, y: f64, z: f64) -> NoiseResult<f64> {
        (**self).try_sample_3d(x, y, z)
    }
}

impl<N: NoiseSource + ?Sized> NoiseSource for &N {
    #[inline]
    fn try_sample(&self, x: f64, y: f64) -> NoiseResult<f64> {
        (**self).try_sample(x, y)
    }

    #[inline]
    fn try_sample_3d(&self, x: f64, y: f64, z: f64) -> NoiseResult<f64> {
        (**self).try_sample_3d(x, y, z)
    }
}

/// 12 gradient directions, the edge midpoints of a cube. 2D sampling uses
/// their projection onto XY.
const GRADIENTS: [[i8; 3]; 12] = [
    [1, 1, 0], [-1, 1, 0], [1, -1, 0], [-1, -1, 0],
    [1, 0, 1], [-1, 0, 1], [1, 0, -1], [-1, 0, -1],
    [0, 1, 1], [0, -1, 1], [0, 1, -1], [0, -1, -1],
];

/// Seed-shuffled permutation, doubled so lookups never wrap.
struct PermutationTable {
    perm: [u8; 512],
    perm_mod12: [u8; 512],
}

impl PermutationTable {
    fn new(seed: LandSeed) -> Self {
        let mut base = [0u8; 256];
        for (i, p) in base.iter_mut().enumerate() {
            *p = i as u8;
        }

        // Fisher-Yates with xorshift64; splitmix first so seed 0 still shuffles.
        let mut rng_state = splitmix64(seed.value() as u64);
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;
            let j = (rng_state % (i as u64 + 1)) as usize;
            base.swap(i, j);
        }

        let mut perm = [0u8; 512];
        let mut perm_mod12 = [0u8; 512];
        for i in 0..512 {
            perm[i] = base[i & 255];
            perm_mod12[i] = perm[i] % 12;
        }
        Self { perm, perm_mod12 }
    }

    #[inline]
    fn gradient(&self, ii: usize, jj: usize) -> [i8; 3] {
        let index = self.perm_mod12[ii + self.perm[jj] as usize];
        GRADIENTS[index as usize]
    }

    #[inline]
    fn gradient_3d(&self, ii: usize, jj: usize, kk: usize) -> [i8; 3] {
        let inner = jj + self.perm[kk] as usize;
        let index = self.perm_mod12[ii + self.perm[inner] as usize];
        GRADIENTS[index as usize]
    }
}

#[inline]
const fn splitmix64(v: u64) -> u64 {
    let mut z = v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// 2D simplex noise generator.
///
/// Produces smooth, continuous noise values in the range `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use terra_land::{LandSeed, SimplexNoise};
///
/// let noise = SimplexNoise::new(LandSeed::new(42));
/// let value = noise.sample(100.5, 200.3);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
pub struct SimplexNoise {
    seed: LandSeed,
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// Skewing factor for 2D simplex grid: (sqrt(3) - 1) / 2
    const F2: f64 = 0.366_025_403_784_438_6;
    /// Unskewing factor for 2D simplex grid: (3 - sqrt(3)) / 6
    const G2: f64 = 0.211_324_865_405_187_1;
    /// Skewing factor for 3D simplex grid: 1 / 3
    const F3: f64 = 1.0 / 3.0;
    /// Unskewing factor for 3D simplex grid: 1 / 6
    const G3: f64 = 1.0 / 6.0;

    /// Creates a new simplex noise generator from a seed.
    #[must_use]
    pub fn new(seed: LandSeed) -> Self {
        Self {
            seed,
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Returns the seed this generator was built from.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> LandSeed {
        self.seed
    }

    /// Samples 2D simplex noise at the given coordinates.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew input space to find the simplex cell
        let skew = (x + y) * Self::F2;
        let i = (x + skew).floor() as i64;
        let j = (y + skew).floor() as i64;

        let unskew = i.wrapping_add(j) as f64 * Self::G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);

        // Lower or upper triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let n0 = contribution(x0, y0, self.perm_table.gradient(ii, jj));
        let n1 = contribution(x1, y1, self.perm_table.gradient(ii + i1, jj + j1));
        let n2 = contribution(x2, y2, self.perm_table.gradient(ii + 1, jj + 1));

        // 70 scales the sum into [-1, 1]
        70.0 * (n0 + n1 + n2)
    }

    /// Samples 3D simplex noise at the given coordinates.
    #[must_use]
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let skew = (x + y + z) * Self::F3;
        let i = (x + skew).floor() as i64;
        let j = (y + skew).floor() as i64;
        let k = (z + skew).floor() as i64;

        let unskew = i.wrapping_add(j).wrapping_add(k) as f64 * Self::G3;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);
        let z0 = z - (k as f64 - unskew);

        // Corner order of the tetrahedron containing the point
        let ((i1, j1, k1), (i2, j2, k2)) = if x0 >= y0 {
            if y0 >= z0 {
                ((1, 0, 0), (1, 1, 0))
            } else if x0 >= z0 {
                ((1, 0, 0), (1, 0, 1))
            } else {
                ((0, 0, 1), (1, 0, 1))
            }
        } else if y0 < z0 {
            ((0, 0, 1), (0, 1, 1))
        } else if x0 < z0 {
            ((0, 1, 0), (0, 1, 1))
        } else {
            ((0, 1, 0), (1, 1, 0))
        };

        let c1 = [x0 - i1 as f64 + Self::G3, y0 - j1 as f64 + Self::G3, z0 - k1 as f64 + Self::G3];
        let c2 = [
            x0 - i2 as f64 + 2.0 * Self::G3,
            y0 - j2 as f64 + 2.0 * Self::G3,
            z0 - k2 as f64 + 2.0 * Self::G3,
        ];
        let c3 = [x0 - 1.0 + 3.0 * Self::G3, y0 - 1.0 + 3.0 * Self::G3, z0 - 1.0 + 3.0 * Self::G3];

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let kk = (k & 255) as usize;
        let table = &self.perm_table;

        let n0 = contribution_3d([x0, y0, z0], table.gradient_3d(ii, jj, kk));
        let n1 = contribution_3d(c1, table.gradient_3d(ii + i1, jj + j1, kk + k1));
        let n2 = contribution_3d(c2, table.gradient_3d(ii + i2, jj + j2, kk + k2));
        let n3 = contribution_3d(c3, table.gradient_3d(ii + 1, jj + 1, kk + 1));

        // 32 scales the sum into [-1, 1]
        32.0 * (n0 + n1 + n2 + n3)
    }
}

impl NoiseSource for SimplexNoise {
    #[inline]
    fn try_sample(&self, x: f64, y: f64) -> NoiseResult<f64> {
        let value = self.sample(x, y);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NoiseError::NonFinite { x, y })
        }
    }

    #[inline]
    fn try_sample_3d(&self, x: f64, y: f64, z: f64) -> NoiseResult<f64> {
        let value = self.sample_3d(x, y, z);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(NoiseError::NonFinite { x, y })
        }
    }
}

/// Contribution from one simplex corner.
#[inline]
fn contribution(x: f64, y: f64, grad: [i8; 3]) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
    }
}

#[inline]
fn contribution_3d(p: [f64; 3], grad: [i8; 3]) -> f64 {
    let [x, y, z] = p;
    let t = 0.5 - x * x - y * y - z * z;
    if t < 0.0 {
        0.0
    } else {
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]) + z * f64::from(grad[2]))
    }
}
