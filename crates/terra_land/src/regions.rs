//! # Region Maps
//!
//! Divides a square map into numbered regions, for example to assign a
//! land type to every height sample. Region centres are scattered with a
//! seeded RNG and every cell joins the closest centre, giving a cheap
//! Voronoi partition that is identical for identical seeds.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::{LandError, LandResult};

/// A `size × size` grid of region ids, row-major.
///
/// Ids run from 1 to the region count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Regions {
    size: usize,
    centres: Vec<(usize, usize)>,
    cells: Vec<u32>,
}

impl Regions {
    /// Scatters `count` region centres over a `size × size` map and assigns
    /// every cell to the nearest one by squared distance.
    ///
    /// Equidistant cells go to the lower id. Centres may coincide, in which
    /// case the higher id owns no cells.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] if `size` or `count` is zero.
    pub fn generate(size: usize, count: u32, seed: u64) -> LandResult<Self> {
        if size == 0 || count == 0 {
            return Err(LandError::InvalidConfig(format!(
                "regions need a positive size and count, got {size} and {count}"
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let centres: Vec<(usize, usize)> = (0..count)
            .map(|_| (rng.gen_range(0..size), rng.gen_range(0..size)))
            .collect();

        let mut cells = vec![0u32; size * size];
        cells
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = nearest(&centres, x, y);
                }
            });

        Ok(Self { size, centres, cells })
    }

    /// Width and height of the map.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of regions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.centres.len()
    }

    /// Centre of region `id`.
    #[must_use]
    pub fn centre(&self, id: u32) -> Option<(usize, usize)> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.centres.get(index).copied()
    }

    /// Region id at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.size || y >= self.size {
            return None;
        }
        Some(self.cells[y * self.size + x])
    }

    /// All ids, row-major.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.cells
    }
}

fn nearest(centres: &[(usize, usize)], x: usize, y: usize) -> u32 {
    let mut best = (u128::MAX, 0u32);
    for (id, &(cx, cy)) in (1u32..).zip(centres) {
        let dx = x.abs_diff(cx) as u128;
        let dy = y.abs_diff(cy) as u128;
        let d = dx * dx + dy * dy;
        if d < best.0 {
            best = (d, id);
        }
    }
    best.1
}
