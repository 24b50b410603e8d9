//! # Tile Cache
//!
//! Thread-safe registry of generated tiles keyed by [`QuadCode`].
//!
//! Generation happens outside the lock: two threads racing for the same
//! missing tile may both generate it, and the second result is dropped.
//! Heights are deterministic so either copy is correct; the loss is only
//! wasted work.
//!
//! Because a quadkey prefix addresses an ancestor, a missing detailed tile
//! can be stood in for by the deepest cached ancestor
//! ([`TileCache::nearest_ancestor`]) while the detail is generated.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{LandError, LandResult};
use crate::land::Land;
use crate::noise::NoiseSource;
use crate::quadkey::{QuadCode, TileAddress};
use crate::tile::Tile;

/// Shared map from tile address to generated tile.
#[derive(Default)]
pub struct TileCache {
    tiles: RwLock<HashMap<QuadCode, Arc<Tile>>>,
}

impl TileCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.read().len()
    }

    /// True if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.read().is_empty()
    }

    /// Cached tile for `code`.
    #[must_use]
    pub fn get(&self, code: QuadCode) -> Option<Arc<Tile>> {
        self.tiles.read().get(&code).cloned()
    }

    /// Adds a generated tile, replacing any previous entry.
    ///
    /// Entries are keyed by address only; keep cube-face tiles in a cache
    /// per face.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::TileNotReady`] for stale tiles.
    pub fn insert(&self, tile: Tile) -> LandResult<Arc<Tile>> {
        if !tile.is_ready() {
            return Err(LandError::TileNotReady(tile.key().to_owned()));
        }
        let tile = Arc::new(tile);
        self.tiles.write().insert(tile.code(), Arc::clone(&tile));
        Ok(tile)
    }

    /// Cached tile for `(zoom, x, y)`, generating it with `land` if absent.
    ///
    /// # Errors
    ///
    /// Same as [`Land::new_tile`].
    pub fn get_or_generate<N: NoiseSource>(
        &self,
        land: &Land<N>,
        zoom: u8,
        x: u64,
        y: u64,
    ) -> LandResult<Arc<Tile>> {
        let code = TileAddress::new(zoom, x, y)?.code();
        if let Some(tile) = self.get(code) {
            return Ok(tile);
        }
        let fresh = Arc::new(land.new_tile(zoom, x, y)?);
        let mut tiles = self.tiles.write();
        let entry = tiles.entry(code).or_insert_with(|| {
            debug!(key = fresh.key(), "tile cached");
            Arc::clone(&fresh)
        });
        Ok(Arc::clone(entry))
    }

    /// The deepest cached tile that is `code` or one of its ancestors.
    #[must_use]
    pub fn nearest_ancestor(&self, code: QuadCode) -> Option<Arc<Tile>> {
        let tiles = self.tiles.read();
        let mut cursor = Some(code);
        while let Some(c) = cursor {
            if let Some(tile) = tiles.get(&c) {
                return Some(Arc::clone(tile));
            }
            cursor = c.parent();
        }
        None
    }

    /// Removes one tile.
    pub fn evict(&self, code: QuadCode) -> Option<Arc<Tile>> {
        self.tiles.write().remove(&code)
    }

    /// Removes every tile not inside `area` (neither `area` itself nor a
    /// descendant of it). Returns the number removed.
    pub fn evict_outside(&self, area: QuadCode) -> usize {
        let mut tiles = self.tiles.write();
        let before = tiles.len();
        tiles.retain(|code, _| area.is_ancestor_of(*code));
        before - tiles.len()
    }

    /// Removes everything.
    pub fn clear(&self) {
        self.tiles.write().clear();
    }
}
