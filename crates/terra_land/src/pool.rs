//! # Tile Pool
//!
//! Fixed arena of tiles that are repurposed instead of reallocated.
//!
//! Every slot owns a `patch_size × patch_size` grid from construction
//! onwards. Acquiring a slot only rewrites its address; filling it
//! overwrites the existing grid in place. A visible set that scrolls
//! across the land therefore never touches the allocator.
//!
//! Claiming a slot ([`TilePool::acquire`]) and generating it
//! ([`TilePool::fill`] / [`TilePool::regenerate_stale`]) are separate steps
//! so slot assignment and generation can run on different schedules.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{LandError, LandResult};
use crate::land::Land;
use crate::noise::NoiseSource;
use crate::quadkey::{QuadCode, TileAddress};
use crate::tile::Tile;

/// Handle to a slot in a [`TilePool`].
///
/// Handles go stale when their slot is released; a stale handle never
/// resolves to the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileHandle {
    index: usize,
    generation: u32,
}

impl TileHandle {
    /// Slot index inside the pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// A pool of reusable tiles keyed by address.
///
/// # Thread Safety
///
/// The pool itself is not synchronised; wrap it in a mutex to share it.
/// [`TilePool::regenerate_stale`] fills slots in parallel internally.
pub struct TilePool {
    slots: Box<[Tile]>,
    occupied: Box<[bool]>,
    generations: Box<[u32]>,
    free_list: Vec<usize>,
    index: HashMap<QuadCode, usize>,
}

impl TilePool {
    /// Pre-allocates `capacity` tiles of `patch_size × patch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize, patch_size: usize) -> LandResult<Self> {
        if capacity == 0 {
            return Err(LandError::InvalidConfig("pool capacity must be positive".into()));
        }
        let slots: Vec<Tile> = (0..capacity)
            .map(|_| Tile::blank(patch_size, patch_size))
            .collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            occupied: vec![false; capacity].into_boxed_slice(),
            generations: vec![0; capacity].into_boxed_slice(),
            free_list: (0..capacity).rev().collect(),
            index: HashMap::with_capacity(capacity),
        })
    }

    /// Pool sized for tiles of `land`.
    ///
    /// # Errors
    ///
    /// Same as [`TilePool::new`].
    pub fn for_land<N: NoiseSource>(land: &Land<N>, capacity: usize) -> LandResult<Self> {
        Self::new(capacity, land.tile_size())
    }

    /// Total number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Claims a slot for `(zoom, x, y)`.
    ///
    /// Returns the existing handle if the address is already pooled.
    /// Otherwise a free slot is repurposed and left stale until filled.
    ///
    /// # Errors
    ///
    /// Returns an address error, or [`LandError::PoolExhausted`] when every
    /// slot is taken.
    pub fn acquire(&mut self, zoom: u8, x: u64, y: u64) -> LandResult<TileHandle> {
        let code = TileAddress::new(zoom, x, y)?.code();
        if let Some(&index) = self.index.get(&code) {
            return Ok(self.handle(index));
        }
        let index = self.free_list.pop().ok_or(LandError::PoolExhausted {
            capacity: self.capacity(),
        })?;
        if let Err(err) = self.slots[index].set(zoom, x, y) {
            self.free_list.push(index);
            return Err(err.into());
        }
        self.occupied[index] = true;
        self.index.insert(code, index);
        debug!(slot = index, key = self.slots[index].key(), "pool slot claimed");
        Ok(self.handle(index))
    }

    /// Moves an occupied slot to a new address, marking it stale.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidHandle`] for stale handles, an address
    /// error for bad addresses. Repurposing onto an address already
    /// pooled in another slot is rejected as [`LandError::InvalidConfig`].
    pub fn repurpose(&mut self, handle: TileHandle, zoom: u8, x: u64, y: u64) -> LandResult<()> {
        let index = self.resolve(handle)?;
        let code = TileAddress::new(zoom, x, y)?.code();
        match self.index.get(&code) {
            Some(&other) if other == index => return Ok(()),
            Some(_) => {
                return Err(LandError::InvalidConfig(format!(
                    "address {zoom}/{x}/{y} already pooled"
                )))
            }
            None => {}
        }
        let old = self.slots[index].code();
        self.slots[index].set(zoom, x, y)?;
        self.index.remove(&old);
        self.index.insert(code, index);
        Ok(())
    }

    /// Frees a slot; its grid stays allocated for the next occupant.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidHandle`] for stale handles.
    pub fn release(&mut self, handle: TileHandle) -> LandResult<()> {
        let index = self.resolve(handle)?;
        self.free_slot(index);
        Ok(())
    }

    /// Releases every occupied tile for which `pred` returns true.
    ///
    /// Returns the number of slots freed.
    pub fn release_where<F: FnMut(&Tile) -> bool>(&mut self, mut pred: F) -> usize {
        let doomed: Vec<usize> = self
            .occupied_indices()
            .filter(|&i| pred(&self.slots[i]))
            .collect();
        for &index in &doomed {
            self.free_slot(index);
        }
        doomed.len()
    }

    /// Tile behind a live handle.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: TileHandle) -> Option<&Tile> {
        self.resolve(handle).ok().map(|i| &self.slots[i])
    }

    /// Handle for a pooled address.
    #[must_use]
    pub fn find(&self, code: QuadCode) -> Option<TileHandle> {
        self.index.get(&code).map(|&i| self.handle(i))
    }

    /// Handle for a pooled quadkey string.
    #[must_use]
    pub fn find_key(&self, key: &str) -> Option<TileHandle> {
        QuadCode::from_key(key).ok().and_then(|code| self.find(code))
    }

    /// Generates one slot's heights.
    ///
    /// # Errors
    ///
    /// Returns [`LandError::InvalidHandle`] for stale handles, otherwise
    /// whatever [`Land::fill`] returns.
    pub fn fill<N: NoiseSource>(&mut self, handle: TileHandle, land: &Land<N>) -> LandResult<()> {
        let index = self.resolve(handle)?;
        land.fill(&mut self.slots[index])
    }

    /// Generates every occupied stale slot in parallel.
    ///
    /// Returns the handles that failed with their errors; those slots stay
    /// stale and claimed.
    pub fn regenerate_stale<N: NoiseSource>(&mut self, land: &Land<N>) -> Vec<(TileHandle, LandError)> {
        let failures: Vec<(usize, LandError)> = self
            .slots
            .par_iter_mut()
            .zip(self.occupied.par_iter())
            .enumerate()
            .filter(|(_, (tile, occupied))| **occupied && !tile.is_ready())
            .filter_map(|(i, (tile, _))| land.fill(tile).err().map(|err| (i, err)))
            .collect();
        failures
            .into_iter()
            .map(|(i, err)| (self.handle(i), err))
            .collect()
    }

    /// Iterates over occupied tiles.
    pub fn iter(&self) -> impl Iterator<Item = (TileHandle, &Tile)> {
        self.occupied_indices().map(|i| (self.handle(i), &self.slots[i]))
    }

    fn occupied_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter_map(|(i, &occupied)| occupied.then_some(i))
    }

    fn handle(&self, index: usize) -> TileHandle {
        TileHandle {
            index,
            generation: self.generations[index],
        }
    }

    fn resolve(&self, handle: TileHandle) -> LandResult<usize> {
        let live = handle.index < self.slots.len()
            && self.occupied[handle.index]
            && self.generations[handle.index] == handle.generation;
        if live {
            Ok(handle.index)
        } else {
            Err(LandError::InvalidHandle(handle.index))
        }
    }

    fn free_slot(&mut self, index: usize) {
        let code = self.slots[index].code();
        self.index.remove(&code);
        self.occupied[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_list.push(index);
    }
}
