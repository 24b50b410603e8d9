//! # Quadkey Codec
//!
//! Tiles are addressed by their path from the quadtree root. Each level
//! contributes one base-4 digit, most significant level first:
//!
//! | digit | x bit | y bit |
//! |-------|-------|-------|
//! | `'0'` | 0     | 0     |
//! | `'1'` | 1     | 0     |
//! | `'2'` | 0     | 1     |
//! | `'3'` | 1     | 1     |
//!
//! The key length is the zoom level and every prefix of a key addresses an
//! ancestor tile. Two representations are provided:
//!
//! - `String` keys (`encode`/`decode`), human readable and used as map keys.
//! - [`QuadCode`], the same path packed into a `u128` plus a zoom tag, for
//!   fast hashing and bit-shift containment tests.

use tracing::warn;

use crate::error::{QuadKeyError, QuadKeyResult};

/// Deepest supported zoom. Tile indices are `u64`.
pub const MAX_ZOOM: u8 = 64;

/// Returns bit `level` of `v`, or 0 beyond the width of `u64`.
#[inline]
const fn bit(v: u64, level: u32) -> u64 {
    if level < u64::BITS {
        (v >> level) & 1
    } else {
        0
    }
}

/// Converts tile coordinates and zoom to a quadkey.
///
/// Only the low `zoom` bits of `x` and `y` are read, so the result always
/// has exactly `zoom` characters.
#[must_use]
pub fn encode(zoom: u8, x: u64, y: u64) -> String {
    let mut key = String::with_capacity(usize::from(zoom));
    encode_into(&mut key, zoom, x, y);
    key
}

/// Like [`encode`], but overwrites `key` in place.
///
/// Reuses the existing allocation when it already holds `zoom` bytes.
pub fn encode_into(key: &mut String, zoom: u8, x: u64, y: u64) {
    key.clear();
    for z in (1..=u32::from(zoom)).rev() {
        let digit = bit(x, z - 1) | (bit(y, z - 1) << 1);
        key.push(char::from(b'0' + digit as u8));
    }
}

/// Converts a quadkey back to `(zoom, x, y)`.
///
/// # Errors
///
/// Returns [`QuadKeyError::InvalidDigit`] for any character outside
/// `'0'..='3'` and [`QuadKeyError::TooDeep`] for keys longer than
/// [`MAX_ZOOM`].
pub fn decode(key: &str) -> QuadKeyResult<(u8, u64, u64)> {
    let zoom = checked_zoom(key)?;
    let (mut x, mut y) = (0u64, 0u64);
    for (position, digit) in key.chars().enumerate() {
        let mask = 1u64 << (usize::from(zoom) - 1 - position);
        match digit {
            '0' => {}
            '1' => x |= mask,
            '2' => y |= mask,
            '3' => {
                x |= mask;
                y |= mask;
            }
            _ => {
                return Err(QuadKeyError::InvalidDigit {
                    key: key.to_owned(),
                    position,
                    digit,
                })
            }
        }
    }
    Ok((zoom, x, y))
}

/// Permissive decode for inspection tooling.
///
/// Malformed digits are logged and contribute no bits, so `"1x"` decodes
/// like `"10"`. Use [`decode`] wherever the key came from outside.
///
/// # Errors
///
/// Returns [`QuadKeyError::TooDeep`] for keys longer than [`MAX_ZOOM`].
pub fn decode_lossy(key: &str) -> QuadKeyResult<(u8, u64, u64)> {
    let zoom = checked_zoom(key)?;
    let (mut x, mut y) = (0u64, 0u64);
    for (position, digit) in key.chars().enumerate() {
        let mask = 1u64 << (usize::from(zoom) - 1 - position);
        match digit.to_digit(4) {
            Some(d) => {
                if d & 1 != 0 {
                    x |= mask;
                }
                if d & 2 != 0 {
                    y |= mask;
                }
            }
            None => warn!(key, position, %digit, "invalid quadkey digit ignored"),
        }
    }
    Ok((zoom, x, y))
}

/// Key length as a zoom, counted in characters.
fn checked_zoom(key: &str) -> QuadKeyResult<u8> {
    let len = key.chars().count();
    u8::try_from(len)
        .ok()
        .filter(|z| *z <= MAX_ZOOM)
        .ok_or(QuadKeyError::TooDeep {
            zoom: len,
            max: MAX_ZOOM,
        })
}

/// A validated tile position in the quadtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Zoom level (quadtree depth).
    pub zoom: u8,
    /// Tile X index at this zoom.
    pub x: u64,
    /// Tile Y index at this zoom.
    pub y: u64,
}

impl TileAddress {
    /// The single zoom-0 tile covering the whole land.
    pub const ROOT: Self = Self { zoom: 0, x: 0, y: 0 };

    /// Creates an address, checking that the tile exists at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns an error if `zoom > MAX_ZOOM` or either index is `>= 2^zoom`.
    pub fn new(zoom: u8, x: u64, y: u64) -> QuadKeyResult<Self> {
        if zoom > MAX_ZOOM {
            return Err(QuadKeyError::TooDeep {
                zoom: usize::from(zoom),
                max: MAX_ZOOM,
            });
        }
        if zoom < MAX_ZOOM {
            let side = 1u64 << zoom;
            if x >= side || y >= side {
                return Err(QuadKeyError::OutOfRange { zoom, x, y });
            }
        }
        Ok(Self { zoom, x, y })
    }

    /// Number of tiles along one edge at this zoom, saturating at zoom 64.
    #[inline]
    #[must_use]
    pub const fn tiles_per_side(self) -> u64 {
        if self.zoom >= 64 {
            u64::MAX
        } else {
            1 << self.zoom
        }
    }

    /// Returns the quadkey string.
    #[must_use]
    pub fn key(self) -> String {
        encode(self.zoom, self.x, self.y)
    }

    /// Parses a quadkey string.
    ///
    /// # Errors
    ///
    /// Same as [`decode`].
    pub fn from_key(key: &str) -> QuadKeyResult<Self> {
        let (zoom, x, y) = decode(key)?;
        Ok(Self { zoom, x, y })
    }

    /// Returns the packed integer form.
    #[must_use]
    pub fn code(self) -> QuadCode {
        QuadCode::from(self)
    }

    /// Returns the parent tile, or `None` at the root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        if self.zoom == 0 {
            None
        } else {
            Some(Self {
                zoom: self.zoom - 1,
                x: self.x >> 1,
                y: self.y >> 1,
            })
        }
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A quadkey packed into an integer.
///
/// `path` holds two bits per level, `(y_bit << 1) | x_bit`, with the most
/// significant level in the highest used bits. Ordering is by zoom, then
/// path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadCode {
    zoom: u8,
    path: u128,
}

impl QuadCode {
    /// Code of the zoom-0 root tile.
    pub const ROOT: Self = Self { zoom: 0, path: 0 };

    /// Returns the zoom level (number of digits).
    #[inline]
    #[must_use]
    pub const fn zoom(self) -> u8 {
        self.zoom
    }

    /// Returns the packed path bits.
    #[inline]
    #[must_use]
    pub const fn path(self) -> u128 {
        self.path
    }

    /// Returns the parent code, or `None` at the root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        if self.zoom == 0 {
            None
        } else {
            Some(Self {
                zoom: self.zoom - 1,
                path: self.path >> 2,
            })
        }
    }

    /// Returns child `quadrant` (0..=3, same meaning as a key digit).
    ///
    /// `None` if `quadrant > 3` or the code is already at [`MAX_ZOOM`].
    #[must_use]
    pub const fn child(self, quadrant: u8) -> Option<Self> {
        if quadrant > 3 || self.zoom >= MAX_ZOOM {
            return None;
        }
        Some(Self {
            zoom: self.zoom + 1,
            path: (self.path << 2) | quadrant as u128,
        })
    }

    /// True if `self` is `other` or one of its ancestors.
    ///
    /// Equivalent to `other.key().starts_with(&self.key())`.
    #[must_use]
    pub fn is_ancestor_of(self, other: Self) -> bool {
        if self.zoom > other.zoom {
            return false;
        }
        let shift = 2 * u32::from(other.zoom - self.zoom);
        other.path.checked_shr(shift).unwrap_or(0) == self.path
    }

    /// Truncates the code to `zoom` levels.
    ///
    /// `None` if `zoom` is deeper than this code.
    #[must_use]
    pub fn ancestor_at(self, zoom: u8) -> Option<Self> {
        if zoom > self.zoom {
            return None;
        }
        let shift = 2 * u32::from(self.zoom - zoom);
        Some(Self {
            zoom,
            path: self.path.checked_shr(shift).unwrap_or(0),
        })
    }

    /// Parses a quadkey string.
    ///
    /// # Errors
    ///
    /// Same as [`decode`].
    pub fn from_key(key: &str) -> QuadKeyResult<Self> {
        TileAddress::from_key(key).map(Self::from)
    }

    /// Returns the quadkey string.
    #[must_use]
    pub fn to_key(self) -> String {
        TileAddress::from(self).key()
    }
}

impl From<TileAddress> for QuadCode {
    fn from(addr: TileAddress) -> Self {
        let mut path = 0u128;
        for z in (1..=u32::from(addr.zoom)).rev() {
            let digit = bit(addr.x, z - 1) | (bit(addr.y, z - 1) << 1);
            path = (path << 2) | u128::from(digit);
        }
        Self {
            zoom: addr.zoom,
            path,
        }
    }
}

impl From<QuadCode> for TileAddress {
    fn from(code: QuadCode) -> Self {
        let (mut x, mut y) = (0u64, 0u64);
        for level in 0..u32::from(code.zoom) {
            let digit = (code.path >> (2 * level)) & 0b11;
            x |= ((digit & 1) as u64) << level;
            y |= ((digit >> 1) as u64) << level;
        }
        Self {
            zoom: code.zoom,
            x,
            y,
        }
    }
}
