//! Three-plane tile buffers — the unit of data flowing between stages.
//!
//! A [`Tile`] owns three equal-shaped sample planes. Plane names follow
//! the post-conversion color space (Y, Cb, Cr); for a raw input tile the
//! planes simply carry R, G and B. Transforms always produce a *new*
//! tile — a result handed to a later stage is never mutated in place.

use std::path::Path;

use crate::error::CodecError;
use crate::serialize::{IntegerSerializer, TileSerializer};

// ── Triplet ──────────────────────────────────────────────────────

/// Ordered (Y, Cb, Cr) container used wherever the three planes travel
/// together — most notably the per-plane string form of a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet<T> {
    pub y: T,
    pub cb: T,
    pub cr: T,
}

impl<T> Triplet<T> {
    pub fn new(y: T, cb: T, cr: T) -> Self {
        Self { y, cb, cr }
    }

    /// Borrow the three components in plane order.
    pub fn as_array(&self) -> [&T; 3] {
        [&self.y, &self.cb, &self.cr]
    }
}

/// Display names of the three planes, in triplet order.
pub const PLANE_NAMES: [&str; 3] = ["Y", "Cb", "Cr"];

// ── Tile ─────────────────────────────────────────────────────────

/// A three-plane raster of `i32` samples.
///
/// # Invariant
///
/// All three planes share identical dimensions for the lifetime of the
/// tile; every constructor enforces this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: usize,
    height: usize,
    planes: [Vec<i32>; 3],
}

impl Tile {
    /// Build a tile from three pre-filled planes.
    ///
    /// Fails with [`CodecError::Validation`] if any plane does not hold
    /// exactly `width * height` samples.
    pub fn from_planes(
        width: usize,
        height: usize,
        planes: [Vec<i32>; 3],
    ) -> Result<Self, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::Validation(format!(
                "tile dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width * height;
        for (idx, plane) in planes.iter().enumerate() {
            if plane.len() != expected {
                return Err(CodecError::Validation(format!(
                    "plane {} holds {} samples, expected {expected}",
                    PLANE_NAMES[idx],
                    plane.len()
                )));
            }
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    /// An all-zero tile of the given dimensions.
    pub fn zeroed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            planes: [
                vec![0; width * height],
                vec![0; width * height],
                vec![0; width * height],
            ],
        }
    }

    /// Load a tile from its stored text form: three plane sections
    /// separated by blank lines, each section holding rows of decimal
    /// samples.
    ///
    /// Fails with [`CodecError::Io`] if the file cannot be read and
    /// [`CodecError::Format`] if the content is malformed.
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let text = std::fs::read_to_string(path)?;

        let mut sections: Vec<String> = Vec::new();
        let mut current = String::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        if !current.is_empty() {
            sections.push(current);
        }

        if sections.len() != 3 {
            return Err(CodecError::Format(format!(
                "expected 3 plane sections, found {}",
                sections.len()
            )));
        }

        let triplet = Triplet::new(
            sections[0].clone(),
            sections[1].clone(),
            sections[2].clone(),
        );
        Self::from_strings(&triplet, &IntegerSerializer)
    }

    /// Write the tile in its stored text form, the counterpart of
    /// [`from_file`](Self::from_file).
    pub fn to_file(&self, path: &Path) -> Result<(), CodecError> {
        let strings = self.to_strings(&IntegerSerializer);
        let text = format!("{}\n\n{}\n\n{}\n", strings.y, strings.cb, strings.cr);
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Decode a tile from three plane strings using the given serializer.
    ///
    /// Fails with [`CodecError::Format`] on malformed tokens or when the
    /// planes disagree in shape.
    pub fn from_strings(
        strings: &Triplet<String>,
        serializer: &dyn TileSerializer,
    ) -> Result<Self, CodecError> {
        let (y, width) = serializer.parse(&strings.y)?;
        let (cb, cb_width) = serializer.parse(&strings.cb)?;
        let (cr, cr_width) = serializer.parse(&strings.cr)?;

        let height = y.len() / width;
        for (name, len, w) in [("Cb", cb.len(), cb_width), ("Cr", cr.len(), cr_width)] {
            if w != width || len != y.len() {
                return Err(CodecError::Format(format!(
                    "plane {name} is {w}x{}, expected {width}x{height}",
                    len / w
                )));
            }
        }

        Self::from_planes(width, height, [y, cb, cr])
    }

    /// Render the tile as three plane strings. Pure: the inverse of
    /// [`from_strings`](Self::from_strings) for the same serializer.
    pub fn to_strings(&self, serializer: &dyn TileSerializer) -> Triplet<String> {
        Triplet::new(
            serializer.serialize(&self.planes[0], self.width),
            serializer.serialize(&self.planes[1], self.width),
            serializer.serialize(&self.planes[2], self.width),
        )
    }

    /// A new tile with every sample arithmetically shifted right by `n`
    /// bits — used to normalise fixed-point sample formats down to the
    /// integer domain. Shift counts outside `0..=31` fail with
    /// [`CodecError::Value`].
    pub fn right_shift(&self, n: u32) -> Result<Self, CodecError> {
        if n >= i32::BITS {
            return Err(CodecError::Value(format!(
                "shift count {n} out of range (0..={})",
                i32::BITS - 1
            )));
        }
        Ok(self.map(|v| v >> n))
    }

    /// Tile width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Tile height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Borrow one plane as a flat row-major slice.
    pub fn plane(&self, idx: usize) -> &[i32] {
        &self.planes[idx]
    }

    /// Apply `f` to every sample of every plane, producing a new tile.
    pub fn map(&self, f: impl Fn(i32) -> i32) -> Self {
        let apply = |plane: &Vec<i32>| plane.iter().map(|&v| f(v)).collect();
        Self {
            width: self.width,
            height: self.height,
            planes: [
                apply(&self.planes[0]),
                apply(&self.planes[1]),
                apply(&self.planes[2]),
            ],
        }
    }

    /// Combine two same-shaped tiles sample-by-sample.
    ///
    /// Fails with [`CodecError::Validation`] on a shape mismatch.
    pub fn zip_map(
        &self,
        other: &Tile,
        f: impl Fn(i32, i32) -> i32,
    ) -> Result<Self, CodecError> {
        if (self.width, self.height) != (other.width, other.height) {
            return Err(CodecError::Validation(format!(
                "tile shape mismatch: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        let apply = |a: &Vec<i32>, b: &Vec<i32>| {
            a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
        };
        Ok(Self {
            width: self.width,
            height: self.height,
            planes: [
                apply(&self.planes[0], &other.planes[0]),
                apply(&self.planes[1], &other.planes[1]),
                apply(&self.planes[2], &other.planes[2]),
            ],
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
