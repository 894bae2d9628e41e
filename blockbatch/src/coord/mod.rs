//! Block coordinates and axis-aligned regions.
//!
//! All bounds are inclusive on every axis, matching the way the server's
//! `fill` command interprets its two corners.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// A minimum exceeds its maximum on some axis.
    #[error("inverted bounds on {axis} axis: min {min} > max {max}")]
    Inverted {
        axis: &'static str,
        min: i32,
        max: i32,
    },

    /// A coordinate lies outside the world the server addresses.
    #[error("{axis} = {value} is outside the world (limit ±{limit})")]
    OutOfWorld {
        axis: &'static str,
        value: i32,
        limit: i32,
    },
}

/// Largest absolute X or Z a command can address.
pub const WORLD_HORIZONTAL_LIMIT: i32 = 30_000_000;

/// Largest absolute Y a command can address.
pub const WORLD_VERTICAL_LIMIT: i32 = 20_000_000;

fn check_axis(axis: &'static str, min: i32, max: i32, limit: i32) -> Result<(), CoordError> {
    if min > max {
        return Err(CoordError::Inverted { axis, min, max });
    }
    for value in [min, max] {
        if !(-limit..=limit).contains(&value) {
            return Err(CoordError::OutOfWorld { axis, value, limit });
        }
    }
    Ok(())
}

/// A single block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Inclusive axis-aligned 3-D region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Bounds {
    /// Create bounds from a minimum and maximum corner without reordering.
    ///
    /// Use [`Bounds::validate`] before relying on the region, or
    /// [`Bounds::spanning`] to accept corners in any order.
    pub const fn new(min: BlockPos, max: BlockPos) -> Self {
        Self { min, max }
    }

    /// Create the smallest bounds containing both corners.
    pub fn spanning(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Check that no axis is inverted and every corner is inside the world.
    pub fn validate(&self) -> Result<(), CoordError> {
        check_axis("x", self.min.x, self.max.x, WORLD_HORIZONTAL_LIMIT)?;
        check_axis("y", self.min.y, self.max.y, WORLD_VERTICAL_LIMIT)?;
        check_axis("z", self.min.z, self.max.z, WORLD_HORIZONTAL_LIMIT)
    }

    /// Extent along X (number of blocks).
    pub fn width(&self) -> u64 {
        extent(self.min.x, self.max.x)
    }

    /// Extent along Y (number of blocks).
    pub fn height(&self) -> u64 {
        extent(self.min.y, self.max.y)
    }

    /// Extent along Z (number of blocks).
    pub fn depth(&self) -> u64 {
        extent(self.min.z, self.max.z)
    }

    /// Number of blocks contained, or zero for inverted bounds.
    ///
    /// Saturates at `u64::MAX` for regions too large to count.
    pub fn volume(&self) -> u64 {
        self.width()
            .saturating_mul(self.height())
            .saturating_mul(self.depth())
    }

    /// The same horizontal footprint restricted to a Y range.
    pub fn with_y(&self, y: YRange) -> Self {
        Self {
            min: BlockPos::new(self.min.x, y.min, self.min.z),
            max: BlockPos::new(self.max.x, y.max, self.max.z),
        }
    }

    /// Whether two regions share at least one block.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Whether a position lies inside the region.
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// The four top-layer corners and the top-layer centre.
    ///
    /// Used as a cheap representative sample of the region's surface.
    pub fn top_layer_samples(&self) -> Vec<BlockPos> {
        let y = self.max.y;
        let cx = midpoint(self.min.x, self.max.x);
        let cz = midpoint(self.min.z, self.max.z);
        let mut samples = vec![
            BlockPos::new(self.min.x, y, self.min.z),
            BlockPos::new(self.max.x, y, self.min.z),
            BlockPos::new(self.min.x, y, self.max.z),
            BlockPos::new(self.max.x, y, self.max.z),
            BlockPos::new(cx, y, cz),
        ];
        samples.sort_by_key(|p| (p.x, p.z));
        samples.dedup();
        samples
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.min, self.max)
    }
}

/// Inclusive vertical range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YRange {
    pub min: i32,
    pub max: i32,
}

impl YRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<(), CoordError> {
        check_axis("y", self.min, self.max, WORLD_VERTICAL_LIMIT)
    }

    pub fn height(&self) -> u64 {
        extent(self.min, self.max)
    }
}

impl fmt::Display for YRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Inclusive horizontal (X/Z) area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub x_min: i32,
    pub z_min: i32,
    pub x_max: i32,
    pub z_max: i32,
}

impl Area {
    pub const fn new(x_min: i32, z_min: i32, x_max: i32, z_max: i32) -> Self {
        Self {
            x_min,
            z_min,
            x_max,
            z_max,
        }
    }

    pub fn validate(&self) -> Result<(), CoordError> {
        check_axis("x", self.x_min, self.x_max, WORLD_HORIZONTAL_LIMIT)?;
        check_axis("z", self.z_min, self.z_max, WORLD_HORIZONTAL_LIMIT)
    }

    pub fn width(&self) -> u64 {
        extent(self.x_min, self.x_max)
    }

    pub fn depth(&self) -> u64 {
        extent(self.z_min, self.z_max)
    }

    /// 3-D bounds of this area over a Y range.
    pub fn bounds(&self, y: YRange) -> Bounds {
        Bounds::new(
            BlockPos::new(self.x_min, y.min, self.z_min),
            BlockPos::new(self.x_max, y.max, self.z_max),
        )
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) to ({}, {})",
            self.x_min, self.z_min, self.x_max, self.z_max
        )
    }
}

/// Rounds toward `min`; never overflows.
fn midpoint(min: i32, max: i32) -> i32 {
    let mid = i64::from(min) + (i64::from(max) - i64::from(min)).div_euclid(2);
    mid as i32
}

fn extent(min: i32, max: i32) -> u64 {
    if min > max {
        0
    } else {
        (i64::from(max) - i64::from(min) + 1) as u64
    }
}
