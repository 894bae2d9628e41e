//! Splitting regions into server-sized pieces.
//!
//! Both planners tile in row-major order: Z rows outer, X columns inner,
//! ascending. `plan_fill` additionally splits each column into Y layers when
//! a full-height column would exceed the element limit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{Area, BlockPos, Bounds, CoordError, YRange};

/// Errors from the planners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    InvalidBounds(#[from] CoordError),

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("element limit must be at least 1")]
    ZeroLimit,
}

/// One column of a region clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Position in planner order.
    pub index: usize,
    pub origin_x: i32,
    pub origin_z: i32,
    /// Inclusive bounds, full clear height.
    pub bounds: Bounds,
}

/// Split a fill so that no piece exceeds `max_elements`.
///
/// The XZ side of each piece is `min(chunk_size, isqrt(max_elements))`.
/// When a full-height column of that side is still too large, columns are
/// split into Y layers of `max_elements / side²` blocks. The pieces are
/// disjoint and their union is exactly `bounds`.
pub fn plan_fill(
    bounds: &Bounds,
    chunk_size: u32,
    max_elements: u64,
) -> Result<Vec<Bounds>, PlanError> {
    bounds.validate()?;
    if chunk_size == 0 {
        return Err(PlanError::ZeroChunkSize);
    }
    if max_elements == 0 {
        return Err(PlanError::ZeroLimit);
    }

    let side = u64::from(chunk_size).min(isqrt(max_elements)).max(1);
    let layer = if (side * side).saturating_mul(bounds.height()) > max_elements {
        (max_elements / (side * side)).max(1)
    } else {
        bounds.height()
    };

    let mut pieces = Vec::new();
    for (z0, z1) in steps(bounds.min.z, bounds.max.z, side) {
        for (x0, x1) in steps(bounds.min.x, bounds.max.x, side) {
            for (y0, y1) in steps(bounds.min.y, bounds.max.y, layer) {
                pieces.push(Bounds::new(
                    BlockPos::new(x0, y0, z0),
                    BlockPos::new(x1, y1, z1),
                ));
            }
        }
    }
    Ok(pieces)
}

/// Tile a horizontal area into full-height columns of `chunk_size` blocks.
///
/// Produces `ceil(width / C) × ceil(depth / C)` plans; edge plans are
/// truncated to the area.
pub fn plan_chunks(
    area: &Area,
    y: YRange,
    chunk_size: u32,
) -> Result<Vec<ChunkPlan>, PlanError> {
    area.validate()?;
    y.validate()?;
    if chunk_size == 0 {
        return Err(PlanError::ZeroChunkSize);
    }

    let side = u64::from(chunk_size);
    let mut plans = Vec::new();
    for (z0, z1) in steps(area.z_min, area.z_max, side) {
        for (x0, x1) in steps(area.x_min, area.x_max, side) {
            plans.push(ChunkPlan {
                index: plans.len(),
                origin_x: x0,
                origin_z: z0,
                bounds: Bounds::new(BlockPos::new(x0, y.min, z0), BlockPos::new(x1, y.max, z1)),
            });
        }
    }
    Ok(plans)
}

/// Inclusive `(start, end)` spans of at most `step` covering `min..=max`.
fn steps(min: i32, max: i32, step: u64) -> impl Iterator<Item = (i32, i32)> {
    let step = i64::try_from(step.max(1)).unwrap_or(i64::MAX);
    let max = i64::from(max);
    let mut next = Some(i64::from(min));
    std::iter::from_fn(move || {
        let start = next?;
        if start > max {
            return None;
        }
        let end = start.saturating_add(step - 1).min(max);
        next = Some(end + 1);
        Some((start as i32, end as i32))
    })
}

/// Integer square root (floor).
fn isqrt(n: u64) -> u64 {
    let mut r = (n as f64).sqrt() as u64;
    while r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn cube(x: i32, y: i32, z: i32, w: i32, h: i32, d: i32) -> Bounds {
        Bounds::new(
            BlockPos::new(x, y, z),
            BlockPos::new(x + w - 1, y + h - 1, z + d - 1),
        )
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(32_768), 181);
        assert_eq!(isqrt(32_761), 181);
        assert_eq!(isqrt(32_760), 180);
        assert_eq!(isqrt(u32::MAX as u64), 65_535);
        assert_eq!(isqrt(u64::MAX), u64::from(u32::MAX));
    }

    #[test]
    fn test_oversized_fill_splits() {
        // 40×40×40 = 64,000 blocks against the 32,768 limit.
        let bounds = cube(0, 0, 0, 40, 40, 40);
        let pieces = plan_fill(&bounds, 32, 32_768).unwrap();

        assert!(pieces.len() >= 2);
        assert!(pieces.iter().all(|p| p.volume() <= 32_768));
        assert_eq!(pieces.iter().map(Bounds::volume).sum::<u64>(), 64_000);
    }

    #[test]
    fn test_tall_columns_split_into_layers() {
        // 32×32 columns of height 260 are 266,240 blocks each.
        let bounds = cube(0, 60, 0, 32, 260, 32);
        let pieces = plan_fill(&bounds, 32, 32_768).unwrap();

        // 32,768 / 1,024 = 32 layers per piece → ceil(260 / 32) = 9 pieces.
        assert_eq!(pieces.len(), 9);
        assert_eq!(pieces[0].height(), 32);
        assert_eq!(pieces[8].height(), 4);
        assert!(pieces.windows(2).all(|w| w[0].min.y < w[1].min.y));
    }

    #[test]
    fn test_row_major_order() {
        let bounds = cube(0, 0, 0, 4, 1, 4);
        let pieces = plan_fill(&bounds, 2, 100).unwrap();
        let origins: Vec<_> = pieces.iter().map(|p| (p.min.x, p.min.z)).collect();
        assert_eq!(origins, vec![(0, 0), (2, 0), (0, 2), (2, 2)]);
    }

    #[test]
    fn test_side_limited_by_element_limit() {
        let bounds = cube(0, 0, 0, 20, 1, 20);
        let pieces = plan_fill(&bounds, 64, 25).unwrap();
        assert!(pieces.iter().all(|p| p.width() <= 5 && p.depth() <= 5));
        assert_eq!(pieces.len(), 16);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let inverted = Bounds::new(BlockPos::new(5, 0, 0), BlockPos::new(0, 0, 0));
        assert!(matches!(
            plan_fill(&inverted, 32, 100),
            Err(PlanError::InvalidBounds(_))
        ));
        assert_eq!(
            plan_fill(&cube(0, 0, 0, 2, 2, 2), 0, 100),
            Err(PlanError::ZeroChunkSize)
        );
        assert_eq!(
            plan_fill(&cube(0, 0, 0, 2, 2, 2), 4, 0),
            Err(PlanError::ZeroLimit)
        );
    }

    #[test]
    fn test_128_square_with_32_chunks() {
        let area = Area::new(0, 0, 127, 127);
        let plans = plan_chunks(&area, YRange::new(60, 319), 32).unwrap();

        assert_eq!(plans.len(), 16);
        assert_eq!(plans[0].bounds.to_string(), "0 60 0 31 319 31");
        assert_eq!((plans[1].origin_x, plans[1].origin_z), (32, 0));
        assert_eq!((plans[4].origin_x, plans[4].origin_z), (0, 32));
        assert!(plans.iter().enumerate().all(|(i, p)| p.index == i));
    }

    #[test]
    fn test_uneven_area_truncates_edges() {
        let area = Area::new(-10, -10, 10, 5);
        let plans = plan_chunks(&area, YRange::new(0, 0), 8).unwrap();

        // width 21 → 3 columns, depth 16 → 2 rows
        assert_eq!(plans.len(), 6);
        assert_eq!(plans[2].bounds.max.x, 10);
        assert_eq!(plans[2].bounds.width(), 5);
    }

    #[test]
    fn test_inverted_area_rejected() {
        let area = Area::new(10, 0, 0, 10);
        assert!(plan_chunks(&area, YRange::new(0, 10), 8).is_err());
        let area = Area::new(0, 0, 10, 10);
        assert!(plan_chunks(&area, YRange::new(10, 0), 8).is_err());
    }

    proptest! {
        #[test]
        fn prop_fill_pieces_tile_exactly(
            x in -50i32..50,
            y in -64i32..64,
            z in -50i32..50,
            w in 1i32..16,
            h in 1i32..16,
            d in 1i32..16,
            chunk in 1u32..16,
            max in 1u64..3000,
        ) {
            let bounds = cube(x, y, z, w, h, d);
            let pieces = plan_fill(&bounds, chunk, max).unwrap();

            let mut covered = HashSet::new();
            for piece in &pieces {
                prop_assert!(piece.volume() <= max);
                prop_assert!(piece.volume() > 0);
                for bx in piece.min.x..=piece.max.x {
                    for by in piece.min.y..=piece.max.y {
                        for bz in piece.min.z..=piece.max.z {
                            let pos = BlockPos::new(bx, by, bz);
                            prop_assert!(bounds.contains(pos));
                            prop_assert!(covered.insert(pos), "block {} covered twice", pos);
                        }
                    }
                }
            }
            prop_assert_eq!(covered.len() as u64, bounds.volume());
        }

        #[test]
        fn prop_chunk_plans_tile_exactly(
            x in -100i32..100,
            z in -100i32..100,
            w in 1i32..150,
            d in 1i32..150,
            chunk in 1u32..40,
        ) {
            let area = Area::new(x, z, x + w - 1, z + d - 1);
            let y = YRange::new(0, 3);
            let plans = plan_chunks(&area, y, chunk).unwrap();

            let c = chunk as usize;
            let expected = (w as usize).div_ceil(c) * (d as usize).div_ceil(c);
            prop_assert_eq!(plans.len(), expected);

            let total: u64 = plans.iter().map(|p| p.bounds.volume()).sum();
            prop_assert_eq!(total, area.bounds(y).volume());
            prop_assert!(plans.iter().all(|p| p.bounds.width() <= chunk as u64
                && p.bounds.depth() <= chunk as u64));
        }
    }
}
