//! Grid layout planner
//!
//! Maps an overlay's position in the batch to a pixel offset in a fixed
//! 2-column grid of 400x400 tiles, filled left-to-right, top-to-bottom.
//!
//! The base canvas occupies grid cell 0 (top-left). Overlay `i` occupies cell
//! `i + 1`, so even overlay indices land in the right column and odd ones in
//! the left column of the next row:
//!
//! ```text
//! +--------+--------+
//! |  base  |   o0   |   y = 0
//! +--------+--------+
//! |   o1   |   o2   |   y = 400
//! +--------+--------+
//! |   o3   |   o4   |   y = 800
//! +--------+--------+
//! ```
//!
//! Pure and deterministic: no state, no I/O.

use collage_store::{ArtifactId, OverlayDirective};

/// Tile width in pixels
pub const TILE_WIDTH: u32 = 400;

/// Tile height in pixels
pub const TILE_HEIGHT: u32 = 400;

/// Tiles per row
pub const GRID_COLUMNS: usize = 2;

/// Grid cell held by the base canvas
pub const BASE_CELL: usize = 0;

/// X offset of the left column
pub const LEFT_SLOT_X: u32 = 0;

/// X offset of the right column
pub const RIGHT_SLOT_X: u32 = TILE_WIDTH;

/// Column offsets indexed by `cell % GRID_COLUMNS`
pub const COLUMN_SLOTS: [u32; GRID_COLUMNS] = [LEFT_SLOT_X, RIGHT_SLOT_X];

/// Where one overlay lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Grid column (0 = left)
    pub column: usize,
    /// Grid row (0 = top)
    pub row: usize,
    /// Horizontal pixel offset
    pub x: u32,
    /// Vertical pixel offset
    pub y: u32,
}

/// Place overlay `index` of a batch with `total_overlays` overlays
///
/// The result depends only on `index`; `total_overlays` is accepted so call
/// sites read naturally and never changes the outcome.
#[must_use]
pub fn place(index: usize, total_overlays: usize) -> Placement {
    let _ = total_overlays;
    let cell = BASE_CELL + 1 + index;
    let column = cell % GRID_COLUMNS;
    let row = cell / GRID_COLUMNS;

    Placement {
        column,
        row,
        x: COLUMN_SLOTS[column],
        y: u32::try_from(row).map_or(u32::MAX, |r| r.saturating_mul(TILE_HEIGHT)),
    }
}

/// Canvas extent once the base and `total_overlays` tiles are drawn
#[must_use]
pub fn canvas_size(total_overlays: usize) -> (u32, u32) {
    let cells = total_overlays + 1;
    let columns = cells.min(GRID_COLUMNS);
    let rows = cells.div_ceil(GRID_COLUMNS);

    let scale = |count: usize, tile: u32| {
        u32::try_from(count).map_or(u32::MAX, |c| c.saturating_mul(tile))
    };
    (scale(columns, TILE_WIDTH), scale(rows, TILE_HEIGHT))
}

/// Build the overlay directives for `sources`, in batch order
#[must_use]
pub fn plan_overlays(sources: &[ArtifactId]) -> Vec<OverlayDirective> {
    let total = sources.len();
    sources
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let placement = place(index, total);
            OverlayDirective::scaled(
                id.clone(),
                (TILE_WIDTH, TILE_HEIGHT),
                (placement.x, placement.y),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_store::{Anchor, ScaleMode};

    /// Row count computed the long way: pair up the overlays before `index`
    /// behind a leading placeholder and count the complete pairs.
    fn windowed_rows_before(index: usize) -> usize {
        let before: Vec<usize> = (0..index).collect();
        let mut padded = vec![None];
        padded.extend(before.iter().copied().map(Some));

        before
            .iter()
            .enumerate()
            .filter(|(k, _)| k % 2 == 0)
            .filter(|(k, _)| padded[*k..(*k + 2).min(padded.len())].len() == 2)
            .count()
    }

    #[test]
    fn placement_table() {
        let table = [
            (0, 3, (400, 0)),
            (1, 3, (0, 400)),
            (2, 3, (400, 400)),
            (3, 4, (0, 800)),
            (4, 5, (400, 800)),
        ];

        for (index, total, expected) in table {
            let p = place(index, total);
            assert_eq!((p.x, p.y), expected, "index {index}");
        }
    }

    #[test]
    fn even_indices_take_the_right_slot() {
        assert_eq!(place(0, 1).x, RIGHT_SLOT_X);
        assert_eq!(place(1, 2).x, LEFT_SLOT_X);
        assert_eq!(place(0, 1).column, 1);
        assert_eq!(place(1, 2).column, 0);
    }

    #[test]
    fn closed_form_matches_windowed_reduction() {
        for total in 1..=8 {
            for index in 0..total {
                assert_eq!(
                    place(index, total).row,
                    windowed_rows_before(index),
                    "index {index} of {total}"
                );
            }
        }
    }

    #[test]
    fn floor_half_would_cover_the_base() {
        let index = 1;
        let floor_row = index / 2;
        let placed = place(index, 2);

        // floor(i / 2) puts overlay 1 at (0, 0), the base's own cell
        assert_eq!((placed.x, floor_row), (LEFT_SLOT_X, 0));
        assert_ne!(floor_row, windowed_rows_before(index));
        assert_eq!((placed.x, placed.y), (0, 400));
    }

    #[test]
    fn canvas_sizes() {
        assert_eq!(canvas_size(0), (400, 400));
        assert_eq!(canvas_size(1), (800, 400));
        assert_eq!(canvas_size(2), (800, 800));
        assert_eq!(canvas_size(3), (800, 800));
        assert_eq!(canvas_size(4), (800, 1200));
    }

    #[test]
    fn plan_preserves_order_and_fixed_tile() {
        let ids: Vec<ArtifactId> = ["a", "b", "c"].into_iter().map(ArtifactId::new).collect();
        let plan = plan_overlays(&ids);

        assert_eq!(plan.len(), 3);
        for (directive, id) in plan.iter().zip(&ids) {
            assert_eq!(&directive.reference_id, id);
            assert_eq!((directive.tile_width, directive.tile_height), (400, 400));
            assert_eq!(directive.scale_mode, ScaleMode::Scale);
            assert_eq!(directive.anchor, Anchor::TopLeft);
        }
        assert_eq!((plan[1].x, plan[1].y), (0, 400));
    }

    #[test]
    fn empty_plan() {
        assert!(plan_overlays(&[]).is_empty());
    }
}
