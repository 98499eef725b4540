use collage_core::layout::{canvas_size, place, plan_overlays, TILE_HEIGHT, TILE_WIDTH};
use collage_store::ArtifactId;
use proptest::prelude::*;

#[test]
fn scenario_table() {
    // (index, total_overlays) -> (x, y)
    let table = [
        ((0, 1), (400, 0)),
        ((0, 2), (400, 0)),
        ((1, 2), (0, 400)),
        ((0, 3), (400, 0)),
        ((1, 3), (0, 400)),
        ((2, 3), (400, 400)),
        ((3, 4), (0, 800)),
    ];

    for ((index, total), expected) in table {
        let p = place(index, total);
        assert_eq!((p.x, p.y), expected, "place({index}, {total})");
    }
}

proptest! {
    #[test]
    fn prop_placement_ignores_total(index in 0..64usize, a in 0..64usize, b in 0..64usize) {
        prop_assert_eq!(place(index, a), place(index, b));
    }

    #[test]
    fn prop_column_repeats_every_two(index in 0..64usize) {
        prop_assert_eq!(place(index, 0).x, place(index + 2, 0).x);
    }

    #[test]
    fn prop_row_steps_by_one_tile(index in 0..64usize) {
        let here = place(index, 0);
        let next = place(index + 2, 0);
        prop_assert!(here.y <= next.y);
        prop_assert_eq!(next.y - here.y, TILE_HEIGHT);
    }

    #[test]
    fn prop_tiles_never_overlap_or_cover_base(total in 1..32usize) {
        let mut cells: Vec<(u32, u32)> = vec![(0, 0)];
        for index in 0..total {
            let p = place(index, total);
            prop_assert!(!cells.contains(&(p.x, p.y)));
            cells.push((p.x, p.y));
        }
    }

    #[test]
    fn prop_plan_fits_canvas(total in 0..32usize) {
        let ids: Vec<ArtifactId> = (0..total).map(|i| ArtifactId::new(format!("a{i}"))).collect();
        let (width, height) = canvas_size(total);
        for directive in plan_overlays(&ids) {
            prop_assert!(directive.right() <= width);
            prop_assert!(directive.bottom() <= height);
            prop_assert_eq!(directive.tile_width, TILE_WIDTH);
        }
    }
}
