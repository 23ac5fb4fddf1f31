//! Packing-engine scenarios: shelf-like rows, valley nesting, rollover,
//! optimize reordering and the cross-mode invariants.

mod common;

use common::{machine, sized};
use gangsheet::model::{Machine, MarginSettings, PackMode, SizedItem};
use gangsheet::packing::{PackResult, Packer};

fn pack(items: &[SizedItem], mode: PackMode) -> PackResult {
    Packer::new(machine(), MarginSettings::default()).pack(items, mode).unwrap()
}

fn flat_positions(result: &PackResult) -> Vec<u32> {
    result
        .bases
        .iter()
        .flat_map(|b| b.placements.iter().map(|p| p.picklist_position))
        .collect()
}

#[test]
fn ten_identical_items_fill_two_rows() {
    let _ = env_logger::builder().is_test(true).try_init();
    let items: Vec<SizedItem> = (1..=10).map(|i| sized(i as u64, i, 100.0, 70.0)).collect();
    let result = pack(&items, PackMode::Sequence);

    assert_eq!(result.bases.len(), 1);
    let base = &result.bases[0];
    assert_eq!(base.placements.len(), 10);

    // First five across the top row, next five one row down.
    for (i, p) in base.placements.iter().enumerate() {
        let expected_x = 20.0 + 110.0 * (i % 5) as f64;
        let expected_y = if i < 5 { 20.0 } else { 100.0 };
        assert!((p.x_mm - expected_x).abs() < 1e-6, "item {i}: x={}", p.x_mm);
        assert!((p.y_mm - expected_y).abs() < 1e-6, "item {i}: y={}", p.y_mm);
    }
    assert!((base.length_mm - 170.0).abs() < 1e-6);
}

#[test]
fn shorter_items_nest_into_skyline_valleys() {
    let mut items: Vec<SizedItem> = (1..=4).map(|i| sized(i as u64, i, 100.0, 70.0)).collect();
    items.extend((5..=7).map(|i| sized(i as u64, i, 100.0, 60.0)));
    let result = pack(&items, PackMode::Sequence);

    assert_eq!(result.bases.len(), 1);
    let base = &result.bases[0];

    // The first 60 mm item shares the top row beside the 70 mm column...
    let p5 = &base.placements[4];
    assert_eq!((p5.x_mm, p5.y_mm), (460.0, 20.0));
    // ...and the second nests into the valley it leaves, above the row line
    // a shelf packer would have used (y = 100).
    let p6 = &base.placements[5];
    assert_eq!((p6.x_mm, p6.y_mm), (460.0, 90.0));

    // Strict picklist order is preserved even while nesting.
    assert_eq!(flat_positions(&result), vec![1, 2, 3, 4, 5, 6, 7]);
    assert!((base.length_mm - 160.0).abs() < 1e-6);
}

#[test]
fn thirty_items_fit_one_tall_base() {
    let items: Vec<SizedItem> = (1..=30).map(|i| sized(i as u64, i, 100.0, 150.0)).collect();
    let result = pack(&items, PackMode::Sequence);

    // Five per row, 160 mm row pitch: all thirty land on a single base.
    assert_eq!(result.bases.len(), 1);
    assert_eq!(result.placement_count(), 30);
    for (i, p) in result.bases[0].placements.iter().enumerate() {
        let expected_x = 20.0 + 110.0 * (i % 5) as f64;
        let expected_y = 20.0 + 160.0 * (i / 5) as f64;
        assert!((p.x_mm - expected_x).abs() < 1e-6);
        assert!((p.y_mm - expected_y).abs() < 1e-6);
    }
}

#[test]
fn short_machine_rolls_over_in_order() {
    // Two 150 mm rows fit in 500 mm (20+150+10+150+20 = 350; a third row
    // would need 510), so ten items per base.
    let short = Machine { usable_width_mm: 600.0, max_length_mm: 500.0, min_dpi: 300.0 };
    let packer = Packer::new(short, MarginSettings::default());
    let items: Vec<SizedItem> = (1..=30).map(|i| sized(i as u64, i, 100.0, 150.0)).collect();
    let result = packer.pack(&items, PackMode::Sequence).unwrap();

    assert_eq!(result.bases.len(), 3);
    assert_eq!(result.bases.iter().map(|b| b.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(result.bases.iter().all(|b| b.placements.len() == 10));
    // Sequence mode: the flat concatenation follows picklist order exactly.
    assert_eq!(flat_positions(&result), (1..=30).collect::<Vec<_>>());
}

#[test]
fn optimize_mode_places_largest_first() {
    let items = vec![
        sized(1, 1, 100.0, 200.0),
        sized(2, 2, 100.0, 100.0),
        sized(3, 3, 100.0, 50.0),
        sized(4, 4, 100.0, 50.0),
        sized(5, 5, 100.0, 100.0),
    ];
    let result = pack(&items, PackMode::Optimize);

    assert_eq!(result.bases.len(), 1);
    // Commit order: by descending area, equal areas by position.
    assert_eq!(flat_positions(&result), vec![1, 2, 5, 3, 4]);

    let placements = &result.bases[0].placements;
    // The 200 mm item anchors the corner; everything else lines up beside it
    // on the same row since the width allows five 100 mm columns.
    assert_eq!((placements[0].x_mm, placements[0].y_mm), (20.0, 20.0));
    for (i, p) in placements.iter().enumerate() {
        assert!((p.x_mm - (20.0 + 110.0 * i as f64)).abs() < 1e-6);
        assert_eq!(p.y_mm, 20.0);
    }
    // Audit fields survive the reorder.
    assert_eq!(placements[2].picklist_position, 5);
}

#[test]
fn full_width_item_occupies_its_own_row() {
    let items = vec![
        sized(1, 1, 560.0, 100.0),
        sized(2, 2, 100.0, 50.0),
        sized(3, 3, 560.0, 100.0),
    ];
    let result = pack(&items, PackMode::Sequence);

    assert_eq!(result.bases.len(), 1);
    let p = &result.bases[0].placements;
    assert_eq!((p[0].x_mm, p[0].y_mm), (20.0, 20.0));
    assert_eq!((p[1].x_mm, p[1].y_mm), (20.0, 130.0));
    assert_eq!((p[2].x_mm, p[2].y_mm), (20.0, 190.0));
}

#[test]
fn single_base_height_boundary() {
    // 2460 mm tall fills the base exactly.
    let result = pack(&[sized(1, 1, 100.0, 2460.0)], PackMode::Sequence);
    assert_eq!(result.bases.len(), 1);
    assert_eq!(result.bases[0].placements[0].y_mm, 20.0);
    assert!((result.bases[0].length_mm - 2480.0).abs() < 1e-6);

    // One micrometer taller cannot be placed at all.
    let err = Packer::new(machine(), MarginSettings::default())
        .pack(&[sized(1, 1, 100.0, 2460.001)], PackMode::Sequence)
        .unwrap_err();
    assert_eq!(err.code(), "ITEM_EXCEEDS_BASE");
}

#[test]
fn invariants_hold_across_modes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let margins = MarginSettings::default();
    let items: Vec<SizedItem> = (1..=40)
        .map(|i| {
            let w = 50.0 + ((i * 37) % 300) as f64;
            let h = 30.0 + ((i * 53) % 400) as f64;
            sized(i as u64, i as u32, w, h)
        })
        .collect();

    for mode in [PackMode::Sequence, PackMode::Optimize] {
        let result = pack(&items, mode);

        // Completeness.
        assert_eq!(result.placement_count(), items.len());

        for base in &result.bases {
            // Utilization bounds.
            assert!(base.utilization > 0.0 && base.utilization <= 1.0);

            for p in &base.placements {
                // Boundary respect.
                assert!(p.x_mm >= 20.0 - 1e-6);
                assert!(p.x_mm + p.width_mm <= 600.0 - 20.0 + 1e-6);
                assert!(p.y_mm >= 20.0 - 1e-6);
                assert!(p.y_mm + p.height_mm <= 2500.0 - 20.0 + 1e-6);
                assert!(!p.rotated);
            }

            // No overlap under half-margin inflation.
            for (i, a) in base.placements.iter().enumerate() {
                for b in &base.placements[i + 1..] {
                    let ia = a.rect().inflate(margins.inter_item_mm / 2.0);
                    let ib = b.rect().inflate(margins.inter_item_mm / 2.0);
                    assert!(!ia.intersects(&ib), "overlap on base {}", base.index);
                }
            }
        }
        assert!(result.avg_utilization() <= 1.0);

        // Determinism: a second run reproduces every coordinate.
        let again = pack(&items, mode);
        assert_eq!(again.bases.len(), result.bases.len());
        for (b1, b2) in result.bases.iter().zip(again.bases.iter()) {
            for (p1, p2) in b1.placements.iter().zip(b2.placements.iter()) {
                assert_eq!((p1.item_id, p1.x_mm, p1.y_mm), (p2.item_id, p2.x_mm, p2.y_mm));
            }
        }
    }
}

#[test]
fn sequence_mode_keeps_picklist_order_across_bases() {
    let short = Machine { usable_width_mm: 600.0, max_length_mm: 400.0, min_dpi: 300.0 };
    let packer = Packer::new(short, MarginSettings::default());
    let items: Vec<SizedItem> = (1..=12).map(|i| sized(i as u64, i, 250.0, 150.0)).collect();
    let result = packer.pack(&items, PackMode::Sequence).unwrap();

    assert!(result.bases.len() > 1);
    assert_eq!(flat_positions(&result), (1..=12).collect::<Vec<_>>());
}
