//! Public-API tests for the inventory operations that need no model file.

use std::collections::HashMap;

use image::{Rgb, RgbImage};
use inventory_vision::{
    absence_count, annotate, diff_inventory, find_empty_frames, Bbox, DetectionResult, DrawStyle,
};

fn catalog() -> Vec<String> {
    vec![
        "pink-clip".to_string(),
        "screw".to_string(),
        "bolt".to_string(),
    ]
}

fn counts(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
    pairs
        .iter()
        .map(|&(name, n)| (name.to_string(), n))
        .collect()
}

#[test]
fn empty_frame_counts_nothing_and_is_reported_empty() {
    let results = vec![
        DetectionResult::new(0.0, vec![]),
        DetectionResult::new(40.0, vec![Bbox::new(5.0, 5.0, 10.0, 10.0, 2, 0.8)]),
    ];

    let counted = inventory_vision::inventory::count_classes(&results[0], &catalog()).unwrap();
    assert!(counted.is_empty());
    assert_eq!(find_empty_frames(&results), vec![0]);
}

#[test]
fn diff_inventory_spec_cases() {
    let (missing, deficient) = diff_inventory(&counts(&[]), &counts(&[("bolt", 3)]));
    assert_eq!(missing, counts(&[("bolt", 3)]));
    assert!(deficient);

    let (missing, deficient) = diff_inventory(&counts(&[("bolt", 5)]), &counts(&[("bolt", 3)]));
    assert!(missing.is_empty());
    assert!(!deficient);
}

#[test]
fn sufficiency_holds_iff_every_needed_amount_is_met() {
    let needed = counts(&[("bolt", 2), ("screw", 1)]);

    let (_, deficient) = diff_inventory(&counts(&[("bolt", 2), ("screw", 1)]), &needed);
    assert!(!deficient);

    let (missing, deficient) = diff_inventory(&counts(&[("bolt", 2)]), &needed);
    assert!(deficient);
    assert_eq!(missing, counts(&[("screw", 1)]));
}

#[test]
fn annotating_sequence_counts_sustained_absence() {
    let style = DrawStyle::default();
    let results = vec![
        DetectionResult::new(0.0, vec![Bbox::new(10.0, 10.0, 10.0, 10.0, 1, 0.9)]),
        DetectionResult::new(40.0, vec![]),
        DetectionResult::new(80.0, vec![]),
    ];

    let mut flags = Vec::new();
    for result in &results {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        flags.push(annotate::annotate_item(&mut img, result, &catalog(), "screw", &style).unwrap());
    }

    assert_eq!(flags, vec![true, false, false]);
    // Only the second consecutive miss counts as sustained absence.
    assert_eq!(absence_count(&flags), 1);
}

#[test]
fn snapshot_legend_has_one_entry_per_unique_pair() {
    let style = DrawStyle::default();
    let result = DetectionResult::new(
        0.0,
        vec![
            Bbox::new(10.0, 10.0, 5.0, 5.0, 0, 0.9),
            Bbox::new(20.0, 20.0, 5.0, 5.0, 0, 0.9),
            Bbox::new(30.0, 30.0, 5.0, 5.0, 0, 0.9),
            Bbox::new(40.0, 40.0, 5.0, 5.0, 2, 0.9),
        ],
    );

    let entries = annotate::legend_entries(&result, &catalog(), &style).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1, "pink-clip");
    assert_eq!(entries[1].1, "bolt");
}

#[test]
fn snapshot_roundtrip_via_public_surface() {
    let style = DrawStyle::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report").join("locations.png");

    let result = DetectionResult::new(0.0, vec![Bbox::new(8.0, 8.0, 4.0, 4.0, 1, 0.7)]);
    annotate::save_snapshot((32, 32), &result, &catalog(), &style, &path).unwrap();

    assert!(path.is_file());
    let written = image::open(&path).unwrap().into_rgb8();
    assert_eq!(written.dimensions(), (52, 52));
}
