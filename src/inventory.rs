//! Class counting and expected-inventory comparison.

use std::collections::HashMap;

use crate::error::DetectorError;
use crate::DetectionResult;

/// Occurrence count per class name within one frame's detections.
pub type InventoryCount = HashMap<String, usize>;

/// Positive shortfall (needed − present) per class name. An absent key
/// means sufficiency.
pub type InventoryDelta = HashMap<String, usize>;

/// Resolve a class id against the catalog.
pub fn class_name<'a>(catalog: &'a [String], class_id: usize) -> Result<&'a str, DetectorError> {
    catalog
        .get(class_id)
        .map(String::as_str)
        .ok_or(DetectorError::UnknownClass {
            class_id,
            catalog_len: catalog.len(),
        })
}

/// Count detected objects per resolved class name.
pub fn count_classes(
    result: &DetectionResult,
    catalog: &[String],
) -> Result<InventoryCount, DetectorError> {
    let mut counts = InventoryCount::new();
    for bbox in result.bboxes() {
        let name = class_name(catalog, bbox.class_id())?;
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Compare current counts against the needed inventory. Returns the
/// per-class shortfall and whether anything at all is missing.
pub fn diff_inventory(
    current: &InventoryCount,
    needed: &InventoryCount,
) -> (InventoryDelta, bool) {
    let mut missing = InventoryDelta::new();
    for (item, &needed_amount) in needed {
        let current_amount = current.get(item).copied().unwrap_or(0);
        if current_amount < needed_amount {
            missing.insert(item.clone(), needed_amount - current_amount);
        }
    }
    let deficient = !missing.is_empty();
    (missing, deficient)
}

/// Indices of results where nothing was detected, in input order.
pub fn find_empty_frames(results: &[DetectionResult]) -> Vec<usize> {
    results
        .iter()
        .enumerate()
        .filter(|(_, analysis)| analysis.is_empty())
        .map(|(index, _)| index)
        .collect()
}

/// Count frames of sustained absence: a frame counts when the item is
/// missing there and was already missing in the frame before (the frame
/// before the sequence counts as missing).
pub fn absence_count(found_flags: &[bool]) -> usize {
    let mut prev_found = false;
    let mut count = 0;
    for &found in found_flags {
        if !found && !prev_found {
            count += 1;
        }
        prev_found = found;
    }
    count
}
