//! Frame overlays and report snapshots.
//!
//! All drawing mutates the caller's image in place. Label text uses a
//! built-in monospace font; a TTF/OTF file can override it.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::warn;

use crate::error::DetectorError;
use crate::inventory::{self, InventoryCount};
use crate::DetectionResult;

const BANNER_X: i32 = 4;
const BANNER_Y_TOP: i32 = 8;
const BANNER_Y_BOTTOM: i32 = 32;

const LEGEND_X: i32 = 5;
const LEGEND_Y: i32 = 10;
const LEGEND_LINE_HEIGHT: i32 = 14;
const SNAPSHOT_BORDER: u32 = 10;

/// Overlay styling owned by the detector. Replaces ad-hoc global
/// constants with one immutable value.
pub struct DrawStyle {
    palette: Vec<Rgb<u8>>,
    font: FontArc,
    pub marker_size: i32,
    pub line_thickness: i32,
    pub font_scale: f32,
    /// Banner text color.
    pub banner_color: Rgb<u8>,
    /// Marker color for single-item highlighting.
    pub highlight_color: Rgb<u8>,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            palette: vec![
                Rgb([255, 192, 203]), // pink
                Rgb([0, 255, 255]),   // cyan
                Rgb([255, 0, 255]),   // magenta
                Rgb([255, 255, 0]),   // yellow
                Rgb([255, 165, 0]),   // orange
                Rgb([0, 255, 0]),     // green
                Rgb([255, 0, 0]),     // red
                Rgb([0, 0, 255]),     // blue
                Rgb([128, 0, 128]),   // purple
                Rgb([165, 42, 42]),   // brown
            ],
            font: FontArc::try_from_slice(include_bytes!("../assets/DejaVuSansMono.ttf"))
                .expect("embedded font is valid"),
            marker_size: 6,
            line_thickness: 2,
            font_scale: 16.0,
            banner_color: Rgb([0, 0, 0]),
            highlight_color: Rgb([0, 255, 0]),
        }
    }
}

impl DrawStyle {
    /// Load an overlay font from a TTF/OTF file. Keeps the built-in font
    /// with a warning when the file is missing or unreadable.
    pub fn with_font_file(mut self, path: &Path) -> Self {
        match std::fs::read(path)
            .ok()
            .and_then(|bytes| FontArc::try_from_vec(bytes).ok())
        {
            Some(font) => self.font = font,
            None => warn!(path = %path.display(), "overlay font not usable; keeping built-in"),
        }
        self
    }

    /// Fixed color per class id. Ids beyond the palette wrap around rather
    /// than fail.
    pub fn color_for(&self, class_id: usize) -> Rgb<u8> {
        self.palette[class_id % self.palette.len()]
    }
}

fn draw_label(img: &mut RgbImage, style: &DrawStyle, x: i32, y: i32, color: Rgb<u8>, text: &str) {
    draw_text_mut(
        img,
        color,
        x.max(0),
        y.max(0),
        PxScale::from(style.font_scale),
        &style.font,
        text,
    );
}

fn label_width(style: &DrawStyle, text: &str) -> i32 {
    text_size(PxScale::from(style.font_scale), &style.font, text).0 as i32
}

/// Thickness is stacked perpendicular to the dominant stroke direction.
fn draw_thick_line(
    img: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: i32,
    color: Rgb<u8>,
) {
    let horizontal = (end.0 - start.0).abs() >= (end.1 - start.1).abs();
    for t in 0..thickness.max(1) {
        let d = t as f32;
        let (dx, dy) = if horizontal { (0.0, d) } else { (d, 0.0) };
        draw_line_segment_mut(
            img,
            (start.0 + dx, start.1 + dy),
            (end.0 + dx, end.1 + dy),
            color,
        );
    }
}

/// Axis-aligned crosshair centered on the object.
fn draw_crosshair(img: &mut RgbImage, style: &DrawStyle, cx: f32, cy: f32, size: i32, color: Rgb<u8>) {
    let s = size as f32;
    draw_thick_line(img, (cx - s, cy), (cx + s, cy), style.line_thickness, color);
    draw_thick_line(img, (cx, cy - s), (cx, cy + s), style.line_thickness, color);
}

/// Diagonal X marker used for single-item highlighting.
fn draw_x_marker(img: &mut RgbImage, style: &DrawStyle, cx: f32, cy: f32, color: Rgb<u8>) {
    let s = style.marker_size as f32;
    draw_thick_line(img, (cx - s, cy - s), (cx + s, cy + s), style.line_thickness, color);
    draw_thick_line(img, (cx - s, cy + s), (cx + s, cy - s), style.line_thickness, color);
}

/// Mark and label every detection of `target`, plus a found / not-found
/// banner. Returns whether the item appeared at all.
pub fn annotate_item(
    img: &mut RgbImage,
    result: &DetectionResult,
    catalog: &[String],
    target: &str,
    style: &DrawStyle,
) -> Result<bool, DetectorError> {
    let mut found = false;
    for bbox in result.bboxes() {
        let name = inventory::class_name(catalog, bbox.class_id())?;
        if name != target {
            continue;
        }
        found = true;
        let (cx, cy) = bbox.cxcy();
        draw_x_marker(img, style, cx, cy, style.highlight_color);
        draw_label(
            img,
            style,
            bbox.xmin() as i32,
            bbox.ymin() as i32 - style.font_scale as i32,
            style.highlight_color,
            name,
        );
    }

    let banner = if found {
        format!("Object detection: {target} found")
    } else {
        format!("Object detection: {target} not found")
    };
    draw_label(img, style, BANNER_X, BANNER_Y_BOTTOM, style.banner_color, &banner);

    Ok(found)
}

/// Mark and label every detection, color keyed by class id, with a running
/// total banner. Returns the per-class counts and the grand total.
pub fn annotate_all(
    img: &mut RgbImage,
    result: &DetectionResult,
    catalog: &[String],
    style: &DrawStyle,
) -> Result<(InventoryCount, usize), DetectorError> {
    for bbox in result.bboxes() {
        let color = style.color_for(bbox.class_id());
        let name = inventory::class_name(catalog, bbox.class_id())?;
        let (cx, cy) = bbox.cxcy();

        draw_crosshair(img, style, cx, cy, style.marker_size, color);

        // Center the label over the marker.
        let text_x = cx as i32 - label_width(style, name) / 2;
        let text_y = cy as i32 - 3 * style.marker_size - style.font_scale as i32;
        draw_label(img, style, text_x, text_y, color, name);
    }

    let items = inventory::count_classes(result, catalog)?;
    let total = items.values().sum();

    draw_label(
        img,
        style,
        BANNER_X,
        BANNER_Y_TOP,
        style.banner_color,
        "Performing object detection",
    );
    draw_label(
        img,
        style,
        BANNER_X,
        BANNER_Y_BOTTOM,
        style.banner_color,
        &format!("Items found: {total}"),
    );

    Ok((items, total))
}

/// Unique (color, class name) legend entries for a result, ordered by
/// class id. A class appearing in many boxes yields one entry.
pub fn legend_entries(
    result: &DetectionResult,
    catalog: &[String],
    style: &DrawStyle,
) -> Result<Vec<(Rgb<u8>, String)>, DetectorError> {
    let ids: std::collections::BTreeSet<usize> =
        result.bboxes().iter().map(|b| b.class_id()).collect();

    let mut entries: Vec<(Rgb<u8>, String)> = Vec::new();
    for id in ids {
        let entry = (
            style.color_for(id),
            inventory::class_name(catalog, id)?.to_string(),
        );
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Render an object-location report: a white canvas of the frame's size
/// with a crosshair per detection and a color legend, framed by a black
/// border, written as PNG to `path`.
pub fn save_snapshot(
    dims: (u32, u32),
    result: &DetectionResult,
    catalog: &[String],
    style: &DrawStyle,
    path: &Path,
) -> Result<(), DetectorError> {
    let (width, height) = dims;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    for bbox in result.bboxes() {
        let (cx, cy) = bbox.cxcy();
        // Tight markers: the report shows positions, not extents.
        draw_crosshair(&mut canvas, style, cx, cy, 1, style.color_for(bbox.class_id()));
    }

    for (i, (color, name)) in legend_entries(result, catalog, style)?.iter().enumerate() {
        let y = LEGEND_Y + i as i32 * LEGEND_LINE_HEIGHT;
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(LEGEND_X, y - 6).of_size(10, 8),
            *color,
        );
        draw_label(&mut canvas, style, LEGEND_X + 18, y - 6, *color, name);
    }

    let mut framed = RgbImage::from_pixel(
        width + 2 * SNAPSHOT_BORDER,
        height + 2 * SNAPSHOT_BORDER,
        Rgb([0, 0, 0]),
    );
    image::imageops::replace(
        &mut framed,
        &canvas,
        SNAPSHOT_BORDER as i64,
        SNAPSHOT_BORDER as i64,
    );

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| DetectorError::Snapshot {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })?;
        }
    }
    framed.save(path).map_err(|e| DetectorError::Snapshot {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bbox;

    fn catalog() -> Vec<String> {
        vec!["pink-clip".to_string(), "screw".to_string()]
    }

    fn one_box_result(class_id: usize) -> DetectionResult {
        DetectionResult::new(
            0.0,
            vec![Bbox::new(40.0, 40.0, 20.0, 20.0, class_id, 0.9)],
        )
    }

    #[test]
    fn palette_wraps_for_large_class_ids() {
        let style = DrawStyle::default();
        assert_eq!(style.color_for(0), style.color_for(10));
        assert_eq!(style.color_for(3), style.color_for(23));
    }

    #[test]
    fn annotate_item_absent_target_draws_only_the_banner() {
        let style = DrawStyle::default();
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let found = annotate_item(&mut img, &one_box_result(0), &catalog(), "screw", &style).unwrap();
        assert!(!found);
        // The not-found banner text lands in its own band; everything
        // above and well below stays untouched.
        let white = Rgb([255, 255, 255]);
        assert!(img.enumerate_pixels().any(|(_, _, p)| *p != white));
        assert!(img
            .enumerate_pixels()
            .filter(|(_, y, _)| *y < BANNER_Y_BOTTOM as u32 || *y >= 56)
            .all(|(_, _, p)| *p == white));
    }

    #[test]
    fn annotate_item_marks_present_target() {
        let style = DrawStyle::default();
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let result = DetectionResult::new(
            0.0,
            vec![Bbox::new(40.0, 50.0, 20.0, 20.0, 0, 0.9)],
        );
        let found = annotate_item(&mut img, &result, &catalog(), "pink-clip", &style).unwrap();
        assert!(found);
        // X marker crosses the box center (50, 60).
        assert_eq!(*img.get_pixel(50, 60), style.highlight_color);
    }

    #[test]
    fn annotate_item_surfaces_unknown_class() {
        let style = DrawStyle::default();
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        assert!(annotate_item(&mut img, &one_box_result(9), &catalog(), "screw", &style).is_err());
    }

    #[test]
    fn annotate_all_counts_and_marks() {
        let style = DrawStyle::default();
        let mut img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        // Box centers sit below the banner band and the label rows.
        let result = DetectionResult::new(
            0.0,
            vec![
                Bbox::new(10.0, 60.0, 20.0, 20.0, 0, 0.9),
                Bbox::new(60.0, 60.0, 20.0, 20.0, 0, 0.8),
                Bbox::new(30.0, 70.0, 20.0, 20.0, 1, 0.7),
            ],
        );
        let (items, total) = annotate_all(&mut img, &result, &catalog(), &style).unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.get("pink-clip"), Some(&2));
        assert_eq!(items.get("screw"), Some(&1));
        assert_eq!(*img.get_pixel(20, 70), style.color_for(0));
        assert_eq!(*img.get_pixel(70, 70), style.color_for(0));
        assert_eq!(*img.get_pixel(40, 80), style.color_for(1));
    }

    #[test]
    fn crosshair_arms_are_thick_both_ways() {
        let style = DrawStyle::default();
        let mut img = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
        let color = Rgb([10, 20, 30]);
        draw_crosshair(&mut img, &style, 20.0, 20.0, 6, color);
        // line_thickness 2: the horizontal arm also covers the row below,
        // the vertical arm also covers the column to the right.
        assert_eq!(*img.get_pixel(14, 21), color);
        assert_eq!(*img.get_pixel(21, 14), color);
    }

    #[test]
    fn unreadable_font_file_keeps_builtin_font() {
        let style = DrawStyle::default().with_font_file(Path::new("/no/such/font.ttf"));
        assert!(label_width(&style, "screw") > 0);
    }

    #[test]
    fn legend_deduplicates_repeated_classes() {
        let style = DrawStyle::default();
        let result = DetectionResult::new(
            0.0,
            vec![
                Bbox::new(10.0, 10.0, 5.0, 5.0, 1, 0.9),
                Bbox::new(30.0, 30.0, 5.0, 5.0, 1, 0.8),
                Bbox::new(50.0, 50.0, 5.0, 5.0, 0, 0.7),
            ],
        );
        let entries = legend_entries(&result, &catalog(), &style).unwrap();
        assert_eq!(
            entries,
            vec![
                (style.color_for(0), "pink-clip".to_string()),
                (style.color_for(1), "screw".to_string()),
            ]
        );
    }

    #[test]
    fn snapshot_writes_a_readable_png() {
        let style = DrawStyle::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.png");

        save_snapshot((64, 48), &one_box_result(1), &catalog(), &style, &path).unwrap();

        let written = image::open(&path).unwrap().into_rgb8();
        assert_eq!(written.dimensions(), (64 + 20, 48 + 20));
        // Border corner is black, canvas interior starts white.
        assert_eq!(*written.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*written.get_pixel(12, 12), Rgb([255, 255, 255]));
    }

    #[test]
    fn snapshot_fails_on_unwritable_path() {
        let style = DrawStyle::default();
        let err = save_snapshot(
            (16, 16),
            &one_box_result(0),
            &catalog(),
            &style,
            Path::new("/dev/null/nope/locations.png"),
        );
        assert!(matches!(err, Err(DetectorError::Snapshot { .. })));
    }
}
