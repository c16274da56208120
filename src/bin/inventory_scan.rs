//! Inventory scan over a frame sequence: detect, annotate, diff against an
//! expected inventory, write per-frame snapshots and a results sidecar.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use inventory_vision::{
    diff_inventory, find_empty_frames, Args, DetectionResult, Detector, DrawStyle, ModelConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let class_names: Option<Vec<String>> = read_json_opt(args.names.as_deref())?;
    let expected: Option<HashMap<String, usize>> = read_json_opt(args.expected.as_deref())?;

    let config = ModelConfig {
        model: args.model.clone(),
        conf: args.conf,
        iou: args.iou,
        input_size: args.size,
        class_names,
        cuda: args.cuda,
        device_id: args.device_id,
    };
    let mut detector = Detector::load(&config).context("failed to initialize detector")?;
    if let Some(font) = &args.font {
        detector = detector.with_style(DrawStyle::default().with_font_file(font));
    }

    let frame_paths = collect_frames(&args.source)?;
    if frame_paths.is_empty() {
        bail!("no frames found under {}", args.source.display());
    }

    let run_dir = args
        .out
        .join(format!("scan-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("cannot create output directory {}", run_dir.display()))?;

    info!(
        frames = frame_paths.len(),
        out = %run_dir.display(),
        "starting inventory scan"
    );

    let frame_interval_ms = 1000.0 / args.fps;
    let mut results: Vec<DetectionResult> = Vec::new();

    for (index, path) in frame_paths.iter().enumerate() {
        let frame = match image::open(path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(frame = index, path = %path.display(), error = %e, "unreadable frame; skipping");
                continue;
            }
        };

        let timestamp_ms = index as f64 * frame_interval_ms;
        // Per-frame inference failures are skipped here by policy; the
        // library surfaces them and this loop is where that choice lives.
        let result = match detector.detect_frame(&frame, timestamp_ms) {
            Ok(result) => result,
            Err(e) => {
                warn!(frame = index, error = %e, "inference failed; skipping frame");
                continue;
            }
        };

        let mut annotated = frame.into_rgb8();
        let (counts, total) = detector.annotate_all(&mut annotated, &result)?;
        if let Some(item) = &args.item {
            let found = detector.annotate_item(&mut annotated, &result, item)?;
            info!(frame = index, item = %item, found, "item check");
        }

        let frame_out = run_dir.join(format!("frame_{index:04}.png"));
        annotated
            .save(&frame_out)
            .with_context(|| format!("cannot write {}", frame_out.display()))?;
        detector.save_snapshot(
            annotated.dimensions(),
            &result,
            &run_dir.join(format!("locations_{index:04}.png")),
        )?;

        info!(frame = index, total, "frame processed");
        if let Some(needed) = &expected {
            let (missing, deficient) = diff_inventory(&counts, needed);
            if deficient {
                warn!(frame = index, ?missing, "inventory shortfall");
            }
        }

        results.push(result);
    }

    let empty = find_empty_frames(&results);
    if !empty.is_empty() {
        info!(frames = ?empty, "frames with no detections");
    }

    let sidecar = run_dir.join("results.json");
    serde_json::to_writer_pretty(
        File::create(&sidecar).with_context(|| format!("cannot create {}", sidecar.display()))?,
        &results,
    )?;
    info!(path = %sidecar.display(), "scan complete");

    Ok(())
}

fn read_json_opt<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Option<T>> {
    let Some(path) = path else { return Ok(None) };
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let value = serde_json::from_reader(file)
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    Ok(Some(value))
}

/// A single image file, or every image in a directory in name order.
fn collect_frames(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        bail!("frame source {} does not exist", source.display());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(source)
        .with_context(|| format!("cannot read {}", source.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
                    .as_deref(),
                Some("png" | "jpg" | "jpeg" | "bmp")
            )
        })
        .collect();
    paths.sort();
    Ok(paths)
}
