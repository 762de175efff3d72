//! CLI output formatting.
//!
//! Every formatter returns `Vec<String>` so tests can assert on exact lines;
//! the `print_*` wrappers just write them to stdout. Diagnostics go through
//! `tracing` on stderr and never mix with this output.
//!
//! # Output Format
//!
//! ## Formats
//!
//! ```text
//! Read
//!     bmp, gif, jpeg, jpg, png, tif, tiff, webp
//!     image/bmp  image-rs
//!     image/webp  image-webp
//! Write
//!     avif, bmp, gif, jpeg, jpg, png, tif, tiff, webp
//!     image/avif  image-rs
//! Deactivated
//!     decode image/webp: image-rs (kept image-webp)
//! ```
//!
//! ## Thumbnails
//!
//! ```text
//! cover.png → cover.png.jpg: encoded
//! vol1/p001.jpeg → vol1/p001.jpeg: unchanged
//! broken.jpg: failed
//!     Decode failed for image/jpeg: ...
//! 1 encoded, 1 unchanged, 1 failed
//! ```

use crate::batch::{BatchEvent, BatchSummary, ThumbnailStatus};
use crate::imaging::{CodecRegistry, Deactivation, Dimensions, EncodedImage};
use serde::Serialize;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn provider_lines(registry: &CodecRegistry, media_types: &[String], decode: bool) -> Vec<String> {
    media_types
        .iter()
        .filter_map(|m| {
            let provider = if decode {
                registry.decoder_for(m)
            } else {
                registry.encoder_for(m)
            };
            provider.map(|p| format!("{}{}  {}", indent(1), m, p.identity()))
        })
        .collect()
}

fn deactivation_line(d: &Deactivation) -> String {
    format!(
        "{}{} {}: {} (kept {})",
        indent(1),
        d.direction,
        d.media_type,
        d.identity,
        d.kept
    )
}

/// Human-readable codec inventory.
pub fn format_inventory(registry: &CodecRegistry) -> Vec<String> {
    let mut lines = vec!["Read".to_string()];
    lines.push(format!("{}{}", indent(1), registry.readable_formats().join(", ")));
    lines.extend(provider_lines(registry, registry.readable_media_types(), true));

    lines.push("Write".to_string());
    lines.push(format!("{}{}", indent(1), registry.writable_formats().join(", ")));
    lines.extend(provider_lines(registry, registry.writable_media_types(), false));

    if !registry.deactivated().is_empty() {
        lines.push("Deactivated".to_string());
        lines.extend(registry.deactivated().iter().map(deactivation_line));
    }
    lines
}

pub fn print_inventory(registry: &CodecRegistry) {
    for line in format_inventory(registry) {
        println!("{}", line);
    }
}

#[derive(Debug, Serialize)]
struct InventoryJson<'a> {
    readable_formats: &'a [String],
    readable_media_types: &'a [String],
    writable_formats: &'a [String],
    writable_media_types: &'a [String],
    deactivated: Vec<DeactivationJson<'a>>,
}

#[derive(Debug, Serialize)]
struct DeactivationJson<'a> {
    media_type: &'a str,
    direction: String,
    provider: &'a str,
    kept: &'a str,
}

/// Codec inventory as pretty-printed JSON.
pub fn inventory_json(registry: &CodecRegistry) -> serde_json::Result<String> {
    let inventory = InventoryJson {
        readable_formats: registry.readable_formats(),
        readable_media_types: registry.readable_media_types(),
        writable_formats: registry.writable_formats(),
        writable_media_types: registry.writable_media_types(),
        deactivated: registry
            .deactivated()
            .iter()
            .map(|d| DeactivationJson {
                media_type: &d.media_type,
                direction: d.direction.to_string(),
                provider: &d.identity,
                kept: &d.kept,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&inventory)
}

/// One-line answer for `can-convert`.
pub fn format_can_convert(from: &str, to: &str, possible: bool) -> String {
    let verdict = if possible { "yes" } else { "no" };
    format!("{} → {}: {}", from, to, verdict)
}

/// Probe result for a single file.
pub fn format_probe(name: &str, media_type: &str, dims: Option<Dimensions>) -> Vec<String> {
    let dims = dims.map_or_else(|| "unknown".to_string(), |d| d.to_string());
    vec![
        name.to_string(),
        format!("{}Type: {}", indent(1), media_type),
        format!("{}Size: {}", indent(1), dims),
    ]
}

/// Result line for a single `convert` or `resize` call.
pub fn format_written(target: &str, image: &EncodedImage, unchanged: bool) -> String {
    let action = if unchanged { "unchanged" } else { "encoded" };
    format!(
        "{}: {} ({}, {} bytes)",
        target,
        action,
        image.media_type(),
        image.len()
    )
}

/// Format a batch progress event.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    let source = event.source.display();
    match (&event.status, &event.output) {
        (ThumbnailStatus::Failed(reason), _) => {
            vec![
                format!("{}: failed", source),
                format!("{}{}", indent(1), reason),
            ]
        }
        (status, Some(output)) => {
            let label = match status {
                ThumbnailStatus::Unchanged => "unchanged",
                _ => "encoded",
            };
            vec![format!("{} → {}: {}", source, output.display(), label)]
        }
        (_, None) => vec![format!("{}: no output", source)],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> String {
    summary.to_string()
}
