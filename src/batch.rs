//! Batch thumbnail generation over a directory tree.
//!
//! Walks a source directory, keeps every file whose extension the registry
//! can read, and runs a bounding-box resize on each one in parallel with
//! [rayon](https://docs.rs/rayon). The converter is shared by reference;
//! each file gets its own buffers, so no locking is involved.
//!
//! ## Output Structure
//!
//! Relative directories are mirrored under the output directory. Images
//! that already fit are copied byte-for-byte under their original name.
//! Re-encoded images keep their name when its extension already belongs to
//! the target format; otherwise the target extension is appended, so
//! `cover.png` and `cover.jpg` never share an output file.
//!
//! ```text
//! library/                     thumbs/
//! ├── cover.png   (2000px) →   ├── cover.png.jpg  encoded
//! ├── cover.jpg   (2000px) →   ├── cover.jpg      encoded
//! └── vol1/                    └── vol1/
//!     └── p001.jpeg (200px) →      └── p001.jpeg  unchanged
//! ```
//!
//! Sources whose possible outputs still collide (a literal `cover.png.jpg`
//! next to `cover.png`) are all failed up front. A failing file is reported
//! and skipped; it never aborts the batch.

use crate::imaging::media::format_names;
use crate::imaging::{
    ConversionOutcome, DimensionProber, EncodedImage, ImageConverter, ImagingError, OutputFormat,
};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] ImagingError),
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailStatus {
    /// Already within the limit; copied as-is.
    Unchanged,
    /// Decoded, shrunk and re-encoded.
    Encoded,
    /// Failed; the message says why.
    Failed(String),
}

/// Progress event, one per source file, sent as soon as the file is done.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    /// Path relative to the source root.
    pub source: PathBuf,
    /// Path relative to the output root, when something was written.
    pub output: Option<PathBuf>,
    pub status: ThumbnailStatus,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub encoded: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, status: &ThumbnailStatus) {
        match status {
            ThumbnailStatus::Unchanged => self.unchanged += 1,
            ThumbnailStatus::Encoded => self.encoded += 1,
            ThumbnailStatus::Failed(_) => self.failed += 1,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} encoded, {} unchanged, {} failed",
            self.encoded, self.unchanged, self.failed
        )
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Files under `root` whose extension is in `readable_formats`, sorted.
pub fn collect_sources(
    root: &Path,
    readable_formats: &[String],
) -> Result<Vec<PathBuf>, BatchError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let readable =
            extension_of(entry.path()).is_some_and(|ext| readable_formats.contains(&ext));
        if readable {
            sources.push(entry.into_path());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Output path for a source re-encoded into `format`.
///
/// The source name is kept when its extension is already one of the
/// format's names (`p.jpeg` stays `p.jpeg` for JPEG); otherwise the format's
/// extension is appended (`p.png` becomes `p.png.jpg`).
pub fn encoded_output_path(relative_source: &Path, format: OutputFormat) -> PathBuf {
    let names = format_names(format.media_type());
    if extension_of(relative_source).is_some_and(|ext| names.contains(&ext.as_str())) {
        return relative_source.to_path_buf();
    }
    let mut name = relative_source.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Sources (by index) whose possible output paths overlap another source's.
///
/// Whether a file is copied or re-encoded is only known after probing, so
/// both candidate paths count.
fn colliding_sources(relatives: &[PathBuf], format: OutputFormat) -> HashMap<usize, PathBuf> {
    let mut claims: HashMap<PathBuf, BTreeSet<usize>> = HashMap::new();
    for (idx, relative) in relatives.iter().enumerate() {
        claims.entry(relative.clone()).or_default().insert(idx);
        claims
            .entry(encoded_output_path(relative, format))
            .or_default()
            .insert(idx);
    }

    let mut colliding = HashMap::new();
    for (path, owners) in claims {
        if owners.len() > 1 {
            for idx in owners {
                colliding.entry(idx).or_insert_with(|| path.clone());
            }
        }
    }
    colliding
}

fn thumbnail_one<P: DimensionProber>(
    converter: &ImageConverter<'_, P>,
    source: &Path,
    relative: &Path,
    output_dir: &Path,
    format: OutputFormat,
    max_edge: u32,
) -> Result<(PathBuf, ThumbnailStatus), BatchError> {
    let image = EncodedImage::sniffed(std::fs::read(source)?);
    let outcome = converter.resize_to_bounding_box(image, format, max_edge)?;

    let (relative_output, status) = match &outcome {
        ConversionOutcome::Unchanged(_) => {
            (relative.to_path_buf(), ThumbnailStatus::Unchanged)
        }
        ConversionOutcome::Encoded(_) => (
            encoded_output_path(relative, format),
            ThumbnailStatus::Encoded,
        ),
    };
    let image = outcome.into_image();
    let target = output_dir.join(&relative_output);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, image.bytes())?;

    Ok((relative_output, status))
}

/// Generate bounding-box thumbnails for every readable image under `source_root`.
///
/// Runs on the current rayon pool. Events are sent as files finish, in
/// completion order; the returned summary covers the whole batch.
pub fn generate_thumbnails<P: DimensionProber>(
    converter: &ImageConverter<'_, P>,
    source_root: &Path,
    output_dir: &Path,
    format: OutputFormat,
    max_edge: u32,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let sources = collect_sources(source_root, converter.registry().readable_formats())?;
    let relatives: Vec<PathBuf> = sources
        .iter()
        .map(|source| source.strip_prefix(source_root).unwrap_or(source).to_path_buf())
        .collect();
    let colliding = colliding_sources(&relatives, format);
    std::fs::create_dir_all(output_dir)?;

    let statuses: Vec<ThumbnailStatus> = sources
        .par_iter()
        .zip(relatives.into_par_iter())
        .enumerate()
        .map(|(idx, (source, relative))| {
            let result = match colliding.get(&idx) {
                Some(path) => Err(format!(
                    "output name {} is shared with another source",
                    path.display()
                )),
                None => thumbnail_one(converter, source, &relative, output_dir, format, max_edge)
                    .map_err(|e| e.to_string()),
            };
            let (output, status) = match result {
                Ok((output, status)) => (Some(output), status),
                Err(reason) => {
                    warn!(source = %source.display(), error = %reason, "thumbnail failed");
                    (None, ThumbnailStatus::Failed(reason))
                }
            };
            if let Some(tx) = &progress {
                tx.send(BatchEvent {
                    source: relative,
                    output,
                    status: status.clone(),
                })
                .ok();
            }
            status
        })
        .collect();

    let mut summary = BatchSummary::default();
    for status in &statuses {
        summary.record(status);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::imaging::{CodecRegistry, HeaderProber};
    use crate::test_helpers::{jpeg_bytes, png_bytes};
    use std::fs;
    use tempfile::TempDir;

    fn readable() -> Vec<String> {
        ["jpg", "jpeg", "png"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn collect_filters_by_extension() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.PNG"), b"x").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        fs::write(tmp.path().join("sub/b.jpg"), b"x").unwrap();

        let sources = collect_sources(tmp.path(), &readable()).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.PNG"), PathBuf::from("sub/b.jpg")]);
    }

    #[test]
    fn encoded_output_path_keeps_matching_extension() {
        assert_eq!(
            encoded_output_path(Path::new("vol1/p001.jpeg"), OutputFormat::Jpeg),
            PathBuf::from("vol1/p001.jpeg")
        );
        assert_eq!(
            encoded_output_path(Path::new("scan.TIF"), OutputFormat::Tiff),
            PathBuf::from("scan.TIF")
        );
        assert_eq!(
            encoded_output_path(Path::new("cover.webp"), OutputFormat::WebP),
            PathBuf::from("cover.webp")
        );
    }

    #[test]
    fn encoded_output_path_appends_foreign_extension() {
        assert_eq!(
            encoded_output_path(Path::new("vol1/p001.png"), OutputFormat::Jpeg),
            PathBuf::from("vol1/p001.png.jpg")
        );
        assert_eq!(
            encoded_output_path(Path::new("cover.jpg"), OutputFormat::WebP),
            PathBuf::from("cover.jpg.webp")
        );
    }

    #[test]
    fn same_stem_sources_do_not_collide() {
        let relatives = vec![PathBuf::from("cover.jpg"), PathBuf::from("cover.png")];
        assert!(colliding_sources(&relatives, OutputFormat::Jpeg).is_empty());
    }

    #[test]
    fn literal_double_extension_collides() {
        let relatives = vec![
            PathBuf::from("a.png"),
            PathBuf::from("a.png.jpg"),
            PathBuf::from("b.png"),
        ];
        let colliding = colliding_sources(&relatives, OutputFormat::Jpeg);
        assert_eq!(colliding.len(), 2);
        assert_eq!(colliding[&0], PathBuf::from("a.png.jpg"));
        assert_eq!(colliding[&1], PathBuf::from("a.png.jpg"));
    }

    #[test]
    fn summary_display() {
        let summary = BatchSummary {
            encoded: 2,
            unchanged: 1,
            failed: 0,
        };
        assert_eq!(summary.to_string(), "2 encoded, 1 unchanged, 0 failed");
    }

    #[test]
    fn batch_mixes_unchanged_encoded_and_failed() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("vol1")).unwrap();
        fs::write(src.path().join("cover.png"), png_bytes(400, 200, true)).unwrap();
        let small = jpeg_bytes(50, 40);
        fs::write(src.path().join("vol1/p001.jpg"), &small).unwrap();
        fs::write(src.path().join("broken.jpg"), b"not really a jpeg").unwrap();

        let registry = CodecRegistry::builtin(&RegistryConfig::default()).unwrap();
        let converter = ImageConverter::new(&registry, HeaderProber::new());
        let (tx, rx) = std::sync::mpsc::channel();

        let summary = generate_thumbnails(
            &converter,
            src.path(),
            out.path(),
            OutputFormat::Jpeg,
            100,
            Some(tx),
        )
        .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                encoded: 1,
                unchanged: 1,
                failed: 1,
            }
        );

        let copied = fs::read(out.path().join("vol1/p001.jpg")).unwrap();
        assert_eq!(copied, small);

        let cover = image::open(out.path().join("cover.png.jpg")).unwrap();
        assert_eq!((cover.width(), cover.height()), (100, 50));

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        let broken = events
            .iter()
            .find(|e| e.source == Path::new("broken.jpg"))
            .unwrap();
        assert!(matches!(broken.status, ThumbnailStatus::Failed(_)));
        assert!(broken.output.is_none());
    }

    #[test]
    fn same_stem_sources_get_separate_outputs() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("cover.png"), png_bytes(400, 200, false)).unwrap();
        let small_cover = jpeg_bytes(50, 40);
        fs::write(src.path().join("cover.jpg"), &small_cover).unwrap();
        let page = jpeg_bytes(60, 30);
        fs::write(src.path().join("page.jpeg"), &page).unwrap();

        let registry = CodecRegistry::builtin(&RegistryConfig::default()).unwrap();
        let converter = ImageConverter::new(&registry, HeaderProber::new());
        let summary =
            generate_thumbnails(&converter, src.path(), out.path(), OutputFormat::Jpeg, 100, None)
                .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                encoded: 1,
                unchanged: 2,
                failed: 0,
            }
        );
        assert_eq!(fs::read(out.path().join("cover.jpg")).unwrap(), small_cover);
        assert_eq!(fs::read(out.path().join("page.jpeg")).unwrap(), page);
        let cover = image::open(out.path().join("cover.png.jpg")).unwrap();
        assert_eq!((cover.width(), cover.height()), (100, 50));

        let mut written: Vec<_> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        written.sort();
        assert_eq!(written, vec!["cover.jpg", "cover.png.jpg", "page.jpeg"]);
    }

    #[test]
    fn colliding_outputs_fail_instead_of_overwriting() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join("a.png"), png_bytes(400, 200, false)).unwrap();
        fs::write(src.path().join("a.png.jpg"), jpeg_bytes(50, 40)).unwrap();
        fs::write(src.path().join("b.png"), png_bytes(40, 20, false)).unwrap();

        let registry = CodecRegistry::builtin(&RegistryConfig::default()).unwrap();
        let converter = ImageConverter::new(&registry, HeaderProber::new());
        let (tx, rx) = std::sync::mpsc::channel();
        let summary = generate_thumbnails(
            &converter,
            src.path(),
            out.path(),
            OutputFormat::Jpeg,
            100,
            Some(tx),
        )
        .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                encoded: 0,
                unchanged: 1,
                failed: 2,
            }
        );
        assert!(!out.path().join("a.png.jpg").exists());
        assert!(out.path().join("b.png").exists());

        let failed: Vec<PathBuf> = rx
            .iter()
            .filter(|e| matches!(e.status, ThumbnailStatus::Failed(_)))
            .map(|e| e.source)
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.contains(&PathBuf::from("a.png")));
        assert!(failed.contains(&PathBuf::from("a.png.jpg")));
    }
}
