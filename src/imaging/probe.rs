//! Cheap dimension lookup without a full decode.
//!
//! The converter consults a [`DimensionProber`] before deciding whether a
//! resize is needed. A probe that cannot answer returns `None`; it never
//! fails the call, and it is not a validity check on the bytes.

use super::media::Dimensions;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Header-only width/height lookup.
pub trait DimensionProber: Sync {
    fn probe(&self, bytes: &[u8]) -> Option<Dimensions>;
}

/// Production prober: reads image headers through the `image` crate, and
/// the AVIF container through `avif-parse`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderProber;

impl HeaderProber {
    pub fn new() -> Self {
        Self
    }
}

/// AVIF dimensions from the container metadata (no AV1 decode needed).
fn probe_avif(bytes: &[u8]) -> Option<Dimensions> {
    let avif = avif_parse::read_avif(&mut Cursor::new(bytes)).ok()?;
    let meta = avif.primary_item_metadata().ok()?;
    Some(Dimensions::new(
        meta.max_frame_width.get(),
        meta.max_frame_height.get(),
    ))
}

impl DimensionProber for HeaderProber {
    fn probe(&self, bytes: &[u8]) -> Option<Dimensions> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?;

        let dims = if reader.format() == Some(ImageFormat::Avif) {
            probe_avif(bytes)?
        } else {
            let (width, height) = reader.into_dimensions().ok()?;
            Dimensions::new(width, height)
        };

        (dims.width > 0 && dims.height > 0).then_some(dims)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_bytes, png_bytes};
    use std::sync::Mutex;

    /// Prober returning a fixed answer and counting calls.
    pub struct MockProber {
        pub answer: Option<Dimensions>,
        pub calls: Mutex<usize>,
    }

    impl MockProber {
        pub fn returning(answer: Option<Dimensions>) -> Self {
            Self {
                answer,
                calls: Mutex::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl DimensionProber for MockProber {
        fn probe(&self, _bytes: &[u8]) -> Option<Dimensions> {
            *self.calls.lock().unwrap() += 1;
            self.answer
        }
    }

    #[test]
    fn probe_png_dimensions() {
        let dims = HeaderProber::new().probe(&png_bytes(120, 80, true));
        assert_eq!(dims, Some(Dimensions::new(120, 80)));
    }

    #[test]
    fn probe_jpeg_dimensions() {
        let dims = HeaderProber::new().probe(&jpeg_bytes(200, 150));
        assert_eq!(dims, Some(Dimensions::new(200, 150)));
    }

    #[test]
    fn probe_garbage_is_none() {
        assert_eq!(HeaderProber::new().probe(b"no image here"), None);
        assert_eq!(HeaderProber::new().probe(&[]), None);
    }

    #[test]
    fn probe_truncated_header_is_none() {
        let bytes = png_bytes(10, 10, false);
        assert_eq!(HeaderProber::new().probe(&bytes[..12]), None);
    }

    #[test]
    fn probe_avif_from_container() {
        use crate::imaging::media::{OutputFormat, Raster};
        use crate::imaging::provider::{CodecProvider, EncodeSettings};
        use crate::imaging::rust_providers::ImageRsProvider;

        let raster = Raster::new(image::DynamicImage::new_rgb8(120, 80));
        let bytes = ImageRsProvider::new()
            .encode(&raster, OutputFormat::Avif, &EncodeSettings::default())
            .unwrap();
        assert_eq!(
            HeaderProber::new().probe(&bytes),
            Some(Dimensions::new(120, 80))
        );
    }

    #[test]
    fn mock_counts_calls() {
        let prober = MockProber::returning(None);
        prober.probe(&[]);
        prober.probe(&[]);
        assert_eq!(prober.call_count(), 2);
    }
}
