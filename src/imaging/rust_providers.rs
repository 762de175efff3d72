//! Built-in codec providers, pure Rust and statically linked.
//!
//! ## Crate mapping
//!
//! | Provider | Decode | Encode |
//! |---|---|---|
//! | [`ImageRsProvider`] (`image-rs`) | JPEG, PNG, GIF, WebP, TIFF, BMP via `image` | JPEG, PNG, lossless WebP, AVIF (rav1e), GIF, BMP, TIFF |
//! | [`WebpProvider`] (`image-webp`) | WebP via `image-webp` directly | none |
//!
//! Both providers claim `image/webp` for decoding, so the registry has to
//! pick one. The stock configuration prefers `image-webp`.
//!
//! AVIF is write-only: the `image` crate's `"avif"` feature only enables the
//! rav1e **encoder**. Decoding would need `"avif-native"` (dav1d, a C library).

use super::media::{OutputFormat, Raster};
use super::provider::{CodecProvider, EncodeSettings, ImagingError};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

/// Identity of [`ImageRsProvider`].
pub const IMAGE_RS: &str = "image-rs";
/// Identity of [`WebpProvider`].
pub const IMAGE_WEBP: &str = "image-webp";

/// The enumerable provider list the registry is built from at startup.
pub fn builtin_providers() -> Vec<Arc<dyn CodecProvider>> {
    vec![Arc::new(ImageRsProvider::new()), Arc::new(WebpProvider::new())]
}

/// General-purpose provider backed by the `image` crate.
pub struct ImageRsProvider;

impl ImageRsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageRsProvider {
    fn default() -> Self {
        Self::new()
    }
}

const IMAGE_RS_DECODES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/tiff",
    "image/bmp",
];

const IMAGE_RS_ENCODES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/avif",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::WebP => ImageFormat::WebP,
        OutputFormat::Avif => ImageFormat::Avif,
        OutputFormat::Gif => ImageFormat::Gif,
        OutputFormat::Bmp => ImageFormat::Bmp,
        OutputFormat::Tiff => ImageFormat::Tiff,
    }
}

fn to_eight_bit(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

/// Convert the pixel layout into one the target encoder accepts.
fn normalize_for(format: OutputFormat, image: &DynamicImage) -> Cow<'_, DynamicImage> {
    use DynamicImage::*;

    match (format, image) {
        (OutputFormat::Jpeg, ImageLuma8(_) | ImageRgb8(_)) => Cow::Borrowed(image),
        // Alpha was flattened away before we got here.
        (OutputFormat::Jpeg, _) => Cow::Owned(ImageRgb8(image.to_rgb8())),
        (
            OutputFormat::WebP | OutputFormat::Bmp,
            ImageLuma8(_) | ImageLumaA8(_) | ImageRgb8(_) | ImageRgba8(_),
        ) => Cow::Borrowed(image),
        (OutputFormat::Avif | OutputFormat::Gif, ImageRgb8(_) | ImageRgba8(_)) => {
            Cow::Borrowed(image)
        }
        (OutputFormat::Png | OutputFormat::Tiff, ImageRgb32F(_)) => {
            Cow::Owned(ImageRgb16(image.to_rgb16()))
        }
        (OutputFormat::Png | OutputFormat::Tiff, ImageRgba32F(_)) => {
            Cow::Owned(ImageRgba16(image.to_rgba16()))
        }
        (OutputFormat::Png | OutputFormat::Tiff, _) => Cow::Borrowed(image),
        _ => Cow::Owned(to_eight_bit(image)),
    }
}

impl CodecProvider for ImageRsProvider {
    fn identity(&self) -> &str {
        IMAGE_RS
    }

    fn decodes(&self) -> &[&'static str] {
        IMAGE_RS_DECODES
    }

    fn encodes(&self) -> &[&'static str] {
        IMAGE_RS_ENCODES
    }

    fn decode(&self, bytes: &[u8], media_type: &str) -> Result<Raster, ImagingError> {
        let format = ImageFormat::from_mime_type(media_type)
            .ok_or_else(|| ImagingError::UnsupportedFormat(media_type.to_string()))?;
        ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map(Raster::new)
            .map_err(|e| ImagingError::decode(media_type, e))
    }

    fn encode(
        &self,
        raster: &Raster,
        format: OutputFormat,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, ImagingError> {
        let image = normalize_for(format, raster.image());
        let quality = settings.quality.value() as u8;
        let mut buf = Vec::new();

        let written = match format {
            OutputFormat::Jpeg => {
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            }
            OutputFormat::Avif => image.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf,
                settings.avif_speed.value(),
                quality,
            )),
            other => image.write_to(&mut Cursor::new(&mut buf), image_format(other)),
        };
        written.map_err(|e| ImagingError::encode(format, e))?;

        Ok(buf)
    }
}

/// WebP decoder that talks to `image-webp` directly.
pub struct WebpProvider;

impl WebpProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecProvider for WebpProvider {
    fn identity(&self) -> &str {
        IMAGE_WEBP
    }

    fn decodes(&self) -> &[&'static str] {
        &["image/webp"]
    }

    fn encodes(&self) -> &[&'static str] {
        &[]
    }

    fn decode(&self, bytes: &[u8], media_type: &str) -> Result<Raster, ImagingError> {
        let mut decoder = image_webp::WebPDecoder::new(Cursor::new(bytes))
            .map_err(|e| ImagingError::decode(media_type, e))?;
        let (width, height) = decoder.dimensions();
        let size = decoder
            .output_buffer_size()
            .ok_or_else(|| ImagingError::decode(media_type, "image too large"))?;

        let mut buf = vec![0u8; size];
        decoder
            .read_image(&mut buf)
            .map_err(|e| ImagingError::decode(media_type, e))?;

        let image = if decoder.has_alpha() {
            RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8)
        };
        image
            .map(Raster::new)
            .ok_or_else(|| ImagingError::decode(media_type, "decoded buffer size mismatch"))
    }

    fn encode(
        &self,
        _raster: &Raster,
        format: OutputFormat,
        _settings: &EncodeSettings,
    ) -> Result<Vec<u8>, ImagingError> {
        Err(ImagingError::UnsupportedFormat(format!(
            "{IMAGE_WEBP} cannot encode {format}"
        )))
    }
}
