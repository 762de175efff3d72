//! End-to-end conversion scenarios against the built-in providers.
//!
//! Fixtures are generated in memory; nothing is read from disk except the
//! batch test, which works in a temp directory.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pagecodec::config::{RegistryConfig, resolve_config};
use pagecodec::imaging::{
    CodecRegistry, DimensionProber, Dimensions, EncodedImage, HeaderProber, ImageConverter,
    ImagingError, OutputFormat, ResizeConstraint, has_alpha_channel, has_transparent_pixel,
};
use std::io::Cursor;

fn encode(image: DynamicImage, format: ImageFormat) -> EncodedImage {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    EncodedImage::sniffed(buf)
}

fn opaque_png(width: u32, height: u32) -> EncodedImage {
    let pixels = RgbImage::from_pixel(width, height, Rgb([30, 90, 160]));
    encode(DynamicImage::ImageRgb8(pixels), ImageFormat::Png)
}

/// Left half opaque blue, right half fully transparent.
fn half_transparent_png(width: u32, height: u32) -> EncodedImage {
    let pixels = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    encode(DynamicImage::ImageRgba8(pixels), ImageFormat::Png)
}

fn builtin() -> CodecRegistry {
    CodecRegistry::builtin(&RegistryConfig::default()).unwrap()
}

fn decoded(image: &EncodedImage) -> DynamicImage {
    image::load_from_memory(image.bytes()).unwrap()
}

#[test]
fn width_constraint_keeps_aspect_ratio() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());

    let outcome = converter
        .resize_to_width(opaque_png(1000, 500), OutputFormat::Png, 600)
        .unwrap();

    assert!(!outcome.is_unchanged());
    let out = decoded(outcome.image());
    assert_eq!((out.width(), out.height()), (600, 300));
}

#[test]
fn image_within_bounding_box_is_returned_byte_for_byte() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());
    let input = opaque_png(100, 100);
    let original = input.bytes().to_vec();

    let outcome = converter
        .resize_to_bounding_box(input, OutputFormat::Jpeg, 150)
        .unwrap();

    assert!(outcome.is_unchanged());
    assert_eq!(outcome.image().bytes(), original.as_slice());
    assert_eq!(outcome.image().media_type(), "image/png");
}

#[test]
fn height_constraint_never_upscales() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());

    for limit in [10, 40, 79, 80, 81, 500] {
        let outcome = converter
            .resize(opaque_png(120, 80), OutputFormat::Png, ResizeConstraint::Height(limit))
            .unwrap();
        let out = decoded(outcome.image());
        assert!(out.height() <= 80, "limit {limit} produced {}", out.height());
        assert!(out.width() <= 120);
        assert_eq!(outcome.is_unchanged(), limit >= 80);
    }
}

#[test]
fn jpeg_output_flattens_transparency_onto_white() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());

    let converted = converter
        .convert(&half_transparent_png(32, 16), OutputFormat::Jpeg)
        .unwrap();

    assert_eq!(converted.media_type(), "image/jpeg");
    let out = decoded(&converted).to_rgb8();
    let right = out.get_pixel(28, 8);
    assert!(right.0.iter().all(|&c| c > 240), "expected white, got {right:?}");
    let left = out.get_pixel(4, 8);
    assert!(left[2] > 200 && left[0] < 60, "expected blue, got {left:?}");
}

#[test]
fn png_output_keeps_alpha() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());

    let converted = converter
        .convert(&half_transparent_png(8, 8), OutputFormat::Png)
        .unwrap();

    let raster = converter.decode(&converted).unwrap();
    assert!(has_alpha_channel(&raster));
    assert!(has_transparent_pixel(&raster));
}

#[test]
fn webp_decoding_goes_through_preferred_provider() {
    let registry = builtin();
    let decoder = registry.decoder_for("image/webp").unwrap();
    assert_eq!(decoder.identity(), "image-webp");

    let encoder = registry.encoder_for("image/webp").unwrap();
    assert_eq!(encoder.identity(), "image-rs");
}

#[test]
fn webp_input_resizes_to_jpeg() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());
    let webp = converter
        .convert(&opaque_png(200, 100), OutputFormat::WebP)
        .unwrap();
    assert_eq!(webp.media_type(), "image/webp");

    let outcome = converter
        .resize_to_bounding_box(webp, OutputFormat::Jpeg, 50)
        .unwrap();
    let out = decoded(outcome.image());
    assert_eq!((out.width(), out.height()), (50, 25));
}

#[test]
fn can_convert_rejects_unknown_target() {
    let registry = builtin();
    assert!(registry.can_convert("image/jpeg", "image/png"));
    assert!(!registry.can_convert("image/jpeg", "image/bogus"));
    assert!(!registry.can_convert("image/bogus", "image/jpeg"));
    // AVIF is write-only.
    assert!(registry.can_convert("image/png", "image/avif"));
    assert!(!registry.can_convert("image/avif", "image/png"));
}

#[test]
fn conflict_without_preference_fails_startup() {
    let config = RegistryConfig::empty();
    match CodecRegistry::builtin(&config) {
        Err(ImagingError::ProviderConflict { media_type, providers }) => {
            assert_eq!(media_type, "image/webp");
            assert_eq!(providers.len(), 2);
        }
        other => panic!("expected provider conflict, got {other:?}"),
    }
}

#[test]
fn preference_can_be_flipped_in_config() {
    let overlay: toml::Value = toml::from_str(
        r#"
        [registry.preferred]
        "image/webp" = "image-rs"
        "#,
    )
    .unwrap();
    let config = resolve_config(Some(overlay)).unwrap();
    let registry = CodecRegistry::builtin(&config.registry).unwrap();
    assert_eq!(registry.decoder_for("image/webp").unwrap().identity(), "image-rs");
}

#[test]
fn raster_variant_returns_unflattened_pixels() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());

    let raster = converter
        .resize_to_bounding_box_raster(&half_transparent_png(400, 200), OutputFormat::Jpeg, 100)
        .unwrap();

    assert_eq!(raster.dimensions(), Dimensions::new(100, 50));
    assert!(has_transparent_pixel(&raster));
}

#[test]
fn zero_constraint_is_rejected() {
    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());
    let err = converter
        .resize_to_bounding_box(opaque_png(10, 10), OutputFormat::Png, 0)
        .unwrap_err();
    assert!(matches!(err, ImagingError::InvalidConstraint(_)));
}

#[test]
fn header_prober_reads_without_decoding() {
    let prober = HeaderProber::new();
    let png = opaque_png(321, 123);
    assert_eq!(prober.probe(png.bytes()), Some(Dimensions::new(321, 123)));
    assert_eq!(prober.probe(b"definitely not an image"), None);
}

#[test]
fn thumbnails_cover_a_directory_tree() {
    let src = tempfile::TempDir::new().unwrap();
    let out = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("vol1")).unwrap();
    std::fs::write(src.path().join("cover.png"), opaque_png(800, 400).bytes()).unwrap();
    std::fs::write(src.path().join("vol1/p001.png"), opaque_png(60, 90).bytes()).unwrap();

    let registry = builtin();
    let converter = ImageConverter::new(&registry, HeaderProber::new());
    let summary = pagecodec::batch::generate_thumbnails(
        &converter,
        src.path(),
        out.path(),
        OutputFormat::WebP,
        200,
        None,
    )
    .unwrap();

    assert_eq!((summary.encoded, summary.unchanged, summary.failed), (1, 1, 0));
    let cover = image::open(out.path().join("cover.png.webp")).unwrap();
    assert_eq!((cover.width(), cover.height()), (200, 100));
    assert!(out.path().join("vol1/p001.png").exists());
}
