//! Shared test utilities: in-memory fixture images.
//!
//! Every fixture is generated on the fly so tests never depend on files
//! checked into the repository.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let bytes = png_bytes(100, 100, true);
//! let image = EncodedImage::new(bytes, "image/png");
//! ```

use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

// =========================================================================
// Pixel buffers
// =========================================================================

/// RGB gradient so resampling has something to chew on.
pub fn rgb_gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// RGBA checkerboard: even cells opaque red, odd cells fully transparent.
pub fn rgba_checker(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([200, 10, 10, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// RGBA image where every pixel is opaque.
pub fn rgba_opaque(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
    })
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode an RGBA buffer as PNG.
pub fn encode_png_rgba(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Encode an RGB buffer as PNG.
pub fn encode_png_rgb(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// PNG of the given size. With `alpha`, half the pixels are fully transparent.
pub fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    if alpha {
        encode_png_rgba(&rgba_checker(width, height))
    } else {
        encode_png_rgb(&rgb_gradient(width, height))
    }
}

/// Small valid JPEG with the given dimensions.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = rgb_gradient(width, height);
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}
