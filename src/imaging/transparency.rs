//! Alpha-channel analysis and flattening.
//!
//! Classification is advisory: it only feeds diagnostics. Whether a raster
//! gets flattened depends solely on the target format and
//! [`has_alpha_channel`].

use super::media::Raster;
use image::{DynamicImage, Rgb, RgbImage};
use std::fmt;

/// How a raster uses its alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaClassification {
    /// No alpha channel at all.
    Opaque,
    /// An alpha channel exists but no pixel is fully transparent.
    OpaqueWithAlphaChannel,
    /// At least one pixel has alpha exactly zero.
    Transparent,
}

impl AlphaClassification {
    pub fn classify(raster: &Raster) -> Self {
        if !has_alpha_channel(raster) {
            AlphaClassification::Opaque
        } else if has_transparent_pixel(raster) {
            AlphaClassification::Transparent
        } else {
            AlphaClassification::OpaqueWithAlphaChannel
        }
    }

    /// Human-readable note on what flattening will do to this raster.
    pub fn flattening_note(self) -> &'static str {
        match self {
            AlphaClassification::Opaque => "no alpha channel, nothing to flatten",
            AlphaClassification::OpaqueWithAlphaChannel => {
                "alpha channel present but every pixel is opaque, flattening leaves no visible change"
            }
            AlphaClassification::Transparent => {
                "alpha channel present with transparent pixels, flattening onto white may show artifacts"
            }
        }
    }
}

impl fmt::Display for AlphaClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlphaClassification::Opaque => "opaque",
            AlphaClassification::OpaqueWithAlphaChannel => "opaque-with-alpha",
            AlphaClassification::Transparent => "transparent",
        })
    }
}

/// Whether the pixel layout declares an alpha channel, regardless of values.
pub fn has_alpha_channel(raster: &Raster) -> bool {
    raster.image().color().has_alpha()
}

/// Whether any pixel is fully transparent (alpha exactly zero).
///
/// Scans in row-major order and stops at the first hit. Partially
/// translucent pixels do not count.
pub fn has_transparent_pixel(raster: &Raster) -> bool {
    match raster.image() {
        DynamicImage::ImageLumaA8(img) => img.pixels().any(|p| p[1] == 0),
        DynamicImage::ImageRgba8(img) => img.pixels().any(|p| p[3] == 0),
        DynamicImage::ImageLumaA16(img) => img.pixels().any(|p| p[1] == 0),
        DynamicImage::ImageRgba16(img) => img.pixels().any(|p| p[3] == 0),
        DynamicImage::ImageRgba32F(img) => img.pixels().any(|p| p[3] == 0.0),
        _ => false,
    }
}

/// Composite a raster over solid white, dropping its alpha channel.
///
/// Fully opaque pixels keep their colour, fully transparent pixels become
/// pure white, and everything in between is blended with
/// `c * a + 255 * (1 - a)`.
pub fn flatten_onto_white(raster: &Raster) -> Raster {
    let rgba = raster.image().to_rgba8();
    let (width, height) = rgba.dimensions();

    let flat = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([blend(r, a), blend(g, a), blend(b, a)])
    });

    Raster::new(DynamicImage::ImageRgb8(flat))
}

#[inline]
fn blend(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
