//! Image conversion and resizing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | `image::ImageReader::into_dimensions`, `avif-parse` for AVIF |
//! | **Decode** | `image` crate, `image-webp` for WebP |
//! | **Resize** | `image::imageops::resize` (Lanczos3 by default) |
//! | **Encode** | `image` crate encoders, rav1e for AVIF |
//!
//! The module is split into:
//! - **Media**: value types ([`EncodedImage`], [`Raster`], [`OutputFormat`], ...)
//! - **Calculations**: Pure functions for resize planning (unit testable)
//! - **Parameters**: Data structures describing operations
//! - **Provider**: [`CodecProvider`] trait + the built-in providers
//! - **Registry**: [`CodecRegistry`], one active provider per media type
//! - **Probe**: [`DimensionProber`] + [`HeaderProber`]
//! - **Transparency**: alpha classification and flattening
//! - **Converter**: [`ImageConverter`], the high-level entry points

mod calculations;
pub mod converter;
pub mod media;
pub mod params;
pub mod probe;
pub mod provider;
pub mod registry;
pub mod rust_providers;
pub mod transparency;

pub use calculations::{ResizePlan, plan_resize, target_dimensions};
pub use converter::ImageConverter;
pub use media::{ConversionOutcome, Dimensions, EncodedImage, OutputFormat, Raster};
pub use params::{AvifSpeed, Quality, ResampleFilter, ResizeConstraint};
pub use probe::{DimensionProber, HeaderProber};
pub use provider::{CodecProvider, EncodeSettings, ImagingError};
pub use registry::{CodecRegistry, Deactivation, Direction};
pub use rust_providers::{ImageRsProvider, WebpProvider, builtin_providers};
pub use transparency::{
    AlphaClassification, flatten_onto_white, has_alpha_channel, has_transparent_pixel,
};
