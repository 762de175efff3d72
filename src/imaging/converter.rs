//! Format conversion and no-upscale resizing.
//!
//! [`ImageConverter`] ties the registry, the prober and the transparency
//! analysis together. Every call is synchronous and owns its buffers; the
//! converter itself holds only shared, read-only state, so one instance can
//! serve any number of threads.
//!
//! ## Resize policy
//!
//! 1. Probe the dimensions from the headers.
//! 2. If the constrained edge already fits, hand the input back untouched
//!    (no decode, no encode).
//! 3. Otherwise decode into an RGBA raster, shrink toward
//!    `min(limit, original edge)` and encode, flattening onto white when the
//!    target format has no alpha.
//!
//! A failed probe skips step 2. The limit is still clamped against the
//! decoded size, so output never exceeds the input on any axis.

use super::calculations::{ResizePlan, plan_resize, target_dimensions};
use super::media::{ConversionOutcome, EncodedImage, OutputFormat, Raster};
use super::params::{ResampleFilter, ResizeConstraint};
use super::probe::{DimensionProber, HeaderProber};
use super::provider::{CodecProvider, EncodeSettings, ImagingError};
use super::registry::CodecRegistry;
use super::transparency::{AlphaClassification, flatten_onto_white, has_alpha_channel};
use crate::config::EngineConfig;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

/// Result type for converter operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Decode/encode/resize front door.
pub struct ImageConverter<'r, P = HeaderProber> {
    registry: &'r CodecRegistry,
    prober: P,
    settings: EncodeSettings,
    filter: ResampleFilter,
}

impl<'r> ImageConverter<'r, HeaderProber> {
    /// Converter with the header prober and settings taken from `config`.
    pub fn from_config(registry: &'r CodecRegistry, config: &EngineConfig) -> Self {
        Self::new(registry, HeaderProber::new())
            .with_settings(config.encoding.settings())
            .with_filter(config.resize.filter)
    }
}

impl<'r, P: DimensionProber> ImageConverter<'r, P> {
    pub fn new(registry: &'r CodecRegistry, prober: P) -> Self {
        Self {
            registry,
            prober,
            settings: EncodeSettings::default(),
            filter: ResampleFilter::default(),
        }
    }

    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn registry(&self) -> &CodecRegistry {
        self.registry
    }

    /// True iff `from` is readable and `to` is writable.
    pub fn can_convert(&self, from: &str, to: &str) -> bool {
        self.registry.can_convert(from, to)
    }

    fn encoder(&self, format: OutputFormat) -> Result<&Arc<dyn CodecProvider>> {
        self.registry
            .encoder_for(format.media_type())
            .ok_or_else(|| ImagingError::UnsupportedFormat(format.media_type().to_string()))
    }

    /// Decode an encoded image with the active provider for its media type.
    pub fn decode(&self, image: &EncodedImage) -> Result<Raster> {
        let provider = self
            .registry
            .decoder_for(image.media_type())
            .ok_or_else(|| ImagingError::UnsupportedFormat(image.media_type().to_string()))?;
        provider.decode(image.bytes(), image.media_type())
    }

    /// Flatten if the format needs it, then encode. Returns the alpha
    /// classification when flattening happened.
    fn encode_raster(
        &self,
        raster: &Raster,
        format: OutputFormat,
    ) -> Result<(EncodedImage, Option<AlphaClassification>)> {
        let encoder = self.encoder(format)?;

        let (bytes, flattened) = if !format.supports_alpha() && has_alpha_channel(raster) {
            let classification = AlphaClassification::classify(raster);
            let flat = flatten_onto_white(raster);
            (
                encoder.encode(&flat, format, &self.settings)?,
                Some(classification),
            )
        } else {
            (encoder.encode(raster, format, &self.settings)?, None)
        };

        Ok((EncodedImage::new(bytes, format.media_type()), flattened))
    }

    /// Decode `image` and re-encode it as `format`.
    ///
    /// Alpha is flattened onto white only when `format` cannot carry it.
    pub fn convert(&self, image: &EncodedImage, format: OutputFormat) -> Result<EncodedImage> {
        self.encoder(format)?;
        let raster = self.decode(image)?;
        let (encoded, flattened) = self.encode_raster(&raster, format)?;

        if let Some(classification) = flattened {
            info!(
                %classification,
                from = image.media_type(),
                to = %format,
                "{}",
                classification.flattening_note()
            );
        }
        debug!(
            from = image.media_type(),
            to = %format,
            in_bytes = image.len(),
            out_bytes = encoded.len(),
            "converted image"
        );

        Ok(encoded)
    }

    fn check_constraint(constraint: ResizeConstraint) -> Result<()> {
        if constraint.limit() == 0 {
            return Err(ImagingError::InvalidConstraint(format!(
                "{constraint:?} must be at least 1 pixel"
            )));
        }
        Ok(())
    }

    /// Shrink a decoded raster toward `constraint` through an RGBA buffer.
    fn resample(&self, raster: Raster, constraint: ResizeConstraint) -> Raster {
        let actual = raster.dimensions();
        let target = target_dimensions(constraint, actual);
        let rgba = raster.into_image().into_rgba8();

        let resized = if target == actual {
            rgba
        } else {
            image::imageops::resize(&rgba, target.width, target.height, self.filter.into())
        };
        debug!(from = %actual, to = %target, "resampled raster");

        Raster::new(DynamicImage::ImageRgba8(resized))
    }

    /// Resize under any of the three constraint modes.
    ///
    /// Returns [`ConversionOutcome::Unchanged`] with the input when the probed
    /// size already satisfies the constraint.
    pub fn resize(
        &self,
        image: EncodedImage,
        format: OutputFormat,
        constraint: ResizeConstraint,
    ) -> Result<ConversionOutcome> {
        Self::check_constraint(constraint)?;
        self.encoder(format)?;

        let probed = self.prober.probe(image.bytes());
        let target = match plan_resize(constraint, probed) {
            ResizePlan::Keep => {
                debug!(?constraint, dims = ?probed, "already within constraint, keeping input");
                return Ok(ConversionOutcome::Unchanged(image));
            }
            ResizePlan::Resize(target) => target,
        };
        if probed.is_none() {
            debug!(?constraint, "probe failed, resizing with requested limit");
        }

        let raster = self.resample(self.decode(&image)?, target);
        let (encoded, flattened) = self.encode_raster(&raster, format)?;
        if let Some(classification) = flattened {
            debug!(%classification, to = %format, "flattened resized raster");
        }

        Ok(ConversionOutcome::Encoded(encoded))
    }

    /// Fit the longer edge within `max_edge`.
    pub fn resize_to_bounding_box(
        &self,
        image: EncodedImage,
        format: OutputFormat,
        max_edge: u32,
    ) -> Result<ConversionOutcome> {
        self.resize(image, format, ResizeConstraint::BoundingBox(max_edge))
    }

    /// Fit the width within `max_width`.
    pub fn resize_to_width(
        &self,
        image: EncodedImage,
        format: OutputFormat,
        max_width: u32,
    ) -> Result<ConversionOutcome> {
        self.resize(image, format, ResizeConstraint::Width(max_width))
    }

    /// Fit the height within `max_height`.
    pub fn resize_to_height(
        &self,
        image: EncodedImage,
        format: OutputFormat,
        max_height: u32,
    ) -> Result<ConversionOutcome> {
        self.resize(image, format, ResizeConstraint::Height(max_height))
    }

    /// Same sizing as [`resize_to_bounding_box`](Self::resize_to_bounding_box)
    /// but returns the pixel buffer instead of encoded bytes.
    ///
    /// `format` is checked for writability so callers fail before decoding;
    /// the raster is returned before any flattening. An image that already
    /// fits is decoded and returned at its original size.
    pub fn resize_to_bounding_box_raster(
        &self,
        image: &EncodedImage,
        format: OutputFormat,
        size: u32,
    ) -> Result<Raster> {
        let constraint = ResizeConstraint::BoundingBox(size);
        Self::check_constraint(constraint)?;
        self.encoder(format)?;

        match plan_resize(constraint, self.prober.probe(image.bytes())) {
            ResizePlan::Keep => self.decode(image),
            ResizePlan::Resize(target) => Ok(self.resample(self.decode(image)?, target)),
        }
    }
}
