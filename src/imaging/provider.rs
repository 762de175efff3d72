//! Codec provider trait and shared error type.
//!
//! A [`CodecProvider`] is one implementation able to decode and/or encode a
//! set of media types. Several providers may claim the same media type; the
//! [`CodecRegistry`](super::registry::CodecRegistry) picks exactly one active
//! provider per media type at startup.
//!
//! The production providers live in
//! [`rust_providers`](super::rust_providers). Tests substitute their own.

use super::media::{OutputFormat, Raster};
use super::params::{AvifSpeed, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {media_type} image: {reason}")]
    Decode { media_type: String, reason: String },
    #[error("Failed to encode {format} image: {reason}")]
    Encode { format: String, reason: String },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error(
        "Several providers claim {media_type} ({}) and none is preferred; \
         set registry.preferred.\"{media_type}\" to one of them",
        providers.join(", ")
    )]
    ProviderConflict {
        media_type: String,
        providers: Vec<String>,
    },
    #[error("Invalid resize constraint: {0}")]
    InvalidConstraint(String),
}

impl ImagingError {
    pub(crate) fn decode(media_type: &str, reason: impl ToString) -> Self {
        ImagingError::Decode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(format: OutputFormat, reason: impl ToString) -> Self {
        ImagingError::Encode {
            format: format.codec_id().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Knobs passed to every encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    /// Lossy quality for JPEG and AVIF. Lossless encoders ignore it.
    pub quality: Quality,
    pub avif_speed: AvifSpeed,
}

/// A component able to decode and/or encode specific media types.
pub trait CodecProvider: Send + Sync {
    /// Stable identity used in configuration and diagnostics.
    fn identity(&self) -> &str;

    /// Media types this provider can decode.
    fn decodes(&self) -> &[&'static str];

    /// Media types this provider can encode.
    fn encodes(&self) -> &[&'static str];

    /// Declared preference among competing providers. Lower wins.
    fn rank(&self) -> Option<u32> {
        None
    }

    fn decode(&self, bytes: &[u8], media_type: &str) -> Result<Raster, ImagingError>;

    fn encode(
        &self,
        raster: &Raster,
        format: OutputFormat,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, ImagingError>;
}
