//! Value types shared by every imaging operation.
//!
//! - [`EncodedImage`]: an encoded byte buffer plus its media type.
//! - [`Dimensions`]: width/height as reported by the prober or a decoded raster.
//! - [`OutputFormat`]: the encodings the engine can target.
//! - [`Raster`]: a fully decoded pixel buffer.
//! - [`ConversionOutcome`]: whether a call re-encoded or handed the input back.
//!
//! All of these are created per call. Nothing here is cached.

use image::DynamicImage;
use std::fmt;
use std::str::FromStr;

/// Media type used when the content of a buffer could not be identified.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// An encoded image: raw bytes plus the media type they are declared or detected as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    media_type: String,
}

impl EncodedImage {
    /// Wrap bytes with a declared media type (e.g. from an archive entry).
    ///
    /// Media types are case-insensitive and stored lowercased.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        let mut media_type = media_type.into();
        media_type.make_ascii_lowercase();
        Self { bytes, media_type }
    }

    /// Wrap bytes and detect the media type from their magic number.
    pub fn sniffed(bytes: Vec<u8>) -> Self {
        let media_type = image::guess_format(&bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or(UNKNOWN_MEDIA_TYPE);
        Self::new(bytes, media_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn longest_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Encodings the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Bmp,
    Tiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Avif,
        OutputFormat::Gif,
        OutputFormat::Bmp,
        OutputFormat::Tiff,
    ];

    /// Whether the encoding can carry an alpha channel.
    ///
    /// Rasters with alpha are flattened onto white before encoding into a
    /// format where this is `false`.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg | OutputFormat::Bmp)
    }

    /// Short codec identifier, also used as the CLI spelling.
    pub fn codec_id(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    /// File extension for generated files.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.codec_id(),
        }
    }

    pub fn from_codec_id(id: &str) -> Option<Self> {
        let id = id.to_ascii_lowercase();
        match id.as_str() {
            "jpg" => Some(OutputFormat::Jpeg),
            "tif" => Some(OutputFormat::Tiff),
            _ => Self::ALL.into_iter().find(|f| f.codec_id() == id),
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.media_type().eq_ignore_ascii_case(media_type))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_id())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_codec_id(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|f| f.codec_id()).collect();
            format!("unknown format '{s}', expected one of: {}", known.join(", "))
        })
    }
}

/// Format names (lowercase, without dots) under which a media type is known.
pub fn format_names(media_type: &str) -> &'static [&'static str] {
    match media_type {
        "image/jpeg" => &["jpeg", "jpg"],
        "image/png" => &["png"],
        "image/webp" => &["webp"],
        "image/avif" => &["avif"],
        "image/gif" => &["gif"],
        "image/bmp" => &["bmp"],
        "image/tiff" => &["tiff", "tif"],
        _ => &[],
    }
}

/// A decoded image held in memory.
#[derive(Debug, Clone)]
pub struct Raster(DynamicImage);

impl Raster {
    pub fn new(image: DynamicImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    pub fn into_image(self) -> DynamicImage {
        self.0
    }
}

impl From<DynamicImage> for Raster {
    fn from(image: DynamicImage) -> Self {
        Self(image)
    }
}

/// Result of a conversion or resize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The input already satisfied the request and is returned as-is.
    Unchanged(EncodedImage),
    /// The input was decoded and re-encoded.
    Encoded(EncodedImage),
}

impl ConversionOutcome {
    pub fn image(&self) -> &EncodedImage {
        match self {
            ConversionOutcome::Unchanged(img) | ConversionOutcome::Encoded(img) => img,
        }
    }

    pub fn into_image(self) -> EncodedImage {
        match self {
            ConversionOutcome::Unchanged(img) | ConversionOutcome::Encoded(img) => img,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ConversionOutcome::Unchanged(_))
    }
}
