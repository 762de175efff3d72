//! Parameter types for image operations.
//!
//! These describe *what* to do, not *how*. The converter turns them into
//! decode/resample/encode calls.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`AvifSpeed`]: rav1e speed preset (1–10, default 6). Clamped on construction.
//! - [`ResampleFilter`]: Resampling kernel used when shrinking.
//! - [`ResizeConstraint`]: One of the three resize modes with its limit.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvifSpeed(pub u8);

impl AvifSpeed {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 10))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for AvifSpeed {
    fn default() -> Self {
        Self(6)
    }
}

/// Resampling kernel, spelled the way it appears in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// A resize request. Each mode limits one axis and keeps the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeConstraint {
    /// Limit the longer edge.
    BoundingBox(u32),
    /// Limit the width.
    Width(u32),
    /// Limit the height.
    Height(u32),
}

impl ResizeConstraint {
    /// The requested limit, whatever the axis.
    pub fn limit(self) -> u32 {
        match self {
            ResizeConstraint::BoundingBox(n)
            | ResizeConstraint::Width(n)
            | ResizeConstraint::Height(n) => n,
        }
    }

    pub(crate) fn with_limit(self, limit: u32) -> Self {
        match self {
            ResizeConstraint::BoundingBox(_) => ResizeConstraint::BoundingBox(limit),
            ResizeConstraint::Width(_) => ResizeConstraint::Width(limit),
            ResizeConstraint::Height(_) => ResizeConstraint::Height(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn avif_speed_clamps() {
        assert_eq!(AvifSpeed::new(0).value(), 1);
        assert_eq!(AvifSpeed::new(42).value(), 10);
        assert_eq!(AvifSpeed::default().value(), 6);
    }

    #[test]
    fn filter_deserializes_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: ResampleFilter,
        }
        let w: Wrapper = toml::from_str(r#"filter = "catmull-rom""#).unwrap();
        assert_eq!(w.filter, ResampleFilter::CatmullRom);
    }

    #[test]
    fn constraint_limit_and_rebuild() {
        let c = ResizeConstraint::Width(600);
        assert_eq!(c.limit(), 600);
        assert_eq!(c.with_limit(300), ResizeConstraint::Width(300));
    }
}
