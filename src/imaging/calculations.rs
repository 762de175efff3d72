//! Pure calculation functions for resize planning.
//!
//! All functions here are pure and testable without any I/O or images.

use super::media::Dimensions;
use super::params::ResizeConstraint;

/// What a resize call should do, decided from the probed dimensions alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// The image already satisfies the constraint. Return the input bytes.
    Keep,
    /// Decode and resize toward this constraint.
    Resize(ResizeConstraint),
}

/// The dimension a constraint limits.
fn constrained_edge(constraint: ResizeConstraint, dims: Dimensions) -> u32 {
    match constraint {
        ResizeConstraint::BoundingBox(_) => dims.longest_edge(),
        ResizeConstraint::Width(_) => dims.width,
        ResizeConstraint::Height(_) => dims.height,
    }
}

/// Decide whether a resize is needed.
///
/// With probed dimensions, an image whose constrained edge is already within
/// the limit is kept as-is, otherwise the target is `min(limit, edge)`.
/// Without them the requested limit is used unchecked; the no-upscale clamp
/// then happens in [`target_dimensions`] once the real size is known.
pub fn plan_resize(constraint: ResizeConstraint, probed: Option<Dimensions>) -> ResizePlan {
    match probed {
        Some(dims) => {
            let edge = constrained_edge(constraint, dims);
            if edge <= constraint.limit() {
                ResizePlan::Keep
            } else {
                ResizePlan::Resize(constraint.with_limit(constraint.limit().min(edge)))
            }
        }
        None => ResizePlan::Resize(constraint),
    }
}

fn scale(edge: u32, target: u32, reference: u32) -> u32 {
    ((edge as f64 * target as f64 / reference as f64).round() as u32).max(1)
}

/// Output dimensions for a constraint applied to an image of `actual` size.
///
/// The limit is clamped to the actual constrained edge, so no output
/// dimension ever exceeds the input. The free axis follows the aspect ratio,
/// rounded, and never drops below one pixel.
pub fn target_dimensions(constraint: ResizeConstraint, actual: Dimensions) -> Dimensions {
    let Dimensions { width, height } = actual;
    let target = constraint.limit().min(constrained_edge(constraint, actual));

    match constraint {
        ResizeConstraint::BoundingBox(_) if width >= height => {
            Dimensions::new(target, scale(height, target, width))
        }
        ResizeConstraint::BoundingBox(_) => Dimensions::new(scale(width, target, height), target),
        ResizeConstraint::Width(_) => Dimensions::new(target, scale(height, target, width)),
        ResizeConstraint::Height(_) => Dimensions::new(scale(width, target, height), target),
    }
}
