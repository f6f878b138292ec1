//! Optional face-cropping stage.
//!
//! The face detector itself is an external collaborator; this module owns its
//! contract, the best-candidate selection rule, and the crop geometry. Any
//! detector problem (an error, zero candidates, or a box that degenerates
//! after clamping) silently falls back to the uncropped image. That fallback
//! is documented behavior, not a gap: classification proceeds on the full
//! frame and the caller is never told the crop was skipped.

use std::sync::Arc;

use anyhow::Result;
use image::{DynamicImage, GenericImageView, imageops};
use log::{debug, info};

/// Axis-aligned face bounding box in source-image pixels, as reported by the
/// detector. Offsets may be negative; crop code clamps to image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    /// Left edge, may be negative.
    pub x: i32,
    /// Top edge, may be negative.
    pub y: i32,
    /// Box width in pixels.
    pub width: i32,
    /// Box height in pixels.
    pub height: i32,
}

/// One face candidate from the detector: a bounding box plus its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCandidate {
    /// The candidate's bounding box.
    pub bbox: FaceBox,
    /// The detector's confidence for this candidate.
    pub confidence: f32,
}

/// Contract of the external face detector collaborator.
pub trait FaceDetector: Send + Sync + std::fmt::Debug {
    /// Detect faces in the image, returning zero or more candidates in the
    /// detector's own order. The order matters: it breaks confidence ties.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceCandidate>>;
}

/// Resolve the optional cropping stage once at startup.
///
/// The stage is active only when configuration enables it and a detector
/// implementation is actually available; a missing detector downgrades the
/// stage to disabled rather than surprising callers at request time.
pub fn resolve_face_stage(
    enabled: bool,
    detector: Option<Arc<dyn FaceDetector>>,
) -> Option<Arc<dyn FaceDetector>> {
    match (enabled, detector) {
        (true, Some(detector)) => Some(detector),
        (true, None) => {
            info!("face detection enabled in settings but no detector is available; stage disabled");
            None
        }
        (false, _) => None,
    }
}

/// Crop the highest-confidence face out of `image`.
///
/// Ties are broken by first occurrence in the detector's output order. The
/// selected box is clamped to the image bounds before slicing. Zero
/// candidates, a detector failure, or a degenerate clamped region all return
/// the original image unchanged.
pub fn crop_best_face(image: &DynamicImage, detector: &dyn FaceDetector) -> DynamicImage {
    let candidates = match detector.detect(image) {
        Ok(candidates) => candidates,
        Err(err) => {
            debug!("face detector failed, using full image: {err:#}");
            return image.clone();
        }
    };

    let Some(best) = select_best(&candidates) else {
        debug!("face detector returned no candidates, using full image");
        return image.clone();
    };

    match clamp_to_image(best.bbox, image.dimensions()) {
        Some((x, y, width, height)) => {
            debug!(
                "cropping face at ({x}, {y}) {width}x{height} (confidence {:.3})",
                best.confidence
            );
            DynamicImage::ImageRgba8(imageops::crop_imm(image, x, y, width, height).to_image())
        }
        None => {
            debug!("face box degenerate after clamping, using full image");
            image.clone()
        }
    }
}

/// Maximum confidence wins; a strict-greater comparison keeps the earliest
/// candidate on ties.
fn select_best(candidates: &[FaceCandidate]) -> Option<&FaceCandidate> {
    let mut best: Option<&FaceCandidate> = None;
    for candidate in candidates {
        let replace = match best {
            Some(current) => candidate.confidence > current.confidence,
            None => true,
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Clamp a detector box to image bounds: negative offsets clamp to zero and
/// extents clamp to the image edges. Returns `None` when nothing remains.
fn clamp_to_image(bbox: FaceBox, (img_w, img_h): (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let x1 = i64::from(bbox.x).max(0);
    let y1 = i64::from(bbox.y).max(0);
    let x2 = (i64::from(bbox.x) + i64::from(bbox.width)).min(i64::from(img_w));
    let y2 = (i64::from(bbox.y) + i64::from(bbox.height)).min(i64::from(img_h));

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
}
