//! Visual diff computation between a candidate and its baseline
use image::{Rgba, RgbaImage};
use visualcheck_core_types::{CapturedImage, Rect};

use crate::errors::{VisualError, VisualResult};
use crate::markup::{DiffMarkupPolicy, DIFF_COLOR};

/// Result of one diff pass.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub differing_pixels: u64,
    /// Differing pixels as a share of the image area (0.0-100.0)
    pub diff_percentage: f64,
    pub diff_size_trigger: u64,
    /// `true` when the images classify as "same"
    pub passed: bool,
    /// Candidate copy with differing pixels painted in the overlay color
    pub markup: CapturedImage,
    /// Bounding box of all changes
    pub changed_region: Option<Rect>,
}

/// Visual diff computation engine
#[derive(Debug, Clone)]
pub struct DiffEngine {
    tolerance: u8,
    color: [u8; 3],
}

impl DiffEngine {
    /// `tolerance` is the largest per-channel delta still treated as equal.
    pub fn new(tolerance: u8) -> Self {
        Self {
            tolerance,
            color: DIFF_COLOR,
        }
    }

    pub fn with_color(mut self, rgb: [u8; 3]) -> Self {
        self.color = rgb;
        self
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Single pass over both images.
    pub fn diff(
        &self,
        candidate: &CapturedImage,
        baseline: &CapturedImage,
        threshold_percentage: u8,
    ) -> VisualResult<DiffOutcome> {
        if candidate.dimensions() != baseline.dimensions() {
            return Err(VisualError::DimensionMismatch {
                expected: baseline.dimensions(),
                actual: candidate.dimensions(),
            });
        }
        let (width, height) = candidate.dimensions();
        let policy = DiffMarkupPolicy::new(width, height, threshold_percentage)?.with_color(self.color);

        let mut markup: RgbaImage = candidate.as_rgba().clone();
        let mut bounds = Bounds::default();
        let mut differing = 0u64;
        for ((x, y, cand), base) in candidate
            .as_rgba()
            .enumerate_pixels()
            .zip(baseline.as_rgba().pixels())
        {
            if self.differs(cand, base) {
                differing += 1;
                bounds.include(x, y);
                markup.put_pixel(x, y, policy.color());
            }
        }

        let total = candidate.pixel_count();
        let diff_percentage = if total == 0 {
            0.0
        } else {
            differing as f64 * 100.0 / total as f64
        };
        let passed = !policy.is_different(differing);
        tracing::debug!(
            differing,
            trigger = policy.diff_size_trigger(),
            diff_percentage,
            passed,
            "computed pixel diff"
        );

        Ok(DiffOutcome {
            differing_pixels: differing,
            diff_percentage,
            diff_size_trigger: policy.diff_size_trigger(),
            passed,
            markup: CapturedImage::from(markup),
            changed_region: bounds.into_rect(),
        })
    }

    fn differs(&self, a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
        a.0.iter()
            .zip(b.0.iter())
            .any(|(l, r)| l.abs_diff(*r) > self.tolerance)
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Default)]
struct Bounds {
    min: Option<(u32, u32)>,
    max: (u32, u32),
}

impl Bounds {
    fn include(&mut self, x: u32, y: u32) {
        let (min_x, min_y) = self.min.unwrap_or((x, y));
        self.min = Some((min_x.min(x), min_y.min(y)));
        self.max = (self.max.0.max(x), self.max.1.max(y));
    }

    fn into_rect(self) -> Option<Rect> {
        let (min_x, min_y) = self.min?;
        Some(Rect::new(
            min_x as i32,
            min_y as i32,
            self.max.0 - min_x + 1,
            self.max.1 - min_y + 1,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn with_changes(width: u32, height: u32, changed: u32) -> CapturedImage {
        let mut image = CapturedImage::filled(width, height, RED);
        for i in 0..changed {
            image
                .as_rgba_mut()
                .put_pixel(i % width, i / width, Rgba(BLUE));
        }
        image
    }

    #[test]
    fn test_identical_images() {
        let image = CapturedImage::filled(100, 100, RED);
        for threshold in [0, 1, 50, 100] {
            let result = DiffEngine::default().diff(&image, &image, threshold).unwrap();
            assert!(result.passed);
            assert_eq!(result.diff_percentage, 0.0);
            assert_eq!(result.changed_region, None);
        }
    }

    #[test]
    fn test_trigger_boundary_is_strict() {
        let baseline = CapturedImage::filled(10, 10, RED);
        let engine = DiffEngine::default();

        let ten = engine.diff(&with_changes(10, 10, 10), &baseline, 10).unwrap();
        assert_eq!(ten.diff_size_trigger, 10);
        assert!(ten.passed);

        let eleven = engine.diff(&with_changes(10, 10, 11), &baseline, 10).unwrap();
        assert!(!eleven.passed);
        assert_eq!(eleven.diff_percentage, 11.0);
    }

    #[test]
    fn test_zero_threshold_fails_on_single_pixel() {
        let baseline = CapturedImage::filled(10, 10, RED);
        let result = DiffEngine::default()
            .diff(&with_changes(10, 10, 1), &baseline, 0)
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.changed_region, Some(Rect::new(0, 0, 1, 1)));
    }

    #[test]
    fn test_full_threshold_always_same() {
        let result = DiffEngine::default()
            .diff(
                &CapturedImage::filled(8, 8, RED),
                &CapturedImage::filled(8, 8, BLUE),
                100,
            )
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.diff_percentage, 100.0);
    }

    #[test]
    fn test_passed_is_monotonic_in_threshold() {
        let baseline = CapturedImage::filled(10, 10, RED);
        let candidate = with_changes(10, 10, 37);
        let engine = DiffEngine::default();
        let mut seen_pass = false;
        for threshold in 0..=100u8 {
            let passed = engine.diff(&candidate, &baseline, threshold).unwrap().passed;
            assert!(passed || !seen_pass, "regressed at {threshold}");
            seen_pass |= passed;
        }
        assert!(seen_pass);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = DiffEngine::default()
            .diff(
                &CapturedImage::filled(10, 11, RED),
                &CapturedImage::filled(10, 10, RED),
                0,
            )
            .unwrap_err();
        assert_eq!(
            err,
            VisualError::DimensionMismatch {
                expected: (10, 10),
                actual: (10, 11)
            }
        );
    }

    #[test]
    fn test_tolerance_absorbs_small_deltas() {
        let baseline = CapturedImage::filled(2, 2, [100, 100, 100, 255]);
        let candidate = CapturedImage::filled(2, 2, [103, 98, 100, 255]);
        assert!(DiffEngine::new(3).diff(&candidate, &baseline, 0).unwrap().passed);
        assert!(!DiffEngine::new(2).diff(&candidate, &baseline, 0).unwrap().passed);
    }

    #[test]
    fn test_markup_highlights_changes() {
        let baseline = CapturedImage::filled(4, 4, RED);
        let mut candidate = baseline.clone();
        candidate.as_rgba_mut().put_pixel(2, 3, Rgba(BLUE));
        let result = DiffEngine::default()
            .with_color([1, 2, 3])
            .diff(&candidate, &baseline, 0)
            .unwrap();
        assert_eq!(result.markup.pixel(2, 3), [1, 2, 3, 255]);
        assert_eq!(result.markup.pixel(0, 0), RED);
        assert_eq!(result.changed_region, Some(Rect::new(2, 3, 1, 1)));
    }
}
