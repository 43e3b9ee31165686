//! Ignore-region masking
use std::sync::Arc;

use image::Rgba;
use imageproc::drawing::draw_filled_rect_mut;
use visualcheck_core_types::{CapturedImage, IgnoreMap, IgnoreStrategy, Rect};

/// Receives intermediate images for diagnostics.
///
/// Best effort: implementations swallow their own failures and must not
/// block the check.
pub trait DebugSink: Send + Sync {
    fn emit(&self, label: &str, image: &CapturedImage);
}

#[derive(Debug, Default)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn emit(&self, _label: &str, _image: &CapturedImage) {}
}

/// Logs snapshot labels and sizes instead of writing pixels anywhere.
#[derive(Debug, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn emit(&self, label: &str, image: &CapturedImage) {
        tracing::debug!(
            label,
            width = image.width(),
            height = image.height(),
            "debug snapshot"
        );
    }
}

/// Erases ignored rectangles from captured images.
pub struct RegionCropper {
    debug: Arc<dyn DebugSink>,
    fill: Rgba<u8>,
}

impl RegionCropper {
    pub fn new(debug: Arc<dyn DebugSink>) -> Self {
        Self {
            debug,
            fill: Rgba([0, 0, 0, 255]),
        }
    }

    pub fn with_fill(mut self, fill: [u8; 4]) -> Self {
        self.fill = Rgba(fill);
        self
    }

    /// Masks every ignored rectangle, element ignores first.
    ///
    /// Rectangles are in page space; `top_adjustment` is how far the image
    /// origin sits below the page origin. Parts outside the image are dropped.
    pub fn crop(&self, image: CapturedImage, ignores: &IgnoreMap, top_adjustment: i32) -> CapturedImage {
        let mut output = image;
        for strategy in IgnoreStrategy::ORDERED {
            let Some(rects) = ignores.get(&strategy).filter(|set| !set.is_empty()) else {
                continue;
            };
            let (width, height) = output.dimensions();
            let mut masked = 0usize;
            for rect in rects {
                let shifted = rect.translate(0, top_adjustment.saturating_neg());
                if let Some(visible) = shifted.clip_to(width, height) {
                    fill_rect(&mut output, visible, self.fill);
                    masked += 1;
                }
            }
            tracing::debug!(
                strategy = %strategy,
                requested = rects.len(),
                masked,
                "masked ignored regions"
            );
            self.debug
                .emit(&format!("cropped_by_{}", strategy.as_str()), &output);
        }
        output
    }
}

fn fill_rect(image: &mut CapturedImage, rect: Rect, color: Rgba<u8>) {
    let area = imageproc::rect::Rect::at(rect.x, rect.y).of_size(rect.width, rect.height);
    draw_filled_rect_mut(image.as_rgba_mut(), area, color);
}
