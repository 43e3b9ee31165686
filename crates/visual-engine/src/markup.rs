use image::Rgba;

use crate::errors::{VisualError, VisualResult};

/// Overlay color for differing pixels.
pub const DIFF_COLOR: [u8; 3] = [238, 111, 238];

const ONE_HUNDRED: u64 = 100;

/// How many differing pixels a diff tolerates and how they are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffMarkupPolicy {
    diff_size_trigger: u64,
    color: Rgba<u8>,
}

impl DiffMarkupPolicy {
    /// `percentage` is an integer share of the image area, 0 to 100.
    pub fn new(width: u32, height: u32, percentage: u8) -> VisualResult<Self> {
        if u64::from(percentage) > ONE_HUNDRED {
            return Err(VisualError::config(format!(
                "diff percentage must be within 0..=100, got {percentage}"
            )));
        }
        let trigger = u64::from(height) * u64::from(width) * u64::from(percentage) / ONE_HUNDRED;
        Ok(Self {
            diff_size_trigger: trigger,
            color: Rgba([DIFF_COLOR[0], DIFF_COLOR[1], DIFF_COLOR[2], 255]),
        })
    }

    pub fn with_color(mut self, rgb: [u8; 3]) -> Self {
        self.color = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        self
    }

    pub fn diff_size_trigger(&self) -> u64 {
        self.diff_size_trigger
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    /// Strictly more differing pixels than the trigger means "different".
    pub fn is_different(&self, differing_pixels: u64) -> bool {
        differing_pixels > self.diff_size_trigger
    }
}
