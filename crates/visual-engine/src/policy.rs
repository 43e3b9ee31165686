use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{VisualError, VisualResult};
use crate::markup::DIFF_COLOR;
use crate::strategy::VIEWPORT;

/// Capture configuration for one check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotParameters {
    pub device_pixel_ratio: f64,
    pub header_cut: u32,
    pub footer_cut: u32,
    pub strategy: String,
}

impl ScreenshotParameters {
    pub fn needs_cut(&self) -> bool {
        u64::from(self.header_cut) + u64::from(self.footer_cut) > 0
    }

    pub fn validate(&self) -> VisualResult<()> {
        validate_dpr(self.device_pixel_ratio)
    }
}

impl Default for ScreenshotParameters {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            header_cut: 0,
            footer_cut: 0,
            strategy: VIEWPORT.to_string(),
        }
    }
}

pub(crate) fn validate_dpr(dpr: f64) -> VisualResult<()> {
    if !dpr.is_finite() || dpr <= 0.0 {
        return Err(VisualError::config(format!(
            "device pixel ratio must be a positive number, got {dpr}"
        )));
    }
    Ok(())
}

/// Engine-wide defaults, usually loaded from the tool configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualPolicyView {
    pub device_pixel_ratio: f64,
    pub header_cut: u32,
    pub footer_cut: u32,
    pub strategy: String,
    /// Largest per-channel delta still counted as equal.
    pub pixel_tolerance: u8,
    pub diff_color: [u8; 3],
    pub mask_color: [u8; 4],
    pub debug_snapshots: bool,
    pub baseline_dir: PathBuf,
}

impl VisualPolicyView {
    pub fn default_parameters(&self) -> ScreenshotParameters {
        ScreenshotParameters {
            device_pixel_ratio: self.device_pixel_ratio,
            header_cut: self.header_cut,
            footer_cut: self.footer_cut,
            strategy: self.strategy.clone(),
        }
    }
}

impl Default for VisualPolicyView {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            header_cut: 0,
            footer_cut: 0,
            strategy: VIEWPORT.to_string(),
            pixel_tolerance: 0,
            diff_color: DIFF_COLOR,
            mask_color: [0, 0, 0, 255],
            debug_snapshots: false,
            baseline_dir: PathBuf::from("./baselines"),
        }
    }
}
