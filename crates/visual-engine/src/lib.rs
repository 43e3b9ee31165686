//! Visual engine - the pure image pipeline behind visual checks
//!
//! This crate provides:
//! - Capture strategy composition (DPR scaling, header/footer cut, stitching)
//! - Memoized strategies keyed by screenshot parameters
//! - Region masking for ignored elements and areas
//! - Pixel diffing with percentage thresholds and markup overlays

pub mod cache;
pub mod cropper;
pub mod diff;
pub mod errors;
pub mod markup;
pub mod policy;
pub mod strategy;

// Re-exports
pub use cache::{StrategyCache, StrategyKey};
pub use cropper::{DebugSink, NoopDebugSink, RegionCropper, TracingDebugSink};
pub use diff::{DiffEngine, DiffOutcome};
pub use errors::{VisualError, VisualResult};
pub use markup::{DiffMarkupPolicy, DIFF_COLOR};
pub use policy::{ScreenshotParameters, VisualPolicyView};
pub use strategy::{
    CaptureStrategy, CutTransform, DprScaling, FullPageStitch, StitchStrategy, StrategyComposer,
    TileTransform, ViewportStitch, FULL_PAGE, VIEWPORT,
};
