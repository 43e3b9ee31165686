//! Capture strategy composition
//!
//! A [`CaptureStrategy`] is an ordered list of per-tile transforms (DPR
//! scaling, then an optional header/footer cut) followed by a stitcher that
//! turns the transformed tiles into one image. Strategies are built once per
//! configuration and replayed for every capture.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use image::imageops;
use image::RgbaImage;
use visualcheck_core_types::CapturedImage;

use crate::cache::{StrategyCache, StrategyKey};
use crate::errors::{VisualError, VisualResult};
use crate::policy::{validate_dpr, ScreenshotParameters};

pub const VIEWPORT: &str = "viewport";
pub const FULL_PAGE: &str = "full_page";

/// Largest logical tile DPR scaling may produce, in pixels.
pub const MAX_SCALED_PIXELS: u64 = 1 << 28;

/// One step applied to every raw tile before stitching.
pub trait TileTransform: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, tile: CapturedImage) -> VisualResult<CapturedImage>;
}

/// Maps physical tile pixels onto the logical grid.
///
/// Logical pixel `(x, y)` takes the value of physical pixel
/// `(floor(x * dpr), floor(y * dpr))`.
#[derive(Debug, Clone, Copy)]
pub struct DprScaling {
    dpr: f64,
}

impl DprScaling {
    pub fn new(dpr: f64) -> VisualResult<Self> {
        validate_dpr(dpr)?;
        Ok(Self { dpr })
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    fn logical(&self, physical: u32) -> Option<u32> {
        let logical = (f64::from(physical) / self.dpr).floor();
        (logical.is_finite() && logical <= f64::from(u32::MAX)).then_some(logical as u32)
    }

    /// Logical size of a `width x height` tile, or an error when it cannot be allocated.
    pub fn logical_dimensions(&self, width: u32, height: u32) -> VisualResult<(u32, u32)> {
        let too_large = || {
            VisualError::config(format!(
                "device pixel ratio {} scales a {width}x{height} tile beyond {MAX_SCALED_PIXELS} pixels",
                self.dpr
            ))
        };
        let (w, h) = self
            .logical(width)
            .zip(self.logical(height))
            .ok_or_else(too_large)?;
        match u64::from(w).checked_mul(u64::from(h)) {
            Some(pixels) if pixels <= MAX_SCALED_PIXELS => Ok((w, h)),
            _ => Err(too_large()),
        }
    }

    fn physical(&self, logical: u32, limit: u32) -> u32 {
        ((f64::from(logical) * self.dpr).floor() as u32).min(limit.saturating_sub(1))
    }
}

impl TileTransform for DprScaling {
    fn name(&self) -> &'static str {
        "scaling"
    }

    fn apply(&self, tile: CapturedImage) -> VisualResult<CapturedImage> {
        if self.dpr == 1.0 || tile.is_empty() {
            return Ok(tile);
        }
        let (width, height) = tile.dimensions();
        let (logical_width, logical_height) = self.logical_dimensions(width, height)?;
        let src = tile.as_rgba();
        let scaled = RgbaImage::from_fn(logical_width, logical_height, |x, y| {
            *src.get_pixel(self.physical(x, width), self.physical(y, height))
        });
        Ok(CapturedImage::from(scaled))
    }
}

/// Removes fixed header and footer strips from each tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutTransform {
    pub header: u32,
    pub footer: u32,
}

impl TileTransform for CutTransform {
    fn name(&self) -> &'static str {
        "cutting"
    }

    fn apply(&self, tile: CapturedImage) -> VisualResult<CapturedImage> {
        let (width, height) = tile.dimensions();
        let top = self.header.min(height);
        let bottom = self.footer.min(height - top);
        let kept = height - top - bottom;
        if kept == height {
            return Ok(tile);
        }
        let cropped = imageops::crop_imm(tile.as_rgba(), 0, top, width, kept).to_image();
        Ok(CapturedImage::from(cropped))
    }
}

/// Turns transformed tiles into the final image.
pub trait StitchStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether the capture provider should scroll and deliver more than one tile.
    fn scrolls(&self) -> bool;

    fn stitch(&self, tiles: Vec<CapturedImage>) -> VisualResult<CapturedImage>;
}

/// Visible viewport only; extra tiles are ignored.
#[derive(Debug, Default)]
pub struct ViewportStitch;

impl StitchStrategy for ViewportStitch {
    fn name(&self) -> &str {
        VIEWPORT
    }

    fn scrolls(&self) -> bool {
        false
    }

    fn stitch(&self, tiles: Vec<CapturedImage>) -> VisualResult<CapturedImage> {
        tiles
            .into_iter()
            .next()
            .ok_or_else(|| VisualError::Stitch("no tiles captured".into()))
    }
}

/// Scrolling capture; tiles are stacked top to bottom.
#[derive(Debug, Default)]
pub struct FullPageStitch;

impl StitchStrategy for FullPageStitch {
    fn name(&self) -> &str {
        FULL_PAGE
    }

    fn scrolls(&self) -> bool {
        true
    }

    fn stitch(&self, mut tiles: Vec<CapturedImage>) -> VisualResult<CapturedImage> {
        if tiles.is_empty() {
            return Err(VisualError::Stitch("no tiles captured".into()));
        }
        if tiles.len() == 1 {
            return Ok(tiles.remove(0));
        }
        let parts: Vec<&CapturedImage> = tiles.iter().filter(|t| !t.is_empty()).collect();
        let width = parts.first().map(|t| t.width()).unwrap_or(0);
        if let Some(odd) = parts.iter().find(|t| t.width() != width) {
            return Err(VisualError::Stitch(format!(
                "tile width {} differs from first tile width {width}",
                odd.width()
            )));
        }
        let height: u64 = parts.iter().map(|t| u64::from(t.height())).sum();
        let height = u32::try_from(height)
            .map_err(|_| VisualError::Stitch(format!("stitched height {height} is too large")))?;

        let mut canvas = RgbaImage::new(width, height);
        let mut offset = 0i64;
        for part in parts {
            imageops::replace(&mut canvas, part.as_rgba(), 0, offset);
            offset += i64::from(part.height());
        }
        Ok(CapturedImage::from(canvas))
    }
}

/// Composed capture pipeline for one screenshot configuration.
#[derive(Debug, Clone)]
pub struct CaptureStrategy {
    dpr: f64,
    header_cut: u32,
    footer_cut: u32,
    transforms: Vec<Arc<dyn TileTransform>>,
    stitcher: Arc<dyn StitchStrategy>,
}

impl CaptureStrategy {
    /// Wraps `base` with DPR scaling and, when any cut height is set, cutting.
    ///
    /// The DPR is validated here so a bad value fails before any capture runs.
    pub fn compose(
        base: Arc<dyn StitchStrategy>,
        dpr: f64,
        header_cut: u32,
        footer_cut: u32,
    ) -> VisualResult<Self> {
        let mut transforms: Vec<Arc<dyn TileTransform>> = vec![Arc::new(DprScaling::new(dpr)?)];
        if u64::from(header_cut) + u64::from(footer_cut) > 0 {
            transforms.push(Arc::new(CutTransform {
                header: header_cut,
                footer: footer_cut,
            }));
        }
        Ok(Self {
            dpr,
            header_cut,
            footer_cut,
            transforms,
            stitcher: base,
        })
    }

    pub fn name(&self) -> &str {
        self.stitcher.name()
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    pub fn scrolls(&self) -> bool {
        self.stitcher.scrolls()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Shift between page origin and image origin caused by the header cut.
    pub fn top_adjustment(&self) -> i32 {
        i32::try_from(self.header_cut).unwrap_or(i32::MAX)
    }

    pub fn footer_cut(&self) -> u32 {
        self.footer_cut
    }

    /// Replays the transforms over every tile and stitches the result.
    pub fn assemble(&self, tiles: Vec<CapturedImage>) -> VisualResult<CapturedImage> {
        let tiles = tiles
            .into_iter()
            .map(|tile| {
                self.transforms
                    .iter()
                    .try_fold(tile, |tile, transform| transform.apply(tile))
            })
            .collect::<VisualResult<Vec<_>>>()?;
        let image = self.stitcher.stitch(tiles)?;
        tracing::debug!(
            strategy = self.name(),
            width = image.width(),
            height = image.height(),
            "assembled capture"
        );
        Ok(image)
    }
}

/// Registry of named base strategies plus the composed-strategy cache.
pub struct StrategyComposer {
    strategies: BTreeMap<String, Arc<dyn StitchStrategy>>,
    cache: StrategyCache,
}

impl StrategyComposer {
    /// Composer with the built-in `viewport` and `full_page` strategies.
    pub fn new() -> Self {
        let mut composer = Self {
            strategies: BTreeMap::new(),
            cache: StrategyCache::new(),
        };
        composer.register(Arc::new(ViewportStitch));
        composer.register(Arc::new(FullPageStitch));
        composer
    }

    pub fn register(&mut self, strategy: Arc<dyn StitchStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
        self.cache.clear();
    }

    pub fn strategy_by(&self, name: &str) -> VisualResult<Arc<dyn StitchStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| VisualError::UnknownStrategy(name.to_string()))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Returns the composed strategy for `params`, building it on first use.
    pub fn build(&self, params: &ScreenshotParameters) -> VisualResult<Arc<CaptureStrategy>> {
        params.validate()?;
        self.cache.get_or_try_insert(StrategyKey::from(params), || {
            let base = self.strategy_by(&params.strategy)?;
            CaptureStrategy::compose(
                base,
                params.device_pixel_ratio,
                params.header_cut,
                params.footer_cut,
            )
        })
    }

    pub fn cache(&self) -> &StrategyCache {
        &self.cache
    }
}

impl Default for StrategyComposer {
    fn default() -> Self {
        Self::new()
    }
}
