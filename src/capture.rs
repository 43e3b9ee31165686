//! Capture provider backed by PNG files already on disk
use std::fs;
use std::path::PathBuf;

use tracing::debug;
use visual_check::{CaptureProvider, CheckError, CheckResult, SearchContext};
use visual_engine::CaptureStrategy;
use visualcheck_core_types::CapturedImage;

const SOURCE: &str = "file capture";

/// Serves pre-captured tiles; non-scrolling strategies only read the first.
#[derive(Debug, Clone)]
pub struct FileCaptureProvider {
    tiles: Vec<PathBuf>,
}

impl FileCaptureProvider {
    pub fn new(tiles: Vec<PathBuf>) -> Self {
        Self { tiles }
    }
}

impl CaptureProvider for FileCaptureProvider {
    fn capture_raw_tiles(
        &self,
        context: &SearchContext,
        strategy: &CaptureStrategy,
    ) -> CheckResult<Vec<CapturedImage>> {
        let count = if strategy.scrolls() { self.tiles.len() } else { 1 };
        debug!(context = %context.id, strategy = strategy.name(), count, "reading capture tiles");

        self.tiles
            .iter()
            .take(count)
            .map(|path| {
                let bytes = fs::read(path).map_err(|err| {
                    CheckError::collaborator(SOURCE, format!("{}: {err}", path.display()))
                })?;
                CapturedImage::from_png(&bytes).map_err(|err| {
                    CheckError::collaborator(SOURCE, format!("{}: {err}", path.display()))
                })
            })
            .collect()
    }
}
