//! Composed-strategy cache keyed by screenshot parameters
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::VisualResult;
use crate::policy::ScreenshotParameters;
use crate::strategy::CaptureStrategy;

/// Identity of a screenshot configuration.
///
/// The DPR is compared by bit pattern so the key stays totally ordered.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyKey {
    pub strategy: String,
    pub dpr_bits: u64,
    pub header_cut: u32,
    pub footer_cut: u32,
}

impl From<&ScreenshotParameters> for StrategyKey {
    fn from(params: &ScreenshotParameters) -> Self {
        Self {
            strategy: params.strategy.clone(),
            dpr_bits: params.device_pixel_ratio.to_bits(),
            header_cut: params.header_cut,
            footer_cut: params.footer_cut,
        }
    }
}

/// Cache for composed strategies
#[derive(Default)]
pub struct StrategyCache {
    entries: Mutex<BTreeMap<StrategyKey, Arc<CaptureStrategy>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the strategy for `key`, composing it with `build` on a miss.
    ///
    /// Failed builds are not cached.
    pub fn get_or_try_insert<F>(&self, key: StrategyKey, build: F) -> VisualResult<Arc<CaptureStrategy>>
    where
        F: FnOnce() -> VisualResult<CaptureStrategy>,
    {
        let mut entries = self.entries.lock();
        if let Some(found) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(found));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let built = Arc::new(build()?);
        tracing::debug!(strategy = %key.strategy, stages = ?built.stage_names(), "composed capture strategy");
        entries.insert(key, Arc::clone(&built));
        Ok(built)
    }

    /// Keys in their deterministic order.
    pub fn keys(&self) -> Vec<StrategyKey> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
