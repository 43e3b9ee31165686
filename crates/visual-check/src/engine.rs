//! Visual testing engine: capture, mask, diff and derive a result
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, info_span, warn};
use visual_engine::{
    DebugSink, DiffEngine, NoopDebugSink, RegionCropper, StrategyComposer, TracingDebugSink,
    VisualError, VisualPolicyView,
};
use visualcheck_core_types::{CapturedImage, IgnoreMap};

use crate::errors::{CheckError, CheckResult};
use crate::model::{Locator, LocatorMap, SearchContext, VisualActionType, VisualCheck, VisualCheckResult};
use crate::ports::{AreaOnlyResolver, BaselineStore, CaptureProvider, LocatorResolver};

pub struct VisualTestingEngineBuilder {
    policy: VisualPolicyView,
    capture: Arc<dyn CaptureProvider>,
    store: Arc<dyn BaselineStore>,
    resolver: Arc<dyn LocatorResolver>,
    debug: Option<Arc<dyn DebugSink>>,
    composer: Option<StrategyComposer>,
}

impl VisualTestingEngineBuilder {
    pub fn new(
        policy: VisualPolicyView,
        capture: Arc<dyn CaptureProvider>,
        store: Arc<dyn BaselineStore>,
    ) -> Self {
        Self {
            policy,
            capture,
            store,
            resolver: Arc::new(AreaOnlyResolver),
            debug: None,
            composer: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn LocatorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_debug_sink(mut self, debug: Arc<dyn DebugSink>) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Replaces the default composer, e.g. to register extra strategies.
    pub fn with_composer(mut self, composer: StrategyComposer) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn build(self) -> VisualTestingEngine {
        let debug = self.debug.unwrap_or_else(|| {
            if self.policy.debug_snapshots {
                Arc::new(TracingDebugSink)
            } else {
                Arc::new(NoopDebugSink)
            }
        });
        VisualTestingEngine {
            composer: self.composer.unwrap_or_default(),
            cropper: RegionCropper::new(debug).with_fill(self.policy.mask_color),
            diff: DiffEngine::new(self.policy.pixel_tolerance).with_color(self.policy.diff_color),
            policy: self.policy,
            capture: self.capture,
            store: self.store,
            resolver: self.resolver,
        }
    }
}

/// Runs visual checks one at a time on the caller's thread.
///
/// Holds no per-check state, so independent checks may share one engine
/// across threads.
pub struct VisualTestingEngine {
    composer: StrategyComposer,
    cropper: RegionCropper,
    diff: DiffEngine,
    policy: VisualPolicyView,
    capture: Arc<dyn CaptureProvider>,
    store: Arc<dyn BaselineStore>,
    resolver: Arc<dyn LocatorResolver>,
}

impl VisualTestingEngine {
    pub fn builder(
        policy: VisualPolicyView,
        capture: Arc<dyn CaptureProvider>,
        store: Arc<dyn BaselineStore>,
    ) -> VisualTestingEngineBuilder {
        VisualTestingEngineBuilder::new(policy, capture, store)
    }

    pub fn policy(&self) -> &VisualPolicyView {
        &self.policy
    }

    pub fn composer(&self) -> &StrategyComposer {
        &self.composer
    }

    /// Dispatches on the check action.
    pub fn execute(&self, check: &VisualCheck) -> CheckResult<VisualCheckResult> {
        match check.action {
            VisualActionType::Establish => self.establish(check),
            VisualActionType::CompareAgainst | VisualActionType::CheckInequalityAgainst => {
                self.compare_against(check)
            }
        }
    }

    /// Captures and stores the image as the new baseline, replacing any old one.
    pub fn establish(&self, check: &VisualCheck) -> CheckResult<VisualCheckResult> {
        let span = info_span!("visual_check", check = %check.id, baseline = %check.baseline, action = check.action.as_str());
        let _guard = span.enter();

        check.validate()?;
        let checkpoint = self.take_screenshot(check)?;
        // an unreadable old baseline must not block replacing it
        let previous = self.store.load(&check.baseline).unwrap_or_else(|err| {
            warn!(error = %err, "previous baseline unreadable, overwriting");
            None
        });
        self.store.save(&check.baseline, &checkpoint)?;
        info!(
            width = checkpoint.width(),
            height = checkpoint.height(),
            replaced = previous.is_some(),
            "baseline established"
        );
        Ok(VisualCheckResult::established(check, checkpoint, previous))
    }

    /// Diffs a fresh capture against the stored baseline.
    pub fn compare_against(&self, check: &VisualCheck) -> CheckResult<VisualCheckResult> {
        let span = info_span!("visual_check", check = %check.id, baseline = %check.baseline, action = check.action.as_str());
        let _guard = span.enter();

        check.validate()?;
        let threshold = check.action.threshold(check).ok_or_else(|| {
            CheckError::Configuration(format!(
                "{} does not compare against a baseline",
                check.action
            ))
        })?;

        let checkpoint = self.take_screenshot(check)?;
        let Some(baseline) = self.store.load(&check.baseline)? else {
            warn!("baseline not found");
            return Ok(VisualCheckResult::baseline_missing(check, checkpoint));
        };

        match self.diff.diff(&checkpoint, &baseline, threshold) {
            Ok(outcome) => {
                info!(
                    diff_percentage = outcome.diff_percentage,
                    threshold,
                    same = outcome.passed,
                    "compared against baseline"
                );
                Ok(VisualCheckResult::compared(check, checkpoint, baseline, outcome))
            }
            Err(err @ VisualError::DimensionMismatch { .. }) => {
                warn!(error = %err, "baseline is invalid for the current page");
                Ok(VisualCheckResult::invalid_baseline(
                    check,
                    checkpoint,
                    baseline,
                    err.to_string(),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn take_screenshot(&self, check: &VisualCheck) -> CheckResult<CapturedImage> {
        let context = check.search_context().ok_or_else(|| {
            CheckError::Configuration("no search context attached to the check".into())
        })?;
        let params = check
            .screenshot_parameters
            .clone()
            .unwrap_or_else(|| self.policy.default_parameters());
        let strategy = self.composer.build(&params)?;

        let tiles = self.capture.capture_raw_tiles(context, &strategy)?;
        let image = strategy.assemble(tiles)?;
        let ignores = self.resolve_ignores(context, &check.ignores)?;
        Ok(self.cropper.crop(image, &ignores, strategy.top_adjustment()))
    }

    fn resolve_ignores(&self, context: &SearchContext, locators: &LocatorMap) -> CheckResult<IgnoreMap> {
        let mut ignores = IgnoreMap::new();
        for (strategy, set) in locators {
            let mut rects = BTreeSet::new();
            for locator in set {
                match locator {
                    Locator::Area(rect) => {
                        rects.insert(*rect);
                    }
                    _ => rects.extend(self.resolver.resolve(context, locator)?),
                }
            }
            ignores.insert(*strategy, rects);
        }
        Ok(ignores)
    }
}
