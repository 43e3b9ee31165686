//! Narrow interfaces to the collaborators a visual check relies on
use std::collections::BTreeSet;

use visual_engine::CaptureStrategy;
use visualcheck_core_types::{BaselineKey, CapturedImage, Rect};

use crate::errors::{CheckError, CheckResult};
use crate::model::{Locator, SearchContext, VisualCheckResult};

/// Drives the page and returns raw tiles for the given strategy.
pub trait CaptureProvider: Send + Sync {
    fn capture_raw_tiles(
        &self,
        context: &SearchContext,
        strategy: &CaptureStrategy,
    ) -> CheckResult<Vec<CapturedImage>>;
}

/// Resolves element locators to page-space bounds.
pub trait LocatorResolver: Send + Sync {
    fn resolve(&self, context: &SearchContext, locator: &Locator) -> CheckResult<BTreeSet<Rect>>;
}

/// Resolver for setups without element lookup; only raw areas are accepted.
#[derive(Debug, Default)]
pub struct AreaOnlyResolver;

impl LocatorResolver for AreaOnlyResolver {
    fn resolve(&self, _context: &SearchContext, locator: &Locator) -> CheckResult<BTreeSet<Rect>> {
        match locator {
            Locator::Area(rect) => Ok(BTreeSet::from([*rect])),
            other => Err(CheckError::collaborator(
                "locator resolver",
                format!("element lookup is unavailable for {other:?}"),
            )),
        }
    }
}

/// Baseline persistence keyed by name.
///
/// Implementations must be safe for concurrent use with distinct keys.
pub trait BaselineStore: Send + Sync {
    fn load(&self, key: &BaselineKey) -> CheckResult<Option<CapturedImage>>;

    /// Overwrites any existing baseline.
    fn save(&self, key: &BaselineKey, image: &CapturedImage) -> CheckResult<()>;
}

/// Source of the current search context.
pub trait UiContext: Send + Sync {
    fn search_context(&self) -> Option<SearchContext>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticUiContext(pub Option<SearchContext>);

impl UiContext for StaticUiContext {
    fn search_context(&self) -> Option<SearchContext> {
        self.0.clone()
    }
}

/// Attaches check results to the test report.
pub trait AttachmentPublisher: Send + Sync {
    fn publish_attachment(&self, template: &str, result: &VisualCheckResult, title: &str);
}

/// Records assertion outcomes without aborting the run.
pub trait SoftAssert: Send + Sync {
    fn assert_true(&self, description: &str, condition: bool) -> bool;

    fn record_failed_assertion(&self, message: &str);
}
