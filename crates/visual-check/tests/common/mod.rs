#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use visual_check::{
    AttachmentPublisher, BaselineStore, CaptureProvider, CheckError, CheckResult,
    InMemoryBaselineStore, Locator, LocatorResolver, SearchContext, SoftAssert, VisualCheckResult,
    VisualTestingEngine,
};
use visual_engine::{CaptureStrategy, VisualPolicyView};
use visualcheck_core_types::{BaselineKey, CapturedImage, Rect};

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const RED: [u8; 4] = [255, 0, 0, 255];

/// Returns whatever tiles were last queued, or fails when told to.
#[derive(Default)]
pub struct FakeCapture {
    tiles: Mutex<Vec<CapturedImage>>,
    failure: Mutex<Option<String>>,
    strategies: Mutex<Vec<String>>,
}

impl FakeCapture {
    pub fn showing(image: CapturedImage) -> Arc<Self> {
        let capture = Arc::new(Self::default());
        capture.show(image);
        capture
    }

    pub fn show(&self, image: CapturedImage) {
        *self.tiles.lock() = vec![image];
    }

    pub fn show_tiles(&self, tiles: Vec<CapturedImage>) {
        *self.tiles.lock() = tiles;
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn strategies(&self) -> Vec<String> {
        self.strategies.lock().clone()
    }
}

impl CaptureProvider for FakeCapture {
    fn capture_raw_tiles(
        &self,
        _context: &SearchContext,
        strategy: &CaptureStrategy,
    ) -> CheckResult<Vec<CapturedImage>> {
        self.strategies.lock().push(strategy.name().to_string());
        if let Some(message) = self.failure.lock().clone() {
            return Err(CheckError::collaborator("capture provider", message));
        }
        Ok(self.tiles.lock().clone())
    }
}

/// Resolves CSS selectors from a fixed table.
#[derive(Default)]
pub struct TableResolver {
    pub table: BTreeMap<String, BTreeSet<Rect>>,
}

impl LocatorResolver for TableResolver {
    fn resolve(&self, _context: &SearchContext, locator: &Locator) -> CheckResult<BTreeSet<Rect>> {
        match locator {
            Locator::Css(selector) => self.table.get(selector).cloned().ok_or_else(|| {
                CheckError::collaborator("locator resolver", format!("no element for {selector}"))
            }),
            Locator::Xpath(path) => Err(CheckError::collaborator(
                "locator resolver",
                format!("xpath unsupported: {path}"),
            )),
            Locator::Area(rect) => Ok(BTreeSet::from([*rect])),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    Checked { description: String, passed: bool },
    Failed(String),
}

#[derive(Default)]
pub struct RecordingSoftAssert {
    pub records: Mutex<Vec<Assertion>>,
}

impl RecordingSoftAssert {
    pub fn records(&self) -> Vec<Assertion> {
        self.records.lock().clone()
    }
}

impl SoftAssert for RecordingSoftAssert {
    fn assert_true(&self, description: &str, condition: bool) -> bool {
        self.records.lock().push(Assertion::Checked {
            description: description.to_string(),
            passed: condition,
        });
        condition
    }

    fn record_failed_assertion(&self, message: &str) {
        self.records.lock().push(Assertion::Failed(message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, String, VisualCheckResult)>>,
}

impl RecordingPublisher {
    pub fn count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn last(&self) -> Option<(String, String, VisualCheckResult)> {
        self.published.lock().last().cloned()
    }
}

impl AttachmentPublisher for RecordingPublisher {
    fn publish_attachment(&self, template: &str, result: &VisualCheckResult, title: &str) {
        self.published
            .lock()
            .push((template.to_string(), title.to_string(), result.clone()));
    }
}

pub fn key(name: &str) -> BaselineKey {
    BaselineKey::parse(name).unwrap()
}

pub fn seeded_store(name: &str, image: CapturedImage) -> Arc<InMemoryBaselineStore> {
    let store = Arc::new(InMemoryBaselineStore::new());
    store.save(&key(name), &image).unwrap();
    store
}

pub fn engine(
    capture: Arc<FakeCapture>,
    store: Arc<InMemoryBaselineStore>,
) -> Arc<VisualTestingEngine> {
    Arc::new(VisualTestingEngine::builder(VisualPolicyView::default(), capture, store).build())
}

/// Copy of `base` with the first `count` pixels (row-major) painted red.
pub fn with_changed_pixels(base: &CapturedImage, count: u32) -> CapturedImage {
    let mut image = base.clone();
    let width = image.width();
    for i in 0..count {
        image
            .as_rgba_mut()
            .put_pixel(i % width, i / width, image::Rgba(RED));
    }
    image
}
