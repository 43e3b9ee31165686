//! Visual checks - baseline lifecycle and pass/fail verdicts
//!
//! This crate coordinates the visual engine with external collaborators:
//! - Capture providers and locator resolvers (ports)
//! - Baseline stores (in-memory and PNG files)
//! - Establish / compare / inequality checks with per-action verdicts
//! - Step runner that turns outcomes into soft assertions
//! - Concurrent execution of independent checks

pub mod batch;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod model;
pub mod ports;
pub mod steps;
pub mod store;

pub use batch::run_batch;
pub use engine::{VisualTestingEngine, VisualTestingEngineBuilder};
pub use errors::{CheckError, CheckResult};
pub use factory::{ScreenshotConfiguration, ScreenshotParametersFactory, VisualCheckFactory};
pub use model::*;
pub use ports::{
    AreaOnlyResolver, AttachmentPublisher, BaselineStore, CaptureProvider, LocatorResolver,
    SoftAssert, StaticUiContext, UiContext,
};
pub use steps::{StepParameters, VisualSteps};
pub use store::{FsBaselineStore, InMemoryBaselineStore};
