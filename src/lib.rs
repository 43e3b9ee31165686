//! VisualCheck command line
//!
//! Exposes modules for integration testing

pub mod app;
pub mod capture;
pub mod cli;
pub mod report;
pub mod runtime;

pub use capture::FileCaptureProvider;
pub use cli::{CheckArgs, CliArgs, Commands};
pub use report::{ConsoleSoftAssert, FileAttachmentPublisher};
