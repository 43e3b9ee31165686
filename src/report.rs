//! Soft assertions and attachments for command line runs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use visual_check::{AttachmentPublisher, SoftAssert, VisualCheckResult};

/// Logs every assertion and remembers whether any failed.
#[derive(Debug, Default)]
pub struct ConsoleSoftAssert {
    failures: Mutex<Vec<String>>,
}

impl ConsoleSoftAssert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    pub fn all_passed(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl SoftAssert for ConsoleSoftAssert {
    fn assert_true(&self, description: &str, condition: bool) -> bool {
        if condition {
            info!(assertion = description, "passed");
        } else {
            error!(assertion = description, "failed");
            self.failures.lock().push(description.to_string());
        }
        condition
    }

    fn record_failed_assertion(&self, message: &str) {
        error!(assertion = message, "failed");
        self.failures.lock().push(message.to_string());
    }
}

/// Writes the diff markup PNG and the JSON report where requested.
#[derive(Debug, Clone, Default)]
pub struct FileAttachmentPublisher {
    diff_out: Option<PathBuf>,
    report_out: Option<PathBuf>,
}

impl FileAttachmentPublisher {
    pub fn new(diff_out: Option<PathBuf>, report_out: Option<PathBuf>) -> Self {
        Self {
            diff_out,
            report_out,
        }
    }

    fn write(&self, template: &str, result: &VisualCheckResult, title: &str) -> Result<()> {
        if let (Some(path), Some(diff)) = (&self.diff_out, result.diff()) {
            let png = diff.to_png().context("Failed to encode diff image")?;
            write_file(path, &png)?;
            info!(path = %path.display(), "wrote diff markup");
        }
        if let Some(path) = &self.report_out {
            let report = result.to_report().context("Failed to build report")?;
            let body = serde_json::json!({
                "template": template,
                "title": title,
                "result": report,
            });
            let json = serde_json::to_vec_pretty(&body).context("Failed to serialize report")?;
            write_file(path, &json)?;
            info!(path = %path.display(), "wrote report");
        }
        Ok(())
    }
}

impl AttachmentPublisher for FileAttachmentPublisher {
    fn publish_attachment(&self, template: &str, result: &VisualCheckResult, title: &str) {
        if let Err(err) = self.write(template, result, title) {
            warn!("Failed to publish {}: {:#}", title, err);
        }
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_assert_collects_failures() {
        let soft = ConsoleSoftAssert::new();
        assert!(soft.assert_true("Visual check passed", true));
        assert!(soft.all_passed());
        assert!(!soft.assert_true("Visual check passed", false));
        soft.record_failed_assertion("Unable to find baseline with name: home");
        assert_eq!(
            soft.failures(),
            vec![
                "Visual check passed".to_string(),
                "Unable to find baseline with name: home".to_string()
            ]
        );
    }
}
