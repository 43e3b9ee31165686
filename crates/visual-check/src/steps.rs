//! Step-level entry points that turn check outcomes into soft assertions
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use visualcheck_core_types::IgnoreStrategy;

use crate::engine::VisualTestingEngine;
use crate::errors::{CheckError, CheckResult};
use crate::factory::{ScreenshotConfiguration, VisualCheckFactory};
use crate::model::{Locator, LocatorMap, VisualActionType, VisualCheck, VisualCheckResult};
use crate::ports::{AttachmentPublisher, SoftAssert, UiContext};

pub const VISUAL_COMPARISON_TEMPLATE: &str = "visual-comparison";
pub const VISUAL_COMPARISON_TITLE: &str = "Visual comparison";
pub const VISUAL_CHECK_PASSED: &str = "Visual check passed";

const STEP_PARAMETERS: &str = "step parameters";

/// Settings passed directly with a step instead of through configuration.
#[derive(Clone, Debug, Default)]
pub struct StepParameters {
    pub ignores: LocatorMap,
    pub acceptable_diff_percentage: Option<u8>,
    pub required_diff_percentage: Option<u8>,
}

pub struct VisualSteps {
    ui_context: Arc<dyn UiContext>,
    engine: Arc<VisualTestingEngine>,
    factory: VisualCheckFactory,
    publisher: Arc<dyn AttachmentPublisher>,
    soft_assert: Arc<dyn SoftAssert>,
}

impl VisualSteps {
    pub fn new(
        ui_context: Arc<dyn UiContext>,
        engine: Arc<VisualTestingEngine>,
        factory: VisualCheckFactory,
        publisher: Arc<dyn AttachmentPublisher>,
        soft_assert: Arc<dyn SoftAssert>,
    ) -> Self {
        Self {
            ui_context,
            engine,
            factory,
            publisher,
            soft_assert,
        }
    }

    pub fn run_visual_tests(&self, action: VisualActionType, baseline_name: &str) -> CheckResult<()> {
        self.run(action, baseline_name, None, None)
    }

    pub fn run_visual_tests_with_configuration(
        &self,
        action: VisualActionType,
        baseline_name: &str,
        config: &ScreenshotConfiguration,
    ) -> CheckResult<()> {
        self.run(action, baseline_name, None, Some(config))
    }

    pub fn run_visual_tests_with_parameters(
        &self,
        action: VisualActionType,
        baseline_name: &str,
        params: &StepParameters,
        config: Option<&ScreenshotConfiguration>,
    ) -> CheckResult<()> {
        self.run(action, baseline_name, Some(params), config)
    }

    /// Configuration errors are returned; collaborator failures become a
    /// failed assertion and nothing is published.
    fn run(
        &self,
        action: VisualActionType,
        baseline_name: &str,
        params: Option<&StepParameters>,
        config: Option<&ScreenshotConfiguration>,
    ) -> CheckResult<()> {
        if let Some(params) = params {
            validate_percentages(params)?;
        }
        let Some(context) = self.ui_context.search_context() else {
            debug!(baseline = baseline_name, "no search context, skipping visual check");
            return Ok(());
        };

        let mut check = self.factory.create_with(baseline_name, action, config)?;
        if let Some(params) = params {
            apply_step_parameters(&mut check, params)?;
        }
        check.set_search_context(context);

        match self.engine.execute(&check) {
            Ok(result) => {
                self.publisher
                    .publish_attachment(VISUAL_COMPARISON_TEMPLATE, &result, VISUAL_COMPARISON_TITLE);
                self.verify_result(&result);
                Ok(())
            }
            Err(err) if err.is_configuration() => Err(err),
            Err(err) => {
                warn!(baseline = %check.baseline, error = %err, "visual check failed");
                self.soft_assert.record_failed_assertion(&err.to_string());
                Ok(())
            }
        }
    }

    fn verify_result(&self, result: &VisualCheckResult) {
        if result.action() == VisualActionType::Establish {
            return;
        }
        if !result.baseline_found() {
            self.soft_assert.record_failed_assertion(&format!(
                "Unable to find baseline with name: {}",
                result.baseline_name()
            ));
            return;
        }
        if let Some(reason) = result.failure() {
            self.soft_assert.record_failed_assertion(reason);
            return;
        }
        self.soft_assert
            .assert_true(VISUAL_CHECK_PASSED, result.verdict().unwrap_or(false));
    }
}

fn validate_percentages(params: &StepParameters) -> CheckResult<()> {
    for value in [params.acceptable_diff_percentage, params.required_diff_percentage]
        .into_iter()
        .flatten()
    {
        if value > 100 {
            return Err(CheckError::Configuration(format!(
                "diff percentage must be within 0..=100, got {value}"
            )));
        }
    }
    Ok(())
}

fn apply_step_parameters(check: &mut VisualCheck, params: &StepParameters) -> CheckResult<()> {
    for strategy in IgnoreStrategy::ORDERED {
        let configured = check.ignores.remove(&strategy).unwrap_or_default();
        let step = params.ignores.get(&strategy).cloned().unwrap_or_default();
        let chosen = ignores_from_one_of(configured, STEP_PARAMETERS, step)?;
        if !chosen.is_empty() {
            check.ignores.insert(strategy, chosen);
        }
    }
    if params.acceptable_diff_percentage.is_some() {
        check.acceptable_diff_percentage = params.acceptable_diff_percentage;
    }
    if params.required_diff_percentage.is_some() {
        check.required_diff_percentage = params.required_diff_percentage;
    }
    Ok(())
}

/// Ignores come either from configuration or from `source`, never both.
fn ignores_from_one_of(
    configured: BTreeSet<Locator>,
    source_key: &str,
    source: BTreeSet<Locator>,
) -> CheckResult<BTreeSet<Locator>> {
    if source.is_empty() {
        return Ok(configured);
    }
    if !configured.is_empty() {
        return Err(CheckError::Configuration(format!(
            "The elements and areas to ignore must be passed either through screenshot configuration or {source_key}"
        )));
    }
    warn!(
        source = source_key,
        "passing elements and areas to ignore through {source_key} is deprecated, use screenshot configuration instead"
    );
    Ok(source)
}
