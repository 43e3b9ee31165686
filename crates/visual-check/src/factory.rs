//! Check construction from names, actions and screenshot configuration
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use visual_engine::{ScreenshotParameters, VisualPolicyView};
use visualcheck_core_types::{BaselineKey, IgnoreStrategy};

use crate::errors::CheckResult;
use crate::model::{Locator, LocatorMap, VisualActionType, VisualCheck};

/// Per-check overrides of the engine policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfiguration {
    pub device_pixel_ratio: Option<f64>,
    pub header_cut: Option<u32>,
    pub footer_cut: Option<u32>,
    pub strategy: Option<String>,
    pub element_ignores: BTreeSet<Locator>,
    pub area_ignores: BTreeSet<Locator>,
}

impl ScreenshotConfiguration {
    /// Non-empty ignore sets keyed by strategy.
    pub fn ignores(&self) -> LocatorMap {
        [
            (IgnoreStrategy::Element, &self.element_ignores),
            (IgnoreStrategy::Area, &self.area_ignores),
        ]
        .into_iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(strategy, set)| (strategy, set.clone()))
        .collect()
    }
}

/// Merges screenshot configuration over policy defaults.
#[derive(Clone, Debug, Default)]
pub struct ScreenshotParametersFactory {
    policy: VisualPolicyView,
}

impl ScreenshotParametersFactory {
    pub fn new(policy: VisualPolicyView) -> Self {
        Self { policy }
    }

    /// `None` without a configuration; the engine then uses its defaults.
    pub fn create(&self, config: Option<&ScreenshotConfiguration>) -> Option<ScreenshotParameters> {
        let config = config?;
        let defaults = self.policy.default_parameters();
        Some(ScreenshotParameters {
            device_pixel_ratio: config
                .device_pixel_ratio
                .unwrap_or(defaults.device_pixel_ratio),
            header_cut: config.header_cut.unwrap_or(defaults.header_cut),
            footer_cut: config.footer_cut.unwrap_or(defaults.footer_cut),
            strategy: config.strategy.clone().unwrap_or(defaults.strategy),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct VisualCheckFactory {
    parameters: ScreenshotParametersFactory,
}

impl VisualCheckFactory {
    pub fn new(parameters: ScreenshotParametersFactory) -> Self {
        Self { parameters }
    }

    pub fn create(&self, baseline_name: &str, action: VisualActionType) -> CheckResult<VisualCheck> {
        self.create_with(baseline_name, action, None)
    }

    pub fn create_with(
        &self,
        baseline_name: &str,
        action: VisualActionType,
        config: Option<&ScreenshotConfiguration>,
    ) -> CheckResult<VisualCheck> {
        let mut check = VisualCheck::new(BaselineKey::parse(baseline_name)?, action);
        check.screenshot_parameters = self.parameters.create(config);
        if let Some(config) = config {
            check.ignores = config.ignores();
        }
        Ok(check)
    }
}
