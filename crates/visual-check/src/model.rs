//! Data models for visual checks
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use visual_engine::{DiffOutcome, ScreenshotParameters};
use visualcheck_core_types::{BaselineKey, CapturedImage, CheckId, IgnoreStrategy, Rect};

use crate::errors::{CheckError, CheckResult};

/// What a check does with its baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualActionType {
    /// Store the capture as the new baseline
    Establish,
    /// Pass when the capture matches the baseline
    CompareAgainst,
    /// Pass when the capture differs from the baseline
    CheckInequalityAgainst,
}

impl VisualActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualActionType::Establish => "ESTABLISH",
            VisualActionType::CompareAgainst => "COMPARE_AGAINST",
            VisualActionType::CheckInequalityAgainst => "CHECK_INEQUALITY_AGAINST",
        }
    }

    pub fn requires_inequality(&self) -> bool {
        matches!(self, VisualActionType::CheckInequalityAgainst)
    }

    /// Diff threshold for this action, `None` when no diff runs.
    pub fn threshold(&self, check: &VisualCheck) -> Option<u8> {
        match self {
            VisualActionType::Establish => None,
            VisualActionType::CompareAgainst => Some(check.acceptable_diff_percentage.unwrap_or(0)),
            VisualActionType::CheckInequalityAgainst => {
                Some(check.required_diff_percentage.unwrap_or(0))
            }
        }
    }

    /// Turns the diff engine's "same" classification into a verdict.
    ///
    /// `same XOR requires_inequality`; establishing produces no verdict.
    pub fn verdict(&self, same: bool) -> Option<bool> {
        match self {
            VisualActionType::Establish => None,
            _ => Some(same ^ self.requires_inequality()),
        }
    }
}

impl fmt::Display for VisualActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualActionType {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ESTABLISH" => Ok(VisualActionType::Establish),
            "COMPARE_AGAINST" => Ok(VisualActionType::CompareAgainst),
            "CHECK_INEQUALITY_AGAINST" => Ok(VisualActionType::CheckInequalityAgainst),
            other => Err(CheckError::Configuration(format!(
                "unknown visual action: {other}"
            ))),
        }
    }
}

/// Something that resolves to ignored rectangles.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    Xpath(String),
    /// Raw page-space region; needs no resolution
    Area(Rect),
}

pub type LocatorMap = BTreeMap<IgnoreStrategy, BTreeSet<Locator>>;

/// Handle to the page or element a check captures from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchContext {
    pub id: String,
}

impl SearchContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One comparison request.
#[derive(Clone, Debug)]
pub struct VisualCheck {
    pub id: CheckId,
    pub baseline: BaselineKey,
    pub action: VisualActionType,
    pub acceptable_diff_percentage: Option<u8>,
    pub required_diff_percentage: Option<u8>,
    pub ignores: LocatorMap,
    pub screenshot_parameters: Option<ScreenshotParameters>,
    search_context: Option<SearchContext>,
}

impl VisualCheck {
    pub fn new(baseline: BaselineKey, action: VisualActionType) -> Self {
        Self {
            id: CheckId::new(),
            baseline,
            action,
            acceptable_diff_percentage: None,
            required_diff_percentage: None,
            ignores: LocatorMap::new(),
            screenshot_parameters: None,
            search_context: None,
        }
    }

    pub fn search_context(&self) -> Option<&SearchContext> {
        self.search_context.as_ref()
    }

    pub fn set_search_context(&mut self, context: SearchContext) {
        self.search_context = Some(context);
    }

    pub fn with_search_context(mut self, context: SearchContext) -> Self {
        self.set_search_context(context);
        self
    }

    pub fn validate(&self) -> CheckResult<()> {
        for (name, value) in [
            ("acceptable", self.acceptable_diff_percentage),
            ("required", self.required_diff_percentage),
        ] {
            if let Some(value) = value.filter(|v| *v > 100) {
                return Err(CheckError::Configuration(format!(
                    "{name} diff percentage must be within 0..=100, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable outcome of one check.
#[derive(Clone, Debug)]
pub struct VisualCheckResult {
    check_id: CheckId,
    baseline_name: BaselineKey,
    action: VisualActionType,
    baseline_found: bool,
    diff_percentage: f64,
    passed: Option<bool>,
    failure: Option<String>,
    checkpoint: CapturedImage,
    diff: Option<CapturedImage>,
    baseline: Option<CapturedImage>,
    changed_region: Option<Rect>,
    checked_at: DateTime<Utc>,
}

impl VisualCheckResult {
    fn base(check: &VisualCheck, checkpoint: CapturedImage) -> Self {
        Self {
            check_id: check.id.clone(),
            baseline_name: check.baseline.clone(),
            action: check.action,
            baseline_found: false,
            diff_percentage: 0.0,
            passed: None,
            failure: None,
            checkpoint,
            diff: None,
            baseline: None,
            changed_region: None,
            checked_at: Utc::now(),
        }
    }

    pub(crate) fn established(
        check: &VisualCheck,
        checkpoint: CapturedImage,
        previous: Option<CapturedImage>,
    ) -> Self {
        Self {
            baseline_found: previous.is_some(),
            baseline: previous,
            ..Self::base(check, checkpoint)
        }
    }

    pub(crate) fn baseline_missing(check: &VisualCheck, checkpoint: CapturedImage) -> Self {
        Self::base(check, checkpoint)
    }

    pub(crate) fn compared(
        check: &VisualCheck,
        checkpoint: CapturedImage,
        baseline: CapturedImage,
        outcome: DiffOutcome,
    ) -> Self {
        Self {
            baseline_found: true,
            diff_percentage: outcome.diff_percentage,
            passed: Some(outcome.passed),
            diff: Some(outcome.markup),
            baseline: Some(baseline),
            changed_region: outcome.changed_region,
            ..Self::base(check, checkpoint)
        }
    }

    /// Baseline exists but cannot be compared with the current capture.
    pub(crate) fn invalid_baseline(
        check: &VisualCheck,
        checkpoint: CapturedImage,
        baseline: CapturedImage,
        reason: String,
    ) -> Self {
        Self {
            baseline_found: true,
            diff_percentage: 100.0,
            failure: Some(reason),
            baseline: Some(baseline),
            ..Self::base(check, checkpoint)
        }
    }

    pub fn check_id(&self) -> &CheckId {
        &self.check_id
    }

    pub fn baseline_name(&self) -> &BaselineKey {
        &self.baseline_name
    }

    pub fn action(&self) -> VisualActionType {
        self.action
    }

    pub fn baseline_found(&self) -> bool {
        self.baseline_found
    }

    pub fn diff_percentage(&self) -> f64 {
        self.diff_percentage
    }

    /// Diff engine "same" classification, when a diff ran.
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn checkpoint(&self) -> &CapturedImage {
        &self.checkpoint
    }

    pub fn diff(&self) -> Option<&CapturedImage> {
        self.diff.as_ref()
    }

    pub fn baseline(&self) -> Option<&CapturedImage> {
        self.baseline.as_ref()
    }

    pub fn changed_region(&self) -> Option<Rect> {
        self.changed_region
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Final verdict; `None` for establish.
    pub fn verdict(&self) -> Option<bool> {
        if self.action == VisualActionType::Establish {
            return None;
        }
        if !self.baseline_found || self.failure.is_some() {
            return Some(false);
        }
        self.passed.and_then(|same| self.action.verdict(same))
    }

    /// Serializable summary with base64 PNG attachments for report sinks.
    pub fn to_report(&self) -> CheckResult<VisualReport> {
        let encode = |image: &CapturedImage| -> CheckResult<String> {
            Ok(Base64.encode(image.to_png()?))
        };
        Ok(VisualReport {
            check_id: self.check_id.0.clone(),
            baseline_name: self.baseline_name.to_string(),
            action: self.action,
            baseline_found: self.baseline_found,
            diff_percentage: self.diff_percentage,
            passed: self.passed,
            verdict: self.verdict(),
            failure: self.failure.clone(),
            changed_region: self.changed_region,
            checked_at: self.checked_at,
            checkpoint_png: encode(&self.checkpoint)?,
            diff_png: self.diff.as_ref().map(encode).transpose()?,
            baseline_png: self.baseline.as_ref().map(encode).transpose()?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisualReport {
    pub check_id: String,
    pub baseline_name: String,
    pub action: VisualActionType,
    pub baseline_found: bool,
    pub diff_percentage: f64,
    pub passed: Option<bool>,
    pub verdict: Option<bool>,
    pub failure: Option<String>,
    pub changed_region: Option<Rect>,
    pub checked_at: DateTime<Utc>,
    pub checkpoint_png: String,
    pub diff_png: Option<String>,
    pub baseline_png: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(action: VisualActionType) -> VisualCheck {
        VisualCheck::new(BaselineKey::parse("home").unwrap(), action)
    }

    #[test]
    fn verdict_is_xor_of_same_and_inequality() {
        use VisualActionType::*;
        assert_eq!(CompareAgainst.verdict(true), Some(true));
        assert_eq!(CompareAgainst.verdict(false), Some(false));
        assert_eq!(CheckInequalityAgainst.verdict(true), Some(false));
        assert_eq!(CheckInequalityAgainst.verdict(false), Some(true));
        assert_eq!(Establish.verdict(true), None);
    }

    #[test]
    fn thresholds_default_to_zero_per_action() {
        let mut compare = check(VisualActionType::CompareAgainst);
        compare.required_diff_percentage = Some(40);
        assert_eq!(compare.action.threshold(&compare), Some(0));
        compare.acceptable_diff_percentage = Some(5);
        assert_eq!(compare.action.threshold(&compare), Some(5));

        let mut inequality = check(VisualActionType::CheckInequalityAgainst);
        inequality.acceptable_diff_percentage = Some(40);
        assert_eq!(inequality.action.threshold(&inequality), Some(0));
        inequality.required_diff_percentage = Some(20);
        assert_eq!(inequality.action.threshold(&inequality), Some(20));

        let establish = check(VisualActionType::Establish);
        assert_eq!(establish.action.threshold(&establish), None);
    }

    #[test]
    fn parses_action_names() {
        assert_eq!(
            "check-inequality-against".parse::<VisualActionType>().unwrap(),
            VisualActionType::CheckInequalityAgainst
        );
        assert_eq!(
            "COMPARE_AGAINST".parse::<VisualActionType>().unwrap(),
            VisualActionType::CompareAgainst
        );
        assert!("merge".parse::<VisualActionType>().is_err());
    }

    #[test]
    fn rejects_percentages_above_hundred() {
        let mut compare = check(VisualActionType::CompareAgainst);
        compare.acceptable_diff_percentage = Some(101);
        assert!(compare.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn missing_baseline_fails_verdict() {
        let result = VisualCheckResult::baseline_missing(
            &check(VisualActionType::CheckInequalityAgainst),
            CapturedImage::new(1, 1),
        );
        assert!(!result.baseline_found());
        assert_eq!(result.passed(), None);
        assert_eq!(result.verdict(), Some(false));
    }

    #[test]
    fn invalid_baseline_fails_even_for_inequality() {
        let result = VisualCheckResult::invalid_baseline(
            &check(VisualActionType::CheckInequalityAgainst),
            CapturedImage::new(2, 2),
            CapturedImage::new(3, 3),
            "size changed".into(),
        );
        assert_eq!(result.verdict(), Some(false));
        assert_eq!(result.failure(), Some("size changed"));
    }

    #[test]
    fn report_embeds_png_attachments() {
        let result = VisualCheckResult::established(
            &check(VisualActionType::Establish),
            CapturedImage::filled(2, 2, [1, 2, 3, 255]),
            None,
        );
        let report = result.to_report().unwrap();
        let png = Base64.decode(report.checkpoint_png).unwrap();
        assert_eq!(
            CapturedImage::from_png(&png).unwrap(),
            *result.checkpoint()
        );
        assert_eq!(report.verdict, None);
        assert!(report.baseline_png.is_none());
        let json = serde_json::to_value(&VisualActionType::CheckInequalityAgainst).unwrap();
        assert_eq!(json, "CHECK_INEQUALITY_AGAINST");
    }
}
