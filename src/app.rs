use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use visual_check::{
    FsBaselineStore, Locator, ScreenshotConfiguration, ScreenshotParametersFactory, SearchContext,
    StaticUiContext, StepParameters, VisualActionType, VisualCheckFactory, VisualSteps,
    VisualTestingEngine,
};
use visual_engine::VisualPolicyView;

use crate::capture::FileCaptureProvider;
use crate::cli::{CheckArgs, CliArgs};
use crate::report::{ConsoleSoftAssert, FileAttachmentPublisher};
use crate::runtime::{init_logging, load_config};

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting VisualCheck v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_config(cli.config.as_ref()).await?;
    let action = cli.command.action();
    let args = cli.command.args().clone();

    let passed = tokio::task::spawn_blocking(move || run_check(loaded.policy, action, args))
        .await
        .context("Visual check task panicked")??;

    if passed {
        info!("Command completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        error!("Visual check failed");
        Ok(ExitCode::from(1))
    }
}

/// Runs one check through the step runner; `Ok(false)` means an assertion failed.
pub fn run_check(
    mut policy: VisualPolicyView,
    action: VisualActionType,
    args: CheckArgs,
) -> Result<bool> {
    if let Some(dir) = &args.baseline_dir {
        policy.baseline_dir = dir.clone();
    }
    let context = args
        .image
        .first()
        .map(|path| SearchContext::new(path.display().to_string()));

    let store = Arc::new(FsBaselineStore::new(policy.baseline_dir.clone()));
    let capture = Arc::new(FileCaptureProvider::new(args.image.clone()));
    let engine = Arc::new(VisualTestingEngine::builder(policy.clone(), capture, store).build());
    let factory = VisualCheckFactory::new(ScreenshotParametersFactory::new(policy));
    let soft_assert = Arc::new(ConsoleSoftAssert::new());
    let publisher = Arc::new(FileAttachmentPublisher::new(
        args.diff_out.clone(),
        args.report_out.clone(),
    ));

    let steps = VisualSteps::new(
        Arc::new(StaticUiContext(context)),
        engine,
        factory,
        publisher,
        soft_assert.clone(),
    );

    let config = screenshot_configuration(&args);
    let params = step_parameters(action, &args);
    steps.run_visual_tests_with_parameters(action, &args.baseline, &params, Some(&config))?;
    Ok(soft_assert.all_passed())
}

fn screenshot_configuration(args: &CheckArgs) -> ScreenshotConfiguration {
    ScreenshotConfiguration {
        device_pixel_ratio: args.dpr,
        header_cut: args.header_cut,
        footer_cut: args.footer_cut,
        strategy: args.strategy.clone(),
        area_ignores: args.area.iter().copied().map(Locator::Area).collect(),
        ..Default::default()
    }
}

fn step_parameters(action: VisualActionType, args: &CheckArgs) -> StepParameters {
    let mut params = StepParameters::default();
    if action.requires_inequality() {
        params.required_diff_percentage = args.diff_percentage;
    } else {
        params.acceptable_diff_percentage = args.diff_percentage;
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use visualcheck_core_types::{CapturedImage, Rect};

    fn write_png(dir: &Path, name: &str, image: &CapturedImage) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, image.to_png().unwrap()).unwrap();
        path
    }

    fn args(baseline_dir: &Path, image: PathBuf) -> CheckArgs {
        CheckArgs {
            baseline: "home".into(),
            image: vec![image],
            area: Vec::new(),
            diff_percentage: None,
            dpr: None,
            header_cut: None,
            footer_cut: None,
            strategy: None,
            baseline_dir: Some(baseline_dir.to_path_buf()),
            diff_out: None,
            report_out: None,
        }
    }

    #[test]
    fn establish_then_compare_and_inequality() {
        let dir = tempfile::tempdir().unwrap();
        let baselines = dir.path().join("baselines");
        let shot = write_png(dir.path(), "shot.png", &CapturedImage::filled(20, 20, [255; 4]));
        let policy = VisualPolicyView::default();

        let run = |action| run_check(policy.clone(), action, args(&baselines, shot.clone())).unwrap();

        assert!(run(VisualActionType::Establish));
        assert!(baselines.join("home.png").exists());
        assert!(run(VisualActionType::CompareAgainst));
        assert!(!run(VisualActionType::CheckInequalityAgainst));
    }

    #[test]
    fn compare_writes_diff_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let baselines = dir.path().join("baselines");
        let white = write_png(dir.path(), "white.png", &CapturedImage::filled(10, 10, [255; 4]));
        let red = write_png(dir.path(), "red.png", &CapturedImage::filled(10, 10, [255, 0, 0, 255]));
        let policy = VisualPolicyView::default();
        run_check(policy.clone(), VisualActionType::Establish, args(&baselines, white)).unwrap();

        let mut compare = args(&baselines, red);
        compare.diff_out = Some(dir.path().join("out/diff.png"));
        compare.report_out = Some(dir.path().join("out/report.json"));
        assert!(!run_check(policy, VisualActionType::CompareAgainst, compare).unwrap());

        let diff = CapturedImage::from_png(&std::fs::read(dir.path().join("out/diff.png")).unwrap()).unwrap();
        assert_eq!(diff.pixel(3, 3), [238, 111, 238, 255]);
        let report: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("out/report.json")).unwrap()).unwrap();
        assert_eq!(report["template"], "visual-comparison");
        assert_eq!(report["result"]["diff_percentage"], 100.0);
        assert_eq!(report["result"]["verdict"], false);
    }

    #[test]
    fn masked_area_hides_change() {
        let dir = tempfile::tempdir().unwrap();
        let baselines = dir.path().join("baselines");
        let base = CapturedImage::filled(10, 10, [255; 4]);
        let mut raw = vec![255u8; 10 * 10 * 4];
        raw[(2 * 10 + 2) * 4..(2 * 10 + 3) * 4].copy_from_slice(&[0, 255, 0, 255]);
        let changed = CapturedImage::from_rgba(10, 10, raw).unwrap();

        let mut establish = args(&baselines, write_png(dir.path(), "base.png", &base));
        establish.area = vec![Rect::new(0, 0, 5, 5)];
        run_check(VisualPolicyView::default(), VisualActionType::Establish, establish).unwrap();

        let mut compare = args(&baselines, write_png(dir.path(), "changed.png", &changed));
        compare.area = vec![Rect::new(0, 0, 5, 5)];
        assert!(run_check(VisualPolicyView::default(), VisualActionType::CompareAgainst, compare).unwrap());
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let shot = write_png(dir.path(), "shot.png", &CapturedImage::filled(2, 2, [255; 4]));
        let mut establish = args(dir.path(), shot);
        establish.strategy = Some("sideways".into());
        let err = run_check(VisualPolicyView::default(), VisualActionType::Establish, establish).unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }
}
