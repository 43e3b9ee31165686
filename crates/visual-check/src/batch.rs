//! Concurrent execution of independent checks
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::engine::VisualTestingEngine;
use crate::errors::{CheckError, CheckResult};
use crate::model::{VisualCheck, VisualCheckResult};

/// Runs each check on the blocking pool and returns results in input order.
///
/// A check that panics yields its own `Internal` error; the others still
/// report. Checks sharing a baseline name would race on the store, so such batches
/// are rejected up front.
pub async fn run_batch(
    engine: Arc<VisualTestingEngine>,
    checks: Vec<VisualCheck>,
) -> CheckResult<Vec<CheckResult<VisualCheckResult>>> {
    let mut seen = BTreeSet::new();
    for check in &checks {
        if !seen.insert(check.baseline.clone()) {
            return Err(CheckError::Configuration(format!(
                "baseline {} appears more than once in the batch",
                check.baseline
            )));
        }
    }
    debug!(checks = checks.len(), "running visual check batch");

    let handles: Vec<_> = checks
        .into_iter()
        .map(|check| {
            let engine = Arc::clone(&engine);
            tokio::task::spawn_blocking(move || engine.execute(&check))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle
            .await
            .map_err(|e| CheckError::Internal(format!("Task join error: {}", e)))
            .and_then(|result| result);
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SearchContext, VisualActionType};
    use crate::ports::{BaselineStore, CaptureProvider};
    use crate::store::InMemoryBaselineStore;
    use visual_engine::{CaptureStrategy, VisualPolicyView};
    use visualcheck_core_types::{BaselineKey, CapturedImage};

    struct GrayCapture;

    impl CaptureProvider for GrayCapture {
        fn capture_raw_tiles(
            &self,
            _context: &SearchContext,
            _strategy: &CaptureStrategy,
        ) -> CheckResult<Vec<CapturedImage>> {
            Ok(vec![CapturedImage::filled(20, 20, [128, 128, 128, 255])])
        }
    }

    fn check(name: &str, action: VisualActionType) -> VisualCheck {
        VisualCheck::new(BaselineKey::parse(name).unwrap(), action)
            .with_search_context(SearchContext::new("page"))
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let store = Arc::new(InMemoryBaselineStore::new());
        store
            .save(
                &BaselineKey::parse("b").unwrap(),
                &CapturedImage::filled(20, 20, [128, 128, 128, 255]),
            )
            .unwrap();
        let engine = Arc::new(
            VisualTestingEngine::builder(VisualPolicyView::default(), Arc::new(GrayCapture), store.clone())
                .build(),
        );

        let results = run_batch(
            engine,
            vec![
                check("a", VisualActionType::Establish),
                check("b", VisualActionType::CompareAgainst),
                check("c", VisualActionType::CompareAgainst),
            ],
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 3);
        let names: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().baseline_name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(results[1].as_ref().unwrap().verdict(), Some(true));
        assert!(!results[2].as_ref().unwrap().baseline_found());
        assert!(store.contains(&BaselineKey::parse("a").unwrap()));
    }

    struct CrashingCapture;

    impl CaptureProvider for CrashingCapture {
        fn capture_raw_tiles(
            &self,
            context: &SearchContext,
            _strategy: &CaptureStrategy,
        ) -> CheckResult<Vec<CapturedImage>> {
            if context.id == "broken" {
                panic!("driver crashed");
            }
            Ok(vec![CapturedImage::filled(20, 20, [128, 128, 128, 255])])
        }
    }

    #[tokio::test]
    async fn test_panicking_check_keeps_other_results() {
        let engine = Arc::new(
            VisualTestingEngine::builder(
                VisualPolicyView::default(),
                Arc::new(CrashingCapture),
                Arc::new(InMemoryBaselineStore::new()),
            )
            .build(),
        );
        let crashing = VisualCheck::new(BaselineKey::parse("b").unwrap(), VisualActionType::Establish)
            .with_search_context(SearchContext::new("broken"));

        let results = run_batch(
            engine,
            vec![
                check("a", VisualActionType::Establish),
                crashing,
                check("c", VisualActionType::Establish),
            ],
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(&results[1], Err(CheckError::Internal(_))));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_baselines_are_rejected() {
        let engine = Arc::new(
            VisualTestingEngine::builder(
                VisualPolicyView::default(),
                Arc::new(GrayCapture),
                Arc::new(InMemoryBaselineStore::new()),
            )
            .build(),
        );
        let err = run_batch(
            engine,
            vec![
                check("same", VisualActionType::Establish),
                check("same", VisualActionType::CompareAgainst),
            ],
        )
        .await
        .unwrap_err();
        assert!(err.is_configuration());
    }
}
