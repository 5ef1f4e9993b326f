//! Test: Failure Handling - matrix isolation and terminal failures

use crate::helpers::*;
use wheelwright::store::{ArtifactStore, LocalArtifactStore};

/// A failing variant does not block the sibling variant's artifact
#[tokio::test]
async fn test_matrix_isolation() {
    let scratch = test_scratch("fail-isolation");
    let config = test_config(&scratch, false);

    let runner = MockToolRunner::new().fail_when("ww-pkg-py3.6", "provisioning refused");
    let result = run_pipeline(&config, "refs/heads/master", runner).await;

    assert!(result.is_failed(), "{}", result.summary());
    assert_job_failed(&result, "build_py3.6", "create environment");
    assert_job_succeeded(&result, "build_py3.7");

    // The surviving variant stored its wheel
    let store = LocalArtifactStore::new(config.artifacts.root.clone());
    let names = store.artifact_names().await.unwrap();
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("build_py3.7"));

    std::fs::remove_dir_all(&scratch).ok();
}

/// A failed step stops the variant's sequence; later steps never run
#[tokio::test]
async fn test_failure_stops_variant_sequence() {
    let scratch = test_scratch("fail-stop");
    let config = test_config(&scratch, false);

    let runner = MockToolRunner::new().fail_when("ww-pkg-py3.6 pip install", "resolver error");
    let result = run_pipeline(&config, "refs/heads/master", runner).await;

    assert_job_failed(&result, "build_py3.6", "install package");
    // py3.6 never reached packaging
    assert_eq!(
        result.runner.count_matching("ww-pkg-py3.6 python setup.py"),
        0
    );
    // py3.7 ran its full sequence
    assert_eq!(result.runner.count_matching("ww-pkg-py3.7"), 3);

    std::fs::remove_dir_all(&scratch).ok();
}

/// No automatic retries: a failed step is attempted exactly once
#[tokio::test]
async fn test_no_retries() {
    let scratch = test_scratch("fail-noretry");
    let config = test_config(&scratch, false);

    let runner = MockToolRunner::new().fail_when("ww-pkg-py3.6 pip install", "transient glitch");
    let result = run_pipeline(&config, "refs/heads/master", runner).await;

    assert!(result.is_failed());
    assert_eq!(result.runner.count_matching("ww-pkg-py3.6 pip install"), 1);

    std::fs::remove_dir_all(&scratch).ok();
}

/// The failed step's error surfaces the tool's stderr
#[tokio::test]
async fn test_failure_carries_tool_stderr() {
    let scratch = test_scratch("fail-stderr");
    let config = test_config(&scratch, false);

    let runner =
        MockToolRunner::new().fail_when("bdist_wheel", "error: invalid command 'bdist_wheel'");
    let result = run_pipeline(&config, "refs/heads/master", runner).await;

    assert_job_failed(&result, "build_py3.6", "invalid command");
    assert_job_failed(&result, "build_py3.7", "invalid command");
    assert!(result.is_failed());

    std::fs::remove_dir_all(&scratch).ok();
}

/// All variants failing still finishes the stage and the run
#[tokio::test]
async fn test_all_variants_failing() {
    let scratch = test_scratch("fail-all");
    let config = test_config(&scratch, false);

    let runner = MockToolRunner::new().fail_when("conda create", "disk full");
    let result = run_pipeline(&config, "refs/heads/master", runner).await;

    assert!(result.is_failed(), "{}", result.summary());
    assert_eq!(result.run.state.failed_jobs, 2);
    assert_eq!(result.run.state.succeeded_jobs, 0);

    std::fs::remove_dir_all(&scratch).ok();
}
