//! Test: Matrix Build - one uniquely-named artifact per variant

use crate::helpers::*;
use wheelwright::execution::SchedulingStrategy;
use wheelwright::store::{ArtifactStore, LocalArtifactStore};

/// A successful run produces exactly one artifact entry per variant
#[tokio::test]
async fn test_one_artifact_per_variant() {
    let scratch = test_scratch("matrix");
    let config = test_config(&scratch, false);

    let result = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;

    assert!(result.is_success(), "{}", result.summary());
    assert_job_succeeded(&result, "build_py3.6");
    assert_job_succeeded(&result, "build_py3.7");

    let store = LocalArtifactStore::new(config.artifacts.root.clone());
    let names = store.artifact_names().await.unwrap();
    assert_eq!(names.len(), 2, "exactly one artifact entry per variant");
    assert!(names.iter().all(|n| n.starts_with("artifact-")));
    assert!(names.iter().any(|n| n.ends_with("build_py3.6")));
    assert!(names.iter().any(|n| n.ends_with("build_py3.7")));

    std::fs::remove_dir_all(&scratch).ok();
}

/// Each variant drives its own step sequence in order
#[tokio::test]
async fn test_variant_step_sequence() {
    let scratch = test_scratch("matrix-seq");
    let config = test_config(&scratch, false);

    let result = run_pipeline_with_strategy(
        &config,
        "refs/heads/master",
        MockToolRunner::new(),
        SchedulingStrategy::Sequential,
    )
    .await;
    assert!(result.is_success(), "{}", result.summary());

    let lines = result.runner.lines();
    // Sequential: 3 steps for py3.6 then 3 steps for py3.7
    assert_eq!(lines.len(), 6);
    assert!(lines[0].contains("create -y -n ww-pkg-py3.6 python=3.6 numpy scipy"));
    assert!(lines[1].contains("ww-pkg-py3.6 pip install"));
    assert!(lines[2].contains("ww-pkg-py3.6 python setup.py bdist_wheel"));
    assert!(lines[3].contains("create -y -n ww-pkg-py3.7 python=3.7 numpy scipy"));
    assert!(lines[5].contains("ww-pkg-py3.7 python setup.py bdist_wheel"));

    std::fs::remove_dir_all(&scratch).ok();
}

/// Parallel scheduling runs the same work as sequential
#[tokio::test]
async fn test_parallel_matches_sequential_work() {
    let scratch = test_scratch("matrix-par");
    let config = test_config(&scratch, false);

    let result = run_pipeline_with_strategy(
        &config,
        "refs/heads/master",
        MockToolRunner::new(),
        SchedulingStrategy::Parallel,
    )
    .await;
    assert!(result.is_success(), "{}", result.summary());

    // Same invocations regardless of interleaving
    assert_eq!(result.runner.lines().len(), 6);
    assert_eq!(result.runner.count_matching("ww-pkg-py3.6"), 3);
    assert_eq!(result.runner.count_matching("ww-pkg-py3.7"), 3);

    std::fs::remove_dir_all(&scratch).ok();
}

/// Re-running for the same ref does not change the artifact naming
#[tokio::test]
async fn test_rerun_keeps_artifact_names() {
    let scratch = test_scratch("matrix-rerun");
    let config = test_config(&scratch, false);

    let first = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;
    assert!(first.is_success(), "{}", first.summary());
    let store = LocalArtifactStore::new(config.artifacts.root.clone());
    let names_before = store.artifact_names().await.unwrap();

    let second = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;
    assert!(second.is_success(), "{}", second.summary());
    let names_after = store.artifact_names().await.unwrap();

    assert_eq!(names_before, names_after);
    assert_eq!(store.collect_wheels().await.unwrap().len(), 2);

    std::fs::remove_dir_all(&scratch).ok();
}

/// Stored artifact names are reported on the succeeded job
#[tokio::test]
async fn test_job_reports_stored_artifacts() {
    let scratch = test_scratch("matrix-report");
    let config = test_config(&scratch, false);

    let result = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;

    let artifacts = result.job_artifacts("build_py3.6");
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].starts_with("artifact-"));
    assert!(artifacts[0].ends_with(".whl"));

    std::fs::remove_dir_all(&scratch).ok();
}
