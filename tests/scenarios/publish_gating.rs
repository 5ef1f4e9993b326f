//! Test: Publish Gating - tag pattern AND build success

use crate::helpers::*;
use wheelwright::core::RunStatus;

/// A push to a non-tag branch never triggers publish
#[tokio::test]
async fn test_branch_push_never_publishes() {
    let scratch = test_scratch("gate-branch");
    let config = test_config(&scratch, true);

    let result = run_pipeline(&config, "refs/heads/master", MockToolRunner::new()).await;

    assert!(result.is_success(), "{}", result.summary());
    assert_publish_skipped(&result, "not a release tag");
    // No auth, no upload
    assert_eq!(result.runner.count_matching("feed-auth"), 0);
    assert_eq!(result.runner.count_matching("twine"), 0);

    std::fs::remove_dir_all(&scratch).ok();
}

/// A release tag with all builds green publishes
#[tokio::test]
async fn test_release_tag_with_green_builds_publishes() {
    let scratch = test_scratch("gate-tag");
    let config = test_config(&scratch, true);

    let result = run_pipeline(&config, "refs/tags/v1.2.3", MockToolRunner::new()).await;

    assert!(result.is_success(), "{}", result.summary());
    assert_published(&result, 2);
    assert_eq!(result.runner.count_matching("feed-auth"), 1);
    assert_eq!(result.runner.count_matching("twine upload"), 1);

    std::fs::remove_dir_all(&scratch).ok();
}

/// A release tag with a failed build does not publish, and the run fails
#[tokio::test]
async fn test_release_tag_with_failed_build_skips_publish() {
    let scratch = test_scratch("gate-failed");
    let config = test_config(&scratch, true);

    let runner = MockToolRunner::new().fail_when("ww-pkg-py3.7 pip install", "resolver error");
    let result = run_pipeline(&config, "refs/tags/v1.2.3", runner).await;

    assert!(result.is_failed(), "{}", result.summary());
    assert_job_succeeded(&result, "build_py3.6");
    assert_job_failed(&result, "build_py3.7", "install package");
    assert_publish_skipped(&result, "did not succeed for every variant");
    assert!(result.uploaded_wheels().is_empty());

    std::fs::remove_dir_all(&scratch).ok();
}

/// A tag outside the release pattern does not build at all
#[tokio::test]
async fn test_non_release_tag_skips_run() {
    let scratch = test_scratch("gate-nontag");
    let config = test_config(&scratch, true);

    let result = run_pipeline(&config, "refs/tags/experiment", MockToolRunner::new()).await;

    assert!(result.is_skipped(), "{}", result.summary());
    assert!(result.runner.lines().is_empty(), "nothing should execute");

    std::fs::remove_dir_all(&scratch).ok();
}

/// A push to a branch outside the inclusion list skips the run
#[tokio::test]
async fn test_unlisted_branch_skips_run() {
    let scratch = test_scratch("gate-feature");
    let config = test_config(&scratch, true);

    let result = run_pipeline(&config, "refs/heads/feature/zarr", MockToolRunner::new()).await;

    assert_eq!(result.run.state.status, RunStatus::Skipped);
    assert!(result.runner.lines().is_empty());
    assert_publish_skipped(&result, "does not match trigger rules");

    std::fs::remove_dir_all(&scratch).ok();
}

/// Without a publish section a release tag still builds, then skips
#[tokio::test]
async fn test_release_tag_without_feed_config() {
    let scratch = test_scratch("gate-nofeed");
    let config = test_config(&scratch, false);

    let result = run_pipeline(&config, "refs/tags/v1.2.3", MockToolRunner::new()).await;

    assert!(result.is_success(), "{}", result.summary());
    assert_publish_skipped(&result, "No publish feed configured");

    std::fs::remove_dir_all(&scratch).ok();
}
