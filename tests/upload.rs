use assert_matches::assert_matches;
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use test_utils::mock_server::{MockServerBuilder, RequestPayload};
use test_utils::reports::{write_report, MULTI_SUITE_REPORT, SINGLE_SUITE_REPORT};
use trailer::client::TestRailClient;
use trailer::config::ConfigError;
use trailer::junit::ParseError;
use trailer::upload::{run_upload, UploadError, UploadOptions, UploadOutcome};

mod test_utils;

fn options(files: Vec<std::path::PathBuf>, max_attempts: usize) -> UploadOptions {
    UploadOptions {
        run_id: 42,
        comment: String::from("nightly build"),
        max_attempts,
        dry_run: false,
        files,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn uploads_merged_results_from_both_report_shapes() {
    let temp_dir = tempdir().unwrap();
    let files = vec![
        write_report(temp_dir.path(), "single.xml", SINGLE_SUITE_REPORT),
        write_report(temp_dir.path(), "multi.xml", MULTI_SUITE_REPORT),
    ];
    let state = MockServerBuilder::new().spawn_mock_server().await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let outcome = run_upload(&client, &options(files, 1)).await.unwrap();

    let results = assert_matches!(outcome, UploadOutcome::Succeeded { attempts: 1, results } => results);
    assert_eq!(results.len(), 3);

    let requests = state.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (run_id, payload, authorization) = assert_matches!(
        &requests[0],
        RequestPayload::AddResultsForCases { run_id, results, authorization } => (run_id, results, authorization)
    );
    assert_eq!(*run_id, 42);
    assert!(authorization.as_deref().unwrap_or_default().starts_with("Basic "));
    assert_eq!(
        serde_json::to_value(payload).unwrap(),
        serde_json::json!({
            "results": [
                { "case_id": 10, "status_id": 1, "elapsed": "1s" },
                {
                    "case_id": 20,
                    "status_id": 5,
                    "comment": "nightly build\n\nexpected 409, got 200",
                    "elapsed": "1s"
                },
                { "case_id": 30, "status_id": 1, "elapsed": "2s" },
            ]
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn drops_unknown_cases_and_retries() {
    let temp_dir = tempdir().unwrap();
    let files = vec![write_report(temp_dir.path(), "single.xml", SINGLE_SUITE_REPORT)];
    let state = MockServerBuilder::new()
        .add_results_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Field :results cannot be parsed (case C20 unknown)"}"#,
        )
        .spawn_mock_server()
        .await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let outcome = run_upload(&client, &options(files, 3)).await.unwrap();

    assert_matches!(outcome, UploadOutcome::Succeeded { attempts: 2, .. });
    assert_eq!(state.submitted_case_ids(), vec![vec![10, 20], vec![10]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejections_can_use_up_every_attempt() {
    let temp_dir = tempdir().unwrap();
    let files = vec![write_report(temp_dir.path(), "multi.xml", MULTI_SUITE_REPORT)];
    let state = MockServerBuilder::new()
        .add_results_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":"case C30 unknown"}"#,
        )
        .spawn_mock_server()
        .await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let outcome = run_upload(&client, &options(files, 1)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Exhausted { attempts: 1 });
    assert_eq!(state.submitted_case_ids(), vec![vec![10, 30]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn other_errors_are_fatal_and_not_retried() {
    let temp_dir = tempdir().unwrap();
    let files = vec![write_report(temp_dir.path(), "single.xml", SINGLE_SUITE_REPORT)];
    let state = MockServerBuilder::new()
        .add_results_response(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"Authentication failed: invalid or missing user/password or session cookie."}"#,
        )
        .spawn_mock_server()
        .await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let error = run_upload(&client, &options(files, 5)).await.unwrap_err();

    let upload_error = error.downcast_ref::<UploadError>().unwrap();
    assert_matches!(upload_error, UploadError::Fatal(text) if text.contains("401 Unauthorized"));
    assert_eq!(state.submitted_case_ids().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn dry_run_does_not_submit() {
    let temp_dir = tempdir().unwrap();
    let files = vec![write_report(temp_dir.path(), "multi.xml", MULTI_SUITE_REPORT)];
    let state = MockServerBuilder::new().spawn_mock_server().await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let outcome = run_upload(
        &client,
        &UploadOptions {
            dry_run: true,
            ..options(files, 1)
        },
    )
    .await
    .unwrap();

    let payload = assert_matches!(outcome, UploadOutcome::DryRun(payload) => payload);
    assert_eq!(
        payload
            .case_ids()
            .into_iter()
            .map(|id| id.get())
            .collect::<Vec<_>>(),
        vec![10, 30]
    );
    assert!(state.requests.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unparseable_report_aborts_before_submitting() {
    let temp_dir = tempdir().unwrap();
    let files = vec![
        write_report(temp_dir.path(), "single.xml", SINGLE_SUITE_REPORT),
        write_report(temp_dir.path(), "empty.xml", r#"<testsuite name="empty"></testsuite>"#),
    ];
    let state = MockServerBuilder::new().spawn_mock_server().await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let error = run_upload(&client, &options(files, 1)).await.unwrap_err();

    assert_matches!(
        error.downcast_ref::<ParseError>(),
        Some(ParseError::Unparseable(path)) if path.ends_with("empty.xml")
    );
    assert!(state.requests.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_run_id_is_rejected() {
    let state = MockServerBuilder::new().spawn_mock_server().await;
    let client = TestRailClient::new(&state.config()).unwrap();

    let error = run_upload(
        &client,
        &UploadOptions {
            run_id: 0,
            ..options(vec!["junit.xml".into()], 1)
        },
    )
    .await
    .unwrap_err();

    assert_eq!(
        error.downcast_ref::<ConfigError>(),
        Some(&ConfigError::ZeroValue("run-id"))
    );
}
