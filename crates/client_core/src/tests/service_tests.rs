use super::*;
use crate::test_fixtures::spawn_mock_service;

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("url")
}

#[tokio::test]
async fn uploads_file_as_single_multipart_field() {
    let (base, mock) = spawn_mock_service(None).await.expect("spawn server");
    let service = HttpAnalysisService::new(None).expect("client");
    let file = SelectedFile::new("cohort.csv", b"race,brca1\nWhite,0.4\n".to_vec());

    let body = service
        .analyze(&url(&format!("{base}/analyze")), &file)
        .await
        .expect("analyze");

    assert_eq!(body["risk_label"], "High");
    let uploads = mock.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].path, "/analyze");
    assert_eq!(uploads[0].field.as_deref(), Some(UPLOAD_FIELD));
    assert_eq!(uploads[0].file_name.as_deref(), Some("cohort.csv"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("text/csv"));
    assert_eq!(uploads[0].bytes, b"race,brca1\nWhite,0.4\n");
}

#[tokio::test]
async fn non_success_status_keeps_body_verbatim() {
    let (base, _mock) = spawn_mock_service(Some((500, "model unavailable")))
        .await
        .expect("spawn server");
    let service = HttpAnalysisService::new(None).expect("client");
    let file = SelectedFile::new("profile.csv", b"x".to_vec());

    let err = service
        .analyze(&url(&format!("{base}/analyze")), &file)
        .await
        .expect_err("must fail");

    assert_eq!(err.status_code(), Some(500));
    assert_eq!(
        err.to_string(),
        "Analysis failed (status 500): model unavailable"
    );
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let (base, _mock) = spawn_mock_service(None).await.expect("spawn server");
    let service = HttpAnalysisService::new(None).expect("client");
    let file = SelectedFile::new("profile.csv", b"x".to_vec());

    let err = service
        .analyze(&url(&format!("{base}/not-json")), &file)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::Malformed(PayloadError::NotJson(_))));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = HttpAnalysisService::new(Some(Duration::from_secs(5))).expect("client");
    let file = SelectedFile::new("profile.csv", b"x".to_vec());
    let err = service
        .analyze(&url(&format!("http://{addr}/analyze")), &file)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::Transport { .. }));
    assert!(err.to_string().starts_with("Analysis request failed"));
}

#[tokio::test]
async fn fetches_fairness_baseline() {
    let (base, _mock) = spawn_mock_service(None).await.expect("spawn server");
    let service = HttpAnalysisService::new(None).expect("client");

    let baseline = service
        .fetch_fairness_baseline(&url(&format!("{base}/fairness")))
        .await
        .expect("baseline");

    assert_eq!(baseline.fairness_metrics.len(), 2);
    assert!((baseline.disparity_index - 0.09).abs() < 1e-9);
}

#[tokio::test]
async fn baseline_failure_names_the_baseline_request() {
    let (base, _mock) = spawn_mock_service(None).await.expect("spawn server");
    let service = HttpAnalysisService::new(None).expect("client");

    // The upload route only accepts POST.
    let err = service
        .fetch_fairness_baseline(&url(&format!("{base}/analyze")))
        .await
        .expect_err("must fail");

    assert!(matches!(err, BaselineError::Status { status: 405, .. }));
    assert!(
        err.to_string()
            .starts_with("Fairness baseline request failed (status 405)"),
        "unexpected message: {err}"
    );
}
