/*!
 * Azure Read client tests against a local HTTP responder
 */

use memo_ocr::errors::{OcrError, ProviderError};
use memo_ocr::file_utils::ImagePayload;
use memo_ocr::providers::ReadApi;
use memo_ocr::providers::azure::AzureRead;
use memo_ocr::recognition::{CancelToken, OcrSequencer, OperationStatus};

use crate::common::{self, mock_server::{CannedResponse, MockServer}};

fn image() -> ImagePayload {
    ImagePayload::from_bytes(common::FAKE_PNG.to_vec()).unwrap()
}

#[tokio::test]
async fn test_submit_shouldSendKeyAndBytesAndReturnHandle() {
    let server = MockServer::start(CannedResponse::accepted("job-42"), vec![]).await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let job = client.submit(&image()).await.unwrap();

    assert_eq!(
        job.as_str(),
        format!("{}/vision/v3.2/read/analyzeResults/job-42", server.url())
    );
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/vision/v3.2/read/analyze");
    assert_eq!(request.header("Ocp-Apim-Subscription-Key"), Some("test-key"));
    assert_eq!(request.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(request.body, common::FAKE_PNG);
}

#[tokio::test]
async fn test_submit_withLanguage_shouldAddQuery() {
    let server = MockServer::start(CannedResponse::accepted("job-1"), vec![]).await;
    let mut config = common::ocr_config(&format!("{}/", server.url()));
    config.language = Some("ja".to_string());
    let client = AzureRead::new(&config).unwrap();

    client.submit(&image()).await.unwrap();

    assert_eq!(server.requests()[0].path, "/vision/v3.2/read/analyze?language=ja");
}

#[tokio::test]
async fn test_submit_withCustomHeaders_shouldUseConfiguredNames() {
    let submit = CannedResponse::new(202).header("X-Job", "{base}/jobs/7");
    let server = MockServer::start(submit, vec![]).await;
    let mut config = common::ocr_config(&server.url());
    config.key_header = "X-Api-Key".to_string();
    config.job_header = "X-Job".to_string();
    let client = AzureRead::new(&config).unwrap();

    let job = client.submit(&image()).await.unwrap();

    assert_eq!(job.url().path(), "/jobs/7");
    assert_eq!(server.requests()[0].header("X-Api-Key"), Some("test-key"));
}

#[tokio::test]
async fn test_submit_withoutJobHeader_shouldFail() {
    let server = MockServer::start(CannedResponse::new(202), vec![]).await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let error = client.submit(&image()).await.unwrap_err();

    assert!(matches!(error, ProviderError::MissingJobHandle(ref header) if header.eq_ignore_ascii_case("operation-location")));
}

#[tokio::test]
async fn test_submit_withRejectedKey_shouldReturnAuthenticationError() {
    let submit = CannedResponse::new(401).body(r#"{"error":{"code":"401","message":"Access denied"}}"#);
    let server = MockServer::start(submit, vec![]).await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let error = client.submit(&image()).await.unwrap_err();

    match error {
        ProviderError::AuthenticationError(message) => assert!(message.contains("Access denied")),
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_withBadRequest_shouldReturnApiError() {
    let submit = CannedResponse::new(400).body("InvalidImageFormat");
    let server = MockServer::start(submit, vec![]).await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let error = client.submit(&image()).await.unwrap_err();

    assert!(matches!(error, ProviderError::ApiError { status_code: 400, .. }));
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_fetch_operation_shouldParseStatus() {
    let server = MockServer::start(
        CannedResponse::accepted("job-1"),
        vec![CannedResponse::json(common::status_body("running"))],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let job = client.submit(&image()).await.unwrap();
    let operation = client.fetch_operation(&job).await.unwrap();

    assert_eq!(operation.status, OperationStatus::Running);
    let requests = server.requests();
    assert_eq!(requests[1].method, "GET");
    assert_eq!(requests[1].path, "/vision/v3.2/read/analyzeResults/job-1");
    assert_eq!(requests[1].header("Ocp-Apim-Subscription-Key"), Some("test-key"));
}

#[tokio::test]
async fn test_fetch_operation_withThrottling_shouldReadRetryAfter() {
    let server = MockServer::start(
        CannedResponse::accepted("job-1"),
        vec![CannedResponse::new(429).header("Retry-After", "3").body("Too many requests")],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let job = client.submit(&image()).await.unwrap();
    let error = client.fetch_operation(&job).await.unwrap_err();

    assert!(matches!(error, ProviderError::RateLimitExceeded { retry_after_secs: Some(3), .. }));
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_sequencer_endToEnd_shouldFlattenTwoGroups() {
    common::init_test_logging();
    let server = MockServer::start(
        CannedResponse::accepted("job-9"),
        vec![
            CannedResponse::json(common::status_body("notStarted")),
            CannedResponse::json(common::status_body("running")),
            CannedResponse::json(common::succeeded_body(&[&["Hello", "World"], &["Foo"]])),
        ],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(10)).unwrap();

    let result = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap();

    assert_eq!(result.text(), "Hello\nWorld\nFoo");
    assert_eq!(result.polls, 3);
    assert_eq!(result.analyze_result.read_results.len(), 2);
    assert_eq!(server.count("POST"), 1);
    assert_eq!(server.count("GET"), 3);
}

#[tokio::test]
async fn test_sequencer_withFailedJob_shouldReturnJobFailed() {
    let server = MockServer::start(
        CannedResponse::accepted("job-9"),
        vec![
            CannedResponse::json(common::status_body("running")),
            CannedResponse::json(common::status_body("failed")),
        ],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(10)).unwrap();

    let error = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap_err();

    assert!(matches!(error, OcrError::JobFailed { .. }));
    assert_eq!(server.count("GET"), 2);
}

#[tokio::test]
async fn test_sequencer_withServerErrorThenSuccess_shouldRetry() {
    common::init_test_logging();
    let server = MockServer::start(
        CannedResponse::accepted("job-9"),
        vec![
            CannedResponse::new(503).body("busy"),
            CannedResponse::new(429).header("Retry-After", "0"),
            CannedResponse::json(common::succeeded_body(&[&["retried"]])),
        ],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(10)).unwrap();

    let result = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap();

    assert_eq!(result.text(), "retried");
    assert_eq!(result.polls, 1);
    assert_eq!(server.count("GET"), 3);
}

#[tokio::test]
async fn test_sequencer_withNeverFinishingJob_shouldTimeOut() {
    let server = MockServer::start(
        CannedResponse::accepted("job-9"),
        vec![CannedResponse::json(common::status_body("running"))],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(4)).unwrap();

    let error = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap_err();

    assert!(matches!(error, OcrError::Timeout { attempts: 4, .. }));
    assert_eq!(server.count("GET"), 4);
}

#[tokio::test]
async fn test_sequencer_withMalformedBody_shouldReturnPollError() {
    let server = MockServer::start(
        CannedResponse::accepted("job-9"),
        vec![CannedResponse::json("<html>oops</html>")],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(4)).unwrap();

    let error = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap_err();

    assert!(matches!(error, OcrError::Poll { attempt: 1, source: ProviderError::ParseError(_) }));
}

#[tokio::test]
async fn test_submit_withUnreachableEndpoint_shouldReturnSubmissionError() {
    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = AzureRead::new(&common::ocr_config(&url)).unwrap();
    let sequencer = OcrSequencer::new(client, common::fast_polling(4)).unwrap();

    let error = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap_err();

    match error {
        OcrError::Submission(source) => assert!(source.is_transient()),
        other => panic!("expected submission error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_withRelativeLocation_shouldResolveAgainstAnalyzeUrl() {
    let submit = CannedResponse::new(202).header("Operation-Location", "analyzeResults/rel-1");
    let server = MockServer::start(
        submit,
        vec![CannedResponse::json(common::succeeded_body(&[&["relative"]]))],
    )
    .await;
    let client = AzureRead::new(&common::ocr_config(&server.url())).unwrap();

    let job = client.submit(&image()).await.unwrap();
    assert_eq!(
        job.as_str(),
        format!("{}/vision/v3.2/read/analyzeResults/rel-1", server.url())
    );

    let sequencer = OcrSequencer::new(client, common::fast_polling(3)).unwrap();
    let result = sequencer.recognize(&image(), &CancelToken::new()).await.unwrap();

    assert_eq!(result.text(), "relative");
    assert_eq!(server.requests().last().unwrap().path, "/vision/v3.2/read/analyzeResults/rel-1");
}
