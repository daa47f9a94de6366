/*!
 * Mock Read API implementation for testing.
 *
 * The mock replays a script of status-check outcomes and then repeats a
 * fallback step forever, which makes it easy to model remotes that finish
 * after N polls, fail, flap, or never finish at all:
 * - `MockReadApi::succeeding_after(n, result)` - pending n times, then succeeded
 * - `MockReadApi::failing_after(n)` - pending n times, then failed
 * - `MockReadApi::never_finishing()` - running forever
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::file_utils::ImagePayload;
use crate::providers::ReadApi;
use crate::recognition::model::{AnalyzeResult, JobHandle, OperationStatus, ReadOperation};

/// Simulated transport failure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockFailure {
    /// Connection dropped
    Connection,
    /// Request timed out
    Timeout,
    /// HTTP error status
    Status(u16),
    /// Credential rejected
    Unauthorized,
    /// Throttled, with optional Retry-After seconds
    RateLimited(Option<u64>),
    /// Body was not valid JSON
    Malformed,
}

impl MockFailure {
    fn to_error(self) -> ProviderError {
        match self {
            Self::Connection => ProviderError::ConnectionError("Simulated connection reset".to_string()),
            Self::Timeout => ProviderError::Timeout("Simulated request timeout".to_string()),
            Self::Status(status_code) => ProviderError::ApiError {
                status_code,
                message: "Simulated API failure".to_string(),
            },
            Self::Unauthorized => ProviderError::AuthenticationError("Simulated invalid key".to_string()),
            Self::RateLimited(retry_after_secs) => ProviderError::RateLimitExceeded {
                message: "Simulated throttling".to_string(),
                retry_after_secs,
            },
            Self::Malformed => ProviderError::ParseError("Simulated malformed body".to_string()),
        }
    }
}

/// Behavior of the submission call
#[derive(Debug, Clone, PartialEq)]
pub enum MockSubmit {
    /// Accept and hand out a job handle
    Accept,
    /// Accept but omit the job-handle header
    MissingHandle,
    /// Fail the request
    Fail(MockFailure),
}

/// One scripted status-check outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Report a status with no result
    Status(OperationStatus),
    /// Report success with the given result
    Succeeded(AnalyzeResult),
    /// Fail the status check
    Fail(MockFailure),
}

impl MockStep {
    fn to_outcome(&self) -> Result<ReadOperation, ProviderError> {
        match self {
            Self::Status(status) => Ok(ReadOperation::pending(*status)),
            Self::Succeeded(result) => Ok(ReadOperation::succeeded(result.clone())),
            Self::Fail(failure) => Err(failure.to_error()),
        }
    }
}

/// Scripted Read API for tests
#[derive(Debug, Clone)]
pub struct MockReadApi {
    submit: MockSubmit,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    fallback: MockStep,
    latency: Option<Duration>,
    submit_count: Arc<AtomicUsize>,
    poll_count: Arc<AtomicUsize>,
}

impl Default for MockReadApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReadApi {
    /// Accepts submissions and reports `running` until scripted otherwise
    pub fn new() -> Self {
        Self {
            submit: MockSubmit::Accept,
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: MockStep::Status(OperationStatus::Running),
            latency: None,
            submit_count: Arc::new(AtomicUsize::new(0)),
            poll_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pending for `pending_polls` checks, then succeeded with `result`
    pub fn succeeding_after(pending_polls: usize, result: AnalyzeResult) -> Self {
        Self::new()
            .then_pending(pending_polls)
            .otherwise(MockStep::Succeeded(result))
    }

    /// Pending for `pending_polls` checks, then failed
    pub fn failing_after(pending_polls: usize) -> Self {
        Self::new()
            .then_pending(pending_polls)
            .otherwise(MockStep::Status(OperationStatus::Failed))
    }

    /// Reports `running` forever
    pub fn never_finishing() -> Self {
        Self::new()
    }

    /// Set the submission behavior
    pub fn with_submit(mut self, submit: MockSubmit) -> Self {
        self.submit = submit;
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append one scripted step
    pub fn then(self, step: MockStep) -> Self {
        self.script.lock().push_back(step);
        self
    }

    /// Append `count` pending steps: notStarted first, running after
    pub fn then_pending(self, count: usize) -> Self {
        {
            let mut script = self.script.lock();
            for i in 0..count {
                let status = if i == 0 { OperationStatus::NotStarted } else { OperationStatus::Running };
                script.push_back(MockStep::Status(status));
            }
        }
        self
    }

    /// Step repeated once the script is exhausted
    pub fn otherwise(mut self, step: MockStep) -> Self {
        self.fallback = step;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    fn job_url(id: usize) -> Url {
        Url::parse(&format!("https://mock.local/vision/v3.2/read/analyzeResults/job-{}", id))
            .expect("mock job URL is well-formed")
    }
}

#[async_trait]
impl ReadApi for MockReadApi {
    async fn submit(&self, _image: &ImagePayload) -> Result<JobHandle, ProviderError> {
        let id = self.submit_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match &self.submit {
            MockSubmit::Accept => Ok(JobHandle::new(Self::job_url(id))),
            MockSubmit::MissingHandle => Err(ProviderError::MissingJobHandle("Operation-Location".to_string())),
            MockSubmit::Fail(failure) => Err(failure.to_error()),
        }
    }

    async fn fetch_operation(&self, _job: &JobHandle) -> Result<ReadOperation, ProviderError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let step = self.script.lock().pop_front();
        match step {
            Some(step) => step.to_outcome(),
            None => self.fallback.to_outcome(),
        }
    }
}
