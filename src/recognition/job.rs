use crate::errors::{OcrError, ProviderError};
use crate::recognition::model::{AnalyzeResult, JobHandle, OperationStatus, ReadOperation};

/// Lifecycle of a recognition job
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Accepted by the service, not polled yet
    Submitted,
    /// Last status check reported a non-terminal status
    Pending(OperationStatus),
    /// Terminal: recognition finished
    Succeeded(AnalyzeResult),
    /// Terminal: the service gave up on the job
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed)
    }
}

/// Recognized text of a finished job
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Handle of the job that produced this result
    pub job: JobHandle,
    /// Status checks it took to finish
    pub polls: u32,
    /// Structured output, one line group per page
    pub analyze_result: AnalyzeResult,
}

impl RecognitionResult {
    /// Flattened newline-joined text
    pub fn text(&self) -> String {
        self.analyze_result.text()
    }

    pub fn line_count(&self) -> usize {
        self.analyze_result.lines().count()
    }
}

/// A submitted job and the state observed so far.
///
/// Terminal states are sticky: once the job succeeded or failed, recording further
/// status responses is a no-op and `outcome` keeps returning the same value.
#[derive(Debug, Clone)]
pub struct RecognitionJob {
    handle: JobHandle,
    state: JobState,
    polls: u32,
}

impl RecognitionJob {
    pub fn new(handle: JobHandle) -> Self {
        Self { handle, state: JobState::Submitted, polls: 0 }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Status checks recorded so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a status response to the job.
    ///
    /// A `succeeded` response without a result is rejected and leaves both the
    /// state and the poll count untouched.
    pub fn record(&mut self, operation: ReadOperation) -> Result<&JobState, ProviderError> {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }

        let next = match operation.status {
            OperationStatus::Succeeded => {
                let result = operation.analyze_result.ok_or_else(|| {
                    ProviderError::ParseError("status is 'succeeded' but analyzeResult is missing".to_string())
                })?;
                JobState::Succeeded(result)
            }
            OperationStatus::Failed => JobState::Failed,
            status => JobState::Pending(status),
        };
        self.polls += 1;
        self.state = next;
        Ok(&self.state)
    }

    /// Final outcome, or `None` while the job is still in flight
    pub fn outcome(&self) -> Option<Result<RecognitionResult, OcrError>> {
        match &self.state {
            JobState::Succeeded(result) => Some(Ok(RecognitionResult {
                job: self.handle.clone(),
                polls: self.polls,
                analyze_result: result.clone(),
            })),
            JobState::Failed => Some(Err(OcrError::JobFailed { job: self.handle.to_string() })),
            JobState::Submitted | JobState::Pending(_) => None,
        }
    }
}
