use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::PollingConfig;
use crate::errors::{OcrError, ProviderError};
use crate::file_utils::ImagePayload;
use crate::providers::ReadApi;
use crate::recognition::cancel::CancelToken;
use crate::recognition::job::{JobState, RecognitionJob, RecognitionResult};
use crate::recognition::model::ReadOperation;

/// Drives a Read API job from submission to a terminal status.
///
/// One job is in flight per call and every step is strictly sequential: submit
/// finishes before the first status check, and each check finishes before the
/// next one is issued. Polling is bounded by `max_attempts` and the optional
/// deadline of the `PollingConfig`.
#[derive(Debug)]
pub struct OcrSequencer<A: ReadApi> {
    api: A,
    polling: PollingConfig,
}

impl<A: ReadApi> OcrSequencer<A> {
    /// Create a sequencer, rejecting an unusable polling budget
    pub fn new(api: A, polling: PollingConfig) -> Result<Self, OcrError> {
        polling.validate().map_err(|e| OcrError::Config(e.to_string()))?;
        Ok(Self { api, polling })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Submit an image and return the created job
    pub async fn submit(&self, image: &ImagePayload, cancel: &CancelToken) -> Result<RecognitionJob, OcrError> {
        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            submitted = self.api.submit(image) => submitted,
        };
        let handle = submitted.map_err(|e| {
            error!("OCR submission failed: {}", e);
            OcrError::Submission(e)
        })?;

        info!("OCR job accepted: {}", handle);
        Ok(RecognitionJob::new(handle))
    }

    /// Poll a job until it succeeds, fails, runs out of budget or is cancelled.
    ///
    /// Polling a job that already reached a terminal state returns the same
    /// outcome again without contacting the service.
    pub async fn poll(&self, job: &mut RecognitionJob, cancel: &CancelToken) -> Result<RecognitionResult, OcrError> {
        if let Some(outcome) = job.outcome() {
            debug!("Job {} already terminal, returning recorded outcome", job.handle());
            return outcome;
        }

        let started = Instant::now();
        let deadline = self.polling.deadline().and_then(|d| started.checked_add(d));
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("OCR job {} cancelled after {} status checks", job.handle(), attempt);
                return Err(OcrError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(self.timeout(job, attempt, started));
            }

            attempt += 1;
            let operation = self.fetch_with_retry(job, attempt, deadline, started, cancel).await?;
            job.record(operation)
                .map_err(|source| OcrError::Poll { attempt, source })?;

            match job.state() {
                JobState::Succeeded(result) => {
                    info!(
                        "OCR job {} succeeded after {} status checks ({} lines)",
                        job.handle(),
                        attempt,
                        result.lines().count()
                    );
                }
                JobState::Failed => warn!("OCR job {} reported failure", job.handle()),
                JobState::Pending(status) => {
                    debug!("OCR job {} still {:?} (check {}/{})", job.handle(), status, attempt, self.polling.max_attempts);
                }
                JobState::Submitted => {}
            }

            if let Some(outcome) = job.outcome() {
                return outcome;
            }
            if attempt >= self.polling.max_attempts {
                return Err(self.timeout(job, attempt, started));
            }

            let mut delay = self.polling.interval();
            if let Some(deadline) = deadline {
                delay = delay.min(deadline.saturating_duration_since(Instant::now()));
            }
            self.pause(delay, cancel).await?;
        }
    }

    /// Submit then poll
    pub async fn recognize(&self, image: &ImagePayload, cancel: &CancelToken) -> Result<RecognitionResult, OcrError> {
        let mut job = self.submit(image, cancel).await?;
        self.poll(&mut job, cancel).await
    }

    /// Submit, poll and flatten the result into newline-joined text
    pub async fn recognize_text(&self, image: &ImagePayload, cancel: &CancelToken) -> Result<String, OcrError> {
        Ok(self.recognize(image, cancel).await?.text())
    }

    /// One status check, retrying transient transport failures with backoff
    async fn fetch_with_retry(
        &self,
        job: &RecognitionJob,
        attempt: u32,
        deadline: Option<Instant>,
        started: Instant,
        cancel: &CancelToken,
    ) -> Result<ReadOperation, OcrError> {
        let mut retry: u32 = 0;

        loop {
            let fetched: Result<ReadOperation, ProviderError> = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                fetched = self.api.fetch_operation(job.handle()) => fetched,
                _ = until(deadline) => {
                    warn!("Status check {} for {} still running at the deadline", attempt, job.handle());
                    return Err(self.timeout(job, attempt, started));
                }
            };

            match fetched {
                Ok(operation) => return Ok(operation),
                Err(e) if e.is_transient() && retry < self.polling.transient_retries => {
                    let delay = self.polling.retry_delay(retry, e.retry_after());
                    let resume_at = Instant::now().checked_add(delay);
                    if deadline.is_some_and(|d| resume_at.is_none_or(|at| at >= d)) {
                        warn!("Status check {} failed and the deadline leaves no room to retry: {}", attempt, e);
                        return Err(self.timeout(job, attempt, started));
                    }
                    retry += 1;
                    warn!(
                        "Status check {} failed ({}), retry {}/{} in {:?}",
                        attempt, e, retry, self.polling.transient_retries, delay
                    );
                    self.pause(delay, cancel).await?;
                }
                Err(e) => {
                    error!("Status check {} for {} failed: {}", attempt, job.handle(), e);
                    return Err(OcrError::Poll { attempt, source: e });
                }
            }
        }
    }

    fn timeout(&self, job: &RecognitionJob, attempts: u32, started: Instant) -> OcrError {
        let elapsed = started.elapsed();
        warn!("OCR job {} not finished after {} status checks ({:?})", job.handle(), attempts, elapsed);
        OcrError::Timeout { attempts, elapsed }
    }

    async fn pause(&self, delay: Duration, cancel: &CancelToken) -> Result<(), OcrError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OcrError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Resolves at the deadline, or never when there is none
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
