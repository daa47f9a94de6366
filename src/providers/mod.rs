/*!
 * Read API client implementations.
 *
 * This module contains the transports the recognition sequencer talks through:
 * - Azure: Azure Computer Vision Read API over HTTP
 * - Mock: scripted in-process responses for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::file_utils::ImagePayload;
use crate::recognition::model::{JobHandle, ReadOperation};

/// Common trait for asynchronous read (submit then poll) OCR services
///
/// Implementations perform exactly one outbound request per call; retry and
/// polling policy belong to the sequencer.
#[async_trait]
pub trait ReadApi: Send + Sync + Debug {
    /// Submit an image and return the handle of the created job
    ///
    /// # Arguments
    /// * `image` - The image bytes to recognize
    ///
    /// # Returns
    /// * `Result<JobHandle, ProviderError>` - The job handle or an error
    async fn submit(&self, image: &ImagePayload) -> Result<JobHandle, ProviderError>;

    /// Fetch the current state of a job
    ///
    /// # Arguments
    /// * `job` - Handle returned by `submit`
    async fn fetch_operation(&self, job: &JobHandle) -> Result<ReadOperation, ProviderError>;
}

pub mod azure;
pub mod mock;
