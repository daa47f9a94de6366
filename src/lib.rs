/*!
 * # memo-ocr - handwritten memo recognition
 *
 * A Rust library for turning drawn notes into text through a remote,
 * asynchronous OCR "read" service.
 *
 * ## Features
 *
 * - Submit image bytes and track the remote job through its handle
 * - Bounded polling: maximum attempts, overall deadline, cancellation
 * - Transient network failures retried separately from job failures
 * - Distinct, inspectable outcomes: submission, poll, timeout, failed job
 * - Configurable endpoint, credential header and job-handle header
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `recognition`: The submit/poll sequencer and its job state machine
 * - `providers`: Read API clients:
 *   - `providers::azure`: Azure Computer Vision Read API client
 *   - `providers::mock`: Scripted client for tests
 * - `file_utils`: Image payloads and file system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod recognition;

// Re-export main types for easier usage
pub use app_config::{Config, OcrConfig, PollingConfig};
pub use errors::{AppError, OcrError, ProviderError};
pub use file_utils::{FileManager, ImagePayload};
pub use providers::ReadApi;
pub use providers::azure::AzureRead;
pub use recognition::{CancelToken, OcrSequencer, RecognitionJob, RecognitionResult};
