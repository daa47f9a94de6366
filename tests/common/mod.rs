/*!
 * Common test utilities for the memo-ocr test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;


use memo_ocr::app_config::{OcrConfig, PollingConfig};

/// A few bytes that start like a PNG; the services under test never decode them
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Route library log output through the test harness; `RUST_LOG=debug` shows polls
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// OCR settings pointing at a local endpoint
pub fn ocr_config(endpoint: &str) -> OcrConfig {
    OcrConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        timeout_secs: 5,
        ..Default::default()
    }
}

/// Fast polling budget for tests against a real socket
pub fn fast_polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        interval_ms: 10,
        max_attempts,
        deadline_secs: None,
        transient_retries: 2,
        retry_backoff_ms: 10,
        max_retry_delay_ms: 60_000,
    }
}

/// Status body for a pending job
pub fn status_body(status: &str) -> String {
    format!(r#"{{"status":"{}","createdDateTime":"2024-05-01T10:00:00Z"}}"#, status)
}

/// Succeeded body with one read result per group of lines
pub fn succeeded_body(groups: &[&[&str]]) -> String {
    let read_results: Vec<serde_json::Value> = groups
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let lines: Vec<serde_json::Value> = lines
                .iter()
                .map(|text| serde_json::json!({ "boundingBox": [0, 0, 10, 0, 10, 10, 0, 10], "text": text, "words": [] }))
                .collect();
            serde_json::json!({ "page": i + 1, "angle": 0, "width": 800, "height": 600, "unit": "pixel", "lines": lines })
        })
        .collect();

    serde_json::json!({
        "status": "succeeded",
        "createdDateTime": "2024-05-01T10:00:00Z",
        "lastUpdatedDateTime": "2024-05-01T10:00:02Z",
        "analyzeResult": { "version": "3.2.0", "readResults": read_results }
    })
    .to_string()
}
