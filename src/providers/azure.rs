use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

use crate::app_config::OcrConfig;
use crate::errors::ProviderError;
use crate::file_utils::ImagePayload;
use crate::providers::ReadApi;
use crate::recognition::model::{JobHandle, ReadOperation};

/// Azure Computer Vision Read API client
#[derive(Debug, Clone)]
pub struct AzureRead {
    /// HTTP client for API requests
    client: Client,
    /// Full URL of the analyze operation, query included
    analyze_url: Url,
    /// Header carrying the subscription key
    key_header: HeaderName,
    /// Subscription key
    api_key: HeaderValue,
    /// Response header carrying the job handle
    job_header: HeaderName,
}

impl AzureRead {
    /// Create a new client from configuration
    pub fn new(config: &OcrConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(client, config)
    }

    /// Create a client reusing an existing reqwest `Client`
    pub fn with_client(client: Client, config: &OcrConfig) -> Result<Self, ProviderError> {
        let analyze_url = Self::analyze_url(config)?;

        let key_header = HeaderName::from_bytes(config.key_header.trim().as_bytes())
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid key header name: {}", e)))?;
        let job_header = HeaderName::from_bytes(config.job_header.trim().as_bytes())
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid job header name: {}", e)))?;
        let mut api_key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|e| ProviderError::AuthenticationError(format!("Invalid API key: {}", e)))?;
        api_key.set_sensitive(true);

        Ok(Self { client, analyze_url, key_header, api_key, job_header })
    }

    /// Build the analyze URL from endpoint, path and optional query parameters
    pub fn analyze_url(config: &OcrConfig) -> Result<Url, ProviderError> {
        let raw = format!(
            "{}/{}",
            config.endpoint.trim().trim_end_matches('/'),
            config.api_path.trim().trim_start_matches('/')
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint URL '{}': {}", raw, e)))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(language) = config.language.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("language", language);
            }
            if let Some(model_version) = config.model_version.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("model-version", model_version);
            }
            if let Some(order) = config.reading_order.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("readingOrder", order);
            }
        }
        // An empty query_pairs_mut still leaves a trailing '?'
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(self.key_header.clone(), self.api_key.clone());
        headers
    }

    /// Map a non-success response into a provider error
    async fn error_from_response(response: Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());

        error!("Read API error ({}): {}", status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(format!("{}: {}", status, message))
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded { message, retry_after_secs },
            _ => ProviderError::ApiError { status_code: status.as_u16(), message },
        }
    }

    /// Resolve the job-handle header of a submission response
    fn job_handle_from(&self, response: &Response) -> Result<JobHandle, ProviderError> {
        let value = response
            .headers()
            .get(&self.job_header)
            .ok_or_else(|| ProviderError::MissingJobHandle(self.job_header.to_string()))?;
        let value = value.to_str().map_err(|e| ProviderError::InvalidJobHandle {
            value: String::from_utf8_lossy(value.as_bytes()).to_string(),
            reason: e.to_string(),
        })?;
        if value.trim().is_empty() {
            return Err(ProviderError::MissingJobHandle(self.job_header.to_string()));
        }

        // Relative locations resolve against the analyze URL
        self.analyze_url
            .join(value.trim())
            .map(JobHandle::new)
            .map_err(|e| ProviderError::InvalidJobHandle { value: value.to_string(), reason: e.to_string() })
    }
}

#[async_trait]
impl ReadApi for AzureRead {
    async fn submit(&self, image: &ImagePayload) -> Result<JobHandle, ProviderError> {
        debug!("Submitting {} bytes to {}", image.len(), self.analyze_url);

        let response = self
            .client
            .post(self.analyze_url.clone())
            .headers(self.auth_headers())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.bytes().clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        self.job_handle_from(&response)
    }

    async fn fetch_operation(&self, job: &JobHandle) -> Result<ReadOperation, ProviderError> {
        let response = self
            .client
            .get(job.url().clone())
            .headers(self.auth_headers())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str::<ReadOperation>(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            ProviderError::ParseError(format!("{} (body: {})", e, preview))
        })
    }
}
