//! Generic HTTP client tools
//!
//! Provide the request processing shared by every resource operation:
//! sending, logging, status mapping and JSON parsing.
//!
//! # design principles
//! - **Status codes map to [`ResourceError`] variants in one place** - callers never inspect raw codes
//! - **No implicit retry** - retrying happens only when `ClientConfig::max_retries` asks for it
//! - **Bodies are truncated before logging**

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ResourceError, Result};
use crate::traits::ResourceClient;
use crate::types::{ClientConfig, Fields};
use crate::utils::log_sanitizer::truncate_for_log;

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns response text
    ///
    /// Unified processing: sending requests, logging, status mapping
    ///
    /// # Arguments
    /// * `request_builder` - configured request constructor (URL, headers, body)
    /// * `method_name` - request method name (for logs)
    /// * `url` - request URL (for logs and error context)
    ///
    /// # Returns
    /// * `Ok(response_text)` - body of a 2xx response
    /// * `Err(ResourceError)` - network failure or non-success status
    pub async fn execute_request(
        request_builder: RequestBuilder,
        method_name: &str,
        url: &str,
    ) -> Result<String> {
        log::debug!("{method_name} {url}");

        // Send request
        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ResourceError::Timeout {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ResourceError::NetworkError {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("{method_name} {url} -> {status_code}");

        // Read response body
        let response_text = response
            .text()
            .await
            .map_err(|e| ResourceError::NetworkError {
                url: url.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!("Response Body: {}", truncate_for_log(&response_text));

        check_status(status_code, response_text, url)
    }

    /// Parse JSON response
    ///
    /// Empty bodies are not special-cased here.
    pub fn parse_json<T>(response_text: &str, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("JSON parse failed for {url}: {e}");
            log::error!("Raw response: {}", truncate_for_log(response_text));
            ResourceError::ParseError {
                url: url.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Performs an HTTP request and returns response text (with retries)
    ///
    /// # Retry strategy
    /// - Only transient errors are retried (see [`ResourceError::is_retryable`])
    /// - Exponential backoff: 100ms, 200ms, 400ms, 800ms, ... (maximum 10 seconds)
    /// - `max_retries == 0` sends exactly once
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        method_name: &str,
        url: &str,
        max_retries: u32,
    ) -> Result<String> {
        if max_retries == 0 {
            return Self::execute_request(request_builder, method_name, url).await;
        }

        let mut last_error = None;

        for attempt in 0..=max_retries {
            // RequestBuilder can only be used once
            let Some(req) = request_builder.try_clone() else {
                log::warn!("Cannot clone request for {url}, disabling retry");
                return Self::execute_request(request_builder, method_name, url).await;
            };

            match Self::execute_request(req, method_name, url).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = backoff_delay(attempt);
                    log::warn!(
                        "{} {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                        method_name,
                        url,
                        attempt + 1,
                        max_retries,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ResourceError::NetworkError {
            url: url.to_string(),
            detail: "All retries exhausted with no error captured".to_string(),
        }))
    }
}

/// Map an HTTP status to success or the matching [`ResourceError`].
fn check_status(status_code: u16, body: String, url: &str) -> Result<String> {
    match status_code {
        200..=299 => Ok(body),
        404 => Err(ResourceError::NotFound {
            url: url.to_string(),
        }),
        // Gateway errors are transient
        502..=504 => Err(ResourceError::NetworkError {
            url: url.to_string(),
            detail: format!("HTTP {status_code}: {body}"),
        }),
        500..=599 => Err(ResourceError::ServerError {
            url: url.to_string(),
            status: status_code,
            message: body,
        }),
        _ => Err(ResourceError::Rejected {
            url: url.to_string(),
            status: status_code,
            message: body,
        }),
    }
}

/// Calculate exponential backoff delay
///
/// Backoff strategy: 100ms, 200ms, 400ms, 800ms, 1.6s, ...
/// Maximum delay limit is 10 seconds
fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20); // Prevent 2^attempt from overflowing
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    let delay_ms = delay_ms.min(10_000);
    Duration::from_millis(delay_ms)
}

/// Parse an object body; an empty body is an empty object.
fn parse_fields(body: &str, url: &str) -> Result<Fields> {
    if body.trim().is_empty() {
        return Ok(Fields::new());
    }
    HttpUtils::parse_json(body, url)
}

/// [`ResourceClient`] over HTTP/JSON.
pub struct HttpResourceClient {
    client: Client,
    config: ClientConfig,
}

impl HttpResourceClient {
    /// Build a client from connection settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResourceError::NetworkError {
                url: config.base_url.clone(),
                detail: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    /// Connection settings in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a resource path against the base URL.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Fields>) -> Result<String> {
        let url = self.absolute_url(path);
        let method_name = method.to_string();
        let mut request = self.client.request(method, &url);
        if let Some(fields) = body {
            request = request.json(fields);
        }
        HttpUtils::execute_request_with_retry(request, &method_name, &url, self.config.max_retries)
            .await
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn list(&self, url: &str) -> Result<Vec<Fields>> {
        let body = self.send(Method::GET, url, None).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        HttpUtils::parse_json(&body, url)
    }

    async fn get(&self, url: &str) -> Result<Fields> {
        let body = self.send(Method::GET, url, None).await?;
        parse_fields(&body, url)
    }

    async fn create(&self, collection_url: &str, fields: &Fields) -> Result<Fields> {
        let body = self.send(Method::POST, collection_url, Some(fields)).await?;
        parse_fields(&body, collection_url)
    }

    async fn update(&self, member_url: &str, fields: &Fields) -> Result<Fields> {
        let body = self.send(Method::PUT, member_url, Some(fields)).await?;
        parse_fields(&body, member_url)
    }

    async fn delete(&self, member_url: &str) -> Result<()> {
        // The server answers with a plain-text acknowledgement
        self.send(Method::DELETE, member_url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ---- check_status ----

    #[test]
    fn success_passes_body_through() {
        let body = check_status(200, "[]".to_string(), "/api/album").unwrap();
        assert_eq!(body, "[]");
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let result = check_status(404, String::new(), "/api/album/9");
        assert!(
            matches!(&result, Err(ResourceError::NotFound { url }) if url == "/api/album/9"),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn server_message_is_preserved() {
        let result = check_status(500, "No album with that id".to_string(), "/api/album/9");
        assert!(
            matches!(&result, Err(ResourceError::ServerError { status: 500, message, .. }) if message == "No album with that id"),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn gateway_errors_are_retryable() {
        let err = check_status(503, "busy".to_string(), "/api/album").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_rejected() {
        let err = check_status(422, "invalid".to_string(), "/api/album").unwrap_err();
        assert!(matches!(err, ResourceError::Rejected { status: 422, .. }));
        assert!(err.is_expected());
    }

    // ---- backoff_delay ----

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn backoff_capped_at_10s() {
        // attempt 7: 100 * 2^7 = 12800ms, capped to 10000ms
        assert_eq!(backoff_delay(7), Duration::from_millis(10_000));
    }

    // ---- parsing ----

    #[test]
    fn empty_body_is_empty_object() {
        let fields = parse_fields("  ", "/api/album").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn parse_json_invalid() {
        let result: Result<Fields> = HttpUtils::parse_json("deleted", "/api/album/1");
        assert!(
            matches!(&result, Err(ResourceError::ParseError { .. })),
            "unexpected parse result: {result:?}"
        );
    }

    // ---- url resolution ----

    #[test]
    fn absolute_url_joins_base_and_path() {
        let client = HttpResourceClient::new(ClientConfig {
            base_url: "http://photos.local:8080/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.absolute_url("/api/album/2"),
            "http://photos.local:8080/api/album/2"
        );
        assert_eq!(
            client.absolute_url("https://elsewhere/api"),
            "https://elsewhere/api"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let client = HttpResourceClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            max_retries: 0,
        })
        .unwrap();
        let err = client.list("/api/album").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
    }
}
