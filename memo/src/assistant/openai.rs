//! `OpenAI` Assistants v2 client implementation.
//!
//! Maps the [`AssistantClient`] primitives onto the thread, message and run
//! endpoints of the Assistants API. Works against the official API as well
//! as compatible proxies via a custom base URL.

use super::{AssistantClient, RunStatus};
use crate::error::{AssistantError, AssistantResult};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Default `OpenAI` API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Number of recent messages inspected when looking for the assistant reply.
const REPLY_SCAN_LIMIT: u32 = 20;

/// `OpenAI` Assistants client.
///
/// # Example
///
/// ```rust,ignore
/// use memo::assistant::OpenAIAssistantClient;
///
/// let client = OpenAIAssistantClient::builder()
///     .api_key("sk-...")
///     .assistant_id("asst_...")
///     .timeout_secs(30)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct OpenAIAssistantClient {
    http_client: reqwest::Client,
    api_key: Arc<str>,
    assistant_id: Arc<str>,
    base_url: Arc<str>,
}

impl std::fmt::Debug for OpenAIAssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIAssistantClient")
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl OpenAIAssistantClient {
    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> OpenAIAssistantClientBuilder {
        OpenAIAssistantClientBuilder::default()
    }

    /// Get the base URL for API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the assistant that runs are submitted to.
    #[must_use]
    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);

        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("assistants=v2"),
        );
        headers
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{path}", self.base_url))
            .headers(self.headers())
    }

    /// Send a request, converting non-success statuses into errors.
    async fn execute(&self, builder: RequestBuilder) -> AssistantResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AssistantResult<T> {
        let response = self.execute(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantClient for OpenAIAssistantClient {
    async fn create_session(&self) -> AssistantResult<String> {
        let thread: ObjectRef = self
            .execute_json(
                self.request(Method::POST, "/threads")
                    .json(&serde_json::json!({})),
            )
            .await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(thread.id)
    }

    async fn session_exists(&self, session_id: &str) -> AssistantResult<bool> {
        match self
            .execute(self.request(Method::GET, &format!("/threads/{session_id}")))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn post_message(&self, session_id: &str, text: &str) -> AssistantResult<()> {
        let message: ObjectRef = self
            .execute_json(
                self.request(Method::POST, &format!("/threads/{session_id}/messages"))
                    .json(&serde_json::json!({ "role": "user", "content": text })),
            )
            .await?;
        debug!(thread_id = %session_id, message_id = %message.id, "created message");
        Ok(())
    }

    async fn submit_run(&self, session_id: &str) -> AssistantResult<String> {
        let run: RunObject = self
            .execute_json(
                self.request(Method::POST, &format!("/threads/{session_id}/runs"))
                    .json(&serde_json::json!({ "assistant_id": &*self.assistant_id })),
            )
            .await?;
        debug!(thread_id = %session_id, run_id = %run.id, status = %run.status, "created run");
        Ok(run.id)
    }

    async fn run_status(&self, session_id: &str, run_id: &str) -> AssistantResult<RunStatus> {
        let run: RunObject = self
            .execute_json(self.request(
                Method::GET,
                &format!("/threads/{session_id}/runs/{run_id}"),
            ))
            .await?;
        Ok(run.status)
    }

    async fn latest_reply(&self, session_id: &str) -> AssistantResult<Option<String>> {
        let messages: MessageList = self
            .execute_json(self.request(
                Method::GET,
                &format!("/threads/{session_id}/messages?order=desc&limit={REPLY_SCAN_LIMIT}"),
            ))
            .await?;
        Ok(messages.latest_assistant_text())
    }

    async fn delete_session(&self, session_id: &str) -> AssistantResult<()> {
        self.execute(self.request(Method::DELETE, &format!("/threads/{session_id}")))
            .await?;
        debug!(thread_id = %session_id, "deleted thread");
        Ok(())
    }
}

/// Builder for [`OpenAIAssistantClient`].
#[derive(Debug, Default)]
pub struct OpenAIAssistantClientBuilder {
    api_key: Option<String>,
    assistant_id: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl OpenAIAssistantClientBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the assistant that classification runs are submitted to.
    #[must_use]
    pub fn assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }

    /// Set a custom base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the per-request timeout in seconds. Default is no timeout.
    #[must_use]
    pub const fn timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an [`Auth`](crate::error::AssistantErrorKind::Auth) error if the
    /// API key or assistant ID is missing, or a provider error if the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> AssistantResult<OpenAIAssistantClient> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AssistantError::auth("API key is required"))?;
        let assistant_id = self
            .assistant_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AssistantError::auth("assistant ID is required"))?;
        let base_url = self
            .base_url
            .map_or_else(|| OPENAI_API_BASE_URL.to_string(), |u| u.trim_end_matches('/').to_string());

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }
        let http_client = builder
            .build()
            .map_err(|e| AssistantError::provider(format!("failed to build HTTP client: {e}")))?;

        Ok(OpenAIAssistantClient {
            http_client,
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: base_url.into(),
        })
    }
}

/// Map a non-success HTTP status and body to an [`AssistantError`].
fn status_error(status: StatusCode, body: &str) -> AssistantError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = detail
        .as_ref()
        .map_or_else(|| body.to_string(), |d| d.error.message.clone());

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AssistantError::auth(message),
        StatusCode::NOT_FOUND => AssistantError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => AssistantError::rate_limited(message),
        _ => AssistantError::http_status(status.as_u16(), message),
    };

    match detail.and_then(|d| d.error.code) {
        Some(code) => err.with_code(code),
        None => err,
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ObjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<MessageObject>,
}

impl MessageList {
    /// Text of the first assistant message; the list is ordered newest first.
    fn latest_assistant_text(self) -> Option<String> {
        self.data
            .into_iter()
            .find(|m| m.role == "assistant")
            .map(|m| {
                m.content
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text.value),
                        ContentPart::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantErrorKind;

    #[test]
    fn test_client_builder() {
        let client = OpenAIAssistantClient::builder()
            .api_key("test-key")
            .assistant_id("asst_123")
            .base_url("https://custom.api.com/v1/")
            .timeout_secs(30)
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "https://custom.api.com/v1");
        assert_eq!(client.assistant_id(), "asst_123");
        assert!(!format!("{client:?}").contains("test-key"));
    }

    #[test]
    fn test_builder_requires_credentials() {
        let err = OpenAIAssistantClient::builder()
            .assistant_id("asst_123")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, AssistantErrorKind::Auth);

        let err = OpenAIAssistantClient::builder()
            .api_key("key")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, AssistantErrorKind::Auth);
    }

    #[test]
    fn test_default_base_url() {
        let client = OpenAIAssistantClient::builder()
            .api_key("key")
            .assistant_id("asst")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), OPENAI_API_BASE_URL);
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"error":{"message":"No thread found with id 'thread_x'.","type":"invalid_request_error","code":null}}"#;
        let err = status_error(StatusCode::NOT_FOUND, body);
        assert!(err.is_not_found());
        assert_eq!(err.message, "No thread found with id 'thread_x'.");

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"quota","code":"insufficient_quota"}}"#);
        assert_eq!(err.kind, AssistantErrorKind::RateLimited);
        assert_eq!(err.code.as_deref(), Some("insufficient_quota"));

        let err = status_error(StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(err.kind, AssistantErrorKind::Auth);
        assert_eq!(err.message, "nope");

        let err = status_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.kind, AssistantErrorKind::HttpStatus);
    }

    #[test]
    fn test_latest_assistant_text() {
        let body = r#"{
            "object": "list",
            "data": [
                {"id": "msg_3", "role": "assistant", "content": [
                    {"type": "text", "text": {"value": "{\"category\":", "annotations": []}},
                    {"type": "image_file", "image_file": {"file_id": "file_1"}},
                    {"type": "text", "text": {"value": "\"work\"}", "annotations": []}}
                ]},
                {"id": "msg_2", "role": "user", "content": []},
                {"id": "msg_1", "role": "assistant", "content": [
                    {"type": "text", "text": {"value": "older", "annotations": []}}
                ]}
            ]
        }"#;
        let list: MessageList = serde_json::from_str(body).unwrap();
        assert_eq!(
            list.latest_assistant_text().as_deref(),
            Some("{\"category\":\"work\"}")
        );
    }

    #[test]
    fn test_latest_assistant_text_missing() {
        let body = r#"{"data": [{"id": "msg_1", "role": "user", "content": [{"type": "text", "text": {"value": "hi"}}]}]}"#;
        let list: MessageList = serde_json::from_str(body).unwrap();
        assert!(list.latest_assistant_text().is_none());
    }

    #[test]
    fn test_run_object_parsing() {
        let run: RunObject =
            serde_json::from_str(r#"{"id":"run_1","object":"thread.run","status":"queued"}"#)
                .unwrap();
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Queued);
    }
}
