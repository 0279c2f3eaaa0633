//! LLM Client: the single point of entry for all Gemini API calls in Hirewise.
//!
//! ARCHITECTURAL RULE: No other module may call the generative-language API
//! directly. All LLM interactions MUST go through a `GenerativeModel`.
//!
//! One call here is exactly one HTTP attempt. Retry policy belongs to the
//! caller (see `analysis::analyzer`); failures carry an explicit kind.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Fixed decoding parameters for every analysis call.
pub const TEMPERATURE: f32 = 0.3;
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    /// HTTP 429/503 or an upstream message reporting overload. Retryable.
    #[error("Upstream overloaded (status {status}): {message}")]
    Overloaded { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response envelope could not be decoded: {0}")]
    Decode(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    pub fn is_overloaded(&self) -> bool {
        matches!(self, LlmError::Overloaded { .. })
    }
}

/// Tags a non-success response. 429 and 503 are always overload; any other
/// status is overload only if the upstream message says so.
pub fn classify_failure(status: u16, message: String) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS.as_u16()
        || status == StatusCode::SERVICE_UNAVAILABLE.as_u16()
        || message.to_lowercase().contains("overloaded")
    {
        LlmError::Overloaded { status, message }
    } else {
        LlmError::Api { status, message }
    }
}

/// A text-in, text-out generative model. Carried in `AppState` as
/// `Arc<dyn GenerativeModel>` so tests can script upstream behaviour.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Whether a credential is available. Checked before any call is attempted.
    fn is_configured(&self) -> bool;

    /// Sends one prompt and returns the model's raw text output.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini `generateContent` client. The API key travels as the `key` query
/// parameter.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiClient {
    /// The configured key, unless it is absent or a placeholder.
    fn usable_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !is_placeholder_key(key))
    }

    pub fn new(api_key: Option<String>, endpoint: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn is_configured(&self) -> bool {
        self.usable_key().is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.usable_key().ok_or(LlmError::MissingApiKey)?;

        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse error message
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_failure(status.as_u16(), message));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = parsed.text().ok_or(LlmError::EmptyContent)?;

        debug!("Gemini call succeeded: {} chars of output", text.len());

        Ok(text.to_string())
    }
}

/// Values copied unchanged from a `.env.example`. Such a key counts as not
/// configured.
pub fn is_placeholder_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("your")
        || lower.contains("api_key_here")
        || lower.contains("placeholder")
        || lower == "changeme"
        || (key.starts_with('<') && key.ends_with('>'))
}

/// Returns the first `{ ... }` span of a model response: from the first
/// opening brace to the last closing brace.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_429_is_overloaded() {
        assert!(classify_failure(429, "quota".to_string()).is_overloaded());
    }

    #[test]
    fn test_classify_503_is_overloaded() {
        assert!(classify_failure(503, String::new()).is_overloaded());
    }

    #[test]
    fn test_classify_overloaded_message_on_500() {
        let err = classify_failure(500, "The model is overloaded. Please try again later.".to_string());
        assert!(err.is_overloaded());
    }

    #[test]
    fn test_classify_400_is_api_error() {
        match classify_failure(400, "API key not valid".to_string()) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert!((value["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_from_first_candidate() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"{\"matchPercentage\":80}"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text(), Some("{\"matchPercentage\":80}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_extract_json_object_from_fenced_output() {
        let text = "Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_object_none_without_braces() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_without_network() {
        let client = GeminiClient::new(None, "http://127.0.0.1:9".to_string()).unwrap();
        assert!(!client.is_configured());
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_placeholder_key_is_not_configured() {
        let client = GeminiClient::new(
            Some("your_gemini_api_key_here".to_string()),
            "http://127.0.0.1:9".to_string(),
        )
        .unwrap();
        assert!(!client.is_configured());
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    // ── HTTP exchanges against a local stand-in for the Gemini endpoint ──

    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Query, State};
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::analysis::analyzer::{ResumeAnalyzer, RetryPolicy};
    use crate::analysis::testing::model_reply;

    const TEST_KEY: &str = "AIzaSyExample123";

    #[derive(Clone, Default)]
    struct StubGemini {
        replies: Arc<Mutex<VecDeque<(HttpStatus, String)>>>,
        keys: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    impl StubGemini {
        fn calls(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    async fn stub_generate(
        State(stub): State<StubGemini>,
        Query(params): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (HttpStatus, String) {
        stub.keys
            .lock()
            .unwrap()
            .push(params.get("key").cloned().unwrap_or_default());
        stub.bodies.lock().unwrap().push(body);
        stub.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((HttpStatus::INTERNAL_SERVER_ERROR, "no reply scripted".to_string()))
    }

    /// Serves `replies` in order on an ephemeral port; returns a client
    /// pointed at it.
    async fn serve(replies: Vec<(HttpStatus, String)>) -> (GeminiClient, StubGemini) {
        let stub = StubGemini::default();
        stub.replies.lock().unwrap().extend(replies);

        let app = Router::new()
            .route("/generate", post(stub_generate))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client =
            GeminiClient::new(Some(TEST_KEY.to_string()), format!("http://{addr}/generate"))
                .unwrap();
        (client, stub)
    }

    fn envelope(text: &str) -> (HttpStatus, String) {
        let body = json!({"candidates": [{"content": {"parts": [{"text": text}]}}]});
        (HttpStatus::OK, body.to_string())
    }

    fn gemini_error(status: HttpStatus, message: &str) -> (HttpStatus, String) {
        let body = json!({"error": {"code": status.as_u16(), "message": message}});
        (status, body.to_string())
    }

    #[tokio::test]
    async fn test_http_503_twice_then_success() {
        let busy = "The model is overloaded. Please try again later.";
        let (client, stub) = serve(vec![
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            envelope("{\"matchPercentage\": 71}"),
        ])
        .await;

        for _ in 0..2 {
            match client.generate("prompt").await.unwrap_err() {
                LlmError::Overloaded { status, message } => {
                    assert_eq!(status, 503);
                    assert_eq!(message, busy);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
        let text = client.generate("prompt").await.unwrap();
        assert_eq!(text, "{\"matchPercentage\": 71}");

        assert_eq!(stub.keys.lock().unwrap().as_slice(), [TEST_KEY; 3]);
        let bodies = stub.bodies.lock().unwrap();
        assert_eq!(bodies[0]["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(bodies[0]["generationConfig"]["topK"], 40);
    }

    #[tokio::test]
    async fn test_http_error_bodies_are_classified() {
        let (client, _stub) = serve(vec![
            gemini_error(HttpStatus::INTERNAL_SERVER_ERROR, "Model overloaded, retry soon"),
            gemini_error(HttpStatus::BAD_REQUEST, "API key not valid"),
            (HttpStatus::BAD_GATEWAY, "upstream connect error".to_string()),
            gemini_error(HttpStatus::TOO_MANY_REQUESTS, "Resource has been exhausted"),
        ])
        .await;

        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, LlmError::Overloaded { status: 500, .. }));

        match client.generate("p").await.unwrap_err() {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // a body that is not a Gemini error envelope is kept verbatim
        match client.generate("p").await.unwrap_err() {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream connect error");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, LlmError::Overloaded { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_http_success_without_usable_content() {
        let (client, _stub) = serve(vec![
            (HttpStatus::OK, "not json at all".to_string()),
            (HttpStatus::OK, json!({"candidates": []}).to_string()),
        ])
        .await;

        assert!(matches!(
            client.generate("p").await.unwrap_err(),
            LlmError::Decode(_)
        ));
        assert!(matches!(
            client.generate("p").await.unwrap_err(),
            LlmError::EmptyContent
        ));
    }

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_analyzer_retries_real_503s_then_parses() {
        let busy = "The model is overloaded.";
        let (client, stub) = serve(vec![
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            envelope(&model_reply(77)),
        ])
        .await;

        let result = ResumeAnalyzer::new(Arc::new(client))
            .with_retry_policy(no_wait(3))
            .analyze("Jane Doe\nRust engineer", "Rust, SQL")
            .await
            .unwrap();

        assert_eq!(result.match_percentage, 77);
        assert!(!result.fallback_analysis);
        assert_eq!(stub.calls(), 4);
    }

    #[tokio::test]
    async fn test_analyzer_falls_back_when_503_persists() {
        let busy = "The model is overloaded.";
        let (client, stub) = serve(vec![
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
            gemini_error(HttpStatus::SERVICE_UNAVAILABLE, busy),
        ])
        .await;

        let result = ResumeAnalyzer::new(Arc::new(client))
            .with_retry_policy(no_wait(1))
            .analyze("Jane Doe\nRust engineer", "Rust, SQL")
            .await
            .unwrap();

        assert!(result.fallback_analysis);
        assert_eq!(stub.calls(), 2);
    }
}
