// ABOUTME: Client for the external Analysis Service (transcript scoring and follow-up chat)
// ABOUTME: Typed request/response contract, deadline enforcement, and upstream error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Analysis Service Client
//!
//! The Analysis Service is an HTTP collaborator exposing two endpoints:
//!
//! - `POST {base}/analyze` scores a transcript along the four evaluation axes
//! - `POST {base}/detailed-chat` answers a follow-up question about one statement
//!
//! Every call runs under a deadline. Exceeding it is reported as
//! `UpstreamTimeout`; a refused connection as `ExternalServiceUnavailable`;
//! any non-success status or unparseable body as `ExternalServiceError`.

use crate::config::AnalysisServiceConfig;
use crate::constants::{service_names::ANALYSIS_SERVICE, timeouts};
use crate::logging::AppLogger;
use async_trait::async_trait;
use counsel_core::errors::{AppError, AppResult};
use counsel_core::models::{AnalysisResult, AnalysisStatement, EvaluationAxis};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// AI-provider credential forwarded to the Analysis Service
///
/// Serializes as a plain string; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Wrap a credential
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw credential
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential([REDACTED])")
    }
}

/// Body of `POST /analyze`
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    /// Full transcript text
    pub text: String,
    /// Optional goal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_behavior: Option<String>,
    /// Credential to use upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiCredential>,
}

/// Speaker of a flattened chat history turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The clinician's question
    User,
    /// The Analysis Service's answer
    Assistant,
}

/// One entry of `chat_history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Speaker
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatTurn {
    /// Flatten stored question/answer pairs into alternating user/assistant turns
    pub fn flatten<'a, I>(pairs: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .flat_map(|(question, answer)| {
                [
                    Self {
                        role: ChatRole::User,
                        content: question.to_owned(),
                    },
                    Self {
                        role: ChatRole::Assistant,
                        content: answer.to_owned(),
                    },
                ]
            })
            .collect()
    }
}

/// Body of `POST /detailed-chat`
#[derive(Debug, Clone, Serialize)]
pub struct DetailedChatRequest {
    /// Full transcript text
    pub conversation_text: String,
    /// Stored analysis payload
    pub analysis_result: AnalysisResult,
    /// Axis the question is about
    pub aspect: EvaluationAxis,
    /// The new question
    pub user_question: String,
    /// Prior turns of the same (axis, statement) group, oldest first
    pub chat_history: Vec<ChatTurn>,
    /// Whether reference material should be used
    pub use_reference: bool,
    /// Credential to use upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiCredential>,
    /// Transcript line the question is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<u32>,
    /// Text of that line as shown to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_content: Option<String>,
}

/// Operations offered by the Analysis Service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Score a transcript; the result always carries all four axes
    async fn analyze(&self, request: &AnalyzeRequest) -> AppResult<AnalysisResult>;

    /// Answer a follow-up question; returns the raw `response` text (possibly empty)
    async fn detailed_chat(&self, request: &DetailedChatRequest) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default, deserialize_with = "statement_list")]
    cct: Option<Vec<AnalysisStatement>>,
    #[serde(default, deserialize_with = "statement_list")]
    sst: Option<Vec<AnalysisStatement>>,
    #[serde(default, deserialize_with = "statement_list")]
    empathy: Option<Vec<AnalysisStatement>>,
    #[serde(default, deserialize_with = "statement_list")]
    partnership: Option<Vec<AnalysisStatement>>,
}

/// An axis that is not a list is treated as having no evaluations
fn statement_list<'de, D>(deserializer: D) -> Result<Option<Vec<AnalysisStatement>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

impl From<AnalyzeResponse> for AnalysisResult {
    fn from(r: AnalyzeResponse) -> Self {
        Self::from_axes(
            r.cct.unwrap_or_default(),
            r.sst.unwrap_or_default(),
            r.empathy.unwrap_or_default(),
            r.partnership.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct DetailedChatResponse {
    #[serde(default)]
    response: Option<String>,
}

/// reqwest-backed Analysis Service client
#[derive(Clone)]
pub struct HttpAnalysisService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAnalysisService {
    /// Build a client from configuration
    pub fn new(config: &AnalysisServiceConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts::ANALYSIS_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            timeout: config.timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// POST `body` to `path` and decode the JSON response, all under the deadline
    async fn post_json<B, R>(&self, path: &str, body: &B) -> AppResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.send(path, body)).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(upstream.endpoint = %path, timeout = ?self.timeout, "Analysis Service call timed out");
                Err(AppError::upstream_timeout(ANALYSIS_SERVICE))
            }
        };
        AppLogger::log_upstream_call(path, outcome.is_ok(), elapsed_ms);
        outcome
    }

    async fn send<B, R>(&self, path: &str, body: &B) -> AppResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if !status.is_success() {
            warn!(upstream.endpoint = %path, upstream.status = status.as_u16(), "Analysis Service returned an error");
            return Err(AppError::external_service(
                ANALYSIS_SERVICE,
                format!("{path} returned {status}: {}", truncate(&text, 200)),
            ));
        }

        debug!(upstream.endpoint = %path, bytes = text.len(), "Analysis Service responded");
        serde_json::from_str(&text).map_err(|e| {
            AppError::external_service(ANALYSIS_SERVICE, format!("Invalid {path} response: {e}"))
        })
    }

    fn map_transport_error(e: &reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::upstream_timeout(ANALYSIS_SERVICE)
        } else if e.is_connect() {
            AppError::external_unavailable(ANALYSIS_SERVICE, format!("Cannot connect: {e}"))
        } else {
            AppError::external_service(ANALYSIS_SERVICE, format!("Request failed: {e}"))
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: &AnalyzeRequest) -> AppResult<AnalysisResult> {
        let response: AnalyzeResponse = self.post_json("analyze", request).await?;
        Ok(response.into())
    }

    async fn detailed_chat(&self, request: &DetailedChatRequest) -> AppResult<String> {
        let response: DetailedChatResponse = self.post_json("detailed-chat", request).await?;
        Ok(response.response.unwrap_or_default())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::errors::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_analyze_request_wire_shape() {
        let request = AnalyzeRequest {
            text: "Hello".into(),
            target_behavior: None,
            api_key: Some(ApiCredential::new("sk-abc")),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"text": "Hello", "api_key": "sk-abc"})
        );
        assert!(!format!("{request:?}").contains("sk-abc"));
    }

    #[test]
    fn test_missing_and_null_axes_become_empty() {
        let parsed: AnalyzeResponse =
            serde_json::from_value(json!({"cct": [{"statement": "Hi"}], "sst": null})).unwrap();
        let result = AnalysisResult::from(parsed);
        assert_eq!(result.axis(EvaluationAxis::Cct).len(), 1);
        let value = serde_json::to_value(&result).unwrap();
        for axis in EvaluationAxis::ALL {
            assert!(value[axis.as_str()].is_array());
        }
    }

    #[test]
    fn test_history_flattening() {
        let turns = ChatTurn::flatten([("q1", "a1"), ("q2", "a2")]);
        let roles: Vec<_> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
        assert_eq!(turns[3].content, "a2");
    }

    #[test]
    fn test_detailed_chat_wire_shape() {
        let request = DetailedChatRequest {
            conversation_text: "A\nB".into(),
            analysis_result: AnalysisResult::from_axes(vec![], vec![], vec![], vec![]),
            aspect: EvaluationAxis::Empathy,
            user_question: "Why?".into(),
            chat_history: ChatTurn::flatten([("q", "a")]),
            use_reference: true,
            api_key: None,
            statement_index: Some(1),
            statement_content: Some("B".into()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["aspect"], "empathy");
        assert_eq!(value["chat_history"][0]["role"], "user");
        assert_eq!(value["statement_index"], 1);
        assert!(value.get("api_key").is_none());
    }

    /// Serve `router` on an ephemeral loopback port and return its base URL
    async fn spawn_upstream(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, timeout_ms: u64) -> HttpAnalysisService {
        HttpAnalysisService::new(&AnalysisServiceConfig {
            base_url,
            timeout_ms,
            default_api_key: None,
        })
        .unwrap()
    }

    fn analyze_request() -> AnalyzeRequest {
        AnalyzeRequest {
            text: "Hello".into(),
            target_behavior: None,
            api_key: Some(ApiCredential::new("sk-test")),
        }
    }

    #[test]
    fn test_odd_axis_shapes_keep_the_analysis() {
        let parsed: AnalyzeResponse = serde_json::from_value(json!({
            "cct": [{"statement": "Hi", "icon": "neutral", "score": "8", "suggestions": "Try a reflection"}],
            "sst": "none found",
            "empathy": [{"statement": "Hmm"}],
        }))
        .unwrap();
        let result = AnalysisResult::from(parsed);

        let cct = result.axis(EvaluationAxis::Cct);
        assert_eq!(cct.len(), 1);
        assert_eq!(cct[0].score, Some(8.0));
        assert_eq!(cct[0].suggestions, vec!["Try a reflection"]);
        assert_eq!(cct[0].extra["icon"], "neutral");
        assert!(result.axis(EvaluationAxis::Sst).is_empty());
        assert_eq!(result.axis(EvaluationAxis::Empathy).len(), 1);
    }

    #[tokio::test]
    async fn test_slow_upstream_hits_deadline() {
        let router = axum::Router::new().route(
            "/analyze",
            axum::routing::post(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                axum::Json(json!({"cct": []}))
            }),
        );
        let service = client_for(spawn_upstream(router).await, 50);

        let err = service.analyze(&analyze_request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamTimeout);
    }

    #[tokio::test]
    async fn test_upstream_server_error_is_external_error() {
        let router = axum::Router::new().route(
            "/detailed-chat",
            axum::routing::post(|| async {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "model overloaded")
            }),
        );
        let service = client_for(spawn_upstream(router).await, 5_000);

        let err = service
            .detailed_chat(&DetailedChatRequest {
                conversation_text: "A".into(),
                analysis_result: AnalysisResult::empty(),
                aspect: EvaluationAxis::Cct,
                user_question: "Why?".into(),
                chat_history: Vec::new(),
                use_reference: false,
                api_key: None,
                statement_index: Some(0),
                statement_content: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_external_error() {
        let router = axum::Router::new().route(
            "/analyze",
            axum::routing::post(|| async { "<html>gateway</html>" }),
        );
        let service = client_for(spawn_upstream(router).await, 5_000);

        let err = service.analyze(&analyze_request()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }

    #[tokio::test]
    async fn test_lenient_analysis_over_http() {
        let router = axum::Router::new().route(
            "/analyze",
            axum::routing::post(|| async {
                axum::Json(json!({
                    "cct": [{"statement": "Hi", "icon": "neutral"}],
                    "sst": [], "empathy": [], "partnership": []
                }))
            }),
        );
        let service = client_for(spawn_upstream(router).await, 5_000);

        let result = service.analyze(&analyze_request()).await.unwrap();
        assert_eq!(result.axis(EvaluationAxis::Cct)[0].statement, "Hi");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let service = HttpAnalysisService::new(&AnalysisServiceConfig {
            // Port 9 (discard) on loopback: nothing listens there in test environments
            base_url: "http://127.0.0.1:9".into(),
            timeout_ms: 5_000,
            default_api_key: None,
        })
        .unwrap();
        let err = service
            .analyze(&AnalyzeRequest {
                text: "Hello".into(),
                target_behavior: None,
                api_key: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExternalServiceUnavailable);
    }
}
