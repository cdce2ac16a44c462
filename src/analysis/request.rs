// src/analysis/request.rs
use chrono::Utc;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AnalysisRequest;
use crate::auth::{AccessToken, AuthError, AuthProvider};
use crate::config::AppConfig;
use crate::file::Document;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ANALYZE_PATH: &str = "/api/analyzeDocument";
const FIXTURE_PATH: &str = "/proxied-api-response.json";

pub const UNKNOWN_ERROR: &str = "An unknown error occurred during document analysis.";

/// The ordered transport candidates for one submission, resolved from
/// configuration.
#[derive(Debug, Clone)]
pub struct TransportTargets {
    pub proxy_url: String,
    pub direct_url: String,
    pub fixture_url: String,
}

impl TransportTargets {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            proxy_url: format!("{}{}", config.proxy_origin, ANALYZE_PATH),
            direct_url: config.backend_url.clone(),
            fixture_url: format!("{}{}", config.proxy_origin, FIXTURE_PATH),
        }
    }
}

/// Failure of a single POST attempt. Absorbed by the chain and logged,
/// never shown to the user.
#[derive(Debug, Error)]
enum TransportError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("status {0}")]
    Status(StatusCode),
    #[error("non-JSON content type {0:?}")]
    ContentType(String),
    #[error("undecodable JSON body: {0}")]
    Body(String),
}

/// Terminal outcome of a submission that produced no result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Please select a document to analyze.")]
    EmptyDocument,
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Error text supplied by the service itself.
    #[error("{0}")]
    Server(String),
    #[error("Request failed with status code {0}")]
    FallbackStatus(u16),
    #[error("{0}")]
    FallbackRequest(#[from] reqwest::Error),
}

impl AnalysisError {
    /// Reduces the error to the single string shown to the user: the
    /// server-supplied error text when there is one, else the error's own
    /// message, else a generic fallback.
    pub fn user_message(&self) -> String {
        let message = match self {
            AnalysisError::Server(text) => text.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

struct Candidate<'a> {
    label: &'static str,
    url: &'a str,
    /// The proxy attempt tags itself so it can be identified in server logs.
    tag_source: bool,
}

/// One submission's worth of request plumbing: acquire a token, build the
/// payload once, then walk the transport candidates in order until one
/// succeeds. Falls back to the bundled static fixture when every live
/// endpoint fails.
pub struct AnalysisFlow {
    http: reqwest::Client,
    targets: TransportTargets,
}

impl AnalysisFlow {
    pub fn new(targets: TransportTargets) -> Self {
        Self {
            http: reqwest::Client::new(),
            targets,
        }
    }

    pub async fn run(
        &self,
        auth: &dyn AuthProvider,
        document: &Document,
    ) -> Result<Value, AnalysisError> {
        if document.content.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }

        let token = auth.acquire_token().await?;
        let payload = AnalysisRequest::from_document(document);

        let candidates = [
            Candidate {
                label: "proxy",
                url: &self.targets.proxy_url,
                tag_source: true,
            },
            Candidate {
                label: "direct backend",
                url: &self.targets.direct_url,
                tag_source: false,
            },
        ];

        for candidate in &candidates {
            debug!("posting analysis request to {} ({})", candidate.url, candidate.label);
            match self.post_attempt(candidate, &payload, &token).await {
                Ok(body) => {
                    info!("analysis succeeded via {}", candidate.label);
                    return Ok(body);
                }
                Err(err) => warn!("{} attempt failed: {err}", candidate.label),
            }
        }

        info!("all analysis endpoints failed, falling back to static data");
        self.static_fallback().await
    }

    /// One POST attempt. Header and timeout handling lives here and only
    /// here; both candidates share it.
    async fn post_attempt(
        &self,
        candidate: &Candidate<'_>,
        payload: &AnalysisRequest,
        token: &AccessToken,
    ) -> Result<Value, TransportError> {
        let mut request = self
            .http
            .post(candidate.url)
            .timeout(REQUEST_TIMEOUT)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .header(ACCEPT, "application/json")
            .query(&[("_", cache_buster())]);

        if candidate.tag_source {
            request = request.query(&[("source", "frontend-proxy")]);
        }
        if !token.mock {
            request = request.bearer_auth(&token.value);
        }

        let response = request.json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(TransportError::ContentType(content_type));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }

    /// Last-resort GET of the bundled fixture. Unlike the POST attempts its
    /// body is used as the result unconditionally; only a failed request
    /// escapes to the generic error path.
    async fn static_fallback(&self) -> Result<Value, AnalysisError> {
        let response = self
            .http
            .get(&self.targets.fixture_url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match server_error_field(&body) {
                Some(message) => AnalysisError::Server(message),
                None => AnalysisError::FallbackStatus(status.as_u16()),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

fn cache_buster() -> String {
    Utc::now().timestamp_millis().to_string()
}

fn server_error_field(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuth;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document(content: &str) -> Document {
        Document {
            content: content.to_string(),
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: content.len() as u64,
            uploaded_at: Utc::now(),
        }
    }

    fn targets(proxy: &MockServer, direct: &MockServer) -> TransportTargets {
        TransportTargets {
            proxy_url: format!("{}{}", proxy.uri(), ANALYZE_PATH),
            direct_url: format!("{}{}", direct.uri(), ANALYZE_PATH),
            fixture_url: format!("{}{}", proxy.uri(), FIXTURE_PATH),
        }
    }

    /// Real-mode stand-in: hands out a fixed bearer token without any
    /// identity traffic.
    struct FixedToken(&'static str);

    #[async_trait]
    impl AuthProvider for FixedToken {
        fn is_authenticated(&self) -> bool {
            true
        }
        fn current_identity(&self) -> Option<crate::auth::Account> {
            None
        }
        async fn acquire_token(&self) -> Result<AccessToken, AuthError> {
            Ok(AccessToken::bearer(self.0.to_string()))
        }
        async fn login(&self) -> Result<crate::auth::Account, AuthError> {
            unimplemented!("not used by the flow")
        }
        fn logout(&self) {}
    }

    /// Real-mode stand-in whose silent acquisition always fails.
    struct FailingToken(AuthError);

    #[async_trait]
    impl AuthProvider for FailingToken {
        fn is_authenticated(&self) -> bool {
            true
        }
        fn current_identity(&self) -> Option<crate::auth::Account> {
            None
        }
        async fn acquire_token(&self) -> Result<AccessToken, AuthError> {
            Err(match &self.0 {
                AuthError::NoActiveAccount => AuthError::NoActiveAccount,
                AuthError::Provider(msg) => AuthError::Provider(msg.clone()),
                _ => AuthError::InteractionRequired,
            })
        }
        async fn login(&self) -> Result<crate::auth::Account, AuthError> {
            unimplemented!("not used by the flow")
        }
        fn logout(&self) {}
    }

    fn json_ok(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn empty_document_fails_with_no_network_activity() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        let flow = AnalysisFlow::new(targets(&proxy, &direct));

        let err = flow.run(&MockAuth::new(), &document("")).await.unwrap_err();
        assert_eq!(err.user_message(), "Please select a document to analyze.");
        assert!(proxy.received_requests().await.unwrap().is_empty());
        assert!(direct.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn proxy_success_skips_direct_backend() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .and(query_param("source", "frontend-proxy"))
            .respond_with(json_ok(json!({ "id": "via-proxy", "status": "completed" })))
            .expect(1)
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(json_ok(json!({})))
            .expect(0)
            .mount(&direct)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow.run(&MockAuth::new(), &document("text")).await.unwrap();
        assert_eq!(body["id"], "via-proxy");
    }

    #[tokio::test]
    async fn proxy_error_status_falls_back_to_direct_backend() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .respond_with(json_ok(json!({ "id": "via-direct" })))
            .expect(1)
            .mount(&direct)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow.run(&MockAuth::new(), &document("text")).await.unwrap();
        assert_eq!(body["id"], "via-direct");
    }

    #[tokio::test]
    async fn non_json_content_type_is_a_failed_attempt() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        // 200 but HTML instead of JSON.
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<!doctype html><html></html>", "text/html"),
            )
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .respond_with(json_ok(json!({ "id": "via-direct" })))
            .expect(1)
            .mount(&direct)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow.run(&MockAuth::new(), &document("text")).await.unwrap();
        assert_eq!(body["id"], "via-direct");
    }

    #[tokio::test]
    async fn both_endpoints_failing_uses_fixture_body_verbatim() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&direct)
            .await;
        // Fixture served as text/plain and not even JSON: still used as-is.
        Mock::given(method("GET"))
            .and(path(FIXTURE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .expect(1)
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow.run(&MockAuth::new(), &document("text")).await.unwrap();
        assert_eq!(body, Value::String("not json at all".to_string()));
    }

    #[tokio::test]
    async fn fixture_json_body_is_the_completion_result() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&direct)
            .await;
        Mock::given(method("GET"))
            .and(path(FIXTURE_PATH))
            .respond_with(json_ok(json!({ "id": "static-fallback" })))
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow.run(&MockAuth::new(), &document("text")).await.unwrap();
        assert_eq!(body["id"], "static-fallback");
    }

    #[tokio::test]
    async fn mock_mode_sends_no_authorization_header_anywhere() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&direct)
            .await;
        Mock::given(method("GET"))
            .and(path(FIXTURE_PATH))
            .respond_with(json_ok(json!({})))
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        flow.run(&MockAuth::new(), &document("text")).await.unwrap();

        for server in [&proxy, &direct] {
            for request in server.received_requests().await.unwrap() {
                assert!(
                    !request.headers.contains_key("authorization"),
                    "unexpected Authorization header on {}",
                    request.url
                );
            }
        }
    }

    #[tokio::test]
    async fn real_mode_sends_bearer_token_and_cache_headers() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .and(header("authorization", "Bearer fake-token"))
            .and(header("content-type", "application/json"))
            .and(header("cache-control", "no-cache, no-store"))
            .and(header("pragma", "no-cache"))
            .and(header("accept", "application/json"))
            .and(query_param("source", "frontend-proxy"))
            .respond_with(json_ok(json!({ "id": "ok" })))
            .expect(1)
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let body = flow
            .run(&FixedToken("fake-token"), &document("text"))
            .await
            .unwrap();
        assert_eq!(body["id"], "ok");

        // The cache-busting query parameter is always attached.
        let requests = proxy.received_requests().await.unwrap();
        assert!(requests[0].url.query_pairs().any(|(k, _)| k == "_"));
    }

    #[tokio::test]
    async fn missing_account_surfaces_exact_error_before_any_network_call() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let err = flow
            .run(&FailingToken(AuthError::NoActiveAccount), &document("text"))
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "No active account found. Please ensure you are properly logged in."
        );
        assert!(proxy.received_requests().await.unwrap().is_empty());
        assert!(direct.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_denial_surfaces_provider_text_without_mock_fallback() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let err = flow
            .run(
                &FailingToken(AuthError::Provider("consent required".to_string())),
                &document("text"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "consent required");
        assert!(proxy.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_fixture_with_server_error_field_surfaces_it() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&direct)
            .await;
        Mock::given(method("GET"))
            .and(path(FIXTURE_PATH))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "error": "service offline" })),
            )
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let err = flow.run(&MockAuth::new(), &document("text")).await.unwrap_err();
        assert_eq!(err.user_message(), "service offline");
    }

    #[tokio::test]
    async fn failed_fixture_without_error_field_reports_status() {
        let proxy = MockServer::start().await;
        let direct = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&proxy)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&direct)
            .await;
        Mock::given(method("GET"))
            .and(path(FIXTURE_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&proxy)
            .await;

        let flow = AnalysisFlow::new(targets(&proxy, &direct));
        let err = flow.run(&MockAuth::new(), &document("text")).await.unwrap_err();
        assert_eq!(err.user_message(), "Request failed with status code 404");
    }

    #[test]
    fn blank_error_text_reduces_to_the_generic_message() {
        assert_eq!(
            AnalysisError::Server("  ".to_string()).user_message(),
            UNKNOWN_ERROR
        );
        assert_eq!(
            AnalysisError::Server("quota exceeded".to_string()).user_message(),
            "quota exceeded"
        );
    }
}
