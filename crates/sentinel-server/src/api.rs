//! HTTP surface: routes, auth gate, and response shapes.
//!
//! Every endpoint except `GET /health` requires the shared-secret
//! `x-sentinel-token` header. When auth is enabled but no token was ever
//! configured, protected endpoints answer 503 rather than falling open.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use sentinel_approval::{ApprovalError, ApprovalQueue, PendingRequest, RequestStatus};
use sentinel_audit::{AuditOutcome, AuditRuntime};
use sentinel_core::{AuditDecision, Command, DecisionSource, RequestId, RiskScore};
use sentinel_exec::{ExecOutput, Executor};

const TOKEN_HEADER: &str = "x-sentinel-token";
const ACTOR_HEADER: &str = "x-sentinel-actor";

/// How callers authenticate.
#[derive(Clone)]
pub(crate) enum AuthMode {
    /// Auth disabled explicitly (development only).
    Disabled,
    /// Shared-secret token required on every protected endpoint.
    Token(Arc<str>),
    /// Auth is enabled but no token was configured; protected endpoints
    /// refuse service instead of opening up.
    Unconfigured,
}

/// Shared state behind every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The audit pipeline.
    pub(crate) runtime: Arc<AuditRuntime>,
    /// The approval queue (also reachable through the runtime; kept here
    /// for direct resolution calls).
    pub(crate) queue: Arc<ApprovalQueue>,
    /// Executor for allowed and approved commands.
    pub(crate) executor: Executor,
    /// Auth configuration.
    pub(crate) auth: AuthMode,
    /// Whether the service started without a semantic layer.
    pub(crate) degraded: bool,
}

/// Build the application router.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/audit", post(audit))
        .route("/audit-only", post(audit_only))
        .route("/pending", get(pending))
        .route("/approve/{id}", post(approve))
        .route("/deny/{id}", post(deny))
        .with_state(state)
}

/// API-level failure, rendered as `{"detail": ...}` with a status code.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Missing or invalid token.
    Unauthorized,
    /// Auth enabled with no token configured.
    AuthUnconfigured,
    /// Unknown request id.
    NotFound(String),
    /// Request already resolved.
    Conflict(String),
    /// An approved command failed to execute.
    ExecutionFailed(String),
}

impl From<ApprovalError> for ApiError {
    fn from(e: ApprovalError) -> Self {
        match e {
            ApprovalError::NotFound { .. } => Self::NotFound(e.to_string()),
            ApprovalError::AlreadyResolved { .. } | ApprovalError::Expired { .. } => {
                Self::Conflict(e.to_string())
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid auth token".to_string(),
            ),
            Self::AuthUnconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "auth token not configured".to_string(),
            ),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Conflict(detail) => (StatusCode::CONFLICT, detail),
            Self::ExecutionFailed(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn authorize(auth: &AuthMode, headers: &HeaderMap) -> Result<(), ApiError> {
    match auth {
        AuthMode::Disabled => Ok(()),
        AuthMode::Unconfigured => Err(ApiError::AuthUnconfigured),
        AuthMode::Token(expected) => {
            let presented = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
            if presented == Some(expected.as_ref()) {
                Ok(())
            } else {
                Err(ApiError::Unauthorized)
            }
        },
    }
}

fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|a| !a.trim().is_empty())
        .unwrap_or("operator")
        .to_string()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Deserialize)]
struct AuditRequest {
    command: String,
}

/// Verdict plus (when executed) the command's output.
#[derive(Serialize)]
struct AuditResponse {
    allowed: bool,
    risk_score: RiskScore,
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<DecisionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AuditResponse {
    fn from_decision(decision: &AuditDecision) -> Self {
        Self {
            allowed: decision.allowed,
            risk_score: decision.risk_score,
            reason: decision.reason.clone(),
            source: Some(decision.source),
            request_id: None,
            stdout: None,
            stderr: None,
            exit_code: None,
            error: None,
        }
    }

    fn pending(id: RequestId, reason: &str, risk_score: RiskScore) -> Self {
        Self {
            allowed: false,
            risk_score,
            reason: format!("awaiting human approval: {reason}"),
            source: None,
            request_id: Some(id),
            stdout: None,
            stderr: None,
            exit_code: None,
            error: None,
        }
    }

    fn with_output(mut self, output: ExecOutput) -> Self {
        self.stdout = Some(output.stdout);
        self.stderr = Some(output.stderr);
        self.exit_code = output.exit_code;
        self
    }
}

#[derive(Serialize)]
struct ResolutionResponse {
    id: RequestId,
    status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.degraded { "degraded" } else { "healthy" },
        service: "sentinel",
    })
}

/// Audit a command and, when it is allowed, execute it in the same call.
async fn audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, ApiError> {
    authorize(&state.auth, &headers)?;
    let command = Command::new(body.command);
    let outcome = state.runtime.audit(command.clone()).await;

    let response = match outcome {
        AuditOutcome::Allow(decision) => {
            let response = AuditResponse::from_decision(&decision);
            match state.executor.execute(&command).await {
                Ok(output) => response.with_output(output),
                Err(sentinel_exec::ExecError::Timeout { partial, .. }) => {
                    let mut response = response.with_output(partial);
                    response.error = Some("command timed out".to_string());
                    response
                },
                Err(e) => {
                    warn!(error = %e, "allowed command failed to execute");
                    let mut response = response;
                    response.error = Some(e.to_string());
                    response
                },
            }
        },
        AuditOutcome::Block(decision) => AuditResponse::from_decision(&decision),
        AuditOutcome::Pending {
            id,
            reason,
            risk_score,
        } => AuditResponse::pending(id, &reason, risk_score),
    };
    Ok(Json(response))
}

/// Audit without executing, whatever the verdict.
async fn audit_only(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, ApiError> {
    authorize(&state.auth, &headers)?;
    let outcome = state.runtime.audit(Command::new(body.command)).await;
    let response = match outcome {
        AuditOutcome::Allow(decision) | AuditOutcome::Block(decision) => {
            AuditResponse::from_decision(&decision)
        },
        AuditOutcome::Pending {
            id,
            reason,
            risk_score,
        } => AuditResponse::pending(id, &reason, risk_score),
    };
    Ok(Json(response))
}

/// Requests still awaiting human resolution, keyed by id.
async fn pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BTreeMap<String, PendingRequest>>, ApiError> {
    authorize(&state.auth, &headers)?;
    let map = state
        .queue
        .pending()
        .into_iter()
        .map(|request| (request.id.to_string(), request))
        .collect();
    Ok(Json(map))
}

/// Approve a pending request and execute its command.
async fn approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    authorize(&state.auth, &headers)?;
    let id = parse_id(&id)?;
    let actor = actor_from(&headers);

    let resolved = resolve_request(&state, state.queue.approve(id, &actor))?;
    state.runtime.record_resolution(&resolved);

    let output = state
        .executor
        .execute(&resolved.command)
        .await
        .map_err(|e| {
            warn!(%id, error = %e, "approved command failed to execute");
            ApiError::ExecutionFailed(e.to_string())
        })?;

    Ok(Json(ResolutionResponse {
        id,
        status: resolved.status,
        stdout: Some(output.stdout),
        stderr: Some(output.stderr),
        exit_code: output.exit_code,
    }))
}

/// Deny a pending request.
async fn deny(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    authorize(&state.auth, &headers)?;
    let id = parse_id(&id)?;
    let actor = actor_from(&headers);

    let resolved = resolve_request(&state, state.queue.deny(id, &actor))?;
    state.runtime.record_resolution(&resolved);

    Ok(Json(ResolutionResponse {
        id,
        status: resolved.status,
        stdout: None,
        stderr: None,
        exit_code: None,
    }))
}

fn parse_id(raw: &str) -> Result<RequestId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("approval request not found: {raw}")))
}

/// Unwrap a queue resolution. A resolve call that observes the TTL first
/// performs the expiry itself and is the only place that sees the expired
/// request, so its audit record (the implicit denial) is written here.
fn resolve_request(
    state: &AppState,
    result: Result<PendingRequest, ApprovalError>,
) -> Result<PendingRequest, ApiError> {
    result.map_err(|e| {
        if let ApprovalError::Expired { request } = &e {
            state.runtime.record_resolution(request);
        }
        ApiError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sentinel_audit::{AuditLog, MemoryAuditSink};
    use sentinel_core::NormalizedCommand;
    use sentinel_llm::{LlmResult, PolicyContext, SemanticAuditor, SemanticVerdict};
    use sentinel_policy::{Policy, PolicyHandle};
    use std::time::Duration;
    use tower::ServiceExt;

    struct StubAuditor {
        verdict: SemanticVerdict,
    }

    #[async_trait]
    impl SemanticAuditor for StubAuditor {
        fn name(&self) -> &str {
            "stub"
        }

        async fn review(
            &self,
            _command: &NormalizedCommand,
            _context: &PolicyContext,
        ) -> LlmResult<SemanticVerdict> {
            Ok(self.verdict.clone())
        }
    }

    fn stub(allowed: bool, risk: u8, uncertain: bool) -> Arc<StubAuditor> {
        Arc::new(StubAuditor {
            verdict: SemanticVerdict {
                allowed,
                risk_score: RiskScore::new(risk),
                reason: "stub verdict".to_string(),
                uncertain,
            },
        })
    }

    struct TestApp {
        state: AppState,
        sink: Arc<MemoryAuditSink>,
    }

    fn app_with(auth: AuthMode, semantic: Option<Arc<StubAuditor>>) -> TestApp {
        app_with_ttl(auth, semantic, Duration::from_secs(300))
    }

    fn app_with_ttl(
        auth: AuthMode,
        semantic: Option<Arc<StubAuditor>>,
        ttl: Duration,
    ) -> TestApp {
        let sink = Arc::new(MemoryAuditSink::new());
        let queue = Arc::new(ApprovalQueue::new(ttl));
        let log = AuditLog::new(Arc::clone(&sink) as Arc<dyn sentinel_audit::AuditSink>);
        let mut runtime = AuditRuntime::new(
            Arc::new(PolicyHandle::new(Policy::default())),
            Arc::clone(&queue),
            log,
        );
        let degraded = semantic.is_none();
        if let Some(semantic) = semantic {
            runtime = runtime.with_semantic(semantic as Arc<dyn SemanticAuditor>);
        }
        TestApp {
            state: AppState {
                runtime: Arc::new(runtime),
                queue,
                executor: Executor::default(),
                auth,
                degraded,
            },
            sink,
        }
    }

    fn token_auth() -> AuthMode {
        AuthMode::Token(Arc::from("secret"))
    }

    fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(path: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn post_empty(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(path);
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_unauthenticated() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let response = router(app.state)
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "sentinel");
    }

    #[tokio::test]
    async fn health_reports_degraded_without_semantic_layer() {
        let app = app_with(token_auth(), None);
        let response = router(app.state)
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn protected_endpoints_require_the_token() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let router = router(app.state);

        let response = router
            .clone()
            .oneshot(get_request("/pending", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .clone()
            .oneshot(get_request("/pending", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(get_request("/pending", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unconfigured_auth_refuses_service() {
        let app = app_with(AuthMode::Unconfigured, Some(stub(true, 1, false)));
        let response = router(app.state)
            .oneshot(get_request("/pending", Some("anything")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn blocked_command_is_not_executed() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let response = router(app.state)
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "sudo ls"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["allowed"], false);
        assert!(body["reason"].as_str().unwrap().contains("blocked token"));
        assert!(body.get("stdout").is_none());
    }

    #[tokio::test]
    async fn allowed_command_executes_and_returns_output() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let response = router(app.state)
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo hi"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["allowed"], true);
        assert_eq!(body["stdout"], "hi\n");
        assert_eq!(body["exit_code"], 0);
    }

    #[tokio::test]
    async fn audit_only_never_executes() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let response = router(app.state)
            .oneshot(post_json(
                "/audit-only",
                Some("secret"),
                serde_json::json!({"command": "echo hi"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["allowed"], true);
        assert!(body.get("stdout").is_none());
    }

    #[tokio::test]
    async fn escalated_command_surfaces_its_request_id() {
        let app = app_with(token_auth(), Some(stub(true, 5, true)));
        let router = router(app.state.clone());

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "terraform apply"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["allowed"], false);
        let id = body["request_id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(get_request("/pending", Some("secret")))
            .await
            .unwrap();
        let listing = json_body(response).await;
        assert!(listing.get(id.as_str()).is_some());
        assert_eq!(listing[id.as_str()]["command"], "terraform apply");
    }

    #[tokio::test]
    async fn approve_executes_and_conflicts_on_repeat() {
        let app = app_with(token_auth(), Some(stub(true, 5, true)));
        let router = router(app.state.clone());

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo approved-run"}),
            ))
            .await
            .unwrap();
        let id = json_body(response).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "approved");
        assert_eq!(body["stdout"], "approved-run\n");

        // One terminal audit record, written at resolution time.
        let entries = app.sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].decision.allowed);

        let response = router
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn deny_resolves_without_executing() {
        let app = app_with(token_auth(), Some(stub(true, 5, true)));
        let router = router(app.state.clone());

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo never-runs"}),
            ))
            .await
            .unwrap();
        let id = json_body(response).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(post_empty(&format!("/deny/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "denied");
        assert!(body.get("stdout").is_none());

        let entries = app.sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].decision.allowed);

        // Approving after denial conflicts.
        let response = router
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn approve_without_token_is_unauthorized_and_leaves_the_request_pending() {
        let app = app_with(token_auth(), Some(stub(true, 5, true)));
        let router = router(app.state.clone());

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo parked"}),
            ))
            .await
            .unwrap();
        let id = json_body(response).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(post_empty(&format!("/approve/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Untouched: no execution, no audit record, still listed.
        assert!(app.sink.entries().is_empty());
        let response = router
            .oneshot(get_request("/pending", Some("secret")))
            .await
            .unwrap();
        let listing = json_body(response).await;
        assert_eq!(listing[id.as_str()]["status"], "pending");
    }

    #[tokio::test]
    async fn lazily_expired_approval_still_gets_its_audit_record() {
        let app = app_with_ttl(
            token_auth(),
            Some(stub(true, 5, true)),
            Duration::from_secs(0),
        );
        let router = router(app.state.clone());

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo parked"}),
            ))
            .await
            .unwrap();
        let id = json_body(response).await["request_id"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(app.sink.entries().is_empty());

        // Let the TTL lapse; no sweep runs in these tests, so the approve
        // call below is the one that observes the deadline.
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let response = router
            .clone()
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // The implicit denial is recorded exactly once.
        let entries = app.sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].decision.allowed);
        assert!(entries[0].decision.reason.contains("expired"));

        // A retry conflicts again without writing a second record.
        let response = router
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(app.sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let app = app_with(token_auth(), Some(stub(true, 1, false)));
        let router = router(app.state);

        let id = RequestId::new();
        let response = router
            .clone()
            .oneshot(post_empty(&format!("/approve/{id}"), Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(post_empty("/approve/not-a-uuid", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn degraded_mode_still_blocks_deterministically() {
        let app = app_with(token_auth(), None);
        let router = router(app.state);

        let response = router
            .clone()
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "sudo ls"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["allowed"], false);
        assert!(body["reason"].as_str().unwrap().contains("blocked token"));

        // Everything else fails closed.
        let response = router
            .oneshot(post_json(
                "/audit",
                Some("secret"),
                serde_json::json!({"command": "echo hi"}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["allowed"], false);
        assert!(body["reason"].as_str().unwrap().contains("fail-closed"));
    }
}
