use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use serde_json::json;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, matching, profile};

pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let api = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(profile::router())
                .merge(matching::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state);
    with_timeout(api, timeout)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Aborts requests that run past `timeout` with a 408 in the usual error envelope.
pub fn with_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_timeout(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        tracing::warn!("request timed out");
        return (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "request timed out" })),
        )
            .into_response();
    }
    tracing::error!(error = %err, "unhandled middleware error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
        .into_response()
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState) -> String {
        let token = JwtKeys::from_ref(state).sign(Uuid::new_v4()).unwrap();
        format!("Bearer {token}")
    }

    async fn call(
        state: AppState,
        method: Method,
        uri: &str,
        auth: Option<String>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        if body.is_some() {
            req = req.header(header::CONTENT_TYPE, "application/json");
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_served_under_api_prefix() {
        let res = build_app(AppState::fake())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let state = AppState::fake();
        for (method, uri) in [
            (Method::GET, "/api/me/profile"),
            (Method::PUT, "/api/me/profile"),
            (Method::POST, "/api/match/find"),
        ] {
            let (status, body) = call(state.clone(), method, uri, None, Some("{}")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn bad_tokens_are_rejected() {
        let state = AppState::fake();
        for auth in ["Token abc", "Bearer ", "Bearer not.a.jwt"] {
            let (status, _) = call(
                state.clone(),
                Method::GET,
                "/api/me/profile",
                Some(auth.to_string()),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{auth}");
        }

        let foreign = JwtKeys::new("other-secret", Duration::from_secs(60))
            .sign(Uuid::new_v4())
            .unwrap();
        let (status, _) = call(
            state,
            Method::GET,
            "/api/me/profile",
            Some(format!("Bearer {foreign}")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn find_validates_before_touching_the_datastore() {
        let state = AppState::fake();
        let auth = bearer(&state);
        for body in [
            json!({ "centerLat": 0, "centerLng": 0, "radiusKm": 0, "format": "SINGLES" }),
            json!({ "centerLat": 0, "centerLng": 0, "radiusKm": 100.0001, "format": "SINGLES" }),
            json!({ "centerLat": 90.0001, "centerLng": 0, "radiusKm": 5, "format": "SINGLES" }),
            json!({ "centerLat": 0, "centerLng": -180.0001, "radiusKm": 5, "format": "SINGLES" }),
            json!({ "centerLat": 0, "centerLng": 0, "radiusKm": 5, "format": "" }),
        ] {
            let (status, resp) = call(
                state.clone(),
                Method::POST,
                "/api/match/find",
                Some(auth.clone()),
                Some(&body.to_string()),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(resp["error"].is_string());
        }
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let (status, body) = call(
            state.clone(),
            Method::POST,
            "/api/match/find",
            Some(auth.clone()),
            Some("{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("bad payload"));

        let (status, _) = call(
            state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(r#"{"email": 42}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_update_validation_is_bad_request() {
        let state = AppState::fake();
        let auth = bearer(&state);
        for body in [
            r#"{"handedness": "X"}"#,
            r#"{"radiusKm": -1}"#,
            r#"{"homeLat": 91, "homeLng": 0}"#,
        ] {
            let (status, _) = call(
                state.clone(),
                Method::PUT,
                "/api/me/profile",
                Some(auth.clone()),
                Some(body),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn auth_endpoints_reject_missing_fields() {
        let state = AppState::fake();
        let (status, body) = call(
            state.clone(),
            Method::POST,
            "/api/auth/register",
            None,
            Some(r#"{"email": "ace@club.org"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "email/password required");

        let (status, body) = call(
            state.clone(),
            Method::POST,
            "/api/auth/login",
            None,
            Some(r#"{"email": "ace@club.org"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid credentials");

        let (status, body) = call(state, Method::POST, "/api/auth/google", None, Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "idToken required");
    }

    #[tokio::test]
    async fn google_sign_in_needs_client_id() {
        let mut state = AppState::fake();
        let mut config = (*state.config).clone();
        config.google_client_id = None;
        state.config = std::sync::Arc::new(config);
        let (status, body) = call(
            state,
            Method::POST,
            "/api/auth/google",
            None,
            Some(r#"{"idToken": "anything"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "google sign-in is not configured");
    }

    #[tokio::test]
    async fn slow_requests_time_out_with_error_envelope() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "late"
            }),
        );
        let res = with_timeout(slow, Duration::from_millis(20))
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "request timed out" }));
    }

    #[tokio::test]
    async fn fast_requests_pass_through_timeout() {
        let fast = Router::new().route("/fast", get(|| async { "ok" }));
        let res = with_timeout(fast, Duration::from_secs(5))
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
