//! Route Guard: decides whether a protected view may be served.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect,
    /// Session still loading; no decision yet.
    Pending,
}

pub fn guard(is_authenticated: bool, is_loading: bool) -> GuardDecision {
    if is_loading {
        GuardDecision::Pending
    } else if is_authenticated {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect
    }
}

/// Middleware applied to every protected route.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = &state.session;
    match guard(session.is_authenticated().await, session.is_loading()) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect => {
            tracing::debug!("Redirecting anonymous request for {}", request.uri().path());
            Redirect::temporary(LOGIN_PATH).into_response()
        }
        GuardDecision::Pending => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            Json(json!({
                "success": false,
                "message": "Session is still loading",
                "code": "PENDING"
            })),
        )
            .into_response(),
    }
}
