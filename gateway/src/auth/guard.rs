//! Per-request gating of protected areas.
//!
//! The guard is stateless across requests: every decision derives from the
//! request path and the session cookie alone. It checks only that a session
//! with a backend token is PRESENT, never what the token contains.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::AppState;

use super::cookies;
use super::session::{current_session, Session, SessionClaims};

/// One protected path prefix and its redirect targets.
#[derive(Debug, Clone)]
pub struct ProtectedArea {
    pub prefix: String,
    pub sign_in_path: String,
    pub dashboard_path: String,
}

/// Static route-protection policy. Built once at startup, immutable after.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    areas: Vec<ProtectedArea>,
}

/// Outcome of evaluating one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    Allow,
    ToSignIn(&'a str),
    ToDashboard(&'a str),
}

impl RoutePolicy {
    pub fn new(areas: Vec<ProtectedArea>) -> Self {
        Self { areas }
    }

    /// Default policy: the expectant-mother area under `/istri`.
    pub fn istri() -> Self {
        Self::new(vec![ProtectedArea {
            prefix: "/istri".to_string(),
            sign_in_path: "/istri/login".to_string(),
            dashboard_path: "/istri/dashboard".to_string(),
        }])
    }

    /// Decide what to do with a request path.
    ///
    /// An authenticated user hitting an area's own sign-in page is sent to
    /// that area's dashboard instead of seeing the login form again.
    pub fn evaluate<'a>(&'a self, path: &str, authenticated: bool) -> RouteDecision<'a> {
        for area in &self.areas {
            if !path_in_prefix(path, &area.prefix) {
                continue;
            }
            if path == area.sign_in_path {
                return if authenticated {
                    RouteDecision::ToDashboard(&area.dashboard_path)
                } else {
                    RouteDecision::Allow
                };
            }
            return if authenticated {
                RouteDecision::Allow
            } else {
                RouteDecision::ToSignIn(&area.sign_in_path)
            };
        }
        RouteDecision::Allow
    }
}

// "/istri" covers "/istri" and "/istri/...", not "/istri-health".
fn path_in_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

/// Route guard middleware; attach with `middleware::from_fn_with_state`.
///
/// On allowed requests carrying a live session, the claims are re-signed and
/// a fresh cookie is set on the response.
pub async fn route_guard(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_name = cookies::session_cookie_name(state.config.secure_cookies);
    let session = current_session(request.headers(), &state.codec, &cookie_name);
    // A session whose exchange failure was swallowed carries no token and
    // does not authenticate.
    let authenticated = session
        .as_ref()
        .map_or(false, |s| s.backend_token.is_some());

    match state.policy.evaluate(request.uri().path(), authenticated) {
        RouteDecision::ToSignIn(target) => Redirect::to(target).into_response(),
        RouteDecision::ToDashboard(target) => Redirect::to(target).into_response(),
        RouteDecision::Allow => {
            let response = next.run(request).await;
            match session {
                Some(session) => refresh_session(response, &session, &state),
                None => response,
            }
        }
    }
}

/// Re-sign the same payload and refresh the cookie on the way out.
fn refresh_session(response: Response, session: &Session, state: &AppState) -> Response {
    let claims = SessionClaims {
        token: session
            .backend_token
            .as_ref()
            .map(|t| t.reveal().to_string()),
        iat: session.issued_at.timestamp(),
        exp: session.expires_at.timestamp(),
    };

    match state.codec.encode(&claims) {
        Ok(artifact) => {
            let name = cookies::session_cookie_name(state.config.secure_cookies);
            let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
            let cookie =
                cookies::build_session_cookie(&name, &artifact, max_age, state.config.secure_cookies);

            let (mut parts, body) = response.into_parts();
            if let Ok(value) = cookie.parse() {
                parts.headers.append(header::SET_COOKIE, value);
            }
            Response::from_parts(parts, body)
        }
        Err(err) => {
            tracing::error!("failed to re-sign session: {}", err);
            response
        }
    }
}
