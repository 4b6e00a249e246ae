//! Authentication HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use shared_types::{LoginInitResponse, SessionResponse};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::assertion::{IdentityAssertion, RECOGNIZED_PROVIDER};
use super::cookies;
use super::session::{current_session, post_sign_in_redirect, SignInPipeline, LANDING_PATH};

/// Start the provider sign-in flow.
///
/// Sets the CSRF cookie and returns the consent URL the frontend should send
/// the user to.
pub async fn auth_login(State(state): State<AppState>) -> Response {
    let config = &state.config;

    let csrf = uuid::Uuid::new_v4().to_string();
    let scopes = ["openid", "email", "profile"].join(" ");

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         state={}",
        urlencoding::encode(&config.google_client_id),
        urlencoding::encode(&config.auth_redirect_uri),
        urlencoding::encode(&scopes),
        csrf
    );

    let cookie = cookies::build_csrf_cookie(&csrf, config.secure_cookies);

    (
        [(header::SET_COOKIE, cookie)],
        Json(LoginInitResponse { auth_url }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: String,
    /// CSRF value from the consent roundtrip; must match the CSRF cookie.
    pub state: String,
    /// Return-URL hint from the consent roundtrip; deliberately ignored.
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
}

/// Handle the provider callback: verify the identity, run the sign-in
/// pipeline, and set the session cookie.
///
/// No failure here surfaces as an error page; the worst case is a redirect
/// back to the sign-in page with an error hint.
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthCallbackParams>,
) -> Response {
    match handle_callback_inner(&state, &headers, params).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("auth callback error: {:?}", e);
            Redirect::to("/istri/login?error=auth_failed").into_response()
        }
    }
}

async fn handle_callback_inner(
    state: &AppState,
    headers: &HeaderMap,
    params: AuthCallbackParams,
) -> ApiResult<Response> {
    let config = &state.config;

    // The state parameter must round-trip through the CSRF cookie issued at
    // sign-in start; anything else is a forged or replayed callback.
    let csrf_cookie = cookies::cookie_value(headers, &cookies::csrf_cookie_name());
    if csrf_cookie.as_deref() != Some(params.state.as_str()) {
        tracing::warn!("callback state does not match the csrf cookie");
        return Ok(Redirect::to("/istri/login?error=auth_failed").into_response());
    }

    let user_info = fetch_google_identity(config, &state.provider_http, &params.code).await?;
    let assertion = IdentityAssertion::from_verified(RECOGNIZED_PROVIDER, user_info.email);

    let pipeline = SignInPipeline {
        exchange: &state.exchange,
        codec: &state.codec,
        policy: config.exchange_failure_policy,
    };

    let claims = match pipeline.sign_in(&assertion).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!("sign-in rejected: {}", err);
            return Ok(Redirect::to("/istri/login?error=exchange_failed").into_response());
        }
    };

    let artifact = state
        .codec
        .encode(&claims)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign session: {}", e)))?;

    let name = cookies::session_cookie_name(config.secure_cookies);
    let cookie =
        cookies::build_session_cookie(&name, &artifact, claims.exp - claims.iat, config.secure_cookies);

    let target = post_sign_in_redirect(params.callback_url.as_deref());

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, target.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response())
}

/// HTTP client for the provider integration, built once at startup.
///
/// Bounded like the exchange client: a hung provider must not hold a
/// sign-in transaction open.
pub fn provider_client(
    timeout: std::time::Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Identity-provider integration: authorization code -> verified identity.
async fn fetch_google_identity(
    config: &AppConfig,
    client: &reqwest::Client,
    code: &str,
) -> ApiResult<GoogleUserInfo> {
    #[derive(serde::Serialize)]
    struct TokenRequest {
        code: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        grant_type: String,
    }

    let token_response = client
        .post("https://oauth2.googleapis.com/token")
        .form(&TokenRequest {
            code: code.to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.auth_redirect_uri.clone(),
            grant_type: "authorization_code".to_string(),
        })
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("provider token request failed: {}", e)))?;

    if !token_response.status().is_success() {
        return Err(ApiError::Unauthorized(format!(
            "provider rejected the authorization code: {}",
            token_response.status()
        )));
    }

    let tokens: GoogleTokenResponse = token_response
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid provider token response: {}", e)))?;

    let user_info: GoogleUserInfo = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("userinfo request failed: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid userinfo response: {}", e)))?;

    Ok(user_info)
}

/// Read-only projection of the current session for UI collaborators.
pub async fn auth_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let name = cookies::session_cookie_name(state.config.secure_cookies);

    Json(match current_session(&headers, &state.codec, &name) {
        Some(session) => SessionResponse {
            authenticated: session.backend_token.is_some(),
            issued_at: Some(session.issued_at),
            expires_at: Some(session.expires_at),
        },
        None => SessionResponse::anonymous(),
    })
}

/// Expire the session cookie and send the user to the landing page.
pub async fn auth_logout(State(state): State<AppState>) -> impl IntoResponse {
    let name = cookies::session_cookie_name(state.config.secure_cookies);
    let cookie = cookies::build_removal_cookie(&name, state.config.secure_cookies);

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, LANDING_PATH.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
}
