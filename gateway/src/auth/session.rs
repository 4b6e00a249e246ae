//! Session codec, sign-in pipeline, and session accessor.
//!
//! The codec turns an exchange outcome into a signed artifact and back: an
//! ordered pipeline of sign-in validation (provider check + token exchange),
//! claim embedding, and projection into a read-only [`Session`]. The signed
//! cookie is the only session state; there is no server-side store.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExchangeFailurePolicy;

use super::assertion::IdentityAssertion;
use super::exchange::{BackendToken, ExchangeClient, ExchangeError};

/// Application landing page; the post-sign-in redirect target.
pub const LANDING_PATH: &str = "/";

/// Signed payload carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Backend bearer credential. Absent only when an exchange failure was
    /// swallowed by policy; no other path leaves it empty.
    pub token: Option<String>,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

/// Read-only view of a decoded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub backend_token: Option<BackendToken>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// `Authorization` header value for backend API calls made by UI
    /// collaborators, when a token is present.
    pub fn bearer_header(&self) -> Option<String> {
        self.backend_token
            .as_ref()
            .map(|t| format!("Bearer {}", t.reveal()))
    }
}

/// Malformed, tampered, or expired session artifact. Recovered at the
/// accessor by treating the session as absent; never shown to the user.
#[derive(Debug, Error)]
#[error("invalid session token: {0}")]
pub struct DecodeError(#[from] jsonwebtoken::errors::Error);

/// Rejection of a sign-in transaction.
#[derive(Debug, Error)]
pub enum SignInError {
    #[error("unrecognized identity provider '{0}'")]
    UnknownProvider(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Encodes and decodes the signed session artifact (HS256).
#[derive(Clone)]
pub struct SessionCodec {
    secret: String,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: impl Into<String>, ttl_days: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Claim-embedding stage: copy the exchange outcome into a fresh signed
    /// payload with issuance and expiry timestamps.
    pub fn embed(&self, token: Option<&BackendToken>) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            token: token.map(|t| t.reveal().to_string()),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    /// Sign the claims into the cookie artifact.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Verify and decode a cookie artifact. Expiry is validated here, so an
    /// expired artifact is indistinguishable from a tampered one.
    pub fn decode(&self, artifact: &str) -> Result<SessionClaims, DecodeError> {
        let data = decode::<SessionClaims>(
            artifact,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Projection stage: map signed claims into the read-only session view.
    pub fn project(&self, claims: &SessionClaims) -> Session {
        Session {
            backend_token: claims.token.clone().map(BackendToken::new),
            issued_at: DateTime::from_timestamp(claims.iat, 0).unwrap_or(DateTime::UNIX_EPOCH),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

/// Where to send the user after a completed sign-in.
///
/// Always the landing page: caller-supplied return URLs are deliberately
/// ignored.
pub fn post_sign_in_redirect(_requested: Option<&str>) -> &'static str {
    LANDING_PATH
}

/// Ordered sign-in stages for one authentication transaction.
///
/// `Unauthenticated -> PendingExchange -> Authenticated(token)`, with the
/// exchange-failed terminal reachable under the `Abort` policy.
pub struct SignInPipeline<'a> {
    pub exchange: &'a ExchangeClient,
    pub codec: &'a SessionCodec,
    pub policy: ExchangeFailurePolicy,
}

impl SignInPipeline<'_> {
    /// Validate the assertion, run the token exchange, and embed the result
    /// into signed claims.
    ///
    /// Under [`ExchangeFailurePolicy::Abort`] an exchange failure rejects the
    /// transaction. Under `Swallow` the legacy behavior is reproduced:
    /// sign-in completes with an absent token, which the route guard treats
    /// as unauthenticated.
    pub async fn sign_in(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<SessionClaims, SignInError> {
        if !assertion.is_recognized() {
            return Err(SignInError::UnknownProvider(assertion.provider.clone()));
        }

        let token = match self.exchange.exchange(assertion).await {
            Ok(token) => Some(token),
            Err(err) => match self.policy {
                ExchangeFailurePolicy::Abort => return Err(SignInError::Exchange(err)),
                ExchangeFailurePolicy::Swallow => {
                    tracing::warn!(
                        "token exchange failed, completing sign-in without a backend token: {}",
                        err
                    );
                    None
                }
            },
        };

        Ok(self.codec.embed(token.as_ref()))
    }
}

/// Decode the current session from request headers.
///
/// Pure read: no network call, no new exchange. A missing, malformed, or
/// expired cookie yields `None`, never an error.
pub fn current_session(
    headers: &HeaderMap,
    codec: &SessionCodec,
    cookie_name: &str,
) -> Option<Session> {
    let artifact = super::cookies::cookie_value(headers, cookie_name)?;
    let claims = codec.decode(&artifact).ok()?;
    Some(codec.project(&claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::{routing::post, Json, Router};
    use serde_json::json;
    use std::time::Duration as StdDuration;

    const COOKIE_NAME: &str = "bunda.session-token";

    fn codec() -> SessionCodec {
        SessionCodec::new("test-secret-key-for-testing-only", 30)
    }

    fn headers_with_cookie(artifact: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("other=1; {}={}", COOKIE_NAME, artifact)
                .parse()
                .unwrap(),
        );
        headers
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn round_trip_preserves_the_token() {
        let codec = codec();
        let claims = codec.embed(Some(&BackendToken::new("abc123")));
        let artifact = codec.encode(&claims).expect("should encode");

        let decoded = codec.decode(&artifact).expect("should decode");
        assert_eq!(decoded, claims);
        assert_eq!(decoded.token.as_deref(), Some("abc123"));
    }

    #[test]
    fn garbage_artifact_fails_to_decode() {
        assert!(codec().decode("not-a-session").is_err());
    }

    #[test]
    fn wrong_secret_fails_to_decode() {
        let artifact = codec().encode(&codec().embed(None)).unwrap();
        let other = SessionCodec::new("a-different-secret", 30);
        assert!(other.decode(&artifact).is_err());
    }

    #[test]
    fn expired_artifact_fails_to_decode() {
        let codec = codec();
        let now = Utc::now();
        // Past the default validation leeway.
        let claims = SessionClaims {
            token: Some("abc123".to_string()),
            iat: (now - Duration::days(31)).timestamp(),
            exp: (now - Duration::days(1)).timestamp(),
        };
        let artifact = codec.encode(&claims).unwrap();
        assert!(codec.decode(&artifact).is_err());
    }

    #[test]
    fn projection_exposes_token_and_timestamps() {
        let codec = codec();
        let claims = codec.embed(Some(&BackendToken::new("abc123")));
        let session = codec.project(&claims);

        assert_eq!(session.backend_token, Some(BackendToken::new("abc123")));
        assert_eq!(session.issued_at.timestamp(), claims.iat);
        assert_eq!(session.expires_at.timestamp(), claims.exp);
        assert_eq!(session.bearer_header().as_deref(), Some("Bearer abc123"));
    }

    #[test]
    fn tokenless_session_has_no_bearer_header() {
        let codec = codec();
        let session = codec.project(&codec.embed(None));
        assert_eq!(session.bearer_header(), None);
    }

    #[test]
    fn accessor_returns_none_without_a_cookie() {
        assert!(current_session(&HeaderMap::new(), &codec(), COOKIE_NAME).is_none());
    }

    #[test]
    fn accessor_returns_none_for_a_tampered_cookie() {
        let headers = headers_with_cookie("tampered.artifact.value");
        assert!(current_session(&headers, &codec(), COOKIE_NAME).is_none());
    }

    #[test]
    fn accessor_is_idempotent() {
        let codec = codec();
        let artifact = codec
            .encode(&codec.embed(Some(&BackendToken::new("abc123"))))
            .unwrap();
        let headers = headers_with_cookie(&artifact);

        let first = current_session(&headers, &codec, COOKIE_NAME);
        let second = current_session(&headers, &codec, COOKIE_NAME);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn post_sign_in_redirect_ignores_return_hints() {
        assert_eq!(post_sign_in_redirect(None), LANDING_PATH);
        assert_eq!(
            post_sign_in_redirect(Some("https://attacker.example/phish")),
            LANDING_PATH
        );
        assert_eq!(post_sign_in_redirect(Some("/istri/dashboard")), LANDING_PATH);
    }

    #[tokio::test]
    async fn pipeline_embeds_the_exchanged_token() {
        let app = Router::new().route(
            "/istri/login-token",
            post(|| async { Json(json!({"data": {"token": "abc123"}})) }),
        );
        let base = serve(app).await;
        let exchange = ExchangeClient::new(base, StdDuration::from_secs(2)).unwrap();
        let codec = codec();

        let pipeline = SignInPipeline {
            exchange: &exchange,
            codec: &codec,
            policy: ExchangeFailurePolicy::Abort,
        };
        let assertion =
            IdentityAssertion::from_verified("google", Some("ibu@example.com".to_string()));

        let claims = pipeline.sign_in(&assertion).await.expect("should sign in");
        assert_eq!(claims.token.as_deref(), Some("abc123"));

        // End to end: the session projected from these claims carries the
        // same bearer token the exchange endpoint issued.
        let session = codec.project(&claims);
        assert_eq!(session.bearer_header().as_deref(), Some("Bearer abc123"));
    }

    #[tokio::test]
    async fn pipeline_rejects_unrecognized_providers() {
        let exchange = ExchangeClient::new("http://127.0.0.1:1", StdDuration::from_secs(1)).unwrap();
        let codec = codec();
        let pipeline = SignInPipeline {
            exchange: &exchange,
            codec: &codec,
            policy: ExchangeFailurePolicy::Abort,
        };

        let assertion = IdentityAssertion::from_verified("facebook", None);
        let err = pipeline.sign_in(&assertion).await.unwrap_err();
        assert!(matches!(err, SignInError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn abort_policy_surfaces_exchange_failures() {
        let exchange = ExchangeClient::new("http://127.0.0.1:1", StdDuration::from_secs(1)).unwrap();
        let codec = codec();
        let pipeline = SignInPipeline {
            exchange: &exchange,
            codec: &codec,
            policy: ExchangeFailurePolicy::Abort,
        };

        let assertion = IdentityAssertion::from_verified("google", None);
        let err = pipeline.sign_in(&assertion).await.unwrap_err();
        assert!(matches!(err, SignInError::Exchange(_)));
    }

    #[tokio::test]
    async fn swallow_policy_completes_without_a_token() {
        let exchange = ExchangeClient::new("http://127.0.0.1:1", StdDuration::from_secs(1)).unwrap();
        let codec = codec();
        let pipeline = SignInPipeline {
            exchange: &exchange,
            codec: &codec,
            policy: ExchangeFailurePolicy::Swallow,
        };

        let assertion = IdentityAssertion::from_verified("google", None);
        let claims = pipeline.sign_in(&assertion).await.expect("should complete");
        assert_eq!(claims.token, None);
    }
}
