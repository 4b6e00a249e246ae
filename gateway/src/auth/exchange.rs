//! Token exchange client: verified identity in, backend bearer credential out.

use std::fmt;
use std::time::Duration;

use shared_types::{ExchangeEnvelope, ExchangeRequest, ExchangeUser};
use thiserror::Error;

use super::assertion::IdentityAssertion;

/// Opaque bearer credential issued by the backend.
///
/// Once issued it is owned exclusively by the session; nothing re-derives it
/// from provider tokens. Lifetime is backend-controlled and not introspected.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendToken(String);

impl BackendToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw credential, for embedding into claims or an `Authorization`
    /// header value.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

// Keeps the credential out of logs and panic messages.
impl fmt::Debug for BackendToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendToken(***)")
    }
}

/// Failure of a token exchange attempt.
///
/// One type, three distinguishable causes. The sign-in stage treats them
/// identically; the variants exist so logs and tests can tell
/// backend-unreachable from backend-rejected.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend rejected the identity with status {status}")]
    Rejected { status: reqwest::StatusCode },

    #[error("malformed exchange envelope: {0}")]
    Envelope(String),
}

/// Client for the backend's `POST /istri/login-token` endpoint.
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExchangeClient {
    /// Build a client with a bounded request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    /// Exchange a verified identity for a backend token.
    ///
    /// Exactly one outbound call per invocation; no retry, no backoff. Any
    /// non-2xx status, transport failure, or unexpected body shape is an
    /// `ExchangeError`.
    pub async fn exchange(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<BackendToken, ExchangeError> {
        let url = format!(
            "{}/istri/login-token",
            self.base_url.trim_end_matches('/')
        );
        let body = ExchangeRequest {
            provider: assertion.provider.clone(),
            user: ExchangeUser {
                email: assertion.subject_email.clone(),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ExchangeError::Transport)?;

        if !response.status().is_success() {
            return Err(ExchangeError::Rejected {
                status: response.status(),
            });
        }

        let envelope: ExchangeEnvelope = response
            .json()
            .await
            .map_err(|e| ExchangeError::Envelope(e.to_string()))?;

        Ok(BackendToken::new(envelope.data.token))
    }
}
