//! Serde types shared between the gateway and its UI collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response for starting a sign-in: where to send the user for consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginInitResponse {
    pub auth_url: String,
}

/// Read-only projection of the current session.
///
/// Never carries the backend token itself; collaborators that need the
/// `Authorization` header value obtain it through the gateway's session
/// accessor, not over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionResponse {
    /// The response for a request with no usable session cookie.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            issued_at: None,
            expires_at: None,
        }
    }
}

/// Body sent to the backend token exchange endpoint.
///
/// `email` serializes to an explicit `null` when the provider did not supply
/// one; the backend decides whether that identity is sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub provider: String,
    pub user: ExchangeUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeUser {
    pub email: Option<String>,
}

/// Success envelope returned by the exchange endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEnvelope {
    pub data: ExchangeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeData {
    pub token: String,
}
