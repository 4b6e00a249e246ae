use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

/// Bounded timeout for the backend token exchange call.
///
/// The exchange is a single outbound request per sign-in attempt with no
/// retry, so a hung backend must not hold the transaction open indefinitely.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded timeout for calls to the identity provider.
///
/// Same rationale as [`EXCHANGE_TIMEOUT`]: a hung provider must not hold a
/// sign-in transaction open.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when the token exchange fails during sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFailurePolicy {
    /// Reject the sign-in transaction with the exchange error.
    Abort,
    /// Complete sign-in with an absent backend token. The route guard
    /// treats such a session as unauthenticated.
    Swallow,
}

impl ExchangeFailurePolicy {
    fn parse(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("abort") {
            Ok(ExchangeFailurePolicy::Abort)
        } else if value.eq_ignore_ascii_case("swallow") {
            Ok(ExchangeFailurePolicy::Swallow)
        } else {
            bail!(
                "EXCHANGE_FAILURE_POLICY must be 'abort' or 'swallow', got '{}'",
                value
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub auth_redirect_uri: String,
    pub session_secret: String,
    pub backend_base_url: String,
    pub session_ttl_days: i64,
    pub secure_cookies: bool,
    pub exchange_failure_policy: ExchangeFailurePolicy,
    /// Origins allowed by CORS; `None` means the variable was not set.
    pub cors_allowed_origins: Option<Vec<String>>,
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Load gateway configuration from environment variables.
    ///
    /// Required: `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `SESSION_SECRET`,
    /// `BACKEND_BASE_URL`. A missing required variable aborts startup rather
    /// than silently disabling auth.
    pub fn from_env() -> Result<Self> {
        let exchange_failure_policy = match env::var("EXCHANGE_FAILURE_POLICY") {
            Ok(value) => ExchangeFailurePolicy::parse(&value)?,
            Err(_) => ExchangeFailurePolicy::Abort,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID must be set")?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET must be set")?,
            auth_redirect_uri: env::var("AUTH_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
            session_secret: env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            backend_base_url: env::var("BACKEND_BASE_URL")
                .context("BACKEND_BASE_URL must be set")?,
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SESSION_TTL_DAYS must be a valid number")?,
            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            exchange_failure_policy,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|raw| parse_origin_list(&raw)),
        })
    }
}
