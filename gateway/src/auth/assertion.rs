//! Transient identity assertions handed over by the provider integration.

/// The single identity provider this gateway recognizes.
pub const RECOGNIZED_PROVIDER: &str = "google";

/// A verified identity claim from a third-party provider.
///
/// Exists only for the duration of one sign-in transaction. Deliberately not
/// serde-serializable: it is never persisted and never leaves the process.
/// The subject email is forwarded to the backend as-is; the backend decides
/// whether the identity is sufficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub provider: String,
    pub subject_email: Option<String>,
}

impl IdentityAssertion {
    /// Receive a verified identity from the provider integration.
    pub fn from_verified(provider: impl Into<String>, subject_email: Option<String>) -> Self {
        Self {
            provider: provider.into(),
            subject_email,
        }
    }

    /// Whether the asserting provider is the one this gateway trusts.
    pub fn is_recognized(&self) -> bool {
        self.provider == RECOGNIZED_PROVIDER
    }
}
