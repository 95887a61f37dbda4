//! Auth token types.

use std::fmt;

/// The bearer credential sent as `X-SDS-AUTH-TOKEN` on every request.
///
/// Treated as opaque and never shown in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in request headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&"[REDACTED]").finish()
    }
}

/// Token and lifetime hint extracted from a successful login response.
#[derive(Debug, Clone)]
pub(crate) struct LoginGrant {
    pub token: AuthToken,
    /// Seconds until the token needs renewal, when the server said so.
    pub max_age: Option<u64>,
}
