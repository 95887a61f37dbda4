//! Login credentials type.

use std::fmt;

/// Username and password used for HTTP basic authentication against the
/// management login endpoint.
///
/// The password is never exposed in Debug output.
///
/// # Example
///
/// ```
/// use ecs_session::Credentials;
///
/// let creds = Credentials::new("root", "ChangeMe");
/// assert_eq!(creds.username(), "root");
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    ///
    /// Only for building the basic auth header of a login request.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
