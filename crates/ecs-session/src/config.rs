//! Session configuration options.

use std::time::Duration;

/// Seconds subtracted from the server-reported token max-age before the
/// token is renewed.
pub const TIME_BUFFER_IN_SECONDS: u64 = 300;

/// What a session does when a scheduled token refresh fails.
///
/// A scheduled refresh has no caller to report to, so the failure is
/// escalated. Neither policy retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Stop serving requests: every later request fails fast with
    /// [`AuthError::SessionTerminated`](crate::error::AuthError::SessionTerminated)
    /// until an explicit [`Session::login`](crate::Session::login) succeeds.
    #[default]
    Terminate,
    /// Log the failure and exit the process with status 1.
    ExitProcess,
}

/// Configuration for an ECS session.
///
/// # Example
///
/// ```
/// use ecs_session::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_accept_invalid_certs(true)
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Skip TLS certificate validation (self-signed internal endpoints)
    pub accept_invalid_certs: bool,
    /// Request timeout, none by default
    pub timeout: Option<Duration>,
    /// User-Agent header value
    pub user_agent: String,
    /// Margin subtracted from the token max-age before renewing
    pub refresh_buffer: Duration,
    /// Escalation for a failed scheduled refresh
    pub refresh_failure_policy: RefreshFailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            timeout: None,
            user_agent: concat!("ecs-session/", env!("CARGO_PKG_VERSION")).to_string(),
            refresh_buffer: Duration::from_secs(TIME_BUFFER_IN_SECONDS),
            refresh_failure_policy: RefreshFailurePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable TLS certificate validation skipping.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the margin subtracted from the token max-age.
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Set the escalation for a failed scheduled refresh.
    pub fn with_refresh_failure_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.refresh_failure_policy = policy;
        self
    }

    /// Delay before renewing a token that the server declared valid for
    /// `max_age_secs` seconds: `max(0, max_age - refresh_buffer)`.
    pub fn refresh_delay(&self, max_age_secs: u64) -> Duration {
        Duration::from_secs(max_age_secs).saturating_sub(self.refresh_buffer)
    }
}
