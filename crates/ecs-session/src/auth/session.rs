//! Session management for authenticated ECS management API calls.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use reqwest::Method;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{RefreshFailurePolicy, SessionConfig};
use crate::error::{AuthError, Error};
use crate::http::{HttpClient, Request};
use crate::types::Endpoint;

use super::credentials::Credentials;
use super::refresh::RefreshSlot;
use super::tokens::{AuthToken, LoginGrant};

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The session holds a token accepted by the service.
    Authenticated,
    /// A scheduled refresh failed; requests fail fast until an explicit
    /// [`Session::login`] succeeds.
    Terminated,
}

/// An authenticated connection to an ECS management endpoint.
///
/// A session logs in when it is created and attaches its current token to
/// every GET, POST and PUT. When the service announces a token max-age, a
/// background task logs in again shortly before the token expires and
/// swaps the new token in.
///
/// # Thread Safety
///
/// Sessions are cheap to clone (they use internal `Arc`) and are safe to
/// share across tasks. Token reads always observe a complete token: the
/// refresh replaces it under a lock.
///
/// # Example
///
/// ```no_run
/// use ecs_session::{Credentials, Endpoint, Session, SessionConfig};
///
/// # async fn example() -> Result<(), ecs_session::Error> {
/// let endpoint = Endpoint::new("https://ecs.internal:4443")?;
/// let config = SessionConfig::default().with_accept_invalid_certs(true);
/// let session =
///     Session::connect_with_config(endpoint, Credentials::new("root", "ChangeMe"), config)
///         .await?;
///
/// let buckets = session
///     .get("/object/bucket.json", Some(&[("namespace", "ns1")]), None)
///     .await?;
/// println!("{}", String::from_utf8_lossy(&buckets));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    credentials: Credentials,
    client: HttpClient,
    config: SessionConfig,
    tokens: RwLock<SessionTokens>,
    refresh: RefreshSlot,
}

struct SessionTokens {
    token: AuthToken,
    state: SessionState,
    /// Bumped on every installed token
    epoch: u64,
}

impl Session {
    /// Log in to an endpoint with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the login fails or the endpoint is unreachable.
    pub async fn connect(endpoint: Endpoint, credentials: Credentials) -> Result<Self, Error> {
        Self::connect_with_config(endpoint, credentials, SessionConfig::default()).await
    }

    /// Log in to an endpoint with a custom configuration.
    ///
    /// Builds the transport, then logs in before returning. No session is
    /// produced when the login fails.
    #[instrument(skip(credentials, config), fields(endpoint = %endpoint, username = %credentials.username()))]
    pub async fn connect_with_config(
        endpoint: Endpoint,
        credentials: Credentials,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        info!("Creating new session");

        let client = HttpClient::new(endpoint, &config)?;
        let grant = client.login(&credentials).await?;

        let inner = Arc::new(SessionInner {
            credentials,
            client,
            config,
            tokens: RwLock::new(SessionTokens {
                token: grant.token.clone(),
                state: SessionState::Authenticated,
                epoch: 0,
            }),
            refresh: RefreshSlot::new(),
        });
        inner.schedule_refresh(grant.max_age);

        debug!("Session created successfully");
        Ok(Self { inner })
    }

    /// Log in again and replace the token.
    ///
    /// A successful login also clears the [`SessionState::Terminated`]
    /// state and reschedules the background refresh, including after
    /// [`Session::shutdown`].
    pub async fn login(&self) -> Result<(), Error> {
        self.inner.refresh.resume();
        self.inner.perform_login().await
    }

    /// Returns the endpoint of this session.
    pub fn endpoint(&self) -> &Endpoint {
        self.inner.client.endpoint()
    }

    /// Returns the username this session logged in with.
    pub fn username(&self) -> &str {
        self.inner.credentials.username()
    }

    /// Returns the current session state.
    pub async fn state(&self) -> SessionState {
        self.inner.tokens.read().await.state
    }

    /// Returns a snapshot of the current token.
    ///
    /// # Security
    ///
    /// The token grants access to the management API. Do not log it.
    pub async fn token(&self) -> AuthToken {
        self.inner.tokens.read().await.token.clone()
    }

    /// Returns true while a background refresh is scheduled.
    pub fn has_pending_refresh(&self) -> bool {
        self.inner.refresh.is_pending()
    }

    /// Cancel the background refresh chain.
    ///
    /// A refresh login already in flight still installs its token but does
    /// not schedule another one. The session stays usable until its current
    /// token expires. Dropping the last clone of a session has the same
    /// effect.
    pub fn shutdown(&self) {
        debug!("Cancelling token refresh");
        self.inner.refresh.cancel();
    }

    // ========================================================================
    // Request Methods
    // ========================================================================

    /// Send a GET request. Only 200 is accepted.
    ///
    /// # Arguments
    ///
    /// * `path` - Sub-path appended to the endpoint, e.g. `/object/bucket.json`
    /// * `query` - Query parameters
    /// * `headers` - Extra headers, replacing defaults with the same name
    pub async fn get(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Vec<u8>, Error> {
        self.dispatch(Request {
            method: Method::GET,
            path,
            body: None,
            query,
            headers,
        })
        .await
    }

    /// Send a POST request with a JSON body. 200 and 201 are accepted.
    ///
    /// The body must already be serialized.
    pub async fn post(
        &self,
        path: &str,
        body: Option<&[u8]>,
        query: Option<&[(&str, &str)]>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Vec<u8>, Error> {
        self.dispatch(Request {
            method: Method::POST,
            path,
            body,
            query,
            headers,
        })
        .await
    }

    /// Send a PUT request with a JSON body. 200 and 201 are accepted.
    ///
    /// Unlike GET and POST, PUT takes no extra headers.
    pub async fn put(
        &self,
        path: &str,
        body: Option<&[u8]>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Vec<u8>, Error> {
        self.dispatch(Request {
            method: Method::PUT,
            path,
            body,
            query,
            headers: None,
        })
        .await
    }

    async fn dispatch(&self, request: Request<'_>) -> Result<Vec<u8>, Error> {
        let token = {
            let tokens = self.inner.tokens.read().await;
            if tokens.state == SessionState::Terminated {
                return Err(AuthError::SessionTerminated.into());
            }
            tokens.token.clone()
        };

        self.inner.client.send(request, &token).await
    }
}

impl SessionInner {
    /// Log in and install the new token, then schedule the next refresh.
    #[instrument(skip(self), fields(endpoint = %self.client.endpoint(), username = %self.credentials.username()))]
    async fn perform_login(self: &Arc<Self>) -> Result<(), Error> {
        let grant = self.client.login(&self.credentials).await?;
        self.install(&grant).await;
        info!("Session token renewed");
        Ok(())
    }

    async fn install(self: &Arc<Self>, grant: &LoginGrant) {
        {
            let mut tokens = self.tokens.write().await;
            tokens.token = grant.token.clone();
            tokens.state = SessionState::Authenticated;
            tokens.epoch = tokens.epoch.wrapping_add(1);
        }
        self.schedule_refresh(grant.max_age);
    }

    /// Schedule exactly one re-login `max(0, max_age - buffer)` from now.
    ///
    /// Without a max-age the token is kept until the next explicit login.
    fn schedule_refresh(self: &Arc<Self>, max_age: Option<u64>) {
        let Some(max_age) = max_age else {
            debug!("No token max-age, refresh not scheduled");
            return;
        };

        let delay = self.config.refresh_delay(max_age);
        debug!(max_age, delay_secs = delay.as_secs(), "Scheduling token refresh");

        let session = Arc::downgrade(self);
        self.refresh
            .schedule(delay, move |generation| run_refresh(session, generation));
    }

    /// Apply the failure policy to a refresh that started at token `epoch`.
    ///
    /// A failure is ignored when another login installed a token meanwhile.
    async fn escalate(&self, err: Error, epoch: u64) {
        let mut tokens = self.tokens.write().await;
        if tokens.epoch != epoch {
            warn!(error = %err, "stale token refresh failed, keeping newer token");
            return;
        }

        match self.config.refresh_failure_policy {
            RefreshFailurePolicy::Terminate => {
                error!(error = %err, "failed to refresh the session token, session terminated");
                tokens.state = SessionState::Terminated;
            }
            RefreshFailurePolicy::ExitProcess => {
                error!(error = %err, "failed to refresh the session token, exiting");
                std::process::exit(1);
            }
        }
    }
}

/// Body of a scheduled refresh.
///
/// Holds only a weak reference while sleeping so a dropped session is not
/// kept alive by its own refresh task.
async fn run_refresh(session: Weak<SessionInner>, generation: u64) {
    let Some(inner) = session.upgrade() else {
        return;
    };

    // The login below reschedules; release our handle so that does not abort us
    if !inner.refresh.detach(generation) {
        return;
    }

    let epoch = inner.tokens.read().await.epoch;
    info!(username = %inner.credentials.username(), "Refreshing session token");
    if let Err(err) = inner.perform_login().await {
        inner.escalate(err, epoch).await;
    }
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", self.inner.client.endpoint())
            .field("credentials", &self.inner.credentials)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
