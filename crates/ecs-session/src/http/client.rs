//! Shared HTTP client: login exchange, request dispatch and response
//! classification.

use std::collections::HashMap;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, trace, warn};

use crate::auth::{AuthToken, Credentials, LoginGrant};
use crate::config::SessionConfig;
use crate::error::{AuthError, Error, InvalidInputError, ServiceError, TransportError};
use crate::types::Endpoint;

use super::endpoints::{AUTH_MAX_AGE_HEADER, AUTH_TOKEN_HEADER, LOGIN_PATH};

const APPLICATION_JSON: &str = "application/json";

/// A single authenticated request, before the token is attached.
#[derive(Debug)]
pub(crate) struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub body: Option<&'a [u8]>,
    pub query: Option<&'a [(&'a str, &'a str)]>,
    pub headers: Option<&'a HashMap<String, String>>,
}

impl Request<'_> {
    /// GET accepts only 200; POST and PUT also accept 201.
    fn accepts(&self, status: StatusCode) -> bool {
        if self.method == Method::GET {
            status == StatusCode::OK
        } else {
            status == StatusCode::OK || status == StatusCode::CREATED
        }
    }

    fn sends_json(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

/// HTTP client bound to one management endpoint.
///
/// Wraps a single `reqwest::Client`, so every request and every token
/// refresh of a session share one connection pool.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl HttpClient {
    /// Build the transport for an endpoint.
    pub fn new(endpoint: Endpoint, config: &SessionConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if config.accept_invalid_certs {
            warn!(endpoint = %endpoint, "TLS certificate validation disabled");
        }

        let client = builder.build().map_err(TransportError::from)?;

        Ok(Self { client, endpoint })
    }

    /// Returns the endpoint this client is configured for.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run the login exchange.
    ///
    /// Succeeds only on status 200 with a non-empty token header. The
    /// max-age header is optional; an unparsable value is ignored.
    #[instrument(skip(self, credentials), fields(endpoint = %self.endpoint, username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Error> {
        let url = self.endpoint.url_for(LOGIN_PATH);
        debug!("sending login request");

        let response = self
            .client
            .get(&url)
            .basic_auth(credentials.username(), Some(credentials.password()))
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();

        // Release the connection before inspecting the outcome
        if let Err(err) = response.bytes().await {
            debug!(error = %err, "failed to drain login response body");
        }

        if status != StatusCode::OK {
            debug!(%status, "login rejected");
            return Err(AuthError::LoginFailed.into());
        }

        let token = headers
            .get(&AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenUnavailable)?;

        let max_age = headers
            .get(&AUTH_MAX_AGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|raw| match raw.parse::<i64>() {
                Ok(age) => {
                    debug!(max_age = age, "got token max-age");
                    Some(u64::try_from(age).unwrap_or(0))
                }
                Err(err) => {
                    warn!(value = raw, error = %err, "invalid token max-age received");
                    None
                }
            });

        Ok(LoginGrant {
            token: AuthToken::new(token),
            max_age,
        })
    }

    /// Send an authenticated request and classify the response.
    ///
    /// Returns the raw body for an accepted status. A rejected status
    /// yields a [`ServiceError`] parsed from the body, or wrapping the
    /// status line when the body is empty. The body is always read to
    /// completion.
    #[instrument(skip_all, fields(method = %request.method, path = request.path))]
    pub async fn send(&self, request: Request<'_>, token: &AuthToken) -> Result<Vec<u8>, Error> {
        let url = self.endpoint.url_for(request.path);
        let headers = build_headers(&request, token)?;
        debug!(%url, "dispatching request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);

        if let Some(query) = request.query {
            builder = builder.query(query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        trace!(%status, len = body.len(), "response received");

        if request.accepts(status) {
            return Ok(body.to_vec());
        }

        let err = if body.is_empty() {
            ServiceError::from_status_line(status)
        } else {
            ServiceError::from_body(status, &body)
        };
        debug!(%status, error = %err, "request rejected");
        Err(err.into())
    }
}

/// Default headers first, caller headers last so they replace defaults.
fn build_headers(request: &Request<'_>, token: &AuthToken) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    let mut token_value =
        HeaderValue::from_str(token.as_str()).map_err(|e| InvalidInputError::Header {
            name: AUTH_TOKEN_HEADER.as_str().to_string(),
            reason: e.to_string(),
        })?;
    token_value.set_sensitive(true);
    headers.insert(AUTH_TOKEN_HEADER, token_value);

    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    if request.sends_json() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    }

    if let Some(extra) = request.headers {
        for (name, value) in extra {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }
    }

    Ok(headers)
}
