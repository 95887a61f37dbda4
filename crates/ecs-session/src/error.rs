//! Error types for the ecs-session library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, service and input validation errors.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// The unified error type for ecs-session operations.
///
/// Transport failures are never folded into [`ServiceError`]: a request that
/// produced no response surfaces as [`Error::Transport`], a request that
/// produced a rejected response surfaces as [`Error::Service`].
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (login rejected, missing token, terminated session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The storage service rejected the request.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Input validation errors (endpoint URL, header names and values).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns the structured service error, if this is one.
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            Error::Service(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true for any authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The response body could not be read to completion.
    #[error("failed to read response body: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout { message }
        } else if err.is_connect() {
            TransportError::Connection { message }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body { message }
        } else {
            TransportError::Http { message }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The login endpoint answered with something other than 200.
    #[error("login request failed, check endpoint or credentials")]
    LoginFailed,

    /// The login endpoint answered 200 without a usable token header.
    #[error("auth token not available in response")]
    TokenUnavailable,

    /// A scheduled token refresh failed and the session stopped serving requests.
    #[error("session terminated after a failed token refresh")]
    SessionTerminated,
}

/// Error reported by the storage service for a rejected request.
///
/// Built either from the JSON error document the service returns, or, when
/// the response carried no body, from the bare HTTP status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status code.
    pub status: u16,
    /// Service error code (if present).
    pub code: Option<i64>,
    /// Short description from the service.
    pub description: Option<String>,
    /// Additional details from the service.
    pub details: Option<String>,
    /// Whether the service flagged the failure as retryable.
    pub retryable: Option<bool>,
    /// Status line, set only when the response had no body.
    pub status_line: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: Option<i64>,
    description: Option<String>,
    details: Option<String>,
    retryable: Option<bool>,
}

impl ServiceError {
    /// Parse a service error from a non-empty response body.
    ///
    /// Bodies that are not a JSON error document are kept verbatim in
    /// `details`.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ServiceErrorBody>(body) {
            Ok(parsed) => Self {
                status: status.as_u16(),
                code: parsed.code,
                description: parsed.description,
                details: parsed.details,
                retryable: parsed.retryable,
                status_line: None,
            },
            Err(_) => Self {
                status: status.as_u16(),
                code: None,
                description: None,
                details: Some(String::from_utf8_lossy(body).into_owned()),
                retryable: None,
                status_line: None,
            },
        }
    }

    /// Wrap a bare status line, e.g. `404 Not Found`.
    pub fn from_status_line(status: StatusCode) -> Self {
        Self {
            status: status.as_u16(),
            code: None,
            description: None,
            details: None,
            retryable: None,
            status_line: Some(status.to_string()),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref line) = self.status_line {
            return write!(f, "{}", line);
        }
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref description) = self.description {
            write!(f, ": {}", description)?;
        }
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid endpoint URL.
    #[error("invalid endpoint '{value}': {reason}")]
    Endpoint { value: String, reason: String },

    /// Invalid request header.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },
}
