//! Fixed paths and header names of the management API.

use reqwest::header::HeaderName;

/// Sub-path of the login endpoint.
pub const LOGIN_PATH: &str = "/login";

/// `X-SDS-AUTH-TOKEN`: carries the auth token, both in login responses and
/// on every authenticated request.
pub const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-sds-auth-token");

/// `X-SDS-AUTH-MAX-AGE`: token lifetime in seconds, sent with the login
/// response.
pub const AUTH_MAX_AGE_HEADER: HeaderName = HeaderName::from_static("x-sds-auth-max-age");
