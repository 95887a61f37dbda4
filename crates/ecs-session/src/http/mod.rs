//! HTTP transport for the ECS management API.
//!
//! This module owns the shared `reqwest` client, the login exchange and the
//! response classification used by every request method.

mod client;
mod endpoints;

pub(crate) use client::{HttpClient, Request};
pub use endpoints::{AUTH_MAX_AGE_HEADER, AUTH_TOKEN_HEADER, LOGIN_PATH};
