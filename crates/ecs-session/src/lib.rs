//! ecs-session - authenticated sessions for the ECS management API
//!
//! A [`Session`] logs in once with a username and password, keeps the
//! returned auth token fresh in the background, and attaches it to every
//! GET, POST and PUT. Responses come back as raw bytes or as a classified
//! [`Error`].
//!
//! # Example
//!
//! ```no_run
//! use ecs_session::{Credentials, Endpoint, Session};
//!
//! # async fn example() -> Result<(), ecs_session::Error> {
//! let endpoint = Endpoint::new("https://ecs.internal:4443")?;
//! let session = Session::connect(endpoint, Credentials::new("root", "ChangeMe")).await?;
//!
//! let body = br#"{"name":"bucket1","namespace":"ns1"}"#;
//! let created = session.post("/object/bucket.json", Some(body), None, None).await?;
//! println!("{}", String::from_utf8_lossy(&created));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export primary types at crate root for convenience
pub use auth::{AuthToken, Credentials, Session, SessionState};
pub use config::{RefreshFailurePolicy, SessionConfig, TIME_BUFFER_IN_SECONDS};
pub use error::{AuthError, Error, InvalidInputError, ServiceError, TransportError};
pub use types::Endpoint;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
