//! Authentication types and session management.
//!
//! All requests against the management API flow through a [`Session`],
//! which logs in once and keeps its token fresh in the background.

mod credentials;
mod refresh;
mod session;
mod tokens;

pub use credentials::Credentials;
pub use session::{Session, SessionState};
pub use tokens::AuthToken;

pub(crate) use tokens::LoginGrant;
