//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, logout, restore-on-start and expiry
//! - `Authenticator`: live (HTTP) and demo login strategies
//! - `KeyValueStore`: durable storage the session is mirrored into
//!
//! Sessions carry a server-supplied lifetime and are checked passively; there
//! is no timer that logs the user out the moment a token expires.

pub mod authenticator;
pub mod credentials;
pub mod manager;
pub mod session;
pub mod store;

pub use authenticator::{Authenticator, DemoAuthenticator, HttpAuthenticator};
pub use credentials::Credentials;
pub use manager::{AuthState, SessionManager};
pub use session::Session;
pub use store::{FileStore, KeyValueStore, MemoryStore};
