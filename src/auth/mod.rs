//! Authentication against the Oma Helen web login.
//!
//! This module provides:
//! - `Authenticator`: the multi-step login choreography over a
//!   cookie-keeping HTTP client with manual, bounded redirect following
//! - `Session`: the resulting bearer token with a one-hour validity
//!   heuristic, checked lazily on use
//!
//! Credentials are borrowed only for the duration of `login` and are
//! never stored.

pub mod html;
pub mod session;

pub use session::{AuthEndpoints, Authenticator, Session};
