//! Session/auth broker.
//!
//! This module provides:
//! - the identity assertion receiver for verified provider sign-ins
//! - the token exchange client against the backend's `/istri/login-token`
//! - the session codec (signed cookie artifact) and session accessor
//! - the per-request route guard for protected areas

pub mod assertion;
pub mod cookies;
pub mod exchange;
pub mod guard;
pub mod handlers;
pub mod session;

pub use guard::{route_guard, RoutePolicy};
pub use session::{current_session, Session, SessionCodec};
