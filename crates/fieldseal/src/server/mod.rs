//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Gate the field routes behind bearer access tokens.
//! - Inject shared application state ([`state::AppState`]) into handlers.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
