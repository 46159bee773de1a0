//! sc-api: HTTP API for the Smart Chat service
//!
//! Exposes the conversation service over REST endpoints.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::routes;
pub use server::{AppState, start_server};
