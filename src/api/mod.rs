//! HTTP API.
//!
//! Exposes the report pipeline as multipart upload endpoints under
//! `/api/`. The router is composable: `api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve_until_ctrl_c, serve_with_shutdown};
pub use types::{ApiContext, Profiles, ReportResponse};
