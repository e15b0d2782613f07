//! quillpress/crates/api-adapters/src/lib.rs
//!
//! The HTTP surface. Everything axum-shaped sits behind the `web-axum`
//! feature so the workspace can build service logic without a web stack.

#[cfg(feature = "web-axum")]
pub mod error;

#[cfg(feature = "web-axum")]
pub mod handlers;

#[cfg(feature = "web-axum")]
pub mod principal;

#[cfg(feature = "web-axum")]
mod router;

#[cfg(feature = "web-axum")]
pub use handlers::AppState;

#[cfg(feature = "web-axum")]
pub use router::router;
