//! quillpress/crates/domains/src/lib.rs
//!
//! Entity models, the error taxonomy, and the content-store ports that the
//! service and adapter crates implement against.

pub mod error;
pub mod models;
pub mod ports;

pub use error::*;
pub use models::*;
pub use ports::*;
