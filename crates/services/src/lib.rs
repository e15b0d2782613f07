//! quillpress/crates/services/src/lib.rs
//!
//! Use-case layer: the status propagator, the report lifecycle, the
//! moderation action dispatcher, and blog privacy propagation. Everything
//! here depends only on the `domains` ports, so any `ContentStore`
//! implementation (Postgres in production, in-memory in tests) plugs in.

pub mod blogs;
pub mod moderation;
pub mod reports;
pub mod status;

pub use blogs::BlogService;
pub use moderation::ModerationService;
pub use reports::{NewReport, ReportService, MAX_REASON_LEN};
pub use status::{PropagationCounts, StatusPropagator};
