//! # Error Taxonomy
//!
//! One error enum for the whole core. Business-rule failures are detected
//! before any write begins, or abort the open session so nothing is
//! partially applied; the API layer maps each variant to a status code.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    /// Referenced report/user/content absent. Nothing was mutated.
    #[error("{0} not found with id {1}")]
    NotFound(&'static str, String),

    /// A business invariant on the input failed (e.g. reason length).
    #[error("validation error: {0}")]
    Validation(String),

    /// The reporter already filed against this content. Best-effort: the
    /// existence check and the insert are separate operations, so two
    /// concurrent identical filings can both land.
    #[error("user {reporting_user} already filed a report against content {content_id}")]
    DuplicateReport {
        content_id: Uuid,
        reporting_user: Uuid,
    },

    /// The report reached its terminal state in another transaction.
    #[error("report {0} is already settled")]
    AlreadySettled(Uuid),

    /// The acting principal's role does not permit this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The atomic commit failed (write conflict or connectivity). The whole
    /// logical operation was rolled back; the caller may retry.
    #[error("transaction aborted: {0}")]
    Transaction(String),

    /// Infrastructure failure in the content store.
    #[error("content store error: {0}")]
    Store(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound(entity, id.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transaction(_))
    }
}

/// A specialized Result type for Quillpress logic.
pub type Result<T> = std::result::Result<T, Error>;
