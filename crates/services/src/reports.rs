//! # Report Lifecycle
//!
//! Reports start open and end settled, exactly once. This module owns
//! creation and the read side; settlement is written only by the
//! moderation dispatcher, inside the dispatcher's transaction.

use std::sync::Arc;

use chrono::Utc;
use domains::{ContentStore, ContentType, Error, Report, ReportQuery, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Upper bound on the reason text, in characters after trimming.
pub const MAX_REASON_LEN: usize = 200;

/// A report as submitted. `reporting_user` comes from the authenticated
/// principal, not from the request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub content_type: ContentType,
    pub content_id: Uuid,
    #[serde(skip)]
    pub reporting_user: Uuid,
    pub reported_user: String,
    pub reason: String,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ContentStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Files a report and returns its id.
    ///
    /// One report per (content, reporter): a prior filing by the same user
    /// against the same content is rejected with `DuplicateReport`. The
    /// existence check and the insert are two store calls with nothing
    /// held between them, so two concurrent identical filings can both
    /// land. Accepted gap; callers treat the rule as best-effort.
    pub async fn file_report(&self, new_report: NewReport) -> Result<Uuid> {
        let reason = new_report.reason.trim().to_string();
        let len = reason.chars().count();
        if len == 0 || len > MAX_REASON_LEN {
            return Err(Error::Validation(format!(
                "reason must be between 1 and {MAX_REASON_LEN} characters"
            )));
        }

        if self
            .store
            .report_for(new_report.content_id, new_report.reporting_user)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateReport {
                content_id: new_report.content_id,
                reporting_user: new_report.reporting_user,
            });
        }

        let report = Report {
            id: Uuid::now_v7(),
            content_type: new_report.content_type,
            content_id: new_report.content_id,
            reporting_user: new_report.reporting_user,
            reported_user: new_report.reported_user,
            reason,
            report_created: Utc::now(),
            resolution: None,
        };
        self.store.insert_report(&report).await?;

        tracing::info!(
            report = %report.id,
            content = %report.content_id,
            reported_user = %report.reported_user,
            "report filed"
        );
        Ok(report.id)
    }

    pub async fn get_report(&self, id: Uuid) -> Result<Report> {
        self.store
            .get_report(id)
            .await?
            .ok_or_else(|| Error::not_found("report", id))
    }

    /// Filtered listing, newest first, fixed page size.
    pub async fn list_reports(&self, query: &ReportQuery, page: u32) -> Result<Vec<Report>> {
        self.store.list_reports(query, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::MockContentStore;

    fn submission(reason: &str) -> NewReport {
        NewReport {
            content_type: ContentType::Comment,
            content_id: Uuid::now_v7(),
            reporting_user: Uuid::now_v7(),
            reported_user: "alice".into(),
            reason: reason.into(),
        }
    }

    fn service_with(store: MockContentStore) -> ReportService {
        ReportService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn empty_and_oversized_reasons_are_rejected_before_any_store_call() {
        // A store call would panic the mock; no expectations are set.
        let service = service_with(MockContentStore::new());

        for reason in ["", "   ", &"x".repeat(201)] {
            let err = service.file_report(submission(reason)).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "reason {reason:?}");
        }
    }

    #[tokio::test]
    async fn boundary_lengths_are_accepted() {
        for reason in ["x".to_string(), "x".repeat(200)] {
            let mut store = MockContentStore::new();
            store.expect_report_for().return_once(|_, _| Ok(None));
            store
                .expect_insert_report()
                .withf(|r| !r.is_settled())
                .return_once(|_| Ok(()));

            service_with(store)
                .file_report(submission(&reason))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn reason_is_trimmed_before_storing() {
        let mut store = MockContentStore::new();
        store.expect_report_for().return_once(|_, _| Ok(None));
        store
            .expect_insert_report()
            .withf(|r| r.reason == "spam")
            .return_once(|_| Ok(()));

        service_with(store)
            .file_report(submission("  spam  "))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn second_filing_by_same_reporter_is_a_duplicate() {
        let new_report = submission("spam");
        let prior = Report {
            id: Uuid::now_v7(),
            content_type: new_report.content_type,
            content_id: new_report.content_id,
            reporting_user: new_report.reporting_user,
            reported_user: "alice".into(),
            reason: "spam".into(),
            report_created: Utc::now(),
            resolution: None,
        };

        let mut store = MockContentStore::new();
        store
            .expect_report_for()
            .return_once(move |_, _| Ok(Some(prior)));

        let err = service_with(store)
            .file_report(new_report)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateReport { .. }));
    }

    #[tokio::test]
    async fn get_report_maps_absence_to_not_found() {
        let mut store = MockContentStore::new();
        store.expect_get_report().return_once(|_| Ok(None));

        let err = service_with(store)
            .get_report(Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("report", _)));
    }
}
