use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::forms::domain::RawSubmission;
use crate::forms::handler::SubmissionHandler;
use crate::store::{InMemorySheets, SheetLayout, SheetStore, SheetsBackend, StoreError};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26)
        .single()
        .expect("valid timestamp")
}

pub(super) fn donation_form() -> RawSubmission {
    RawSubmission::new()
        .with("name", "Jane Doe")
        .with("email", "jane@example.com")
        .with("sponsorshipTier", "bronze")
        .with("monthlySponsorship", "false")
}

pub(super) fn application_form() -> RawSubmission {
    RawSubmission::new()
        .with("fullName", "  Maria Lopez ")
        .with("email", " Maria.Lopez@Example.org ")
        .with("phone", "(515) 555-0142")
        .with("address", "1200 Grand Ave, Des Moines, IA 50309")
        .with("adults", "2")
        .with("children", "3")
        .with("childrenAges", "4, 7, 11")
        .with("monthlyIncome", "$2,400")
        .with("incomeSource", "Part-time retail")
        .with("governmentAssistance", "yes")
        .with("needDescription", "Rent increased and we are behind on utilities.")
        .with("intendedUse", "Cover the overdue electric bill and groceries.")
}

pub(super) fn memory_handler() -> (SubmissionHandler<SheetStore<InMemorySheets>>, InMemorySheets) {
    let sheets = InMemorySheets::default();
    let store = Arc::new(SheetStore::new(sheets.clone()));
    (SubmissionHandler::new(store), sheets)
}

pub(super) const TRANSPORT_DETAIL: &str = "connection reset by peer (token ya29.secret)";

/// Lists both sheets but fails every append with a transport error.
#[derive(Debug, Default, Clone)]
pub(super) struct FailingSheets;

#[async_trait]
impl SheetsBackend for FailingSheets {
    async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
        Ok(vec!["Donations".to_string(), "Applications".to_string()])
    }

    async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
        Err(StoreError::SheetExists(layout.title.to_string()))
    }

    async fn append_values(
        &self,
        _range: &str,
        _rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend(TRANSPORT_DETAIL.to_string()))
    }
}

pub(super) fn failing_handler() -> SubmissionHandler<SheetStore<FailingSheets>> {
    SubmissionHandler::new(Arc::new(SheetStore::new(FailingSheets)))
}

pub(super) fn form_body(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).expect("form fields encode")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
