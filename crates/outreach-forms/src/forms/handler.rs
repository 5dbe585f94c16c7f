use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::domain::{ClientContext, FormField, RawSubmission, IP_ADDRESS_FIELD};
use super::validation::{validate_application, validate_donation, ValidationError};
use crate::store::{AppendLog, StoreError};

pub const CHECK_FIELDS_MESSAGE: &str = "Please check the highlighted fields below and try again.";
pub const FORM_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Which public form a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Donation,
    Application,
}

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            FormKind::Donation => "donation",
            FormKind::Application => "application",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "donation" | "donate" => Some(Self::Donation),
            "application" | "apply" => Some(Self::Application),
            _ => None,
        }
    }

    pub const fn confirmation(self) -> &'static str {
        match self {
            FormKind::Donation => "Thank you for your generous donation! You will receive a confirmation email shortly. Your contribution helps us serve families in need.",
            FormKind::Application => "Thank you for your application! We have received your request and will review it carefully. If you qualify for assistance, we will contact you within 5-7 business days.",
        }
    }

    pub const fn apology(self) -> &'static str {
        match self {
            FormKind::Donation => "We apologize, but there was an error processing your donation. Please try again or contact us directly.",
            FormKind::Application => "We apologize, but there was an error processing your application. Please try again or contact us directly.",
        }
    }
}

/// Uniform outcome rendered by the form controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<IndexMap<String, Vec<String>>>,
}

impl SubmissionResult {
    fn accepted(kind: FormKind) -> Self {
        Self {
            success: true,
            message: kind.confirmation().to_string(),
            errors: None,
        }
    }

    fn rejected(errors: ValidationError) -> Self {
        Self {
            success: false,
            message: CHECK_FIELDS_MESSAGE.to_string(),
            errors: Some(errors.into_map()),
        }
    }

    pub(crate) fn failed(kind: FormKind) -> Self {
        let mut errors = IndexMap::new();
        errors.insert(
            FormField::Form.as_str().to_string(),
            vec![FORM_ERROR_MESSAGE.to_string()],
        );
        Self {
            success: false,
            message: kind.apology().to_string(),
            errors: Some(errors),
        }
    }

    /// True when the failure came from the store rather than the input.
    pub fn is_form_failure(&self) -> bool {
        self.errors
            .as_ref()
            .is_some_and(|errors| errors.contains_key(FormField::Form.as_str()))
    }

    pub fn field_errors(&self, field: FormField) -> &[String] {
        self.errors
            .as_ref()
            .and_then(|errors| errors.get(field.as_str()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Validates one submission and appends it to the store.
pub struct SubmissionHandler<S> {
    store: Arc<S>,
}

impl<S> SubmissionHandler<S>
where
    S: AppendLog + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn submit_donation(
        &self,
        form: RawSubmission,
        context: &ClientContext,
    ) -> SubmissionResult {
        self.handle(FormKind::Donation, form, context).await
    }

    pub async fn submit_application(
        &self,
        form: RawSubmission,
        context: &ClientContext,
    ) -> SubmissionResult {
        self.handle(FormKind::Application, form, context).await
    }

    pub async fn handle(
        &self,
        kind: FormKind,
        mut form: RawSubmission,
        context: &ClientContext,
    ) -> SubmissionResult {
        form.insert(IP_ADDRESS_FIELD, context.ip_address());

        let stored = match self.validate_and_append(kind, &form).await {
            Ok(stored) => stored,
            Err(errors) => {
                let fields: Vec<&str> = errors.fields().map(FormField::as_str).collect();
                debug!(form = kind.label(), ?fields, "submission rejected by validation");
                return SubmissionResult::rejected(errors);
            }
        };

        match stored {
            Ok(()) => {
                info!(form = kind.label(), "submission recorded");
                SubmissionResult::accepted(kind)
            }
            Err(err) => {
                error!(form = kind.label(), error = %err, "failed to record submission");
                SubmissionResult::failed(kind)
            }
        }
    }

    async fn validate_and_append(
        &self,
        kind: FormKind,
        form: &RawSubmission,
    ) -> Result<Result<(), StoreError>, ValidationError> {
        match kind {
            FormKind::Donation => {
                let record = validate_donation(form)?;
                Ok(self.store.append_donation(&record).await)
            }
            FormKind::Application => {
                let record = validate_application(form)?;
                Ok(self.store.append_application(&record).await)
            }
        }
    }
}
