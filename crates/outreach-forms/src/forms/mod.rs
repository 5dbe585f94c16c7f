//! Donation and assistance-application intake.
//!
//! Raw form posts are validated into immutable records, appended to the sheet
//! store, and translated into a single [`SubmissionResult`] shape for the UI.

pub mod domain;
pub mod handler;
pub mod router;
mod rows;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationRecord, ClientContext, DonationRecord, FormField, GovernmentAssistance,
    RawSubmission, SponsorshipTier, IP_ADDRESS_FIELD, UNKNOWN_IP,
};
pub use handler::{
    FormKind, SubmissionHandler, SubmissionResult, CHECK_FIELDS_MESSAGE, FORM_ERROR_MESSAGE,
};
pub use router::{client_context, form_router};
pub use validation::{
    validate_application, validate_application_at, validate_donation, validate_donation_at,
    ValidationError,
};
