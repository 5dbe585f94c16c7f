//! Intake pipeline for the donation and assistance-application forms.
//!
//! Submissions flow through [`forms::SubmissionHandler`], which validates the raw
//! form post and appends the normalized record to the spreadsheet store.

pub mod config;
pub mod error;
pub mod forms;
pub mod store;
pub mod telemetry;
