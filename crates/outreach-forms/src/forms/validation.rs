//! Field rules for the donation and application forms.
//!
//! Every rule runs on every submission; violations are collected per field so the
//! caller can highlight all of them at once.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use super::domain::{
    ApplicationRecord, DonationRecord, FormField, GovernmentAssistance, RawSubmission,
    SponsorshipTier, IP_ADDRESS_FIELD, UNKNOWN_IP,
};

const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 10;
const MIN_ADDRESS_LEN: usize = 5;
const MIN_INCOME_SOURCE_LEN: usize = 2;
const MIN_NARRATIVE_LEN: usize = 10;

/// Field-keyed validation failures in the order the rules ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    fields: IndexMap<FormField, Vec<String>>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn messages(&self, field: FormField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.fields.keys().copied()
    }

    pub(crate) fn push(&mut self, field: FormField, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    /// Error map keyed by the wire field names.
    pub fn into_map(self) -> IndexMap<String, Vec<String>> {
        self.fields
            .into_iter()
            .map(|(field, messages)| (field.as_str().to_string(), messages))
            .collect()
    }

    fn finish<T>(mut self, build: impl FnOnce() -> Option<T>) -> Result<T, Self> {
        if self.is_empty() {
            // Every rule that yields no value also records an error, so this only
            // falls through if a rule forgets to.
            if let Some(value) = build() {
                return Ok(value);
            }
            self.push(FormField::Form, "Submission could not be processed");
        }
        Err(self)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().map(FormField::as_str).collect();
        write!(f, "validation failed for: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationError {}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

/// Checkbox semantics: anything but an explicit "on" value is false.
fn checkbox(value: Option<&str>) -> bool {
    matches!(
        value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "on" | "yes" | "1")
    )
}

/// Collects violations while extracting normalized values from one submission.
struct FieldRules<'a> {
    raw: &'a RawSubmission,
    errors: ValidationError,
}

impl<'a> FieldRules<'a> {
    fn new(raw: &'a RawSubmission) -> Self {
        Self {
            raw,
            errors: ValidationError::default(),
        }
    }

    fn value(&self, field: FormField) -> Option<&'a str> {
        self.raw.text(field.as_str())
    }

    fn required_text(
        &mut self,
        field: FormField,
        min_len: usize,
        missing: &str,
        too_short: &str,
    ) -> Option<String> {
        match self.value(field) {
            None => {
                self.errors.push(field, missing);
                None
            }
            Some(value) if value.chars().count() < min_len => {
                self.errors.push(field, too_short);
                None
            }
            Some(value) => Some(value.to_string()),
        }
    }

    fn email(&mut self, field: FormField) -> Option<String> {
        match self.value(field) {
            None => {
                self.errors.push(field, "Email address is required");
                None
            }
            Some(value) if !email_pattern().is_match(value) => {
                self.errors.push(field, "Please enter a valid email address");
                None
            }
            Some(value) => Some(value.to_lowercase()),
        }
    }

    fn choice<T>(
        &mut self,
        field: FormField,
        parse: fn(&str) -> Option<T>,
        missing: &str,
        invalid: &str,
    ) -> Option<T> {
        match self.value(field) {
            None => {
                self.errors.push(field, missing);
                None
            }
            Some(value) => {
                let parsed = parse(value);
                if parsed.is_none() {
                    self.errors.push(field, invalid);
                }
                parsed
            }
        }
    }

    /// Whole number with a lower bound; `default` applies when the field is blank.
    fn count(
        &mut self,
        field: FormField,
        min: i64,
        default: Option<u32>,
        label: &str,
    ) -> Option<u32> {
        let Some(value) = self.value(field) else {
            if default.is_none() {
                self.errors.push(field, format!("{label} is required"));
            }
            return default;
        };

        let parsed = match value.parse::<i64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                self.errors
                    .push(field, format!("{label} must be a whole number"));
                return None;
            }
        };

        if parsed < min {
            self.errors
                .push(field, format!("{label} must be at least {min}"));
            return None;
        }

        match u32::try_from(parsed) {
            Ok(count) => Some(count),
            Err(_) => {
                self.errors.push(field, format!("{label} is too large"));
                None
            }
        }
    }

    fn positive_amount(&mut self, field: FormField) -> Option<String> {
        let Some(value) = self.value(field) else {
            self.errors
                .push(field, "Please enter a donation amount for the other tier");
            return None;
        };

        match value.parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount > 0.0 => Some(value.to_string()),
            _ => {
                self.errors
                    .push(field, "Donation amount must be a positive number");
                None
            }
        }
    }

    fn optional_text(&self, field: FormField) -> String {
        self.value(field).unwrap_or_default().to_string()
    }

    fn ip_address(&self) -> String {
        self.raw
            .text(IP_ADDRESS_FIELD)
            .unwrap_or(UNKNOWN_IP)
            .to_string()
    }
}

pub fn validate_donation(raw: &RawSubmission) -> Result<DonationRecord, ValidationError> {
    validate_donation_at(raw, Utc::now())
}

/// Validate a donation using `now` as the record timestamp.
pub fn validate_donation_at(
    raw: &RawSubmission,
    now: DateTime<Utc>,
) -> Result<DonationRecord, ValidationError> {
    let mut rules = FieldRules::new(raw);

    let name = rules.required_text(
        FormField::Name,
        MIN_NAME_LEN,
        "Name is required",
        "Name must be at least 2 characters long",
    );
    let email = rules.email(FormField::Email);
    let tier = rules.choice(
        FormField::SponsorshipTier,
        SponsorshipTier::parse,
        "Please select a sponsorship tier",
        "Sponsorship tier must be bronze, silver, gold, or other",
    );
    let other_amount = match tier {
        Some(SponsorshipTier::Other) => rules.positive_amount(FormField::OtherAmount).map(Some),
        _ => Some(None),
    };
    let monthly_sponsorship = checkbox(raw.get(FormField::MonthlySponsorship.as_str()));
    let ip_address = rules.ip_address();

    rules.errors.finish(|| {
        Some(DonationRecord {
            name: name?,
            email: email?,
            sponsorship_tier: tier?,
            other_amount: other_amount?,
            monthly_sponsorship,
            timestamp: now.trunc_subsecs(3),
            ip_address,
        })
    })
}

pub fn validate_application(raw: &RawSubmission) -> Result<ApplicationRecord, ValidationError> {
    validate_application_at(raw, Utc::now())
}

/// Validate an application using `now` as the record timestamp.
pub fn validate_application_at(
    raw: &RawSubmission,
    now: DateTime<Utc>,
) -> Result<ApplicationRecord, ValidationError> {
    let mut rules = FieldRules::new(raw);

    let full_name = rules.required_text(
        FormField::FullName,
        MIN_NAME_LEN,
        "Full name is required",
        "Full name must be at least 2 characters long",
    );
    let email = rules.email(FormField::Email);
    let phone = rules.required_text(
        FormField::Phone,
        MIN_PHONE_LEN,
        "Phone number is required",
        "Please enter a valid phone number, including area code",
    );
    let address = rules.required_text(
        FormField::Address,
        MIN_ADDRESS_LEN,
        "Address is required",
        "Please enter your complete address",
    );
    let adults = rules.count(FormField::Adults, 1, None, "Number of adults");
    let children = rules.count(FormField::Children, 0, Some(0), "Number of children");
    let children_ages = rules.optional_text(FormField::ChildrenAges);
    let monthly_income = rules.required_text(
        FormField::MonthlyIncome,
        1,
        "Monthly income is required",
        "Monthly income is required",
    );
    let income_source = rules.required_text(
        FormField::IncomeSource,
        MIN_INCOME_SOURCE_LEN,
        "Income source is required",
        "Income source must be at least 2 characters long",
    );
    let government_assistance = rules.choice(
        FormField::GovernmentAssistance,
        GovernmentAssistance::parse,
        "Please indicate whether you receive government assistance",
        "Government assistance must be yes or no",
    );
    let need_description = rules.required_text(
        FormField::NeedDescription,
        MIN_NARRATIVE_LEN,
        "Description of need is required",
        "Description of need must be at least 10 characters long",
    );
    let intended_use = rules.required_text(
        FormField::IntendedUse,
        MIN_NARRATIVE_LEN,
        "Intended use is required",
        "Intended use description must be at least 10 characters long",
    );
    let ip_address = rules.ip_address();

    rules.errors.finish(|| {
        Some(ApplicationRecord {
            full_name: full_name?,
            email: email?,
            phone: phone?,
            address: address?,
            adults: adults?,
            children: children?,
            children_ages,
            monthly_income: monthly_income?,
            income_source: income_source?,
            government_assistance: government_assistance?,
            need_description: need_description?,
            intended_use: intended_use?,
            timestamp: now.trunc_subsecs(3),
            ip_address,
        })
    })
}
