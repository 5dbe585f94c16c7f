use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Form key the handler fills with the derived client address.
pub const IP_ADDRESS_FIELD: &str = "ipAddress";

/// Placeholder stored when no client address can be resolved.
pub const UNKNOWN_IP: &str = "unknown";

/// Form post exactly as captured: field name to raw string, nothing guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSubmission(BTreeMap<String, String>);

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Trimmed value of `field`; blank input counts as missing.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for RawSubmission {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self(fields)
    }
}

impl<K, V> FromIterator<(K, V)> for RawSubmission
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

/// Proxy headers captured by the hosting layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// Raw `X-Forwarded-For` value, comma separated, client first.
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` value.
    pub real_ip: Option<String>,
}

impl ClientContext {
    /// First forwarded-for hop, then the real-ip header, then [`UNKNOWN_IP`].
    pub fn ip_address(&self) -> String {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let real_ip = self
            .real_ip
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        forwarded.or(real_ip).unwrap_or(UNKNOWN_IP).to_string()
    }
}

/// Closed set of keys an error map may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Name,
    Email,
    SponsorshipTier,
    OtherAmount,
    MonthlySponsorship,
    FullName,
    Phone,
    Address,
    Adults,
    Children,
    ChildrenAges,
    MonthlyIncome,
    IncomeSource,
    GovernmentAssistance,
    NeedDescription,
    IntendedUse,
    /// Form-level entry for failures not tied to an input.
    Form,
}

impl FormField {
    pub const fn as_str(self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Email => "email",
            FormField::SponsorshipTier => "sponsorshipTier",
            FormField::OtherAmount => "otherAmount",
            FormField::MonthlySponsorship => "monthlySponsorship",
            FormField::FullName => "fullName",
            FormField::Phone => "phone",
            FormField::Address => "address",
            FormField::Adults => "adults",
            FormField::Children => "children",
            FormField::ChildrenAges => "childrenAges",
            FormField::MonthlyIncome => "monthlyIncome",
            FormField::IncomeSource => "incomeSource",
            FormField::GovernmentAssistance => "governmentAssistance",
            FormField::NeedDescription => "needDescription",
            FormField::IntendedUse => "intendedUse",
            FormField::Form => "form",
        }
    }
}

/// Donation sponsorship level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsorshipTier {
    Bronze,
    Silver,
    Gold,
    Other,
}

impl SponsorshipTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SponsorshipTier::Bronze => "bronze",
            SponsorshipTier::Silver => "silver",
            SponsorshipTier::Gold => "gold",
            SponsorshipTier::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernmentAssistance {
    Yes,
    No,
}

impl GovernmentAssistance {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            GovernmentAssistance::Yes => "yes",
            GovernmentAssistance::No => "no",
        }
    }
}

/// ISO-8601 rendering used for the timestamp column.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Validated donation, one row of the Donations sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) sponsorship_tier: SponsorshipTier,
    pub(crate) other_amount: Option<String>,
    pub(crate) monthly_sponsorship: bool,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) ip_address: String,
}

impl DonationRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn sponsorship_tier(&self) -> SponsorshipTier {
        self.sponsorship_tier
    }

    /// Only present for the `other` tier.
    pub fn other_amount(&self) -> Option<&str> {
        self.other_amount.as_deref()
    }

    pub fn monthly_sponsorship(&self) -> bool {
        self.monthly_sponsorship
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }
}

/// Validated assistance application, one row of the Applications sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) address: String,
    pub(crate) adults: u32,
    pub(crate) children: u32,
    pub(crate) children_ages: String,
    pub(crate) monthly_income: String,
    pub(crate) income_source: String,
    pub(crate) government_assistance: GovernmentAssistance,
    pub(crate) need_description: String,
    pub(crate) intended_use: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) ip_address: String,
}

impl ApplicationRecord {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn adults(&self) -> u32 {
        self.adults
    }

    pub fn children(&self) -> u32 {
        self.children
    }

    /// Free text; empty when the applicant left it blank.
    pub fn children_ages(&self) -> &str {
        &self.children_ages
    }

    pub fn monthly_income(&self) -> &str {
        &self.monthly_income
    }

    pub fn income_source(&self) -> &str {
        &self.income_source
    }

    pub fn government_assistance(&self) -> GovernmentAssistance {
        self.government_assistance
    }

    pub fn need_description(&self) -> &str {
        &self.need_description
    }

    pub fn intended_use(&self) -> &str {
        &self.intended_use
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }
}
