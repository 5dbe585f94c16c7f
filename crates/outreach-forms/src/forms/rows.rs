use super::domain::{format_timestamp, ApplicationRecord, DonationRecord};
use crate::store::{SheetLayout, SheetRecord, APPLICATIONS, DONATIONS};

fn yes_no(value: bool) -> String {
    let label = if value { "Yes" } else { "No" };
    label.to_string()
}

impl SheetRecord for DonationRecord {
    const LAYOUT: SheetLayout = DONATIONS;

    fn to_row(&self) -> Vec<String> {
        vec![
            format_timestamp(&self.timestamp),
            self.name.clone(),
            self.email.clone(),
            self.sponsorship_tier.label().to_string(),
            self.other_amount.clone().unwrap_or_default(),
            yes_no(self.monthly_sponsorship),
            self.ip_address.clone(),
        ]
    }
}

impl SheetRecord for ApplicationRecord {
    const LAYOUT: SheetLayout = APPLICATIONS;

    fn to_row(&self) -> Vec<String> {
        vec![
            format_timestamp(&self.timestamp),
            self.full_name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.address.clone(),
            self.adults.to_string(),
            self.children.to_string(),
            self.children_ages.clone(),
            self.monthly_income.clone(),
            self.income_source.clone(),
            self.government_assistance.label().to_string(),
            self.need_description.clone(),
            self.intended_use.clone(),
            self.ip_address.clone(),
        ]
    }
}
