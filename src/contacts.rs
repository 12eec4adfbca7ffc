use crate::models::{Contact, ContactStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const NEW_CONTACT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total: usize,
    pub leads: usize,
    pub customers: usize,
    pub new_this_week: usize,
}

impl ContactStats {
    pub fn from_contacts(contacts: &[Contact], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(NEW_CONTACT_WINDOW_DAYS);
        Self {
            total: contacts.len(),
            leads: contacts.iter().filter(|contact| is_lead(contact)).count(),
            customers: contacts
                .iter()
                .filter(|contact| contact.status == ContactStatus::Customer)
                .count(),
            new_this_week: contacts.iter().filter(|contact| contact.created_at > week_ago).count(),
        }
    }
}

pub fn is_lead(contact: &Contact) -> bool {
    contact
        .tags
        .iter()
        .any(|tag| tag.to_ascii_lowercase().contains("lead"))
}

/// Case-insensitive match on name, email or company. A blank query matches all.
pub fn search<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.trim().to_lowercase();
    contacts
        .iter()
        .filter(|contact| {
            needle.is_empty()
                || contact.name.to_lowercase().contains(&needle)
                || contact.company.to_lowercase().contains(&needle)
                || contact
                    .email
                    .as_deref()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
        })
        .collect()
}
