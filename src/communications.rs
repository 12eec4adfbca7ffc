use crate::models::{Communication, CommunicationKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Narrowing applied to the communication log. Unset fields match everything;
/// the date range is inclusive on both ends and compared on the UTC date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunicationFilter {
    pub kind: Option<CommunicationKind>,
    pub contact_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CommunicationFilter {
    pub fn is_active(&self) -> bool {
        self.kind.is_some() || self.contact_id.is_some() || self.from.is_some() || self.to.is_some()
    }

    pub fn matches(&self, entry: &Communication) -> bool {
        if self.kind.is_some_and(|kind| kind != entry.kind) {
            return false;
        }
        if self
            .contact_id
            .as_deref()
            .is_some_and(|contact_id| contact_id != entry.contact_id)
        {
            return false;
        }
        let day = entry.occurred_at.date_naive();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        true
    }
}

/// Filtered log, most recent interaction first.
pub fn timeline<'a>(entries: &'a [Communication], filter: &CommunicationFilter) -> Vec<&'a Communication> {
    let mut matched = entries.iter().filter(|entry| filter.matches(entry)).collect::<Vec<_>>();
    matched.sort_by(|left, right| right.occurred_at.cmp(&left.occurred_at));
    matched
}

pub fn counts_by_kind(entries: &[Communication]) -> BTreeMap<&'static str, usize> {
    let mut counts = CommunicationKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), 0))
        .collect::<BTreeMap<_, _>>();
    for entry in entries {
        *counts.entry(entry.kind.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, contact_id: &str, kind: CommunicationKind, day: u32, hour: u32) -> Communication {
        let occurred_at = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).single().expect("valid time");
        Communication {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            contact_id: contact_id.to_string(),
            kind,
            occurred_at,
            summary: format!("summary {id}"),
            notes: String::new(),
            user_id: "user_1".to_string(),
            created_at: occurred_at,
        }
    }

    fn log() -> Vec<Communication> {
        vec![
            entry("1", "c1", CommunicationKind::Call, 1, 9),
            entry("2", "c2", CommunicationKind::Email, 5, 10),
            entry("3", "c1", CommunicationKind::Email, 10, 23),
            entry("4", "c1", CommunicationKind::Note, 12, 8),
        ]
    }

    fn ids(entries: Vec<&Communication>) -> Vec<&str> {
        entries.into_iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_lists_everything_newest_first() {
        let log = log();
        let filter = CommunicationFilter::default();
        assert!(!filter.is_active());
        assert_eq!(ids(timeline(&log, &filter)), vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn filters_combine() {
        let log = log();
        let filter = CommunicationFilter {
            kind: Some(CommunicationKind::Email),
            contact_id: Some("c1".to_string()),
            ..CommunicationFilter::default()
        };
        assert!(filter.is_active());
        assert_eq!(ids(timeline(&log, &filter)), vec!["3"]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let log = log();
        let filter = CommunicationFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 5),
            to: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..CommunicationFilter::default()
        };
        assert_eq!(ids(timeline(&log, &filter)), vec!["3", "2"]);
    }

    #[test]
    fn counts_include_every_kind() {
        let counts = counts_by_kind(&log());
        assert_eq!(counts.get("email"), Some(&2));
        assert_eq!(counts.get("call"), Some(&1));
        assert_eq!(counts.get("meeting"), Some(&0));
        assert_eq!(counts.len(), 4);
    }
}
