use crate::config::MeetingConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Meeting, MeetingDraft, MeetingStatus, ScheduleMeetingPayload};
use crate::validation;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;

const JOIN_CODE_LEN: usize = 9;
const JOIN_CODE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Result of testing a proposed time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SlotCheck {
    Available,
    InPast,
    OutOfRange,
    Conflict { meeting_id: String },
}

impl SlotCheck {
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Self::Available => Ok(()),
            Self::InPast => Err(AppError::PastSchedule(
                "cannot schedule meetings in the past".to_string(),
            )),
            Self::OutOfRange => Err(AppError::Validation(
                "meeting end time is out of range".to_string(),
            )),
            Self::Conflict { meeting_id } => Err(AppError::TimeConflict(format!(
                "another meeting ({meeting_id}) is already scheduled at this time"
            ))),
        }
    }
}

/// Checks a candidate slot against the clock and the existing meetings.
///
/// A start before `now` is rejected first. Overlap uses open intervals, so
/// back-to-back meetings do not conflict. Cancelled meetings never block.
pub fn check_slot(start: DateTime<Utc>, duration_minutes: u32, meetings: &[Meeting], now: DateTime<Utc>) -> SlotCheck {
    if start < now {
        return SlotCheck::InPast;
    }
    let Some(end) = start.checked_add_signed(Duration::minutes(i64::from(duration_minutes))) else {
        return SlotCheck::OutOfRange;
    };
    meetings
        .iter()
        .filter(|meeting| meeting.status != MeetingStatus::Cancelled)
        .find(|meeting| start < meeting.end() && end > meeting.start)
        .map_or(SlotCheck::Available, |meeting| SlotCheck::Conflict {
            meeting_id: meeting.id.clone(),
        })
}

pub fn generate_join_link(base: &str) -> String {
    let mut rng = rand::rng();
    let code: String = (0..JOIN_CODE_LEN)
        .map(|_| char::from(JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())]))
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), code)
}

/// Validates a scheduling request and turns it into a draft ready to insert.
pub fn meeting_draft(
    payload: ScheduleMeetingPayload,
    config: &MeetingConfig,
    meetings: &[Meeting],
    now: DateTime<Utc>,
) -> AppResult<MeetingDraft> {
    let contact_id = validation::required("contact", &payload.contact_id)?;
    let title = validation::required("title", &payload.title)?;
    let duration_minutes = payload.duration_minutes.unwrap_or(config.default_duration);
    if duration_minutes == 0 {
        return Err(AppError::Validation("duration must be positive".to_string()));
    }
    if !config.allowed_durations.is_empty() && !config.allowed_durations.contains(&duration_minutes) {
        return Err(AppError::Validation(format!(
            "duration {duration_minutes} is not one of {:?}",
            config.allowed_durations
        )));
    }

    check_slot(payload.start, duration_minutes, meetings, now).into_result()?;

    Ok(MeetingDraft {
        title,
        contact_id,
        contact_name: payload.contact_name.trim().to_string(),
        start: payload.start,
        duration_minutes,
        status: MeetingStatus::Scheduled,
        join_link: generate_join_link(&config.join_link_base),
        description: payload.description.trim().to_string(),
    })
}

/// Meetings starting on `date` (UTC), earliest first.
pub fn meetings_on(meetings: &[Meeting], date: NaiveDate) -> Vec<&Meeting> {
    let mut day = meetings
        .iter()
        .filter(|meeting| meeting.start.date_naive() == date)
        .collect::<Vec<_>>();
    day.sort_by_key(|meeting| meeting.start);
    day
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingStats {
    pub total: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub this_month: usize,
}

impl MeetingStats {
    pub fn from_meetings(meetings: &[Meeting], now: DateTime<Utc>) -> Self {
        let mut stats = Self {
            total: meetings.len(),
            ..Self::default()
        };
        for meeting in meetings {
            if meeting.start > now {
                stats.upcoming += 1;
            }
            if meeting.status == MeetingStatus::Completed {
                stats.completed += 1;
            }
            if meeting.start.year() == now.year() && meeting.start.month() == now.month() {
                stats.this_month += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 3, hour, minute, 0).single().expect("valid time")
    }

    fn meeting(id: &str, start: DateTime<Utc>, duration_minutes: u32, status: MeetingStatus) -> Meeting {
        Meeting {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            title: "Demo".to_string(),
            contact_id: "c1".to_string(),
            contact_name: "John Smith - Acme Corp".to_string(),
            start,
            duration_minutes,
            status,
            join_link: "https://meet.google.com/abc".to_string(),
            description: String::new(),
            created_at: start,
        }
    }

    fn morning() -> DateTime<Utc> {
        at(9, 0)
    }

    #[test]
    fn overlapping_slot_conflicts() {
        let existing = vec![meeting("m1", at(14, 0), 60, MeetingStatus::Scheduled)];
        assert_eq!(
            check_slot(at(14, 30), 30, &existing, morning()),
            SlotCheck::Conflict {
                meeting_id: "m1".to_string()
            }
        );
        assert_eq!(
            check_slot(at(13, 30), 60, &existing, morning()),
            SlotCheck::Conflict {
                meeting_id: "m1".to_string()
            }
        );
    }

    #[test]
    fn back_to_back_slots_do_not_conflict() {
        let existing = vec![meeting("m1", at(14, 0), 60, MeetingStatus::Scheduled)];
        assert_eq!(check_slot(at(15, 0), 30, &existing, morning()), SlotCheck::Available);
        assert_eq!(check_slot(at(13, 30), 30, &existing, morning()), SlotCheck::Available);
    }

    #[test]
    fn cancelled_meetings_never_block() {
        let existing = vec![meeting("m1", at(14, 0), 60, MeetingStatus::Cancelled)];
        assert_eq!(check_slot(at(14, 0), 60, &existing, morning()), SlotCheck::Available);
    }

    #[test]
    fn completed_meetings_still_block() {
        let existing = vec![meeting("m1", at(14, 0), 60, MeetingStatus::Completed)];
        assert!(matches!(
            check_slot(at(14, 15), 15, &existing, morning()),
            SlotCheck::Conflict { .. }
        ));
    }

    #[test]
    fn past_start_is_rejected_before_conflicts() {
        assert_eq!(check_slot(at(8, 59), 30, &[], morning()), SlotCheck::InPast);

        let existing = vec![meeting("m1", at(8, 0), 60, MeetingStatus::Scheduled)];
        assert_eq!(check_slot(at(8, 30), 30, &existing, morning()), SlotCheck::InPast);
        assert!(matches!(
            SlotCheck::InPast.into_result(),
            Err(AppError::PastSchedule(_))
        ));
    }

    #[test]
    fn slot_ending_past_the_calendar_is_rejected() {
        let check = check_slot(DateTime::<Utc>::MAX_UTC, 30, &[], morning());
        assert_eq!(check, SlotCheck::OutOfRange);
        assert!(matches!(check.into_result(), Err(AppError::Validation(_))));

        let mut last = meeting("m1", at(14, 0), 30, MeetingStatus::Scheduled);
        last.start = DateTime::<Utc>::MAX_UTC - Duration::minutes(10);
        assert_eq!(last.end(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            check_slot(last.start - Duration::minutes(5), 10, &[last.clone()], morning()),
            SlotCheck::Conflict {
                meeting_id: "m1".to_string()
            }
        );
    }

    #[test]
    fn join_link_has_nine_base36_chars() {
        let link = generate_join_link("https://meet.google.com/");
        let code = link.strip_prefix("https://meet.google.com/").expect("base prefix");
        assert_eq!(code.len(), 9);
        assert!(code.chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
    }

    #[test]
    fn draft_applies_defaults_and_rejects_odd_durations() {
        let config = MeetingConfig::default();
        let payload = ScheduleMeetingPayload {
            title: " Product demo ".to_string(),
            contact_id: "c1".to_string(),
            contact_name: "John Smith - Acme Corp".to_string(),
            start: at(10, 0),
            duration_minutes: None,
            description: String::new(),
        };
        let draft = meeting_draft(payload.clone(), &config, &[], morning()).expect("draft");
        assert_eq!(draft.title, "Product demo");
        assert_eq!(draft.duration_minutes, 30);
        assert_eq!(draft.status, MeetingStatus::Scheduled);
        assert!(draft.join_link.starts_with("https://meet.google.com/"));

        let odd = ScheduleMeetingPayload {
            duration_minutes: Some(45),
            ..payload.clone()
        };
        assert!(matches!(
            meeting_draft(odd, &config, &[], morning()),
            Err(AppError::Validation(_))
        ));

        let no_contact = ScheduleMeetingPayload {
            contact_id: " ".to_string(),
            ..payload
        };
        assert!(matches!(
            meeting_draft(no_contact, &config, &[], morning()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn stats_and_day_listing() {
        let meetings = vec![
            meeting("late", at(16, 0), 30, MeetingStatus::Scheduled),
            meeting("early", at(8, 0), 30, MeetingStatus::Completed),
            meeting(
                "next-month",
                Utc.with_ymd_and_hms(2030, 7, 1, 10, 0, 0).single().expect("valid time"),
                30,
                MeetingStatus::Scheduled,
            ),
        ];
        let stats = MeetingStats::from_meetings(&meetings, morning());
        assert_eq!(
            stats,
            MeetingStats {
                total: 3,
                upcoming: 2,
                completed: 1,
                this_month: 2
            }
        );

        let day = meetings_on(&meetings, NaiveDate::from_ymd_opt(2030, 6, 3).expect("date"));
        let ids = day.iter().map(|meeting| meeting.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
