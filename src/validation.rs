use crate::errors::{AppError, AppResult};
use crate::models::{
    CommunicationDraft, ContactDraft, CreateContactPayload, CreateDealPayload, CreateTaskPayload,
    CreateTemplatePayload, DealDraft, DealStage, DealValue, LogCommunicationPayload, TaskDraft, TaskStatus,
    TemplateDraft,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_TITLE_CHARS: usize = 200;
const MAX_NOTES_CHARS: usize = 10_000;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub fn required(field: &str, raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "{field} exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn notes(field: &str, raw: &str) -> AppResult<String> {
    if raw.chars().count() > MAX_NOTES_CHARS {
        return Err(AppError::Validation(format!(
            "{field} exceeds {MAX_NOTES_CHARS} characters"
        )));
    }
    Ok(raw.trim().to_string())
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL_RE.is_match(raw.trim())
}

/// Parses a `YYYY-MM-DD` form field. Blank input means no date.
pub fn parse_date(field: &str, raw: &str) -> AppResult<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{field} '{trimmed}' is not a YYYY-MM-DD date")))
}

/// Splits a comma separated tag list, dropping blanks and repeats.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !tags.iter().any(|existing| existing.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn deal_draft(payload: CreateDealPayload) -> AppResult<DealDraft> {
    let title = required("title", &payload.title)?;
    let value = DealValue::parse(payload.value.trim());
    if !value.is_blank() && value.amount().is_none() {
        return Err(AppError::Validation(format!(
            "value '{}' is not a non-negative number",
            payload.value.trim()
        )));
    }
    let stage = payload.stage.unwrap_or_default();
    if !stage.is_recognized() {
        return Err(AppError::Validation(format!("unknown stage '{}'", stage)));
    }
    Ok(DealDraft {
        title,
        contact: payload.contact.trim().to_string(),
        value,
        stage,
        notes: notes("notes", &payload.notes)?,
        close_date: payload.close_date,
        expected_close_date: payload.expected_close_date,
    })
}

pub fn target_stage(stage: &DealStage) -> AppResult<()> {
    if stage.is_recognized() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "cannot move a deal to unknown stage '{}'",
            stage
        )))
    }
}

pub fn contact_draft(payload: CreateContactPayload) -> AppResult<ContactDraft> {
    let name = required("name", &payload.name)?;
    let email = optional(&payload.email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::Validation(format!("email '{email}' is not valid")));
        }
    }
    Ok(ContactDraft {
        name,
        email,
        phone: optional(&payload.phone),
        company: payload.company.trim().to_string(),
        tags: parse_tags(&payload.tags),
        notes: notes("notes", &payload.notes)?,
        status: payload.status.unwrap_or_default(),
    })
}

pub fn task_draft(payload: CreateTaskPayload) -> AppResult<TaskDraft> {
    Ok(TaskDraft {
        title: required("title", &payload.title)?,
        description: notes("description", &payload.description)?,
        due_date: payload.due_date,
        priority: payload.priority.unwrap_or_default(),
        contact: payload.contact.trim().to_string(),
        status: TaskStatus::Pending,
    })
}

pub fn communication_draft(payload: LogCommunicationPayload, user_id: &str) -> AppResult<CommunicationDraft> {
    Ok(CommunicationDraft {
        contact_id: required("contact", &payload.contact_id)?,
        kind: payload.kind,
        occurred_at: payload.occurred_at,
        summary: required("summary", &payload.summary)?,
        notes: notes("notes", &payload.notes)?,
        user_id: user_id.to_string(),
    })
}

pub fn template_draft(payload: CreateTemplatePayload) -> AppResult<TemplateDraft> {
    let body = payload.body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("body is required".to_string()));
    }
    Ok(TemplateDraft {
        name: required("name", &payload.name)?,
        subject: payload.subject.trim().to_string(),
        body: notes("body", body)?,
        category: payload.category.unwrap_or_default(),
        tags: parse_tags(&payload.tags),
    })
}
