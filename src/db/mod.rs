use crate::backend::Backend;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Communication, CommunicationDraft, CommunicationKind, Contact, ContactDraft, ContactStatus, Deal, DealDraft,
    DealPatch, DealStage, DealValue, Meeting, MeetingDraft, MeetingStatus, Task, TaskDraft, TaskPatch, TaskPriority,
    TaskStatus, Template, TemplateCategory, TemplateDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");
const DATE_FORMAT: &str = "%Y-%m-%d";

const DEAL_COLUMNS: &str =
    "id, org_id, title, contact, value, stage, notes, close_date, expected_close_date, created_at, updated_at";
const MEETING_COLUMNS: &str =
    "id, org_id, title, contact_id, contact_name, start_at, duration_minutes, status, join_link, description, created_at";
const CONTACT_COLUMNS: &str =
    "id, org_id, name, email, phone, company, tags_json, notes, status, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, org_id, title, description, due_date, priority, contact, status, created_at, updated_at";
const COMMUNICATION_COLUMNS: &str =
    "id, org_id, contact_id, kind, occurred_at, summary, notes, user_id, created_at";
const TEMPLATE_COLUMNS: &str = "id, org_id, name, subject, body, category, tags_json, created_at, updated_at";

/// SQLite-backed record store. Every table is partitioned by organization id.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    pub fn get_deal(&self, org_id: &str, deal_id: &str) -> AppResult<Option<Deal>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {DEAL_COLUMNS} FROM deals WHERE org_id = ?1 AND id = ?2"),
            params![org_id, deal_id],
            parse_deal_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    fn select_deals(&self, org_id: &str) -> AppResult<Vec<Deal>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_deal_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_deal(&self, org_id: &str, draft: DealDraft) -> AppResult<Deal> {
        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            title: draft.title,
            contact: draft.contact,
            value: draft.value,
            stage: draft.stage,
            notes: draft.notes,
            close_date: draft.close_date,
            expected_close_date: draft.expected_close_date,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO deals ({DEAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                deal.id,
                deal.org_id,
                deal.title,
                deal.contact,
                deal.value.raw(),
                deal.stage.as_str(),
                deal.notes,
                deal.close_date.map(format_date),
                deal.expected_close_date.map(format_date),
                deal.created_at.to_rfc3339(),
                deal.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(deal)
    }

    fn patch_deal(&self, org_id: &str, deal_id: &str, patch: &DealPatch) -> AppResult<Deal> {
        let mut sets = vec!["updated_at = ?".to_string()];
        let mut params_vec: Vec<Option<String>> = vec![Some(patch.updated_at.to_rfc3339())];

        if let Some(title) = &patch.title {
            sets.push("title = ?".to_string());
            params_vec.push(Some(title.clone()));
        }
        if let Some(contact) = &patch.contact {
            sets.push("contact = ?".to_string());
            params_vec.push(Some(contact.clone()));
        }
        if let Some(value) = &patch.value {
            sets.push("value = ?".to_string());
            params_vec.push(Some(value.raw().to_string()));
        }
        if let Some(stage) = &patch.stage {
            sets.push("stage = ?".to_string());
            params_vec.push(Some(stage.as_str().to_string()));
        }
        if let Some(notes) = &patch.notes {
            sets.push("notes = ?".to_string());
            params_vec.push(Some(notes.clone()));
        }
        if let Some(close_date) = patch.close_date {
            sets.push("close_date = ?".to_string());
            params_vec.push(close_date.map(format_date));
        }
        if let Some(expected_close_date) = patch.expected_close_date {
            sets.push("expected_close_date = ?".to_string());
            params_vec.push(expected_close_date.map(format_date));
        }
        params_vec.push(Some(org_id.to_string()));
        params_vec.push(Some(deal_id.to_string()));

        let query = format!("UPDATE deals SET {} WHERE org_id = ? AND id = ?", sets.join(", "));
        let changed = {
            let conn = self.conn()?;
            conn.execute(&query, rusqlite::params_from_iter(params_vec.iter()))?
        };
        if changed == 0 {
            return Err(AppError::NotFound(format!("deal {deal_id}")));
        }
        self.get_deal(org_id, deal_id)?
            .ok_or_else(|| AppError::NotFound(format!("deal {deal_id}")))
    }

    fn set_deal_stages(
        &self,
        org_id: &str,
        deal_ids: &[String],
        stage: &DealStage,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        if deal_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; deal_ids.len()].join(", ");
        let query = format!(
            "UPDATE deals SET stage = ?, updated_at = ? WHERE org_id = ? AND id IN ({placeholders}) RETURNING id"
        );

        let stage = stage.as_str().to_string();
        let updated_at = updated_at.to_rfc3339();
        let org_id = org_id.to_string();
        let mut dyn_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(deal_ids.len() + 3);
        dyn_params.push(&stage);
        dyn_params.push(&updated_at);
        dyn_params.push(&org_id);
        dyn_params.extend(deal_ids.iter().map(|id| id as &dyn rusqlite::ToSql));

        let conn = self.conn()?;
        let mut statement = conn.prepare(&query)?;
        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), |row| row.get::<_, String>(0))?;
        let mut touched = Vec::new();
        for row in rows {
            touched.push(row?);
        }
        Ok(touched)
    }

    fn select_meetings(&self, org_id: &str) -> AppResult<Vec<Meeting>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_meeting_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_meeting(&self, org_id: &str, draft: MeetingDraft) -> AppResult<Meeting> {
        let meeting = Meeting {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            title: draft.title,
            contact_id: draft.contact_id,
            contact_name: draft.contact_name,
            start: draft.start,
            duration_minutes: draft.duration_minutes,
            status: draft.status,
            join_link: draft.join_link,
            description: draft.description,
            created_at: Utc::now(),
        };

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO meetings ({MEETING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                meeting.id,
                meeting.org_id,
                meeting.title,
                meeting.contact_id,
                meeting.contact_name,
                meeting.start.to_rfc3339(),
                meeting.duration_minutes,
                meeting.status.as_str(),
                meeting.join_link,
                meeting.description,
                meeting.created_at.to_rfc3339(),
            ],
        )?;
        Ok(meeting)
    }

    fn select_contacts(&self, org_id: &str) -> AppResult<Vec<Contact>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_contact_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_contact(&self, org_id: &str, draft: ContactDraft) -> AppResult<Contact> {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            tags: draft.tags,
            notes: draft.notes,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        let tags_json = serde_json::to_string(&contact.tags)?;

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                contact.id,
                contact.org_id,
                contact.name,
                contact.email,
                contact.phone,
                contact.company,
                tags_json,
                contact.notes,
                contact.status.as_str(),
                contact.created_at.to_rfc3339(),
                contact.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(contact)
    }

    fn select_tasks(&self, org_id: &str) -> AppResult<Vec<Task>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_task_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_task(&self, org_id: &str, draft: TaskDraft) -> AppResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority,
            contact: draft.contact,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                task.id,
                task.org_id,
                task.title,
                task.description,
                task.due_date.map(format_date),
                task.priority.as_str(),
                task.contact,
                task.status.as_str(),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(task)
    }

    fn patch_task(&self, org_id: &str, task_id: &str, patch: &TaskPatch) -> AppResult<Task> {
        let conn = self.conn()?;
        let changed = match patch.status {
            Some(status) => conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE org_id = ?3 AND id = ?4",
                params![status.as_str(), patch.updated_at.to_rfc3339(), org_id, task_id],
            )?,
            None => conn.execute(
                "UPDATE tasks SET updated_at = ?1 WHERE org_id = ?2 AND id = ?3",
                params![patch.updated_at.to_rfc3339(), org_id, task_id],
            )?,
        };
        if changed == 0 {
            return Err(AppError::NotFound(format!("task {task_id}")));
        }
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE org_id = ?1 AND id = ?2"),
            params![org_id, task_id],
            parse_task_row,
        )
        .map_err(AppError::from)
    }

    fn select_communications(&self, org_id: &str) -> AppResult<Vec<Communication>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {COMMUNICATION_COLUMNS} FROM communications WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_communication_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_communication(&self, org_id: &str, draft: CommunicationDraft) -> AppResult<Communication> {
        let communication = Communication {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            contact_id: draft.contact_id,
            kind: draft.kind,
            occurred_at: draft.occurred_at,
            summary: draft.summary,
            notes: draft.notes,
            user_id: draft.user_id,
            created_at: Utc::now(),
        };

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO communications ({COMMUNICATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                communication.id,
                communication.org_id,
                communication.contact_id,
                communication.kind.as_str(),
                communication.occurred_at.to_rfc3339(),
                communication.summary,
                communication.notes,
                communication.user_id,
                communication.created_at.to_rfc3339(),
            ],
        )?;
        Ok(communication)
    }

    fn select_templates(&self, org_id: &str) -> AppResult<Vec<Template>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE org_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = statement.query_map([org_id], parse_template_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn write_template(&self, org_id: &str, draft: TemplateDraft) -> AppResult<Template> {
        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            name: draft.name,
            subject: draft.subject,
            body: draft.body,
            category: draft.category,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        };
        let tags_json = serde_json::to_string(&template.tags)?;

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO templates ({TEMPLATE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                template.id,
                template.org_id,
                template.name,
                template.subject,
                template.body,
                template.category.as_str(),
                tags_json,
                template.created_at.to_rfc3339(),
                template.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(template)
    }
}

#[async_trait]
impl Backend for Database {
    async fn list_deals(&self, org_id: &str) -> AppResult<Vec<Deal>> {
        self.select_deals(org_id)
    }

    async fn insert_deal(&self, org_id: &str, draft: DealDraft) -> AppResult<Deal> {
        self.write_deal(org_id, draft)
    }

    async fn update_deal(&self, org_id: &str, deal_id: &str, patch: DealPatch) -> AppResult<Deal> {
        self.patch_deal(org_id, deal_id, &patch)
    }

    async fn update_deal_stages(
        &self,
        org_id: &str,
        deal_ids: &[String],
        stage: DealStage,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        self.set_deal_stages(org_id, deal_ids, &stage, updated_at)
    }

    async fn list_meetings(&self, org_id: &str) -> AppResult<Vec<Meeting>> {
        self.select_meetings(org_id)
    }

    async fn insert_meeting(&self, org_id: &str, draft: MeetingDraft) -> AppResult<Meeting> {
        self.write_meeting(org_id, draft)
    }

    async fn list_contacts(&self, org_id: &str) -> AppResult<Vec<Contact>> {
        self.select_contacts(org_id)
    }

    async fn insert_contact(&self, org_id: &str, draft: ContactDraft) -> AppResult<Contact> {
        self.write_contact(org_id, draft)
    }

    async fn list_tasks(&self, org_id: &str) -> AppResult<Vec<Task>> {
        self.select_tasks(org_id)
    }

    async fn insert_task(&self, org_id: &str, draft: TaskDraft) -> AppResult<Task> {
        self.write_task(org_id, draft)
    }

    async fn update_task(&self, org_id: &str, task_id: &str, patch: TaskPatch) -> AppResult<Task> {
        self.patch_task(org_id, task_id, &patch)
    }

    async fn list_communications(&self, org_id: &str) -> AppResult<Vec<Communication>> {
        self.select_communications(org_id)
    }

    async fn insert_communication(&self, org_id: &str, draft: CommunicationDraft) -> AppResult<Communication> {
        self.write_communication(org_id, draft)
    }

    async fn list_templates(&self, org_id: &str) -> AppResult<Vec<Template>> {
        self.select_templates(org_id)
    }

    async fn insert_template(&self, org_id: &str, draft: TemplateDraft) -> AppResult<Template> {
        self.write_template(org_id, draft)
    }
}

fn parse_deal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Deal> {
    let value: String = row.get(4)?;
    let stage: String = row.get(5)?;
    let close_date: Option<String> = row.get(7)?;
    let expected_close_date: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Deal {
        id: row.get(0)?,
        org_id: row.get(1)?,
        title: row.get(2)?,
        contact: row.get(3)?,
        value: DealValue::parse(value),
        stage: DealStage::parse(&stage),
        notes: row.get(6)?,
        close_date: parse_optional_date(close_date)?,
        expected_close_date: parse_optional_date(expected_close_date)?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn parse_meeting_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Meeting> {
    let start: String = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(10)?;
    Ok(Meeting {
        id: row.get(0)?,
        org_id: row.get(1)?,
        title: row.get(2)?,
        contact_id: row.get(3)?,
        contact_name: row.get(4)?,
        start: parse_time(&start)?,
        duration_minutes: row.get(6)?,
        status: meeting_status_from_str(&status),
        join_link: row.get(8)?,
        description: row.get(9)?,
        created_at: parse_time(&created_at)?,
    })
}

fn parse_contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let tags_json: String = row.get(6)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Contact {
        id: row.get(0)?,
        org_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        company: row.get(5)?,
        tags: parse_tags(&tags_json)?,
        notes: row.get(7)?,
        status: contact_status_from_str(&status),
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn parse_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let due_date: Option<String> = row.get(4)?;
    let priority: String = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        org_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_date: parse_optional_date(due_date)?,
        priority: task_priority_from_str(&priority),
        contact: row.get(6)?,
        status: task_status_from_str(&status),
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn parse_communication_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Communication> {
    let kind: String = row.get(3)?;
    let occurred_at: String = row.get(4)?;
    let created_at: String = row.get(8)?;
    Ok(Communication {
        id: row.get(0)?,
        org_id: row.get(1)?,
        contact_id: row.get(2)?,
        kind: communication_kind_from_str(&kind),
        occurred_at: parse_time(&occurred_at)?,
        summary: row.get(5)?,
        notes: row.get(6)?,
        user_id: row.get(7)?,
        created_at: parse_time(&created_at)?,
    })
}

fn parse_template_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    let category: String = row.get(5)?;
    let tags_json: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Template {
        id: row.get(0)?,
        org_id: row.get(1)?,
        name: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        category: template_category_from_str(&category),
        tags: parse_tags(&tags_json)?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

// Rows written by other clients may carry values outside the known sets.
// Those fall back to the default of each field rather than failing the load.

fn meeting_status_from_str(value: &str) -> MeetingStatus {
    match value.trim().to_ascii_lowercase().as_str() {
        "completed" => MeetingStatus::Completed,
        "cancelled" | "canceled" => MeetingStatus::Cancelled,
        _ => MeetingStatus::Scheduled,
    }
}

fn contact_status_from_str(value: &str) -> ContactStatus {
    match value {
        "Inactive" => ContactStatus::Inactive,
        "Customer" => ContactStatus::Customer,
        _ => ContactStatus::Active,
    }
}

fn task_priority_from_str(value: &str) -> TaskPriority {
    match value {
        "Low" => TaskPriority::Low,
        "High" => TaskPriority::High,
        _ => TaskPriority::Medium,
    }
}

fn task_status_from_str(value: &str) -> TaskStatus {
    match value {
        "Completed" => TaskStatus::Completed,
        _ => TaskStatus::Pending,
    }
}

fn communication_kind_from_str(value: &str) -> CommunicationKind {
    CommunicationKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == value)
        .unwrap_or(CommunicationKind::Note)
}

fn template_category_from_str(value: &str) -> TemplateCategory {
    match value {
        "Introduction" => TemplateCategory::Introduction,
        "Follow-up" => TemplateCategory::FollowUp,
        "Proposal" => TemplateCategory::Proposal,
        "Closing" => TemplateCategory::Closing,
        _ => TemplateCategory::General,
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_optional_date(raw: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|error| conversion_failure(error.to_string())),
    }
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| conversion_failure(error.to_string()))
}

fn parse_tags(raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|error| conversion_failure(format!("invalid tags column: {error}")))
}

fn conversion_failure(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}
