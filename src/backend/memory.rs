use super::Backend;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Communication, CommunicationDraft, Contact, ContactDraft, Deal, DealDraft, DealPatch, DealStage, Meeting,
    MeetingDraft, Task, TaskDraft, TaskPatch, Template, TemplateDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    deals: Vec<Deal>,
    meetings: Vec<Meeting>,
    contacts: Vec<Contact>,
    tasks: Vec<Task>,
    communications: Vec<Communication>,
    templates: Vec<Template>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCalls {
    pub reads: u64,
    pub writes: u64,
}

/// Process-local backend. Counts every call it receives and can be told to
/// reject reads or writes, which is how an unreachable service is simulated.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    reads: AtomicU64,
    writes: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a deal as-is without counting a call, as if another client wrote it.
    pub fn seed_deal(&self, deal: Deal) -> AppResult<()> {
        self.lock()?.deals.push(deal);
        Ok(())
    }

    pub fn seed_meeting(&self, meeting: Meeting) -> AppResult<()> {
        self.lock()?.meetings.push(meeting);
        Ok(())
    }

    pub fn deal(&self, deal_id: &str) -> AppResult<Option<Deal>> {
        Ok(self.lock()?.deals.iter().find(|deal| deal.id == deal_id).cloned())
    }

    pub fn calls(&self) -> BackendCalls {
        BackendCalls {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory backend mutex poisoned".to_string()))
    }

    fn read(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("backend is unreachable".to_string()));
        }
        self.lock()
    }

    fn write(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("backend rejected the write".to_string()));
        }
        self.lock()
    }
}

fn newest_first<T: Clone>(
    rows: &[T],
    org_id: &str,
    org_of: impl Fn(&T) -> &str,
    created: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut items = rows
        .iter()
        .rev()
        .filter(|row| org_of(row) == org_id)
        .cloned()
        .collect::<Vec<_>>();
    items.sort_by_key(|row| std::cmp::Reverse(created(row)));
    items
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list_deals(&self, org_id: &str) -> AppResult<Vec<Deal>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.deals, org_id, |deal| deal.org_id.as_str(), |deal| deal.created_at))
    }

    async fn insert_deal(&self, org_id: &str, draft: DealDraft) -> AppResult<Deal> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let deal = Deal {
            id: new_id(),
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
        tables.deals.push(deal.clone());
        Ok(deal)
    }

    async fn update_deal(&self, org_id: &str, deal_id: &str, patch: DealPatch) -> AppResult<Deal> {
        let mut tables = self.write()?;
        let Some(deal) = tables
            .deals
            .iter_mut()
            .find(|deal| deal.id == deal_id && deal.org_id == org_id)
        else {
            return Err(AppError::NotFound(format!("deal {deal_id}")));
        };
        patch.apply_to(deal);
        Ok(deal.clone())
    }

    async fn update_deal_stages(
        &self,
        org_id: &str,
        deal_ids: &[String],
        stage: DealStage,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        let mut tables = self.write()?;
        let mut touched = Vec::new();
        for deal in tables
            .deals
            .iter_mut()
            .filter(|deal| deal.org_id == org_id && deal_ids.contains(&deal.id))
        {
            deal.stage = stage.clone();
            deal.updated_at = updated_at;
            touched.push(deal.id.clone());
        }
        Ok(touched)
    }

    async fn list_meetings(&self, org_id: &str) -> AppResult<Vec<Meeting>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.meetings, org_id, |meeting| meeting.org_id.as_str(), |meeting| meeting.created_at))
    }

    async fn insert_meeting(&self, org_id: &str, draft: MeetingDraft) -> AppResult<Meeting> {
        let mut tables = self.write()?;
        let meeting = Meeting {
            id: new_id(),
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
        tables.meetings.push(meeting.clone());
        Ok(meeting)
    }

    async fn list_contacts(&self, org_id: &str) -> AppResult<Vec<Contact>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.contacts, org_id, |contact| contact.org_id.as_str(), |contact| contact.created_at))
    }

    async fn insert_contact(&self, org_id: &str, draft: ContactDraft) -> AppResult<Contact> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let contact = Contact {
            id: new_id(),
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
        tables.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn list_tasks(&self, org_id: &str) -> AppResult<Vec<Task>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.tasks, org_id, |task| task.org_id.as_str(), |task| task.created_at))
    }

    async fn insert_task(&self, org_id: &str, draft: TaskDraft) -> AppResult<Task> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let task = Task {
            id: new_id(),
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
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, org_id: &str, task_id: &str, patch: TaskPatch) -> AppResult<Task> {
        let mut tables = self.write()?;
        let Some(task) = tables
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id && task.org_id == org_id)
        else {
            return Err(AppError::NotFound(format!("task {task_id}")));
        };
        if let Some(status) = patch.status {
            task.status = status;
        }
        task.updated_at = patch.updated_at;
        Ok(task.clone())
    }

    async fn list_communications(&self, org_id: &str) -> AppResult<Vec<Communication>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.communications, org_id, |entry| entry.org_id.as_str(), |entry| entry.created_at))
    }

    async fn insert_communication(&self, org_id: &str, draft: CommunicationDraft) -> AppResult<Communication> {
        let mut tables = self.write()?;
        let communication = Communication {
            id: new_id(),
            org_id: org_id.to_string(),
            contact_id: draft.contact_id,
            kind: draft.kind,
            occurred_at: draft.occurred_at,
            summary: draft.summary,
            notes: draft.notes,
            user_id: draft.user_id,
            created_at: Utc::now(),
        };
        tables.communications.push(communication.clone());
        Ok(communication)
    }

    async fn list_templates(&self, org_id: &str) -> AppResult<Vec<Template>> {
        let tables = self.read()?;
        Ok(newest_first(&tables.templates, org_id, |template| template.org_id.as_str(), |template| template.created_at))
    }

    async fn insert_template(&self, org_id: &str, draft: TemplateDraft) -> AppResult<Template> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let template = Template {
            id: new_id(),
            org_id: org_id.to_string(),
            name: draft.name,
            subject: draft.subject,
            body: draft.body,
            category: draft.category,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        };
        tables.templates.push(template.clone());
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBackend;
    use crate::backend::Backend;
    use crate::errors::AppError;
    use crate::models::{DealDraft, DealPatch, DealStage, DealValue};
    use chrono::Utc;

    fn draft(title: &str) -> DealDraft {
        DealDraft {
            title: title.to_string(),
            contact: String::new(),
            value: DealValue::parse("10"),
            stage: DealStage::New,
            notes: String::new(),
            close_date: None,
            expected_close_date: None,
        }
    }

    #[tokio::test]
    async fn lists_are_scoped_by_org_and_newest_first() {
        let backend = MemoryBackend::new();
        backend.insert_deal("org_a", draft("first")).await.expect("insert");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        backend.insert_deal("org_a", draft("second")).await.expect("insert");
        backend.insert_deal("org_b", draft("other org")).await.expect("insert");

        let deals = backend.list_deals("org_a").await.expect("list");
        let titles = deals.iter().map(|deal| deal.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(backend.calls().writes, 3);
        assert_eq!(backend.calls().reads, 1);
    }

    #[tokio::test]
    async fn failing_writes_leave_tables_untouched() {
        let backend = MemoryBackend::new();
        let deal = backend.insert_deal("org_a", draft("deal")).await.expect("insert");
        backend.set_fail_writes(true);

        let error = backend
            .update_deal("org_a", &deal.id, DealPatch::stage(DealStage::Won, Utc::now()))
            .await
            .expect_err("write should fail");
        assert!(matches!(error, AppError::Persistence(_)));
        let stored = backend.deal(&deal.id).expect("lookup").expect("deal exists");
        assert_eq!(stored.stage, DealStage::New);
    }

    #[tokio::test]
    async fn update_of_unknown_deal_is_not_found() {
        let backend = MemoryBackend::new();
        let error = backend
            .update_deal("org_a", "missing", DealPatch::stage(DealStage::Won, Utc::now()))
            .await
            .expect_err("unknown id");
        assert!(matches!(error, AppError::NotFound(_)));
    }
}
