//! Boundary to the hosted persistence service.
//!
//! The in-memory store only ever holds snapshots of what a [`Backend`] returned;
//! the backend stays the owner of record.

pub mod memory;

use crate::errors::AppResult;
use crate::models::{
    Communication, CommunicationDraft, Contact, ContactDraft, Deal, DealDraft, DealPatch, DealStage, Meeting,
    MeetingDraft, Task, TaskDraft, TaskPatch, Template, TemplateDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Per-entity collections scoped by organization.
///
/// Lists are ordered by creation time, newest first. Inserts return the stored
/// record with its assigned id and timestamps. Updates return the patched
/// record, or `AppError::NotFound` when the id does not exist in the org.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_deals(&self, org_id: &str) -> AppResult<Vec<Deal>>;
    async fn insert_deal(&self, org_id: &str, draft: DealDraft) -> AppResult<Deal>;
    async fn update_deal(&self, org_id: &str, deal_id: &str, patch: DealPatch) -> AppResult<Deal>;
    /// Sets `stage` on every listed deal in one call. Returns the ids that
    /// were actually updated.
    async fn update_deal_stages(
        &self,
        org_id: &str,
        deal_ids: &[String],
        stage: DealStage,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Vec<String>>;

    async fn list_meetings(&self, org_id: &str) -> AppResult<Vec<Meeting>>;
    async fn insert_meeting(&self, org_id: &str, draft: MeetingDraft) -> AppResult<Meeting>;

    async fn list_contacts(&self, org_id: &str) -> AppResult<Vec<Contact>>;
    async fn insert_contact(&self, org_id: &str, draft: ContactDraft) -> AppResult<Contact>;

    async fn list_tasks(&self, org_id: &str) -> AppResult<Vec<Task>>;
    async fn insert_task(&self, org_id: &str, draft: TaskDraft) -> AppResult<Task>;
    async fn update_task(&self, org_id: &str, task_id: &str, patch: TaskPatch) -> AppResult<Task>;

    async fn list_communications(&self, org_id: &str) -> AppResult<Vec<Communication>>;
    async fn insert_communication(&self, org_id: &str, draft: CommunicationDraft) -> AppResult<Communication>;

    async fn list_templates(&self, org_id: &str) -> AppResult<Vec<Template>>;
    async fn insert_template(&self, org_id: &str, draft: TemplateDraft) -> AppResult<Template>;
}
