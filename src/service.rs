use crate::backend::Backend;
use crate::communications::{self, CommunicationFilter};
use crate::config::CrmConfig;
use crate::contacts::ContactStats;
use crate::dashboard::{Dashboard, TaskStats};
use crate::errors::{AppError, AppResult};
use crate::meetings::{self, MeetingStats};
use crate::models::{
    Communication, Contact, CreateContactPayload, CreateDealPayload, CreateTaskPayload, CreateTemplatePayload, Deal,
    DealStage, LogCommunicationPayload, Meeting, ScheduleMeetingPayload, StageAggregate, StageMoveOutcome, Task,
    TaskPatch, TaskStatus, Template,
};
use crate::pipeline::{self, PipelineBoard, PipelineSummary};
use crate::store::CrmStore;
use crate::sweep::{self, SweepReport};
use crate::templates::{self, RenderedTemplate};
use crate::validation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub deals: usize,
    pub meetings: usize,
    pub contacts: usize,
    pub tasks: usize,
    pub communications: usize,
    pub templates: usize,
    pub sweep: SweepReport,
}

/// One organization's workspace: the backend handle plus the in-memory
/// snapshot the views read from.
///
/// Writes are awaited one at a time under the store lock and the store only
/// changes once the backend has confirmed them.
pub struct CrmService {
    backend: Arc<dyn Backend>,
    org_id: String,
    user_id: String,
    config: CrmConfig,
    store: Mutex<CrmStore>,
}

impl CrmService {
    pub fn new(backend: Arc<dyn Backend>, org_id: &str, user_id: &str, config: CrmConfig) -> Self {
        Self {
            backend,
            org_id: org_id.to_string(),
            user_id: user_id.to_string(),
            config,
            store: Mutex::new(CrmStore::new()),
        }
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    pub async fn refresh(&self) -> AppResult<RefreshReport> {
        self.refresh_at(Utc::now()).await
    }

    /// Reloads every collection and runs the won-promotion sweep before the
    /// new snapshot replaces the current one. A failed load keeps the
    /// previous snapshot.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> AppResult<RefreshReport> {
        let mut store = self.store.lock().await;
        let org_id = self.org_id.as_str();

        let mut fresh = CrmStore::new();
        fresh.load_deals(self.backend.list_deals(org_id).await.map_err(log_failure(org_id, "list_deals"))?);
        let sweep = sweep::run_won_promotion(self.backend.as_ref(), org_id, &mut fresh, now).await;
        fresh.load_meetings(
            self.backend
                .list_meetings(org_id)
                .await
                .map_err(log_failure(org_id, "list_meetings"))?,
        );
        fresh.load_contacts(
            self.backend
                .list_contacts(org_id)
                .await
                .map_err(log_failure(org_id, "list_contacts"))?,
        );
        fresh.load_tasks(self.backend.list_tasks(org_id).await.map_err(log_failure(org_id, "list_tasks"))?);
        fresh.load_communications(
            self.backend
                .list_communications(org_id)
                .await
                .map_err(log_failure(org_id, "list_communications"))?,
        );
        fresh.load_templates(
            self.backend
                .list_templates(org_id)
                .await
                .map_err(log_failure(org_id, "list_templates"))?,
        );

        let report = RefreshReport {
            deals: fresh.deals().len(),
            meetings: fresh.meetings().len(),
            contacts: fresh.contacts().len(),
            tasks: fresh.tasks().len(),
            communications: fresh.communications().len(),
            templates: fresh.templates().len(),
            sweep,
        };
        *store = fresh;
        tracing::debug!(org_id = %org_id, deals = report.deals, meetings = report.meetings, "workspace refreshed");
        Ok(report)
    }

    pub async fn create_deal(&self, payload: CreateDealPayload) -> AppResult<Deal> {
        let draft = validation::deal_draft(payload)?;
        let mut store = self.store.lock().await;
        let deal = self
            .backend
            .insert_deal(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_deal"))?;
        store.insert_deal(deal.clone());
        Ok(deal)
    }

    pub async fn move_deal(&self, deal_id: &str, target: DealStage) -> AppResult<StageMoveOutcome> {
        let mut store = self.store.lock().await;
        pipeline::move_deal(self.backend.as_ref(), &self.org_id, &mut store, deal_id, target, Utc::now()).await
    }

    /// Handles a card dropped on the board. The card moves immediately; it
    /// goes back to its old column if the backend refuses, otherwise the
    /// board is rebuilt from the store.
    pub async fn drop_card(
        &self,
        board: &mut PipelineBoard,
        deal_id: &str,
        target: DealStage,
    ) -> AppResult<StageMoveOutcome> {
        let ticket = board.apply_drag(deal_id, &target);
        match self.move_deal(deal_id, target).await {
            Ok(outcome) => {
                *board = self.pipeline_board().await;
                Ok(outcome)
            }
            Err(error) => {
                if let Some(ticket) = &ticket {
                    board.revert(ticket);
                }
                Err(error)
            }
        }
    }

    pub async fn stage_aggregates(&self) -> Vec<StageAggregate> {
        let store = self.store.lock().await;
        pipeline::aggregate_stages(store.deals(), &DealStage::PIPELINE)
    }

    pub async fn pipeline_summary(&self) -> PipelineSummary {
        let store = self.store.lock().await;
        PipelineSummary::from_deals(store.deals())
    }

    pub async fn pipeline_board(&self) -> PipelineBoard {
        let store = self.store.lock().await;
        PipelineBoard::from_deals(store.deals())
    }

    pub async fn schedule_meeting(&self, payload: ScheduleMeetingPayload) -> AppResult<Meeting> {
        let mut store = self.store.lock().await;
        let draft = meetings::meeting_draft(payload, &self.config.meetings, store.meetings(), Utc::now())?;
        let meeting = self
            .backend
            .insert_meeting(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_meeting"))?;
        tracing::info!(meeting_id = %meeting.id, start = %meeting.start, "meeting scheduled");
        store.insert_meeting(meeting.clone());
        Ok(meeting)
    }

    pub async fn create_contact(&self, payload: CreateContactPayload) -> AppResult<Contact> {
        let draft = validation::contact_draft(payload)?;
        let mut store = self.store.lock().await;
        let contact = self
            .backend
            .insert_contact(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_contact"))?;
        store.insert_contact(contact.clone());
        Ok(contact)
    }

    pub async fn create_task(&self, payload: CreateTaskPayload) -> AppResult<Task> {
        let draft = validation::task_draft(payload)?;
        let mut store = self.store.lock().await;
        let task = self
            .backend
            .insert_task(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_task"))?;
        store.insert_task(task.clone());
        Ok(task)
    }

    pub async fn complete_task(&self, task_id: &str) -> AppResult<Task> {
        let mut store = self.store.lock().await;
        let Some(task) = store.tasks().iter().find(|task| task.id == task_id) else {
            return Err(AppError::NotFound(format!("task {task_id}")));
        };
        if task.status == TaskStatus::Completed {
            return Ok(task.clone());
        }
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            updated_at: Utc::now(),
        };
        let task = self
            .backend
            .update_task(&self.org_id, task_id, patch)
            .await
            .map_err(log_failure(&self.org_id, "update_task"))?;
        store.replace_task(task.clone());
        Ok(task)
    }

    pub async fn log_communication(&self, payload: LogCommunicationPayload) -> AppResult<Communication> {
        let draft = validation::communication_draft(payload, &self.user_id)?;
        let mut store = self.store.lock().await;
        let communication = self
            .backend
            .insert_communication(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_communication"))?;
        store.insert_communication(communication.clone());
        Ok(communication)
    }

    pub async fn communications(&self, filter: &CommunicationFilter) -> Vec<Communication> {
        let store = self.store.lock().await;
        communications::timeline(store.communications(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn create_template(&self, payload: CreateTemplatePayload) -> AppResult<Template> {
        let draft = validation::template_draft(payload)?;
        let mut store = self.store.lock().await;
        let template = self
            .backend
            .insert_template(&self.org_id, draft)
            .await
            .map_err(log_failure(&self.org_id, "insert_template"))?;
        store.insert_template(template.clone());
        Ok(template)
    }

    pub async fn render_template(&self, template_id: &str, contact_id: &str) -> AppResult<RenderedTemplate> {
        let store = self.store.lock().await;
        let template = store
            .templates()
            .iter()
            .find(|template| template.id == template_id)
            .ok_or_else(|| AppError::NotFound(format!("template {template_id}")))?;
        let contact = store
            .contacts()
            .iter()
            .find(|contact| contact.id == contact_id)
            .ok_or_else(|| AppError::NotFound(format!("contact {contact_id}")))?;
        Ok(templates::render_for_contact(template, contact))
    }

    pub async fn dashboard(&self) -> Dashboard {
        let store = self.store.lock().await;
        Dashboard::build(
            store.contacts(),
            store.deals(),
            store.tasks(),
            Utc::now().date_naive(),
            &self.config,
        )
    }

    pub async fn meeting_stats(&self) -> MeetingStats {
        let store = self.store.lock().await;
        MeetingStats::from_meetings(store.meetings(), Utc::now())
    }

    pub async fn contact_stats(&self) -> ContactStats {
        let store = self.store.lock().await;
        ContactStats::from_contacts(store.contacts(), Utc::now())
    }

    pub async fn task_stats(&self) -> TaskStats {
        let store = self.store.lock().await;
        TaskStats::from_tasks(store.tasks(), Utc::now().date_naive())
    }

    pub async fn deals(&self) -> Vec<Deal> {
        self.store.lock().await.deals().to_vec()
    }

    pub async fn meetings(&self) -> Vec<Meeting> {
        self.store.lock().await.meetings().to_vec()
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.store.lock().await.contacts().to_vec()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.store.lock().await.tasks().to_vec()
    }

    pub async fn templates(&self) -> Vec<Template> {
        self.store.lock().await.templates().to_vec()
    }
}

fn log_failure<'a>(org_id: &'a str, operation: &'static str) -> impl Fn(AppError) -> AppError + 'a {
    move |error| {
        tracing::warn!(org_id = %org_id, operation, error = %error, "backend call failed");
        error
    }
}
