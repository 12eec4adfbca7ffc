use crate::models::{Communication, Contact, Deal, DealPatch, Meeting, Task, Template};

/// In-memory snapshot of one organization's records.
///
/// Collections are kept newest first, matching the order the backend lists
/// them in. Nothing here talks to the backend; callers mutate the store only
/// after a write has been confirmed.
#[derive(Debug, Clone, Default)]
pub struct CrmStore {
    deals: Vec<Deal>,
    meetings: Vec<Meeting>,
    contacts: Vec<Contact>,
    tasks: Vec<Task>,
    communications: Vec<Communication>,
    templates: Vec<Template>,
}

impl CrmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn deal(&self, deal_id: &str) -> Option<&Deal> {
        self.deals.iter().find(|deal| deal.id == deal_id)
    }

    pub fn meetings(&self) -> &[Meeting] {
        &self.meetings
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn communications(&self) -> &[Communication] {
        &self.communications
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn load_deals(&mut self, deals: Vec<Deal>) {
        self.deals = deals;
    }

    pub fn load_meetings(&mut self, meetings: Vec<Meeting>) {
        self.meetings = meetings;
    }

    pub fn load_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
    }

    pub fn load_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn load_communications(&mut self, communications: Vec<Communication>) {
        self.communications = communications;
    }

    pub fn load_templates(&mut self, templates: Vec<Template>) {
        self.templates = templates;
    }

    pub fn insert_deal(&mut self, deal: Deal) {
        self.deals.insert(0, deal);
    }

    pub fn insert_meeting(&mut self, meeting: Meeting) {
        self.meetings.insert(0, meeting);
    }

    pub fn insert_contact(&mut self, contact: Contact) {
        self.contacts.insert(0, contact);
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    pub fn insert_communication(&mut self, communication: Communication) {
        self.communications.insert(0, communication);
    }

    pub fn insert_template(&mut self, template: Template) {
        self.templates.insert(0, template);
    }

    /// Replaces the stored deal with the confirmed record. Returns false when
    /// the id is not in the store.
    pub fn replace_deal(&mut self, deal: Deal) -> bool {
        match self.deals.iter_mut().find(|existing| existing.id == deal.id) {
            Some(existing) => {
                *existing = deal;
                true
            }
            None => false,
        }
    }

    /// Applies a confirmed patch to every listed deal. Returns how many matched.
    pub fn patch_deals(&mut self, deal_ids: &[String], patch: &DealPatch) -> usize {
        let mut patched = 0;
        for deal in self.deals.iter_mut().filter(|deal| deal_ids.contains(&deal.id)) {
            patch.apply_to(deal);
            patched += 1;
        }
        patched
    }

    pub fn replace_task(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CrmStore;
    use crate::models::{Deal, DealPatch, DealStage, DealValue};
    use chrono::Utc;

    fn deal(id: &str, stage: DealStage) -> Deal {
        let now = Utc::now();
        Deal {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            title: format!("deal {id}"),
            contact: String::new(),
            value: DealValue::parse("100"),
            stage,
            notes: String::new(),
            close_date: None,
            expected_close_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_prepends_and_load_replaces() {
        let mut store = CrmStore::new();
        store.load_deals(vec![deal("1", DealStage::New)]);
        store.insert_deal(deal("2", DealStage::New));
        let ids = store.deals().iter().map(|deal| deal.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["2", "1"]);

        store.load_deals(vec![deal("3", DealStage::Won)]);
        assert_eq!(store.deals().len(), 1);
        assert!(store.deal("1").is_none());
    }

    #[test]
    fn replace_deal_ignores_unknown_ids() {
        let mut store = CrmStore::new();
        store.load_deals(vec![deal("1", DealStage::New)]);
        assert!(store.replace_deal(deal("1", DealStage::Contacted)));
        assert!(!store.replace_deal(deal("9", DealStage::Won)));
        assert_eq!(store.deal("1").map(|deal| deal.stage.clone()), Some(DealStage::Contacted));
        assert_eq!(store.deals().len(), 1);
    }

    #[test]
    fn patch_deals_touches_listed_ids() {
        let mut store = CrmStore::new();
        store.load_deals(vec![deal("1", DealStage::New), deal("2", DealStage::Proposal)]);
        let patched = store.patch_deals(&["2".to_string()], &DealPatch::stage(DealStage::Won, Utc::now()));
        assert_eq!(patched, 1);
        assert_eq!(store.deal("1").map(|deal| deal.stage.clone()), Some(DealStage::New));
        assert_eq!(store.deal("2").map(|deal| deal.stage.clone()), Some(DealStage::Won));
    }
}
