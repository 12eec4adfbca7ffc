use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline stage of a deal.
///
/// Records written by other clients may carry a stage outside the fixed
/// pipeline; those load as `Unrecognized` and are left out of every aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DealStage {
    #[default]
    New,
    Contacted,
    Proposal,
    Won,
    Unrecognized(String),
}

impl DealStage {
    pub const PIPELINE: [DealStage; 4] = [
        DealStage::New,
        DealStage::Contacted,
        DealStage::Proposal,
        DealStage::Won,
    ];

    /// Exact, case-sensitive match against the pipeline names.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "New" => Self::New,
            "Contacted" => Self::Contacted,
            "Proposal" => Self::Proposal,
            "Won" => Self::Won,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Proposal => "Proposal",
            Self::Won => "Won",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DealStage {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<DealStage> for String {
    fn from(value: DealStage) -> Self {
        value.as_str().to_string()
    }
}

/// Monetary value of a deal as entered, plus its parsed amount.
///
/// Blank, unparseable or negative text has no amount and counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DealValue {
    raw: String,
    amount: Option<Decimal>,
}

impl DealValue {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let amount = Decimal::from_str(raw.trim())
            .ok()
            .filter(|amount| !amount.is_sign_negative());
        Self { raw, amount }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn amount_or_zero(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

impl From<String> for DealValue {
    fn from(value: String) -> Self {
        Self::parse(value)
    }
}

impl From<DealValue> for String {
    fn from(value: DealValue) -> Self {
        value.raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub org_id: String,
    pub title: String,
    pub contact: String,
    pub value: DealValue,
    pub stage: DealStage,
    pub notes: String,
    pub close_date: Option<NaiveDate>,
    pub expected_close_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealPayload {
    pub title: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub value: String,
    pub stage: Option<DealStage>,
    #[serde(default)]
    pub notes: String,
    pub close_date: Option<NaiveDate>,
    pub expected_close_date: Option<NaiveDate>,
}

/// Validated deal ready to be inserted by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DealDraft {
    pub title: String,
    pub contact: String,
    pub value: DealValue,
    pub stage: DealStage,
    pub notes: String,
    pub close_date: Option<NaiveDate>,
    pub expected_close_date: Option<NaiveDate>,
}

/// Partial update of a deal. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DealPatch {
    pub title: Option<String>,
    pub contact: Option<String>,
    pub value: Option<DealValue>,
    pub stage: Option<DealStage>,
    pub notes: Option<String>,
    pub close_date: Option<Option<NaiveDate>>,
    pub expected_close_date: Option<Option<NaiveDate>>,
    pub updated_at: DateTime<Utc>,
}

impl DealPatch {
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            contact: None,
            value: None,
            stage: None,
            notes: None,
            close_date: None,
            expected_close_date: None,
            updated_at,
        }
    }

    pub fn stage(stage: DealStage, updated_at: DateTime<Utc>) -> Self {
        Self {
            stage: Some(stage),
            ..Self::touch(updated_at)
        }
    }

    pub fn apply_to(&self, deal: &mut Deal) {
        if let Some(title) = &self.title {
            deal.title = title.clone();
        }
        if let Some(contact) = &self.contact {
            deal.contact = contact.clone();
        }
        if let Some(value) = &self.value {
            deal.value = value.clone();
        }
        if let Some(stage) = &self.stage {
            deal.stage = stage.clone();
        }
        if let Some(notes) = &self.notes {
            deal.notes = notes.clone();
        }
        if let Some(close_date) = self.close_date {
            deal.close_date = close_date;
        }
        if let Some(expected_close_date) = self.expected_close_date {
            deal.expected_close_date = expected_close_date;
        }
        deal.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAggregate {
    pub stage: DealStage,
    pub count: usize,
    pub total: Decimal,
}

/// What a stage transition request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageMoveOutcome {
    Unchanged,
    Missing,
    Moved { from: DealStage, to: DealStage },
    Won { from: DealStage },
}

impl StageMoveOutcome {
    pub fn reached_won(&self) -> bool {
        matches!(self, Self::Won { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub org_id: String,
    pub title: String,
    pub contact_id: String,
    pub contact_name: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: MeetingStatus,
    pub join_link: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Saturates at the latest representable instant.
    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(Duration::minutes(i64::from(self.duration_minutes)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMeetingPayload {
    pub title: String,
    pub contact_id: String,
    #[serde(default)]
    pub contact_name: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingDraft {
    pub title: String,
    pub contact_id: String,
    pub contact_name: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: MeetingStatus,
    pub join_link: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactStatus {
    #[default]
    Active,
    Inactive,
    Customer,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Customer => "Customer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if self.company.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.company)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactPayload {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    /// Comma separated, as typed into the form.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub notes: String,
    pub status: Option<ContactStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub org_id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub contact: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub contact: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationKind {
    Call,
    Email,
    Meeting,
    Note,
}

impl CommunicationKind {
    pub const ALL: [CommunicationKind; 4] = [Self::Call, Self::Email, Self::Meeting, Self::Note];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Meeting => "meeting",
            Self::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: String,
    pub org_id: String,
    pub contact_id: String,
    pub kind: CommunicationKind,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
    pub notes: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCommunicationPayload {
    pub contact_id: String,
    pub kind: CommunicationKind,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunicationDraft {
    pub contact_id: String,
    pub kind: CommunicationKind,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
    pub notes: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemplateCategory {
    #[default]
    General,
    Introduction,
    #[serde(rename = "Follow-up")]
    FollowUp,
    Proposal,
    Closing,
}

impl TemplateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Introduction => "Introduction",
            Self::FollowUp => "Follow-up",
            Self::Proposal => "Proposal",
            Self::Closing => "Closing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub category: TemplateCategory,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplatePayload {
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub body: String,
    pub category: Option<TemplateCategory>,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub category: TemplateCategory,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{DealStage, DealValue};
    use rust_decimal::Decimal;

    #[test]
    fn stage_parse_keeps_unknown_values() {
        assert_eq!(DealStage::parse("Won"), DealStage::Won);
        for raw in [" proposal ", "won", " NEW ", "Won "] {
            assert_eq!(DealStage::parse(raw), DealStage::Unrecognized(raw.to_string()));
        }
        let stage = DealStage::parse("Negotiation");
        assert_eq!(stage, DealStage::Unrecognized("Negotiation".to_string()));
        assert_eq!(stage.as_str(), "Negotiation");
        assert!(!stage.is_recognized());
    }

    #[test]
    fn stage_serializes_as_plain_text() {
        let json = serde_json::to_string(&DealStage::Contacted).expect("serialize");
        assert_eq!(json, "\"Contacted\"");
        let parsed: DealStage = serde_json::from_str("\"Lost\"").expect("deserialize");
        assert_eq!(parsed, DealStage::Unrecognized("Lost".to_string()));
    }

    #[test]
    fn value_parse_policy() {
        assert_eq!(DealValue::parse("1000").amount(), Some(Decimal::new(1000, 0)));
        assert_eq!(DealValue::parse(" 12.50 ").amount(), Some(Decimal::new(1250, 2)));
        assert_eq!(DealValue::parse("abc").amount(), None);
        assert_eq!(DealValue::parse("-5").amount(), None);
        assert_eq!(DealValue::parse("").amount_or_zero(), Decimal::ZERO);
        assert!(DealValue::parse("  ").is_blank());
        assert_eq!(DealValue::parse("abc").raw(), "abc");
    }
}
