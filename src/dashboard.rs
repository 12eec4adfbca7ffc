use crate::config::CrmConfig;
use crate::currency::format_amount;
use crate::models::{Contact, Deal, Task, TaskStatus};
use crate::pipeline::PipelineSummary;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub pending: usize,
    pub completed: usize,
    pub due: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Pending => {
                    stats.pending += 1;
                    if is_due(task, today) {
                        stats.due += 1;
                    }
                }
            }
        }
        stats
    }
}

fn is_due(task: &Task, today: NaiveDate) -> bool {
    task.due_date.is_some_and(|due_date| due_date <= today)
}

/// Pending tasks ordered by due date, undated ones last, then by priority.
pub fn upcoming_tasks(tasks: &[Task], limit: usize) -> Vec<Task> {
    let mut pending = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Pending)
        .cloned()
        .collect::<Vec<_>>();
    pending.sort_by(|left, right| {
        let by_date = match (left.due_date, right.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_date.then_with(|| right.priority.cmp(&left.priority))
    });
    pending.truncate(limit);
    pending
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_contacts: usize,
    pub active_deals: usize,
    pub revenue_forecast: Decimal,
    pub revenue_forecast_display: String,
    pub won_revenue: Decimal,
    pub won_revenue_display: String,
    pub tasks_due: usize,
    pub recent_deals: Vec<Deal>,
    pub upcoming_tasks: Vec<Task>,
}

impl Dashboard {
    /// Builds the overview from store snapshots. Deals and tasks are expected
    /// newest first, the order the store keeps them in.
    pub fn build(contacts: &[Contact], deals: &[Deal], tasks: &[Task], today: NaiveDate, config: &CrmConfig) -> Self {
        let summary = PipelineSummary::from_deals(deals);
        let limit = config.dashboard.recent_limit;
        Self {
            total_contacts: contacts.len(),
            active_deals: summary.open_count,
            revenue_forecast: summary.open_value,
            revenue_forecast_display: format_amount(summary.open_value, &config.currency),
            won_revenue: summary.won_value,
            won_revenue_display: format_amount(summary.won_value, &config.currency),
            tasks_due: TaskStats::from_tasks(tasks, today).due,
            recent_deals: deals.iter().take(limit).cloned().collect(),
            upcoming_tasks: upcoming_tasks(tasks, limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DealStage, DealValue, TaskPriority};
    use chrono::Utc;

    fn task(id: &str, due: Option<u32>, priority: TaskPriority, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            title: format!("task {id}"),
            description: String::new(),
            due_date: due.and_then(|day| NaiveDate::from_ymd_opt(2024, 3, day)),
            priority,
            contact: String::new(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn deal(id: &str, stage: DealStage, value: &str) -> Deal {
        let now = Utc::now();
        Deal {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            title: format!("deal {id}"),
            contact: String::new(),
            value: DealValue::parse(value),
            stage,
            notes: String::new(),
            close_date: None,
            expected_close_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")
    }

    #[test]
    fn task_stats_count_due_pending_only() {
        let tasks = vec![
            task("1", Some(14), TaskPriority::High, TaskStatus::Pending),
            task("2", Some(15), TaskPriority::Low, TaskStatus::Pending),
            task("3", Some(16), TaskPriority::Low, TaskStatus::Pending),
            task("4", Some(1), TaskPriority::Low, TaskStatus::Completed),
            task("5", None, TaskPriority::Low, TaskStatus::Pending),
        ];
        assert_eq!(
            TaskStats::from_tasks(&tasks, today()),
            TaskStats {
                pending: 4,
                completed: 1,
                due: 2
            }
        );
    }

    #[test]
    fn upcoming_tasks_sort_by_date_then_priority() {
        let tasks = vec![
            task("undated", None, TaskPriority::High, TaskStatus::Pending),
            task("later", Some(20), TaskPriority::Low, TaskStatus::Pending),
            task("soon-low", Some(16), TaskPriority::Low, TaskStatus::Pending),
            task("soon-high", Some(16), TaskPriority::High, TaskStatus::Pending),
            task("done", Some(10), TaskPriority::High, TaskStatus::Completed),
        ];
        let ids = upcoming_tasks(&tasks, 3)
            .into_iter()
            .map(|task| task.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["soon-high", "soon-low", "later"]);
    }

    #[test]
    fn dashboard_totals_use_configured_currency() {
        let deals = vec![
            deal("3", DealStage::Proposal, "150000"),
            deal("2", DealStage::Won, "640000"),
            deal("1", DealStage::New, "100000"),
        ];
        let mut config = CrmConfig::default();
        config.dashboard.recent_limit = 2;

        let dashboard = Dashboard::build(&[], &deals, &[], today(), &config);
        assert_eq!(dashboard.active_deals, 2);
        assert_eq!(dashboard.revenue_forecast_display, "₹2,50,000");
        assert_eq!(dashboard.won_revenue_display, "₹6,40,000");
        assert_eq!(dashboard.recent_deals.len(), 2);
        assert_eq!(dashboard.recent_deals[0].id, "3");
        assert_eq!(dashboard.tasks_due, 0);
    }
}
