use crate::backend::Backend;
use crate::models::{Deal, DealPatch, DealStage};
use crate::store::CrmStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Ids of deals that are past their close date and not yet won.
pub fn plan_won_promotions(deals: &[Deal], today: NaiveDate) -> Vec<String> {
    deals
        .iter()
        .filter(|deal| !deal.stage.is_terminal())
        .filter(|deal| deal.close_date.is_some_and(|close_date| close_date <= today))
        .map(|deal| deal.id.clone())
        .collect()
}

/// The date the sweep compares close dates against.
pub fn sweep_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SweepReport {
    Idle,
    Promoted { deal_ids: Vec<String> },
    Failed { deal_ids: Vec<String>, error: String },
}

impl SweepReport {
    pub fn promoted(&self) -> usize {
        match self {
            Self::Promoted { deal_ids } => deal_ids.len(),
            _ => 0,
        }
    }
}

/// Promotes overdue deals to Won with one batch update.
///
/// The store is only touched after the backend accepts the batch. A failed
/// batch is logged and reported; it never aborts the surrounding refresh.
pub async fn run_won_promotion(
    backend: &dyn Backend,
    org_id: &str,
    store: &mut CrmStore,
    now: DateTime<Utc>,
) -> SweepReport {
    let deal_ids = plan_won_promotions(store.deals(), sweep_date(now));
    if deal_ids.is_empty() {
        return SweepReport::Idle;
    }

    match backend.update_deal_stages(org_id, &deal_ids, DealStage::Won, now).await {
        Ok(updated) => {
            if updated.len() != deal_ids.len() {
                tracing::warn!(
                    org_id = %org_id,
                    planned = deal_ids.len(),
                    updated = updated.len(),
                    "backend promoted fewer deals than planned"
                );
            }
            store.patch_deals(&updated, &DealPatch::stage(DealStage::Won, now));
            tracing::info!(org_id = %org_id, updated = updated.len(), "promoted overdue deals to won");
            SweepReport::Promoted { deal_ids: updated }
        }
        Err(error) => {
            tracing::warn!(org_id = %org_id, planned = deal_ids.len(), error = %error, "won promotion sweep failed");
            SweepReport::Failed {
                deal_ids,
                error: error.to_string(),
            }
        }
    }
}
