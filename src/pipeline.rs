use crate::backend::Backend;
use crate::errors::AppResult;
use crate::models::{Deal, DealPatch, DealStage, StageAggregate, StageMoveOutcome};
use crate::store::CrmStore;
use crate::validation;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Count and value total per stage, in the order of `stages`.
///
/// Deals whose stage is not in `stages` are left out of every entry, and so
/// is any stage in `stages` that is itself unrecognized.
pub fn aggregate_stages(deals: &[Deal], stages: &[DealStage]) -> Vec<StageAggregate> {
    stages.iter().map(|stage| aggregate_stage(deals, stage)).collect()
}

pub fn aggregate_stage(deals: &[Deal], stage: &DealStage) -> StageAggregate {
    let mut aggregate = StageAggregate {
        stage: stage.clone(),
        count: 0,
        total: Decimal::ZERO,
    };
    if !stage.is_recognized() {
        return aggregate;
    }
    for deal in deals.iter().filter(|deal| &deal.stage == stage) {
        aggregate.count += 1;
        aggregate.total += deal.value.amount_or_zero();
    }
    aggregate
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub open_count: usize,
    pub open_value: Decimal,
    pub won_count: usize,
    pub won_value: Decimal,
    /// Percentage of recognized deals that are won, one decimal place.
    pub win_rate: Option<Decimal>,
}

impl PipelineSummary {
    pub fn from_deals(deals: &[Deal]) -> Self {
        let mut summary = Self {
            open_count: 0,
            open_value: Decimal::ZERO,
            won_count: 0,
            won_value: Decimal::ZERO,
            win_rate: None,
        };
        for aggregate in aggregate_stages(deals, &DealStage::PIPELINE) {
            if aggregate.stage.is_terminal() {
                summary.won_count += aggregate.count;
                summary.won_value += aggregate.total;
            } else {
                summary.open_count += aggregate.count;
                summary.open_value += aggregate.total;
            }
        }
        let recognized = summary.open_count + summary.won_count;
        if recognized > 0 {
            let rate = Decimal::from(summary.won_count) * Decimal::ONE_HUNDRED / Decimal::from(recognized);
            summary.win_rate = Some(rate.round_dp(1));
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: DealStage,
    pub deal_ids: Vec<String>,
}

/// Receipt for a card move on the board, used to put the card back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragTicket {
    pub deal_id: String,
    pub from: DealStage,
    pub from_index: usize,
    pub to: DealStage,
}

impl DragTicket {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Kanban view of the pipeline. Cards move here first when dragged and are
/// put back if the backend refuses the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineBoard {
    pub columns: Vec<BoardColumn>,
}

impl PipelineBoard {
    pub fn from_deals(deals: &[Deal]) -> Self {
        let columns = DealStage::PIPELINE
            .iter()
            .map(|stage| BoardColumn {
                stage: stage.clone(),
                deal_ids: deals
                    .iter()
                    .filter(|deal| &deal.stage == stage)
                    .map(|deal| deal.id.clone())
                    .collect(),
            })
            .collect();
        Self { columns }
    }

    pub fn column(&self, stage: &DealStage) -> Option<&BoardColumn> {
        self.columns.iter().find(|column| &column.stage == stage)
    }

    pub fn stage_of(&self, deal_id: &str) -> Option<&DealStage> {
        self.columns
            .iter()
            .find(|column| column.deal_ids.iter().any(|id| id == deal_id))
            .map(|column| &column.stage)
    }

    /// Moves a card to the end of the target column. Returns `None` when the
    /// card or the target column is not on the board.
    pub fn apply_drag(&mut self, deal_id: &str, to: &DealStage) -> Option<DragTicket> {
        let target = self.columns.iter().position(|column| &column.stage == to)?;
        let (source, from_index) = self.columns.iter().enumerate().find_map(|(index, column)| {
            column
                .deal_ids
                .iter()
                .position(|id| id == deal_id)
                .map(|position| (index, position))
        })?;

        let ticket = DragTicket {
            deal_id: deal_id.to_string(),
            from: self.columns[source].stage.clone(),
            from_index,
            to: to.clone(),
        };
        if source != target {
            let card = self.columns[source].deal_ids.remove(from_index);
            self.columns[target].deal_ids.push(card);
        }
        Some(ticket)
    }

    pub fn revert(&mut self, ticket: &DragTicket) {
        if ticket.is_noop() {
            return;
        }
        if let Some(column) = self.columns.iter_mut().find(|column| column.stage == ticket.to) {
            column.deal_ids.retain(|id| id != &ticket.deal_id);
        }
        if let Some(column) = self.columns.iter_mut().find(|column| column.stage == ticket.from) {
            let index = ticket.from_index.min(column.deal_ids.len());
            column.deal_ids.insert(index, ticket.deal_id.clone());
        }
    }
}

/// Moves one deal to `target` through the backend.
///
/// The store is patched with the record the backend returns; if the backend
/// call fails the store is left as it was and the error is returned.
pub async fn move_deal(
    backend: &dyn Backend,
    org_id: &str,
    store: &mut CrmStore,
    deal_id: &str,
    target: DealStage,
    now: DateTime<Utc>,
) -> AppResult<StageMoveOutcome> {
    validation::target_stage(&target)?;

    let Some(current) = store.deal(deal_id).map(|deal| deal.stage.clone()) else {
        tracing::warn!(deal_id = %deal_id, stage = %target, "stage move for unknown deal ignored");
        return Ok(StageMoveOutcome::Missing);
    };
    if current == target {
        return Ok(StageMoveOutcome::Unchanged);
    }

    let updated = backend
        .update_deal(org_id, deal_id, DealPatch::stage(target.clone(), now))
        .await
        .map_err(|error| {
            tracing::warn!(deal_id = %deal_id, from = %current, to = %target, error = %error, "failed to persist stage move");
            error
        })?;
    store.replace_deal(updated);

    tracing::info!(deal_id = %deal_id, from = %current, to = %target, "deal stage moved");
    if target.is_terminal() {
        Ok(StageMoveOutcome::Won { from: current })
    } else {
        Ok(StageMoveOutcome::Moved {
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::errors::AppError;
    use crate::models::DealValue;

    fn deal(id: &str, stage: &str, value: &str) -> Deal {
        let now = Utc::now();
        Deal {
            id: id.to_string(),
            org_id: "org_a".to_string(),
            title: format!("deal {id}"),
            contact: String::new(),
            value: DealValue::parse(value),
            stage: DealStage::parse(stage),
            notes: String::new(),
            close_date: None,
            expected_close_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded(deals: Vec<Deal>) -> (MemoryBackend, CrmStore) {
        let backend = MemoryBackend::new();
        for deal in &deals {
            backend.seed_deal(deal.clone()).expect("seed");
        }
        let mut store = CrmStore::new();
        store.load_deals(deals);
        (backend, store)
    }

    #[test]
    fn aggregates_two_deal_scenario() {
        let deals = vec![deal("1", "New", "1000"), deal("2", "Won", "500")];

        let new = aggregate_stage(&deals, &DealStage::New);
        assert_eq!((new.count, new.total), (1, Decimal::new(1000, 0)));
        let won = aggregate_stage(&deals, &DealStage::Won);
        assert_eq!((won.count, won.total), (1, Decimal::new(500, 0)));
        let proposal = aggregate_stage(&deals, &DealStage::Proposal);
        assert_eq!((proposal.count, proposal.total), (0, Decimal::ZERO));
    }

    #[test]
    fn unrecognized_stages_are_excluded_from_aggregates() {
        let deals = vec![
            deal("1", "New", "100"),
            deal("2", "Negotiation", "900"),
            deal("3", "Lost", "50"),
            deal("4", "Won", "10"),
        ];
        let aggregates = aggregate_stages(&deals, &DealStage::PIPELINE);
        let counted: usize = aggregates.iter().map(|aggregate| aggregate.count).sum();
        let recognized = deals.iter().filter(|deal| deal.stage.is_recognized()).count();
        assert_eq!(counted, recognized);
        assert_eq!(counted, 2);

        let total: Decimal = aggregates.iter().map(|aggregate| aggregate.total).sum();
        assert_eq!(total, Decimal::new(110, 0));

        let foreign = aggregate_stage(&deals, &DealStage::parse("Negotiation"));
        assert_eq!(foreign.count, 0);
    }

    #[test]
    fn stage_names_match_exactly() {
        let deals = vec![deal("1", "won", "500"), deal("2", " NEW ", "300"), deal("3", "Won", "20")];
        let aggregates = aggregate_stages(&deals, &DealStage::PIPELINE);
        let counted: usize = aggregates.iter().map(|aggregate| aggregate.count).sum();
        assert_eq!(counted, 1);
        let won = aggregate_stage(&deals, &DealStage::Won);
        assert_eq!((won.count, won.total), (1, Decimal::new(20, 0)));
    }

    #[test]
    fn unparseable_values_contribute_zero() {
        let deals = vec![deal("1", "Proposal", "abc"), deal("2", "Proposal", ""), deal("3", "Proposal", "75.5")];
        let aggregate = aggregate_stage(&deals, &DealStage::Proposal);
        assert_eq!(aggregate.count, 3);
        assert_eq!(aggregate.total, Decimal::new(755, 1));
    }

    #[test]
    fn summary_splits_open_and_won() {
        let deals = vec![
            deal("1", "New", "1000"),
            deal("2", "Won", "500"),
            deal("3", "Proposal", "250"),
            deal("4", "Stalled", "999"),
        ];
        let summary = PipelineSummary::from_deals(&deals);
        assert_eq!(summary.open_count, 2);
        assert_eq!(summary.open_value, Decimal::new(1250, 0));
        assert_eq!(summary.won_count, 1);
        assert_eq!(summary.won_value, Decimal::new(500, 0));
        assert_eq!(summary.win_rate, Some(Decimal::new(333, 1)));
        assert_eq!(PipelineSummary::from_deals(&[]).win_rate, None);
    }

    #[test]
    fn board_drag_and_revert_restore_position() {
        let deals = vec![deal("1", "New", "1"), deal("2", "New", "1"), deal("3", "Proposal", "1")];
        let mut board = PipelineBoard::from_deals(&deals);
        let before = board.clone();

        let ticket = board.apply_drag("1", &DealStage::Proposal).expect("card on board");
        assert_eq!(ticket.from, DealStage::New);
        assert_eq!(ticket.from_index, 0);
        assert_eq!(board.stage_of("1"), Some(&DealStage::Proposal));
        assert_eq!(
            board.column(&DealStage::Proposal).map(|column| column.deal_ids.clone()),
            Some(vec!["3".to_string(), "1".to_string()])
        );

        board.revert(&ticket);
        assert_eq!(board, before);
        assert!(board.apply_drag("missing", &DealStage::Won).is_none());
        assert!(board.apply_drag("1", &DealStage::parse("Lost")).is_none());
    }

    #[tokio::test]
    async fn move_to_same_stage_makes_no_backend_call() {
        let (backend, mut store) = seeded(vec![deal("1", "Contacted", "100")]);
        let before = store.deals().to_vec();

        let outcome = move_deal(&backend, "org_a", &mut store, "1", DealStage::Contacted, Utc::now())
            .await
            .expect("move");
        assert_eq!(outcome, StageMoveOutcome::Unchanged);
        assert_eq!(backend.calls().writes, 0);
        assert_eq!(backend.calls().reads, 0);
        assert_eq!(store.deals(), before.as_slice());
    }

    #[tokio::test]
    async fn move_to_won_is_reported_separately() {
        let (backend, mut store) = seeded(vec![deal("1", "Proposal", "100"), deal("2", "New", "5")]);

        let outcome = move_deal(&backend, "org_a", &mut store, "2", DealStage::Contacted, Utc::now())
            .await
            .expect("move");
        assert_eq!(
            outcome,
            StageMoveOutcome::Moved {
                from: DealStage::New,
                to: DealStage::Contacted
            }
        );

        let outcome = move_deal(&backend, "org_a", &mut store, "1", DealStage::Won, Utc::now())
            .await
            .expect("move");
        assert!(outcome.reached_won());
        assert_eq!(store.deal("1").map(|deal| deal.stage.clone()), Some(DealStage::Won));
        assert_eq!(backend.deal("1").expect("lookup").map(|deal| deal.stage), Some(DealStage::Won));
        assert_eq!(aggregate_stage(store.deals(), &DealStage::Won).count, 1);
    }

    #[tokio::test]
    async fn failed_move_leaves_store_untouched() {
        let (backend, mut store) = seeded(vec![deal("1", "New", "100")]);
        backend.set_fail_writes(true);

        let error = move_deal(&backend, "org_a", &mut store, "1", DealStage::Proposal, Utc::now())
            .await
            .expect_err("backend down");
        assert!(matches!(error, AppError::Persistence(_)));
        assert_eq!(store.deal("1").map(|deal| deal.stage.clone()), Some(DealStage::New));
    }

    #[tokio::test]
    async fn missing_deal_and_unknown_stage_skip_the_backend() {
        let (backend, mut store) = seeded(vec![deal("1", "New", "100")]);

        let outcome = move_deal(&backend, "org_a", &mut store, "gone", DealStage::Won, Utc::now())
            .await
            .expect("missing is not an error");
        assert_eq!(outcome, StageMoveOutcome::Missing);

        let error = move_deal(&backend, "org_a", &mut store, "1", DealStage::parse("Lost"), Utc::now())
            .await
            .expect_err("unknown stage");
        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(backend.calls().writes, 0);
    }
}
