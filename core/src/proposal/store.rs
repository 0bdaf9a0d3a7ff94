use super::model::{LineItem, Proposal};
use crate::error::CoreResult;
use crate::repository::{ListQuery, RecordRepository, SortDir};
use serde_json::json;

pub const PROPOSALS_RESOURCE: &str = "proposals";
pub const LINE_ITEMS_RESOURCE: &str = "proposal_line_items";

pub fn fetch_proposal(repo: &dyn RecordRepository, id: &str) -> CoreResult<Proposal> {
    let record = repo.get_one(PROPOSALS_RESOURCE, id)?;
    Ok(serde_json::from_value(record)?)
}

/// All line items of one proposal, in persisted `sort_order`. The order
/// here is a convenience for editors; aggregation re-sorts per section.
pub fn fetch_line_items(repo: &dyn RecordRepository, proposal_id: &str) -> CoreResult<Vec<LineItem>> {
    let page = repo.list(
        LINE_ITEMS_RESOURCE,
        &ListQuery::filtered(json!({ "proposal_id": proposal_id }))
            .sorted_by("sort_order", SortDir::Asc),
    )?;
    page.data
        .into_iter()
        .map(|v| Ok(serde_json::from_value(v)?))
        .collect()
}
