//! Internal pricing report. This is the one place unit costs are allowed
//! to surface, and its output is for staff screens only; it shares no
//! emission path with the client document renderer.

use crate::error::CoreResult;
use crate::money::Money;
use crate::proposal::model::Proposal;
use crate::proposal::sections::Section;

/// CSV over the internal (unfiltered) aggregation: one row per line item
/// with price, cost, and margin columns, then a totals row. Rows follow
/// aggregation order so repeated exports diff cleanly.
pub fn render_internal_pricing_csv(proposal: &Proposal, sections: &[Section]) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record([
        "section",
        "item",
        "kind",
        "quantity",
        "unit",
        "unit_price",
        "unit_cost",
        "line_price",
        "line_cost",
        "margin",
        "selected",
    ])?;

    let mut total_price = Money::ZERO;
    let mut total_cost = Money::ZERO;
    for section in sections {
        for item in &section.items {
            let line_price = item.line_total();
            let line_cost = item.line_cost();
            if item.selected_by_client {
                total_price += line_price;
                total_cost += line_cost.unwrap_or(Money::ZERO);
            }
            wtr.write_record([
                section.name.clone(),
                item.name.clone(),
                item.kind.label().to_string(),
                format!("{}", item.quantity),
                item.unit.clone(),
                item.unit_price.to_decimal_string(),
                item.unit_cost
                    .map(|c| c.to_decimal_string())
                    .unwrap_or_default(),
                line_price.to_decimal_string(),
                line_cost.map(|c| c.to_decimal_string()).unwrap_or_default(),
                line_cost
                    .map(|c| (line_price - c).to_decimal_string())
                    .unwrap_or_default(),
                item.selected_by_client.to_string(),
            ])?;
        }
    }
    wtr.write_record([
        "TOTAL".to_string(),
        proposal.title.clone(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        total_price.to_decimal_string(),
        total_cost.to_decimal_string(),
        (total_price - total_cost).to_decimal_string(),
        String::new(),
    ])?;

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}
