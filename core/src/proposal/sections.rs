use super::model::LineItem;
use crate::money::Money;
use serde::Serialize;

/// Name given to items whose section is blank.
pub const DEFAULT_SECTION: &str = "General";

/// Which view of the proposal an aggregation feeds. Client output drops
/// items hidden from the client; the internal view keeps everything. The
/// two modes are separate call sites, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Client,
    Internal,
}

/// A named grouping of line items with an aggregate total. Derived on every
/// pass; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<LineItem>,
    /// Sum of recomputed line totals over client-selected items only.
    pub total: Money,
    /// Minimum `section_sort_order` among member items.
    pub sort_key: i32,
}

/// Group items into display sections.
///
/// Items sort by `sort_order` within a section (stable, so equal keys keep
/// input order). Sections sort by the minimum `section_sort_order` of their
/// items, ties broken by name. A section exists only through its items, so
/// zero input items produce an empty vec.
pub fn group_into_sections(items: &[LineItem], audience: Audience) -> Vec<Section> {
    let mut buckets: Vec<(String, Vec<LineItem>)> = Vec::new();

    for item in items {
        if audience == Audience::Client && !item.visible_to_client {
            continue;
        }
        let name = if item.section_name.trim().is_empty() {
            DEFAULT_SECTION.to_string()
        } else {
            item.section_name.clone()
        };
        match buckets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, bucket)) => bucket.push(item.clone()),
            None => buckets.push((name, vec![item.clone()])),
        }
    }

    let mut sections: Vec<Section> = buckets
        .into_iter()
        .map(|(name, mut bucket)| {
            bucket.sort_by_key(|i| i.sort_order);
            let sort_key = bucket
                .iter()
                .map(|i| i.section_sort_order)
                .min()
                .unwrap_or(0);
            let total = bucket
                .iter()
                .filter(|i| i.selected_by_client)
                .map(LineItem::line_total)
                .sum();
            Section {
                name,
                items: bucket,
                total,
                sort_key,
            }
        })
        .collect();

    sections.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then_with(|| a.name.cmp(&b.name)));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::model::{ItemKind, LineItem};

    fn item(section: &str, name: &str, sort: i32, section_sort: i32) -> LineItem {
        LineItem {
            id: format!("li_{}_{}", section, name),
            proposal_id: "p_1".to_string(),
            section_name: section.to_string(),
            name: name.to_string(),
            description: None,
            kind: ItemKind::Service,
            quantity: 1.0,
            unit: "each".to_string(),
            unit_price: Money::from_cents(5000),
            unit_cost: None,
            total_price: Money::from_cents(5000),
            visible_to_client: true,
            optional: false,
            selected_by_client: true,
            sort_order: sort,
            section_sort_order: section_sort,
        }
    }

    #[test]
    fn test_sections_ordered_by_min_sort_key_then_name() {
        let items = vec![
            item("B", "b1", 0, 2),
            item("A", "a1", 0, 1),
            item("A", "a2", 1, 1),
        ];
        let sections = group_into_sections(&items, Audience::Client);
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_tie_on_sort_key_breaks_by_name() {
        let items = vec![item("Cleanup", "c", 0, 5), item("Beds", "b", 0, 5)];
        let sections = group_into_sections(&items, Audience::Client);
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Beds", "Cleanup"]);
    }

    #[test]
    fn test_item_sort_is_stable_within_section() {
        let mut first = item("A", "first", 3, 0);
        first.id = "li_first".to_string();
        let mut second = item("A", "second", 3, 0);
        second.id = "li_second".to_string();
        let sections = group_into_sections(&[first, second], Audience::Client);
        assert_eq!(sections[0].items[0].name, "first");
        assert_eq!(sections[0].items[1].name, "second");
    }

    #[test]
    fn test_blank_section_maps_to_general() {
        let items = vec![item("", "loose", 0, 9), item("  ", "loose2", 1, 9)];
        let sections = group_into_sections(&items, Audience::Client);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, DEFAULT_SECTION);
        assert_eq!(sections[0].items.len(), 2);
    }

    #[test]
    fn test_client_audience_drops_hidden_items_internal_keeps_them() {
        let mut hidden = item("A", "hidden", 0, 0);
        hidden.visible_to_client = false;
        let items = vec![hidden, item("A", "shown", 1, 0)];

        let client = group_into_sections(&items, Audience::Client);
        assert_eq!(client[0].items.len(), 1);

        let internal = group_into_sections(&items, Audience::Internal);
        assert_eq!(internal[0].items.len(), 2);
    }

    #[test]
    fn test_hidden_but_selected_item_still_counts_toward_total() {
        let mut hidden = item("A", "hidden", 0, 0);
        hidden.visible_to_client = false;
        hidden.selected_by_client = true;
        let internal = group_into_sections(&[hidden], Audience::Internal);
        assert_eq!(internal[0].total.cents(), 5000);
    }

    #[test]
    fn test_unselected_item_contributes_zero() {
        let mut unselected = item("A", "maybe", 0, 0);
        unselected.optional = true;
        unselected.selected_by_client = false;
        let sections = group_into_sections(&[unselected], Audience::Client);
        assert_eq!(sections[0].total, Money::ZERO);
        assert_eq!(sections[0].items.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(group_into_sections(&[], Audience::Client).is_empty());
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let items = vec![
            item("B", "b1", 1, 2),
            item("A", "a1", 0, 1),
            item("", "g1", 0, 3),
        ];
        let once = group_into_sections(&items, Audience::Client);
        let twice = group_into_sections(&items, Audience::Client);
        assert_eq!(once, twice);
    }
}
