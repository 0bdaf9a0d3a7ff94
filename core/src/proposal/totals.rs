use super::sections::Section;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

/// Compute proposal totals from aggregated sections and a tax rate.
///
/// The subtotal is rebuilt from each selected item's quantity and unit
/// price; the persisted `total_price` cache is never consulted, so a stale
/// cache cannot drift into a rendered document. Rejects the tax rate before
/// touching any amounts.
pub fn compute_totals(sections: &[Section], tax_rate: f64) -> CoreResult<Totals> {
    if !tax_rate.is_finite() || !(0.0..=1.0).contains(&tax_rate) {
        return Err(CoreError::InvalidTaxRate(tax_rate));
    }

    let subtotal: Money = sections
        .iter()
        .flat_map(|s| s.items.iter())
        .filter(|i| i.selected_by_client)
        .map(|i| i.line_total())
        .sum();
    let tax_amount = subtotal.apply_rate(tax_rate);

    Ok(Totals {
        subtotal,
        tax_amount,
        total_amount: subtotal + tax_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::model::{ItemKind, LineItem};
    use crate::proposal::sections::{group_into_sections, Audience};

    fn item(section: &str, cents: i64, quantity: f64, selected: bool) -> LineItem {
        LineItem {
            id: format!("li_{}_{}", section, cents),
            proposal_id: "p_1".to_string(),
            section_name: section.to_string(),
            name: format!("{} work", section),
            description: None,
            kind: ItemKind::Labor,
            quantity,
            unit: "each".to_string(),
            unit_price: Money::from_cents(cents),
            unit_cost: None,
            total_price: Money::ZERO,
            visible_to_client: true,
            optional: !selected,
            selected_by_client: selected,
            sort_order: 0,
            section_sort_order: 0,
        }
    }

    #[test]
    fn test_scenario_install_and_maintenance() {
        let items = vec![
            item("Install", 10000, 2.0, true),
            item("Maintenance", 5000, 1.0, false),
        ];
        let sections = group_into_sections(&items, Audience::Client);
        let totals = compute_totals(&sections, 0.08).unwrap();
        assert_eq!(totals.subtotal.cents(), 20000);
        assert_eq!(totals.tax_amount.cents(), 1600);
        assert_eq!(totals.total_amount.cents(), 21600);
    }

    #[test]
    fn test_tax_rounding_half_up() {
        let sections = group_into_sections(&[item("A", 3333, 1.0, true)], Audience::Client);
        let totals = compute_totals(&sections, 0.0825).unwrap();
        // 33.33 * 0.0825 = 2.749725 -> 2.75
        assert_eq!(totals.tax_amount.cents(), 275);

        let sections = group_into_sections(&[item("A", 10000, 1.0, true)], Audience::Client);
        let totals = compute_totals(&sections, 0.0825).unwrap();
        assert_eq!(totals.tax_amount.cents(), 825);
        assert_eq!(totals.total_amount.cents(), 10825);
    }

    #[test]
    fn test_subtotal_matches_section_totals() {
        let items = vec![
            item("A", 1999, 3.0, true),
            item("A", 500, 1.0, false),
            item("B", 12345, 0.5, true),
        ];
        let sections = group_into_sections(&items, Audience::Client);
        let totals = compute_totals(&sections, 0.0).unwrap();
        let section_sum: Money = sections.iter().map(|s| s.total).sum();
        assert_eq!(totals.subtotal, section_sum);
    }

    #[test]
    fn test_selection_toggle_changes_subtotal_by_exact_amount() {
        let mut optional = item("A", 50000, 1.0, false);
        optional.optional = true;

        let base = compute_totals(
            &group_into_sections(std::slice::from_ref(&optional), Audience::Client),
            0.0,
        )
        .unwrap();
        assert_eq!(base.subtotal, Money::ZERO);

        optional.selected_by_client = true;
        let toggled = compute_totals(
            &group_into_sections(&[optional], Audience::Client),
            0.0,
        )
        .unwrap();
        assert_eq!((toggled.subtotal - base.subtotal).cents(), 50000);
    }

    #[test]
    fn test_invalid_tax_rate_rejected_before_computation() {
        let sections = group_into_sections(&[item("A", 100, 1.0, true)], Audience::Client);
        assert!(matches!(
            compute_totals(&sections, 1.5),
            Err(CoreError::InvalidTaxRate(_))
        ));
        assert!(matches!(
            compute_totals(&sections, -0.01),
            Err(CoreError::InvalidTaxRate(_))
        ));
        assert!(matches!(
            compute_totals(&sections, f64::NAN),
            Err(CoreError::InvalidTaxRate(_))
        ));
    }

    #[test]
    fn test_empty_sections_total_zero() {
        let totals = compute_totals(&[], 0.1).unwrap();
        assert_eq!(totals.subtotal, Money::ZERO);
        assert_eq!(totals.total_amount, Money::ZERO);
    }
}
