use crate::money::Money;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Closed set of line item kinds. Display attributes are an exhaustive
/// mapping so a new kind fails to compile until every match arm is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Labor,
    Material,
    Equipment,
    Disposal,
    Service,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Labor => "Labor",
            ItemKind::Material => "Material",
            ItemKind::Equipment => "Equipment",
            ItemKind::Disposal => "Disposal",
            ItemKind::Service => "Service",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
    Expired,
}

impl ProposalStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProposalStatus::Draft => "Draft",
            ProposalStatus::Sent => "Sent",
            ProposalStatus::Viewed => "Viewed",
            ProposalStatus::Accepted => "Accepted",
            ProposalStatus::Rejected => "Rejected",
            ProposalStatus::Expired => "Expired",
        }
    }
}

/// One priced entry within a proposal, owned by the repository.
///
/// `total_price` is a persisted cache of `quantity x unit_price`; every
/// consumer recomputes it via [`LineItem::line_total`] instead of trusting
/// the stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub proposal_id: String,
    pub section_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: ItemKind,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: Money,
    /// Internal-only. Never rendered into any client-facing output.
    #[serde(default)]
    pub unit_cost: Option<Money>,
    pub total_price: Money,
    pub visible_to_client: bool,
    pub optional: bool,
    pub selected_by_client: bool,
    pub sort_order: i32,
    pub section_sort_order: i32,
}

impl LineItem {
    /// Recomputed `quantity x unit_price`, half-up at the cent.
    pub fn line_total(&self) -> Money {
        self.unit_price.times_quantity(self.quantity)
    }

    /// Internal cost of the line, when a unit cost is recorded.
    pub fn line_cost(&self) -> Option<Money> {
        self.unit_cost.map(|c| c.times_quantity(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub status: ProposalStatus,
    /// Fraction in 0.0..=1.0; validated at computation time, not on load.
    pub tax_rate: f64,
    // Cached totals for list screens. Recomputed on every render.
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub total_amount: Money,
    #[serde(default)]
    pub deposit_amount: Money,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub pdf_generated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

/// Who the rendered document is addressed to. All fields optional; absent
/// values collapse the corresponding metadata line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub deal_name: Option<String>,
}
