//! The export pipeline: aggregate -> totals -> render -> upload, with
//! retention pruning after the fact. Each stage consumes the previous
//! stage's complete output; pure-computation failures surface before any
//! store or repository I/O begins.

use crate::error::{CoreError, CoreResult};
use crate::proposal::model::{LineItem, Proposal, Recipient};
use crate::proposal::sections::{group_into_sections, Audience};
use crate::proposal::store::PROPOSALS_RESOURCE;
use crate::proposal::totals::Totals;
use crate::render::document::{render_proposal, Branding};
use crate::repository::RecordRepository;
use crate::storage::artifacts::ArtifactBridge;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use ulid::Ulid;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Aggregated,
    Totaled,
    Rendered,
    Uploaded,
}

struct ExportRun {
    stage: Option<ExportStage>,
}

impl ExportRun {
    fn new() -> Self {
        ExportRun { stage: None }
    }

    fn advance(&mut self, next: ExportStage) -> CoreResult<()> {
        let allowed = matches!(
            (self.stage, next),
            (None, ExportStage::Aggregated)
                | (Some(ExportStage::Aggregated), ExportStage::Totaled)
                | (Some(ExportStage::Totaled), ExportStage::Rendered)
                | (Some(ExportStage::Rendered), ExportStage::Uploaded)
        );
        if !allowed {
            return Err(CoreError::StageTransition(format!(
                "{:?} -> {:?}",
                self.stage, next
            )));
        }
        self.stage = Some(next);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub export_id: String,
    pub stage: ExportStage,
    pub artifact_path: String,
    pub access_url: Url,
    pub totals: Totals,
    pub page_count: usize,
    pub generated_at: OffsetDateTime,
    /// Artifacts removed by retention pruning.
    pub pruned: usize,
    /// A prune failure is reported here instead of failing the export;
    /// the uploaded artifact stands either way.
    pub prune_error: Option<String>,
}

/// Run one full export against an immutable snapshot of the proposal and
/// its items.
///
/// `keep_latest` bounds how many artifacts survive pruning afterwards.
/// `generated_at` is threaded through to the renderer and the artifact
/// path so the caller controls every timestamp in the output.
pub fn export_proposal(
    proposal: &Proposal,
    items: &[LineItem],
    recipient: &Recipient,
    branding: &Branding,
    bridge: &ArtifactBridge<'_>,
    keep_latest: usize,
    generated_at: OffsetDateTime,
) -> CoreResult<ExportOutcome> {
    let export_id = Ulid::new().to_string();
    let mut run = ExportRun::new();
    tracing::info!(export_id = %export_id, proposal_id = %proposal.id, "proposal export started");

    let sections = group_into_sections(items, Audience::Client);
    run.advance(ExportStage::Aggregated)?;

    // Renders and totals share one computation; both validation failures
    // (tax rate, missing title) fire here, before any I/O.
    let document = render_proposal(proposal, &sections, recipient, branding, generated_at)?;
    run.advance(ExportStage::Totaled)?;
    run.advance(ExportStage::Rendered)?;

    let artifact_path = bridge.upload(&proposal.id, &document.bytes, generated_at)?;
    run.advance(ExportStage::Uploaded)?;

    let access_url = bridge.access_url(&artifact_path, None)?;

    let (pruned, prune_error) = match bridge.prune(&proposal.id, keep_latest) {
        Ok(p) => (p.deleted.len(), None),
        Err(e) => {
            tracing::warn!(
                export_id = %export_id,
                proposal_id = %proposal.id,
                error = %e,
                "artifact pruning failed after successful upload"
            );
            (0, Some(e.to_string()))
        }
    };

    tracing::info!(
        export_id = %export_id,
        proposal_id = %proposal.id,
        pages = document.page_count,
        total = %document.totals.total_amount,
        "proposal export complete"
    );
    Ok(ExportOutcome {
        export_id,
        stage: ExportStage::Uploaded,
        artifact_path,
        access_url,
        totals: document.totals,
        page_count: document.page_count,
        generated_at,
        pruned,
        prune_error,
    })
}

/// Persist export bookkeeping onto the proposal record.
///
/// Called only after `export_proposal` returned successfully, so the
/// record never points at an artifact that failed to upload. The cached
/// totals are refreshed from the same computation the document used.
pub fn record_export(
    repo: &dyn RecordRepository,
    proposal_id: &str,
    outcome: &ExportOutcome,
) -> CoreResult<()> {
    let generated_at = outcome
        .generated_at
        .format(&Rfc3339)
        .map_err(|e| CoreError::InvalidInput(format!("bad export timestamp: {}", e)))?;
    repo.update(
        PROPOSALS_RESOURCE,
        proposal_id,
        json!({
            "pdf_path": outcome.artifact_path,
            "pdf_generated_at": generated_at,
            "subtotal": outcome.totals.subtotal,
            "tax_amount": outcome.totals.tax_amount,
            "total_amount": outcome.totals.total_amount,
        }),
    )?;
    Ok(())
}
