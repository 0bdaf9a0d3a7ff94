use evergreen_core::error::{CoreError, CoreResult};
use evergreen_core::money::Money;
use evergreen_core::proposal::model::{ItemKind, LineItem, Proposal, ProposalStatus, Recipient};
use evergreen_core::proposal::store::PROPOSALS_RESOURCE;
use evergreen_core::render::document::Branding;
use evergreen_core::repository::{MemoryRepository, RecordRepository};
use evergreen_core::storage::artifacts::{ArtifactBridge, DEFAULT_BUCKET};
use evergreen_core::storage::fs_store::FsObjectStore;
use evergreen_core::storage::object_store::{ObjectInfo, ObjectStore};
use evergreen_core::workflow::{export_proposal, record_export, ExportStage};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

fn proposal() -> Proposal {
    Proposal {
        id: "p_1".to_string(),
        title: "Front yard xeriscape".to_string(),
        status: ProposalStatus::Draft,
        tax_rate: 0.0825,
        subtotal: Money::ZERO,
        tax_amount: Money::ZERO,
        total_amount: Money::ZERO,
        deposit_amount: Money::ZERO,
        pdf_path: None,
        pdf_generated_at: None,
        expires_at: None,
    }
}

fn items() -> Vec<LineItem> {
    vec![LineItem {
        id: "li_1".to_string(),
        proposal_id: "p_1".to_string(),
        section_name: "Install".to_string(),
        name: "Decomposed granite paths".to_string(),
        description: None,
        kind: ItemKind::Material,
        quantity: 1.0,
        unit: "lot".to_string(),
        unit_price: Money::from_cents(33_33),
        unit_cost: Some(Money::from_cents(20_00)),
        total_price: Money::ZERO,
        visible_to_client: true,
        optional: false,
        selected_by_client: true,
        sort_order: 0,
        section_sort_order: 0,
    }]
}

fn stamp(minute: i64) -> OffsetDateTime {
    datetime!(2026-08-04 10:00:00 UTC) + Duration::minutes(minute)
}

#[test]
fn test_export_uploads_and_reports_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::create(dir.path()).unwrap();
    let bridge = ArtifactBridge::with_default_bucket(&store);

    let outcome = export_proposal(
        &proposal(),
        &items(),
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(0),
    )
    .unwrap();

    assert_eq!(outcome.stage, ExportStage::Uploaded);
    assert!(outcome.page_count >= 1);
    assert_eq!(outcome.totals.subtotal.cents(), 3333);
    assert_eq!(outcome.totals.tax_amount.cents(), 275);
    assert!(outcome.prune_error.is_none());
    assert_eq!(outcome.pruned, 0);

    let listed = store.list(DEFAULT_BUCKET, "proposals/p_1/").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, outcome.artifact_path);
    assert!(store.verify_signed_url(&outcome.access_url, OffsetDateTime::now_utc()));
}

#[test]
fn test_repeated_exports_respect_retention() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::create(dir.path()).unwrap();
    let bridge = ArtifactBridge::with_default_bucket(&store);

    for minute in 0..4 {
        export_proposal(
            &proposal(),
            &items(),
            &Recipient::default(),
            &Branding::default(),
            &bridge,
            2,
            stamp(minute),
        )
        .unwrap();
    }
    let listed = store.list(DEFAULT_BUCKET, "proposals/p_1/").unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn test_validation_failure_precedes_any_upload() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::create(dir.path()).unwrap();
    let bridge = ArtifactBridge::with_default_bucket(&store);

    let mut bad = proposal();
    bad.tax_rate = 2.0;
    let result = export_proposal(
        &bad,
        &items(),
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(0),
    );
    assert!(matches!(result, Err(CoreError::InvalidTaxRate(_))));
    assert!(store.list(DEFAULT_BUCKET, "proposals/p_1/").unwrap().is_empty());
}

/// Store whose listing always fails, so pruning fails after a successful
/// upload.
struct ListBrokenStore {
    inner: FsObjectStore,
}

impl ObjectStore for ListBrokenStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> CoreResult<()> {
        self.inner.upload(bucket, path, bytes)
    }

    fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> CoreResult<url::Url> {
        self.inner.create_signed_url(bucket, path, ttl)
    }

    fn list(&self, _bucket: &str, _prefix: &str) -> CoreResult<Vec<ObjectInfo>> {
        Err(CoreError::ListFailure("listing endpoint down".to_string()))
    }

    fn remove(&self, bucket: &str, paths: &[String]) -> CoreResult<()> {
        self.inner.remove(bucket, paths)
    }
}

#[test]
fn test_prune_failure_does_not_unwind_upload() {
    let dir = tempfile::tempdir().unwrap();
    let store = ListBrokenStore {
        inner: FsObjectStore::create(dir.path()).unwrap(),
    };
    let bridge = ArtifactBridge::with_default_bucket(&store);

    let outcome = export_proposal(
        &proposal(),
        &items(),
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(0),
    )
    .unwrap();

    assert_eq!(outcome.stage, ExportStage::Uploaded);
    let prune_error = outcome.prune_error.expect("prune failure should be reported");
    assert!(prune_error.contains("listing endpoint down"));

    // The artifact is still there.
    let listed = store.inner.list(DEFAULT_BUCKET, "proposals/p_1/").unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn test_record_export_updates_proposal_after_upload() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::create(dir.path()).unwrap();
    let bridge = ArtifactBridge::with_default_bucket(&store);
    let repo = MemoryRepository::new();
    repo.create(
        PROPOSALS_RESOURCE,
        serde_json::to_value(proposal()).unwrap(),
    )
    .unwrap();

    let outcome = export_proposal(
        &proposal(),
        &items(),
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(0),
    )
    .unwrap();
    record_export(&repo, "p_1", &outcome).unwrap();

    let record = repo.get_one(PROPOSALS_RESOURCE, "p_1").unwrap();
    assert_eq!(
        record.get("pdf_path").and_then(|v| v.as_str()),
        Some(outcome.artifact_path.as_str())
    );
    assert_eq!(
        record.get("pdf_generated_at").and_then(|v| v.as_str()),
        Some("2026-08-04T10:00:00Z")
    );
    assert_eq!(
        record.get("subtotal").and_then(|v| v.as_i64()),
        Some(3333)
    );
    assert_eq!(
        record.get("total_amount").and_then(|v| v.as_i64()),
        Some(3608)
    );
}

#[test]
fn test_exports_of_independent_proposals_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::create(dir.path()).unwrap();
    let bridge = ArtifactBridge::with_default_bucket(&store);

    let mut second = proposal();
    second.id = "p_2".to_string();
    let mut second_items = items();
    second_items[0].proposal_id = "p_2".to_string();

    export_proposal(
        &proposal(),
        &items(),
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(0),
    )
    .unwrap();
    export_proposal(
        &second,
        &second_items,
        &Recipient::default(),
        &Branding::default(),
        &bridge,
        5,
        stamp(1),
    )
    .unwrap();

    assert_eq!(store.list(DEFAULT_BUCKET, "proposals/p_1/").unwrap().len(), 1);
    assert_eq!(store.list(DEFAULT_BUCKET, "proposals/p_2/").unwrap().len(), 1);
}
