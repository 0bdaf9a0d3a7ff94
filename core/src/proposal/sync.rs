use super::model::LineItem;
use super::store::LINE_ITEMS_RESOURCE;
use crate::error::CoreResult;
use crate::repository::RecordRepository;
use std::collections::{HashMap, HashSet};
use time::{Duration, OffsetDateTime};

/// Minimal set of repository operations that reconciles an edited item list
/// with the last-known server state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSyncPlan {
    pub creates: Vec<LineItem>,
    pub updates: Vec<LineItem>,
    pub deletes: Vec<String>,
}

impl ItemSyncPlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Diff the edited list against the server snapshot.
///
/// An edited item whose id is unknown to the server (or blank, for rows the
/// editor has not persisted yet) becomes a create; a known id with changed
/// content becomes an update; server ids absent from the edited list become
/// deletes. Unchanged items produce no operation.
pub fn plan_item_sync(server: &[LineItem], edited: &[LineItem]) -> ItemSyncPlan {
    let server_by_id: HashMap<&str, &LineItem> =
        server.iter().map(|i| (i.id.as_str(), i)).collect();

    let mut plan = ItemSyncPlan::default();
    for item in edited {
        match server_by_id.get(item.id.as_str()) {
            Some(existing) if !item.id.is_empty() => {
                if *existing != item {
                    plan.updates.push(item.clone());
                }
            }
            _ => plan.creates.push(item.clone()),
        }
    }

    let edited_ids: HashSet<&str> = edited
        .iter()
        .filter(|i| !i.id.is_empty())
        .map(|i| i.id.as_str())
        .collect();
    for item in server {
        if !edited_ids.contains(item.id.as_str()) {
            plan.deletes.push(item.id.clone());
        }
    }
    plan
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncApplied {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Apply a sync plan as individual repository calls.
///
/// Not atomic: a mid-plan failure leaves earlier operations applied. The
/// caller re-plans from a fresh server snapshot on retry, which converges
/// because the plan is a pure diff.
pub fn apply_item_sync(
    repo: &dyn RecordRepository,
    plan: &ItemSyncPlan,
) -> CoreResult<SyncApplied> {
    let mut applied = SyncApplied::default();
    for item in &plan.creates {
        repo.create(LINE_ITEMS_RESOURCE, serde_json::to_value(item)?)?;
        applied.created += 1;
    }
    for item in &plan.updates {
        repo.update(LINE_ITEMS_RESOURCE, &item.id, serde_json::to_value(item)?)?;
        applied.updated += 1;
    }
    for id in &plan.deletes {
        repo.delete(LINE_ITEMS_RESOURCE, id)?;
        applied.deleted += 1;
    }
    Ok(applied)
}

struct PendingWrite {
    item: LineItem,
    seq: u64,
    due_at: OffsetDateTime,
}

/// Trailing-edge debounce for line-item autosave.
///
/// Each edit supersedes any pending write for the same item id and restarts
/// that item's quiet window, so only the last edit within the window is
/// persisted and an older write can never land after a newer one. The queue
/// holds no timers; the event loop ticks it with the current time and
/// persists whatever `drain_due` returns.
pub struct AutosaveQueue {
    quiet: Duration,
    pending: HashMap<String, PendingWrite>,
    seq: u64,
}

impl AutosaveQueue {
    pub fn new(quiet: Duration) -> Self {
        AutosaveQueue {
            quiet,
            pending: HashMap::new(),
            seq: 0,
        }
    }

    pub fn record_edit(&mut self, item: LineItem, now: OffsetDateTime) {
        self.seq += 1;
        let write = PendingWrite {
            seq: self.seq,
            due_at: now + self.quiet,
            item,
        };
        self.pending.insert(write.item.id.clone(), write);
    }

    /// Writes whose quiet window has elapsed, in edit order.
    pub fn drain_due(&mut self, now: OffsetDateTime) -> Vec<LineItem> {
        let due_ids: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, w)| w.due_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let mut due: Vec<PendingWrite> = due_ids
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect();
        due.sort_by_key(|w| w.seq);
        due.into_iter().map(|w| w.item).collect()
    }

    /// Everything still pending, regardless of quiet window. Used on
    /// editor close so no edit is lost.
    pub fn flush_all(&mut self) -> Vec<LineItem> {
        let mut all: Vec<PendingWrite> = self.pending.drain().map(|(_, w)| w).collect();
        all.sort_by_key(|w| w.seq);
        all.into_iter().map(|w| w.item).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
