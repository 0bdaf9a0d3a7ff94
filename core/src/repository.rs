use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

/// Query shape for `list`: equality filter over record fields, optional
/// single-field sort, optional page/per-page pagination.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: Option<Value>,
    pub sort: Option<(String, SortDir)>,
    pub page: Option<(usize, usize)>,
}

impl ListQuery {
    pub fn filtered(filter: Value) -> Self {
        ListQuery {
            filter: Some(filter),
            sort: None,
            page: None,
        }
    }

    pub fn sorted_by(mut self, field: &str, dir: SortDir) -> Self {
        self.sort = Some((field.to_string(), dir));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ListPage {
    pub data: Vec<Value>,
    pub total: usize,
}

/// The data layer, as seen from this core: an opaque async-ish record
/// service keyed by resource name. Implemented by the application shell
/// (PostgREST-style REST in production); the core never retries and never
/// inspects transport details.
pub trait RecordRepository {
    fn list(&self, resource: &str, query: &ListQuery) -> CoreResult<ListPage>;
    fn get_one(&self, resource: &str, id: &str) -> CoreResult<Value>;
    fn create(&self, resource: &str, record: Value) -> CoreResult<Value>;
    fn update(&self, resource: &str, id: &str, patch: Value) -> CoreResult<Value>;
    fn delete(&self, resource: &str, id: &str) -> CoreResult<Value>;
}

/// In-process repository for tests and local development. Records live in
/// a map keyed by resource name; `update` merges object fields the way a
/// PATCH against the real backend would.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Value>>) -> T) -> T {
        let mut guard = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

fn record_id(record: &Value) -> Option<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn matches_filter(record: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(map) => map.iter().all(|(k, v)| record.get(k) == Some(v)),
        None => true,
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> std::cmp::Ordering {
    let av = a.get(field);
    let bv = b.get(field);
    match (av, bv) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    }
}

impl RecordRepository for MemoryRepository {
    fn list(&self, resource: &str, query: &ListQuery) -> CoreResult<ListPage> {
        self.with_records(|records| {
            let mut data: Vec<Value> = records
                .get(resource)
                .map(|rs| {
                    rs.iter()
                        .filter(|r| query.filter.as_ref().map_or(true, |f| matches_filter(r, f)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            if let Some((field, dir)) = &query.sort {
                data.sort_by(|a, b| {
                    let ord = compare_field(a, b, field);
                    match dir {
                        SortDir::Asc => ord,
                        SortDir::Desc => ord.reverse(),
                    }
                });
            }

            let total = data.len();
            if let Some((page, per_page)) = query.page {
                let start = page.saturating_sub(1).saturating_mul(per_page);
                data = data.into_iter().skip(start).take(per_page).collect();
            }
            Ok(ListPage { data, total })
        })
    }

    fn get_one(&self, resource: &str, id: &str) -> CoreResult<Value> {
        self.with_records(|records| {
            records
                .get(resource)
                .and_then(|rs| {
                    rs.iter()
                        .find(|r| record_id(r).as_deref() == Some(id))
                        .cloned()
                })
                .ok_or_else(|| {
                    CoreError::RepositoryFailure(format!("{}/{} not found", resource, id))
                })
        })
    }

    fn create(&self, resource: &str, mut record: Value) -> CoreResult<Value> {
        self.with_records(|records| {
            if record_id(&record).is_none() {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(map) = record.as_object_mut() {
                    map.insert("id".to_string(), Value::String(format!("rec_{}", n)));
                }
            }
            records
                .entry(resource.to_string())
                .or_default()
                .push(record.clone());
            Ok(record)
        })
    }

    fn update(&self, resource: &str, id: &str, patch: Value) -> CoreResult<Value> {
        self.with_records(|records| {
            let rows = records.get_mut(resource).ok_or_else(|| {
                CoreError::RepositoryFailure(format!("{}/{} not found", resource, id))
            })?;
            let row = rows
                .iter_mut()
                .find(|r| record_id(r).as_deref() == Some(id))
                .ok_or_else(|| {
                    CoreError::RepositoryFailure(format!("{}/{} not found", resource, id))
                })?;
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in fields {
                    target.insert(k.clone(), v.clone());
                }
            }
            Ok(row.clone())
        })
    }

    fn delete(&self, resource: &str, id: &str) -> CoreResult<Value> {
        self.with_records(|records| {
            let rows = records.get_mut(resource).ok_or_else(|| {
                CoreError::RepositoryFailure(format!("{}/{} not found", resource, id))
            })?;
            let idx = rows
                .iter()
                .position(|r| record_id(r).as_deref() == Some(id))
                .ok_or_else(|| {
                    CoreError::RepositoryFailure(format!("{}/{} not found", resource, id))
                })?;
            Ok(rows.remove(idx))
        })
    }
}
