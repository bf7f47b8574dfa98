use crate::core::{DbError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, Serialize)]
pub struct WorkerInfo {
    pub worker_id: String,
    pub base_url: String,
    pub last_seen: DateTime<Utc>,
    pub load: f64,
}

/// Process-wide set of live workers. No persistence: a restart loses all
/// registrations, recovered within one heartbeat period as workers
/// re-register against their 404 response.
///
/// Backed by an [`IndexMap`] rather than `std::collections::HashMap`: a
/// worker's position is fixed at first registration and untouched by later
/// heartbeats (matching `IndexMap::insert`'s "update value, keep position"
/// behaviour), so iteration order is stable and reproduces the reference
/// registry's insertion-ordered-`dict` semantics.
pub struct WorkerRegistry {
    ttl: Duration,
    workers: Mutex<IndexMap<String, WorkerInfo>>,
}

impl WorkerRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            workers: Mutex::new(IndexMap::new()),
        }
    }

    pub fn upsert(&self, worker_id: &str, base_url: &str, load: f64) {
        let mut workers = self.workers.lock().expect("registry mutex poisoned");
        workers.insert(
            worker_id.to_string(),
            WorkerInfo {
                worker_id: worker_id.to_string(),
                base_url: base_url.trim_end_matches('/').to_string(),
                last_seen: Utc::now(),
                load,
            },
        );
    }

    /// Refreshes an already-registered worker's liveness. Returns
    /// [`DbError::NotFound`] for an unknown `worker_id` so the caller can
    /// surface a 404 and let the worker re-register.
    pub fn heartbeat(&self, worker_id: &str, base_url: Option<&str>, load: Option<f64>) -> Result<()> {
        let mut workers = self.workers.lock().expect("registry mutex poisoned");
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| DbError::NotFound(format!("worker '{worker_id}'")))?;
        worker.last_seen = Utc::now();
        if let Some(url) = base_url {
            worker.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(load) = load {
            worker.load = load;
        }
        Ok(())
    }

    pub fn list_active(&self) -> Vec<WorkerInfo> {
        let now = Utc::now();
        let workers = self.workers.lock().expect("registry mutex poisoned");
        workers
            .values()
            .filter(|w| {
                now.signed_duration_since(w.last_seen)
                    .to_std()
                    .map(|age| age <= self.ttl)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// FIFO-by-registration-order worker-selection policy: the first
    /// still-active worker in registration order. The caller is expected
    /// to have already checked [`Self::list_active`] is non-empty.
    pub fn choose_worker(&self) -> Option<WorkerInfo> {
        self.list_active().into_iter().next()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
