use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, error};
use uuid::Uuid;

use crate::db::models::requests::{Request, RequestFilter, TargetRole, WorkflowStatus};
use crate::db::store::RequestStore;
use crate::error::StoreError;
use crate::workflow::transitions::assignment_invariant_holds;

/// Requests waiting for someone in the growth pool to claim them.
pub fn to_assign_filter() -> RequestFilter {
    RequestFilter {
        workflow_status: Some(WorkflowStatus::PendingAssignment),
        target_role: Some(TargetRole::Growth),
        ..Default::default()
    }
}

pub fn my_assignments_filter(actor_id: Uuid) -> RequestFilter {
    RequestFilter {
        assigned_to: Some(actor_id),
        ..Default::default()
    }
}

/// Logs rows that break the assignment invariant. Returns how many did.
pub fn report_invariant_violations(rows: &[Request]) -> usize {
    let mut broken = 0;
    for row in rows.iter().filter(|r| !assignment_invariant_holds(r)) {
        error!(
            request = %row.id,
            status = %row.workflow_status,
            assigned_to = ?row.assigned_to,
            "request violates the assignment invariant"
        );
        broken += 1;
    }
    broken
}

/// The three lists a user works from, fetched together.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub all: Vec<Request>,
    pub to_assign: Vec<Request>,
    pub mine: Vec<Request>,
}

impl BoardSnapshot {
    pub async fn fetch(store: &dyn RequestStore, actor_id: Uuid) -> Result<Self, StoreError> {
        let all = store.list_requests(&RequestFilter::default()).await?;
        let to_assign = store.list_requests(&to_assign_filter()).await?;
        let mine = store.list_requests(&my_assignments_filter(actor_id)).await?;
        report_invariant_violations(&to_assign);
        Ok(Self { all, to_assign, mine })
    }
}

/// Per-actor board snapshots. Every mutation must call `invalidate`.
///
/// A read that started before an invalidation never leaves its snapshot behind:
/// each `invalidate` bumps `generation`, and a fetch whose generation moved
/// drops what it inserted.
#[derive(Clone)]
pub struct BoardCache {
    cache: Cache<Uuid, Arc<BoardSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl BoardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).max_capacity(10_000).build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get_or_fetch(
        &self,
        store: &dyn RequestStore,
        actor_id: Uuid,
    ) -> Result<Arc<BoardSnapshot>, StoreError> {
        if let Some(snapshot) = self.cache.get(&actor_id).await {
            debug!(actor = %actor_id, "board served from cache");
            return Ok(snapshot);
        }
        let started = self.generation.load(Ordering::Acquire);
        let snapshot = Arc::new(BoardSnapshot::fetch(store, actor_id).await?);
        if self.generation.load(Ordering::Acquire) != started {
            debug!(actor = %actor_id, "board changed during fetch, not caching");
            return Ok(snapshot);
        }
        self.cache.insert(actor_id, snapshot.clone()).await;
        // An invalidation between the check and the insert would miss this entry.
        if self.generation.load(Ordering::Acquire) != started {
            self.cache.invalidate(&actor_id).await;
        }
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
    }
}
